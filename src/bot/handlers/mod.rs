//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions such as autocomplete,
//! button clicks, and other non-command interactions.

/// Autocomplete handlers for owned and catalog card names
pub mod autocomplete;
