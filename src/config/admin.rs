//! Administrator configuration loaded from environment variables.
//!
//! Admin-only commands (`givecard`, `givecurrency`, `createcard`) compare the
//! invoking user against `ADMIN_USER_ID` from the `.env` file.

/// Gets the configured administrator's Discord user ID, if any.
#[must_use]
pub fn get_admin_user_id() -> Option<String> {
    std::env::var("ADMIN_USER_ID")
        .ok()
        .filter(|id| !id.trim().is_empty())
}

/// Returns true if `user_id` matches the configured administrator.
///
/// When no administrator is configured nobody is an admin.
#[must_use]
pub fn is_admin(user_id: &str) -> bool {
    get_admin_user_id().is_some_and(|admin| admin == user_id)
}
