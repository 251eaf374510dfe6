//! Who may act on whom.

use mirrorgate_common::Role;

use crate::error::ApiError;

/// Email-keyed administration and user listing are ADMIN only.
/// `caller` is the caller's mirror role, `None` when the caller has no record.
pub fn require_admin(caller: Option<Role>) -> Result<(), ApiError> {
    match caller {
        Some(Role::Admin) => Ok(()),
        _ => Err(ApiError::forbidden()),
    }
}

/// Block toggling: staff only, moderators only on plain users, admins never
/// on other admins.
pub fn check_toggle(caller: Option<Role>, target: Role) -> Result<(), ApiError> {
    match (caller, target) {
        (Some(Role::Admin), Role::Admin) => {
            Err(ApiError::Forbidden("Cannot block admin users".to_string()))
        }
        (Some(Role::Admin), _) => Ok(()),
        (Some(Role::Moderator), Role::User) => Ok(()),
        _ => Err(ApiError::forbidden()),
    }
}
