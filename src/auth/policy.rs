//! Authorization decisions. Every ownership or role check in the service goes
//! through these functions; handlers never compare roles themselves.

use uuid::Uuid;

use super::principal::Principal;
use crate::error::AppError;

/// Which owners' records a listing may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    All,
    Owner(Uuid),
    Nobody,
}

pub fn can_read(principal: &Principal, owner_id: Uuid) -> bool {
    match principal {
        Principal::Admin { .. } => true,
        Principal::User { id } => *id == owner_id,
        Principal::Anonymous => false,
    }
}

pub fn can_write(principal: &Principal, owner_id: Uuid) -> bool {
    can_read(principal, owner_id)
}

pub fn can_change_role(principal: &Principal) -> bool {
    principal.is_admin()
}

pub fn can_delete_user(principal: &Principal) -> bool {
    principal.is_admin()
}

/// Admins get their explicit owner filter back (absent means every owner).
/// Everyone else is pinned to their own records whatever they asked for.
pub fn scope_filter(principal: &Principal, explicit_owner: Option<Uuid>) -> OwnerScope {
    match principal {
        Principal::Admin { .. } => explicit_owner.map_or(OwnerScope::All, OwnerScope::Owner),
        Principal::User { id } => OwnerScope::Owner(*id),
        Principal::Anonymous => OwnerScope::Nobody,
    }
}

pub fn require_admin(principal: &Principal) -> Result<(), AppError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(AppError::Authorization("Access denied. Admin only.".into()))
    }
}
