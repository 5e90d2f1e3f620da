use uuid::Uuid;

use crate::users::model::{Role, User};

/// Identity attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    User { id: Uuid },
    Admin { id: Uuid },
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        match user.role {
            Role::Admin => Principal::Admin { id: user.id },
            Role::User => Principal::User { id: user.id },
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            Principal::Anonymous => None,
            Principal::User { id } | Principal::Admin { id } => Some(*id),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Principal::Admin { .. })
    }
}
