use std::str::FromStr;

use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Vendor,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Vendor => "vendor",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "vendor" => Ok(Role::Vendor),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::Persistence(format!("unknown role '{other}'"))),
        }
    }
}

/// The caller of an operation, as resolved from a verified session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Only the owner may change data keyed by `owner_id`.
    pub fn ensure_owner(&self, owner_id: Uuid) -> Result<(), DomainError> {
        if self.user_id == owner_id {
            Ok(())
        } else {
            Err(DomainError::Unauthorized)
        }
    }

    /// Owners and admins may read data keyed by `owner_id`.
    pub fn ensure_owner_or_admin(&self, owner_id: Uuid) -> Result<(), DomainError> {
        if self.is_admin() {
            Ok(())
        } else {
            self.ensure_owner(owner_id)
        }
    }

    pub fn ensure_admin(&self) -> Result<(), DomainError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(DomainError::Unauthorized)
        }
    }
}
