//! Role gate for already-verified principals.
//!
//! Token issuance and verification belong to the authentication
//! collaborator; the core receives its payload and only checks the role.

use crate::model::roster::Role;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Opaque account id; the built-in administrator is not a roster user.
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Admin,
        }
    }

    pub fn student(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Student,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forbidden {
    pub required: Role,
    pub actual: Role,
}

impl Display for Forbidden {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.required {
            Role::Admin => write!(f, "forbidden: admin only"),
            Role::Student => write!(f, "forbidden: students only"),
        }
    }
}

impl Error for Forbidden {}

/// Passes when the principal holds exactly `required`.
pub fn require_role(principal: &Principal, required: Role) -> Result<(), Forbidden> {
    if principal.role == required {
        Ok(())
    } else {
        Err(Forbidden {
            required,
            actual: principal.role,
        })
    }
}
