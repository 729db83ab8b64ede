//! Accounts and the identity triple handed to the core once a caller is authenticated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type UserId = i64;

/// Role carried by every session. Signup always yields `Customer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

/// Who is calling. Passed explicitly into every gate and ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A stored account row.
#[derive(Clone, FromRow, Debug)]
pub struct User {
    pub id: UserId,

    /// Unique login email.
    pub email: String,

    /// bcrypt hash; never serialized.
    pub password_hash: String,

    pub name: String,

    pub role: Role,

    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}
