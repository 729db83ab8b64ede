//! Authorization gate.
//!
//! A pure decision over the caller's identity and a policy. No state, no I/O.

use crate::models::user::{Identity, UserId};
use thiserror::Error;

/// Who may perform an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Any signed-in caller.
    Authenticated,
    /// Vehicle mutation and booking status updates.
    AdminOnly,
    /// Booking read/cancel: an admin, or the requester recorded on the booking.
    AdminOrOwner(UserId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Forbidden(&'static str),
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("Unauthorized. Please login.")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(&'static str),
}

pub fn evaluate(identity: Option<&Identity>, policy: Policy) -> Access {
    let Some(identity) = identity else {
        return Access::Unauthenticated;
    };

    match policy {
        Policy::Authenticated => Access::Allow,
        Policy::AdminOnly if identity.is_admin() => Access::Allow,
        Policy::AdminOnly => Access::Forbidden("Unauthorized. Admin access required."),
        Policy::AdminOrOwner(owner) if identity.is_admin() || identity.id == owner => Access::Allow,
        Policy::AdminOrOwner(_) => Access::Forbidden("Unauthorized to access this booking"),
    }
}

impl Access {
    pub fn into_result(self) -> Result<(), AccessDenied> {
        match self {
            Access::Allow => Ok(()),
            Access::Forbidden(reason) => Err(AccessDenied::Forbidden(reason)),
            Access::Unauthenticated => Err(AccessDenied::Unauthenticated),
        }
    }
}

/// Evaluate `policy` and hand back the identity when allowed.
pub fn authorize(identity: Option<&Identity>, policy: Policy) -> Result<&Identity, AccessDenied> {
    evaluate(identity, policy).into_result()?;
    identity.ok_or(AccessDenied::Unauthenticated)
}
