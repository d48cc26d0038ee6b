//! crates/proposal_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a bearer login session (opaque token held by the client)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Per-user quota state, one row per user.
///
/// `daily_generations_count` is only meaningful when `last_generation_date`
/// is the current calendar date; any earlier (or absent) date means the
/// effective count is zero. See [`crate::quota::evaluate`].
#[derive(Debug, Clone)]
pub struct Profile {
    pub user_id: Uuid,
    pub daily_generations_count: u32,
    pub last_generation_date: Option<NaiveDate>,
}

/// A generated proposal owned by a user. Immutable once written.
///
/// `title` is the verbatim description the user typed, never a summary.
/// `tone` is the raw selector the caller sent, even when the composer
/// fell back to the neutral clause.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub tone: String,
    pub created_at: DateTime<Utc>,
}

/// The fields needed to persist a new proposal. The id and creation
/// timestamp are assigned by the persistence adapter.
#[derive(Debug, Clone)]
pub struct NewProposal {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub tone: String,
}
