//! crates/proposal_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{NewProposal, Profile, Proposal, User, UserCredentials};
use crate::prompt::GenerationRequest;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The text-generation provider rejected or failed the request.
    /// `status` carries the provider's HTTP status when one was surfaced.
    #[error("Provider error: {message}")]
    Provider { status: Option<u16>, message: String },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth Methods ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Quota State ---
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        daily_generations_count: u32,
        last_generation_date: NaiveDate,
    ) -> PortResult<()>;

    // --- Proposal Management ---
    async fn insert_proposal(&self, new_proposal: NewProposal) -> PortResult<Proposal>;

    async fn get_proposal_for_user(
        &self,
        user_id: Uuid,
        proposal_id: Uuid,
    ) -> PortResult<Proposal>;

    /// Returns the user's proposals, newest first.
    async fn list_proposals_for_user(&self, user_id: Uuid) -> PortResult<Vec<Proposal>>;
}

#[async_trait]
pub trait ProposalGenerationService: Send + Sync {
    /// Produces proposal text for a composed generation request.
    /// Sampling temperature is fixed by the implementation.
    async fn complete(&self, request: &GenerationRequest) -> PortResult<String>;
}
