pub mod domain;
pub mod ports;
pub mod prompt;
pub mod quota;

pub use domain::{AuthSession, NewProposal, Profile, Proposal, User, UserCredentials};
pub use ports::{DatabaseService, PortError, PortResult, ProposalGenerationService};
pub use prompt::{compose, GenerationRequest, Tone};
pub use quota::{evaluate, QuotaDecision};
