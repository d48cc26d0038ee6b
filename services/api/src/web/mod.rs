pub mod auth;
pub mod middleware;
pub mod proposals;
pub mod state;

// Re-export the handlers and middleware the binary needs to build the router.
pub use middleware::require_auth;
pub use proposals::{generate_proposal_handler, get_proposal_handler, list_proposals_handler};
