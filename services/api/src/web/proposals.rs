//! services/api/src/web/proposals.rs
//!
//! Contains the Axum handlers for the proposal endpoints, the generation
//! pipeline they orchestrate, and the master definition for the OpenAPI
//! specification.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use proposal_core::domain::NewProposal;
use proposal_core::ports::PortError;
use proposal_core::prompt::{self, Tone};
use proposal_core::quota;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::web::middleware::AuthedUser;
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        generate_proposal_handler,
        list_proposals_handler,
        get_proposal_handler,
    ),
    components(
        schemas(GenerateProposalRequest, GeneratedProposalResponse, ProposalResponse, ErrorBody)
    ),
    tags(
        (name = "Proposal Writer API", description = "API endpoints for generating and retrieving written proposals.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request/Response and Error Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct GenerateProposalRequest {
    /// Free-text description of the business need.
    #[serde(rename = "userPrompt")]
    pub user_prompt: String,
    /// Tone selector; unrecognized values fall back to a neutral tone.
    #[serde(rename = "selectedTone")]
    pub selected_tone: String,
}

#[derive(Serialize, ToSchema)]
pub struct GeneratedProposalResponse {
    pub proposal: String,
}

/// A stored proposal, as returned by the retrieval endpoints.
#[derive(Serialize, ToSchema)]
pub struct ProposalResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub tone: String,
    pub created_at: DateTime<Utc>,
}

impl From<proposal_core::domain::Proposal> for ProposalResponse {
    fn from(p: proposal_core::domain::Proposal) -> Self {
        Self {
            id: p.id,
            title: p.title,
            content: p.content,
            tone: p.tone,
            created_at: p.created_at,
        }
    }
}

/// The error body every failing endpoint answers with. `proposal` is only
/// present when text was generated but could not be saved.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            proposal: None,
        }
    }
}

//=========================================================================================
// Pipeline Error Type
//=========================================================================================

/// Terminal failure outcomes of the generation pipeline. The `Display`
/// strings are what callers see; internal detail stays in the server log.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The quota profile could not be fetched; a store inconsistency, not
    /// user-visible quota state.
    #[error("User profile for limits not found or access denied.")]
    ProfileUnavailable(String),

    #[error("Daily generation limit ({limit}) exceeded. Please try again tomorrow.")]
    QuotaExceeded { limit: u32 },

    #[error("Failed to generate proposal.")]
    GenerationEmpty,

    /// The provider rejected or failed the generation call; its status is
    /// forwarded when one was surfaced.
    #[error("{message}")]
    Provider { status: Option<u16>, message: String },

    /// The proposal was generated but could not be persisted. Carries the
    /// generated text so the caller still receives their result.
    #[error("Proposal generated but failed to save: {message}")]
    SaveFailed { message: String, proposal: String },
}

impl IntoResponse for GenerateError {
    fn into_response(self) -> Response {
        let status = match &self {
            GenerateError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            GenerateError::Provider { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            GenerateError::ProfileUnavailable(_)
            | GenerateError::GenerationEmpty
            | GenerateError::SaveFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error = self.to_string();
        let proposal = match self {
            GenerateError::SaveFailed { proposal, .. } => Some(proposal),
            _ => None,
        };

        (status, Json(ErrorBody { error, proposal })).into_response()
    }
}

//=========================================================================================
// The Generation Pipeline
//=========================================================================================

/// Runs one proposal generation for an already-authenticated user:
/// quota admission, prompt composition, the generator call, persistence,
/// and the best-effort quota commit, in that order, with early exit on
/// failure at each stage.
async fn run_generation(
    state: &AppState,
    user_id: Uuid,
    description: &str,
    selected_tone: &str,
) -> Result<String, GenerateError> {
    // 1. Load quota state. A missing profile row is a server-side
    //    inconsistency and aborts before any generation work.
    let profile = state.db.get_profile(user_id).await.map_err(|e| {
        error!(%user_id, error = %e, "failed to fetch profile for limit check");
        GenerateError::ProfileUnavailable(e.to_string())
    })?;

    // 2. Admission check against today's date (UTC, date-only). The reset
    //    is lazy: a stale stored date means the count starts from zero.
    let today = Utc::now().date_naive();
    let limit = state.config.daily_generation_limit;
    let decision = quota::evaluate(&profile, today, limit);
    if !decision.admitted {
        return Err(GenerateError::QuotaExceeded { limit });
    }

    // 3. Compose the generation request.
    let request = prompt::compose(description, Tone::parse(selected_tone));

    // 4. Invoke the generator. No retries: a transient failure surfaces once.
    let text = state
        .generator
        .complete(&request)
        .await
        .map_err(|e| match e {
            PortError::Provider { status, message } => {
                GenerateError::Provider { status, message }
            }
            other => GenerateError::Provider {
                status: None,
                message: other.to_string(),
            },
        })?;

    if text.trim().is_empty() {
        return Err(GenerateError::GenerationEmpty);
    }

    // 5. Persist the proposal. The title is the verbatim description and
    //    the tone is the raw selector, even when the composer fell back
    //    to the neutral clause.
    let new_proposal = NewProposal {
        user_id,
        title: description.to_string(),
        content: text.clone(),
        tone: selected_tone.to_string(),
    };
    if let Err(e) = state.db.insert_proposal(new_proposal).await {
        error!(%user_id, error = %e, "failed to save generated proposal");
        return Err(GenerateError::SaveFailed {
            message: e.to_string(),
            proposal: text,
        });
    }

    // 6. Commit the quota increment. Bookkeeping only: the proposal is
    //    already durable, so a failed counter write never fails the request.
    if let Err(e) = state
        .db
        .update_profile(user_id, decision.effective_count + 1, today)
        .await
    {
        warn!(%user_id, error = %e, "failed to update daily generation count");
    }

    Ok(text)
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate a proposal from a description and tone, and store it.
#[utoipa::path(
    post,
    path = "/generate-proposal",
    request_body = GenerateProposalRequest,
    responses(
        (status = 200, description = "Proposal generated and saved", body = GeneratedProposalResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 429, description = "Daily generation limit exceeded", body = ErrorBody),
        (status = 500, description = "Profile unavailable, generation failed, or save failed", body = ErrorBody)
    )
)]
pub async fn generate_proposal_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
    Json(req): Json<GenerateProposalRequest>,
) -> Result<Json<GeneratedProposalResponse>, GenerateError> {
    let proposal = run_generation(&state, user_id, &req.user_prompt, &req.selected_tone).await?;
    Ok(Json(GeneratedProposalResponse { proposal }))
}

/// List the caller's proposals, newest first.
#[utoipa::path(
    get,
    path = "/proposals",
    responses(
        (status = 200, description = "The caller's proposals", body = [ProposalResponse]),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_proposals_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
) -> Result<Json<Vec<ProposalResponse>>, (StatusCode, Json<ErrorBody>)> {
    let proposals = state
        .db
        .list_proposals_for_user(user_id)
        .await
        .map_err(|e| {
            error!(%user_id, error = %e, "failed to list proposals");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("Failed to load your proposals.")),
            )
        })?;

    Ok(Json(proposals.into_iter().map(Into::into).collect()))
}

/// Fetch one proposal owned by the caller.
#[utoipa::path(
    get,
    path = "/proposals/{id}",
    params(
        ("id" = Uuid, Path, description = "The proposal's unique ID")
    ),
    responses(
        (status = 200, description = "The requested proposal", body = ProposalResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "No such proposal for this user", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn get_proposal_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProposalResponse>, (StatusCode, Json<ErrorBody>)> {
    let proposal = state
        .db
        .get_proposal_for_user(user_id, id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody::new("Proposal not found.")),
            ),
            other => {
                error!(%user_id, %id, error = %other, "failed to fetch proposal");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new("Failed to load proposal.")),
                )
            }
        })?;

    Ok(Json(proposal.into()))
}

//=========================================================================================
// Pipeline Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use proposal_core::domain::{Profile, Proposal, User, UserCredentials};
    use proposal_core::ports::{DatabaseService, PortResult, ProposalGenerationService};
    use proposal_core::prompt::GenerationRequest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ── Fake database collaborator ──

    struct FakeDb {
        profile: Option<Profile>,
        fail_insert: bool,
        fail_update: bool,
        inserted: Mutex<Vec<NewProposal>>,
        updates: Mutex<Vec<(u32, NaiveDate)>>,
    }

    impl FakeDb {
        fn with_profile(profile: Profile) -> Self {
            Self {
                profile: Some(profile),
                fail_insert: false,
                fail_update: false,
                inserted: Mutex::new(Vec::new()),
                updates: Mutex::new(Vec::new()),
            }
        }

        fn without_profile() -> Self {
            Self {
                profile: None,
                fail_insert: false,
                fail_update: false,
                inserted: Mutex::new(Vec::new()),
                updates: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DatabaseService for FakeDb {
        async fn create_user_with_email(
            &self,
            _email: &str,
            _hashed_password: &str,
        ) -> PortResult<User> {
            Err(PortError::Unexpected("not wired in this test".into()))
        }

        async fn get_user_by_email(&self, _email: &str) -> PortResult<UserCredentials> {
            Err(PortError::Unexpected("not wired in this test".into()))
        }

        async fn create_auth_session(
            &self,
            _session_id: &str,
            _user_id: Uuid,
            _expires_at: DateTime<Utc>,
        ) -> PortResult<()> {
            Err(PortError::Unexpected("not wired in this test".into()))
        }

        async fn validate_auth_session(&self, _session_id: &str) -> PortResult<Uuid> {
            Err(PortError::Unexpected("not wired in this test".into()))
        }

        async fn delete_auth_session(&self, _session_id: &str) -> PortResult<()> {
            Err(PortError::Unexpected("not wired in this test".into()))
        }

        async fn get_profile(&self, _user_id: Uuid) -> PortResult<Profile> {
            self.profile
                .clone()
                .ok_or_else(|| PortError::NotFound("profile missing".into()))
        }

        async fn update_profile(
            &self,
            _user_id: Uuid,
            daily_generations_count: u32,
            last_generation_date: NaiveDate,
        ) -> PortResult<()> {
            if self.fail_update {
                return Err(PortError::Unexpected("update refused".into()));
            }
            self.updates
                .lock()
                .unwrap()
                .push((daily_generations_count, last_generation_date));
            Ok(())
        }

        async fn insert_proposal(&self, new_proposal: NewProposal) -> PortResult<Proposal> {
            if self.fail_insert {
                return Err(PortError::Unexpected("insert refused".into()));
            }
            let proposal = Proposal {
                id: Uuid::new_v4(),
                user_id: new_proposal.user_id,
                title: new_proposal.title.clone(),
                content: new_proposal.content.clone(),
                tone: new_proposal.tone.clone(),
                created_at: Utc::now(),
            };
            self.inserted.lock().unwrap().push(new_proposal);
            Ok(proposal)
        }

        async fn get_proposal_for_user(
            &self,
            _user_id: Uuid,
            _proposal_id: Uuid,
        ) -> PortResult<Proposal> {
            Err(PortError::Unexpected("not wired in this test".into()))
        }

        async fn list_proposals_for_user(&self, _user_id: Uuid) -> PortResult<Vec<Proposal>> {
            Err(PortError::Unexpected("not wired in this test".into()))
        }
    }

    // ── Fake generator collaborator ──

    struct FakeGenerator {
        /// `Ok(text)` is returned verbatim; `Err((status, message))` becomes
        /// a provider error.
        reply: Result<String, (Option<u16>, String)>,
        calls: AtomicUsize,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl FakeGenerator {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: Option<u16>, message: &str) -> Self {
            Self {
                reply: Err((status, message.to_string())),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProposalGenerationService for FakeGenerator {
        async fn complete(&self, request: &GenerationRequest) -> PortResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err((status, message)) => Err(PortError::Provider {
                    status: *status,
                    message: message.clone(),
                }),
            }
        }
    }

    // ── Test fixtures ──

    const USER: Uuid = Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0);

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn profile(count: u32, date: Option<NaiveDate>) -> Profile {
        Profile {
            user_id: USER,
            daily_generations_count: count,
            last_generation_date: date,
        }
    }

    fn test_config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_url: "postgres://unused".into(),
            log_level: tracing::Level::INFO,
            openai_api_key: None,
            generation_model: "gpt-4o".into(),
            daily_generation_limit: 5,
        }
    }

    fn state_with(db: Arc<FakeDb>, generator: Arc<FakeGenerator>) -> AppState {
        AppState {
            db,
            generator,
            config: Arc::new(test_config()),
        }
    }

    // ── Pipeline behavior ──

    #[tokio::test]
    async fn quota_exceeded_short_circuits_the_generator() {
        let db = Arc::new(FakeDb::with_profile(profile(5, Some(today()))));
        let generator = Arc::new(FakeGenerator::replying("unused"));
        let state = state_with(db.clone(), generator.clone());

        let result = run_generation(&state, USER, "A proposal", "formal").await;

        assert!(matches!(
            result,
            Err(GenerateError::QuotaExceeded { limit: 5 })
        ));
        assert_eq!(generator.call_count(), 0);
        assert!(db.inserted.lock().unwrap().is_empty());
        assert!(db.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_date_admits_regardless_of_stored_count() {
        let yesterday = today().pred_opt().unwrap();
        let db = Arc::new(FakeDb::with_profile(profile(3, Some(yesterday))));
        let generator = Arc::new(FakeGenerator::replying("Fresh proposal text."));
        let state = state_with(db.clone(), generator.clone());

        let result = run_generation(&state, USER, "A proposal", "formal").await;

        assert_eq!(result.unwrap(), "Fresh proposal text.");
        assert_eq!(generator.call_count(), 1);
        // The commit restarts the day's count at 1.
        assert_eq!(*db.updates.lock().unwrap(), vec![(1, today())]);
    }

    #[tokio::test]
    async fn success_persists_verbatim_title_and_increments_count() {
        let description = "Website redesign for a bakery";
        let db = Arc::new(FakeDb::with_profile(profile(4, Some(today()))));
        let generator = Arc::new(FakeGenerator::replying("A short, essential proposal."));
        let state = state_with(db.clone(), generator.clone());

        let result = run_generation(&state, USER, description, "concise").await;

        assert_eq!(result.unwrap(), "A short, essential proposal.");

        let requests = generator.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, 200);
        assert!(requests[0].instructions.contains("Tone: Concise."));
        assert!(requests[0].instructions.contains(description));

        let inserted = db.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].user_id, USER);
        assert_eq!(inserted[0].title, description);
        assert_eq!(inserted[0].tone, "concise");
        assert_eq!(inserted[0].content, "A short, essential proposal.");

        assert_eq!(*db.updates.lock().unwrap(), vec![(5, today())]);
    }

    #[tokio::test]
    async fn unknown_tone_composes_neutral_but_stores_the_raw_value() {
        let db = Arc::new(FakeDb::with_profile(profile(0, None)));
        let generator = Arc::new(FakeGenerator::replying("Generated."));
        let state = state_with(db.clone(), generator.clone());

        run_generation(&state, USER, "A proposal", "spicy")
            .await
            .unwrap();

        let requests = generator.requests.lock().unwrap();
        assert!(requests[0].instructions.contains("Tone: Neutral\n"));
        assert_eq!(requests[0].max_tokens, 1500);

        assert_eq!(db.inserted.lock().unwrap()[0].tone, "spicy");
    }

    #[tokio::test]
    async fn empty_generation_saves_nothing() {
        let db = Arc::new(FakeDb::with_profile(profile(0, Some(today()))));
        let generator = Arc::new(FakeGenerator::replying("  \n"));
        let state = state_with(db.clone(), generator.clone());

        let result = run_generation(&state, USER, "A proposal", "formal").await;

        assert!(matches!(result, Err(GenerateError::GenerationEmpty)));
        assert!(db.inserted.lock().unwrap().is_empty());
        assert!(db.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_error_propagates_status_and_message() {
        let db = Arc::new(FakeDb::with_profile(profile(0, Some(today()))));
        let generator = Arc::new(FakeGenerator::failing(Some(429), "Rate limit reached"));
        let state = state_with(db.clone(), generator.clone());

        let result = run_generation(&state, USER, "A proposal", "formal").await;

        match result {
            Err(GenerateError::Provider { status, message }) => {
                assert_eq!(status, Some(429));
                assert_eq!(message, "Rate limit reached");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
        assert!(db.inserted.lock().unwrap().is_empty());
        assert!(db.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_failure_still_returns_the_generated_text() {
        let mut db = FakeDb::with_profile(profile(2, Some(today())));
        db.fail_insert = true;
        let db = Arc::new(db);
        let generator = Arc::new(FakeGenerator::replying("The generated proposal."));
        let state = state_with(db.clone(), generator.clone());

        let result = run_generation(&state, USER, "A proposal", "formal").await;

        match result {
            Err(GenerateError::SaveFailed { proposal, .. }) => {
                assert_eq!(proposal, "The generated proposal.");
            }
            other => panic!("expected save failure, got {other:?}"),
        }
        assert!(db.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_failure_is_logged_not_surfaced() {
        let mut db = FakeDb::with_profile(profile(1, Some(today())));
        db.fail_update = true;
        let db = Arc::new(db);
        let generator = Arc::new(FakeGenerator::replying("Still delivered."));
        let state = state_with(db.clone(), generator.clone());

        let result = run_generation(&state, USER, "A proposal", "formal").await;

        assert_eq!(result.unwrap(), "Still delivered.");
        assert_eq!(db.inserted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_profile_is_a_server_error() {
        let db = Arc::new(FakeDb::without_profile());
        let generator = Arc::new(FakeGenerator::replying("unused"));
        let state = state_with(db.clone(), generator.clone());

        let result = run_generation(&state, USER, "A proposal", "formal").await;

        assert!(matches!(result, Err(GenerateError::ProfileUnavailable(_))));
        assert_eq!(generator.call_count(), 0);
    }

    // ── Response mapping ──

    #[test]
    fn quota_error_maps_to_429() {
        let response = GenerateError::QuotaExceeded { limit: 5 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn provider_status_is_forwarded_when_present() {
        let response = GenerateError::Provider {
            status: Some(429),
            message: "slow down".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = GenerateError::Provider {
            status: None,
            message: "opaque".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn save_failure_maps_to_500() {
        let response = GenerateError::SaveFailed {
            message: "disk full".into(),
            proposal: "text".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
