//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use proposal_core::domain::{NewProposal, Profile, Proposal, User, UserCredentials};
use proposal_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct ProfileRecord {
    user_id: Uuid,
    daily_generations_count: i32,
    last_generation_date: Option<NaiveDate>,
}
impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            user_id: self.user_id,
            daily_generations_count: self.daily_generations_count.max(0) as u32,
            last_generation_date: self.last_generation_date,
        }
    }
}

#[derive(FromRow)]
struct ProposalRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: String,
    tone: String,
    created_at: DateTime<Utc>,
}
impl ProposalRecord {
    fn to_domain(self) -> Proposal {
        Proposal {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            content: self.content,
            tone: self.tone,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        // The user row and its 1:1 quota profile are created together, so a
        // profile always exists by the time the generation pipeline runs.
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) RETURNING user_id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query("INSERT INTO profiles (user_id, daily_generations_count) VALUES ($1, 0)")
            .bind(record.user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;

        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT user_id, daily_generations_count, last_generation_date FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Profile for user {} not found", user_id))
            }
            _ => unexpected(e),
        })?;

        Ok(record.to_domain())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        daily_generations_count: u32,
        last_generation_date: NaiveDate,
    ) -> PortResult<()> {
        sqlx::query(
            "UPDATE profiles SET daily_generations_count = $1, last_generation_date = $2 WHERE user_id = $3",
        )
        .bind(daily_generations_count as i32)
        .bind(last_generation_date)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn insert_proposal(&self, new_proposal: NewProposal) -> PortResult<Proposal> {
        let record = sqlx::query_as::<_, ProposalRecord>(
            "INSERT INTO proposals (id, user_id, title, content, tone) VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, title, content, tone, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(new_proposal.user_id)
        .bind(&new_proposal.title)
        .bind(&new_proposal.content)
        .bind(&new_proposal.tone)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn get_proposal_for_user(
        &self,
        user_id: Uuid,
        proposal_id: Uuid,
    ) -> PortResult<Proposal> {
        let record = sqlx::query_as::<_, ProposalRecord>(
            "SELECT id, user_id, title, content, tone, created_at FROM proposals WHERE id = $1 AND user_id = $2",
        )
        .bind(proposal_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Proposal {} not found", proposal_id))
            }
            _ => unexpected(e),
        })?;

        Ok(record.to_domain())
    }

    async fn list_proposals_for_user(&self, user_id: Uuid) -> PortResult<Vec<Proposal>> {
        let records = sqlx::query_as::<_, ProposalRecord>(
            "SELECT id, user_id, title, content, tone, created_at FROM proposals \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let proposals = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(proposals)
    }
}
