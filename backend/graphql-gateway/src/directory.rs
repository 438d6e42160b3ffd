//! Postgres-backed principal directory

use async_trait::async_trait;
use auth_guard::{DirectoryError, PrincipalDirectory};
use request_context::AuthenticatedPrincipal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tracing::error;
use uuid::Uuid;

use crate::config::DatabaseConfig;

const FIND_BY_EXTERNAL_ID: &str = r#"
    SELECT id, external_id, email, role, is_active, username,
           organization_id, university_id, student_id, supervisor_id
    FROM users
    WHERE external_id = $1
"#;

#[derive(Debug, FromRow)]
struct PrincipalRow {
    id: Uuid,
    external_id: String,
    email: String,
    role: String,
    is_active: bool,
    username: Option<String>,
    organization_id: Option<Uuid>,
    university_id: Option<Uuid>,
    student_id: Option<Uuid>,
    supervisor_id: Option<Uuid>,
}

impl From<PrincipalRow> for AuthenticatedPrincipal {
    fn from(row: PrincipalRow) -> Self {
        AuthenticatedPrincipal {
            id: row.id.to_string(),
            external_id: row.external_id,
            email: row.email,
            role: row.role,
            is_active: row.is_active,
            username: row.username,
            organization_id: row.organization_id.map(|id| id.to_string()),
            university_id: row.university_id.map(|id| id.to_string()),
            student_id: row.student_id.map(|id| id.to_string()),
            supervisor_id: row.supervisor_id.map(|id| id.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct PgPrincipalDirectory {
    pool: PgPool,
}

impl PgPrincipalDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pool connects on first use, so startup does not wait on the database
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(&config.url)?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl PrincipalDirectory for PgPrincipalDirectory {
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<AuthenticatedPrincipal>, DirectoryError> {
        let row = sqlx::query_as::<_, PrincipalRow>(FIND_BY_EXTERNAL_ID)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "principal lookup failed");
                DirectoryError::Unavailable(e.to_string())
            })?;

        Ok(row.map(AuthenticatedPrincipal::from))
    }
}
