use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{ReportError, Result};
use crate::models::ReportMetadata;
use crate::stores::MetadataStore;

/// Postgres-backed report metadata store. The table is insert-only: one
/// row per successful generation, never updated afterwards.
#[derive(Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to metadata database")?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    #[instrument(skip(self, metadata), fields(report_id = %metadata.id, client_id = %metadata.client_id))]
    async fn insert(&self, metadata: &ReportMetadata) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO report_metadata (
                id, scenario_id, client_id, report_kind, version,
                created_at, updated_at, created_by, file_size,
                language, accessibility_flag
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(metadata.id)
        .bind(metadata.scenario_id)
        .bind(metadata.client_id)
        .bind(metadata.report_kind.as_str())
        .bind(metadata.version)
        .bind(metadata.created_at)
        .bind(metadata.updated_at)
        .bind(&metadata.created_by)
        .bind(metadata.file_size)
        .bind(&metadata.language)
        .bind(metadata.accessibility_flag)
        .execute(&self.pool)
        .await
        .map_err(|e| ReportError::Metadata(format!("failed to insert report metadata: {e}")))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<ReportMetadata>> {
        sqlx::query_as::<_, ReportMetadata>(
            r#"
            SELECT id, scenario_id, client_id, report_kind, version,
                   created_at, updated_at, created_by, file_size,
                   language, accessibility_flag
            FROM report_metadata
            WHERE client_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ReportError::Metadata(format!("failed to list report history: {e}")))
    }
}
