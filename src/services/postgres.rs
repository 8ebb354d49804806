use crate::config::DatabaseSettings;
use crate::core::artifacts::ShareLink;
use crate::models::{ConfidenceLevel, Match, MatchView, SubjectKind, Tier};
use crate::services::store::{MatchRepository, PlanLookup, RematchCounterStore, ShareStore, StoreError};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;

/// Rows per multi-value INSERT, well under the bind-parameter limit
const INSERT_CHUNK: usize = 1_000;

/// Which column a replace is keyed on
#[derive(Debug, Clone, Copy)]
enum MatchKey {
    Startup,
    Investor,
}

impl MatchKey {
    fn column(&self) -> &'static str {
        match self {
            MatchKey::Startup => "startup_id",
            MatchKey::Investor => "investor_id",
        }
    }

    fn kind(&self) -> SubjectKind {
        match self {
            MatchKey::Startup => SubjectKind::Startup,
            MatchKey::Investor => SubjectKind::Investor,
        }
    }
}

/// PostgreSQL-backed match store, rematch counters, share links and plans
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run pending migrations
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections.unwrap_or(10))
            .min_connections(settings.min_connections.unwrap_or(1))
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs.unwrap_or(5)))
            .idle_timeout(Duration::from_secs(settings.idle_timeout_secs.unwrap_or(600)))
            .test_before_acquire(true)
            .connect(&settings.url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Delete-then-insert under a per-subject advisory lock
    ///
    /// The transaction-scoped lock serializes overlapping replaces for the
    /// same subject, so a double-submitted rematch can never interleave its
    /// delete with another request's insert.
    async fn replace(&self, key: MatchKey, subject_id: &str, matches: Vec<Match>) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("matches:{}:{}", key.column(), subject_id))
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query(&format!("DELETE FROM matches WHERE {} = $1", key.column()))
            .bind(subject_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for chunk in matches.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO matches (startup_id, investor_id, match_score, confidence_level, reasoning, created_at) ",
            );
            builder.push_values(chunk, |mut row, m| {
                row.push_bind(m.startup_id.clone())
                    .push_bind(m.investor_id.clone())
                    .push_bind(i16::from(m.match_score))
                    .push_bind(m.confidence_level.as_str())
                    .push_bind(Json(m.reasoning.clone()))
                    .push_bind(m.created_at);
            });
            // The other side's replace may already have written this pair
            builder.push(
                " ON CONFLICT (startup_id, investor_id) DO UPDATE SET \
                 match_score = EXCLUDED.match_score, \
                 confidence_level = EXCLUDED.confidence_level, \
                 reasoning = EXCLUDED.reasoning, \
                 created_at = EXCLUDED.created_at",
            );
            builder.build().execute(&mut *tx).await?;
        }

        sqlx::query(
            "INSERT INTO scored_subjects (subject_kind, subject_id, scored_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (subject_kind, subject_id) DO UPDATE SET scored_at = NOW()",
        )
        .bind(key.kind().as_str())
        .bind(subject_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            "Replaced matches for {} {}: {} removed, {} inserted",
            key.column(),
            subject_id,
            deleted,
            matches.len()
        );

        Ok(matches.len())
    }

    async fn load(&self, key: MatchKey, subject_id: &str) -> Result<Vec<Match>, StoreError> {
        let query = format!(
            "SELECT startup_id, investor_id, match_score, confidence_level, reasoning, created_at \
             FROM matches WHERE {} = $1 ORDER BY match_score DESC, created_at DESC",
            key.column()
        );

        let rows = sqlx::query(&query).bind(subject_id).fetch_all(&self.pool).await?;
        rows.iter().map(match_from_row).collect()
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn match_from_row(row: &PgRow) -> Result<Match, StoreError> {
    let score: i16 = row.try_get("match_score")?;
    let confidence: String = row.try_get("confidence_level")?;
    let reasoning: Json<Vec<String>> = row.try_get("reasoning")?;

    Ok(Match {
        startup_id: row.try_get("startup_id")?,
        investor_id: row.try_get("investor_id")?,
        match_score: u8::try_from(score).map_err(|_| StoreError::Corrupt(format!("match_score {}", score)))?,
        confidence_level: confidence
            .parse::<ConfidenceLevel>()
            .map_err(StoreError::Corrupt)?,
        reasoning: reasoning.0,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl MatchRepository for PostgresStore {
    async fn replace_for_startup(&self, startup_id: &str, matches: Vec<Match>) -> Result<usize, StoreError> {
        self.replace(MatchKey::Startup, startup_id, matches).await
    }

    async fn replace_for_investor(&self, investor_id: &str, matches: Vec<Match>) -> Result<usize, StoreError> {
        self.replace(MatchKey::Investor, investor_id, matches).await
    }

    async fn matches_for_startup(&self, startup_id: &str) -> Result<Vec<Match>, StoreError> {
        self.load(MatchKey::Startup, startup_id).await
    }

    async fn matches_for_investor(&self, investor_id: &str) -> Result<Vec<Match>, StoreError> {
        self.load(MatchKey::Investor, investor_id).await
    }

    async fn is_scored(&self, kind: SubjectKind, subject_id: &str) -> Result<bool, StoreError> {
        let scored: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM scored_subjects WHERE subject_kind = $1 AND subject_id = $2)",
        )
        .bind(kind.as_str())
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(scored)
    }
}

#[async_trait]
impl RematchCounterStore for PostgresStore {
    async fn rematch_count(&self, caller_id: &str, kind: SubjectKind, subject_id: &str) -> Result<u32, StoreError> {
        let count: Option<i32> = sqlx::query_scalar(
            "SELECT count FROM rematch_counters WHERE caller_id = $1 AND subject_kind = $2 AND subject_id = $3",
        )
        .bind(caller_id)
        .bind(kind.as_str())
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.map_or(0, |c| c.max(0) as u32))
    }

    async fn try_increment(
        &self,
        caller_id: &str,
        kind: SubjectKind,
        subject_id: &str,
        allowance: Option<u32>,
    ) -> Result<Option<u32>, StoreError> {
        if allowance == Some(0) {
            return Ok(None);
        }
        let ceiling = allowance.map_or(i32::MAX, |a| i32::try_from(a).unwrap_or(i32::MAX));

        // Single statement, so two racing requests cannot both pass the check
        let count: Option<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO rematch_counters (caller_id, subject_kind, subject_id, count, updated_at)
            VALUES ($1, $2, $3, 1, NOW())
            ON CONFLICT (caller_id, subject_kind, subject_id)
            DO UPDATE SET count = rematch_counters.count + 1, updated_at = NOW()
            WHERE rematch_counters.count < $4
            RETURNING count
            "#,
        )
        .bind(caller_id)
        .bind(kind.as_str())
        .bind(subject_id)
        .bind(ceiling)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.map(|c| c.max(0) as u32))
    }

    async fn release(&self, caller_id: &str, kind: SubjectKind, subject_id: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE rematch_counters SET count = GREATEST(count - 1, 0), updated_at = NOW() \
             WHERE caller_id = $1 AND subject_kind = $2 AND subject_id = $3",
        )
        .bind(caller_id)
        .bind(kind.as_str())
        .bind(subject_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ShareStore for PostgresStore {
    async fn insert_share(&self, link: &ShareLink) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO share_links (share_id, startup_id, startup_name, created_by, snapshot, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&link.share_id)
        .bind(&link.startup_id)
        .bind(&link.startup_name)
        .bind(&link.created_by)
        .bind(Json(&link.snapshot))
        .bind(link.created_at)
        .bind(link.expires_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Stored share link {} for startup {}", link.share_id, link.startup_id);
        Ok(())
    }

    async fn get_share(&self, share_id: &str) -> Result<Option<ShareLink>, StoreError> {
        let row = sqlx::query(
            "SELECT share_id, startup_id, startup_name, created_by, snapshot, created_at, expires_at \
             FROM share_links WHERE share_id = $1",
        )
        .bind(share_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let snapshot: Json<Vec<MatchView>> = row.try_get("snapshot")?;
        Ok(Some(ShareLink {
            share_id: row.try_get("share_id")?,
            startup_id: row.try_get("startup_id")?,
            startup_name: row.try_get("startup_name")?,
            created_by: row.try_get("created_by")?,
            snapshot: snapshot.0,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        }))
    }
}

#[async_trait]
impl PlanLookup for PostgresStore {
    async fn plan_for(&self, caller_id: &str) -> Result<Tier, StoreError> {
        let plan: Option<String> = sqlx::query_scalar("SELECT plan FROM user_plans WHERE user_id = $1")
            .bind(caller_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match plan {
            None => Tier::Free,
            Some(plan) => plan.parse().unwrap_or_else(|e| {
                tracing::warn!("Treating caller {} as free: {}", caller_id, e);
                Tier::Free
            }),
        })
    }
}
