use crate::core::artifacts::ShareLink;
use crate::models::{Match, SubjectKind, Tier};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by the persistence collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Persisted match sets
///
/// A replace deletes every row for the subject and inserts the fresh set as
/// one atomic unit. Concurrent replaces for the same subject are serialized.
///
/// Rows are shared by both sides, so a subject can hold rows written by the
/// other side's replace without ever having been scored itself. A replace
/// also marks its subject as scored, and `is_scored` reads that mark.
#[async_trait]
pub trait MatchRepository: Send + Sync {
    async fn replace_for_startup(&self, startup_id: &str, matches: Vec<Match>) -> Result<usize, StoreError>;

    async fn replace_for_investor(&self, investor_id: &str, matches: Vec<Match>) -> Result<usize, StoreError>;

    async fn matches_for_startup(&self, startup_id: &str) -> Result<Vec<Match>, StoreError>;

    async fn matches_for_investor(&self, investor_id: &str) -> Result<Vec<Match>, StoreError>;

    /// Whether a replace has ever run for this subject
    async fn is_scored(&self, kind: SubjectKind, subject_id: &str) -> Result<bool, StoreError>;
}

/// Per (caller, subject) rematch counters
#[async_trait]
pub trait RematchCounterStore: Send + Sync {
    async fn rematch_count(&self, caller_id: &str, kind: SubjectKind, subject_id: &str) -> Result<u32, StoreError>;

    /// Atomically increment when the count is below `allowance`
    ///
    /// Returns the new count, or `None` when the allowance is spent. `None`
    /// allowance means unlimited.
    async fn try_increment(
        &self,
        caller_id: &str,
        kind: SubjectKind,
        subject_id: &str,
        allowance: Option<u32>,
    ) -> Result<Option<u32>, StoreError>;

    /// Give back one use after a failed recomputation
    async fn release(&self, caller_id: &str, kind: SubjectKind, subject_id: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ShareStore: Send + Sync {
    async fn insert_share(&self, link: &ShareLink) -> Result<(), StoreError>;

    async fn get_share(&self, share_id: &str) -> Result<Option<ShareLink>, StoreError>;
}

/// Caller plan lookup. Unknown callers are on the free plan.
#[async_trait]
pub trait PlanLookup: Send + Sync {
    async fn plan_for(&self, caller_id: &str) -> Result<Tier, StoreError>;
}
