use crate::models::domain::{ConfidenceLevel, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard success envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

/// Declared check-size range of an investor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSizeRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Investor as shown to a startup-side caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorView {
    /// `None` while identity is masked
    pub id: Option<String>,
    /// Real name, or the masking label
    pub display_name: String,
    pub firm: Option<String>,
    pub title: Option<String>,
    pub photo_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub sectors: Vec<String>,
    pub stages: Vec<String>,
    pub investor_tier: Option<String>,
    pub check_size: Option<CheckSizeRange>,
    pub notable_investments: Option<Vec<String>>,
    pub leads_rounds: Option<bool>,
}

/// Startup as shown to an investor-side caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartupView {
    pub id: Option<String>,
    pub display_name: String,
    pub tagline: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub sectors: Vec<String>,
    pub stage: Option<String>,
    pub god_score: Option<f64>,
    pub raise_amount: Option<f64>,
    pub traction: Option<TractionView>,
}

/// Revenue and team signals of a startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TractionView {
    pub has_revenue: bool,
    pub mrr: Option<f64>,
    pub arr: Option<f64>,
    pub growth_rate_monthly: Option<f64>,
    pub customer_count: Option<u32>,
    pub team_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CounterpartView {
    Investor(InvestorView),
    Startup(StartupView),
}

impl CounterpartView {
    pub fn display_name(&self) -> &str {
        match self {
            CounterpartView::Investor(v) => &v.display_name,
            CounterpartView::Startup(v) => &v.display_name,
        }
    }
}

/// Tier-appropriate projection of one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchView {
    /// 1-based rank within the ranked result set
    pub rank: usize,
    pub match_score: u8,
    pub identity_masked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<ConfidenceLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub counterpart: CounterpartView,
}

/// Payload of the match list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchListData {
    pub matches: Vec<MatchView>,
    /// All stored matches for the subject
    pub total: usize,
    /// Matches left after smart filtering and explicit filters
    pub filtered_total: usize,
    /// Whether the smart default threshold was applied
    pub limit_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_threshold: Option<f64>,
    pub tier: Tier,
    /// Matches the caller's plan allows, `None` for unlimited
    pub tier_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountBucket {
    pub label: String,
    pub count: usize,
}

/// Aggregate statistics over a subject's matches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchStats {
    pub total: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
    pub average_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_god_score: Option<f64>,
    pub top_sectors: Vec<CountBucket>,
    /// Investor tiers for startup subjects, funding stages for investor subjects
    pub top_categories: Vec<CountBucket>,
    pub score_distribution: Vec<CountBucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub god_score_distribution: Option<Vec<CountBucket>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RematchStatus {
    pub can_rematch: bool,
    pub used: u32,
    /// `None` for unlimited plans
    pub remaining: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RematchOutcome {
    pub replaced: usize,
    pub rematches_used: u32,
    pub rematches_remaining: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoResponse {
    pub memo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareCreatedResponse {
    pub url: String,
    pub share_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedMatchesResponse {
    pub share_id: String,
    pub startup_name: String,
    pub matches: Vec<MatchView>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_tier: Option<Tier>,
}
