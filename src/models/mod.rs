// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    stage_label, ConfidenceLevel, Counterpart, Investor, Match, MatchRecord, ScoringWeights,
    Startup, SubjectKind, Tier,
};
pub use requests::{
    split_list, CreateShareRequest, ExportLimitQuery, InvestorMatchQuery, StartupArtifactQuery,
    StartupMatchQuery,
};
pub use responses::{
    ApiResponse, CheckSizeRange, CounterpartView, CountBucket, ErrorResponse, HealthResponse,
    InvestorView, MatchListData, MatchStats, MatchView, MemoResponse, RematchOutcome,
    RematchStatus, ShareCreatedResponse, SharedMatchesResponse, StartupView, TractionView,
};
