//! Hotmatch engine - match scoring and tiered visibility for a startup/investor marketplace
//!
//! Scores every startup/investor pair with an explainable additive model,
//! persists the results, and serves ranked, filtered views whose detail
//! depends on the caller's subscription tier.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{calculate_match_score, rank_and_filter, Matcher, VisibilityProfile};
pub use models::{ConfidenceLevel, Investor, Match, ScoringWeights, Startup, Tier};
pub use services::{Caller, MatchService, ServiceError};
