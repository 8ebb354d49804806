// Core algorithm exports
pub mod artifacts;
pub mod filters;
pub mod matcher;
pub mod ranking;
pub mod reasoning;
pub mod scoring;
pub mod stats;
pub mod throttle;
pub mod visibility;

pub use artifacts::{export_csv, export_filename, memo_prompt, ArtifactError, ShareLink};
pub use filters::{matches_filters, GodBand, MatchFilters};
pub use matcher::{MatchResult, Matcher};
pub use ranking::{rank_and_filter, RankOptions, RankedMatches, SmartFilter, SortKey, SortOrder};
pub use reasoning::compose_reasons;
pub use scoring::{calculate_match_score, derive_confidence, ScoreBreakdown, MAX_SCORE};
pub use stats::summarize;
pub use throttle::RematchPolicy;
pub use visibility::{project, project_page, required_tier, Capability, VisibilityProfile};
