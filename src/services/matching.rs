use crate::config::{ExportSettings, MatchingSettings, Settings, ShareSettings};
use crate::core::artifacts::{self, ArtifactError, ShareLink};
use crate::core::filters::MatchFilters;
use crate::core::matcher::Matcher;
use crate::core::ranking::{rank_and_filter, RankOptions, RankedMatches};
use crate::core::stats::summarize;
use crate::core::throttle::RematchPolicy;
use crate::core::visibility::{project_page, required_tier, Capability, VisibilityProfile};
use crate::models::{
    split_list, Counterpart, Investor, InvestorMatchQuery, Match, MatchListData, MatchRecord,
    MatchStats, MatchView, RematchOutcome, RematchStatus, ShareCreatedResponse,
    SharedMatchesResponse, Startup, StartupMatchQuery, SubjectKind, Tier,
};
use crate::services::entity_store::{EntityStore, EntityStoreError};
use crate::services::store::{MatchRepository, PlanLookup, RematchCounterStore, ShareStore, StoreError};
use crate::services::text_gen::{TextGenerationError, TextGenerator};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Rows fed to the memo prompt when the caller gives no limit
const DEFAULT_MEMO_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Upgrade to {required_tier} required for {}", .capability.as_str())]
    UpgradeRequired {
        capability: Capability,
        required_tier: Tier,
    },

    #[error("Share link has expired")]
    ShareExpired,

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Entity store error: {0}")]
    EntityStore(#[from] EntityStoreError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Text generation error: {0}")]
    TextGeneration(#[from] TextGenerationError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

impl ServiceError {
    fn upgrade(capability: Capability) -> Self {
        ServiceError::UpgradeRequired {
            capability,
            required_tier: required_tier(capability),
        }
    }
}

/// Identity and plan of the caller, resolved fresh on every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: Option<String>,
    pub tier: Tier,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self {
            id: None,
            tier: Tier::Free,
        }
    }

    pub fn profile(&self) -> VisibilityProfile {
        VisibilityProfile::for_tier(self.tier)
    }
}

/// Everything the service talks to
pub struct Collaborators {
    pub entities: Arc<dyn EntityStore>,
    pub matches: Arc<dyn MatchRepository>,
    pub counters: Arc<dyn RematchCounterStore>,
    pub shares: Arc<dyn ShareStore>,
    pub plans: Arc<dyn PlanLookup>,
    pub text: Arc<dyn TextGenerator>,
}

impl Collaborators {
    /// One backing store serving every persistence role
    pub fn with_store<S>(entities: Arc<dyn EntityStore>, store: Arc<S>, text: Arc<dyn TextGenerator>) -> Self
    where
        S: MatchRepository + RematchCounterStore + ShareStore + PlanLookup + 'static,
    {
        Self {
            entities,
            matches: store.clone(),
            counters: store.clone(),
            shares: store.clone(),
            plans: store,
            text,
        }
    }
}

/// Filters, sort and page resolved from a list query
#[derive(Debug, Clone)]
struct ListParams {
    filters: MatchFilters,
    options: RankOptions,
    offset: usize,
    limit: usize,
}

/// Match scoring, ranking and tier projection for both sides of the market
pub struct MatchService {
    entities: Arc<dyn EntityStore>,
    matches: Arc<dyn MatchRepository>,
    counters: Arc<dyn RematchCounterStore>,
    shares: Arc<dyn ShareStore>,
    plans: Arc<dyn PlanLookup>,
    text: Arc<dyn TextGenerator>,
    matcher: Matcher,
    policy: RematchPolicy,
    matching: MatchingSettings,
    share: ShareSettings,
    export: ExportSettings,
}

impl MatchService {
    pub fn new(collaborators: Collaborators, settings: &Settings) -> Self {
        Self {
            entities: collaborators.entities,
            matches: collaborators.matches,
            counters: collaborators.counters,
            shares: collaborators.shares,
            plans: collaborators.plans,
            text: collaborators.text,
            matcher: Matcher::new(settings.scoring.weights()),
            policy: RematchPolicy::new(settings.rematch.free_allowance),
            matching: settings.matching.clone(),
            share: settings.share.clone(),
            export: settings.export.clone(),
        }
    }

    /// Plan lookup for an authenticated id; anonymous callers are free
    pub async fn resolve_caller(&self, caller_id: Option<String>) -> Result<Caller, ServiceError> {
        match caller_id {
            None => Ok(Caller::anonymous()),
            Some(id) => {
                let tier = self.plans.plan_for(&id).await?;
                Ok(Caller { id: Some(id), tier })
            }
        }
    }

    pub async fn list_startup_matches(
        &self,
        caller: &Caller,
        startup_id: &str,
        query: &StartupMatchQuery,
    ) -> Result<MatchListData, ServiceError> {
        let params = self.startup_list_params(query)?;
        let startup = self.load_startup(startup_id).await?;
        let records = self.startup_records(&startup).await?;

        let ranked = rank_and_filter(records, &params.filters, &params.options, Utc::now());

        tracing::info!(
            "Startup {} matches: {} total, {} after filters (tier {})",
            startup_id,
            ranked.total,
            ranked.filtered_total,
            caller.tier
        );

        Ok(self.page(caller, ranked, params.offset, params.limit))
    }

    pub async fn list_investor_matches(
        &self,
        caller: &Caller,
        investor_id: &str,
        query: &InvestorMatchQuery,
    ) -> Result<MatchListData, ServiceError> {
        let params = self.investor_list_params(query)?;
        let investor = self.load_investor(investor_id).await?;
        let records = self.investor_records(&investor).await?;

        let ranked = rank_and_filter(records, &params.filters, &params.options, Utc::now());

        tracing::info!(
            "Investor {} matches: {} total, {} after filters (tier {})",
            investor_id,
            ranked.total,
            ranked.filtered_total,
            caller.tier
        );

        Ok(self.page(caller, ranked, params.offset, params.limit))
    }

    /// Aggregates carry no identities and are served to every tier
    pub async fn stats(&self, kind: SubjectKind, subject_id: &str) -> Result<MatchStats, ServiceError> {
        let records = match kind {
            SubjectKind::Startup => {
                let startup = self.load_startup(subject_id).await?;
                self.startup_records(&startup).await?
            }
            SubjectKind::Investor => {
                let investor = self.load_investor(subject_id).await?;
                self.investor_records(&investor).await?
            }
        };
        Ok(summarize(&records))
    }

    pub async fn rematch_status(
        &self,
        caller: &Caller,
        kind: SubjectKind,
        subject_id: &str,
    ) -> Result<RematchStatus, ServiceError> {
        let caller_id = caller.id.as_deref().ok_or(ServiceError::AuthenticationRequired)?;
        self.ensure_subject(kind, subject_id).await?;

        let used = self.counters.rematch_count(caller_id, kind, subject_id).await?;
        Ok(RematchStatus {
            can_rematch: self.policy.can_rematch(caller.tier, used),
            used,
            remaining: self.policy.remaining(caller.tier, used),
        })
    }

    /// Throttled full recomputation of a subject's match set
    ///
    /// The allowance is consumed up front with an atomic check-and-increment
    /// and given back if the recomputation fails.
    pub async fn rematch(
        &self,
        caller: &Caller,
        kind: SubjectKind,
        subject_id: &str,
    ) -> Result<RematchOutcome, ServiceError> {
        let caller_id = caller.id.as_deref().ok_or(ServiceError::AuthenticationRequired)?;
        self.ensure_subject(kind, subject_id).await?;

        let allowance = self.policy.allowance(caller.tier);
        let Some(used) = self
            .counters
            .try_increment(caller_id, kind, subject_id, allowance)
            .await?
        else {
            tracing::info!("Rematch denied for {} on {} {}", caller_id, kind.as_str(), subject_id);
            return Err(ServiceError::upgrade(Capability::UnlimitedRematch));
        };

        self.entities.invalidate_rosters().await;

        match self.recompute(kind, subject_id).await {
            Ok(replaced) => {
                tracing::info!(
                    "Rematched {} {} for {}: {} matches (use {})",
                    kind.as_str(),
                    subject_id,
                    caller_id,
                    replaced,
                    used
                );
                Ok(RematchOutcome {
                    replaced,
                    rematches_used: used,
                    rematches_remaining: self.policy.remaining(caller.tier, used),
                })
            }
            Err(e) => {
                tracing::error!("Rematch of {} {} failed: {}", kind.as_str(), subject_id, e);
                if let Err(release_err) = self.counters.release(caller_id, kind, subject_id).await {
                    tracing::warn!("Could not release rematch allowance: {}", release_err);
                }
                Err(e)
            }
        }
    }

    /// CSV of a startup's investor matches as `(filename, bytes)`
    pub async fn export_startup_csv(
        &self,
        caller: &Caller,
        startup_id: &str,
        limit: Option<usize>,
    ) -> Result<(String, Vec<u8>), ServiceError> {
        require(caller, Capability::Export)?;

        let startup = self.load_startup(startup_id).await?;
        let views = self
            .artifact_views(caller, self.startup_records(&startup).await?, self.export_limit(limit))
            .await;
        let bytes = artifacts::export_csv(&views, true)?;

        tracing::info!("Exported {} matches for startup {}", views.len(), startup_id);
        Ok((artifacts::export_filename(&startup.name), bytes))
    }

    /// CSV of an investor's startup matches as `(filename, bytes)`
    pub async fn export_investor_csv(
        &self,
        caller: &Caller,
        investor_id: &str,
        limit: Option<usize>,
    ) -> Result<(String, Vec<u8>), ServiceError> {
        require(caller, Capability::Export)?;

        let investor = self.load_investor(investor_id).await?;
        let views = self
            .artifact_views(caller, self.investor_records(&investor).await?, self.export_limit(limit))
            .await;
        let bytes = artifacts::export_csv(&views, false)?;

        tracing::info!("Exported {} matches for investor {}", views.len(), investor_id);
        Ok((artifacts::export_filename(&investor.name), bytes))
    }

    /// Generated deal memo, returned verbatim
    pub async fn deal_memo(
        &self,
        caller: &Caller,
        startup_id: &str,
        limit: Option<usize>,
    ) -> Result<String, ServiceError> {
        require(caller, Capability::Export)?;

        let startup = self.load_startup(startup_id).await?;
        let limit = limit.unwrap_or(DEFAULT_MEMO_LIMIT).clamp(1, self.export.max_limit.max(1));
        let views = self
            .artifact_views(caller, self.startup_records(&startup).await?, limit)
            .await;

        let prompt = artifacts::memo_prompt(&startup, &views);
        tracing::debug!("Memo prompt for {}: {} bytes", startup_id, prompt.len());

        Ok(self.text.generate(&prompt).await?)
    }

    /// Mint a fresh share link over the current top-N snapshot
    pub async fn create_share(
        &self,
        caller: &Caller,
        startup_id: &str,
        limit: Option<usize>,
    ) -> Result<ShareCreatedResponse, ServiceError> {
        require(caller, Capability::Export)?;
        let created_by = caller.id.as_deref().ok_or(ServiceError::AuthenticationRequired)?;

        let startup = self.load_startup(startup_id).await?;
        let limit = limit
            .unwrap_or(self.share.default_limit)
            .clamp(1, self.share.max_limit.max(1));
        let views = self
            .artifact_views(caller, self.startup_records(&startup).await?, limit)
            .await;

        let link = ShareLink::new(
            &startup,
            created_by,
            views,
            Utc::now(),
            Duration::days(self.share.ttl_days),
        );
        self.shares.insert_share(&link).await?;

        tracing::info!(
            "Share {} created for startup {} ({} matches, expires {})",
            link.share_id,
            startup_id,
            link.snapshot.len(),
            link.expires_at
        );

        Ok(ShareCreatedResponse {
            url: link.url(&self.share.public_base_url),
            share_id: link.share_id,
            expires_at: link.expires_at,
        })
    }

    pub async fn get_share(&self, share_id: &str) -> Result<SharedMatchesResponse, ServiceError> {
        self.get_share_at(share_id, Utc::now()).await
    }

    /// Stored snapshot while `now < expires_at`
    pub async fn get_share_at(
        &self,
        share_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SharedMatchesResponse, ServiceError> {
        let link = self
            .shares
            .get_share(share_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                kind: "Share link",
                id: share_id.to_string(),
            })?;

        if link.is_expired_at(now) {
            return Err(ServiceError::ShareExpired);
        }

        Ok(SharedMatchesResponse {
            share_id: link.share_id,
            startup_name: link.startup_name,
            matches: link.snapshot,
            created_at: link.created_at,
            expires_at: link.expires_at,
        })
    }

    fn page(&self, caller: &Caller, ranked: RankedMatches, offset: usize, limit: usize) -> MatchListData {
        let profile = caller.profile();
        let matches = project_page(&ranked.matches, &profile, offset, limit);

        MatchListData {
            matches,
            total: ranked.total,
            filtered_total: ranked.filtered_total,
            limit_applied: ranked.smart_threshold.is_some(),
            smart_threshold: ranked.smart_threshold,
            tier: caller.tier,
            tier_limit: profile.max_matches,
        }
    }

    /// Score-ordered views of the whole set, as the caller's plan shows them
    async fn artifact_views(&self, caller: &Caller, records: Vec<MatchRecord>, limit: usize) -> Vec<MatchView> {
        let ranked = rank_and_filter(records, &MatchFilters::default(), &RankOptions::default(), Utc::now());
        project_page(&ranked.matches, &caller.profile(), 0, limit)
    }

    fn export_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.export.default_limit)
            .clamp(1, self.export.max_limit.max(1))
    }

    async fn load_startup(&self, startup_id: &str) -> Result<Startup, ServiceError> {
        self.entities
            .get_startup(startup_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                kind: "Startup",
                id: startup_id.to_string(),
            })
    }

    async fn load_investor(&self, investor_id: &str) -> Result<Investor, ServiceError> {
        self.entities
            .get_investor(investor_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                kind: "Investor",
                id: investor_id.to_string(),
            })
    }

    async fn ensure_subject(&self, kind: SubjectKind, subject_id: &str) -> Result<(), ServiceError> {
        match kind {
            SubjectKind::Startup => self.load_startup(subject_id).await.map(|_| ()),
            SubjectKind::Investor => self.load_investor(subject_id).await.map(|_| ()),
        }
    }

    /// Score the subject against the full roster and replace its stored set
    async fn recompute(&self, kind: SubjectKind, subject_id: &str) -> Result<usize, ServiceError> {
        let now = Utc::now();
        match kind {
            SubjectKind::Startup => {
                let startup = self.load_startup(subject_id).await?;
                let investors = self.entities.list_investors().await?;
                let result = self.matcher.match_startup(&startup, &investors, now);
                Ok(self.matches.replace_for_startup(subject_id, result.matches).await?)
            }
            SubjectKind::Investor => {
                let investor = self.load_investor(subject_id).await?;
                let startups = self.entities.list_startups().await?;
                let result = self.matcher.match_investor(&investor, &startups, now);
                Ok(self.matches.replace_for_investor(subject_id, result.matches).await?)
            }
        }
    }

    /// Stored matches joined with the investor roster
    ///
    /// A subject that has never been scored is scored once on first read;
    /// that initial pass is not a rematch and does not touch any counter.
    async fn startup_records(&self, startup: &Startup) -> Result<Vec<MatchRecord>, ServiceError> {
        let investors = self.entities.list_investors().await?;
        let mut stored = self.matches.matches_for_startup(&startup.id).await?;

        // Rows written by investor-side replaces do not make this set complete
        if !investors.is_empty() && !self.matches.is_scored(SubjectKind::Startup, &startup.id).await? {
            let result = self.matcher.match_startup(startup, &investors, Utc::now());
            tracing::debug!("Initial scoring for startup {}: {} matches", startup.id, result.matches.len());
            self.matches.replace_for_startup(&startup.id, result.matches.clone()).await?;
            stored = result.matches;
        }

        let roster: HashMap<String, Investor> = investors.into_iter().map(|i| (i.id.clone(), i)).collect();
        Ok(join(stored, |m| roster.get(&m.investor_id).cloned().map(Counterpart::Investor)))
    }

    /// Stored matches joined with the startup roster
    async fn investor_records(&self, investor: &Investor) -> Result<Vec<MatchRecord>, ServiceError> {
        let startups = self.entities.list_startups().await?;
        let mut stored = self.matches.matches_for_investor(&investor.id).await?;

        if !startups.is_empty() && !self.matches.is_scored(SubjectKind::Investor, &investor.id).await? {
            let result = self.matcher.match_investor(investor, &startups, Utc::now());
            tracing::debug!("Initial scoring for investor {}: {} matches", investor.id, result.matches.len());
            self.matches.replace_for_investor(&investor.id, result.matches.clone()).await?;
            stored = result.matches;
        }

        let roster: HashMap<String, Startup> = startups.into_iter().map(|s| (s.id.clone(), s)).collect();
        Ok(join(stored, |m| roster.get(&m.startup_id).cloned().map(Counterpart::Startup)))
    }

    fn startup_list_params(&self, query: &StartupMatchQuery) -> Result<ListParams, ServiceError> {
        let filters = MatchFilters {
            min_score: query.min_score,
            max_score: query.max_score,
            confidence_level: parse_optional(query.confidence_level.as_deref())?,
            sectors: split_list(query.sectors.as_deref()),
            stages: split_list(query.stage.as_deref()),
            geography: split_list(query.geography.as_deref()),
            counterpart_tier: non_blank(query.investor_tier.as_deref()),
            leads_rounds: query.leads_rounds,
            active_recently: query.active_investor,
            ..Default::default()
        };

        // An explicit floor replaces the smart default
        let smart = (!query.show_all && query.min_score.is_none()).then(|| self.matching.smart_filter());

        Ok(ListParams {
            filters,
            options: RankOptions {
                sort_key: parse_optional(query.sort_by.as_deref())?.unwrap_or_default(),
                sort_order: parse_optional(query.sort_order.as_deref())?,
                smart,
            },
            offset: query.offset.unwrap_or(0),
            limit: self.matching.page_limit(query.limit),
        })
    }

    fn investor_list_params(&self, query: &InvestorMatchQuery) -> Result<ListParams, ServiceError> {
        let filters = MatchFilters {
            min_score: query.min_score,
            max_score: query.max_score,
            confidence_level: parse_optional(query.confidence_level.as_deref())?,
            sectors: split_list(query.sectors.as_deref()),
            stages: split_list(query.stage.as_deref()),
            geography: split_list(query.geography.as_deref()),
            god_band: parse_optional(query.god_tier.as_deref())?,
            has_revenue: query.has_revenue,
            min_god_score: query.min_god_score,
            min_mrr: query.min_mrr,
            min_arr: query.min_arr,
            min_growth_rate: query.min_growth_rate,
            min_customers: query.min_customers,
            min_team_size: query.min_team_size,
            ..Default::default()
        };

        Ok(ListParams {
            filters,
            options: RankOptions {
                sort_key: parse_optional(query.sort_by.as_deref())?.unwrap_or_default(),
                sort_order: parse_optional(query.sort_order.as_deref())?,
                smart: None,
            },
            offset: query.offset.unwrap_or(0),
            limit: self.matching.page_limit(query.limit),
        })
    }
}

fn require(caller: &Caller, capability: Capability) -> Result<(), ServiceError> {
    if caller.profile().allows(capability) {
        Ok(())
    } else {
        Err(ServiceError::upgrade(capability))
    }
}

/// Attach counterparts, dropping rows whose counterpart left the roster
fn join<F>(stored: Vec<Match>, lookup: F) -> Vec<MatchRecord>
where
    F: Fn(&Match) -> Option<Counterpart>,
{
    stored
        .into_iter()
        .filter_map(|matched| {
            let counterpart = lookup(&matched)?;
            Some(MatchRecord { matched, counterpart })
        })
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn parse_optional<T>(value: Option<&str>) -> Result<Option<T>, ServiceError>
where
    T: FromStr<Err = String>,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(ServiceError::InvalidRequest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ranking::{SortKey, SortOrder};
    use crate::models::ConfidenceLevel;

    #[test]
    fn test_parse_optional() {
        assert_eq!(parse_optional::<SortKey>(None).unwrap(), None);
        assert_eq!(parse_optional::<SortKey>(Some(" ")).unwrap(), None);
        assert_eq!(parse_optional::<SortOrder>(Some("asc")).unwrap(), Some(SortOrder::Asc));
        assert_eq!(
            parse_optional::<ConfidenceLevel>(Some("HIGH")).unwrap(),
            Some(ConfidenceLevel::High)
        );
        assert!(matches!(
            parse_optional::<SortKey>(Some("random")),
            Err(ServiceError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_require_maps_to_lowest_unlocking_tier() {
        let pro = Caller {
            id: Some("u".to_string()),
            tier: Tier::Pro,
        };
        match require(&pro, Capability::Export) {
            Err(ServiceError::UpgradeRequired { required_tier, .. }) => assert_eq!(required_tier, Tier::Elite),
            other => panic!("unexpected {:?}", other),
        }
        assert!(require(&pro, Capability::CheckSize).is_ok());
    }

    #[test]
    fn test_upgrade_message() {
        let err = ServiceError::upgrade(Capability::Export);
        assert_eq!(err.to_string(), "Upgrade to elite required for export");
    }
}
