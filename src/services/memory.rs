use crate::core::artifacts::ShareLink;
use crate::models::{Investor, Match, Startup, SubjectKind, Tier};
use crate::services::entity_store::{EntityStore, EntityStoreError};
use crate::services::store::{MatchRepository, PlanLookup, RematchCounterStore, ShareStore, StoreError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::{Mutex, RwLock};

/// Roster held in process, for `memory://` deployments and tests
#[derive(Default)]
pub struct InMemoryEntityStore {
    startups: RwLock<BTreeMap<String, Startup>>,
    investors: RwLock<BTreeMap<String, Investor>>,
}

impl InMemoryEntityStore {
    pub async fn put_startup(&self, startup: Startup) {
        self.startups.write().await.insert(startup.id.clone(), startup);
    }

    pub async fn put_investor(&self, investor: Investor) {
        self.investors.write().await.insert(investor.id.clone(), investor);
    }

    pub async fn remove_investor(&self, id: &str) -> Option<Investor> {
        self.investors.write().await.remove(id)
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn get_startup(&self, id: &str) -> Result<Option<Startup>, EntityStoreError> {
        Ok(self.startups.read().await.get(id).cloned())
    }

    async fn get_investor(&self, id: &str) -> Result<Option<Investor>, EntityStoreError> {
        Ok(self.investors.read().await.get(id).cloned())
    }

    async fn list_startups(&self) -> Result<Vec<Startup>, EntityStoreError> {
        Ok(self.startups.read().await.values().cloned().collect())
    }

    async fn list_investors(&self) -> Result<Vec<Investor>, EntityStoreError> {
        Ok(self.investors.read().await.values().cloned().collect())
    }
}

#[derive(Default)]
struct MemoryState {
    /// Keyed by (startup_id, investor_id)
    matches: BTreeMap<(String, String), Match>,
    scored: HashSet<(SubjectKind, String)>,
    counters: HashMap<(String, SubjectKind, String), u32>,
    shares: HashMap<String, ShareLink>,
    plans: HashMap<String, Tier>,
}

/// In-process implementation of every persistence trait
///
/// One mutex guards all state, so each replace and each counter update is
/// atomic with respect to every other operation.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_plan(&self, caller_id: &str, tier: Tier) {
        self.state.lock().await.plans.insert(caller_id.to_string(), tier);
    }

    pub async fn match_count(&self) -> usize {
        self.state.lock().await.matches.len()
    }

    async fn replace(&self, subject_id: &str, kind: SubjectKind, matches: Vec<Match>) -> usize {
        let mut state = self.state.lock().await;

        state.matches.retain(|(startup_id, investor_id), _| match kind {
            SubjectKind::Startup => startup_id != subject_id,
            SubjectKind::Investor => investor_id != subject_id,
        });

        state.scored.insert((kind, subject_id.to_string()));

        let inserted = matches.len();
        for m in matches {
            state
                .matches
                .insert((m.startup_id.clone(), m.investor_id.clone()), m);
        }
        inserted
    }

    async fn load(&self, subject_id: &str, kind: SubjectKind) -> Vec<Match> {
        let state = self.state.lock().await;
        let mut rows: Vec<Match> = state
            .matches
            .values()
            .filter(|m| match kind {
                SubjectKind::Startup => m.startup_id == subject_id,
                SubjectKind::Investor => m.investor_id == subject_id,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.match_score.cmp(&a.match_score));
        rows
    }
}

#[async_trait]
impl MatchRepository for MemoryStore {
    async fn replace_for_startup(&self, startup_id: &str, matches: Vec<Match>) -> Result<usize, StoreError> {
        Ok(self.replace(startup_id, SubjectKind::Startup, matches).await)
    }

    async fn replace_for_investor(&self, investor_id: &str, matches: Vec<Match>) -> Result<usize, StoreError> {
        Ok(self.replace(investor_id, SubjectKind::Investor, matches).await)
    }

    async fn matches_for_startup(&self, startup_id: &str) -> Result<Vec<Match>, StoreError> {
        Ok(self.load(startup_id, SubjectKind::Startup).await)
    }

    async fn matches_for_investor(&self, investor_id: &str) -> Result<Vec<Match>, StoreError> {
        Ok(self.load(investor_id, SubjectKind::Investor).await)
    }

    async fn is_scored(&self, kind: SubjectKind, subject_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .scored
            .contains(&(kind, subject_id.to_string())))
    }
}

#[async_trait]
impl RematchCounterStore for MemoryStore {
    async fn rematch_count(&self, caller_id: &str, kind: SubjectKind, subject_id: &str) -> Result<u32, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .counters
            .get(&(caller_id.to_string(), kind, subject_id.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn try_increment(
        &self,
        caller_id: &str,
        kind: SubjectKind,
        subject_id: &str,
        allowance: Option<u32>,
    ) -> Result<Option<u32>, StoreError> {
        let mut state = self.state.lock().await;
        let count = state
            .counters
            .entry((caller_id.to_string(), kind, subject_id.to_string()))
            .or_insert(0);

        if allowance.is_some_and(|allowed| *count >= allowed) {
            return Ok(None);
        }
        *count += 1;
        Ok(Some(*count))
    }

    async fn release(&self, caller_id: &str, kind: SubjectKind, subject_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if let Some(count) = state
            .counters
            .get_mut(&(caller_id.to_string(), kind, subject_id.to_string()))
        {
            *count = count.saturating_sub(1);
        }
        Ok(())
    }
}

#[async_trait]
impl ShareStore for MemoryStore {
    async fn insert_share(&self, link: &ShareLink) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .shares
            .insert(link.share_id.clone(), link.clone());
        Ok(())
    }

    async fn get_share(&self, share_id: &str) -> Result<Option<ShareLink>, StoreError> {
        Ok(self.state.lock().await.shares.get(share_id).cloned())
    }
}

#[async_trait]
impl PlanLookup for MemoryStore {
    async fn plan_for(&self, caller_id: &str) -> Result<Tier, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .plans
            .get(caller_id)
            .copied()
            .unwrap_or_default())
    }
}
