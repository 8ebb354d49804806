use crate::core::{reasoning::compose_reasons, scoring::calculate_match_score};
use crate::models::{Investor, Match, ScoringWeights, Startup};
use chrono::{DateTime, Utc};

/// Result of scoring one subject against a roster
#[derive(Debug)]
pub struct MatchResult {
    pub matches: Vec<Match>,
    pub total_candidates: usize,
}

/// Scores a subject against every counterpart on the roster
///
/// Each pair is scored independently, so the output is a complete fresh
/// match set for the subject, ordered by score (descending) then counterpart
/// id. Candidates with a blank id are skipped since they cannot be stored.
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
}

impl Matcher {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a single pair, stamping the result with `now`
    pub fn score_pair(&self, startup: &Startup, investor: &Investor, now: DateTime<Utc>) -> Match {
        let breakdown = calculate_match_score(startup, investor, &self.weights);

        Match {
            startup_id: startup.id.clone(),
            investor_id: investor.id.clone(),
            match_score: breakdown.score,
            confidence_level: breakdown.confidence,
            reasoning: compose_reasons(startup, investor, breakdown.score),
            created_at: now,
        }
    }

    /// Fresh match set for a startup against every investor
    pub fn match_startup(&self, startup: &Startup, investors: &[Investor], now: DateTime<Utc>) -> MatchResult {
        let mut matches: Vec<Match> = investors
            .iter()
            .filter(|investor| !investor.id.trim().is_empty())
            .map(|investor| self.score_pair(startup, investor, now))
            .collect();

        matches.sort_by(|a, b| {
            b.match_score
                .cmp(&a.match_score)
                .then_with(|| a.investor_id.cmp(&b.investor_id))
        });
        matches.dedup_by(|a, b| a.investor_id == b.investor_id);

        MatchResult {
            matches,
            total_candidates: investors.len(),
        }
    }

    /// Fresh match set for an investor against every startup
    pub fn match_investor(&self, investor: &Investor, startups: &[Startup], now: DateTime<Utc>) -> MatchResult {
        let mut matches: Vec<Match> = startups
            .iter()
            .filter(|startup| !startup.id.trim().is_empty())
            .map(|startup| self.score_pair(startup, investor, now))
            .collect();

        matches.sort_by(|a, b| {
            b.match_score
                .cmp(&a.match_score)
                .then_with(|| a.startup_id.cmp(&b.startup_id))
        });
        matches.dedup_by(|a, b| a.startup_id == b.startup_id);

        MatchResult {
            matches,
            total_candidates: startups.len(),
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConfidenceLevel;

    fn create_startup() -> Startup {
        Startup {
            id: "s1".to_string(),
            name: "Acme".to_string(),
            sectors: vec!["Fintech".to_string(), "AI".to_string()],
            stage: Some(2),
            total_god_score: Some(78.0),
            ..Default::default()
        }
    }

    fn create_investor(id: &str, sectors: &[&str], stages: &[&str]) -> Investor {
        Investor {
            id: id.to_string(),
            name: format!("Investor {}", id),
            sectors: sectors.iter().map(|s| s.to_string()).collect(),
            stages: stages.iter().map(|s| s.to_string()).collect(),
            check_size_min: Some(500_000.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_score_pair_carries_reasons() {
        let matcher = Matcher::with_default_weights();
        let m = matcher.score_pair(&create_startup(), &create_investor("i1", &["Fintech"], &["Seed"]), Utc::now());

        assert_eq!(m.match_score, 99);
        assert_eq!(m.confidence_level, ConfidenceLevel::High);
        assert_eq!(m.reasoning.len(), 3);
        assert_eq!(m.reasoning[0], "Sector fit: Fintech");
    }

    #[test]
    fn test_match_startup_orders_and_skips_blank_ids() {
        let matcher = Matcher::with_default_weights();
        let investors = vec![
            create_investor("b", &["Health"], &["Series B"]),
            create_investor("a", &["Fintech"], &["Seed"]),
            create_investor(" ", &["Fintech"], &["Seed"]),
            create_investor("c", &["Health"], &["Series B"]),
        ];

        let result = matcher.match_startup(&create_startup(), &investors, Utc::now());

        assert_eq!(result.total_candidates, 4);
        let ids: Vec<&str> = result.matches.iter().map(|m| m.investor_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(result.matches.iter().all(|m| m.startup_id == "s1"));
    }

    #[test]
    fn test_match_investor_scores_every_startup() {
        let matcher = Matcher::with_default_weights();
        let investor = create_investor("i1", &["Fintech"], &["Seed"]);
        let mut other = create_startup();
        other.id = "s2".to_string();
        other.sectors = vec!["Gaming".to_string()];

        let result = matcher.match_investor(&investor, &[create_startup(), other], Utc::now());

        assert_eq!(result.matches.len(), 2);
        assert_eq!(result.matches[0].startup_id, "s1");
        assert!(result.matches[0].match_score > result.matches[1].match_score);
    }

    #[test]
    fn test_empty_roster() {
        let matcher = Matcher::default();
        let result = matcher.match_startup(&create_startup(), &[], Utc::now());
        assert!(result.matches.is_empty());
        assert_eq!(result.total_candidates, 0);
    }
}
