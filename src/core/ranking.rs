use crate::core::filters::{matches_filters, MatchFilters};
use crate::models::{Counterpart, MatchRecord};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::str::FromStr;

/// Selectable sort key for match lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Score,
    GodScore,
    InvestorScore,
    Name,
    Recent,
}

impl SortKey {
    /// Alphabetical sorts ascend, everything else descends
    pub fn default_order(&self) -> SortOrder {
        match self {
            SortKey::Name => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "score" | "match_score" => Ok(SortKey::Score),
            "god_score" | "godscore" => Ok(SortKey::GodScore),
            "investor_score" | "investor_tier" => Ok(SortKey::InvestorScore),
            "name" | "alphabetical" => Ok(SortKey::Name),
            "recent" | "created_at" => Ok(SortKey::Recent),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Smart default threshold: `max(floor, percentile of all scores)`
#[derive(Debug, Clone, Copy)]
pub struct SmartFilter {
    pub floor: f64,
    /// Percentile in `0.0..=1.0`
    pub percentile: f64,
    /// Below this many samples only the floor applies
    pub min_samples: usize,
}

impl Default for SmartFilter {
    fn default() -> Self {
        Self {
            floor: 60.0,
            percentile: 0.75,
            min_samples: 4,
        }
    }
}

impl SmartFilter {
    pub fn threshold(&self, scores: &[u8]) -> f64 {
        if scores.len() < self.min_samples {
            return self.floor;
        }
        percentile(scores, self.percentile)
            .map(|p| p.max(self.floor))
            .unwrap_or(self.floor)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RankOptions {
    pub sort_key: SortKey,
    /// Overrides the key's default order
    pub sort_order: Option<SortOrder>,
    /// `None` disables smart filtering
    pub smart: Option<SmartFilter>,
}

/// Ranked candidates plus the counts callers need for "showing N of M" messaging
#[derive(Debug, Clone)]
pub struct RankedMatches {
    pub matches: Vec<MatchRecord>,
    pub total: usize,
    pub filtered_total: usize,
    pub smart_threshold: Option<f64>,
}

/// Filter and sort a candidate set
///
/// The smart threshold is computed over the full candidate set before the
/// explicit filters run, so it does not shift as filters narrow the list.
pub fn rank_and_filter(
    candidates: Vec<MatchRecord>,
    filters: &MatchFilters,
    options: &RankOptions,
    now: DateTime<Utc>,
) -> RankedMatches {
    let total = candidates.len();

    let smart_threshold = options.smart.map(|smart| {
        let scores: Vec<u8> = candidates.iter().map(MatchRecord::score).collect();
        smart.threshold(&scores)
    });

    let mut matches: Vec<MatchRecord> = candidates
        .into_iter()
        .filter(|record| smart_threshold.map_or(true, |t| f64::from(record.score()) >= t))
        .filter(|record| matches_filters(record, filters, now))
        .collect();

    let order = options.sort_order.unwrap_or_else(|| options.sort_key.default_order());
    matches.sort_by(|a, b| compare(a, b, options.sort_key, order));

    RankedMatches {
        filtered_total: matches.len(),
        matches,
        total,
        smart_threshold,
    }
}

fn compare(a: &MatchRecord, b: &MatchRecord, key: SortKey, order: SortOrder) -> Ordering {
    let primary = match key {
        SortKey::Score => a.score().cmp(&b.score()),
        SortKey::GodScore => cmp_f64(god_score(a), god_score(b)),
        SortKey::InvestorScore => cmp_f64(investor_score(a), investor_score(b)),
        SortKey::Name => a
            .counterpart
            .name()
            .to_lowercase()
            .cmp(&b.counterpart.name().to_lowercase()),
        SortKey::Recent => a.matched.created_at.cmp(&b.matched.created_at),
    };

    let primary = match order {
        SortOrder::Desc => primary.reverse(),
        SortOrder::Asc => primary,
    };

    primary
        .then_with(|| b.score().cmp(&a.score()))
        .then_with(|| a.counterpart.id().cmp(b.counterpart.id()))
}

#[inline]
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn god_score(record: &MatchRecord) -> f64 {
    match &record.counterpart {
        Counterpart::Startup(s) => s.god_score(),
        Counterpart::Investor(_) => 0.0,
    }
}

fn investor_score(record: &MatchRecord) -> f64 {
    match &record.counterpart {
        Counterpart::Investor(i) => i.investor_score.unwrap_or(0.0),
        Counterpart::Startup(_) => 0.0,
    }
}

/// Linear-interpolation percentile (`p` in `0.0..=1.0`), `None` for no samples
pub fn percentile(scores: &[u8], p: f64) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }

    let mut sorted: Vec<f64> = scores.iter().map(|&s| f64::from(s)).collect();
    sorted.sort_by(|a, b| cmp_f64(*a, *b));

    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceLevel, Investor, Match};
    use chrono::Duration;

    fn record(id: &str, name: &str, score: u8) -> MatchRecord {
        MatchRecord {
            matched: Match {
                startup_id: "s1".to_string(),
                investor_id: id.to_string(),
                match_score: score,
                confidence_level: ConfidenceLevel::Medium,
                reasoning: vec![],
                created_at: Utc::now(),
            },
            counterpart: Counterpart::Investor(Investor {
                id: id.to_string(),
                name: name.to_string(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        assert_eq!(percentile(&[40, 62, 70, 95], 0.75), Some(76.25));
        assert_eq!(percentile(&[80], 0.75), Some(80.0));
        assert_eq!(percentile(&[], 0.75), None);
    }

    #[test]
    fn test_smart_filter_reference_case() {
        let candidates = vec![
            record("a", "A", 95),
            record("b", "B", 70),
            record("c", "C", 62),
            record("d", "D", 40),
        ];
        let options = RankOptions {
            smart: Some(SmartFilter::default()),
            ..Default::default()
        };

        let ranked = rank_and_filter(candidates, &MatchFilters::default(), &options, Utc::now());

        assert_eq!(ranked.total, 4);
        assert_eq!(ranked.filtered_total, 1);
        assert_eq!(ranked.matches[0].score(), 95);
        assert!(ranked.smart_threshold.unwrap() > 70.0);
    }

    #[test]
    fn test_small_sets_use_floor_only() {
        let smart = SmartFilter::default();
        assert_eq!(smart.threshold(&[95, 90, 85]), 60.0);
        assert_eq!(smart.threshold(&[]), 60.0);
        assert_eq!(smart.threshold(&[50, 50, 50, 50]), 60.0);
    }

    #[test]
    fn test_sort_by_name_ascends() {
        let candidates = vec![record("1", "charlie", 90), record("2", "Alice", 60), record("3", "bob", 75)];
        let options = RankOptions {
            sort_key: SortKey::Name,
            ..Default::default()
        };

        let ranked = rank_and_filter(candidates, &MatchFilters::default(), &options, Utc::now());
        let names: Vec<&str> = ranked.matches.iter().map(|m| m.counterpart.name()).collect();
        assert_eq!(names, vec!["Alice", "bob", "charlie"]);
    }

    #[test]
    fn test_sort_by_score_descends_with_stable_ties() {
        let candidates = vec![record("b", "B", 80), record("a", "A", 80), record("c", "C", 90)];
        let ranked = rank_and_filter(candidates, &MatchFilters::default(), &RankOptions::default(), Utc::now());
        let ids: Vec<&str> = ranked.matches.iter().map(|m| m.counterpart.id()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_explicit_ascending_score() {
        let candidates = vec![record("a", "A", 90), record("b", "B", 70)];
        let options = RankOptions {
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        };
        let ranked = rank_and_filter(candidates, &MatchFilters::default(), &options, Utc::now());
        assert_eq!(ranked.matches[0].score(), 70);
    }

    #[test]
    fn test_recent_sort() {
        let mut older = record("a", "A", 90);
        older.matched.created_at = Utc::now() - Duration::days(2);
        let newer = record("b", "B", 70);

        let options = RankOptions {
            sort_key: SortKey::Recent,
            ..Default::default()
        };
        let ranked = rank_and_filter(vec![older, newer], &MatchFilters::default(), &options, Utc::now());
        assert_eq!(ranked.matches[0].counterpart.id(), "b");
    }

    #[test]
    fn test_filtered_total_never_exceeds_total() {
        let candidates: Vec<MatchRecord> = (0..20).map(|i| record(&i.to_string(), "X", 40 + i as u8 * 3)).collect();
        let options = RankOptions {
            smart: Some(SmartFilter::default()),
            ..Default::default()
        };
        let filters = MatchFilters {
            min_score: Some(70),
            ..Default::default()
        };
        let ranked = rank_and_filter(candidates, &filters, &options, Utc::now());
        assert!(ranked.filtered_total <= ranked.total);
        assert!(ranked.matches.iter().all(|m| f64::from(m.score()) >= ranked.smart_threshold.unwrap()));
    }
}
