use crate::models::{ConfidenceLevel, CountBucket, Counterpart, MatchRecord, MatchStats};
use std::collections::HashMap;

const TOP_SECTORS: usize = 5;

const SCORE_BUCKETS: [(&str, u8); 6] = [
    ("90+", 90),
    ("80-89", 80),
    ("70-79", 70),
    ("60-69", 60),
    ("50-59", 50),
    ("<50", 0),
];

const GOD_BUCKETS: [(&str, f64); 5] = [
    ("80+", 80.0),
    ("70-79", 70.0),
    ("60-69", 60.0),
    ("50-59", 50.0),
    ("<50", f64::NEG_INFINITY),
];

/// Aggregate a subject's stored matches
///
/// Only counts and averages leave this function, never identities, so the
/// result is safe to serve to every tier. GOD aggregates are filled in only
/// when the counterparts are startups.
pub fn summarize(records: &[MatchRecord]) -> MatchStats {
    let total = records.len();

    let mut high = 0;
    let mut medium = 0;
    let mut low = 0;
    let mut score_sum = 0u64;
    let mut sectors: HashMap<String, (String, usize)> = HashMap::new();
    let mut categories: HashMap<String, usize> = HashMap::new();
    let mut score_counts = [0usize; SCORE_BUCKETS.len()];
    let mut god_scores = Vec::new();

    for record in records {
        match record.matched.confidence_level {
            ConfidenceLevel::High => high += 1,
            ConfidenceLevel::Medium => medium += 1,
            ConfidenceLevel::Low => low += 1,
        }

        let score = record.score();
        score_sum += u64::from(score);
        if let Some(i) = SCORE_BUCKETS.iter().position(|(_, floor)| score >= *floor) {
            score_counts[i] += 1;
        }

        for sector in record.counterpart.sectors() {
            let trimmed = sector.trim();
            if trimmed.is_empty() {
                continue;
            }
            // Group case-insensitively, label with the first spelling seen
            sectors
                .entry(trimmed.to_lowercase())
                .or_insert_with(|| (trimmed.to_string(), 0))
                .1 += 1;
        }

        let category = match &record.counterpart {
            Counterpart::Investor(investor) => investor
                .investor_tier
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or("unrated")
                .to_string(),
            Counterpart::Startup(startup) => startup.stage_label().unwrap_or("Unknown").to_string(),
        };
        *categories.entry(category).or_default() += 1;

        if let Counterpart::Startup(startup) = &record.counterpart {
            if let Some(god) = startup.total_god_score {
                god_scores.push(god);
            }
        }
    }

    let average_score = if total == 0 {
        0.0
    } else {
        round1(score_sum as f64 / total as f64)
    };

    let startup_side = records
        .first()
        .is_some_and(|r| matches!(r.counterpart, Counterpart::Startup(_)));

    let (average_god_score, god_score_distribution) = if startup_side {
        let average = (!god_scores.is_empty())
            .then(|| round1(god_scores.iter().sum::<f64>() / god_scores.len() as f64));
        (average, Some(god_distribution(&god_scores)))
    } else {
        (None, None)
    };

    MatchStats {
        total,
        high_confidence: high,
        medium_confidence: medium,
        low_confidence: low,
        average_score,
        average_god_score,
        top_sectors: top_n(sectors.into_values().collect(), TOP_SECTORS),
        top_categories: top_n(categories.into_iter().collect(), usize::MAX),
        score_distribution: SCORE_BUCKETS
            .iter()
            .zip(score_counts)
            .map(|((label, _), count)| CountBucket {
                label: label.to_string(),
                count,
            })
            .collect(),
        god_score_distribution,
    }
}

fn god_distribution(scores: &[f64]) -> Vec<CountBucket> {
    let mut counts = [0usize; GOD_BUCKETS.len()];
    for god in scores {
        if let Some(i) = GOD_BUCKETS.iter().position(|(_, floor)| *god >= *floor) {
            counts[i] += 1;
        }
    }
    GOD_BUCKETS
        .iter()
        .zip(counts)
        .map(|((label, _), count)| CountBucket {
            label: label.to_string(),
            count,
        })
        .collect()
}

/// Highest counts first, ties alphabetical
fn top_n(mut entries: Vec<(String, usize)>, n: usize) -> Vec<CountBucket> {
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
        .into_iter()
        .take(n)
        .map(|(label, count)| CountBucket { label, count })
        .collect()
}

#[inline]
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Investor, Match, Startup};
    use chrono::Utc;

    fn matched(score: u8, confidence: ConfidenceLevel) -> Match {
        Match {
            startup_id: "s".to_string(),
            investor_id: "i".to_string(),
            match_score: score,
            confidence_level: confidence,
            reasoning: vec![],
            created_at: Utc::now(),
        }
    }

    fn investor_record(score: u8, confidence: ConfidenceLevel, sectors: &[&str], tier: Option<&str>) -> MatchRecord {
        MatchRecord {
            matched: matched(score, confidence),
            counterpart: Counterpart::Investor(Investor {
                id: format!("i{}", score),
                name: "Name".to_string(),
                sectors: sectors.iter().map(|s| s.to_string()).collect(),
                investor_tier: tier.map(str::to_string),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_empty_set() {
        let stats = summarize(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_score, 0.0);
        assert!(stats.score_distribution.iter().all(|b| b.count == 0));
        assert!(stats.god_score_distribution.is_none());
    }

    #[test]
    fn test_investor_counterparts() {
        let records = vec![
            investor_record(95, ConfidenceLevel::High, &["Fintech", "AI"], Some("elite")),
            investor_record(72, ConfidenceLevel::Medium, &["fintech"], None),
            investor_record(40, ConfidenceLevel::Low, &["Health"], Some("elite")),
        ];
        let stats = summarize(&records);

        assert_eq!(stats.total, 3);
        assert_eq!((stats.high_confidence, stats.medium_confidence, stats.low_confidence), (1, 1, 1));
        assert_eq!(stats.average_score, 69.0);
        assert_eq!(stats.top_sectors[0].label, "Fintech");
        assert_eq!(stats.top_sectors[0].count, 2);
        assert_eq!(stats.top_categories[0].label, "elite");
        assert_eq!(stats.top_categories[0].count, 2);

        let buckets: Vec<usize> = stats.score_distribution.iter().map(|b| b.count).collect();
        assert_eq!(buckets, vec![1, 0, 1, 0, 0, 1]);
        assert!(stats.average_god_score.is_none());
    }

    #[test]
    fn test_startup_counterparts_include_god() {
        let records: Vec<MatchRecord> = [(81.0, 2), (74.5, 2), (55.0, 3)]
            .into_iter()
            .map(|(god, stage)| MatchRecord {
                matched: matched(70, ConfidenceLevel::Medium),
                counterpart: Counterpart::Startup(Startup {
                    id: format!("s{}", god),
                    name: "S".to_string(),
                    stage: Some(stage),
                    total_god_score: Some(god),
                    ..Default::default()
                }),
            })
            .collect();
        let stats = summarize(&records);

        assert_eq!(stats.average_god_score, Some(70.2));
        let god: Vec<usize> = stats.god_score_distribution.unwrap().iter().map(|b| b.count).collect();
        assert_eq!(god, vec![1, 1, 0, 1, 0]);
        assert_eq!(stats.top_categories[0].label, "Seed");
    }
}
