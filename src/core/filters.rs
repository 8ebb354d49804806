use crate::core::scoring::stage_accepted;
use crate::models::{ConfidenceLevel, Counterpart, Investor, MatchRecord, Startup};
use chrono::{DateTime, Duration, Utc};
use std::str::FromStr;

/// Window for the "active investor" flag
const ACTIVE_WINDOW_DAYS: i64 = 183;

/// Conjunctive filters over a candidate set
///
/// Every populated field must pass. Fields that do not apply to the
/// counterpart kind (e.g. `leads_rounds` on a startup) are ignored.
#[derive(Debug, Clone, Default)]
pub struct MatchFilters {
    pub min_score: Option<u8>,
    pub max_score: Option<u8>,
    pub confidence_level: Option<ConfidenceLevel>,
    pub sectors: Vec<String>,
    /// Investor stage names, or startup stage ordinals/labels
    pub stages: Vec<String>,
    pub geography: Vec<String>,
    /// Investor tier label
    pub counterpart_tier: Option<String>,
    /// GOD score band of a startup counterpart
    pub god_band: Option<GodBand>,
    pub leads_rounds: Option<bool>,
    pub active_recently: Option<bool>,
    pub has_revenue: Option<bool>,
    pub min_god_score: Option<f64>,
    pub min_mrr: Option<f64>,
    pub min_arr: Option<f64>,
    pub min_growth_rate: Option<f64>,
    pub min_customers: Option<u32>,
    pub min_team_size: Option<u32>,
}

/// Check a candidate against every populated filter
#[inline]
pub fn matches_filters(record: &MatchRecord, filters: &MatchFilters, now: DateTime<Utc>) -> bool {
    let score = record.score();

    if filters.min_score.is_some_and(|min| score < min) {
        return false;
    }
    if filters.max_score.is_some_and(|max| score > max) {
        return false;
    }
    if filters
        .confidence_level
        .is_some_and(|level| record.matched.confidence_level != level)
    {
        return false;
    }
    if !filters.sectors.is_empty() && !lists_overlap(&filters.sectors, record.counterpart.sectors()) {
        return false;
    }

    match &record.counterpart {
        Counterpart::Investor(investor) => matches_investor(investor, filters, now),
        Counterpart::Startup(startup) => matches_startup(startup, filters),
    }
}

fn matches_investor(investor: &Investor, filters: &MatchFilters, now: DateTime<Utc>) -> bool {
    if !filters.stages.is_empty()
        && !filters.stages.iter().any(|wanted| stage_accepted(&investor.stages, wanted))
    {
        return false;
    }

    if !filters.geography.is_empty() && !lists_overlap(&filters.geography, &investor.geography_focus) {
        return false;
    }

    if let Some(tier) = &filters.counterpart_tier {
        let same = investor
            .investor_tier
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(tier));
        if !same {
            return false;
        }
    }

    if let Some(leads) = filters.leads_rounds {
        if investor.leads_rounds.unwrap_or(false) != leads {
            return false;
        }
    }

    if filters.active_recently == Some(true) {
        let cutoff = now - Duration::days(ACTIVE_WINDOW_DAYS);
        if !investor.last_investment_date.is_some_and(|d| d >= cutoff) {
            return false;
        }
    }

    true
}

fn matches_startup(startup: &Startup, filters: &MatchFilters) -> bool {
    if !filters.stages.is_empty() && !startup_stage_selected(startup, &filters.stages) {
        return false;
    }

    if !filters.geography.is_empty() {
        let location = startup.location.as_deref().unwrap_or("").to_lowercase();
        let hit = !location.is_empty()
            && filters.geography.iter().any(|g| {
                let g = g.to_lowercase();
                location.contains(&g) || g.contains(&location)
            });
        if !hit {
            return false;
        }
    }

    if filters.god_band.is_some_and(|band| !band.contains(startup.god_score())) {
        return false;
    }

    if let Some(wanted) = filters.has_revenue {
        if startup.has_revenue() != wanted {
            return false;
        }
    }

    at_least(startup.total_god_score, filters.min_god_score)
        && at_least(startup.mrr, filters.min_mrr)
        && at_least(startup.annual_revenue(), filters.min_arr)
        && at_least(startup.growth_rate_monthly, filters.min_growth_rate)
        && at_least(startup.customer_count.map(f64::from), filters.min_customers.map(f64::from))
        && at_least(startup.team_size.map(f64::from), filters.min_team_size.map(f64::from))
}

/// A floor passes when unset; an unknown value never satisfies a set floor
#[inline]
fn at_least(value: Option<f64>, floor: Option<f64>) -> bool {
    match floor {
        None => true,
        Some(floor) => value.is_some_and(|v| v >= floor),
    }
}

fn startup_stage_selected(startup: &Startup, wanted: &[String]) -> bool {
    let Some(stage) = startup.stage else {
        return false;
    };
    let label = startup.stage_label().unwrap_or("").to_lowercase();

    wanted.iter().any(|w| match w.trim().parse::<u8>() {
        Ok(ordinal) => ordinal == stage,
        Err(_) => !label.is_empty() && label == w.trim().to_lowercase(),
    })
}

/// GOD score bands: elite 80+, high 75-79, quality 70-74, good 60-69
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GodBand {
    Elite,
    High,
    Quality,
    Good,
}

impl GodBand {
    pub fn contains(&self, god: f64) -> bool {
        match self {
            GodBand::Elite => god >= 80.0,
            GodBand::High => (75.0..80.0).contains(&god),
            GodBand::Quality => (70.0..75.0).contains(&god),
            GodBand::Good => (60.0..70.0).contains(&god),
        }
    }
}

impl FromStr for GodBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "elite" => Ok(GodBand::Elite),
            "high" => Ok(GodBand::High),
            "quality" => Ok(GodBand::Quality),
            "good" => Ok(GodBand::Good),
            other => Err(format!("unknown GOD tier: {}", other)),
        }
    }
}

/// Case-insensitive substring overlap between two label lists
fn lists_overlap(wanted: &[String], present: &[String]) -> bool {
    wanted.iter().any(|w| {
        let w = w.to_lowercase();
        present.iter().any(|p| {
            let p = p.to_lowercase();
            p.contains(&w) || w.contains(&p)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Match;

    fn record(score: u8, counterpart: Counterpart) -> MatchRecord {
        MatchRecord {
            matched: Match {
                startup_id: "s1".to_string(),
                investor_id: "i1".to_string(),
                match_score: score,
                confidence_level: ConfidenceLevel::Medium,
                reasoning: vec![],
                created_at: Utc::now(),
            },
            counterpart,
        }
    }

    fn investor() -> Investor {
        Investor {
            id: "i1".to_string(),
            name: "Jane".to_string(),
            sectors: vec!["Fintech".to_string()],
            stages: vec!["Seed".to_string(), "Series A".to_string()],
            leads_rounds: Some(true),
            investor_tier: Some("elite".to_string()),
            last_investment_date: Some(Utc::now() - Duration::days(30)),
            ..Default::default()
        }
    }

    fn startup() -> Startup {
        Startup {
            id: "s2".to_string(),
            name: "Acme".to_string(),
            sectors: vec!["AI".to_string()],
            stage: Some(2),
            total_god_score: Some(77.0),
            mrr: Some(20_000.0),
            growth_rate_monthly: Some(12.0),
            location: Some("Berlin, Germany".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_score_bounds() {
        let rec = record(70, Counterpart::Investor(investor()));
        let now = Utc::now();

        assert!(matches_filters(&rec, &MatchFilters { min_score: Some(70), ..Default::default() }, now));
        assert!(!matches_filters(&rec, &MatchFilters { min_score: Some(71), ..Default::default() }, now));
        assert!(!matches_filters(&rec, &MatchFilters { max_score: Some(69), ..Default::default() }, now));
    }

    #[test]
    fn test_investor_flags() {
        let rec = record(80, Counterpart::Investor(investor()));
        let now = Utc::now();

        let filters = MatchFilters {
            sectors: vec!["fin".to_string()],
            leads_rounds: Some(true),
            active_recently: Some(true),
            counterpart_tier: Some("Elite".to_string()),
            stages: vec!["seed".to_string()],
            ..Default::default()
        };
        assert!(matches_filters(&rec, &filters, now));

        let stale = MatchFilters {
            active_recently: Some(true),
            ..Default::default()
        };
        assert!(!matches_filters(&rec, &stale, now + Duration::days(365)));
    }

    #[test]
    fn test_startup_traction_floors() {
        let rec = record(80, Counterpart::Startup(startup()));
        let now = Utc::now();

        let passing = MatchFilters {
            has_revenue: Some(true),
            min_mrr: Some(10_000.0),
            min_arr: Some(200_000.0),
            min_growth_rate: Some(10.0),
            min_god_score: Some(75.0),
            god_band: Some(GodBand::High),
            stages: vec!["2".to_string()],
            geography: vec!["berlin".to_string()],
            ..Default::default()
        };
        assert!(matches_filters(&rec, &passing, now));

        let unknown_team = MatchFilters {
            min_team_size: Some(3),
            ..Default::default()
        };
        assert!(!matches_filters(&rec, &unknown_team, now));
    }

    #[test]
    fn test_investor_stage_uses_segment_match() {
        let pre_seed_only = Investor {
            stages: vec!["Pre-Seed".to_string()],
            ..investor()
        };
        let rec = record(80, Counterpart::Investor(pre_seed_only));
        let now = Utc::now();

        let seed = MatchFilters {
            stages: vec!["seed".to_string()],
            ..Default::default()
        };
        assert!(!matches_filters(&rec, &seed, now));

        let pre_seed = MatchFilters {
            stages: vec!["pre seed".to_string()],
            ..Default::default()
        };
        assert!(matches_filters(&rec, &pre_seed, now));

        let compound = record(
            80,
            Counterpart::Investor(Investor {
                stages: vec!["Seed / Series A".to_string()],
                ..investor()
            }),
        );
        assert!(matches_filters(&compound, &MatchFilters { stages: vec!["series a".to_string()], ..Default::default() }, now));
    }

    #[test]
    fn test_god_bands() {
        assert!(GodBand::Elite.contains(80.0));
        assert!(!GodBand::High.contains(80.0));
        assert!(GodBand::Quality.contains(74.9));
        assert!(!GodBand::Good.contains(59.9));
        assert_eq!("Quality".parse::<GodBand>(), Ok(GodBand::Quality));
        assert!("platinum".parse::<GodBand>().is_err());

        let rec = record(80, Counterpart::Startup(startup()));
        let quality = MatchFilters {
            god_band: Some(GodBand::Quality),
            ..Default::default()
        };
        assert!(!matches_filters(&rec, &quality, Utc::now()));
    }

    #[test]
    fn test_flags_ignored_for_other_kind() {
        let rec = record(80, Counterpart::Startup(startup()));
        let filters = MatchFilters {
            leads_rounds: Some(true),
            active_recently: Some(true),
            ..Default::default()
        };
        assert!(matches_filters(&rec, &filters, Utc::now()));
    }
}
