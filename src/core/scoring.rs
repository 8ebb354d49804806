use crate::models::{ConfidenceLevel, Investor, ScoringWeights, Startup};

/// Highest score the calculator will ever report
pub const MAX_SCORE: u8 = 99;

const HIGH_CONFIDENCE_SCORE: u8 = 80;
const MEDIUM_CONFIDENCE_SCORE: u8 = 60;
const HIGH_CONFIDENCE_FACTORS: usize = 2;

/// One independent criterion that contributed to a score
#[derive(Debug, Clone, PartialEq)]
pub enum MatchFactor {
    /// Overlapping sectors as `(startup sector, investor sector)` pairs
    SectorOverlap(Vec<(String, String)>),
    StageAlignment(&'static str),
    QualityScore(f64),
    CheckSizeDeclared,
}

/// Score, confidence and the evidence behind them
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub score: u8,
    pub confidence: ConfidenceLevel,
    pub factors: Vec<MatchFactor>,
}

/// Calculate a compatibility score (0-99) for a startup/investor pair
///
/// Scoring is additive from `weights.base`:
/// - sector overlap: `weights.sector`, plus `weights.additional_sector` for each
///   further distinct overlapping sector up to `weights.additional_sector_cap`
/// - stage alignment: `weights.stage`
/// - GOD score at or above the threshold: `weights.god_score`
/// - declared check-size range: `weights.check_size`
///
/// Missing data never fails the calculation, it just earns no bonus.
pub fn calculate_match_score(
    startup: &Startup,
    investor: &Investor,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    let mut total = weights.base;
    let mut factors = Vec::with_capacity(4);

    let overlap = sector_overlap(&startup.sectors, &investor.sectors);
    if !overlap.is_empty() {
        let extra = (overlap.len() as i32 - 1) * weights.additional_sector;
        total += weights.sector + extra.min(weights.additional_sector_cap);
        factors.push(MatchFactor::SectorOverlap(overlap));
    }

    if let Some(stage) = stage_alignment(startup, investor) {
        total += weights.stage;
        factors.push(MatchFactor::StageAlignment(stage));
    }

    if let Some(god) = startup.total_god_score {
        if god >= weights.god_score_threshold {
            total += weights.god_score;
            factors.push(MatchFactor::QualityScore(god));
        }
    }

    if investor.has_check_size() {
        total += weights.check_size;
        factors.push(MatchFactor::CheckSizeDeclared);
    }

    let score = total.clamp(0, MAX_SCORE as i32) as u8;

    ScoreBreakdown {
        score,
        confidence: derive_confidence(score, factors.len()),
        factors,
    }
}

/// Confidence as a pure function of the score and the number of contributing criteria
#[inline]
pub fn derive_confidence(score: u8, factor_count: usize) -> ConfidenceLevel {
    if score >= HIGH_CONFIDENCE_SCORE && factor_count >= HIGH_CONFIDENCE_FACTORS {
        ConfidenceLevel::High
    } else if score >= MEDIUM_CONFIDENCE_SCORE {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Distinct startup sectors overlapping any investor sector
///
/// Overlap is a case-insensitive substring match in either direction. Each
/// entry pairs the startup sector with the first investor sector it matched.
pub fn sector_overlap(startup_sectors: &[String], investor_sectors: &[String]) -> Vec<(String, String)> {
    let investor_lower: Vec<(String, &String)> = investor_sectors
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| (s.trim().to_lowercase(), s))
        .collect();

    let mut seen: Vec<String> = Vec::new();
    let mut overlap = Vec::new();

    for sector in startup_sectors {
        let lower = sector.trim().to_lowercase();
        if lower.is_empty() || seen.contains(&lower) {
            continue;
        }
        seen.push(lower.clone());

        let hit = investor_lower
            .iter()
            .find(|(inv, _)| inv.contains(lower.as_str()) || lower.contains(inv.as_str()));

        if let Some((_, original)) = hit {
            overlap.push((sector.trim().to_string(), original.trim().to_string()));
        }
    }

    overlap
}

/// The startup's stage label when the investor accepts that stage
///
/// Labels are compared after normalising to lowercase alphanumerics, either
/// against a whole investor entry or one segment of a compound entry such as
/// `"Seed / Series A"`.
pub fn stage_alignment(startup: &Startup, investor: &Investor) -> Option<&'static str> {
    let label = startup.stage_label()?;
    stage_accepted(&investor.stages, label).then_some(label)
}

/// Whether any investor stage entry covers `stage`, compared normalised
pub fn stage_accepted(entries: &[String], stage: &str) -> bool {
    let wanted = normalize_stage(stage);
    if wanted.is_empty() {
        return false;
    }

    entries.iter().any(|entry| {
        normalize_stage(entry) == wanted
            || entry
                .split(['/', ',', '&', '|', ';'])
                .any(|segment| normalize_stage(segment) == wanted)
    })
}

#[inline]
fn normalize_stage(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
