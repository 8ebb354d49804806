use crate::core::scoring::{sector_overlap, stage_alignment};
use crate::models::{Investor, Startup};

/// Maximum number of reasons attached to a match
pub const MAX_REASONS: usize = 3;

const TOP_TIER_SCORE: u8 = 85;
const STRONG_POTENTIAL_SCORE: u8 = 75;
const FALLBACK_REASON: &str = "Thesis alignment";

/// Build up to three short justifications for a match
///
/// Reasons follow a fixed priority: sector fit, stage alignment, check size,
/// then commentary on the score itself. The list is never empty.
pub fn compose_reasons(startup: &Startup, investor: &Investor, score: u8) -> Vec<String> {
    let mut reasons = Vec::with_capacity(MAX_REASONS);

    if let Some((_, investor_sector)) = sector_overlap(&startup.sectors, &investor.sectors).first() {
        reasons.push(format!("Sector fit: {}", investor_sector));
    }

    if let Some(stage) = stage_alignment(startup, investor) {
        reasons.push(format!("Stage alignment: {}", stage));
    }

    if let Some(range) = describe_check_size(investor.check_size_min, investor.check_size_max) {
        reasons.push(format!("Check size: {}", range));
    }

    if score >= TOP_TIER_SCORE {
        reasons.push("Top-tier match score".to_string());
    } else if score >= STRONG_POTENTIAL_SCORE {
        reasons.push("Strong potential".to_string());
    }

    reasons.truncate(MAX_REASONS);

    if reasons.is_empty() {
        reasons.push(FALLBACK_REASON.to_string());
    }

    reasons
}

/// Render a check-size range, `None` when neither bound is declared
pub fn describe_check_size(min: Option<f64>, max: Option<f64>) -> Option<String> {
    match (min, max) {
        (Some(min), Some(max)) => Some(format!("{}-{}", format_amount(min), format_amount(max))),
        (Some(min), None) => Some(format!("from {}", format_amount(min))),
        (None, Some(max)) => Some(format!("up to {}", format_amount(max))),
        (None, None) => None,
    }
}

/// Compact dollar amount: `$2.5M`, `$750K`, `$900`
pub fn format_amount(amount: f64) -> String {
    let abs = amount.abs();
    let (value, suffix) = if abs >= 1_000_000.0 {
        (amount / 1_000_000.0, "M")
    } else if abs >= 1_000.0 {
        (amount / 1_000.0, "K")
    } else {
        (amount, "")
    };

    let mut text = format!("{:.1}", value);
    if text.ends_with(".0") {
        text.truncate(text.len() - 2);
    }
    format!("${}{}", text, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn startup() -> Startup {
        Startup {
            id: "s1".to_string(),
            name: "Acme".to_string(),
            sectors: vec!["FinTech".to_string(), "AI".to_string()],
            stage: Some(2),
            total_god_score: Some(75.0),
            ..Default::default()
        }
    }

    fn investor() -> Investor {
        Investor {
            id: "i1".to_string(),
            name: "Jane Doe".to_string(),
            sectors: vec!["Fintech".to_string()],
            stages: vec!["Seed".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_reference_reasons() {
        let reasons = compose_reasons(&startup(), &investor(), 95);
        assert_eq!(
            reasons,
            vec!["Sector fit: Fintech", "Stage alignment: Seed", "Top-tier match score"]
        );
    }

    #[test]
    fn test_reasons_capped_at_three() {
        let mut inv = investor();
        inv.check_size_min = Some(1_000_000.0);
        inv.check_size_max = Some(5_000_000.0);

        let reasons = compose_reasons(&startup(), &inv, 99);
        assert_eq!(reasons.len(), 3);
        assert_eq!(reasons[2], "Check size: $1M-$5M");
    }

    #[test]
    fn test_fallback_when_nothing_matches() {
        let empty_investor = Investor {
            id: "i2".to_string(),
            name: "Nobody".to_string(),
            ..Default::default()
        };
        let reasons = compose_reasons(&Startup::default(), &empty_investor, 50);
        assert_eq!(reasons, vec!["Thesis alignment"]);
    }

    #[test]
    fn test_strong_potential_band() {
        let empty_investor = Investor::default();
        let reasons = compose_reasons(&Startup::default(), &empty_investor, 78);
        assert_eq!(reasons, vec!["Strong potential"]);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(2_500_000.0), "$2.5M");
        assert_eq!(format_amount(750_000.0), "$750K");
        assert_eq!(format_amount(1_000_000.0), "$1M");
        assert_eq!(format_amount(900.0), "$900");
        assert_eq!(describe_check_size(None, Some(250_000.0)), Some("up to $250K".to_string()));
    }
}
