use crate::models::{
    CheckSizeRange, Counterpart, CounterpartView, Investor, InvestorView, MatchRecord, MatchView,
    Startup, StartupView, Tier, TractionView,
};

/// A gated feature of the match views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    UnlimitedMatches,
    RevealIdentity,
    CheckSize,
    Portfolio,
    Reasoning,
    Confidence,
    Export,
    UnlimitedRematch,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::UnlimitedMatches,
        Capability::RevealIdentity,
        Capability::CheckSize,
        Capability::Portfolio,
        Capability::Reasoning,
        Capability::Confidence,
        Capability::Export,
        Capability::UnlimitedRematch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::UnlimitedMatches => "unlimited_matches",
            Capability::RevealIdentity => "identity",
            Capability::CheckSize => "check_size",
            Capability::Portfolio => "portfolio",
            Capability::Reasoning => "reasoning",
            Capability::Confidence => "confidence",
            Capability::Export => "export",
            Capability::UnlimitedRematch => "rematch",
        }
    }
}

/// What a plan tier unlocks. Pure function of the tier, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityProfile {
    pub tier: Tier,
    /// `None` for unlimited
    pub max_matches: Option<usize>,
    pub reveal_identity: bool,
    pub show_check_size: bool,
    pub show_portfolio: bool,
    pub show_reasoning: bool,
    pub show_confidence: bool,
    pub can_export: bool,
    pub unlimited_rematch: bool,
}

impl VisibilityProfile {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free => Self {
                tier,
                max_matches: Some(3),
                reveal_identity: false,
                show_check_size: false,
                show_portfolio: false,
                show_reasoning: false,
                show_confidence: false,
                can_export: false,
                unlimited_rematch: false,
            },
            Tier::Pro => Self {
                tier,
                max_matches: Some(10),
                reveal_identity: true,
                show_check_size: true,
                show_portfolio: true,
                show_reasoning: false,
                show_confidence: false,
                can_export: false,
                unlimited_rematch: true,
            },
            Tier::Elite => Self {
                tier,
                max_matches: None,
                reveal_identity: true,
                show_check_size: true,
                show_portfolio: true,
                show_reasoning: true,
                show_confidence: true,
                can_export: true,
                unlimited_rematch: true,
            },
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::UnlimitedMatches => self.max_matches.is_none(),
            Capability::RevealIdentity => self.reveal_identity,
            Capability::CheckSize => self.show_check_size,
            Capability::Portfolio => self.show_portfolio,
            Capability::Reasoning => self.show_reasoning,
            Capability::Confidence => self.show_confidence,
            Capability::Export => self.can_export,
            Capability::UnlimitedRematch => self.unlimited_rematch,
        }
    }
}

/// Lowest tier that unlocks a capability
pub fn required_tier(capability: Capability) -> Tier {
    Tier::ALL
        .into_iter()
        .find(|tier| VisibilityProfile::for_tier(*tier).allows(capability))
        .unwrap_or(Tier::Elite)
}

/// Label shown in place of a masked identity. Never empty.
pub fn masked_label(counterpart: &Counterpart, rank: usize) -> String {
    match counterpart {
        Counterpart::Investor(investor) => match investor.firm_name() {
            Some(firm) => format!("Investor at {}", firm),
            None => format!("Investor #{}", rank),
        },
        Counterpart::Startup(startup) => {
            match startup.sectors.iter().map(|s| s.trim()).find(|s| !s.is_empty()) {
                Some(sector) => format!("Startup in {}", sector),
                None => format!("Startup #{}", rank),
            }
        }
    }
}

/// Project a ranked match into the view a tier is allowed to see
///
/// `rank` is the 1-based position in the ranked list and is assigned before
/// masking, so it is the same for every tier.
pub fn project(record: &MatchRecord, profile: &VisibilityProfile, rank: usize) -> MatchView {
    let masked = !profile.reveal_identity;

    let counterpart = match &record.counterpart {
        Counterpart::Investor(investor) => {
            CounterpartView::Investor(investor_view(investor, &record.counterpart, profile, rank))
        }
        Counterpart::Startup(startup) => {
            CounterpartView::Startup(startup_view(startup, &record.counterpart, profile, rank))
        }
    };

    MatchView {
        rank,
        match_score: record.matched.match_score,
        identity_masked: masked,
        confidence_level: profile.show_confidence.then_some(record.matched.confidence_level),
        reasoning: profile.show_reasoning.then(|| record.matched.reasoning.clone()),
        created_at: record.matched.created_at,
        counterpart,
    }
}

/// Cap a ranked list to the tier and project every entry
///
/// `offset` and `limit` page through the capped list; ranks stay absolute.
pub fn project_page(
    ranked: &[MatchRecord],
    profile: &VisibilityProfile,
    offset: usize,
    limit: usize,
) -> Vec<MatchView> {
    let visible = profile.max_matches.map_or(ranked.len(), |m| m.min(ranked.len()));

    ranked[..visible]
        .iter()
        .enumerate()
        .skip(offset)
        .take(limit)
        .map(|(index, record)| project(record, profile, index + 1))
        .collect()
}

fn investor_view(
    investor: &Investor,
    counterpart: &Counterpart,
    profile: &VisibilityProfile,
    rank: usize,
) -> InvestorView {
    let reveal = profile.reveal_identity;

    InvestorView {
        id: reveal.then(|| investor.id.clone()),
        display_name: if reveal && !investor.name.trim().is_empty() {
            investor.name.clone()
        } else {
            masked_label(counterpart, rank)
        },
        firm: investor.firm_name().map(str::to_string),
        title: reveal.then(|| investor.title.clone()).flatten(),
        photo_url: reveal.then(|| investor.photo_url.clone()).flatten(),
        linkedin_url: reveal.then(|| investor.linkedin_url.clone()).flatten(),
        twitter_url: reveal.then(|| investor.twitter_url.clone()).flatten(),
        sectors: investor.sectors.clone(),
        stages: investor.stages.clone(),
        investor_tier: investor.investor_tier.clone(),
        check_size: (profile.show_check_size && investor.has_check_size()).then(|| CheckSizeRange {
            min: investor.check_size_min,
            max: investor.check_size_max,
        }),
        notable_investments: profile
            .show_portfolio
            .then(|| investor.notable_investments.clone()),
        leads_rounds: investor.leads_rounds,
    }
}

fn startup_view(
    startup: &Startup,
    counterpart: &Counterpart,
    profile: &VisibilityProfile,
    rank: usize,
) -> StartupView {
    let reveal = profile.reveal_identity;

    StartupView {
        id: reveal.then(|| startup.id.clone()),
        display_name: if reveal && !startup.name.trim().is_empty() {
            startup.name.clone()
        } else {
            masked_label(counterpart, rank)
        },
        tagline: reveal.then(|| startup.tagline.clone()).flatten(),
        website: reveal.then(|| startup.website.clone()).flatten(),
        location: reveal.then(|| startup.location.clone()).flatten(),
        sectors: startup.sectors.clone(),
        stage: startup.stage_label().map(str::to_string),
        god_score: startup.total_god_score,
        raise_amount: profile.show_check_size.then_some(startup.raise_amount).flatten(),
        traction: profile.show_portfolio.then(|| TractionView {
            has_revenue: startup.has_revenue(),
            mrr: startup.mrr,
            arr: startup.arr,
            growth_rate_monthly: startup.growth_rate_monthly,
            customer_count: startup.customer_count,
            team_size: startup.team_size,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceLevel, Match};
    use chrono::Utc;

    fn investor_record(id: &str, firm: Option<&str>) -> MatchRecord {
        MatchRecord {
            matched: Match {
                startup_id: "s1".to_string(),
                investor_id: id.to_string(),
                match_score: 88,
                confidence_level: ConfidenceLevel::High,
                reasoning: vec!["Sector fit: Fintech".to_string()],
                created_at: Utc::now(),
            },
            counterpart: Counterpart::Investor(Investor {
                id: id.to_string(),
                name: "Jane Doe".to_string(),
                firm: firm.map(str::to_string),
                check_size_min: Some(500_000.0),
                check_size_max: Some(2_000_000.0),
                notable_investments: vec!["Stripe".to_string()],
                linkedin_url: Some("https://linkedin.com/in/jane".to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_capabilities_are_monotonic() {
        for (i, lower) in Tier::ALL.iter().enumerate() {
            for higher in &Tier::ALL[i..] {
                let lo = VisibilityProfile::for_tier(*lower);
                let hi = VisibilityProfile::for_tier(*higher);
                for cap in Capability::ALL {
                    assert!(!lo.allows(cap) || hi.allows(cap), "{:?} lost {:?}", higher, cap);
                }
                let lo_max = lo.max_matches.unwrap_or(usize::MAX);
                let hi_max = hi.max_matches.unwrap_or(usize::MAX);
                assert!(hi_max >= lo_max);
            }
        }
    }

    #[test]
    fn test_required_tiers() {
        assert_eq!(required_tier(Capability::Export), Tier::Elite);
        assert_eq!(required_tier(Capability::Reasoning), Tier::Elite);
        assert_eq!(required_tier(Capability::CheckSize), Tier::Pro);
        assert_eq!(required_tier(Capability::RevealIdentity), Tier::Pro);
    }

    #[test]
    fn test_free_tier_masks_identity() {
        let profile = VisibilityProfile::for_tier(Tier::Free);
        let view = project(&investor_record("i1", Some("Alpha Ventures")), &profile, 1);

        assert!(view.identity_masked);
        assert!(view.confidence_level.is_none());
        assert!(view.reasoning.is_none());
        match view.counterpart {
            CounterpartView::Investor(inv) => {
                assert_eq!(inv.display_name, "Investor at Alpha Ventures");
                assert!(inv.id.is_none());
                assert!(inv.linkedin_url.is_none());
                assert!(inv.check_size.is_none());
                assert!(inv.notable_investments.is_none());
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_masked_label_falls_back_to_rank() {
        let profile = VisibilityProfile::for_tier(Tier::Free);
        let view = project(&investor_record("i1", Some("  ")), &profile, 4);
        assert_eq!(view.counterpart.display_name(), "Investor #4");

        let startup = Counterpart::Startup(Startup::default());
        assert_eq!(masked_label(&startup, 2), "Startup #2");
    }

    #[test]
    fn test_pro_and_elite_views() {
        let record = investor_record("i1", Some("Alpha Ventures"));

        let pro = project(&record, &VisibilityProfile::for_tier(Tier::Pro), 1);
        assert!(!pro.identity_masked);
        assert!(pro.reasoning.is_none());
        assert_eq!(pro.counterpart.display_name(), "Jane Doe");

        let elite = project(&record, &VisibilityProfile::for_tier(Tier::Elite), 1);
        assert_eq!(elite.confidence_level, Some(ConfidenceLevel::High));
        assert_eq!(elite.reasoning.as_deref(), Some(&["Sector fit: Fintech".to_string()][..]));
    }

    #[test]
    fn test_project_page_caps_by_tier() {
        let ranked: Vec<MatchRecord> = (0..15).map(|i| investor_record(&i.to_string(), None)).collect();

        let free = project_page(&ranked, &VisibilityProfile::for_tier(Tier::Free), 0, 50);
        let pro = project_page(&ranked, &VisibilityProfile::for_tier(Tier::Pro), 0, 50);
        let elite = project_page(&ranked, &VisibilityProfile::for_tier(Tier::Elite), 0, 50);

        assert_eq!(free.len(), 3);
        assert_eq!(pro.len(), 10);
        assert_eq!(elite.len(), 15);
        assert_eq!(free[2].counterpart.display_name(), "Investor #3");

        let page = project_page(&ranked, &VisibilityProfile::for_tier(Tier::Elite), 5, 5);
        assert_eq!(page[0].rank, 6);
    }
}
