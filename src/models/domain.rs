use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Human-readable labels for the funding stage ordinals (1..=5)
const STAGE_LABELS: [&str; 5] = ["Pre-seed", "Seed", "Series A", "Series B", "Series C+"];

/// Label for a funding stage ordinal, `None` when out of range
pub fn stage_label(stage: u8) -> Option<&'static str> {
    match stage {
        1..=5 => Some(STAGE_LABELS[(stage - 1) as usize]),
        _ => None,
    }
}

/// Startup record as supplied by the entity store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Startup {
    #[serde(alias = "$id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub sectors: Vec<String>,
    /// Funding stage ordinal, 1 = pre-seed .. 5 = series C+
    #[serde(default)]
    pub stage: Option<u8>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "god_score")]
    pub total_god_score: Option<f64>,
    #[serde(default)]
    pub has_revenue: Option<bool>,
    #[serde(default)]
    pub mrr: Option<f64>,
    #[serde(default)]
    pub arr: Option<f64>,
    #[serde(default)]
    pub growth_rate_monthly: Option<f64>,
    #[serde(default)]
    pub customer_count: Option<u32>,
    #[serde(default)]
    pub team_size: Option<u32>,
    #[serde(default)]
    pub raise_amount: Option<f64>,
}

impl Startup {
    pub fn stage_label(&self) -> Option<&'static str> {
        self.stage.and_then(stage_label)
    }

    pub fn god_score(&self) -> f64 {
        self.total_god_score.unwrap_or(0.0)
    }

    /// Revenue flag, falling back to positive MRR/ARR when the flag is absent
    pub fn has_revenue(&self) -> bool {
        self.has_revenue.unwrap_or_else(|| {
            self.mrr.unwrap_or(0.0) > 0.0 || self.arr.unwrap_or(0.0) > 0.0
        })
    }

    /// ARR as reported, otherwise derived from MRR
    pub fn annual_revenue(&self) -> Option<f64> {
        self.arr.or_else(|| self.mrr.map(|m| m * 12.0))
    }
}

/// Investor record as supplied by the entity store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Investor {
    #[serde(alias = "$id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub firm: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub investment_thesis: Option<String>,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default, alias = "stage", deserialize_with = "one_or_many")]
    pub stages: Vec<String>,
    #[serde(default)]
    pub check_size_min: Option<f64>,
    #[serde(default)]
    pub check_size_max: Option<f64>,
    #[serde(default)]
    pub geography_focus: Vec<String>,
    #[serde(default)]
    pub leads_rounds: Option<bool>,
    #[serde(default)]
    pub notable_investments: Vec<String>,
    #[serde(default)]
    pub investor_tier: Option<String>,
    #[serde(default)]
    pub investor_score: Option<f64>,
    #[serde(default)]
    pub last_investment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub twitter_url: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl Investor {
    pub fn has_check_size(&self) -> bool {
        self.check_size_min.is_some() || self.check_size_max.is_some()
    }

    /// Firm name, ignoring blank values
    pub fn firm_name(&self) -> Option<&str> {
        self.firm.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }
}

/// Accepts either a single string or a list of strings
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null,
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.trim().is_empty() => Vec::new(),
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null => Vec::new(),
    })
}

/// Coarse summary of how much independent evidence supports a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfidenceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(ConfidenceLevel::Low),
            "medium" => Ok(ConfidenceLevel::Medium),
            "high" => Ok(ConfidenceLevel::High),
            other => Err(format!("unknown confidence level: {}", other)),
        }
    }
}

/// Subscription plan. Ordering follows capability: free < pro < elite
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Elite,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Pro, Tier::Elite];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Elite => "elite",
        }
    }

    pub fn is_paid(&self) -> bool {
        *self > Tier::Free
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            "elite" => Ok(Tier::Elite),
            other => Err(format!("unknown plan: {}", other)),
        }
    }
}

/// Which side of the marketplace a match list is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Startup,
    Investor,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Startup => "startup",
            SubjectKind::Investor => "investor",
        }
    }
}

/// Persisted result of scoring one (startup, investor) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub startup_id: String,
    pub investor_id: String,
    pub match_score: u8,
    pub confidence_level: ConfidenceLevel,
    pub reasoning: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// The other party of a match, as seen from the subject
#[derive(Debug, Clone)]
pub enum Counterpart {
    Investor(Investor),
    Startup(Startup),
}

impl Counterpart {
    pub fn id(&self) -> &str {
        match self {
            Counterpart::Investor(i) => &i.id,
            Counterpart::Startup(s) => &s.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Counterpart::Investor(i) => &i.name,
            Counterpart::Startup(s) => &s.name,
        }
    }

    pub fn sectors(&self) -> &[String] {
        match self {
            Counterpart::Investor(i) => &i.sectors,
            Counterpart::Startup(s) => &s.sectors,
        }
    }
}

/// A stored match joined with its counterpart record
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub matched: Match,
    pub counterpart: Counterpart,
}

impl MatchRecord {
    pub fn score(&self) -> u8 {
        self.matched.match_score
    }
}

/// Bonus constants for the additive scorer
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub base: i32,
    pub sector: i32,
    /// Bonus per additional distinct overlapping sector beyond the first
    pub additional_sector: i32,
    pub additional_sector_cap: i32,
    pub stage: i32,
    pub god_score: i32,
    pub god_score_threshold: f64,
    pub check_size: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 50,
            sector: 20,
            additional_sector: 5,
            additional_sector_cap: 10,
            stage: 15,
            god_score: 10,
            god_score_threshold: 70.0,
            check_size: 5,
        }
    }
}
