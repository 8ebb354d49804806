use crate::core::reasoning::{describe_check_size, format_amount};
use crate::models::{CounterpartView, MatchView, Startup};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifetime of a share link
pub const SHARE_TTL_DAYS: i64 = 7;

/// Default row count for CSV exports
pub const DEFAULT_EXPORT_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

const INVESTOR_COLUMNS: [&str; 10] = [
    "Rank",
    "Investor",
    "Firm",
    "Match Score",
    "Confidence",
    "Check Size",
    "Sectors",
    "Stages",
    "Notable Investments",
    "Reasoning",
];

const STARTUP_COLUMNS: [&str; 13] = [
    "Rank",
    "Startup",
    "Match Score",
    "Confidence",
    "GOD Score",
    "Sectors",
    "Stage",
    "Location",
    "Raise Amount",
    "MRR",
    "ARR",
    "Growth Rate",
    "Reasoning",
];

/// Serialize already-projected views to CSV
///
/// Fields the view withholds are written as empty cells, so the export never
/// shows more than the on-screen list. `investor_rows` picks the column set
/// and is used for the header when `views` is empty.
pub fn export_csv(views: &[MatchView], investor_rows: bool) -> Result<Vec<u8>, ArtifactError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    if investor_rows {
        writer.write_record(INVESTOR_COLUMNS)?;
    } else {
        writer.write_record(STARTUP_COLUMNS)?;
    }

    for view in views {
        let confidence = view.confidence_level.map(|c| c.to_string()).unwrap_or_default();
        let reasoning = view.reasoning.as_ref().map(|r| r.join("; ")).unwrap_or_default();

        match &view.counterpart {
            CounterpartView::Investor(inv) => writer.write_record([
                view.rank.to_string(),
                inv.display_name.clone(),
                inv.firm.clone().unwrap_or_default(),
                view.match_score.to_string(),
                confidence,
                inv.check_size
                    .as_ref()
                    .and_then(|c| describe_check_size(c.min, c.max))
                    .unwrap_or_default(),
                inv.sectors.join("; "),
                inv.stages.join("; "),
                inv.notable_investments
                    .as_ref()
                    .map(|n| n.join("; "))
                    .unwrap_or_default(),
                reasoning,
            ])?,
            CounterpartView::Startup(st) => {
                let traction = st.traction.as_ref();
                writer.write_record([
                    view.rank.to_string(),
                    st.display_name.clone(),
                    view.match_score.to_string(),
                    confidence,
                    st.god_score.map(|g| format!("{:.0}", g)).unwrap_or_default(),
                    st.sectors.join("; "),
                    st.stage.clone().unwrap_or_default(),
                    st.location.clone().unwrap_or_default(),
                    st.raise_amount.map(format_amount).unwrap_or_default(),
                    traction.and_then(|t| t.mrr).map(format_amount).unwrap_or_default(),
                    traction.and_then(|t| t.arr).map(format_amount).unwrap_or_default(),
                    traction
                        .and_then(|t| t.growth_rate_monthly)
                        .map(|g| format!("{}%", g))
                        .unwrap_or_default(),
                    reasoning,
                ])?
            }
        }
    }

    writer.flush()?;
    writer.into_inner().map_err(|e| ArtifactError::Io(e.into_error()))
}

/// Download filename derived from the subject's name
///
/// Only ASCII alphanumerics survive; runs of anything else collapse to a
/// single dash. Falls back to `matches.csv` when nothing usable remains.
pub fn export_filename(subject_name: &str) -> String {
    let mut slug = String::with_capacity(subject_name.len());
    for c in subject_name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug: String = slug.chars().take(60).collect();
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        "matches.csv".to_string()
    } else {
        format!("{}-matches.csv", slug)
    }
}

/// Prompt handed to the text-generation collaborator for a deal memo
pub fn memo_prompt(startup: &Startup, views: &[MatchView]) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "Write a concise deal memo (under 250 words) summarising the investor matches below \
         for the startup. Use a neutral, professional tone suitable for outside communication. \
         Do not invent figures that are not listed.\n\n",
    );

    prompt.push_str(&format!("Startup: {}\n", startup.name));
    if let Some(tagline) = startup.tagline.as_deref().filter(|t| !t.trim().is_empty()) {
        prompt.push_str(&format!("Tagline: {}\n", tagline));
    }
    if !startup.sectors.is_empty() {
        prompt.push_str(&format!("Sectors: {}\n", startup.sectors.join(", ")));
    }
    if let Some(stage) = startup.stage_label() {
        prompt.push_str(&format!("Stage: {}\n", stage));
    }
    if let Some(raise) = startup.raise_amount {
        prompt.push_str(&format!("Raising: {}\n", format_amount(raise)));
    }

    prompt.push_str(&format!("\nTop {} matches:\n", views.len()));
    for view in views {
        prompt.push_str(&format!(
            "{}. {} (score {}",
            view.rank,
            view.counterpart.display_name(),
            view.match_score
        ));
        if let Some(confidence) = view.confidence_level {
            prompt.push_str(&format!(", {} confidence", confidence));
        }
        prompt.push(')');
        if let CounterpartView::Investor(inv) = &view.counterpart {
            if let Some(firm) = &inv.firm {
                prompt.push_str(&format!(" - {}", firm));
            }
            if let Some(range) = inv.check_size.as_ref().and_then(|c| describe_check_size(c.min, c.max)) {
                prompt.push_str(&format!(", checks {}", range));
            }
        }
        if let Some(reasons) = &view.reasoning {
            prompt.push_str(&format!(": {}", reasons.join("; ")));
        }
        prompt.push('\n');
    }

    prompt
}

/// Frozen top-N snapshot shared behind an opaque id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareLink {
    pub share_id: String,
    pub startup_id: String,
    pub startup_name: String,
    pub created_by: String,
    pub snapshot: Vec<MatchView>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ShareLink {
    pub fn new(
        startup: &Startup,
        created_by: &str,
        snapshot: Vec<MatchView>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            share_id: uuid::Uuid::new_v4().simple().to_string(),
            startup_id: startup.id.clone(),
            startup_name: startup.name.clone(),
            created_by: created_by.to_string(),
            snapshot,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Expiry is checked lazily on read; the link is gone from `expires_at` on
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn url(&self, public_base_url: &str) -> String {
        format!("{}/share/{}", public_base_url.trim_end_matches('/'), self.share_id)
    }
}
