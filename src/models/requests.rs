use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query string for `GET /api/matches/startup/{startupId}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartupMatchQuery {
    #[validate(range(max = 99))]
    pub min_score: Option<u8>,
    #[validate(range(max = 99))]
    pub max_score: Option<u8>,
    pub confidence_level: Option<String>,
    pub investor_tier: Option<String>,
    pub leads_rounds: Option<bool>,
    pub active_investor: Option<bool>,
    /// Comma-separated
    pub sectors: Option<String>,
    /// Comma-separated stage names
    pub stage: Option<String>,
    /// Comma-separated
    pub geography: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    #[serde(default)]
    pub show_all: bool,
}

/// Query string for `GET /api/matches/investor/{investorId}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InvestorMatchQuery {
    #[validate(range(max = 99))]
    pub min_score: Option<u8>,
    #[validate(range(max = 99))]
    pub max_score: Option<u8>,
    #[serde(rename = "minGODScore", alias = "minGodScore")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub min_god_score: Option<f64>,
    /// GOD band: `elite`, `high`, `quality` or `good`
    #[serde(rename = "godTier", alias = "tier")]
    pub god_tier: Option<String>,
    pub confidence_level: Option<String>,
    pub sectors: Option<String>,
    /// Comma-separated stage ordinals
    pub stage: Option<String>,
    pub geography: Option<String>,
    pub has_revenue: Option<bool>,
    #[serde(rename = "minMRR", alias = "minMrr")]
    pub min_mrr: Option<f64>,
    #[serde(rename = "minARR", alias = "minArr")]
    pub min_arr: Option<f64>,
    pub min_growth_rate: Option<f64>,
    pub min_customers: Option<u32>,
    pub min_team_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Query string for the startup-side CSV export and deal memo
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartupArtifactQuery {
    #[validate(length(min = 1))]
    pub startup_id: String,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<usize>,
}

/// Query string for the investor-side CSV export
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ExportLimitQuery {
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<usize>,
}

/// Body of `POST /api/share/matches`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateShareRequest {
    #[validate(length(min = 1))]
    pub startup_id: String,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

/// Splits a comma-separated query value, dropping blanks
pub fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(Some("Fintech, AI,,")), vec!["Fintech", "AI"]);
        assert!(split_list(None).is_empty());
        assert!(split_list(Some(" ")).is_empty());
    }

    #[test]
    fn test_limit_validation() {
        let query = StartupMatchQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert!(query.validate().is_err());

        let query = StartupMatchQuery {
            limit: Some(25),
            ..Default::default()
        };
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_investor_query_field_names() {
        let query: InvestorMatchQuery = serde_json::from_value(serde_json::json!({
            "minGODScore": 70.0,
            "minMRR": 5000.0,
            "hasRevenue": true,
        }))
        .unwrap();
        assert_eq!(query.min_god_score, Some(70.0));
        assert_eq!(query.min_mrr, Some(5000.0));
        assert_eq!(query.has_revenue, Some(true));
    }
}
