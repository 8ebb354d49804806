use crate::core::ranking::SmartFilter;
use crate::models::ScoringWeights;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
///
/// Every section has defaults, so an empty configuration reproduces the
/// documented scoring and visibility behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub entity_store: EntityStoreSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub rematch: RematchSettings,
    #[serde(default)]
    pub share: ShareSettings,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub text_generation: TextGenerationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Document database holding the startup and investor rosters
#[derive(Debug, Clone, Deserialize)]
pub struct EntityStoreSettings {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub database_id: String,
    #[serde(default = "default_startups_collection")]
    pub startups_collection: String,
    #[serde(default = "default_investors_collection")]
    pub investors_collection: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EntityStoreSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            project_id: String::new(),
            database_id: String::new(),
            startups_collection: default_startups_collection(),
            investors_collection: default_investors_collection(),
            page_size: default_page_size(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_startups_collection() -> String { "startups".to_string() }
fn default_investors_collection() -> String { "investors".to_string() }
fn default_page_size() -> u32 { 100 }
fn default_request_timeout_secs() -> u64 { 10 }

/// Match store. `memory://` selects the in-process store.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_url")]
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: None,
            min_connections: None,
            acquire_timeout_secs: None,
            idle_timeout_secs: None,
        }
    }
}

impl DatabaseSettings {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}

fn default_database_url() -> String { "memory://".to_string() }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    /// L2 is skipped entirely when unset
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

/// Bonus constants of the additive scorer
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    #[serde(default = "default_base")]
    pub base: i32,
    #[serde(default = "default_sector_bonus")]
    pub sector: i32,
    #[serde(default = "default_additional_sector_bonus")]
    pub additional_sector: i32,
    #[serde(default = "default_additional_sector_cap")]
    pub additional_sector_cap: i32,
    #[serde(default = "default_stage_bonus")]
    pub stage: i32,
    #[serde(default = "default_god_bonus")]
    pub god_score: i32,
    #[serde(default = "default_god_threshold")]
    pub god_score_threshold: f64,
    #[serde(default = "default_check_size_bonus")]
    pub check_size: i32,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            base: default_base(),
            sector: default_sector_bonus(),
            additional_sector: default_additional_sector_bonus(),
            additional_sector_cap: default_additional_sector_cap(),
            stage: default_stage_bonus(),
            god_score: default_god_bonus(),
            god_score_threshold: default_god_threshold(),
            check_size: default_check_size_bonus(),
        }
    }
}

impl ScoringSettings {
    pub fn weights(&self) -> ScoringWeights {
        ScoringWeights {
            base: self.base,
            sector: self.sector,
            additional_sector: self.additional_sector,
            additional_sector_cap: self.additional_sector_cap,
            stage: self.stage,
            god_score: self.god_score,
            god_score_threshold: self.god_score_threshold,
            check_size: self.check_size,
        }
    }
}

fn default_base() -> i32 { 50 }
fn default_sector_bonus() -> i32 { 20 }
fn default_additional_sector_bonus() -> i32 { 5 }
fn default_additional_sector_cap() -> i32 { 10 }
fn default_stage_bonus() -> i32 { 15 }
fn default_god_bonus() -> i32 { 10 }
fn default_god_threshold() -> f64 { 70.0 }
fn default_check_size_bonus() -> i32 { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_smart_floor")]
    pub smart_floor: f64,
    #[serde(default = "default_smart_percentile")]
    pub smart_percentile: f64,
    #[serde(default = "default_smart_min_samples")]
    pub smart_min_samples: usize,
    #[serde(default = "default_page_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_page_limit")]
    pub max_limit: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            smart_floor: default_smart_floor(),
            smart_percentile: default_smart_percentile(),
            smart_min_samples: default_smart_min_samples(),
            default_limit: default_page_limit(),
            max_limit: default_max_page_limit(),
        }
    }
}

impl MatchingSettings {
    pub fn smart_filter(&self) -> SmartFilter {
        SmartFilter {
            floor: self.smart_floor,
            percentile: self.smart_percentile,
            min_samples: self.smart_min_samples,
        }
    }

    /// Requested page size, defaulted and clamped to `1..=max_limit`
    pub fn page_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).clamp(1, self.max_limit.max(1))
    }
}

fn default_smart_floor() -> f64 { 60.0 }
fn default_smart_percentile() -> f64 { 0.75 }
fn default_smart_min_samples() -> usize { 4 }
fn default_page_limit() -> usize { 50 }
fn default_max_page_limit() -> usize { 200 }

#[derive(Debug, Clone, Deserialize)]
pub struct RematchSettings {
    #[serde(default = "default_free_rematches")]
    pub free_allowance: u32,
}

impl Default for RematchSettings {
    fn default() -> Self {
        Self {
            free_allowance: default_free_rematches(),
        }
    }
}

fn default_free_rematches() -> u32 { crate::core::throttle::DEFAULT_FREE_REMATCHES }

#[derive(Debug, Clone, Deserialize)]
pub struct ShareSettings {
    #[serde(default = "default_share_ttl_days")]
    pub ttl_days: i64,
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "default_share_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_share_limit")]
    pub max_limit: usize,
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            ttl_days: default_share_ttl_days(),
            public_base_url: default_public_base_url(),
            default_limit: default_share_limit(),
            max_limit: default_max_share_limit(),
        }
    }
}

fn default_share_ttl_days() -> i64 { crate::core::artifacts::SHARE_TTL_DAYS }
fn default_public_base_url() -> String { "http://localhost:8080".to_string() }
fn default_share_limit() -> usize { 10 }
fn default_max_share_limit() -> usize { 100 }

#[derive(Debug, Clone, Deserialize)]
pub struct ExportSettings {
    #[serde(default = "default_export_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_export_limit")]
    pub max_limit: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            default_limit: default_export_limit(),
            max_limit: default_max_export_limit(),
        }
    }
}

fn default_export_limit() -> usize { crate::core::artifacts::DEFAULT_EXPORT_LIMIT }
fn default_max_export_limit() -> usize { 500 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub jwt_secret: String,
}

/// OpenAI-compatible chat completion endpoint used for deal memos
#[derive(Debug, Clone, Deserialize)]
pub struct TextGenerationSettings {
    #[serde(default = "default_text_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_text_model")]
    pub model: String,
    #[serde(default = "default_text_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for TextGenerationSettings {
    fn default() -> Self {
        Self {
            endpoint: default_text_endpoint(),
            api_key: String::new(),
            model: default_text_model(),
            timeout_secs: default_text_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_text_endpoint() -> String { "https://api.openai.com/v1".to_string() }
fn default_text_model() -> String { "gpt-4o-mini".to_string() }
fn default_text_timeout_secs() -> u64 { 30 }
fn default_max_tokens() -> u32 { 600 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with HOTMATCH__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., HOTMATCH__SERVER__PORT -> server.port
            .add_source(env_source())
            .build()?;

        apply_overrides(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        apply_overrides(settings)?.try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("HOTMATCH")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Conventional unprefixed variables win over everything else
fn apply_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }
    if let Ok(redis_url) = env::var("REDIS_URL") {
        builder = builder.set_override("cache.redis_url", redis_url)?;
    }
    if let Ok(secret) = env::var("JWT_SECRET") {
        builder = builder.set_override("auth.jwt_secret", secret)?;
    }

    builder.build()
}
