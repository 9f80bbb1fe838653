//! Configuration loading for the charts service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `CHARTS_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schedule;

mod source;

pub use source::{ProjectOwner, ProjectSource, SourceError, SourceSettings};

const ENV_PREFIX: &str = "CHARTS_";
const REDACTED: &str = "[REDACTED]";

/// Application configuration derived from `CHARTS_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
    /// Cron expression deciding which minutes run a data pull
    #[serde(default)]
    pub data_pull_job_cron: String,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<ProjectSource>,
}

/// Settings for the upstream project API client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct GitHubConfig {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    /// Fallback bearer token for sources that do not carry their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_github_page_size")]
    pub page_size: u32,
    #[serde(default = "default_github_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub fields: ProjectFieldNames,
}

/// Names of the project board fields read on every pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ProjectFieldNames {
    #[serde(default = "default_status_field")]
    pub status: String,
    #[serde(default = "default_iteration_field")]
    pub iteration: String,
    #[serde(default = "default_effort_field")]
    pub effort: String,
    #[serde(default = "default_remaining_field")]
    pub remaining: String,
}

/// Settings shared by the burndown and burnup reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ReportingConfig {
    /// Status that counts as finished work in burndown
    #[serde(default = "default_done_status")]
    pub done_status: String,
    #[serde(default = "default_burnup_lookback_days")]
    pub burnup_lookback_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            allowed_origin: default_allowed_origin(),
            static_dir: None,
            data_pull_job_cron: String::new(),
            github: GitHubConfig::default(),
            reporting: ReportingConfig::default(),
            sources: Vec::new(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            token: None,
            page_size: default_github_page_size(),
            timeout_ms: default_github_timeout_ms(),
            fields: ProjectFieldNames::default(),
        }
    }
}

impl Default for ProjectFieldNames {
    fn default() -> Self {
        Self {
            status: default_status_field(),
            iteration: default_iteration_field(),
            effort: default_effort_field(),
            remaining: default_remaining_field(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            done_status: default_done_status(),
            burnup_lookback_days: default_burnup_lookback_days(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Returns a redacted JSON representation (tokens are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.github.token.is_some() {
            config.github.token = Some(REDACTED.to_string());
        }
        for source in &mut config.sources {
            source.token = REDACTED.to_string();
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_pull_job_cron.trim().is_empty() {
            return Err(ConfigError::MissingDataPullCron);
        }
        if !schedule::is_valid(&self.data_pull_job_cron) {
            return Err(ConfigError::InvalidDataPullCron {
                value: self.data_pull_job_cron.clone(),
            });
        }

        if let Err(source) = url::Url::parse(&self.github.api_url) {
            return Err(ConfigError::InvalidGitHubApiUrl {
                value: self.github.api_url.clone(),
                source,
            });
        }

        if !(1..=100).contains(&self.github.page_size) {
            return Err(ConfigError::InvalidPageSize {
                value: self.github.page_size,
            });
        }

        if self.github.timeout_ms == 0 {
            return Err(ConfigError::InvalidGitHubTimeout);
        }

        if self.reporting.burnup_lookback_days == 0 {
            return Err(ConfigError::InvalidBurnupLookback);
        }

        if self.reporting.done_status.trim().is_empty() {
            return Err(ConfigError::MissingDoneStatus);
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/charts".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_allowed_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com/graphql".to_string()
}

fn default_github_page_size() -> u32 {
    50
}

fn default_github_timeout_ms() -> u64 {
    30_000
}

fn default_status_field() -> String {
    "Status".to_string()
}

fn default_iteration_field() -> String {
    "Iteration".to_string()
}

fn default_effort_field() -> String {
    "Effort".to_string()
}

fn default_remaining_field() -> String {
    "Remaining".to_string()
}

fn default_done_status() -> String {
    "Done".to_string()
}

fn default_burnup_lookback_days() -> u32 {
    30
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("a valid cron schedule is required; set CHARTS_DATA_PULL_JOB_CRON (e.g. \"0 * * * *\")")]
    MissingDataPullCron,
    #[error("invalid data pull cron expression '{value}'")]
    InvalidDataPullCron { value: String },
    #[error("invalid GitHub API url '{value}': {source}")]
    InvalidGitHubApiUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("GitHub page size must be between 1 and 100, got {value}")]
    InvalidPageSize { value: u32 },
    #[error("GitHub request timeout must be positive")]
    InvalidGitHubTimeout,
    #[error("burnup lookback must be at least one day")]
    InvalidBurnupLookback,
    #[error("done status name must not be empty")]
    MissingDoneStatus,
    #[error("invalid project source {index}: {source}")]
    InvalidSource {
        index: u32,
        #[source]
        source: SourceError,
    },
}

/// Loads configuration using layered `.env` files and `CHARTS_*` env vars.
///
/// Values containing spaces must be quoted in `.env` files, e.g.
/// `CHARTS_DATA_PULL_JOB_CRON="0 * * * *"`; an unquoted cron expression
/// fails to parse and aborts startup with [`ConfigError::EnvFile`].
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads, validates and returns the configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections = layered
            .remove("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = layered
            .remove("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);
        let allowed_origin = layered
            .remove("ALLOWED_ORIGIN")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_allowed_origin);
        let static_dir = layered
            .remove("STATIC_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let data_pull_job_cron = layered
            .remove("DATA_PULL_JOB_CRON")
            .map(|v| v.trim().to_string())
            .unwrap_or_default();

        let github_token = layered
            .remove("GITHUB_TOKEN")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let github = GitHubConfig {
            api_url: layered
                .remove("GITHUB_API_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_github_api_url),
            token: github_token,
            page_size: layered
                .remove("GITHUB_PAGE_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_github_page_size),
            timeout_ms: layered
                .remove("GITHUB_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_github_timeout_ms),
            fields: ProjectFieldNames {
                status: layered
                    .remove("STATUS_FIELD")
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(default_status_field),
                iteration: layered
                    .remove("ITERATION_FIELD")
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(default_iteration_field),
                effort: layered
                    .remove("EFFORT_FIELD")
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(default_effort_field),
                remaining: layered
                    .remove("REMAINING_FIELD")
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(default_remaining_field),
            },
        };

        let reporting = ReportingConfig {
            done_status: layered
                .remove("DONE_STATUS")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_done_status),
            burnup_lookback_days: layered
                .remove("BURNUP_LOOKBACK_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_burnup_lookback_days),
        };

        let sources = collect_sources(&layered, github.token.as_deref())?;

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            allowed_origin,
            static_dir,
            data_pull_job_cron,
            github,
            reporting,
            sources,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect `SOURCE_<N>_<SETTING>` entries into validated sources ordered by `N`.
fn collect_sources(
    layered: &BTreeMap<String, String>,
    default_token: Option<&str>,
) -> Result<Vec<ProjectSource>, ConfigError> {
    let mut entries: BTreeMap<u32, SourceSettings> = BTreeMap::new();

    for (key, value) in layered {
        let Some(rest) = key.strip_prefix("SOURCE_") else {
            continue;
        };
        let Some((index, setting)) = rest.split_once('_') else {
            continue;
        };
        let Ok(index) = index.parse::<u32>() else {
            continue;
        };

        let entry = entries.entry(index).or_default();
        match setting {
            "ORG" => entry.org = Some(value.clone()),
            "REPO_OWNER" => entry.repo_owner = Some(value.clone()),
            "REPO_NAME" => entry.repo_name = Some(value.clone()),
            "PROJECT" => entry.project = Some(value.clone()),
            "TOKEN" => entry.token = Some(value.clone()),
            _ => {
                // Unknown setting, ignore
            }
        }
    }

    entries
        .into_iter()
        .map(|(index, settings)| {
            settings
                .into_source(default_token)
                .map_err(|source| ConfigError::InvalidSource { index, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            data_pull_job_cron: "0 * * * *".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn default_config_requires_cron() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingDataPullCron));
    }

    #[test]
    fn malformed_cron_is_rejected() {
        let config = AppConfig {
            data_pull_job_cron: "*".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDataPullCron { .. })
        ));
    }

    #[test]
    fn page_size_bounds() {
        let mut config = valid_config();
        assert!(config.validate().is_ok());

        config.github.page_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPageSize { value: 0 })
        ));

        config.github.page_size = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_lookback_is_rejected() {
        let mut config = valid_config();
        config.reporting.burnup_lookback_days = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBurnupLookback)
        ));
    }

    #[test]
    fn sources_are_collected_in_index_order() {
        let mut layered = BTreeMap::new();
        layered.insert("SOURCE_2_REPO_OWNER".to_string(), "octo".to_string());
        layered.insert("SOURCE_2_REPO_NAME".to_string(), "widgets".to_string());
        layered.insert("SOURCE_2_PROJECT".to_string(), "4".to_string());
        layered.insert("SOURCE_1_ORG".to_string(), "acme".to_string());
        layered.insert("SOURCE_1_PROJECT".to_string(), "1".to_string());
        layered.insert("SOURCE_1_TOKEN".to_string(), "own-token".to_string());

        let sources = collect_sources(&layered, Some("shared-token")).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].key(), "acme/1");
        assert_eq!(sources[0].token, "own-token");
        assert_eq!(sources[1].key(), "octo/widgets/4");
        assert_eq!(sources[1].token, "shared-token");
    }

    #[test]
    fn invalid_source_reports_index() {
        let mut layered = BTreeMap::new();
        layered.insert("SOURCE_5_ORG".to_string(), "acme".to_string());
        layered.insert("SOURCE_5_TOKEN".to_string(), "t".to_string());

        let err = collect_sources(&layered, None).unwrap_err();
        match err {
            ConfigError::InvalidSource { index, source } => {
                assert_eq!(index, 5);
                assert_eq!(source, SourceError::MissingProject);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn redacted_json_hides_tokens() {
        let mut config = valid_config();
        config.github.token = Some("shared-secret".to_string());
        config.sources.push(ProjectSource {
            owner: ProjectOwner::Organization {
                login: "acme".to_string(),
            },
            project_number: 1,
            token: "source-secret".to_string(),
        });

        let json = config.redacted_json().unwrap();
        assert!(!json.contains("shared-secret"));
        assert!(!json.contains("source-secret"));
        assert!(json.contains(REDACTED));
    }
}
