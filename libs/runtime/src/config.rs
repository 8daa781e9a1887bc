use anyhow::{bail, Context, Result};
use query_core::{SortDirection, DEFAULT_LIMIT, MAX_LIMIT};
use querykit_db::{FieldPolicy, LimitCfg, NamerKind, PolicyResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Application configuration: logging, list-query limits and the named
/// field policies list endpoints compile against.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Logging configuration (optional, uses defaults if None).
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
    /// Base directory for relative log file paths; the working directory when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default)]
    pub query: QueryConfig,
    /// Policy name → allowed searchable, sortable and filterable fields.
    #[serde(default)]
    pub policies: BTreeMap<String, PolicyConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct QueryConfig {
    pub default_limit: u64,
    pub max_limit: u64,
    /// How bound parameters are named: `sequential` or `random`.
    pub param_names: NamerKind,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            param_names: NamerKind::default(),
        }
    }
}

impl QueryConfig {
    pub fn limits(&self) -> LimitCfg {
        LimitCfg {
            default: self.default_limit,
            max: self.max_limit,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default)]
    pub searchable: Vec<String>,
    #[serde(default)]
    pub sortable: Vec<String>,
    #[serde(default)]
    pub filterable: Vec<String>,
    /// Field → column overrides; unlisted fields use their own name.
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiebreaker: Option<TiebreakerConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TiebreakerConfig {
    pub field: String,
    #[serde(default = "ascending")]
    pub direction: SortDirection,
}

fn ascending() -> SortDirection {
    SortDirection::Ascending
}

impl PolicyConfig {
    pub fn build(&self) -> PolicyResult<FieldPolicy> {
        let mut builder = FieldPolicy::builder()
            .searchable(&self.searchable)
            .sortable(&self.sortable)
            .filterable(&self.filterable);
        for (field, column) in &self.columns {
            builder = builder.column(field, column);
        }
        if let Some(tb) = &self.tiebreaker {
            builder = builder.tiebreaker(&tb.field, tb.direction);
        }
        builder.build()
    }
}

/// Logging configuration - maps targets to their logging settings.
/// Key "default" is the catch-all for logs that don't match an explicit target.
pub type LoggingConfig = BTreeMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    /// Only the "default" section's file is opened; other sections set levels.
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

/// Create a default logging configuration: console only.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = BTreeMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "warn".to_string(),
            file: String::new(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let config_path = config_path.as_ref();
        if !config_path.is_file() {
            bail!("config file not found: {}", config_path.display());
        }

        let figment = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(config_path))
            // Example: APP__QUERY__MAX_LIMIT=50 maps to query.max_limit
            .merge(Env::prefixed("APP__").split("__"));

        let config: AppConfig = figment
            .extract()
            .with_context(|| "Failed to extract config from figment".to_string())?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file or create with default values.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        let q = &self.query;
        if q.max_limit == 0 {
            bail!("query.max_limit must be positive");
        }
        if q.default_limit == 0 || q.default_limit > q.max_limit {
            bail!(
                "query.default_limit must be within 1..={}, got {}",
                q.max_limit,
                q.default_limit
            );
        }
        for (name, policy) in &self.policies {
            policy
                .build()
                .with_context(|| format!("invalid field policy '{}'", name))?;
        }
        Ok(())
    }

    /// Build the named field policy.
    pub fn policy(&self, name: &str) -> Result<FieldPolicy> {
        let cfg = self.policies.get(name).with_context(|| {
            let known: Vec<&str> = self.policies.keys().map(String::as_str).collect();
            format!("unknown policy '{}' (configured: {:?})", name, known)
        })?;
        cfg.build()
            .with_context(|| format!("invalid field policy '{}'", name))
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if args.verbose == 0 {
            return;
        }
        let logging = self.logging.get_or_insert_with(default_logging_config);
        let default_section = logging
            .entry("default".to_string())
            .or_insert_with(|| default_logging_config()["default"].clone());
        default_section.console_level = match args.verbose {
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        };
    }
}

/// Command line arguments shared by binaries.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub print_config: bool,
    pub verbose: u8,
}
