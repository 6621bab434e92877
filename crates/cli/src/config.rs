use proto::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_SERVER_TEMPLATE: &str = "llama-server -m {model_path} -ngl {ngl} -c {ctx_size}";
pub const DEFAULT_CLI_TEMPLATE: &str = "llama-cli -m {model_path} -ngl {ngl} -c {ctx_size}";
const DEFAULT_NGL: u32 = 99;
const DEFAULT_LOG_LEVEL: &str = "info";
const CONFIG_FILE_NAME: &str = "config.toml";
const SYSTEM_CONFIG_PATH: &str = "/etc/lload/config.toml";

/// Environment variables recognised by [`Config::load`], with a short description.
pub const ENV_VARS: [(&str, &str); 8] = [
    ("LLOAD_MODELS_DIR", "Override the models directory"),
    ("LLOAD_DEFAULT_NGL", "Default GPU layer count"),
    ("LLOAD_DEFAULT_CTX_SIZE", "Default context size (0 lets the model choose)"),
    ("LLOAD_LOG_LEVEL", "Log level (trace, debug, info, warn, error)"),
    ("LLOAD_LOG_FILE", "Path to a log file (empty disables file logging)"),
    ("LLOAD_SERVER_TEMPLATE", "Command template for server launches"),
    ("LLOAD_CLI_TEMPLATE", "Command template for interactive launches"),
    ("HF_TOKEN", "Access token for the remote model catalog"),
];

/// Top-level launcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory scanned for local model files.
    pub models_dir: PathBuf,
    /// Initial GPU-layer count for the session overrides.
    pub default_ngl: u32,
    /// Initial context size; zero lets the model choose.
    pub default_ctx_size: u32,
    pub log_level: String,
    /// Log file path; empty disables file logging.
    pub log_file: String,
    /// Template used for server launches.
    pub server_template: String,
    /// Template used for interactive launches.
    pub cli_template: String,
    /// Remote catalog settings.
    pub catalog: CatalogConfig,

    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            default_ngl: DEFAULT_NGL,
            default_ctx_size: 0,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_file: String::new(),
            server_template: DEFAULT_SERVER_TEMPLATE.to_string(),
            cli_template: DEFAULT_CLI_TEMPLATE.to_string(),
            catalog: CatalogConfig::default(),
            source: None,
        }
    }
}

/// `[catalog]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL of the catalog API.
    pub endpoint: String,
    /// Bearer token; empty means anonymous access.
    pub token: String,
    /// Maximum number of search results.
    pub search_limit: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: catalog::DEFAULT_ENDPOINT.to_string(),
            token: String::new(),
            search_limit: catalog::DEFAULT_SEARCH_LIMIT,
        }
    }
}

fn default_models_dir() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => PathBuf::from(home).join("models"),
        _ => PathBuf::from("models"),
    }
}

impl Config {
    /// Loads configuration from `path`, or from the first existing file among
    /// `./config.toml`, `$HOME/.config/lload/config.toml` and
    /// `/etc/lload/config.toml`. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(Path::to_path_buf).or_else(find_config_file);
        debug!(path = ?config_path, "Config file resolved");

        let mut config = match &config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
                let mut parsed: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::Toml(e.to_string()))?;
                parsed.source = Some(path.clone());
                parsed
            }
            None => Config::default(),
        };

        config.apply_env_overrides()?;

        debug!(
            models_dir = %config.models_dir.display(),
            ngl = config.default_ngl,
            ctx_size = config.default_ctx_size,
            endpoint = %config.catalog.endpoint,
            "Config loaded"
        );
        Ok(config)
    }

    /// Applies `LLOAD_*` and `HF_TOKEN` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(dir) = std::env::var("LLOAD_MODELS_DIR")
            && !dir.is_empty()
        {
            self.models_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var("LLOAD_DEFAULT_NGL") {
            self.default_ngl = parse_number("default_ngl", &raw)?;
        }
        if let Ok(raw) = std::env::var("LLOAD_DEFAULT_CTX_SIZE") {
            self.default_ctx_size = parse_number("default_ctx_size", &raw)?;
        }
        if let Ok(level) = std::env::var("LLOAD_LOG_LEVEL")
            && !level.is_empty()
        {
            self.log_level = level;
        }
        if let Ok(file) = std::env::var("LLOAD_LOG_FILE") {
            self.log_file = file;
        }
        if let Ok(template) = std::env::var("LLOAD_SERVER_TEMPLATE")
            && !template.trim().is_empty()
        {
            self.server_template = template;
        }
        if let Ok(template) = std::env::var("LLOAD_CLI_TEMPLATE")
            && !template.trim().is_empty()
        {
            self.cli_template = template;
        }
        if let Ok(token) = std::env::var("HF_TOKEN") {
            self.catalog.token = token;
        }
        Ok(())
    }

    /// Log file path, when file logging is enabled.
    pub fn log_file_path(&self) -> Option<&Path> {
        let trimmed = self.log_file.trim();
        (!trimmed.is_empty()).then(|| Path::new(trimmed))
    }

    /// Catalog token, when configured.
    pub fn catalog_token(&self) -> Option<String> {
        let token = self.catalog.token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    /// Command templates handed to the process supervisor.
    pub fn templates(&self) -> process::Templates {
        process::Templates {
            server: process::CommandTemplate::new(self.server_template.clone()),
            interactive: process::CommandTemplate::new(self.cli_template.clone()),
        }
    }
}

fn find_config_file() -> Option<PathBuf> {
    let mut candidates = Vec::with_capacity(3);
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(CONFIG_FILE_NAME));
    }
    if let Ok(home) = std::env::var("HOME") {
        candidates.push(
            PathBuf::from(home)
                .join(".config")
                .join("lload")
                .join(CONFIG_FILE_NAME),
        );
    }
    candidates.push(PathBuf::from(SYSTEM_CONFIG_PATH));
    candidates.into_iter().find(|p| p.is_file())
}

fn parse_number(field: &str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("{raw:?} is not a non-negative integer ({e})"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{remove_env_var, set_env_var, with_locked_env};

    const OVERRIDE_VARS: [&str; 8] = [
        "LLOAD_MODELS_DIR",
        "LLOAD_DEFAULT_NGL",
        "LLOAD_DEFAULT_CTX_SIZE",
        "LLOAD_LOG_LEVEL",
        "LLOAD_LOG_FILE",
        "LLOAD_SERVER_TEMPLATE",
        "LLOAD_CLI_TEMPLATE",
        "HF_TOKEN",
    ];

    fn clear_overrides() {
        for var in OVERRIDE_VARS {
            remove_env_var(var);
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.default_ngl, 99);
        assert_eq!(cfg.default_ctx_size, 0);
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.log_file_path().is_none());
        assert_eq!(cfg.server_template, DEFAULT_SERVER_TEMPLATE);
        assert_eq!(cfg.cli_template, DEFAULT_CLI_TEMPLATE);
        assert_eq!(cfg.catalog.endpoint, "https://huggingface.co");
        assert_eq!(cfg.catalog.search_limit, 20);
        assert!(cfg.catalog_token().is_none());
    }

    #[test]
    fn load_reads_explicit_toml_file() {
        with_locked_env(|| {
            clear_overrides();
            let dir = tempfile::tempdir().expect("tempdir");
            let path = dir.path().join("lload.toml");
            std::fs::write(
                &path,
                r#"
models_dir = "/srv/models"
default_ngl = 12
server_template = "my-server --model {model_path}"

[catalog]
endpoint = "http://mirror.local"
search_limit = 5
"#,
            )
            .expect("write config");

            let cfg = Config::load(Some(&path)).expect("load");
            assert_eq!(cfg.models_dir, PathBuf::from("/srv/models"));
            assert_eq!(cfg.default_ngl, 12);
            assert_eq!(cfg.default_ctx_size, 0);
            assert_eq!(cfg.server_template, "my-server --model {model_path}");
            assert_eq!(cfg.cli_template, DEFAULT_CLI_TEMPLATE);
            assert_eq!(cfg.catalog.endpoint, "http://mirror.local");
            assert_eq!(cfg.catalog.search_limit, 5);
            assert_eq!(cfg.source.as_deref(), Some(path.as_path()));
        });
    }

    #[test]
    fn malformed_file_is_a_toml_error() {
        with_locked_env(|| {
            clear_overrides();
            let dir = tempfile::tempdir().expect("tempdir");
            let path = dir.path().join("broken.toml");
            std::fs::write(&path, "default_ngl = \"lots\"").expect("write");
            let err = Config::load(Some(&path)).expect_err("bad type");
            assert!(matches!(err, ConfigError::Toml(_)));
        });
    }

    #[test]
    fn missing_explicit_file_is_an_io_error() {
        with_locked_env(|| {
            let dir = tempfile::tempdir().expect("tempdir");
            let err = Config::load(Some(&dir.path().join("absent.toml"))).expect_err("missing");
            assert!(matches!(err, ConfigError::Io(_)));
        });
    }

    #[test]
    fn env_overrides_take_priority_over_file_values() {
        with_locked_env(|| {
            clear_overrides();
            set_env_var("LLOAD_MODELS_DIR", "/tmp/env-models");
            set_env_var("LLOAD_DEFAULT_NGL", "40");
            set_env_var("LLOAD_DEFAULT_CTX_SIZE", "8192");
            set_env_var("LLOAD_LOG_FILE", "/tmp/lload.log");
            set_env_var("LLOAD_CLI_TEMPLATE", "cli -m {model_path}");
            set_env_var("HF_TOKEN", "hf_secret");

            let mut cfg = Config::default();
            cfg.apply_env_overrides().expect("overrides");
            assert_eq!(cfg.models_dir, PathBuf::from("/tmp/env-models"));
            assert_eq!(cfg.default_ngl, 40);
            assert_eq!(cfg.default_ctx_size, 8192);
            assert_eq!(cfg.log_file_path(), Some(Path::new("/tmp/lload.log")));
            assert_eq!(cfg.cli_template, "cli -m {model_path}");
            assert_eq!(cfg.server_template, DEFAULT_SERVER_TEMPLATE);
            assert_eq!(cfg.catalog_token().as_deref(), Some("hf_secret"));

            clear_overrides();
        });
    }

    #[test]
    fn unparsable_numeric_override_is_invalid_value() {
        with_locked_env(|| {
            clear_overrides();
            set_env_var("LLOAD_DEFAULT_NGL", "-3");
            let mut cfg = Config::default();
            let err = cfg.apply_env_overrides().expect_err("negative ngl");
            match err {
                ConfigError::InvalidValue { field, .. } => assert_eq!(field, "default_ngl"),
                other => panic!("unexpected error: {other}"),
            }
            clear_overrides();
        });
    }

    #[test]
    fn templates_follow_configured_strings() {
        let cfg = Config {
            server_template: "a {model_path}".to_string(),
            cli_template: "b {model_path}".to_string(),
            ..Config::default()
        };
        let templates = cfg.templates();
        assert_eq!(templates.server.as_str(), "a {model_path}");
        assert_eq!(templates.interactive.as_str(), "b {model_path}");
    }
}
