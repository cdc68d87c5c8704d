use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub display: DisplayConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub operations: OperationsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// Offset of the display timezone from UTC, in hours
    pub utc_offset_hours: i32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// HS256 secret; empty means "generate one at startup"
    #[serde(default)]
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OperationsConfig {
    /// Ambient deadline for state-machine operations
    pub deadline_ms: u64,
}

fn default_max_connections() -> u32 {
    5
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "data/crm.db"
max_connections = 5

[server]
host = "0.0.0.0"
port = 3000

[display]
utc_offset_hours = 7

[auth]
jwt_secret = ""

[operations]
deadline_ms = 10000
"#;

impl Config {
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(-12..=14).contains(&self.display.utc_offset_hours) {
            anyhow::bail!(
                "display.utc_offset_hours must be within -12..=14, got {}",
                self.display.utc_offset_hours
            );
        }
        if self.operations.deadline_ms == 0 {
            anyhow::bail!("operations.deadline_ms must be positive");
        }
        if self.server.port == 0 {
            anyhow::bail!("server.port must not be 0");
        }
        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be positive");
        }
        Ok(())
    }

    /// Display timezone as a fixed offset
    pub fn display_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.display.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }

    /// The configuration embedded in the binary
    pub fn embedded() -> anyhow::Result<Self> {
        Self::parse(DEFAULT_CONFIG)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.operations.deadline_ms)
    }
}


/// Load configuration from config.toml
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. The path in `CRM_CONFIG`
/// 3. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");

            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                let contents = std::fs::read_to_string(&config_path)?;
                return Config::parse(&contents);
            } else {
                tracing::warn!("config.toml not found at: {}", config_path.display());
            }
        }
    }

    if let Ok(path) = std::env::var("CRM_CONFIG") {
        tracing::info!("Loading config from CRM_CONFIG: {}", path);
        let contents = std::fs::read_to_string(&path)?;
        return Config::parse(&contents);
    }

    tracing::info!("Using default embedded configuration");
    Config::embedded()
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return Ok(exe_dir.join(db_path));
        }
    }

    Ok(PathBuf::from(db_path_str))
}
