use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".pank";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_COMPANY_ID: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub api_port: u16,
    /// Company scope assumed by CLI commands; the API receives it per request.
    pub company_id: String,
    pub verification_ttl_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            db_path: root.join("db").join("pank.db"),
            export_dir: default_export_dir(),
            api_port: 7891,
            company_id: DEFAULT_COMPANY_ID.to_string(),
            verification_ttl_minutes: 10,
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        fs::create_dir_all(&self.export_dir).with_context(|| {
            format!(
                "Failed to create export directory: {}",
                self.export_dir.as_path().display()
            )
        })?;

        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let normalized = normalize_config_key(key);

        match normalized {
            "db_path" => {
                self.db_path = expand_home(value);
            }
            "export_dir" => {
                self.export_dir = expand_home(value);
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "company_id" => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    bail!("company_id cannot be empty");
                }
                self.company_id = trimmed.to_string();
            }
            "verification_ttl_minutes" => {
                self.verification_ttl_minutes = value
                    .parse::<i64>()
                    .map_err(|_| anyhow!("verification_ttl_minutes must be a number"))?
                    .max(1);
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: db_path|db.path, export_dir|export.dir, api_port|api.port, company_id|company.id, verification_ttl_minutes|verification.ttl_minutes"
                );
            }
        }

        if normalized == "export_dir" {
            fs::create_dir_all(&self.export_dir).with_context(|| {
                format!(
                    "Failed to create export directory: {}",
                    self.export_dir.display()
                )
            })?;
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "export_dir" => Some(self.export_dir.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "company_id" => Some(self.company_id.clone()),
            "verification_ttl_minutes" => Some(self.verification_ttl_minutes.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "db_path" | "db.path" => "db_path",
        "export_dir" | "export.dir" => "export_dir",
        "api_port" | "api.port" => "api_port",
        "company_id" | "company.id" => "company_id",
        "verification_ttl_minutes" | "verification.ttl_minutes" => "verification_ttl_minutes",
        _ => key,
    }
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

pub fn default_export_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("pank")
        .join("exports")
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}
