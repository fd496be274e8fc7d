use crate::error::AppError;
use crate::skills::Skill;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const APP_DIR: &str = "skillcheck";
const DEFAULT_FUNCTION: &str = "skill-assessment";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<Skill>,
}

impl Config {
    /// Loads the config file (if any) and applies environment overrides.
    /// Nothing is logged here; call [`ConfigSource::log`] once tracing is up.
    pub fn load() -> Result<(Self, ConfigSource), AppError> {
        let (mut config, source) = Self::read_file(get_config_path())?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok((config, source))
    }

    fn read_file(path: Result<PathBuf, AppError>) -> Result<(Self, ConfigSource), AppError> {
        match path {
            Ok(path) if path.exists() => {
                let config = Self::parse(&fs::read_to_string(&path)?)?;
                Ok((config, ConfigSource::File(path)))
            }
            Ok(path) => Ok((Self::default(), ConfigSource::Defaults(path))),
            Err(e) => Ok((Self::default(), ConfigSource::NoConfigDir(e.to_string()))),
        }
    }

    fn parse(contents: &str) -> Result<Self, AppError> {
        toml::from_str(contents).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Environment variables take priority over the config file.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(key) = non_empty("SKILLCHECK_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = non_empty("SKILLCHECK_BACKEND_URL") {
            self.backend_url = Some(url);
        }
        if let Some(function) = non_empty("SKILLCHECK_FUNCTION") {
            self.function_name = Some(function);
        }
        if let Some(model) = non_empty("SKILLCHECK_MODEL") {
            self.model = Some(model);
        }
        if let Some(dir) = non_empty("SKILLCHECK_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn backend_url(&self) -> Result<&str, AppError> {
        self.backend_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                AppError::Config(
                    "backend_url is not set (config.toml or SKILLCHECK_BACKEND_URL)".to_string(),
                )
            })
    }

    pub fn function_name(&self) -> &str {
        self.function_name.as_deref().unwrap_or(DEFAULT_FUNCTION)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Directory for the ledger and the log file. `None` when neither the
    /// config nor the platform provide one.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR)))
    }
}

/// Where the settings came from.
#[derive(Debug, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file at this path yet.
    Defaults(PathBuf),
    NoConfigDir(String),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!(path = %path.display(), "Loaded config file"),
            ConfigSource::Defaults(path) => {
                info!(path = %path.display(), "No config file; using defaults and environment")
            }
            ConfigSource::NoConfigDir(error) => {
                warn!(error = %error, "No config directory; using environment only")
            }
        }
    }
}

fn get_config_path() -> Result<PathBuf, AppError> {
    let config_dir = dirs::config_dir().ok_or(AppError::IoError(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "Config directory not found",
    )))?;
    let app_config_dir = config_dir.join(APP_DIR);
    fs::create_dir_all(&app_config_dir)?;
    Ok(app_config_dir.join("config.toml"))
}

/// Stores the API key in the config file, keeping any other settings.
pub fn save_api_key(api_key: &str) -> Result<(), AppError> {
    let config_path = get_config_path()?;
    let mut config = if config_path.exists() {
        Config::parse(&fs::read_to_string(&config_path)?)?
    } else {
        Config::default()
    };
    config.api_key = Some(api_key.to_string());
    write_config(&config_path, &config)
}

fn write_config(path: &Path, config: &Config) -> Result<(), AppError> {
    let toml_string =
        toml::to_string(config).map_err(|e| AppError::Config(format!("serialize: {}", e)))?;

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    // Set file permissions to 600 on Unix-like systems
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.metadata()?.permissions();
        perms.set_mode(0o600);
        file.set_permissions(perms)?;
    }

    file.write_all(toml_string.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::Proficiency;
    use std::collections::HashMap;

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
api_key = "secret_key"
backend_url = "https://example.supabase.co"
model = "small"

[[skills]]
id = "sql"
name = "SQL"
proficiency = "Mastery"
"#;
        let config = Config::parse(toml_str).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("secret_key"));
        assert_eq!(config.backend_url().unwrap(), "https://example.supabase.co");
        assert_eq!(config.model(), "small");
        assert_eq!(config.function_name(), DEFAULT_FUNCTION);
        assert_eq!(config.skills.len(), 1);
        assert_eq!(config.skills[0].proficiency, Proficiency::Mastery);
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.api_key.is_none());
        assert!(matches!(config.backend_url(), Err(AppError::Config(_))));
        assert_eq!(config.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            Config::parse("api_key = "),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::parse("api_key = \"file_key\"\nmodel = \"file_model\"").unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("SKILLCHECK_API_KEY", "env_key"),
            ("SKILLCHECK_MODEL", "   "),
            ("SKILLCHECK_DATA_DIR", "/tmp/skillcheck"),
        ]);
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("env_key"));
        // Blank values do not override.
        assert_eq!(config.model(), "file_model");
        assert_eq!(config.data_dir(), Some(PathBuf::from("/tmp/skillcheck")));
    }

    #[test]
    fn test_read_file_reports_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let (config, source) = Config::read_file(Ok(path.clone())).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(source, ConfigSource::Defaults(path.clone()));

        fs::write(&path, "model = \"from_file\"").unwrap();
        let (config, source) = Config::read_file(Ok(path.clone())).unwrap();
        assert_eq!(config.model(), "from_file");
        assert_eq!(source, ConfigSource::File(path));

        let missing = AppError::Config("no home".to_string());
        let (_, source) = Config::read_file(Err(missing)).unwrap();
        assert!(matches!(source, ConfigSource::NoConfigDir(e) if e.contains("no home")));
    }

    #[test]
    #[cfg(unix)]
    fn test_write_config_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let config = Config {
            api_key: Some("test_perm_key".to_string()),
            ..Config::default()
        };
        write_config(&config_path, &config).unwrap();

        let metadata = fs::metadata(&config_path).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
        let saved = Config::parse(&fs::read_to_string(&config_path).unwrap()).unwrap();
        assert_eq!(saved.api_key.as_deref(), Some("test_perm_key"));
        assert!(saved.skills.is_empty());
    }
}
