//! Layered configuration.
//!
//! Values are merged from, in increasing priority:
//!
//! 1. built-in defaults,
//! 2. a configuration file: the one given explicitly, otherwise the first of
//!    `renamer.toml`, `renamer.yaml`, `renamer.yml`, `renamer.json` found in
//!    the platform configuration directory,
//! 3. `RENAMER_`-prefixed environment variables, with `__` separating
//!    nested keys (`RENAMER_NAMING__API_KEY`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use renamer_archive::ArchiveFormat;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const ENV_PREFIX: &str = "RENAMER_";
const FILE_STEM: &str = "renamer";
const FILE_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub staging: StagingConfig,
    pub naming: NamingConfig,
    pub job: JobConfig,
    pub archive: ArchiveConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Upper bound for one upload request, in MiB.
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: SocketAddr::from(([127, 0, 0, 1], 5000)), max_upload_mb: 256 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Keep staged content in this directory. Without it, content is held
    /// in memory.
    pub directory: Option<PathBuf>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub base_url: String,
    pub model: String,
    /// Validated against the service at startup.
    pub api_key: Option<String>,
    /// Seconds allowed for one naming call.
    pub timeout: u64,
    /// How much of a file's content is sent in text mode.
    pub max_content_bytes: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout: 60,
            max_content_bytes: 2048,
        }
    }
}

impl Debug for NamingConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("NamingConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("max_content_bytes", &self.max_content_bytes)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Consecutive service-level failures that fail a job.
    pub fatal_after: usize,
    /// Polling cadence advertised to clients.
    pub poll_interval_ms: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self { fatal_after: 3, poll_interval_ms: 500 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub format: ArchiveFormat,
    /// Download name without extension.
    pub filename: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self { format: ArchiveFormat::default(), filename: "renamed_files".to_string() }
    }
}

impl Config {
    /// Load from defaults, a file, and the environment, then validate.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(file)?)
    }

    /// The merged provider stack, before extraction.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        let file = match file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_file(),
        };
        if let Some(path) = file {
            debug!(path = %path.display(), "reading configuration file");
            figment = match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
                Some("toml") => figment.merge(Toml::file_exact(&path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(&path)),
                Some("json") => figment.merge(Json::file_exact(&path)),
                _ => exn::bail!(ErrorKind::UnsupportedFile(path)),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// First `renamer.*` file in the platform configuration directory.
    pub fn default_file() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("", "", FILE_STEM)?;
        FILE_EXTENSIONS
            .iter()
            .map(|extension| dirs.config_dir().join(format!("{FILE_STEM}.{extension}")))
            .find(|path| path.is_file())
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| Err(exn::Exn::from(ErrorKind::Invalid(message.to_string())));
        if self.server.max_upload_mb == 0 {
            return invalid("server.max_upload_mb must be greater than zero");
        }
        if !(self.naming.base_url.starts_with("http://") || self.naming.base_url.starts_with("https://")) {
            return invalid("naming.base_url must be an http(s) URL");
        }
        if self.naming.model.trim().is_empty() {
            return invalid("naming.model must not be empty");
        }
        if self.naming.timeout == 0 {
            return invalid("naming.timeout must be at least one second");
        }
        if self.job.fatal_after == 0 {
            return invalid("job.fatal_after must be at least 1");
        }
        if self.job.poll_interval_ms == 0 {
            return invalid("job.poll_interval_ms must be greater than zero");
        }
        let filename = self.archive.filename.trim();
        if filename.is_empty() || filename.contains(['/', '\\']) {
            return invalid("archive.filename must be a plain file name");
        }
        if let Some(directory) = &self.staging.directory
            && !directory.is_absolute()
        {
            return invalid("staging.directory must be an absolute path");
        }
        Ok(())
    }

    pub fn naming_timeout(&self) -> Duration {
        Duration::from_secs(self.naming.timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.job.poll_interval_ms)
    }

    /// `max_upload_mb` in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// The seeded API key, if any non-blank one was configured.
    pub fn api_key(&self) -> Option<&str> {
        self.naming.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.server.bind.to_string(), "127.0.0.1:5000");
        assert_eq!(config.archive.format, ArchiveFormat::Zip);
        assert_eq!(config.naming_timeout(), Duration::from_secs(60));
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.max_upload_bytes(), 256 * 1024 * 1024);
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn test_toml_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "renamer.toml",
                r#"
                [server]
                bind = "0.0.0.0:8080"

                [naming]
                model = "gpt-test"
                timeout = 5

                [archive]
                format = "tar.gz"
                "#,
            )?;
            jail.set_env("RENAMER_NAMING__MODEL", "from-env");
            jail.set_env("RENAMER_JOB__FATAL_AFTER", "7");

            let path = jail.directory().join("renamer.toml");
            let config = Config::load(Some(&path)).unwrap();
            assert_eq!(config.server.bind.port(), 8080);
            assert_eq!(config.naming.model, "from-env");
            assert_eq!(config.naming.timeout, 5);
            assert_eq!(config.job.fatal_after, 7);
            assert_eq!(config.archive.format, ArchiveFormat::TarGz);
            // Untouched values keep their defaults.
            assert_eq!(config.archive.filename, "renamed_files");
            Ok(())
        });
    }

    #[test]
    fn test_yaml_file() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.yaml", "staging:\n  directory: /var/tmp/renamer\njob:\n  poll_interval_ms: 250\n")?;
            let config = Config::load(Some(&jail.directory().join("custom.yaml"))).unwrap();
            assert_eq!(config.staging.directory.as_deref(), Some(Path::new("/var/tmp/renamer")));
            assert_eq!(config.job.poll_interval_ms, 250);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(path));
    }

    #[test]
    fn test_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renamer.ini");
        std::fs::write(&path, "bind = 1").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedFile(path));
    }

    #[rstest]
    #[case("RENAMER_SERVER__BIND", "not an address")]
    #[case("RENAMER_ARCHIVE__FORMAT", "rar")]
    #[case("RENAMER_NAMING__TIMEOUT", "soon")]
    fn test_unparsable_values(#[case] key: &str, #[case] value: &str) {
        Jail::expect_with(|jail| {
            jail.set_env(key, value);
            let figment =
                Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed(ENV_PREFIX).split("__"));
            let err = Config::from_figment(figment).unwrap_err();
            assert_eq!(*err, ErrorKind::Parse);
            Ok(())
        });
    }

    #[rstest]
    #[case(|c: &mut Config| c.naming.timeout = 0, "naming.timeout")]
    #[case(|c: &mut Config| c.job.fatal_after = 0, "job.fatal_after")]
    #[case(|c: &mut Config| c.job.poll_interval_ms = 0, "job.poll_interval_ms")]
    #[case(|c: &mut Config| c.server.max_upload_mb = 0, "server.max_upload_mb")]
    #[case(|c: &mut Config| c.naming.base_url = "ftp://example.com".into(), "naming.base_url")]
    #[case(|c: &mut Config| c.naming.model = " ".into(), "naming.model")]
    #[case(|c: &mut Config| c.archive.filename = "a/b".into(), "archive.filename")]
    #[case(|c: &mut Config| c.staging.directory = Some("relative".into()), "staging.directory")]
    fn test_validation(#[case] tweak: fn(&mut Config), #[case] key: &str) {
        let mut config = Config::default();
        tweak(&mut config);
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(message) if message.starts_with(key)));
    }

    #[test]
    fn test_api_key_is_redacted_and_trimmed() {
        let mut config = Config::default();
        config.naming.api_key = Some("  sk-secret ".to_string());
        assert_eq!(config.api_key(), Some("sk-secret"));
        assert!(!format!("{config:?}").contains("sk-secret"));
        config.naming.api_key = Some("   ".to_string());
        assert_eq!(config.api_key(), None);
    }
}
