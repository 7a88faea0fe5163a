use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use coach_core::{ComparatorKind, GradingConfig, HintPolicy, VerdictScanner, DEFAULT_LANGUAGE};
use coach_engine::{ServiceSettings, DEFAULT_SERVICE_URL};
use coach_logging::{coach_info, coach_warn, LogDestination, LogSettings};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "coach.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub service_url: String,
    pub language: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_output_bytes: u64,
    pub grading: GradingSection,
    pub log: LogSection,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let service = ServiceSettings::default();
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            connect_timeout_secs: service.connect_timeout.as_secs(),
            request_timeout_secs: service.request_timeout.as_secs(),
            max_output_bytes: service.max_response_bytes,
            grading: GradingSection::default(),
            log: LogSection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingSection {
    pub failure_marker: String,
    pub marker_case_sensitive: bool,
    pub comparator: ComparatorKind,
    pub hint_policy: HintPolicy,
}

impl Default for GradingSection {
    fn default() -> Self {
        Self {
            failure_marker: coach_core::DEFAULT_FAILURE_MARKER.to_string(),
            marker_case_sensitive: false,
            comparator: ComparatorKind::default(),
            hint_policy: HintPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogTarget {
    Terminal,
    #[default]
    File,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub destination: LogTarget,
    pub file: PathBuf,
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            destination: LogTarget::default(),
            file: PathBuf::from("coach.log"),
            level: "info".to_string(),
        }
    }
}

/// Reads `path`; `None` when the file does not exist.
pub fn load(path: &Path) -> Result<Option<PlayerConfig>, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse(&text).map(Some).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse(text: &str) -> Result<PlayerConfig, ron::error::SpannedError> {
    ron::from_str(text)
}

impl PlayerConfig {
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            base_url: self.service_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_response_bytes: self.max_output_bytes,
        }
    }

    pub fn grading_config(&self) -> GradingConfig {
        GradingConfig {
            comparator: self.grading.comparator.build(),
            scanner: VerdictScanner::new(
                self.grading.failure_marker.clone(),
                self.grading.marker_case_sensitive,
            ),
            hint_policy: self.grading.hint_policy,
        }
    }

    pub fn log_settings(&self) -> LogSettings {
        let level = match self.log.level.parse::<LevelFilter>() {
            Ok(level) => level,
            Err(_) => {
                eprintln!(
                    "Warning: unknown log level {:?}, using info",
                    self.log.level
                );
                LevelFilter::Info
            }
        };
        let file = self.log.file.clone();
        let destination = match self.log.destination {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File(file),
            LogTarget::Both => LogDestination::Both(file),
        };
        LogSettings { destination, level }
    }

    /// Logs where the configuration came from and warns about values that
    /// make every request fail.
    pub fn report(&self, path: &Path, from_file: bool) {
        if from_file {
            coach_info!("configuration loaded from {:?}", path);
        } else {
            coach_info!("no configuration at {:?}, using defaults", path);
        }
        if self.request_timeout_secs == 0 {
            coach_warn!("request_timeout_secs is 0; every run will time out");
        }
        if self.grading.failure_marker.trim().is_empty() {
            coach_warn!("empty failure_marker; every run output will be marked failed");
        }
    }
}
