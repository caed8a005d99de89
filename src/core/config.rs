use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::models::checkin::Slot;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    pub course: CourseConfig,
    pub windows: WindowsConfig,
    #[serde(default = "default_schedule")]
    pub schedule: Vec<ScheduleEntry>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseConfig {
    #[serde(default)]
    pub admin_ids: HashSet<i64>,
    #[serde(default)]
    pub officer_ids: HashSet<i64>,
    /// Training-group codes in display order
    pub groups: Vec<String>,
    #[serde(default = "default_officers_code")]
    pub officers_code: String,
    #[serde(default = "default_officers_label")]
    pub officers_label: String,
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
}

impl CourseConfig {
    pub fn is_training_group(&self, code: &str) -> bool {
        self.groups.iter().any(|g| g == code)
    }

    /// Human label for a group code; the officers pseudo-group gets its own label
    pub fn group_label<'a>(&'a self, code: &'a str) -> &'a str {
        if code == self.officers_code {
            &self.officers_label
        } else {
            code
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WindowTimes {
    #[serde(deserialize_with = "deserialize_hm")]
    pub start: NaiveTime,
    #[serde(deserialize_with = "deserialize_hm")]
    pub deadline: NaiveTime,
    #[serde(deserialize_with = "deserialize_hm")]
    pub close: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowsConfig {
    pub morning: WindowTimes,
    pub evening: WindowTimes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    WindowOpen,
    WindowClose,
    Report,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleEntry {
    #[serde(deserialize_with = "deserialize_hm")]
    pub at: NaiveTime,
    pub job: JobKind,
    pub slot: Slot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Health/metrics HTTP port; the HTTP surface is disabled when unset
    pub port: Option<u16>,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: None,
            bind_address: default_bind_address(),
            num_threads: default_num_threads(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

fn deserialize_hm<'de, D>(deserializer: D) -> std::result::Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(serde::de::Error::custom)
}

// Default value functions
fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_officers_code() -> String {
    "OFFICERS".to_string()
}

fn default_officers_label() -> String {
    "Officer".to_string()
}

fn default_timezone() -> Tz {
    chrono_tz::Europe::Moscow
}

fn default_db_path() -> PathBuf {
    PathBuf::from("rollcall.sqlite3")
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn default_schedule() -> Vec<ScheduleEntry> {
    vec![
        ScheduleEntry { at: hm(7, 0), job: JobKind::WindowOpen, slot: Slot::Morning },
        ScheduleEntry { at: hm(7, 30), job: JobKind::WindowClose, slot: Slot::Morning },
        ScheduleEntry { at: hm(7, 31), job: JobKind::Report, slot: Slot::Morning },
        ScheduleEntry { at: hm(21, 30), job: JobKind::WindowOpen, slot: Slot::Evening },
        ScheduleEntry { at: hm(22, 0), job: JobKind::WindowClose, slot: Slot::Evening },
        ScheduleEntry { at: hm(22, 1), job: JobKind::Report, slot: Slot::Evening },
    ]
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.bot.token.trim().is_empty() {
            bail!("bot.token must not be empty");
        }

        if self.bot.poll_timeout_secs == 0 {
            bail!("bot.poll_timeout_secs must be greater than 0");
        }

        // Validate course config
        if self.course.groups.is_empty() {
            bail!("course.groups must list at least one training group");
        }

        let mut seen = HashSet::new();
        for group in &self.course.groups {
            if group.trim().is_empty() {
                bail!("course.groups must not contain empty codes");
            }
            if !seen.insert(group.as_str()) {
                bail!("Duplicate training group code '{}'", group);
            }
        }

        if self.course.officers_code.trim().is_empty() {
            bail!("course.officers_code must not be empty");
        }

        if self.course.is_training_group(&self.course.officers_code) {
            bail!(
                "course.officers_code '{}' must not also be a training group",
                self.course.officers_code
            );
        }

        // Validate windows
        for (name, window) in [("morning", &self.windows.morning), ("evening", &self.windows.evening)] {
            if window.start > window.deadline || window.deadline > window.close {
                bail!(
                    "windows.{} must satisfy start <= deadline <= close (got {} / {} / {})",
                    name,
                    window.start.format("%H:%M"),
                    window.deadline.format("%H:%M"),
                    window.close.format("%H:%M")
                );
            }
        }

        if self.windows.morning.close >= self.windows.evening.start {
            bail!("windows.morning must close before windows.evening starts");
        }

        if self.server.num_threads == 0 {
            bail!("server.num_threads must be greater than 0");
        }

        if let Some(port) = self.server.port {
            if port == 0 {
                bail!("server.port must be greater than 0");
            }
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
