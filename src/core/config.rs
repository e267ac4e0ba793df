use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::metrics::DEFAULT_HISTORY_SIZE;
use super::task_runner::RunnerConfig;
use crate::error::RboostError;

const MIN_MONITOR_INTERVAL_MS: u64 = 100;
const MIN_SILENT_CLEANUP_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    System,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::System => "system",
        };
        f.write_str(name)
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            "system" => Ok(Theme::System),
            other => bail!("Unknown theme '{}' (expected dark, light or system)", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub interval_ms: u64,
    pub history_capacity: usize,
    /// Volume shown in the disk gauge.
    pub primary_volume: String,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            history_capacity: DEFAULT_HISTORY_SIZE,
            primary_volume: default_primary_volume().to_string(),
        }
    }
}

impl MonitorSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_primary_volume() -> &'static str {
    if cfg!(windows) {
        "C:\\"
    } else {
        "/"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    pub reset_delay_ms: u64,
    pub reboot_prompt_delay_ms: u64,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            reset_delay_ms: 2000,
            reboot_prompt_delay_ms: 3000,
        }
    }
}

impl RunnerSettings {
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            reset_delay: Duration::from_millis(self.reset_delay_ms),
            reboot_prompt_delay: Duration::from_millis(self.reboot_prompt_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanSettings {
    /// Extra directories cleaned alongside the system temp folders.
    pub custom_paths: Vec<String>,
    /// Files younger than this are kept. 0 cleans everything.
    pub min_age_secs: u64,
}

impl CleanSettings {
    pub fn min_age(&self) -> Option<Duration> {
        (self.min_age_secs > 0).then(|| Duration::from_secs(self.min_age_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: Theme,
    pub auto_reboot_prompt: bool,
    pub silent_cleanup_enabled: bool,
    pub silent_cleanup_interval_secs: u64,
    pub monitor: MonitorSettings,
    pub runner: RunnerSettings,
    pub clean: CleanSettings,
    /// Process names terminated by "kill background".
    pub background_processes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            auto_reboot_prompt: true,
            silent_cleanup_enabled: false,
            silent_cleanup_interval_secs: 43_200,
            monitor: MonitorSettings::default(),
            runner: RunnerSettings::default(),
            clean: CleanSettings::default(),
            background_processes: ["spotify.exe", "discord.exe", "epicgameslauncher.exe", "steam.exe"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Load the settings file, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load() -> Result<Self> {
        let path = Self::get_config_path()?;
        Ok(Self::load_from(&path))
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Config::default();
        }

        let parsed = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))
            .and_then(|data| {
                if data.trim().is_empty() {
                    Ok(Config::default())
                } else {
                    serde_json::from_str::<Config>(&data)
                        .with_context(|| format!("Failed to parse config file: {:?}", path))
                }
            });

        match parsed {
            Ok(mut config) => {
                config.validate();
                config
            }
            Err(e) => {
                log::warn!("{:#}. Using default settings.", e);
                Config::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::get_config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, data).with_context(|| format!("Failed to write config file: {:?}", path))?;
        log::info!("Settings saved to {:?}", path);
        Ok(())
    }

    /// Merge the settings in `path` over these ones. Keys missing from the
    /// file keep their current values. The file must hold a JSON object.
    pub fn import(&mut self, path: &Path) -> Result<()> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let incoming: Value = serde_json::from_str(&data)
            .with_context(|| format!("Invalid settings file {:?}", path))?;
        if !incoming.is_object() {
            bail!("Invalid settings file {:?}: expected a JSON object", path);
        }

        let mut merged = serde_json::to_value(&*self).context("Failed to serialize config")?;
        merge_json(&mut merged, incoming);
        let mut imported: Config = serde_json::from_value(merged)
            .with_context(|| format!("Invalid settings file {:?}", path))?;
        imported.validate();
        *self = imported;
        log::info!("Settings imported from {:?}", path);
        Ok(())
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        self.save_to(path)
    }

    pub fn reset(&mut self) {
        *self = Config::default();
    }

    /// Raise intervals and capacities below their usable minimum.
    pub fn validate(&mut self) {
        if self.monitor.interval_ms < MIN_MONITOR_INTERVAL_MS {
            log::warn!(
                "monitor.interval_ms {} too small, using {}",
                self.monitor.interval_ms,
                MIN_MONITOR_INTERVAL_MS
            );
            self.monitor.interval_ms = MIN_MONITOR_INTERVAL_MS;
        }
        if self.monitor.history_capacity == 0 {
            self.monitor.history_capacity = 1;
        }
        if self.monitor.primary_volume.trim().is_empty() {
            self.monitor.primary_volume = default_primary_volume().to_string();
        }
        if self.silent_cleanup_interval_secs < MIN_SILENT_CLEANUP_SECS {
            self.silent_cleanup_interval_secs = MIN_SILENT_CLEANUP_SECS;
        }
    }

    /// Set a single value by its dotted key, e.g. `monitor.interval_ms`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse<T: FromStr>(key: &str, value: &str) -> Result<T>
        where
            T::Err: fmt::Display,
        {
            value
                .parse::<T>()
                .map_err(|e| RboostError::config(format!("Invalid value '{}' for {}: {}", value, key, e)).into())
        }

        match key {
            "theme" => self.theme = value.parse()?,
            "auto_reboot_prompt" => self.auto_reboot_prompt = parse(key, value)?,
            "silent_cleanup_enabled" => self.silent_cleanup_enabled = parse(key, value)?,
            "silent_cleanup_interval_secs" => self.silent_cleanup_interval_secs = parse(key, value)?,
            "monitor.interval_ms" => self.monitor.interval_ms = parse(key, value)?,
            "monitor.history_capacity" => self.monitor.history_capacity = parse(key, value)?,
            "monitor.primary_volume" => self.monitor.primary_volume = value.to_string(),
            "runner.reset_delay_ms" => self.runner.reset_delay_ms = parse(key, value)?,
            "runner.reboot_prompt_delay_ms" => self.runner.reboot_prompt_delay_ms = parse(key, value)?,
            "clean.min_age_secs" => self.clean.min_age_secs = parse(key, value)?,
            "clean.custom_paths" => self.clean.custom_paths = split_list(value),
            "background_processes" => self.background_processes = split_list(value),
            _ => return Err(RboostError::config(format!("Unknown setting '{}'", key)).into()),
        }
        self.validate();
        Ok(())
    }

    pub fn silent_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.silent_cleanup_interval_secs)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("rboost").join("settings.json"))
    }
}

/// Overlay `incoming` onto `base`, descending into nested objects.
fn merge_json(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
