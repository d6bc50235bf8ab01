use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};

pub fn data_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("panel-tiler")
}

pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("panel-tiler")
        .join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct DragSettings {
    /// Upper bound on the edge zone that triggers split indicators.
    #[serde(default = "default_edge_threshold_px")]
    pub edge_threshold_px: f64,
    /// Edge zone as a fraction of the hovered group's width; the smaller of
    /// the two wins.
    #[serde(default = "default_edge_threshold_ratio")]
    pub edge_threshold_ratio: f64,
    #[serde(default = "default_indicator_debounce_ms")]
    pub indicator_debounce_ms: u64,
}

impl Default for DragSettings {
    fn default() -> Self {
        Self {
            edge_threshold_px: default_edge_threshold_px(),
            edge_threshold_ratio: default_edge_threshold_ratio(),
            indicator_debounce_ms: default_indicator_debounce_ms(),
        }
    }
}

impl DragSettings {
    pub fn indicator_debounce(&self) -> Duration { Duration::from_millis(self.indicator_debounce_ms) }

    pub fn edge_threshold(&self, container_width: f64) -> f64 {
        self.edge_threshold_px.min(container_width * self.edge_threshold_ratio)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.edge_threshold_px <= 0.0 {
            issues.push(format!(
                "drag.edge_threshold_px must be positive, got {}",
                self.edge_threshold_px
            ));
        }

        if !(self.edge_threshold_ratio > 0.0 && self.edge_threshold_ratio <= 0.5) {
            issues.push(format!(
                "drag.edge_threshold_ratio must be in (0, 0.5], got {}",
                self.edge_threshold_ratio
            ));
        }

        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct ResizeSettings {
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    /// Used for groups whose tab type is not registered.
    #[serde(default = "default_min_width_px")]
    pub default_min_width_px: f64,
    /// Percentage claimed by each newly created group.
    #[serde(default = "default_new_group_share")]
    pub new_group_share: f64,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            default_min_width_px: default_min_width_px(),
            new_group_share: default_new_group_share(),
        }
    }
}

impl ResizeSettings {
    pub fn throttle(&self) -> Duration { Duration::from_millis(self.throttle_ms) }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.default_min_width_px < 0.0 {
            issues.push(format!(
                "resize.default_min_width_px must be non-negative, got {}",
                self.default_min_width_px
            ));
        }

        if !(self.new_group_share > 0.0 && self.new_group_share < 100.0) {
            issues.push(format!(
                "resize.new_group_share must be in (0, 100), got {}",
                self.new_group_share
            ));
        }

        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct GeometrySettings {
    /// Container width assumed until a host reports a real one.
    #[serde(default = "default_container_width_px")]
    pub container_width_px: f64,
    #[serde(default = "default_container_height_px")]
    pub container_height_px: f64,
    #[serde(default = "default_header_height_px")]
    pub header_height_px: f64,
    /// Width of one tab handle in a group header.
    #[serde(default = "default_tab_width_px")]
    pub tab_width_px: f64,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            container_width_px: default_container_width_px(),
            container_height_px: default_container_height_px(),
            header_height_px: default_header_height_px(),
            tab_width_px: default_tab_width_px(),
        }
    }
}

impl GeometrySettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.container_width_px <= 0.0 || self.container_height_px <= 0.0 {
            issues.push(format!(
                "geometry container must be positive, got {}x{}",
                self.container_width_px, self.container_height_px
            ));
        }

        if self.header_height_px < 0.0 || self.header_height_px > self.container_height_px {
            issues.push(format!(
                "geometry.header_height_px must be within the container height, got {}",
                self.header_height_px
            ));
        }

        if self.tab_width_px <= 0.0 {
            issues.push(format!(
                "geometry.tab_width_px must be positive, got {}",
                self.tab_width_px
            ));
        }

        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct StorageSettings {
    #[serde(default = "default_storage_key")]
    pub key: String,
    /// Directory for the file-backed store; defaults to the data dir.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
            dir: None,
        }
    }
}

impl StorageSettings {
    pub fn dir(&self) -> PathBuf { self.dir.clone().unwrap_or_else(data_dir) }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub drag: DragSettings,
    #[serde(default)]
    pub resize: ResizeSettings,
    #[serde(default)]
    pub geometry: GeometrySettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.drag.validate());
        issues.extend(self.resize.validate());
        issues.extend(self.geometry.validate());

        if self.storage.key.trim().is_empty() {
            issues.push("storage.key must not be empty".to_string());
        }

        issues
    }
}

/// Overrides or additions for one tab type.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct TabSettings {
    #[serde(default)]
    pub min_width_px: Option<f64>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub props: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub tabs: BTreeMap<String, TabSettings>,
}

fn default_edge_threshold_px() -> f64 { 80.0 }
fn default_edge_threshold_ratio() -> f64 { 0.2 }
fn default_indicator_debounce_ms() -> u64 { 50 }
fn default_throttle_ms() -> u64 { 16 }
fn default_min_width_px() -> f64 { 200.0 }
fn default_new_group_share() -> f64 { 10.0 }
fn default_container_width_px() -> f64 { 1200.0 }
fn default_container_height_px() -> f64 { 800.0 }
fn default_header_height_px() -> f64 { 32.0 }
fn default_tab_width_px() -> f64 { 120.0 }
fn default_storage_key() -> String { "panel-layout".to_string() }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn default() -> Config {
        Self::parse(include_str!("../../panel-tiler.default.toml"))
            .expect("embedded default config must parse")
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.settings.validate());

        for (type_id, tab) in &self.tabs {
            if type_id.trim().is_empty() {
                issues.push("tab type names must not be empty".to_string());
            }
            if let Some(min) = tab.min_width_px
                && min < 0.0
            {
                issues.push(format!("tabs.{type_id}.min_width_px must be non-negative, got {min}"));
            }
        }

        issues
    }

    fn levenshtein(a: &str, b: &str) -> usize {
        let b_chars: Vec<char> = b.chars().collect();
        let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
        let mut cur = vec![0; b_chars.len() + 1];

        for (i, ca) in a.chars().enumerate() {
            cur[0] = i + 1;
            for (j, cb) in b_chars.iter().enumerate() {
                let cost = if ca == *cb { 0 } else { 1 };
                cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
            }
            std::mem::swap(&mut prev, &mut cur);
        }

        prev[b_chars.len()]
    }

    /// Pulls `(unknown, [expected...])` out of a serde "unknown field" message.
    fn extract_unknown_field(err: &str) -> Option<(String, Vec<String>)> {
        let rest = &err[err.find("unknown field `")? + "unknown field `".len()..];
        let end = rest.find('`')?;
        let unknown = rest[..end].to_string();

        let expected = rest
            .find("expected")
            .map(|at| {
                rest[at..]
                    .split('`')
                    .skip(1)
                    .step_by(2)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Some((unknown, expected))
    }

    fn suggest_similar_field(unknown: &str, expected: &[String]) -> Option<String> {
        expected
            .iter()
            .map(|candidate| (Self::levenshtein(unknown, candidate), candidate))
            .filter(|(distance, _)| *distance <= 3)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate.clone())
    }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        match toml::from_str::<Config>(buf) {
            Ok(config) => Ok(config),
            Err(e) => {
                let msg = e.to_string();
                if let Some((unknown, expected)) = Self::extract_unknown_field(&msg)
                    && let Some(suggestion) = Self::suggest_similar_field(&unknown, &expected)
                {
                    bail!("{msg}\nDid you mean `{suggestion}`?");
                }
                bail!("{msg}");
            }
        }
    }
}
