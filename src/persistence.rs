//! Reading and writing the layout through a key-value store.
//!
//! Stored form:
//!
//! ```text
//! { "groups": [[{ "type": "chat", "key": "chat-0" }], ...],
//!   "widths": ["30%", ...],
//!   "active": [0, ...] }
//! ```
//!
//! `active` is left out when every group shows its first tab.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::common::collections::{HashMap, HashSet};
use crate::common::config::ResizeSettings;
use crate::layout_engine::resize::{WidthConstraints, reconcile_group_count};
use crate::model::layout::{WIDTH_SUM_TOLERANCE, normalize};
use crate::model::{Group, Layout, TabDescriptor};
use crate::registry::{ACCOUNT, CHAT, HISTORY, INVENTORY, PARAMETERS, TabRegistry};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> { Ok(self.entries.get(key).cloned()) }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    fn path(&self, key: &str) -> PathBuf { self.dir.join(format!("{key}.json")) }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let buf = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Some(buf))
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value.as_bytes())
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        let path = self.path(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PersistedLayout {
    pub groups: Vec<Vec<TabDescriptor>>,
    pub widths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<Vec<usize>>,
}

impl From<&Layout> for PersistedLayout {
    fn from(layout: &Layout) -> Self {
        let active: Vec<usize> = layout.groups().iter().map(Group::active_index).collect();
        Self {
            groups: layout.groups().iter().map(|g| g.tabs().to_vec()).collect(),
            widths: layout.widths().iter().map(|w| format!("{w}%")).collect(),
            active: active.iter().any(|&a| a != 0).then_some(active),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutValidationError {
    #[error("malformed layout: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("layout has no groups")]
    NoGroups,
    #[error("group {0} is empty")]
    EmptyGroup(usize),
    #[error("unknown tab type {0:?}")]
    UnknownType(String),
    #[error("tab {0} appears more than once")]
    DuplicateTab(TabDescriptor),
    #[error("width {0:?} is not a percentage")]
    BadWidth(String),
    #[error("active tab {index} is out of range for group {group}")]
    BadActive { group: usize, index: usize },
}

fn parse_width(raw: &str) -> Result<f64, LayoutValidationError> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    match number.parse::<f64>() {
        Ok(w) if w.is_finite() && w >= 0.0 => Ok(w),
        _ => Err(LayoutValidationError::BadWidth(raw.to_string())),
    }
}

/// Parses and checks a stored blob. Structural problems reject it; a width
/// vector of the wrong length or sum is repaired.
pub fn decode(
    json: &str,
    registry: &TabRegistry,
    container_width_px: f64,
    resize: &ResizeSettings,
) -> Result<Layout, LayoutValidationError> {
    let stored: PersistedLayout = serde_json::from_str(json)?;
    if stored.groups.is_empty() {
        return Err(LayoutValidationError::NoGroups);
    }

    let mut seen = HashSet::default();
    let mut groups = Vec::with_capacity(stored.groups.len());
    for (index, tabs) in stored.groups.into_iter().enumerate() {
        for tab in &tabs {
            if !registry.contains(&tab.type_id) {
                return Err(LayoutValidationError::UnknownType(tab.type_id.clone()));
            }
            if !seen.insert(tab.clone()) {
                return Err(LayoutValidationError::DuplicateTab(tab.clone()));
            }
        }
        groups.push(Group::new(tabs).ok_or(LayoutValidationError::EmptyGroup(index))?);
    }

    if let Some(active) = &stored.active {
        for (group, (g, &index)) in groups.iter_mut().zip(active).enumerate() {
            if !g.set_active(index) {
                return Err(LayoutValidationError::BadActive { group, index });
            }
        }
    }

    let mut widths = stored.widths.iter().map(|w| parse_width(w)).collect::<Result<Vec<_>, _>>()?;
    let mut layout = Layout::new(groups, Vec::new());

    if widths.len() != layout.len() {
        debug!(widths = widths.len(), groups = layout.len(), "repairing stored width count");
        widths = reconcile_group_count(
            &widths,
            &WidthConstraints::of(&layout, registry),
            container_width_px,
            resize.new_group_share,
        );
    }
    let sum: f64 = widths.iter().sum();
    if (sum - 100.0).abs() > WIDTH_SUM_TOLERANCE {
        debug!(sum, "renormalizing stored widths");
        normalize(&mut widths);
    }
    layout.widths = widths;
    Ok(layout)
}

pub fn encode(layout: &Layout) -> String {
    // Only strings, integers and plain structs; serialization cannot fail.
    serde_json::to_string(&PersistedLayout::from(layout)).unwrap_or_default()
}

/// The four-group arrangement used on first run and whenever storage is unusable.
pub fn default_layout() -> Layout {
    let tab = |ty: &str| TabDescriptor::new(ty, format!("{ty}-0"));
    let groups = vec![
        Group::single(tab(CHAT)),
        Group::single(tab(INVENTORY)),
        Group::single(tab(PARAMETERS)),
        Group::new(vec![tab(ACCOUNT), tab(HISTORY)]).unwrap_or_else(|| Group::single(tab(ACCOUNT))),
    ];
    Layout::new(groups, vec![30.0, 30.0, 20.0, 20.0])
}

pub struct LayoutPersistence {
    store: Box<dyn KeyValueStore>,
    key: String,
}

impl LayoutPersistence {
    pub fn new(store: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self { store, key: key.into() }
    }

    pub fn in_memory() -> Self { Self::new(Box::new(MemoryStore::new()), "panel-layout") }

    pub fn key(&self) -> &str { &self.key }

    /// The stored layout, or the default when there is none or it is invalid.
    pub fn load(&self, registry: &TabRegistry, container_width_px: f64, resize: &ResizeSettings) -> Layout {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!(key = %self.key, "no stored layout, using default");
                return default_layout();
            }
            Err(err) => {
                warn!(key = %self.key, "failed to read stored layout: {err:#}");
                return default_layout();
            }
        };
        match decode(&raw, registry, container_width_px, resize) {
            Ok(layout) => {
                debug!(key = %self.key, groups = layout.len(), "loaded stored layout");
                layout
            }
            Err(err) => {
                warn!(key = %self.key, %err, "discarding stored layout");
                default_layout()
            }
        }
    }

    pub fn save(&mut self, layout: &Layout) -> anyhow::Result<()> {
        self.store.set(&self.key, &encode(layout))
    }

    pub fn clear(&mut self) -> anyhow::Result<()> { self.store.remove(&self.key) }

    pub fn raw(&self) -> anyhow::Result<Option<String>> { self.store.get(&self.key) }
}
