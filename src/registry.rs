//! Catalogue of tab types and the render contract each one exposes to the
//! layout engine: a minimum width, a priority and a render hook. Nothing else
//! about a tab's content is visible to layout code.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::common::config::Config;
use crate::model::{Group, TabDescriptor};

pub type TabProps = BTreeMap<String, String>;

pub trait TabRender: Send + Sync {
    fn render(&self, tab: &TabDescriptor, props: &TabProps, width_px: f64) -> String;
}

/// Renders the tab's title and the width it was given.
#[derive(Debug, Clone)]
pub struct TitleRender {
    pub title: String,
}

impl TabRender for TitleRender {
    fn render(&self, tab: &TabDescriptor, props: &TabProps, width_px: f64) -> String {
        let mut out = format!("{} [{}] {:.0}px", self.title, tab.instance_key, width_px);
        for (key, value) in props {
            out.push_str(&format!(" {key}={value}"));
        }
        out
    }
}

#[derive(Clone)]
pub struct TabSpec {
    pub min_width_px: f64,
    /// Higher keeps its width longer when space runs out.
    pub priority: i32,
    pub title: String,
    pub props: TabProps,
    render: Arc<dyn TabRender>,
}

impl fmt::Debug for TabSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabSpec")
            .field("min_width_px", &self.min_width_px)
            .field("priority", &self.priority)
            .field("title", &self.title)
            .field("props", &self.props)
            .finish_non_exhaustive()
    }
}

impl TabSpec {
    pub fn new(title: impl Into<String>, min_width_px: f64, priority: i32) -> Self {
        let title = title.into();
        Self {
            min_width_px,
            priority,
            render: Arc::new(TitleRender { title: title.clone() }),
            title,
            props: TabProps::new(),
        }
    }

    pub fn render(&self, tab: &TabDescriptor, width_px: f64) -> String {
        self.render.render(tab, &self.props, width_px)
    }
}

pub const CHAT: &str = "chat";
pub const INVENTORY: &str = "inventory";
pub const PARAMETERS: &str = "parameters";
pub const ACCOUNT: &str = "account";
pub const HISTORY: &str = "history";

#[derive(Debug, Clone)]
pub struct TabRegistry {
    entries: BTreeMap<String, TabSpec>,
    default_min_width_px: f64,
}

impl Default for TabRegistry {
    fn default() -> Self { Self::builtin(200.0) }
}

impl TabRegistry {
    pub fn empty(default_min_width_px: f64) -> Self {
        Self {
            entries: BTreeMap::new(),
            default_min_width_px,
        }
    }

    pub fn builtin(default_min_width_px: f64) -> Self {
        let mut registry = Self::empty(default_min_width_px);
        registry.register(CHAT, TabSpec::new("Chat", 320.0, 5));
        registry.register(INVENTORY, TabSpec::new("Inventory", 280.0, 4));
        registry.register(PARAMETERS, TabSpec::new("Parameters", 240.0, 3));
        registry.register(HISTORY, TabSpec::new("History", 200.0, 2));
        registry.register(ACCOUNT, TabSpec::new("Account", 200.0, 1));
        registry
    }

    /// Built-in catalogue with the `[tabs.*]` tables of `config` applied on top.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::builtin(config.settings.resize.default_min_width_px);
        for (type_id, overrides) in &config.tabs {
            let mut spec = registry.entries.get(type_id).cloned().unwrap_or_else(|| {
                TabSpec::new(type_id.clone(), config.settings.resize.default_min_width_px, 0)
            });
            if let Some(min) = overrides.min_width_px {
                spec.min_width_px = min;
            }
            if let Some(priority) = overrides.priority {
                spec.priority = priority;
            }
            if let Some(title) = &overrides.title {
                spec.title = title.clone();
                spec.render = Arc::new(TitleRender { title: title.clone() });
            }
            spec.props.extend(overrides.props.clone());
            debug!(%type_id, ?spec, "tab type configured");
            registry.register(type_id, spec);
        }
        registry
    }

    pub fn register(&mut self, type_id: impl Into<String>, spec: TabSpec) {
        self.entries.insert(type_id.into(), spec);
    }

    pub fn set_render(&mut self, type_id: &str, render: Arc<dyn TabRender>) -> bool {
        match self.entries.get_mut(type_id) {
            Some(spec) => {
                spec.render = render;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, type_id: &str) -> Option<&TabSpec> { self.entries.get(type_id) }

    pub fn contains(&self, type_id: &str) -> bool { self.entries.contains_key(type_id) }

    pub fn default_min_width_px(&self) -> f64 { self.default_min_width_px }

    /// Minimum of the active tab, else of the first tab, else the default.
    pub fn group_min_width_px(&self, group: &Group) -> f64 {
        self.get(&group.active_tab().type_id)
            .or_else(|| group.tabs().first().and_then(|t| self.get(&t.type_id)))
            .map(|spec| spec.min_width_px)
            .unwrap_or(self.default_min_width_px)
    }

    /// Unregistered types rank below everything registered.
    pub fn group_priority(&self, group: &Group) -> i32 {
        self.get(&group.active_tab().type_id).map(|spec| spec.priority).unwrap_or(i32::MIN)
    }

    pub fn render(&self, tab: &TabDescriptor, width_px: f64) -> Option<String> {
        self.get(&tab.type_id).map(|spec| spec.render(tab, width_px))
    }
}
