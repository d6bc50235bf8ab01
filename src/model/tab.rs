use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::collections::HashSet;

/// Identity of one tab: what it renders (`type_id`) and which occurrence it is
/// (`instance_key`). Two descriptors are the same tab iff both fields match.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabDescriptor {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(rename = "key")]
    pub instance_key: String,
}

impl TabDescriptor {
    pub fn new(type_id: impl Into<String>, instance_key: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            instance_key: instance_key.into(),
        }
    }
}

impl fmt::Display for TabDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_id, self.instance_key)
    }
}

/// Hands out instance keys that have never been seen in this process.
///
/// Keys look like `<type>-<n>`. Keys observed through [`KeyMinter::observe`]
/// (for example from a loaded layout) are never handed out again.
#[derive(Debug, Default, Clone)]
pub struct KeyMinter {
    next: u64,
    taken: HashSet<String>,
}

impl KeyMinter {
    pub fn new() -> Self { Self::default() }

    pub fn observe<'a>(&mut self, tabs: impl IntoIterator<Item = &'a TabDescriptor>) {
        for tab in tabs {
            self.taken.insert(tab.instance_key.clone());
        }
    }

    pub fn mint(&mut self, type_id: &str) -> TabDescriptor {
        loop {
            self.next += 1;
            let key = format!("{type_id}-{}", self.next);
            if self.taken.insert(key.clone()) {
                return TabDescriptor::new(type_id, key);
            }
        }
    }

    /// Forgets every observed key except those in `tabs`. The counter is kept,
    /// so keys minted before are still not reissued.
    pub fn retain_only<'a>(&mut self, tabs: impl IntoIterator<Item = &'a TabDescriptor>) {
        self.taken.clear();
        self.observe(tabs);
    }

    /// Same type, fresh key.
    pub fn remint(&mut self, tab: &TabDescriptor) -> TabDescriptor { self.mint(&tab.type_id) }
}
