//! Graph miner: recursive search of schema-less page data for video records

use crate::core::stream::StreamRecord;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Default recursion ceiling for a single mining walk
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A field whose string value is a playable address with a fixed quality
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarField {
    pub name: String,
    pub quality: String,
}

/// A field holding a list of resolution variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListField {
    pub name: String,
    /// Sub-field with the variant address
    pub address_key: String,
    pub width_key: String,
    pub height_key: String,
    /// Label used when a variant has no width/height
    pub fallback_quality: String,
}

impl ListField {
    /// List field with `url`/`width`/`height` sub-fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address_key: "url".to_string(),
            width_key: "width".to_string(),
            height_key: "height".to_string(),
            fallback_quality: "Unknown".to_string(),
        }
    }

    pub fn with_fallback_quality(mut self, quality: impl Into<String>) -> Self {
        self.fallback_quality = quality.into();
        self
    }

    fn read_entry<'a>(&self, entry: &'a Value) -> Option<(&'a str, String)> {
        let address = entry
            .get(&self.address_key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())?;

        let dimension = |key: &str| match entry.get(key) {
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };

        let quality = match (dimension(&self.width_key), dimension(&self.height_key)) {
            (Some(w), Some(h)) => format!("{}x{}", w, h),
            _ => self.fallback_quality.clone(),
        };
        Some((address, quality))
    }
}

/// The set of field names a miner recognizes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSpecs {
    scalars: Vec<ScalarField>,
    lists: Vec<ListField>,
}

impl FieldSpecs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recognize `name` as a direct address field labelled `quality`
    pub fn scalar(mut self, name: impl Into<String>, quality: impl Into<String>) -> Self {
        self.scalars.push(ScalarField {
            name: name.into(),
            quality: quality.into(),
        });
        self
    }

    /// Recognize `name` as a variant list with default sub-fields
    pub fn list(self, name: impl Into<String>) -> Self {
        self.list_field(ListField::new(name))
    }

    pub fn list_field(mut self, field: ListField) -> Self {
        self.lists.push(field);
        self
    }

    fn scalar_quality(&self, key: &str) -> Option<&str> {
        self.scalars
            .iter()
            .find(|f| f.name == key)
            .map(|f| f.quality.as_str())
    }

    fn list_spec(&self, key: &str) -> Option<&ListField> {
        self.lists.iter().find(|f| f.name == key)
    }
}

/// Records found by one mining call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MineOutcome {
    pub records: Vec<StreamRecord>,
    /// Branches abandoned because they were deeper than the ceiling
    pub truncated_branches: usize,
}

#[derive(Default)]
struct Walk {
    seen: HashSet<String>,
    outcome: MineOutcome,
}

impl Walk {
    fn emit(&mut self, address: &str, quality: &str) {
        if address.is_empty() || self.seen.contains(address) {
            return;
        }
        trace!("Mined stream {} ({})", address, quality);
        self.seen.insert(address.to_string());
        self.outcome
            .records
            .push(StreamRecord::deep_scan(address, quality));
    }
}

/// Depth-first miner over a parsed manifest
#[derive(Debug, Clone, Copy)]
pub struct GraphMiner {
    max_depth: usize,
}

impl GraphMiner {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Mine `graph` for recognized fields, deduplicated by address
    pub fn mine(&self, graph: &Value, specs: &FieldSpecs) -> Vec<StreamRecord> {
        self.mine_report(graph, specs).records
    }

    /// Like [`GraphMiner::mine`], also reporting abandoned branches
    pub fn mine_report(&self, graph: &Value, specs: &FieldSpecs) -> MineOutcome {
        let mut walk = Walk::default();
        self.walk(graph, 0, specs, &mut walk);
        if walk.outcome.truncated_branches > 0 {
            debug!(
                "Skipped {} branches deeper than {} levels",
                walk.outcome.truncated_branches, self.max_depth
            );
        }
        walk.outcome
    }

    fn walk(&self, node: &Value, depth: usize, specs: &FieldSpecs, walk: &mut Walk) {
        if depth > self.max_depth {
            walk.outcome.truncated_branches += 1;
            return;
        }

        match node {
            Value::Object(map) => {
                for (key, value) in map {
                    if let Some(quality) = specs.scalar_quality(key) {
                        if let Some(address) = value.as_str() {
                            walk.emit(address, quality);
                        }
                    }

                    if let Some(list) = specs.list_spec(key) {
                        if let Some(entries) = value.as_array() {
                            for entry in entries {
                                if let Some((address, quality)) = list.read_entry(entry) {
                                    walk.emit(address, &quality);
                                }
                            }
                        }
                    }

                    if is_container(value) {
                        self.walk(value, depth + 1, specs, walk);
                    }
                }
            }
            Value::Array(items) => {
                for item in items.iter().filter(|v| is_container(v)) {
                    self.walk(item, depth + 1, specs, walk);
                }
            }
            _ => {}
        }
    }
}

impl Default for GraphMiner {
    fn default() -> Self {
        Self::new()
    }
}

fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

/// Mine `graph` with the default depth ceiling
pub fn mine(graph: &Value, specs: &FieldSpecs) -> Vec<StreamRecord> {
    GraphMiner::new().mine(graph, specs)
}
