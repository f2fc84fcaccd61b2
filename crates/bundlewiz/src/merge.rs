// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Deep merge of configuration trees.
//!
//! - Mappings merge key by key, recursively.
//! - Sequences are replaced by the override, except under [`PLUGINS_KEY`].
//! - Scalars and mismatched types: the override wins.
//!
//! Plugin entries are identified by their [`PLUGIN_KIND_FIELD`]. An override
//! plugin with a kind already present in the base takes the base entry's
//! position; other override plugins are appended in their own order.
//! Entries without a kind are never treated as duplicates of each other.

use indexmap::IndexMap;
use serde_json::Value;

use crate::config::ConfigTree;

#[cfg(test)]
#[path = "./merge_test.rs"]
mod merge_test;

/// Key holding the build entry points; the override always replaces it.
pub const ENTRY_KEY: &str = "entry";

/// Key holding the ordered plugin collection.
pub const PLUGINS_KEY: &str = "plugins";

/// Field naming a plugin entry's identity.
pub const PLUGIN_KIND_FIELD: &str = "kind";

/// Merge `overlay` on top of `base`, returning a new tree.
///
/// Neither argument is modified. An empty mapping on either side yields the
/// other side unchanged.
pub fn merge(base: &ConfigTree, overlay: &ConfigTree) -> ConfigTree {
    if is_empty_mapping(overlay) {
        return base.clone();
    }
    if is_empty_mapping(base) {
        return overlay.clone();
    }
    merge_value(None, base, overlay)
}

fn is_empty_mapping(value: &Value) -> bool {
    value.as_object().is_some_and(|map| map.is_empty())
}

fn merge_value(key: Option<&str>, base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let value = match base_map.get(key) {
                    Some(base_value) => merge_value(Some(key.as_str()), base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        (Value::Array(base_items), Value::Array(overlay_items)) => match key {
            Some(PLUGINS_KEY) => Value::Array(merge_plugins(base_items, overlay_items)),
            // entry points and every other sequence: the override replaces
            _ => overlay.clone(),
        },
        (_, overlay) => overlay.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PluginIdentity {
    Kind(String),
    Anonymous(usize),
}

fn merge_plugins(base: &[Value], overlay: &[Value]) -> Vec<Value> {
    let mut combined: IndexMap<PluginIdentity, Value> = IndexMap::new();
    for (index, plugin) in base.iter().chain(overlay).enumerate() {
        let identity = plugin
            .get(PLUGIN_KIND_FIELD)
            .and_then(Value::as_str)
            .map_or(PluginIdentity::Anonymous(index), |kind| {
                PluginIdentity::Kind(kind.to_string())
            });
        combined.insert(identity, plugin.clone());
    }
    combined.into_values().collect()
}
