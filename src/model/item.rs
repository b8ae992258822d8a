//! Selectable entries of list- and tree-shaped controls.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::null_as_default;

/// An entry of a check-box list, drop-down list or group list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub id: Option<Value>,
    pub value: Value,
    pub checked: bool,
    /// Free-form; any JSON passes through unchanged.
    #[serde(default)]
    pub style: Value,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub describe: Option<Map<String, Value>>,
}

impl Item {
    pub fn new(value: impl Into<Value>, checked: bool) -> Self {
        Self {
            id: None,
            value: value.into(),
            checked,
            style: Value::Null,
            description: None,
            describe: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<Value>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_describe(mut self, describe: Map<String, Value>) -> Self {
        self.describe = Some(describe);
        self
    }
}

/// An entry of a tree view. Children nest to any depth.
///
/// Children are owned values, so a tree decoded from JSON can never refer
/// back to one of its ancestors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeItem {
    #[serde(default)]
    pub id: Option<Value>,
    pub value: Value,
    pub checked: bool,
    /// Free-form; any JSON passes through unchanged.
    #[serde(default)]
    pub style: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub describe: Option<Map<String, Value>>,
    #[serde(default)]
    pub expand: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<TreeItem>,
}

impl TreeItem {
    pub fn new(value: impl Into<Value>, checked: bool) -> Self {
        Self {
            id: None,
            value: value.into(),
            checked,
            style: Value::Null,
            description: None,
            describe: None,
            expand: false,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<TreeItem>) -> Self {
        self.children = children;
        self
    }

    /// Depth of this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut level: Vec<&TreeItem> = vec![self];
        while !level.is_empty() {
            depth += 1;
            level = level.iter().flat_map(|item| item.children.iter()).collect();
        }
        depth
    }
}
