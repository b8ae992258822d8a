//! Control decode dispatch keyed by the wire `type` tag.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SchemaError;
use crate::model::control::{
    Alert, Button, Calendar, CheckBoxList, Comment, Control, DataView, DropDownList, FileDownload,
    GroupList, TextBox, TreeView,
};

/// Builds a [`Control`] from its wire JSON.
pub type ControlDecoder = fn(Value) -> Result<Control, serde_json::Error>;

/// Tags every orchestration API is expected to serve.
const BUILTIN_CONTROLS: &[(&str, ControlDecoder)] = &[
    ("text_box", decode_as::<TextBox>),
    ("calendar", decode_as::<Calendar>),
    ("check_box_list", decode_as::<CheckBoxList>),
    ("drop_down_list", decode_as::<DropDownList>),
    ("button", decode_as::<Button>),
    ("group_list", decode_as::<GroupList>),
    ("tree_view", decode_as::<TreeView>),
    ("data_view", decode_as::<DataView>),
    ("file_download", decode_as::<FileDownload>),
    ("alert", decode_as::<Alert>),
    ("comment", decode_as::<Comment>),
];

fn decode_as<T>(json: Value) -> Result<Control, serde_json::Error>
where
    T: DeserializeOwned + Into<Control>,
{
    serde_json::from_value::<T>(json).map(Into::into)
}

/// Registry of control decoders. Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ControlRegistry {
    decoders: HashMap<String, ControlDecoder>,
}

impl ControlRegistry {
    /// A registry with every built-in control type.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for (tag, decoder) in BUILTIN_CONTROLS {
            registry.register(*tag, *decoder);
        }
        registry
    }

    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Bind `tag` to a decoder, replacing any previous binding.
    pub fn register(&mut self, tag: impl Into<String>, decoder: ControlDecoder) {
        let tag = tag.into();
        if self.decoders.insert(tag.clone(), decoder).is_some() {
            tracing::debug!(tag = %tag, "Replaced control decoder");
        }
    }

    pub fn has(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Decode one control.
    pub fn decode(&self, json: &Value) -> Result<Control, SchemaError> {
        let tag = json
            .get("type")
            .ok_or_else(|| SchemaError::MissingField {
                entity: "control".to_string(),
                field: "type".to_string(),
            })?
            .as_str()
            .ok_or_else(|| SchemaError::InvalidValue {
                entity: "control".to_string(),
                reason: "`type` must be a string".to_string(),
            })?;

        let decoder = self
            .decoders
            .get(tag)
            .ok_or_else(|| SchemaError::UnknownControlType {
                tag: tag.to_string(),
            })?;

        let mut control = decoder(json.clone())
            .map_err(|e| SchemaError::from_serde(&format!("{tag} control"), &e))?;
        control.sync_from_describe();
        Ok(control)
    }

    /// Encode one control back to its wire JSON.
    pub fn encode(&self, control: &Control) -> Result<Value, SchemaError> {
        control.encode()
    }
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::new()
    }
}
