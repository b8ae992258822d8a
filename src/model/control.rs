//! Typed form controls.
//!
//! Every control shares [`ControlBase`]; each wire `type` has its own struct
//! carrying the variant's extra fields, and [`Control`] is the closed union of
//! them. A few variants expose properties that also live as keys of the
//! `describe` bag (`show_filter`, `columns`/`rows`/`pages`, `header`). Those
//! are written through one mutator that updates both places, and
//! [`Control::set_describe`] re-reads them after any raw bag write.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::model::item::{Item, TreeItem};
use crate::model::null_as_default;

const SHOW_FILTER: &str = "show_filter";
const COLUMNS: &str = "columns";
const ROWS: &str = "rows";
const PAGES: &str = "pages";
const HEADER: &str = "header";

/// Fields common to every control, in wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlBase {
    pub guid: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    describe: Map<String, Value>,
    pub alert: bool,
    #[serde(default)]
    pub alert_style: Value,
    pub order: i64,
    pub hide: bool,
    pub disabled: bool,
    #[serde(rename = "type")]
    kind: String,
    /// Free-form; any JSON passes through unchanged.
    #[serde(default)]
    pub style: Value,
}

impl ControlBase {
    /// The open metadata bag.
    pub fn describe(&self) -> &Map<String, Value> {
        &self.describe
    }

    /// The wire `type` tag this control was decoded from.
    pub fn type_tag(&self) -> &str {
        &self.kind
    }

    fn mirror(&mut self, key: &str, value: Value) {
        self.describe.insert(key.to_string(), value);
    }

    fn bool_key(&self, key: &str) -> bool {
        self.describe.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    fn list_key(&self, key: &str) -> Vec<Value> {
        self.describe
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    #[serde(flatten)]
    pub base: ControlBase,
    pub value: Value,
    pub default_value: Value,
}

/// Date picker. Anything but an ISO date string decodes to `None`, which
/// re-encodes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    #[serde(flatten)]
    pub base: ControlBase,
    #[serde(deserialize_with = "iso_date_or_none")]
    pub value: Option<NaiveDate>,
    pub default_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckBoxList {
    #[serde(flatten)]
    pub base: ControlBase,
    pub value: Value,
    pub default_value: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<Item>,
    #[serde(skip)]
    show_filter: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropDownList {
    #[serde(flatten)]
    pub base: ControlBase,
    pub value: Value,
    pub default_value: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<Item>,
    #[serde(skip)]
    show_filter: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupList {
    #[serde(flatten)]
    pub base: ControlBase,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<Item>,
    #[serde(skip)]
    show_filter: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeView {
    #[serde(flatten)]
    pub base: ControlBase,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<TreeItem>,
}

/// Tabular view. Its data lives entirely in `describe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataView {
    #[serde(flatten)]
    pub base: ControlBase,
    #[serde(skip)]
    columns: Vec<Value>,
    #[serde(skip)]
    rows: Vec<Value>,
    #[serde(skip)]
    pages: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDownload {
    #[serde(flatten)]
    pub base: ControlBase,
    /// File reference.
    pub url: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(flatten)]
    pub base: ControlBase,
    pub value: Value,
    pub default_value: Value,
    #[serde(skip)]
    header: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(flatten)]
    pub base: ControlBase,
    pub value: Value,
    pub default_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    #[serde(flatten)]
    pub base: ControlBase,
}

macro_rules! show_filter_accessors {
    ($($ty:ident),*) => {$(
        impl $ty {
            pub fn show_filter(&self) -> bool {
                self.show_filter
            }

            /// Set `show_filter` and its `describe` mirror together.
            pub fn set_show_filter(&mut self, value: bool) {
                self.show_filter = value;
                self.base.mirror(SHOW_FILTER, Value::Bool(value));
            }
        }
    )*};
}

show_filter_accessors!(CheckBoxList, DropDownList, GroupList);

impl DataView {
    pub fn columns(&self) -> &[Value] {
        &self.columns
    }

    pub fn set_columns(&mut self, columns: Vec<Value>) {
        self.base.mirror(COLUMNS, Value::Array(columns.clone()));
        self.columns = columns;
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    pub fn set_rows(&mut self, rows: Vec<Value>) {
        self.base.mirror(ROWS, Value::Array(rows.clone()));
        self.rows = rows;
    }

    pub fn pages(&self) -> &[Value] {
        &self.pages
    }

    pub fn set_pages(&mut self, pages: Vec<Value>) {
        self.base.mirror(PAGES, Value::Array(pages.clone()));
        self.pages = pages;
    }
}

impl Alert {
    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn set_header(&mut self, header: impl Into<String>) {
        let header = header.into();
        self.base.mirror(HEADER, Value::String(header.clone()));
        self.header = header;
    }
}

/// A decoded control of any variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    TextBox(TextBox),
    Calendar(Calendar),
    CheckBoxList(CheckBoxList),
    DropDownList(DropDownList),
    Button(Button),
    GroupList(GroupList),
    TreeView(TreeView),
    DataView(DataView),
    FileDownload(FileDownload),
    Alert(Alert),
    Comment(Comment),
}

macro_rules! each_variant {
    ($control:expr, $inner:ident => $body:expr) => {
        match $control {
            Control::TextBox($inner) => $body,
            Control::Calendar($inner) => $body,
            Control::CheckBoxList($inner) => $body,
            Control::DropDownList($inner) => $body,
            Control::Button($inner) => $body,
            Control::GroupList($inner) => $body,
            Control::TreeView($inner) => $body,
            Control::DataView($inner) => $body,
            Control::FileDownload($inner) => $body,
            Control::Alert($inner) => $body,
            Control::Comment($inner) => $body,
        }
    };
}

macro_rules! variant_from {
    ($($ty:ident),*) => {$(
        impl From<$ty> for Control {
            fn from(inner: $ty) -> Self {
                Control::$ty(inner)
            }
        }
    )*};
}

variant_from!(
    TextBox,
    Calendar,
    CheckBoxList,
    DropDownList,
    Button,
    GroupList,
    TreeView,
    DataView,
    FileDownload,
    Alert,
    Comment
);

impl Control {
    pub fn base(&self) -> &ControlBase {
        each_variant!(self, c => &c.base)
    }

    pub fn base_mut(&mut self) -> &mut ControlBase {
        each_variant!(self, c => &mut c.base)
    }

    pub fn guid(&self) -> &str {
        &self.base().guid
    }

    pub fn code(&self) -> &str {
        &self.base().code
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn type_tag(&self) -> &str {
        self.base().type_tag()
    }

    pub fn describe(&self) -> &Map<String, Value> {
        self.base().describe()
    }

    /// Write a raw `describe` key. Mirrored properties follow the new value.
    pub fn set_describe(&mut self, key: impl Into<String>, value: Value) {
        self.base_mut().describe.insert(key.into(), value);
        self.sync_from_describe();
    }

    /// Flat items of list-shaped controls.
    pub fn items(&self) -> Option<&[Item]> {
        match self {
            Control::CheckBoxList(c) => Some(&c.items),
            Control::DropDownList(c) => Some(&c.items),
            Control::GroupList(c) => Some(&c.items),
            _ => None,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<Item>> {
        match self {
            Control::CheckBoxList(c) => Some(&mut c.items),
            Control::DropDownList(c) => Some(&mut c.items),
            Control::GroupList(c) => Some(&mut c.items),
            _ => None,
        }
    }

    pub fn tree_items(&self) -> Option<&[TreeItem]> {
        match self {
            Control::TreeView(c) => Some(&c.items),
            _ => None,
        }
    }

    pub fn tree_items_mut(&mut self) -> Option<&mut Vec<TreeItem>> {
        match self {
            Control::TreeView(c) => Some(&mut c.items),
            _ => None,
        }
    }

    /// Wire JSON: base fields followed by the variant's own fields.
    pub fn encode(&self) -> Result<Value, SchemaError> {
        serde_json::to_value(self).map_err(|e| SchemaError::InvalidValue {
            entity: format!("{} control", self.type_tag()),
            reason: e.to_string(),
        })
    }

    /// Refresh mirrored properties from the `describe` bag.
    pub(crate) fn sync_from_describe(&mut self) {
        match self {
            Control::CheckBoxList(c) => c.show_filter = c.base.bool_key(SHOW_FILTER),
            Control::DropDownList(c) => c.show_filter = c.base.bool_key(SHOW_FILTER),
            Control::GroupList(c) => c.show_filter = c.base.bool_key(SHOW_FILTER),
            Control::DataView(c) => {
                c.columns = c.base.list_key(COLUMNS);
                c.rows = c.base.list_key(ROWS);
                c.pages = c.base.list_key(PAGES);
            }
            Control::Alert(c) => {
                c.header = c
                    .base
                    .describe
                    .get(HEADER)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
            }
            _ => {}
        }
    }
}

impl Serialize for Control {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        each_variant!(self, c => c.serialize(serializer))
    }
}

fn iso_date_or_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => s
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid calendar date {s:?}: {e}"))),
        _ => Ok(None),
    }
}
