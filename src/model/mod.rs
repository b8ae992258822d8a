//! In-memory model of a widget session: steps, controls, items.
//!
//! Decoded from the orchestration API's JSON, mutated by job bodies, and
//! re-encoded in the same wire shape.

pub mod control;
pub mod item;
pub mod registry;
pub mod response;
pub mod session;
pub mod webhook;

pub use control::{
    Alert, Button, Calendar, CheckBoxList, Comment, Control, ControlBase, DataView, DropDownList,
    FileDownload, GroupList, TextBox, TreeView,
};
pub use item::{Item, TreeItem};
pub use registry::{ControlDecoder, ControlRegistry};
pub use response::{Response, Status};
pub use session::{Session, Step};
pub use webhook::Webhook;

use serde::{Deserialize, Deserializer};

/// Treat an explicit `null` like an absent key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
