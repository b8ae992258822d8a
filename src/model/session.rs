//! Widget session aggregate.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::api::{OrchestrationApi, WidgetSessionPayload};
use crate::error::{Result, SchemaError};
use crate::model::control::Control;
use crate::model::null_as_default;
use crate::model::registry::ControlRegistry;

/// One stage of a session, holding its controls in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub guid: String,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub controls: Vec<Control>,
}

#[derive(Deserialize)]
struct StepFields {
    guid: String,
    name: String,
    code: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    controls: Value,
}

impl Step {
    pub fn decode(json: &Value, registry: &ControlRegistry) -> std::result::Result<Self, SchemaError> {
        let fields: StepFields = serde_json::from_value(json.clone())
            .map_err(|e| SchemaError::from_serde("step", &e))?;

        let controls = members(&fields.controls, "step controls")?
            .into_iter()
            .map(|control| registry.decode(control))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            guid: fields.guid,
            name: fields.name,
            code: fields.code,
            description: fields.description,
            controls,
        })
    }

    /// Wire JSON; controls are keyed by their guid, in step order.
    pub fn encode(&self) -> std::result::Result<Value, SchemaError> {
        let mut controls = Map::new();
        for control in &self.controls {
            controls.insert(control.guid().to_string(), control.encode()?);
        }
        Ok(json!({
            "guid": self.guid,
            "name": self.name,
            "code": self.code,
            "description": self.description,
            "controls": controls,
        }))
    }

    pub fn control_by_code(&self, code: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.code() == code)
    }

    pub fn control_by_code_mut(&mut self, code: &str) -> Option<&mut Control> {
        self.controls.iter_mut().find(|c| c.code() == code)
    }

    pub fn control_by_guid(&self, guid: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.guid() == guid)
    }
}

/// Scalar fields of the `widget` object.
#[derive(Deserialize)]
struct WidgetFields {
    current_step: Value,
    code: String,
    name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    description: Option<String>,
    async_execute: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    settings: Map<String, Value>,
    #[serde(default)]
    expand_data: Value,
}

/// A guided-form execution instance, fetched fresh for every job invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub guid: String,
    /// Reference to the current step, normally that step's guid.
    pub current_step: Value,
    pub code: String,
    pub name: String,
    pub status: Option<String>,
    pub description: Option<String>,
    pub async_execute: bool,
    pub settings: Map<String, Value>,
    pub expand_data: Value,
    pub steps: Vec<Step>,
}

impl Session {
    /// Fetch and decode the session `guid` from the orchestration API.
    pub async fn load(
        api: &dyn OrchestrationApi,
        registry: &ControlRegistry,
        guid: &str,
    ) -> Result<Self> {
        let payload = api.get_widget_session(guid).await?;
        let session = Self::from_payload(guid, &payload, registry)?;
        tracing::debug!(session = %guid, steps = session.steps.len(), "Loaded widget session");
        Ok(session)
    }

    pub fn from_payload(
        guid: &str,
        payload: &WidgetSessionPayload,
        registry: &ControlRegistry,
    ) -> std::result::Result<Self, SchemaError> {
        let widget: WidgetFields = serde_json::from_value(payload.widget.clone())
            .map_err(|e| SchemaError::from_serde("widget", &e))?;

        let steps = members(&payload.steps, "session steps")?
            .into_iter()
            .map(|step| Step::decode(step, registry))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            guid: guid.to_string(),
            current_step: widget.current_step,
            code: widget.code,
            name: widget.name,
            status: widget.status,
            description: widget.description,
            async_execute: widget.async_execute,
            settings: widget.settings,
            expand_data: widget.expand_data,
            steps,
        })
    }

    /// Decode the `{widget, steps}` shape produced by [`Session::encode`].
    pub fn decode(
        guid: &str,
        json: &Value,
        registry: &ControlRegistry,
    ) -> std::result::Result<Self, SchemaError> {
        let payload: WidgetSessionPayload = serde_json::from_value(json.clone())
            .map_err(|e| SchemaError::from_serde("widget session", &e))?;
        Self::from_payload(guid, &payload, registry)
    }

    /// Wire JSON: the `widget` scalars plus steps keyed by guid.
    pub fn encode(&self) -> std::result::Result<Value, SchemaError> {
        let mut steps = Map::new();
        for step in &self.steps {
            steps.insert(step.guid.clone(), step.encode()?);
        }
        Ok(json!({
            "widget": {
                "guid": self.guid,
                "current_step": self.current_step,
                "code": self.code,
                "name": self.name,
                "status": self.status,
                "description": self.description,
                "async_execute": self.async_execute,
            },
            "steps": steps,
        }))
    }

    pub fn step_by_code(&self, code: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.code == code)
    }

    pub fn step_by_code_mut(&mut self, code: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.code == code)
    }

    /// The step whose guid equals `current_step`, if any.
    pub fn current_step(&self) -> Option<&Step> {
        let current = self.current_step.as_str()?;
        self.steps.iter().find(|s| s.guid == current)
    }

    pub fn current_step_mut(&mut self) -> Option<&mut Step> {
        let current = self.current_step.as_str()?.to_string();
        self.steps.iter_mut().find(|s| s.guid == current)
    }

    pub fn control_by_code<'a>(&self, step: &'a Step, code: &str) -> Option<&'a Control> {
        step.control_by_code(code)
    }
}

/// Members of a collection sent either as a list or as a guid-keyed map.
fn members<'a>(value: &'a Value, entity: &str) -> std::result::Result<Vec<&'a Value>, SchemaError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(list) => Ok(list.iter().collect()),
        Value::Object(map) => Ok(map.values().collect()),
        other => Err(SchemaError::InvalidValue {
            entity: entity.to_string(),
            reason: format!("expected a list or map, got {other}"),
        }),
    }
}
