//! API spec → internal IR (intermediate representation)
//!
//! Fetches the provider's self-description (`api_action=api.spec`) and
//! parses it into an [`ApiSpec`] the synthesizer can consume.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::client::Endpoint;
use crate::error::SpecError;
use crate::transport::Transport;

/// The `api_action` that returns the spec document.
pub const SPEC_ACTION: &str = "api.spec";

/// Parsed spec document.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ApiSpec {
    /// `DATA.VERSION`
    pub version: String,
    /// Actions keyed by dotted name (e.g. "linode.list")
    pub actions: BTreeMap<String, ActionDescriptor>,
}

/// One remote action as described by the spec.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ActionDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: BTreeMap<String, ParameterDescriptor>,
    /// Error codes from the comma-separated `THROWS` field
    pub throws: BTreeSet<String>,
}

/// A single action parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ParameterDescriptor {
    pub description: String,
    pub required: bool,
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
            throws: BTreeSet::new(),
        }
    }

    pub fn param(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.parameters.insert(
            name.into(),
            ParameterDescriptor {
                description: description.into(),
                required,
            },
        );
        self
    }

    pub fn throws(mut self, code: impl Into<String>) -> Self {
        self.throws.insert(code.into());
        self
    }
}

impl ApiSpec {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            actions: BTreeMap::new(),
        }
    }

    pub fn action(mut self, action: ActionDescriptor) -> Self {
        self.actions.insert(action.name.clone(), action);
        self
    }
}

/// Fetch and parse the spec from `endpoint`.
///
/// One blocking GET, no retries. Any failure means there is no usable spec.
pub fn fetch(transport: &impl Transport, endpoint: &Endpoint) -> Result<ApiSpec, SpecError> {
    let query = [("api_action".to_string(), SPEC_ACTION.to_string())];
    let body = transport.get(endpoint.base_url(), &query)?.json()?;
    let spec = parse_spec(&body)?;

    tracing::debug!(
        version = %spec.version,
        actions = spec.actions.len(),
        "fetched API spec"
    );

    Ok(spec)
}

/// Parse a decoded spec document.
pub fn parse_spec(doc: &Value) -> Result<ApiSpec, SpecError> {
    let data = doc
        .get("DATA")
        .filter(|d| d.is_object())
        .ok_or(SpecError::MissingField { field: "DATA" })?;

    let version = match data.get("VERSION") {
        Some(Value::String(s)) => s.clone(),
        // Some deployments publish the version as a bare number
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => {
            return Err(SpecError::InvalidField {
                field: "DATA.VERSION".into(),
            })
        }
        None => {
            return Err(SpecError::MissingField {
                field: "DATA.VERSION",
            })
        }
    };

    let methods = data.get("METHODS").ok_or(SpecError::MissingField {
        field: "DATA.METHODS",
    })?;
    let methods = methods.as_object().ok_or_else(|| SpecError::InvalidField {
        field: "DATA.METHODS".into(),
    })?;

    let mut actions = BTreeMap::new();
    for (name, info) in methods {
        actions.insert(name.clone(), parse_action(name, info)?);
    }

    Ok(ApiSpec { version, actions })
}

fn parse_action(name: &str, info: &Value) -> Result<ActionDescriptor, SpecError> {
    if !info.is_object() {
        return Err(SpecError::InvalidField {
            field: format!("DATA.METHODS.{name}"),
        });
    }

    let description = info
        .get("DESCRIPTION")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    // An empty parameter list is serialized as `[]` rather than `{}`
    let parameters = info
        .get("PARAMETERS")
        .and_then(|v| v.as_object())
        .map(|params| {
            params
                .iter()
                .map(|(p, v)| (p.clone(), parse_param(v)))
                .collect()
        })
        .unwrap_or_default();

    let throws = info
        .get("THROWS")
        .and_then(|v| v.as_str())
        .map(split_throws)
        .unwrap_or_default();

    Ok(ActionDescriptor {
        name: name.to_string(),
        description,
        parameters,
        throws,
    })
}

fn parse_param(param: &Value) -> ParameterDescriptor {
    let description = param
        .get("DESCRIPTION")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let required = param
        .get("REQUIRED")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    ParameterDescriptor {
        description,
        required,
    }
}

fn split_throws(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}
