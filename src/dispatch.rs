//! Operation + arguments → HTTP request dispatch
//!
//! Validates a call against its [`Operation`], assembles the query string,
//! performs the round trip and unpacks the provider's response envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::builder::Operation;
use crate::error::{Error, TransportError};
use crate::transport::Transport;

/// Caller-supplied arguments, keyed by parameter name.
pub type Args = Map<String, Value>;

/// Fields the dispatcher injects into every request.
const INJECTED: [&str; 3] = ["api_key", "api_action", "api_responseFormat"];

/// Decoded response body of an action call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "ACTION", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(rename = "DATA", default)]
    pub data: Value,
    #[serde(rename = "ERRORARRAY", default)]
    pub errors: Vec<ErrorRecord>,
    /// Any other top-level provider metadata
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of `ERRORARRAY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(rename = "ERRORCODE")]
    pub code: i64,
    #[serde(rename = "ERRORMESSAGE", default)]
    pub message: String,
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub envelope: Envelope,
    /// Credential issued by the bootstrap action, if this was that action
    pub issued_key: Option<String>,
}

/// Execute `op` with `args`.
///
/// Nothing touches the network until the credential and required
/// arguments have been checked.
#[instrument(skip_all, fields(action = %op.action))]
pub fn dispatch(
    transport: &impl Transport,
    base_url: &str,
    api_key: Option<&str>,
    op: &Operation,
    args: &Args,
) -> Result<Dispatched, Error> {
    validate(op, api_key, args)?;

    let query = build_query_pairs(op, api_key, args);
    let resp = transport.get(base_url, &query)?;
    tracing::debug!(status = %resp.status, "received response");

    let body = resp.json()?;
    let mut envelope: Envelope = serde_json::from_value(body)
        .map_err(|e| TransportError::UnexpectedPayload {
            reason: e.to_string(),
        })?;

    // Only one error can be surfaced per call; the rest are dropped.
    if let Some(error) = envelope.errors.pop() {
        return Err(Error::Api {
            code: error.code,
            message: error.message,
        });
    }

    let issued_key = if op.is_bootstrap() {
        Some(extract_api_key(&envelope)?)
    } else {
        None
    };

    Ok(Dispatched {
        envelope,
        issued_key,
    })
}

/// Check preconditions that must hold before any request is made.
pub fn validate(op: &Operation, api_key: Option<&str>, args: &Args) -> Result<(), Error> {
    if api_key.map_or(true, str::is_empty) && !op.is_bootstrap() {
        return Err(Error::MissingCredential {
            operation: op.name.clone(),
        });
    }

    if let Some(missing) = op.required.iter().find(|name| !args.contains_key(*name)) {
        return Err(Error::MissingArgument {
            operation: op.name.clone(),
            name: missing.clone(),
        });
    }

    Ok(())
}

fn build_query_pairs(op: &Operation, api_key: Option<&str>, args: &Args) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = args
        .iter()
        .filter(|(name, _)| !INJECTED.contains(&name.as_str()))
        .filter_map(|(name, val)| query_value(val).map(|v| (name.clone(), v)))
        .collect();

    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        pairs.push(("api_key".to_string(), key.to_string()));
    }
    pairs.push(("api_action".to_string(), op.action.clone()));
    pairs.push(("api_responseFormat".to_string(), "json".to_string()));

    pairs
}

fn query_value(val: &Value) -> Option<String> {
    match val {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn extract_api_key(envelope: &Envelope) -> Result<String, TransportError> {
    envelope
        .data
        .get("API_KEY")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| TransportError::UnexpectedPayload {
            reason: "DATA.API_KEY missing from user.getapikey response".to_string(),
        })
}
