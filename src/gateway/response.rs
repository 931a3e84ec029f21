//! Success and error envelopes returned to agents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflow::{ErrorKind, GateFailure, GateKind, Transition, WorkflowError};

/// Machine-readable error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayError {
    pub kind: ErrorKind,

    pub message: String,

    /// Blocking gate, for gate failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,

    /// Remediation the caller can act on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<GateFailure> for GatewayError {
    fn from(failure: GateFailure) -> Self {
        Self {
            kind: ErrorKind::WorkflowGateError,
            message: failure.remediation(),
            gate: Some(failure.gate),
            transition: Some(failure.transition),
            hint: Some(failure.hint),
        }
    }
}

impl From<&WorkflowError> for GatewayError {
    fn from(err: &WorkflowError) -> Self {
        if let WorkflowError::WorkflowGate(failure) = err {
            return failure.clone().into();
        }
        Self { kind: err.kind(), message: err.to_string(), gate: None, transition: None, hint: err.hint() }
    }
}

/// Result of a gateway action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// Whether the action succeeded
    pub success: bool,

    /// Action payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Error details if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<GatewayError>,
}

impl GatewayResponse {
    /// Create a successful response.
    pub fn success(data: Value) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    /// Create an error response.
    pub fn failure(error: GatewayError) -> Self {
        Self { success: false, data: None, error: Some(error) }
    }

    /// Error response with payload.
    pub fn failure_with(error: GatewayError, data: Value) -> Self {
        Self { success: false, data: Some(data), error: Some(error) }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> String {
        // Values here are always representable; fall back to a bare envelope.
        serde_json::to_string(self).unwrap_or_else(|_| format!(r#"{{"success":{}}}"#, self.success))
    }
}
