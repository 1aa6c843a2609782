//! Wire payloads of the org chart request surface.
//!
//! Every response carries its payload plus an optional human readable
//! `message`; failures set the message and leave the payload empty.

use anyhow::Result;
use orgchart_graph::{
    Connection, ConnectionOutcome, Details, GraphError, Node, OrgTree, RuleArgs,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Preference flag hiding the guided tour
pub const PREFERENCE_GUIDE_TOUR_INACTIVE: &str = "orgChartPluginGuideTourInactive";

/// Message used when a connections request lacks node ids
pub const MISSING_NODE_IDS_MESSAGE: &str = "allNodeIds is missing";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn from_graph_error(err: &GraphError) -> Self {
        let hint = match err {
            GraphError::NotFound(_) => Some("Check the record id against the directory snapshot.".to_string()),
            GraphError::ConfigurationMissing(_) => Some(
                "Register the rule named by connection_rule or clear the setting.".to_string(),
            ),
            GraphError::InvalidSettings(_) => Some("Fix the settings file and retry.".to_string()),
            _ => None,
        };
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            hint,
        }
    }
}

/// Body of the tree and children requests
#[derive(Debug, Clone, Serialize)]
pub struct TreeResponse {
    pub nodes: Option<Vec<Node>>,
    pub message: Option<String>,
    /// Ids left out because they could not be resolved
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

impl TreeResponse {
    pub fn from_tree(tree: OrgTree) -> Self {
        Self {
            nodes: Some(tree.nodes),
            message: None,
            skipped: tree.skipped,
        }
    }

    pub fn from_nodes(nodes: Vec<Node>, skipped: Vec<String>) -> Self {
        Self {
            nodes: Some(nodes),
            message: None,
            skipped,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            nodes: None,
            message: Some(message.into()),
            skipped: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionsRequest {
    pub all_node_ids: Option<Vec<String>>,

    /// Extra keys are handed to the rule untouched
    #[serde(flatten)]
    pub extra: RuleArgs,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionsResponse {
    pub connections: Vec<Connection>,
    pub message: Option<String>,
}

impl ConnectionsResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            connections: Vec::new(),
            message: Some(message.into()),
        }
    }
}

impl From<ConnectionOutcome> for ConnectionsResponse {
    fn from(outcome: ConnectionOutcome) -> Self {
        Self {
            connections: outcome.connections,
            message: outcome.message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailsResponse {
    pub details: Option<Details>,
    pub message: Option<String>,
}

impl DetailsResponse {
    pub fn ok(details: Details) -> Self {
        Self {
            details: Some(details),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            details: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceResponse {
    pub preference: BTreeMap<String, Value>,
    pub node_types: BTreeMap<String, String>,
}

impl PreferenceResponse {
    /// Guided-tour flag read from stored preferences, `false` when unset
    pub fn new(
        stored: &BTreeMap<String, Value>,
        node_types: BTreeMap<String, String>,
    ) -> Self {
        let inactive = stored
            .get(PREFERENCE_GUIDE_TOUR_INACTIVE)
            .map(value_to_bool)
            .unwrap_or(false);
        Self {
            preference: BTreeMap::from([(
                PREFERENCE_GUIDE_TOUR_INACTIVE.to_string(),
                Value::Bool(inactive),
            )]),
            node_types,
        }
    }
}

/// Body of a preference update: flag name -> value
pub type PreferenceUpdate = BTreeMap<String, Value>;

fn value_to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}

/// JSON schemas of the request bodies, keyed by request name
pub fn request_schemas() -> Result<Value> {
    Ok(serde_json::json!({
        "connections": serde_json::to_value(schemars::schema_for!(ConnectionsRequest))?,
        "preference": serde_json::to_value(schemars::schema_for!(PreferenceUpdate))?,
    }))
}

pub fn serialize_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(value).map_err(Into::into)
    } else {
        serde_json::to_string(value).map_err(Into::into)
    }
}
