use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Type reported for records without a classification
pub const TYPE_NONE: &str = "none";

/// Reserved type for group records
pub const TYPE_WORKGROUP: &str = "workgroup";

/// Identity record as stored in the directory (person or group)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    /// Opaque stable identifier
    pub id: String,

    /// Unique account name
    pub name: String,

    pub display_name: Option<String>,

    pub description: Option<String>,

    /// Group records aggregate members and are owned, not managed
    #[serde(alias = "workgroup")]
    pub is_group: bool,

    pub manager_id: Option<String>,

    pub owner_id: Option<String>,

    /// Free-form classification (employee, contractor, ...)
    #[serde(rename = "type")]
    pub identity_type: Option<String>,

    pub inactive: bool,

    /// Ids of the groups this record belongs to
    pub member_of: Vec<String>,

    pub assigned_role_ids: Vec<String>,

    pub detected_role_ids: Vec<String>,

    /// Extended attributes, queried on demand
    pub attributes: BTreeMap<String, Value>,

    pub role_assignments: Vec<RoleAssignment>,

    /// Per-user UI preference flags
    pub preferences: BTreeMap<String, Value>,
}

impl Identity {
    /// Display name, falling back to the account name
    pub fn displayable_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(display) if !display.is_empty() => display,
            _ => &self.name,
        }
    }

    /// Parent in the org chart: owner for groups, manager otherwise
    pub fn parent_id(&self) -> Option<&str> {
        if self.is_group {
            self.owner_id.as_deref()
        } else {
            self.manager_id.as_deref()
        }
    }

    /// Classification with empty or missing values collapsed to `"none"`
    pub fn type_or_none(&self) -> &str {
        match self.identity_type.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => TYPE_NONE,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Attribute rendered as a string; `None` for missing, null or empty values
    pub fn string_attribute(&self, name: &str) -> Option<String> {
        match self.attributes.get(name)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleAssignment {
    pub role_id: String,
    pub role_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyViolation {
    pub name: String,
    pub display_name: Option<String>,
}

impl PolicyViolation {
    pub fn displayable_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Entitlement owned by an identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Entitlement {
    pub application: String,
    pub name: Option<String>,
    pub display_name: Option<String>,
}

impl Entitlement {
    /// `[application]name :display name`
    pub fn label(&self) -> String {
        let name = self.name.as_deref().unwrap_or("");
        let display = self
            .display_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("");
        format!("[{}]{} :{}", self.application, name, display)
    }
}

/// Role owned by an identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OwnedRole {
    pub name: String,
    pub display_name: Option<String>,
}

impl OwnedRole {
    pub fn displayable_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Fields shared by every node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeBase {
    pub id: String,
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub color_code: String,
    /// Always serialized; `null` marks the chart root
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manages_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonNode {
    pub inactive: bool,
    /// Names of the configured card attributes present in `custom`
    pub attributes: Vec<String>,
    pub membership_count: usize,
    pub workgroups: Vec<String>,
    pub assigned_roles: Vec<String>,
    pub detected_roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_violations_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNode {
    pub attributes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeKind {
    Person(PersonNode),
    Group(GroupNode),
}

/// Keys of the built-in node fields; card attributes may not reuse them
pub const RESERVED_NODE_KEYS: &[&str] = &[
    "id",
    "name",
    "displayName",
    "type",
    "colorCode",
    "parentId",
    "managesCount",
    "inactive",
    "attributes",
    "membershipCount",
    "workgroups",
    "assignedRoles",
    "detectedRoles",
    "policyViolationsCount",
    "memberCount",
    "members",
];

/// Display-ready org chart node; serializes as one flat object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    #[serde(flatten)]
    pub base: NodeBase,

    #[serde(flatten)]
    pub kind: NodeKind,

    /// Configured card attributes and icon metadata
    #[serde(flatten)]
    pub custom: BTreeMap<String, Value>,
}

impl Node {
    pub fn id(&self) -> &str {
        &self.base.id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.base.parent_id.as_deref()
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group(_))
    }

    pub fn as_person(&self) -> Option<&PersonNode> {
        match &self.kind {
            NodeKind::Person(person) => Some(person),
            NodeKind::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match &self.kind {
            NodeKind::Group(group) => Some(group),
            NodeKind::Person(_) => None,
        }
    }
}

/// Edge between two chart nodes computed by a connection rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}
