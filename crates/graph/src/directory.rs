use crate::error::{GraphError, Result};
use crate::types::{Connection, Entitlement, Identity, OwnedRole, PolicyViolation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Query over identity records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `managerId == id`
    ManagedBy(String),

    /// `ownerId == id`
    OwnedBy(String),

    /// Record lists the group id in `memberOf`
    MemberOf(String),

    /// Group vs. non-group discriminator
    IsGroup(bool),

    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    /// People (non-group records) managed by `id`
    pub fn managed_people(id: &str) -> Self {
        Filter::And(vec![
            Filter::ManagedBy(id.to_string()),
            Filter::IsGroup(false),
        ])
    }

    /// Groups owned by `id`
    pub fn owned_groups(id: &str) -> Self {
        Filter::And(vec![Filter::OwnedBy(id.to_string()), Filter::IsGroup(true)])
    }

    /// Everything `id` is a parent of; backs `managesCount`
    pub fn managed_or_owned(id: &str) -> Self {
        Filter::Or(vec![Self::managed_people(id), Self::owned_groups(id)])
    }

    pub fn members_of(group_id: &str) -> Self {
        Filter::MemberOf(group_id.to_string())
    }

    pub fn matches(&self, identity: &Identity) -> bool {
        match self {
            Filter::ManagedBy(id) => identity.manager_id.as_deref() == Some(id.as_str()),
            Filter::OwnedBy(id) => identity.owner_id.as_deref() == Some(id.as_str()),
            Filter::MemberOf(group) => identity.member_of.iter().any(|g| g == group),
            Filter::IsGroup(flag) => identity.is_group == *flag,
            Filter::And(filters) => filters.iter().all(|f| f.matches(identity)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(identity)),
        }
    }
}

/// Read access to the identity directory
///
/// `Ok(None)` from a lookup means the record does not exist; `Err` is an
/// upstream failure of the directory itself.
pub trait Directory: Send + Sync {
    fn get_by_id(&self, id: &str) -> Result<Option<Identity>>;

    fn get_by_name(&self, name: &str) -> Result<Option<Identity>>;

    /// Ids of matching records in directory order
    fn search(&self, filter: &Filter) -> Result<Vec<String>>;

    fn search_records(&self, filter: &Filter) -> Result<Vec<Identity>> {
        let mut records = Vec::new();
        for id in self.search(filter)? {
            if let Some(record) = self.get_by_id(&id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn count(&self, filter: &Filter) -> Result<usize> {
        Ok(self.search(filter)?.len())
    }

    fn policy_violations(&self, id: &str) -> Result<Vec<PolicyViolation>>;

    /// Entitlements owned by `id`, ordered by application name
    fn owned_entitlements(&self, id: &str) -> Result<Vec<Entitlement>>;

    /// Roles owned by `id`, ordered by role name
    fn owned_roles(&self, id: &str) -> Result<Vec<OwnedRole>>;

    /// Display label of an identity attribute, if the directory defines one
    fn attribute_label(&self, _attribute: &str) -> Option<String> {
        None
    }

    /// Directory-wide attribute list for the details view
    fn default_detail_attributes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Serialized directory contents used to seed [`InMemoryDirectory`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectorySnapshot {
    pub identities: Vec<Identity>,
    pub policy_violations: BTreeMap<String, Vec<PolicyViolation>>,
    pub entitlements: BTreeMap<String, Vec<Entitlement>>,
    pub owned_roles: BTreeMap<String, Vec<OwnedRole>>,
    pub attribute_labels: BTreeMap<String, String>,
    pub default_detail_attributes: Vec<String>,
    /// Rule name -> precomputed edges
    pub connection_rules: BTreeMap<String, Vec<Connection>>,
}

impl DirectorySnapshot {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GraphError::upstream(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }
}

/// Directory held entirely in memory; filters are evaluated by scanning
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    identities: Vec<Identity>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    policy_violations: BTreeMap<String, Vec<PolicyViolation>>,
    entitlements: BTreeMap<String, Vec<Entitlement>>,
    owned_roles: BTreeMap<String, Vec<OwnedRole>>,
    attribute_labels: BTreeMap<String, String>,
    default_detail_attributes: Vec<String>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &DirectorySnapshot) -> Self {
        let mut directory = Self::new();
        for identity in &snapshot.identities {
            directory.insert(identity.clone());
        }
        directory.policy_violations = snapshot.policy_violations.clone();
        directory.entitlements = snapshot.entitlements.clone();
        directory.owned_roles = snapshot.owned_roles.clone();
        directory.attribute_labels = snapshot.attribute_labels.clone();
        directory.default_detail_attributes = snapshot.default_detail_attributes.clone();
        directory
    }

    /// Add a record, replacing any record with the same id
    pub fn insert(&mut self, identity: Identity) {
        if let Some(&idx) = self.by_id.get(&identity.id) {
            let previous = std::mem::replace(&mut self.identities[idx], identity);
            self.by_name.remove(&previous.name);
            self.by_name.insert(self.identities[idx].name.clone(), idx);
            return;
        }
        let idx = self.identities.len();
        self.by_id.insert(identity.id.clone(), idx);
        self.by_name.insert(identity.name.clone(), idx);
        self.identities.push(identity);
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.insert(identity);
        self
    }

    pub fn add_policy_violation(&mut self, id: &str, violation: PolicyViolation) {
        self.policy_violations
            .entry(id.to_string())
            .or_default()
            .push(violation);
    }

    pub fn add_entitlement(&mut self, id: &str, entitlement: Entitlement) {
        self.entitlements
            .entry(id.to_string())
            .or_default()
            .push(entitlement);
    }

    pub fn add_owned_role(&mut self, id: &str, role: OwnedRole) {
        self.owned_roles.entry(id.to_string()).or_default().push(role);
    }

    pub fn set_attribute_label(&mut self, attribute: &str, label: &str) {
        self.attribute_labels
            .insert(attribute.to_string(), label.to_string());
    }

    pub fn set_default_detail_attributes(&mut self, attributes: Vec<String>) {
        self.default_detail_attributes = attributes;
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl Directory for InMemoryDirectory {
    fn get_by_id(&self, id: &str) -> Result<Option<Identity>> {
        Ok(self.by_id.get(id).map(|&idx| self.identities[idx].clone()))
    }

    fn get_by_name(&self, name: &str) -> Result<Option<Identity>> {
        Ok(self.by_name.get(name).map(|&idx| self.identities[idx].clone()))
    }

    fn search(&self, filter: &Filter) -> Result<Vec<String>> {
        Ok(self
            .identities
            .iter()
            .filter(|identity| filter.matches(identity))
            .map(|identity| identity.id.clone())
            .collect())
    }

    fn search_records(&self, filter: &Filter) -> Result<Vec<Identity>> {
        Ok(self
            .identities
            .iter()
            .filter(|identity| filter.matches(identity))
            .cloned()
            .collect())
    }

    fn count(&self, filter: &Filter) -> Result<usize> {
        Ok(self
            .identities
            .iter()
            .filter(|identity| filter.matches(identity))
            .count())
    }

    fn policy_violations(&self, id: &str) -> Result<Vec<PolicyViolation>> {
        Ok(self.policy_violations.get(id).cloned().unwrap_or_default())
    }

    fn owned_entitlements(&self, id: &str) -> Result<Vec<Entitlement>> {
        let mut owned = self.entitlements.get(id).cloned().unwrap_or_default();
        owned.sort_by(|a, b| a.application.cmp(&b.application));
        Ok(owned)
    }

    fn owned_roles(&self, id: &str) -> Result<Vec<OwnedRole>> {
        let mut owned = self.owned_roles.get(id).cloned().unwrap_or_default();
        owned.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(owned)
    }

    fn attribute_label(&self, attribute: &str) -> Option<String> {
        self.attribute_labels.get(attribute).cloned()
    }

    fn default_detail_attributes(&self) -> Vec<String> {
        self.default_detail_attributes.clone()
    }
}
