use crate::directory::{Directory, Filter};
use crate::error::Result;
use crate::settings::{ColorCodes, OrgChartSettings};
use crate::types::{
    GroupNode, Identity, Node, NodeBase, NodeKind, PersonNode, RESERVED_NODE_KEYS, TYPE_WORKGROUP,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key naming the configured icon attribute on person nodes
pub const ICON_ATTRIBUTE_KEY: &str = "identityIconImgAttribute";

/// Group card attribute read from the description field
const DESCRIPTION_ATTRIBUTE: &str = "description";

/// Turns directory records into display-ready nodes
pub struct NodeEnricher<'a> {
    directory: &'a dyn Directory,
    colors: ColorCodes,
    person_attributes: Vec<String>,
    group_attributes: Vec<String>,
    icon_attribute: Option<String>,
}

impl<'a> NodeEnricher<'a> {
    pub fn new(directory: &'a dyn Directory, settings: &OrgChartSettings) -> Self {
        Self {
            directory,
            colors: settings.color_codes(),
            person_attributes: without_reserved(settings.person_card_attributes()),
            group_attributes: without_reserved(settings.group_card_attributes()),
            icon_attribute: settings
                .icon_attribute()
                .filter(|icon| !is_reserved(icon, "icon attribute"))
                .map(str::to_string),
        }
    }

    /// Build the node for `record`
    ///
    /// `root_id` marks the chart root, whose parent pointer is always null.
    /// Failed collection lookups are logged and leave their field out.
    pub fn enrich(&self, record: &Identity, root_id: Option<&str>) -> Node {
        log::trace!("enrich: node={} root={root_id:?}", record.name);

        let is_root = root_id == Some(record.id.as_str());
        let parent_id = if is_root {
            None
        } else {
            record.parent_id().map(str::to_string)
        };

        let (node_type, color_code) = if record.is_group {
            (
                TYPE_WORKGROUP.to_string(),
                self.colors.resolve(Some(TYPE_WORKGROUP)),
            )
        } else {
            (
                record.type_or_none().to_string(),
                self.colors.resolve(record.identity_type.as_deref()),
            )
        };

        let base = NodeBase {
            id: record.id.clone(),
            name: record.name.clone(),
            display_name: record.displayable_name().to_string(),
            node_type,
            color_code,
            parent_id,
            manages_count: self.tolerate(
                "managesCount",
                record,
                self.directory.count(&Filter::managed_or_owned(&record.id)),
            ),
        };

        let mut custom = BTreeMap::new();
        let kind = if record.is_group {
            NodeKind::Group(self.group_fields(record, &mut custom))
        } else {
            NodeKind::Person(self.person_fields(record, &mut custom))
        };

        Node { base, kind, custom }
    }

    fn group_fields(&self, record: &Identity, custom: &mut BTreeMap<String, Value>) -> GroupNode {
        for attr in &self.group_attributes {
            let value = if attr == DESCRIPTION_ATTRIBUTE {
                record
                    .description
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null)
            } else {
                record.attribute(attr).cloned().unwrap_or(Value::Null)
            };
            custom.insert(attr.clone(), value);
        }

        let members = self.tolerate("members", record, member_names(self.directory, &record.id));

        GroupNode {
            attributes: self.group_attributes.clone(),
            member_count: members.as_ref().map(Vec::len),
            members,
        }
    }

    fn person_fields(&self, record: &Identity, custom: &mut BTreeMap<String, Value>) -> PersonNode {
        for attr in &self.person_attributes {
            custom.insert(
                attr.clone(),
                record.attribute(attr).cloned().unwrap_or(Value::Null),
            );
        }

        if let Some(icon) = &self.icon_attribute {
            if let Some(value) = record.string_attribute(icon) {
                custom.insert(ICON_ATTRIBUTE_KEY.to_string(), Value::String(icon.clone()));
                custom.insert(icon.clone(), Value::String(value));
            }
        }

        let policy_violations_count = self.tolerate(
            "policyViolationsCount",
            record,
            self.directory
                .policy_violations(&record.id)
                .map(|violations| violations.len()),
        );

        PersonNode {
            inactive: record.inactive,
            attributes: self.person_attributes.clone(),
            membership_count: record.member_of.len(),
            workgroups: record.member_of.clone(),
            assigned_roles: record.assigned_role_ids.clone(),
            detected_roles: record.detected_role_ids.clone(),
            policy_violations_count,
        }
    }

    fn tolerate<T>(&self, field: &str, record: &Identity, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("Failed to get {field} for {}: {e}", record.name);
                None
            }
        }
    }
}

fn is_reserved(key: &str, what: &str) -> bool {
    let reserved = key == ICON_ATTRIBUTE_KEY || RESERVED_NODE_KEYS.contains(&key);
    if reserved {
        log::warn!("Ignoring {what} {key}: it clashes with a node field");
    }
    reserved
}

/// Card attributes minus names that would shadow built-in node keys
fn without_reserved(attributes: Vec<String>) -> Vec<String> {
    attributes
        .into_iter()
        .filter(|attr| !is_reserved(attr, "card attribute"))
        .collect()
}

/// Display names of the members of a group, sorted ascending
pub fn member_names(directory: &dyn Directory, group_id: &str) -> Result<Vec<String>> {
    let mut names: Vec<String> = directory
        .search_records(&Filter::members_of(group_id))?
        .iter()
        .map(|member| member.displayable_name().to_string())
        .collect();
    names.sort();
    Ok(names)
}
