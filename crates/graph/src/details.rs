use crate::directory::Directory;
use crate::enricher::member_names;
use crate::error::{GraphError, Result};
use crate::settings::OrgChartSettings;
use crate::types::{Identity, RoleAssignment};
use serde::Serialize;
use serde_json::Value;

/// One labelled attribute row of the details view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailAttribute {
    pub attribute: String,
    pub value: String,
}

/// Details panel for a record; groups only carry members and owned items
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<DetailAttribute>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_assignments: Option<Vec<RoleAssignment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_violations: Option<Vec<String>>,
    /// Group names, sorted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workgroups: Option<Vec<String>>,
    pub owned_entitlements: Vec<String>,
    pub owned_roles: Vec<String>,
}

pub struct DetailsResolver<'a> {
    directory: &'a dyn Directory,
    settings: &'a OrgChartSettings,
}

impl<'a> DetailsResolver<'a> {
    pub fn new(directory: &'a dyn Directory, settings: &'a OrgChartSettings) -> Self {
        Self {
            directory,
            settings,
        }
    }

    pub fn details(&self, id: &str) -> Result<Details> {
        let identity = self
            .directory
            .get_by_id(id)?
            .ok_or_else(|| GraphError::NotFound(id.to_string()))?;

        let mut details = if identity.is_group {
            Details {
                members: Some(member_names(self.directory, &identity.id)?),
                ..Default::default()
            }
        } else {
            Details {
                attributes: Some(self.attributes(&identity)),
                role_assignments: Some(role_assignments(&identity)),
                policy_violations: Some(self.policy_violations(&identity)?),
                workgroups: Some(self.workgroup_names(&identity)?),
                ..Default::default()
            }
        };

        details.owned_entitlements = self
            .directory
            .owned_entitlements(&identity.id)?
            .iter()
            .map(|entitlement| entitlement.label())
            .collect();
        details.owned_roles = self
            .directory
            .owned_roles(&identity.id)?
            .iter()
            .map(|role| role.displayable_name().to_string())
            .collect();

        Ok(details)
    }

    fn attributes(&self, identity: &Identity) -> Vec<DetailAttribute> {
        let mut names = self.settings.detail_attributes();
        if names.is_empty() {
            names = self.directory.default_detail_attributes();
        }

        names
            .into_iter()
            .map(|name| DetailAttribute {
                attribute: self
                    .directory
                    .attribute_label(&name)
                    .unwrap_or_else(|| name.clone()),
                value: match identity.attribute(&name) {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                },
            })
            .collect()
    }

    fn policy_violations(&self, identity: &Identity) -> Result<Vec<String>> {
        Ok(self
            .directory
            .policy_violations(&identity.id)?
            .iter()
            .map(|violation| violation.displayable_name().to_string())
            .collect())
    }

    fn workgroup_names(&self, identity: &Identity) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(identity.member_of.len());
        for group_id in &identity.member_of {
            match self.directory.get_by_id(group_id)? {
                Some(group) => names.push(group.name),
                None => log::warn!("Workgroup {group_id} of {} does not exist", identity.name),
            }
        }
        names.sort();
        Ok(names)
    }
}

fn role_assignments(identity: &Identity) -> Vec<RoleAssignment> {
    let mut assignments = identity.role_assignments.clone();
    assignments.sort_by(|a, b| a.role_name.cmp(&b.role_name));
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use crate::types::{Entitlement, OwnedRole, PolicyViolation};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn org() -> InMemoryDirectory {
        let mut directory = InMemoryDirectory::new()
            .with_identity(Identity {
                id: "P1".into(),
                name: "alice".into(),
                member_of: vec!["G2".into(), "G1".into()],
                attributes: BTreeMap::from([
                    ("department".to_string(), json!("Finance")),
                    ("level".to_string(), json!(3)),
                ]),
                role_assignments: vec![
                    RoleAssignment {
                        role_id: "r2".into(),
                        role_name: "Treasurer".into(),
                        ..Default::default()
                    },
                    RoleAssignment {
                        role_id: "r1".into(),
                        role_name: "Auditor".into(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            })
            .with_identity(Identity {
                id: "G1".into(),
                name: "payroll".into(),
                is_group: true,
                ..Default::default()
            })
            .with_identity(Identity {
                id: "G2".into(),
                name: "audit".into(),
                is_group: true,
                ..Default::default()
            });
        directory.set_attribute_label("department", "Department");
        directory.set_default_detail_attributes(vec!["department".into(), "level".into()]);
        directory.add_policy_violation(
            "P1",
            PolicyViolation {
                name: "SOD-1".into(),
                display_name: Some("Pay and approve".into()),
            },
        );
        directory.add_entitlement(
            "G1",
            Entitlement {
                application: "SAP".into(),
                name: Some("FI_PAY".into()),
                display_name: Some("Payments".into()),
            },
        );
        directory.add_owned_role(
            "P1",
            OwnedRole {
                name: "finance-base".into(),
                display_name: Some("Finance Base".into()),
            },
        );
        directory
    }

    #[test]
    fn test_person_details() {
        let directory = org();
        let settings = OrgChartSettings::default();
        let details = DetailsResolver::new(&directory, &settings)
            .details("P1")
            .unwrap();

        let attributes = details.attributes.unwrap();
        assert_eq!(attributes[0].attribute, "Department");
        assert_eq!(attributes[0].value, "Finance");
        assert_eq!(attributes[1].attribute, "level");
        assert_eq!(attributes[1].value, "3");

        let roles: Vec<_> = details
            .role_assignments
            .unwrap()
            .into_iter()
            .map(|r| r.role_name)
            .collect();
        assert_eq!(roles, vec!["Auditor", "Treasurer"]);
        assert_eq!(details.policy_violations.unwrap(), vec!["Pay and approve"]);
        assert_eq!(details.workgroups.unwrap(), vec!["audit", "payroll"]);
        assert_eq!(details.owned_roles, vec!["Finance Base"]);
        assert!(details.members.is_none());
    }

    #[test]
    fn test_configured_detail_attributes_win() {
        let directory = org();
        let settings = OrgChartSettings {
            identity_detail_attributes: "level".into(),
            ..Default::default()
        };
        let details = DetailsResolver::new(&directory, &settings)
            .details("P1")
            .unwrap();
        assert_eq!(details.attributes.unwrap().len(), 1);
    }

    #[test]
    fn test_group_details() {
        let directory = org();
        let settings = OrgChartSettings::default();
        let details = DetailsResolver::new(&directory, &settings)
            .details("G1")
            .unwrap();

        assert_eq!(details.members.unwrap(), vec!["alice"]);
        assert!(details.attributes.is_none());
        assert_eq!(details.owned_entitlements, vec!["[SAP]FI_PAY :Payments"]);
    }

    #[test]
    fn test_missing_record() {
        let directory = org();
        let settings = OrgChartSettings::default();
        let err = DetailsResolver::new(&directory, &settings)
            .details("nobody")
            .unwrap_err();
        assert!(matches!(err, GraphError::NotFound(_)));
    }
}
