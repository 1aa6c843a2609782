use crate::directory::DirectorySnapshot;
use crate::error::{GraphError, Result};
use crate::settings::OrgChartSettings;
use crate::types::Connection;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Message returned when no connection rule is configured
pub const NO_RULE_MESSAGE: &str = "No Connection Rule defined";

/// Request keys besides the node ids, passed to rules as-is
pub type RuleArgs = BTreeMap<String, Value>;

/// Externally defined logic computing edges between chart nodes
pub trait ConnectionRule: Send + Sync {
    fn connect(&self, all_node_ids: &[String], args: &RuleArgs) -> Result<Vec<Connection>>;
}

/// Lookup of connection rules by name
pub trait RuleEngine: Send + Sync {
    fn find_rule(&self, name: &str) -> Option<&dyn ConnectionRule>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionOutcome {
    pub connections: Vec<Connection>,
    pub message: Option<String>,
}

pub struct ConnectionResolver<'a> {
    settings: &'a OrgChartSettings,
    rules: &'a dyn RuleEngine,
}

impl<'a> ConnectionResolver<'a> {
    pub fn new(settings: &'a OrgChartSettings, rules: &'a dyn RuleEngine) -> Self {
        Self { settings, rules }
    }

    /// Run the configured rule over `all_node_ids`
    pub fn resolve(&self, all_node_ids: &[String], args: &RuleArgs) -> Result<ConnectionOutcome> {
        let Some(rule_name) = self.settings.connection_rule() else {
            log::info!("{NO_RULE_MESSAGE}");
            return Ok(ConnectionOutcome {
                connections: Vec::new(),
                message: Some(NO_RULE_MESSAGE.to_string()),
            });
        };

        let rule = self
            .rules
            .find_rule(rule_name)
            .ok_or_else(|| GraphError::ConfigurationMissing(rule_name.to_string()))?;

        let connections = rule.connect(all_node_ids, args)?;
        log::debug!(
            "Rule {rule_name} produced {} connections for {} nodes",
            connections.len(),
            all_node_ids.len()
        );

        Ok(ConnectionOutcome {
            connections,
            message: None,
        })
    }
}

/// Argument restricting a [`StaticRule`] to edges with this label
pub const LABEL_ARG: &str = "label";

/// Rule returning precomputed edges restricted to the requested nodes
#[derive(Debug, Clone, Default)]
pub struct StaticRule {
    edges: Vec<Connection>,
}

impl StaticRule {
    pub fn new(edges: Vec<Connection>) -> Self {
        Self { edges }
    }
}

impl ConnectionRule for StaticRule {
    fn connect(&self, all_node_ids: &[String], args: &RuleArgs) -> Result<Vec<Connection>> {
        let present: HashSet<&str> = all_node_ids.iter().map(String::as_str).collect();
        let label = args.get(LABEL_ARG).and_then(Value::as_str);
        Ok(self
            .edges
            .iter()
            .filter(|edge| present.contains(edge.from.as_str()) && present.contains(edge.to.as_str()))
            .filter(|edge| label.is_none() || edge.label.as_deref() == label)
            .cloned()
            .collect())
    }
}

/// Named [`StaticRule`]s, typically loaded from a directory snapshot
#[derive(Debug, Clone, Default)]
pub struct StaticRuleEngine {
    rules: BTreeMap<String, StaticRule>,
}

impl StaticRuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &DirectorySnapshot) -> Self {
        let mut engine = Self::new();
        for (name, edges) in &snapshot.connection_rules {
            engine.register(name, StaticRule::new(edges.clone()));
        }
        engine
    }

    pub fn register(&mut self, name: &str, rule: StaticRule) {
        self.rules.insert(name.to_string(), rule);
    }
}

impl RuleEngine for StaticRuleEngine {
    fn find_rule(&self, name: &str) -> Option<&dyn ConnectionRule> {
        self.rules.get(name).map(|rule| rule as &dyn ConnectionRule)
    }
}
