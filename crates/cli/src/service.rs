use anyhow::{Context as AnyhowContext, Result};
use orgchart_graph::{
    ConnectionResolver, DetailsResolver, Directory, DirectorySnapshot, GraphError,
    InMemoryDirectory, OrgChartSettings, StaticRuleEngine, TreeAssembler,
};
use orgchart_protocol::{
    ConnectionsRequest, ConnectionsResponse, DetailsResponse, ErrorEnvelope,
    PreferenceResponse, PreferenceUpdate, TreeResponse, MISSING_NODE_IDS_MESSAGE,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{PoisonError, RwLock};

/// Outcome class of a request, mapped to HTTP status codes or exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    Internal,
}

impl Status {
    pub fn http_code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::Internal => 500,
        }
    }

    pub fn is_success(self) -> bool {
        self == Status::Ok
    }
}

#[derive(Debug, Clone)]
pub struct Reply<T> {
    pub status: Status,
    pub body: T,
    /// Set when the engine failed
    pub error: Option<ErrorEnvelope>,
}

impl<T> Reply<T> {
    fn ok(body: T) -> Self {
        Self {
            status: Status::Ok,
            body,
            error: None,
        }
    }

    fn failed(status: Status, body: T) -> Self {
        Self {
            status,
            body,
            error: None,
        }
    }

    /// Every engine failure is an internal error carrying its message
    fn engine_error(err: &GraphError, body: T) -> Self {
        log::debug!("request failed ({}): {err}", err.code());
        Self {
            status: Status::Internal,
            body,
            error: Some(ErrorEnvelope::from_graph_error(err)),
        }
    }
}

/// Request handlers over one loaded directory
///
/// Engine calls are synchronous; async callers run them on blocking threads.
pub struct OrgChartService {
    directory: InMemoryDirectory,
    settings: OrgChartSettings,
    rules: StaticRuleEngine,
    preferences: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl OrgChartService {
    pub fn new(snapshot: &DirectorySnapshot, settings: OrgChartSettings) -> Self {
        let preferences = snapshot
            .identities
            .iter()
            .map(|identity| (identity.name.clone(), identity.preferences.clone()))
            .collect();
        Self {
            directory: InMemoryDirectory::from_snapshot(snapshot),
            settings,
            rules: StaticRuleEngine::from_snapshot(snapshot),
            preferences: RwLock::new(preferences),
        }
    }

    /// Load the directory snapshot and optional settings file
    pub fn load(directory: &Path, settings: Option<&Path>) -> Result<Self> {
        let snapshot = DirectorySnapshot::load(directory)
            .with_context(|| format!("Failed to load directory snapshot {}", directory.display()))?;
        let settings = match settings {
            Some(path) => OrgChartSettings::load(path)
                .with_context(|| format!("Failed to load settings {}", path.display()))?,
            None => OrgChartSettings::default(),
        };
        log::info!(
            "Loaded {} identities from {}",
            snapshot.identities.len(),
            directory.display()
        );
        Ok(Self::new(&snapshot, settings))
    }

    pub fn settings(&self) -> &OrgChartSettings {
        &self.settings
    }

    pub fn tree(&self, id: &str) -> Reply<TreeResponse> {
        match TreeAssembler::new(&self.directory, &self.settings).build_tree(id) {
            Ok(tree) => Reply::ok(TreeResponse::from_tree(tree)),
            Err(e) => Reply::engine_error(&e, TreeResponse::error(e.to_string())),
        }
    }

    pub fn children(&self, id: &str) -> Reply<TreeResponse> {
        match TreeAssembler::new(&self.directory, &self.settings).build_children(id) {
            Ok((nodes, skipped)) => Reply::ok(TreeResponse::from_nodes(nodes, skipped)),
            Err(e) => Reply::engine_error(&e, TreeResponse::error(e.to_string())),
        }
    }

    pub fn details(&self, id: &str) -> Reply<DetailsResponse> {
        match DetailsResolver::new(&self.directory, &self.settings).details(id) {
            Ok(details) => Reply::ok(DetailsResponse::ok(details)),
            Err(e) => Reply::engine_error(&e, DetailsResponse::error(e.to_string())),
        }
    }

    pub fn connections(&self, request: &ConnectionsRequest) -> Reply<ConnectionsResponse> {
        let resolver = ConnectionResolver::new(&self.settings, &self.rules);
        if self.settings.connection_rule().is_none() {
            return match resolver.resolve(&[], &request.extra) {
                Ok(outcome) => Reply::ok(outcome.into()),
                Err(e) => Reply::engine_error(&e, ConnectionsResponse::error(e.to_string())),
            };
        }

        let Some(all_node_ids) = &request.all_node_ids else {
            return Reply::failed(
                Status::BadRequest,
                ConnectionsResponse::error(MISSING_NODE_IDS_MESSAGE),
            );
        };

        match resolver.resolve(all_node_ids, &request.extra) {
            Ok(outcome) => Reply::ok(outcome.into()),
            Err(e) => Reply::engine_error(&e, ConnectionsResponse::error(e.to_string())),
        }
    }

    pub fn preference(&self, identity_name: &str) -> Reply<Option<PreferenceResponse>> {
        if !self.identity_exists(identity_name) {
            return Reply::failed(Status::NotFound, None);
        }
        let stored = self
            .preferences
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity_name)
            .cloned()
            .unwrap_or_default();
        Reply::ok(Some(PreferenceResponse::new(
            &stored,
            self.settings.node_types(),
        )))
    }

    pub fn set_preference(&self, identity_name: &str, update: PreferenceUpdate) -> Status {
        if !self.identity_exists(identity_name) {
            return Status::NotFound;
        }
        let mut prefs = self
            .preferences
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let stored = prefs.entry(identity_name.to_string()).or_default();
        for (key, value) in update {
            log::debug!("preference {identity_name}.{key} = {value}");
            stored.insert(key, value);
        }
        Status::Ok
    }

    pub fn node_types(&self) -> BTreeMap<String, String> {
        self.settings.node_types()
    }

    pub fn identity_count(&self) -> usize {
        self.directory.len()
    }

    fn identity_exists(&self, identity_name: &str) -> bool {
        match self.directory.get_by_name(identity_name) {
            Ok(found) => found.is_some(),
            Err(e) => {
                log::error!("Failed to look up {identity_name}: {e}");
                false
            }
        }
    }
}
