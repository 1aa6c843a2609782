use crate::ancestors::resolve_ancestors;
use crate::descendants::resolve_children;
use crate::directory::Directory;
use crate::enricher::NodeEnricher;
use crate::error::{GraphError, Result};
use crate::settings::OrgChartSettings;
use crate::siblings::resolve_siblings;
use crate::types::{Identity, Node};
use std::collections::HashSet;

/// Builds the org chart around a single record
///
/// The assembler owns no state across calls; every accumulator lives for one
/// `build_*` invocation.
pub struct TreeAssembler<'a> {
    directory: &'a dyn Directory,
    settings: &'a OrgChartSettings,
}

/// Assembled org chart
#[derive(Debug, Clone)]
pub struct OrgTree {
    /// Topmost ancestor reached from the start record
    pub root_id: String,

    /// Nodes in resolution order: children, ancestors, siblings
    pub nodes: Vec<Node>,

    /// Ids that could not be resolved and were left out
    pub skipped: Vec<String>,
}

impl OrgTree {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

impl<'a> TreeAssembler<'a> {
    pub fn new(directory: &'a dyn Directory, settings: &'a OrgChartSettings) -> Self {
        Self {
            directory,
            settings,
        }
    }

    /// Resolve children, ancestors and siblings of `start_id` into nodes
    pub fn build_tree(&self, start_id: &str) -> Result<OrgTree> {
        let record = self
            .directory
            .get_by_id(start_id)?
            .ok_or_else(|| GraphError::NotFound(start_id.to_string()))?;

        let children = resolve_children(self.directory, start_id)?;
        log::trace!("children: {children:?}");

        let ancestors = resolve_ancestors(self.directory, &record, self.settings.depth_limit());
        log::trace!("parents: {:?}", ancestors.ids);

        let siblings = resolve_siblings(self.directory, &record)?;
        log::trace!("siblings: {siblings:?}");

        let all = dedupe_ids(
            children
                .into_iter()
                .chain(ancestors.ids.iter().cloned())
                .chain(siblings),
        );

        let enricher = NodeEnricher::new(self.directory, self.settings);
        let (mut nodes, skipped) =
            self.enrich_all(&enricher, &all, Some(ancestors.root.as_str()));

        let mut root_id = ancestors.root;
        if skipped.contains(&root_id) {
            // the nearest resolved ancestor, or the start record, takes over
            root_id = ancestors
                .ids
                .iter()
                .rev()
                .find(|id| !skipped.contains(*id))
                .cloned()
                .unwrap_or_else(|| start_id.to_string());
            log::warn!("Chart root unresolved, using {root_id} instead");
            if let Some(node) = nodes.iter_mut().find(|node| node.id() == root_id) {
                node.base.parent_id = None;
            }
        }

        log::debug!(
            "Built org chart for {start_id}: {} nodes, root {root_id}, {} skipped",
            nodes.len(),
            skipped.len()
        );

        Ok(OrgTree {
            root_id,
            nodes,
            skipped,
        })
    }

    /// Nodes for the direct children of `id`, each pointing at its real parent,
    /// plus the ids that could not be resolved
    pub fn build_children(&self, id: &str) -> Result<(Vec<Node>, Vec<String>)> {
        let children = resolve_children(self.directory, id)?;
        let enricher = NodeEnricher::new(self.directory, self.settings);
        Ok(self.enrich_all(&enricher, &children, None))
    }

    fn enrich_all(
        &self,
        enricher: &NodeEnricher<'_>,
        ids: &[String],
        root_id: Option<&str>,
    ) -> (Vec<Node>, Vec<String>) {
        let mut nodes = Vec::with_capacity(ids.len());
        let mut skipped = Vec::new();

        for id in ids {
            match self.lookup(id) {
                Ok(record) => nodes.push(enricher.enrich(&record, root_id)),
                Err(e) => {
                    log::error!("{e}");
                    skipped.push(id.clone());
                }
            }
        }

        (nodes, skipped)
    }

    fn lookup(&self, id: &str) -> Result<Identity> {
        match self.directory.get_by_id(id) {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(GraphError::lookup_failed(id, "not found")),
            Err(e) => Err(GraphError::lookup_failed(id, e)),
        }
    }
}

/// Remove duplicate ids, keeping the first occurrence
pub fn dedupe_ids(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
