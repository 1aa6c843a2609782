use crate::directory::Directory;
use crate::types::Identity;

/// Ancestor ids of a record, nearest first, with the chart root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorChain {
    /// Manager/owner ids from the direct parent upwards
    pub ids: Vec<String>,

    /// Topmost ancestor reached, or the start record itself
    pub root: String,
}

impl AncestorChain {
    fn start() -> Self {
        Self {
            ids: Vec::new(),
            root: String::new(),
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|known| known == id)
    }

    fn finish(mut self, start_id: &str) -> Self {
        self.root = self
            .ids
            .last()
            .cloned()
            .unwrap_or_else(|| start_id.to_string());
        self
    }
}

enum Step {
    Climb(AncestorChain, Identity),
    Done(AncestorChain),
}

/// Climb the manager/owner chain of `record` for at most `max_levels` hops
///
/// Managers win over owners, owners are only followed for groups. The climb
/// stops without error when it would revisit an id already in the chain.
pub fn resolve_ancestors(
    directory: &dyn Directory,
    record: &Identity,
    max_levels: usize,
) -> AncestorChain {
    let mut chain = AncestorChain::start();
    let mut current = record.clone();

    for level in 0..max_levels {
        log::trace!(
            "resolve_ancestors: level={level} identity={} chain={:?}",
            current.name,
            chain.ids
        );
        match step(directory, chain, &current) {
            Step::Climb(next_chain, parent) => {
                chain = next_chain;
                current = parent;
            }
            Step::Done(final_chain) => return final_chain.finish(&record.id),
        }
    }

    chain.finish(&record.id)
}

fn step(directory: &dyn Directory, mut chain: AncestorChain, current: &Identity) -> Step {
    let Some(parent_id) = next_parent(current) else {
        return Step::Done(chain);
    };
    if chain.contains(parent_id) {
        log::trace!("resolve_ancestors: closed loop at {parent_id}");
        return Step::Done(chain);
    }

    match directory.get_by_id(parent_id) {
        Ok(Some(parent)) => {
            chain.ids.push(parent_id.to_string());
            Step::Climb(chain, parent)
        }
        Ok(None) => {
            // dangling reference: the last existing record is the root
            log::warn!("Ancestor {parent_id} of {} does not exist", current.id);
            Step::Done(chain)
        }
        Err(e) => {
            log::warn!("Failed to retrieve ancestor {parent_id}: {e}");
            chain.ids.push(parent_id.to_string());
            Step::Done(chain)
        }
    }
}

fn next_parent(current: &Identity) -> Option<&str> {
    let candidate = match current.manager_id.as_deref() {
        Some(manager) => Some(manager),
        None if current.is_group => current.owner_id.as_deref(),
        None => None,
    };
    candidate.filter(|id| !id.is_empty() && *id != current.id)
}
