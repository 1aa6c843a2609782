use crate::descendants::resolve_children;
use crate::directory::Directory;
use crate::error::Result;
use crate::types::Identity;

/// Peers of `record`, including itself
///
/// Without a parent the record is its own only sibling.
pub fn resolve_siblings(directory: &dyn Directory, record: &Identity) -> Result<Vec<String>> {
    match record.parent_id() {
        Some(parent) if !parent.is_empty() => resolve_children(directory, parent),
        _ => Ok(vec![record.id.clone()]),
    }
}
