use crate::assembler::dedupe_ids;
use crate::directory::{Directory, Filter};
use crate::error::Result;

/// Direct children of `id`: people it manages, then groups it owns
pub fn resolve_children(directory: &dyn Directory, id: &str) -> Result<Vec<String>> {
    let managed = directory.search(&Filter::managed_people(id))?;
    let owned = directory.search(&Filter::owned_groups(id))?;
    log::trace!("resolve_children({id}): managed={managed:?} owned={owned:?}");
    Ok(dedupe_ids(managed.into_iter().chain(owned)))
}
