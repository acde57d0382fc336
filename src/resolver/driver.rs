//! The resolution loop

use log::{debug, info, warn};

use crate::resolver::file::PendingFile;
use crate::resolver::scheduler::{Resolution, ResolutionScheduler};
use crate::utils::{Error, Result};

/// Resolve `files` against each other.
///
/// Returns the final partition into resolved and failed files, or the first
/// type conflict, which aborts the run.
pub fn resolve<F: PendingFile>(files: impl IntoIterator<Item = F>) -> Result<Resolution<F>> {
    let mut scheduler = ResolutionScheduler::new(files);
    info!("Resolving {} schema file(s)", scheduler.total());

    while let Some(id) = scheduler.next() {
        let visible = scheduler.visibility(id);
        let path = scheduler.file(id).path().to_string();
        debug!("parsing {} with {} visible type(s)", path, visible.len());

        match scheduler.file(id).parse(&visible) {
            Ok(definitions) => {
                debug!("{} declared {} type(s)", path, definitions.len());
                scheduler.commit(id, definitions)?;
            }
            // The file declares a name some other file already defined. Parse
            // it again without that definition so both get conflict-checked.
            Err(Error::Redefinition { name }) if visible.contains_key(&name) => {
                debug!("{} redefines {}, hiding the global definition", path, name);
                let hidden = scheduler.suppress(id, &name);
                debug_assert!(hidden, "suppressed names are never visible");
                scheduler.retry(id);
            }
            Err(err) => {
                if !err.is_missing_type() {
                    debug!("{} failed for a reason new types cannot fix", path);
                }
                scheduler.requeue(id, err);
            }
        }
    }

    let resolution = scheduler.finish();
    for failure in &resolution.failed {
        warn!("Could not resolve {}: {}", failure.path, failure.error);
    }
    info!(
        "Resolved {} of {} file(s), {} type(s)",
        resolution.processed,
        resolution.total(),
        resolution.registry.definitions().len()
    );
    Ok(resolution)
}
