//! Deletion of outputs no longer backed by any input.

use std::path::PathBuf;

use forgo_state::{OutputRecord, ResourceId};
use forgo_workspace::{ResourceStatus, Workspace};

use crate::context::BuildContext;
use crate::error::BuildError;

impl<W: Workspace> BuildContext<W> {
    /// Deletes outputs of the previous build that no surviving input backs.
    ///
    /// An old output is stale when it was not registered in this session and
    /// every input that contributed to it was either removed or processed
    /// without associating it again. An output with no contributing inputs
    /// is stale as soon as a session does not register it. Runs as part of
    /// [`commit`](Self::commit) and may be called earlier; returns the paths
    /// deleted by this call.
    pub fn delete_stale_outputs(&mut self) -> Result<Vec<PathBuf>, BuildError> {
        if self.skip_execution {
            return Ok(Vec::new());
        }
        let stale: Vec<ResourceId> = self
            .old
            .outputs
            .iter()
            .filter(|(id, record)| {
                !self.outputs.contains_key(id)
                    && !self.deleted.contains(id)
                    && self.is_orphaned(**id, record)
            })
            .map(|(id, _)| *id)
            .collect();

        let mut deleted = Vec::with_capacity(stale.len());
        for id in stale {
            let path = self.resources.path(id).to_path_buf();
            self.workspace.delete_file(&path)?;
            tracing::debug!(output = %path.display(), "deleted stale output");
            self.deleted.insert(id);
            deleted.push(path);
        }
        Ok(deleted)
    }

    fn is_orphaned(&self, output: ResourceId, record: &OutputRecord) -> bool {
        record.inputs.iter().all(|input| match self.inputs.get(input) {
            Some(session) => session.processed && !session.outputs.contains(&output),
            None => self.status(*input) == ResourceStatus::Removed,
        })
    }
}
