//! Resource status and the "requires processing" decision.

use std::collections::BTreeSet;

use forgo_common::QualifiedName;
use forgo_state::ResourceId;
use forgo_workspace::{ResourceStamp, ResourceStatus, Workspace};

use crate::context::BuildContext;
use crate::graph::Input;

impl<W: Workspace> BuildContext<W> {
    /// Status of a resource relative to the previous build.
    ///
    /// Inputs are compared using the stamp captured when they were
    /// registered; other resources are asked of the workspace. A digest
    /// resource that was not registered in this session is removed.
    pub fn status(&self, resource: impl Into<ResourceId>) -> ResourceStatus {
        let id = resource.into();
        let prior = self.old.stamps.get(&id);
        if let Some(current) = self.stamps.get(&id) {
            return ResourceStatus::compare(prior, Some(current));
        }
        let path = self.resources.path(id);
        match prior {
            Some(ResourceStamp::Digest(_)) => ResourceStatus::Removed,
            Some(prior) => self.workspace.resource_status(path, prior),
            None if self.workspace.is_present(path) => ResourceStatus::New,
            None => ResourceStatus::Removed,
        }
    }

    /// Returns `true` if the results of the previous build for `input` can
    /// no longer be trusted.
    ///
    /// That is the case when the session is escalated, the input is new or
    /// modified, an output it produced is gone or was modified, another input
    /// contributing to one of its outputs changed, an included resource
    /// changed, or a capability it requires changed in this session.
    pub fn requires_processing(&self, input: Input) -> bool {
        let id = input.id();
        let path = self.resources.path(id);
        if self.escalated {
            tracing::debug!(input = %path.display(), "requires processing: escalated session");
            return true;
        }

        let status = self.status(id);
        if status != ResourceStatus::Unmodified {
            tracing::debug!(input = %path.display(), %status, "requires processing");
            return true;
        }

        let Some(old) = self.old.inputs.get(&id) else {
            return true;
        };

        if let Some(output) = old
            .outputs
            .iter()
            .find(|output| self.is_output_stale(id, **output))
        {
            tracing::debug!(
                input = %path.display(),
                output = %self.resources.path(*output).display(),
                "requires processing: output invalidated"
            );
            return true;
        }

        if let Some(included) = old
            .included_inputs
            .iter()
            .find(|included| self.status(**included) != ResourceStatus::Unmodified)
        {
            tracing::debug!(
                input = %path.display(),
                included = %self.resources.path(*included).display(),
                "requires processing: included input changed"
            );
            return true;
        }

        if !old.requirements.is_empty() {
            let changed = self.changed_capabilities();
            if let Some(name) = old.requirements.iter().find(|name| changed.contains(*name)) {
                tracing::debug!(
                    input = %path.display(),
                    capability = %name,
                    "requires processing: required capability changed"
                );
                return true;
            }
        }

        false
    }

    /// Capabilities whose providers changed in this session.
    ///
    /// A written output whose content changed counts with all of its old and
    /// new capabilities; one rewritten with identical content counts only
    /// with the capabilities it gained or lost. A stale output deleted by the
    /// collector counts with all of its old capabilities.
    pub(crate) fn changed_capabilities(&self) -> BTreeSet<QualifiedName> {
        let mut changed = BTreeSet::new();
        for (id, output) in &self.outputs {
            if !output.written {
                continue;
            }
            match self.old.outputs.get(id) {
                Some(old) if self.status(*id) == ResourceStatus::Unmodified => {
                    changed.extend(
                        old.capabilities
                            .symmetric_difference(&output.capabilities)
                            .cloned(),
                    );
                }
                Some(old) => {
                    changed.extend(old.capabilities.iter().cloned());
                    changed.extend(output.capabilities.iter().cloned());
                }
                None => changed.extend(output.capabilities.iter().cloned()),
            }
        }
        for id in &self.deleted {
            if let Some(old) = self.old.outputs.get(id) {
                changed.extend(old.capabilities.iter().cloned());
            }
        }
        changed
    }

    /// An old output of `input` invalidates it if the output was deleted or
    /// modified, or if any other input that contributed to it changed.
    fn is_output_stale(&self, input: ResourceId, output: ResourceId) -> bool {
        if self.deleted.contains(&output) || self.status(output) != ResourceStatus::Unmodified {
            return true;
        }
        self.old.outputs.get(&output).is_some_and(|record| {
            record
                .inputs
                .iter()
                .any(|other| *other != input && self.status(*other) != ResourceStatus::Unmodified)
        })
    }
}
