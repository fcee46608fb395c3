//! Finalizing a session into the next build state.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use forgo_diagnostics::Message;
use forgo_state::{BuildState, InputRecord, OutputRecord, ResourceId, ResourceTable};
use forgo_workspace::{ResourceStatus, Workspace};

use crate::context::BuildContext;
use crate::error::BuildError;
use crate::summary::BuildSummary;

impl<W: Workspace> BuildContext<W> {
    /// Ends the session: deletes stale outputs, persists the new state, and
    /// reports what happened.
    ///
    /// Inputs processed in this session are recorded as the session left
    /// them. Inputs registered but not processed, and inputs of the previous
    /// build that still exist but were not registered, keep their previous
    /// associations, attributes, requirements, and messages. A failed save
    /// fails the session; the previous state file then stays in place.
    pub fn commit(mut self) -> Result<BuildSummary, BuildError> {
        if self.skip_execution {
            return self.commit_skipped();
        }
        self.delete_stale_outputs()?;
        let (state, summary) = self.finish();
        debug_assert!(state.is_symmetric());
        self.store.save(&state)?;

        tracing::info!(
            state = %self.store.path().display(),
            escalated = summary.escalated,
            processed = summary.processed_inputs,
            carried = summary.carried_inputs,
            written = summary.written_outputs.len(),
            deleted = summary.deleted_outputs.len(),
            errors = summary.error_count(),
            "build session committed"
        );
        Ok(summary)
    }

    fn commit_skipped(self) -> Result<BuildSummary, BuildError> {
        self.store.save(&self.old)?;
        let replayed_messages = self
            .old
            .messages
            .iter()
            .filter(|(_, messages)| !messages.is_empty())
            .map(|(id, messages)| (self.old.path(*id).to_path_buf(), messages.clone()))
            .collect();
        let summary = BuildSummary {
            skipped: true,
            carried_inputs: self.old.inputs.len(),
            new_messages: self.new_messages(),
            replayed_messages,
            ..BuildSummary::default()
        };
        tracing::info!(
            state = %self.store.path().display(),
            replayed = summary.replayed_messages.len(),
            "skipped build session committed"
        );
        Ok(summary)
    }

    /// Builds the next state with a fresh, compacted resource table.
    fn finish(&self) -> (BuildState, BuildSummary) {
        let mut kept_inputs: BTreeSet<ResourceId> = self.inputs.keys().copied().collect();
        kept_inputs.extend(
            self.old
                .inputs
                .keys()
                .filter(|id| {
                    !self.inputs.contains_key(id) && self.status(**id) != ResourceStatus::Removed
                })
                .copied(),
        );
        let mut kept_outputs: BTreeSet<ResourceId> = self.outputs.keys().copied().collect();
        kept_outputs.extend(
            self.old
                .outputs
                .keys()
                .filter(|id| !self.deleted.contains(id))
                .copied(),
        );

        let edges = self.associations(&kept_inputs, &kept_outputs);
        let mut next = BuildState::new(Some(self.configuration));
        let mut remap = Remap::new(&self.resources);

        for id in &kept_inputs {
            let new_id = remap.id(&mut next, *id);
            let mut record = InputRecord::default();
            if !self.is_processed(*id) {
                if let Some(old) = self.old.inputs.get(id) {
                    record.attributes = old.attributes.clone();
                    record.requirements = old.requirements.clone();
                    record.included_inputs = old.included_inputs.clone();
                }
            }
            if let Some(session) = self.inputs.get(id) {
                record.attributes.extend(session.attributes.clone());
                record.requirements.extend(session.requirements.iter().cloned());
                record.included_inputs.extend(session.included_inputs.iter().copied());
            }
            record.included_inputs = record
                .included_inputs
                .iter()
                .map(|included| {
                    let stamp = self
                        .stamps
                        .get(included)
                        .or_else(|| self.old.stamps.get(included));
                    let remapped = remap.id(&mut next, *included);
                    if let Some(stamp) = stamp {
                        next.stamps.entry(remapped).or_insert(*stamp);
                    }
                    remapped
                })
                .collect();

            if let Some(stamp) = self.stamps.get(id).or_else(|| self.old.stamps.get(id)) {
                next.stamps.insert(new_id, *stamp);
            }
            next.inputs.insert(new_id, record);
        }

        for id in &kept_outputs {
            let new_id = remap.id(&mut next, *id);
            let mut record = OutputRecord::default();
            let stamp = match self.outputs.get(id) {
                Some(session) => {
                    record.capabilities = session.capabilities.clone();
                    if session.carried && !session.written {
                        if let Some(old) = self.old.outputs.get(id) {
                            record.capabilities.extend(old.capabilities.iter().cloned());
                        }
                    }
                    self.workspace.stamp(self.resources.path(*id))
                }
                None => {
                    if let Some(old) = self.old.outputs.get(id) {
                        record.capabilities = old.capabilities.clone();
                    }
                    self.old.stamps.get(id).copied()
                }
            };
            if let Some(stamp) = stamp {
                next.stamps.insert(new_id, stamp);
            }
            next.outputs.insert(new_id, record);
        }

        for (input, output) in &edges {
            let input = remap.id(&mut next, *input);
            let output = remap.id(&mut next, *output);
            next.inputs.entry(input).or_default().outputs.insert(output);
            next.outputs.entry(output).or_default().inputs.insert(input);
        }

        let mut replayed_messages = BTreeMap::new();
        for (id, messages) in &self.old.messages {
            let kept = kept_inputs.contains(id) || kept_outputs.contains(id);
            if !kept || messages.is_empty() || self.is_fresh(*id) {
                continue;
            }
            let new_id = remap.id(&mut next, *id);
            next.messages.insert(new_id, messages.clone());
            replayed_messages.insert(self.resources.path(*id).to_path_buf(), messages.clone());
        }
        for (id, messages) in self.messages.iter() {
            let new_id = remap.id(&mut next, *id);
            next.messages
                .entry(new_id)
                .or_default()
                .extend(messages.iter().cloned());
        }

        let processed_inputs = self.inputs.values().filter(|input| input.processed).count();
        let summary = BuildSummary {
            escalated: self.escalated,
            skipped: false,
            processed_inputs,
            carried_inputs: kept_inputs.len() - processed_inputs,
            written_outputs: self
                .outputs
                .iter()
                .filter(|(_, output)| output.written)
                .map(|(id, _)| self.resources.path(*id).to_path_buf())
                .collect(),
            deleted_outputs: self
                .deleted
                .iter()
                .filter(|id| !self.is_written(**id))
                .map(|id| self.resources.path(*id).to_path_buf())
                .collect(),
            new_messages: self.new_messages(),
            replayed_messages,
        };
        (next, summary)
    }

    /// Input→output associations that survive into the next state.
    ///
    /// Processed inputs contribute only what they associated in this
    /// session, and so do outputs written in this session. Everything else
    /// keeps its previous associations as well.
    fn associations(
        &self,
        kept_inputs: &BTreeSet<ResourceId>,
        kept_outputs: &BTreeSet<ResourceId>,
    ) -> BTreeSet<(ResourceId, ResourceId)> {
        let mut edges = BTreeSet::new();
        for id in kept_inputs {
            if let Some(session) = self.inputs.get(id) {
                edges.extend(session.outputs.iter().map(|output| (*id, *output)));
            }
            if !self.is_processed(*id) {
                if let Some(old) = self.old.inputs.get(id) {
                    edges.extend(
                        old.outputs
                            .iter()
                            .filter(|output| !self.is_written(**output))
                            .map(|output| (*id, *output)),
                    );
                }
            }
        }
        for id in kept_outputs {
            let carries_old = match self.outputs.get(id) {
                Some(session) => {
                    edges.extend(session.inputs.iter().map(|input| (*input, *id)));
                    session.carried && !session.written
                }
                None => true,
            };
            if carries_old {
                if let Some(old) = self.old.outputs.get(id) {
                    edges.extend(
                        old.inputs
                            .iter()
                            .filter(|input| !self.is_processed(**input))
                            .map(|input| (*input, *id)),
                    );
                }
            }
        }
        edges.retain(|(input, output)| kept_inputs.contains(input) && kept_outputs.contains(output));
        edges
    }

    /// A resource whose previous messages no longer apply.
    fn is_fresh(&self, id: ResourceId) -> bool {
        self.is_processed(id) || self.is_written(id)
    }

    fn is_written(&self, id: ResourceId) -> bool {
        self.outputs.get(&id).is_some_and(|output| output.written)
    }

    fn new_messages(&self) -> BTreeMap<PathBuf, Vec<Message>> {
        self.messages
            .iter()
            .map(|(id, messages)| (self.resources.path(*id).to_path_buf(), messages.to_vec()))
            .collect()
    }
}

/// Translates session ids into ids of the next state's table.
struct Remap<'a> {
    table: &'a ResourceTable,
    ids: BTreeMap<ResourceId, ResourceId>,
}

impl<'a> Remap<'a> {
    fn new(table: &'a ResourceTable) -> Self {
        Self {
            table,
            ids: BTreeMap::new(),
        }
    }

    fn id(&mut self, next: &mut BuildState, id: ResourceId) -> ResourceId {
        let table = self.table;
        *self
            .ids
            .entry(id)
            .or_insert_with(|| next.resources.intern(table.path(id)))
    }
}
