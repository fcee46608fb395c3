//! The persisted snapshot of one build's input/output graph.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use forgo_common::{ContentHash, QualifiedName};
use forgo_diagnostics::Message;
use forgo_workspace::ResourceStamp;
use serde::{Deserialize, Serialize};

use crate::resource::{ResourceId, ResourceTable};

/// Everything a build session remembers for the next one.
///
/// All cross-references go through [`ResourceId`]s resolved by `resources`.
/// Input↔output associations are stored on both sides and kept symmetric by
/// whoever builds the state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BuildState {
    /// Digest of the configuration of the session that wrote this state.
    pub configuration: Option<ContentHash>,

    /// Resource identity table.
    pub resources: ResourceTable,

    /// Identity stamp of every tracked resource when the state was written.
    pub stamps: BTreeMap<ResourceId, ResourceStamp>,

    /// Per-input attributes and associations.
    pub inputs: BTreeMap<ResourceId, InputRecord>,

    /// Per-output associations and capabilities.
    pub outputs: BTreeMap<ResourceId, OutputRecord>,

    /// Messages per resource, in the order they were added.
    pub messages: BTreeMap<ResourceId, Vec<Message>>,
}

/// Recorded state of a single input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Attribute values, bincode-encoded by the session.
    pub attributes: BTreeMap<String, Vec<u8>>,

    /// Outputs this input contributed to.
    pub outputs: BTreeSet<ResourceId>,

    /// Resources this input textually includes.
    pub included_inputs: BTreeSet<ResourceId>,

    /// Capabilities this input depends on.
    pub requirements: BTreeSet<QualifiedName>,
}

/// Recorded state of a single output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Inputs that contributed to this output.
    pub inputs: BTreeSet<ResourceId>,

    /// Capabilities this output provides.
    pub capabilities: BTreeSet<QualifiedName>,
}

impl BuildState {
    /// Creates an empty state for the given configuration digest.
    pub fn new(configuration: Option<ContentHash>) -> Self {
        Self {
            configuration,
            ..Self::default()
        }
    }

    /// Returns `true` if the state tracks no resources.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty() && self.messages.is_empty()
    }

    /// Looks up the id of a tracked path.
    pub fn id(&self, path: &Path) -> Option<ResourceId> {
        self.resources.get(path)
    }

    /// Resolves an id to its path.
    pub fn path(&self, id: ResourceId) -> &Path {
        self.resources.path(id)
    }

    /// Returns the recorded input for `path`, if any.
    pub fn input(&self, path: &Path) -> Option<&InputRecord> {
        self.id(path).and_then(|id| self.inputs.get(&id))
    }

    /// Returns the recorded output for `path`, if any.
    pub fn output(&self, path: &Path) -> Option<&OutputRecord> {
        self.id(path).and_then(|id| self.outputs.get(&id))
    }

    /// Returns the recorded stamp of a resource.
    pub fn stamp(&self, id: ResourceId) -> Option<&ResourceStamp> {
        self.stamps.get(&id)
    }

    /// Returns the recorded messages of a resource.
    pub fn messages(&self, id: ResourceId) -> &[Message] {
        self.messages.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `true` if any recorded message has error severity.
    pub fn has_errors(&self) -> bool {
        self.messages.values().flatten().any(Message::is_error)
    }

    /// Checks that every input→output association has its output→input
    /// counterpart and vice versa.
    pub fn is_symmetric(&self) -> bool {
        let forward = self.inputs.iter().all(|(input, record)| {
            record.outputs.iter().all(|output| {
                self.outputs
                    .get(output)
                    .is_some_and(|o| o.inputs.contains(input))
            })
        });
        let backward = self.outputs.iter().all(|(output, record)| {
            record.inputs.iter().all(|input| {
                self.inputs
                    .get(input)
                    .is_some_and(|i| i.outputs.contains(output))
            })
        });
        forward && backward
    }
}
