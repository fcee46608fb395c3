//! Session-scoped input and output entities and the requirement index.
//!
//! Entities refer to each other by [`ResourceId`] only. The session resource
//! table starts as a copy of the previous build's table, so ids recorded in
//! the prior state and ids handed out during the session share one space.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use forgo_common::QualifiedName;
use forgo_state::{BuildState, OutputRecord, ResourceId, ResourceTable};

/// Handle to an input registered in the current session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Input(pub(crate) ResourceId);

impl Input {
    /// The resource id of this input.
    pub fn id(self) -> ResourceId {
        self.0
    }
}

impl From<Input> for ResourceId {
    fn from(input: Input) -> Self {
        input.0
    }
}

/// Handle to an output registered in the current session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Output(pub(crate) ResourceId);

impl Output {
    /// The resource id of this output.
    pub fn id(self) -> ResourceId {
        self.0
    }
}

impl From<Output> for ResourceId {
    fn from(output: Output) -> Self {
        output.0
    }
}

/// An input as seen by the current session.
///
/// Registration creates a clean slate; nothing from the prior build is
/// copied in. Whether the prior record is carried over is decided at commit
/// from `processed`.
#[derive(Debug, Default)]
pub(crate) struct SessionInput {
    pub(crate) processed: bool,
    pub(crate) attributes: BTreeMap<String, Vec<u8>>,
    pub(crate) outputs: BTreeSet<ResourceId>,
    pub(crate) included_inputs: BTreeSet<ResourceId>,
    pub(crate) requirements: BTreeSet<QualifiedName>,
}

/// An output as seen by the current session.
#[derive(Debug, Default)]
pub(crate) struct SessionOutput {
    /// Unmodified on disk with a prior record; keeps the old associations
    /// and capabilities unless rewritten.
    pub(crate) carried: bool,
    pub(crate) written: bool,
    pub(crate) inputs: BTreeSet<ResourceId>,
    pub(crate) capabilities: BTreeSet<QualifiedName>,
}

/// Reverse index from a requirement to the inputs declaring it.
///
/// Seeded from the previous build; an input's old entries are dropped when
/// it is processed, and its new requirements are added as they are declared.
#[derive(Debug, Default)]
pub(crate) struct RequirementIndex {
    dependents: HashMap<QualifiedName, BTreeSet<ResourceId>>,
}

impl RequirementIndex {
    pub(crate) fn from_state(state: &BuildState) -> Self {
        let mut index = Self::default();
        for (id, record) in &state.inputs {
            for name in &record.requirements {
                index.insert(name.clone(), *id);
            }
        }
        index
    }

    pub(crate) fn insert(&mut self, name: QualifiedName, input: ResourceId) {
        self.dependents.entry(name).or_default().insert(input);
    }

    pub(crate) fn remove(&mut self, name: &QualifiedName, input: ResourceId) {
        if let Some(inputs) = self.dependents.get_mut(name) {
            inputs.remove(&input);
            if inputs.is_empty() {
                self.dependents.remove(name);
            }
        }
    }

    pub(crate) fn dependents(&self, name: &QualifiedName) -> Vec<ResourceId> {
        self.dependents
            .get(name)
            .map(|inputs| inputs.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// Read-only view of an output as recorded by the previous build.
#[derive(Clone, Copy, Debug)]
pub struct OldOutput<'a> {
    pub(crate) table: &'a ResourceTable,
    pub(crate) id: ResourceId,
    pub(crate) record: &'a OutputRecord,
}

impl<'a> OldOutput<'a> {
    /// The output location.
    pub fn path(&self) -> &'a Path {
        self.table.path(self.id)
    }

    /// Inputs that contributed to the output in the previous build.
    pub fn inputs(&self) -> impl Iterator<Item = &'a Path> + 'a {
        let table = self.table;
        self.record.inputs.iter().map(move |id| table.path(*id))
    }

    /// Capabilities the output provided in the previous build.
    pub fn capabilities(&self) -> impl Iterator<Item = &'a QualifiedName> + 'a {
        self.record.capabilities.iter()
    }
}
