//! The build session facade.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};

use forgo_common::{ContentHash, QualifiedName};
use forgo_config::{ConfigurationDigest, StepConfig};
use forgo_diagnostics::{Message, MessageLog};
use forgo_state::{BuildState, ResourceId, ResourceTable, StateStore};
use forgo_workspace::{
    FilesystemWorkspace, IncrementalFileWriter, Mode, ResourceStamp, ResourceStatus, WalkEntry,
    Workspace,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::BuildError;
use crate::graph::{Input, OldOutput, Output, RequirementIndex, SessionInput, SessionOutput};

/// A single incremental build session for one build step.
///
/// The context is opened against a state file, driven through `&mut self`
/// while the step registers and processes resources, and consumed by
/// [`commit`](Self::commit). Dropping it without committing leaves the prior
/// state authoritative.
///
/// ```no_run
/// use forgo_build::BuildContext;
/// use forgo_config::ConfigurationDigest;
/// use forgo_workspace::FilesystemWorkspace;
/// use std::io::Write;
///
/// # fn main() -> Result<(), forgo_build::BuildError> {
/// let mut ctx = BuildContext::open(
///     "target/copy.state",
///     FilesystemWorkspace::new(),
///     &ConfigurationDigest::new(),
/// );
/// if let Some(input) = ctx.process_input("src/a.txt")? {
///     let output = ctx.register_output("target/a.txt")?;
///     ctx.associate(input, output)?;
///     let mut stream = ctx.new_output_stream(output)?;
///     stream.write_all(&std::fs::read("src/a.txt").unwrap_or_default()).ok();
///     stream.finish()?;
/// }
/// let summary = ctx.commit()?;
/// assert!(!summary.is_failure());
/// # Ok(())
/// # }
/// ```
pub struct BuildContext<W: Workspace = FilesystemWorkspace> {
    pub(crate) store: StateStore,
    pub(crate) workspace: W,
    pub(crate) old: BuildState,
    pub(crate) resources: ResourceTable,
    pub(crate) configuration: ContentHash,
    pub(crate) escalated: bool,
    pub(crate) skip_execution: bool,
    /// Stamps captured at registration for inputs, included inputs, and
    /// digest inputs.
    pub(crate) stamps: HashMap<ResourceId, ResourceStamp>,
    pub(crate) inputs: BTreeMap<ResourceId, SessionInput>,
    pub(crate) outputs: BTreeMap<ResourceId, SessionOutput>,
    pub(crate) requirements: RequirementIndex,
    pub(crate) messages: MessageLog<ResourceId>,
    /// Outputs of the previous build deleted by the stale collector.
    pub(crate) deleted: BTreeSet<ResourceId>,
}

impl BuildContext<FilesystemWorkspace> {
    /// Opens a session for a step described by a `forgo.toml` configuration.
    pub fn for_step(step_dir: &Path, config: &StepConfig) -> Self {
        Self::open(
            config.state_path(step_dir),
            FilesystemWorkspace::with_mode(config.step.mode),
            &config.configuration_digest(),
        )
    }
}

impl<W: Workspace> BuildContext<W> {
    /// Opens a session, loading the previous build's state from `state_path`.
    ///
    /// An unreadable state file starts the session from an empty state. The
    /// session is escalated, making every input require processing, if the
    /// workspace is in [`Mode::Escalated`] or `configuration` differs from the
    /// digest the previous build recorded. [`Mode::Suppressed`] opens a
    /// skipped session.
    pub fn open(
        state_path: impl Into<PathBuf>,
        workspace: W,
        configuration: &ConfigurationDigest,
    ) -> Self {
        let store = StateStore::new(state_path);
        let old = store.load();
        let configuration = configuration.finish();
        let mode = workspace.mode();
        let escalated = mode == Mode::Escalated
            || old.configuration.is_some_and(|previous| previous != configuration);
        tracing::debug!(
            state = %store.path().display(),
            %mode,
            escalated,
            tracked = old.resources.len(),
            "opened build session"
        );

        let resources = old.resources.clone();
        let requirements = RequirementIndex::from_state(&old);
        Self {
            store,
            workspace,
            old,
            resources,
            configuration,
            escalated,
            skip_execution: mode == Mode::Suppressed,
            stamps: HashMap::new(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            requirements,
            messages: MessageLog::new(),
            deleted: BTreeSet::new(),
        }
    }

    /// The workspace this session operates on.
    pub fn workspace(&self) -> &W {
        &self.workspace
    }

    /// The state recorded by the previous build.
    pub fn old_state(&self) -> &BuildState {
        &self.old
    }

    /// Returns `true` if every input requires processing in this session.
    pub fn is_escalated(&self) -> bool {
        self.escalated
    }

    /// Returns `true` if this session carries the prior state over unchanged.
    pub fn is_skip_execution(&self) -> bool {
        self.skip_execution
    }

    /// Marks the session as a skipped execution.
    ///
    /// Commit then persists the previous build's state unchanged, replays
    /// its messages, and deletes nothing. Fails if any input was already
    /// processed or any output written.
    pub fn mark_skip_execution(&mut self) -> Result<(), BuildError> {
        let busy = self.inputs.values().any(|input| input.processed)
            || self.outputs.values().any(|output| output.written);
        if busy {
            return Err(BuildError::IllegalState(
                "cannot skip execution after processing has started".to_string(),
            ));
        }
        self.skip_execution = true;
        Ok(())
    }

    /// Resolves a resource handle or id to its path.
    pub fn path(&self, resource: impl Into<ResourceId>) -> &Path {
        self.resources.path(resource.into())
    }

    // ---- inputs ----

    /// Registers an input for this session.
    ///
    /// Registration is idempotent: the same path yields the same handle for
    /// the rest of the session. Fails with [`BuildError::InvalidInput`] if the
    /// path is not an existing regular file.
    pub fn register_input(&mut self, path: impl AsRef<Path>) -> Result<Input, BuildError> {
        let path = absolute(path.as_ref())?;
        if let Some(id) = self.resources.get(&path) {
            if self.inputs.contains_key(&id) {
                return Ok(Input(id));
            }
        }
        if !self.workspace.is_regular_file(&path) {
            return Err(BuildError::InvalidInput { path });
        }
        let Some(stamp) = self.workspace.stamp(&path) else {
            return Err(BuildError::InvalidInput { path });
        };
        let id = self.resources.intern(&path);
        self.stamps.insert(id, stamp);
        self.inputs.insert(id, SessionInput::default());
        Ok(Input(id))
    }

    /// Registers a non-filesystem input identified by a content digest.
    ///
    /// `key` names the resource (a classpath entry, a URL); the digest takes
    /// the place of length and modification time in change detection. Such
    /// inputs must be registered in every session: an unregistered digest
    /// input counts as removed.
    pub fn register_digest_input(&mut self, key: &str, digest: ContentHash) -> Input {
        let id = self.resources.intern(Path::new(key));
        self.stamps.insert(id, ResourceStamp::Digest(digest));
        self.inputs.entry(id).or_default();
        Input(id)
    }

    /// Registers every regular file under `basedir` accepted by `filter`.
    ///
    /// In [`Mode::Delta`] the workspace reports only changed files; inputs of
    /// the previous build under `basedir` that were not reported are
    /// registered as unmodified.
    pub fn register_inputs(
        &mut self,
        basedir: impl AsRef<Path>,
        mut filter: impl FnMut(&Path) -> bool,
    ) -> Result<Vec<Input>, BuildError> {
        let basedir = absolute(basedir.as_ref())?;
        let mut entries = Vec::new();
        self.workspace
            .walk(&basedir, &mut |entry: &WalkEntry| entries.push(entry.clone()))?;

        let mut reported = BTreeSet::new();
        let mut registered = Vec::new();
        for entry in entries {
            reported.insert(entry.path.clone());
            if entry.status == ResourceStatus::Removed || !filter(&entry.path) {
                continue;
            }
            registered.push(self.register_input(&entry.path)?);
        }

        if self.workspace.mode() == Mode::Delta {
            let unreported: Vec<ResourceId> = self
                .old
                .inputs
                .keys()
                .copied()
                .filter(|id| {
                    let path = self.resources.path(*id);
                    path.starts_with(&basedir) && !reported.contains(path)
                })
                .collect();
            for id in unreported {
                if !filter(self.resources.path(id)) {
                    continue;
                }
                if !self.inputs.contains_key(&id) {
                    if let Some(stamp) = self.old.stamps.get(&id) {
                        self.stamps.insert(id, *stamp);
                    }
                    self.inputs.insert(id, SessionInput::default());
                }
                registered.push(Input(id));
            }
        }
        Ok(registered)
    }

    /// Registers the files under `basedir` accepted by `filter` and processes
    /// those that require it, returning the processed inputs.
    pub fn process_inputs(
        &mut self,
        basedir: impl AsRef<Path>,
        filter: impl FnMut(&Path) -> bool,
    ) -> Result<Vec<Input>, BuildError> {
        let mut processed = Vec::new();
        for input in self.register_inputs(basedir, filter)? {
            if self.is_processed(input.0) || self.requires_processing(input) {
                self.process(input)?;
                processed.push(input);
            }
        }
        Ok(processed)
    }

    /// Registers an input and processes it if it requires processing.
    ///
    /// Returns the input if it is processed in this session, `None` if the
    /// previous build's results for it are still valid.
    pub fn process_input(&mut self, path: impl AsRef<Path>) -> Result<Option<Input>, BuildError> {
        let input = self.register_input(path)?;
        if self.is_processed(input.0) {
            return Ok(Some(input));
        }
        if !self.requires_processing(input) {
            return Ok(None);
        }
        self.process(input)?;
        Ok(Some(input))
    }

    /// Marks an input as processed in this session.
    ///
    /// The prior build's associations, attributes, requirements, and
    /// messages of the input are not carried over. Processing an input twice
    /// is a no-op.
    pub fn process(&mut self, input: Input) -> Result<(), BuildError> {
        self.ensure_executing("process inputs")?;
        let session = self
            .inputs
            .get_mut(&input.0)
            .ok_or_else(|| unregistered(&self.resources, input.0, "input"))?;
        if session.processed {
            return Ok(());
        }
        session.processed = true;
        let declared: Vec<QualifiedName> = session.requirements.iter().cloned().collect();

        if let Some(old) = self.old.inputs.get(&input.0) {
            for name in &old.requirements {
                self.requirements.remove(name, input.0);
            }
        }
        for name in declared {
            self.requirements.insert(name, input.0);
        }
        tracing::debug!(input = %self.resources.path(input.0).display(), "processing input");
        Ok(())
    }

    /// Records that `input` textually includes the resource at `path`.
    ///
    /// The including input requires processing in a later build if the
    /// included resource changes or disappears. A resource that does not
    /// exist is recorded as absent, and only its appearance invalidates the
    /// including input.
    pub fn add_included_input(
        &mut self,
        input: Input,
        path: impl AsRef<Path>,
    ) -> Result<(), BuildError> {
        let path = absolute(path.as_ref())?;
        let id = self.resources.intern(&path);
        let stamp = self.workspace.stamp(&path).unwrap_or(ResourceStamp::Absent);
        self.stamps.entry(id).or_insert(stamp);
        self.input_mut(input)?.included_inputs.insert(id);
        Ok(())
    }

    /// Declares that `input` depends on the capability `(qualifier, local_name)`.
    pub fn add_requirement(
        &mut self,
        input: Input,
        qualifier: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Result<(), BuildError> {
        let name = QualifiedName::new(qualifier, local_name);
        self.input_mut(input)?.requirements.insert(name.clone());
        self.requirements.insert(name, input.0);
        Ok(())
    }

    /// Returns the inputs that declared a requirement on
    /// `(qualifier, local_name)`, registering those from the previous build.
    ///
    /// Dependents that no longer exist are skipped.
    pub fn get_dependent_inputs(
        &mut self,
        qualifier: &str,
        local_name: &str,
    ) -> Result<Vec<Input>, BuildError> {
        let name = QualifiedName::new(qualifier, local_name);
        let mut dependents = Vec::new();
        for id in self.requirements.dependents(&name) {
            if self.inputs.contains_key(&id) {
                dependents.push(Input(id));
                continue;
            }
            let path = self.resources.path(id).to_path_buf();
            if self.workspace.is_regular_file(&path) {
                dependents.push(self.register_input(&path)?);
            }
        }
        Ok(dependents)
    }

    /// Processes every not-yet-processed input that requires a capability
    /// changed by this session, returning them.
    pub fn take_dependents(&mut self) -> Result<Vec<Input>, BuildError> {
        if self.skip_execution {
            return Ok(Vec::new());
        }
        let mut taken = Vec::new();
        for name in self.changed_capabilities() {
            for input in self.get_dependent_inputs(&name.qualifier, &name.local_name)? {
                if !self.is_processed(input.0) {
                    self.process(input)?;
                    tracing::debug!(
                        input = %self.resources.path(input.0).display(),
                        capability = %name,
                        "processing dependent input"
                    );
                    taken.push(input);
                }
            }
        }
        Ok(taken)
    }

    /// Processes the inputs at `paths` that require processing, then keeps
    /// processing dependents of changed capabilities until none remain.
    ///
    /// `step` is called once for every processed input. Each input is
    /// processed at most once, so this terminates after at most as many
    /// rounds as there are inputs.
    pub fn process_with_dependents<I, P, F>(&mut self, paths: I, mut step: F) -> Result<(), BuildError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
        F: FnMut(&mut Self, Input) -> Result<(), BuildError>,
    {
        let mut queue = VecDeque::new();
        for path in paths {
            if let Some(input) = self.process_input(path)? {
                queue.push_back(input);
            }
        }
        let mut round = 0usize;
        while !queue.is_empty() {
            round += 1;
            tracing::debug!(round, inputs = queue.len(), "processing round");
            while let Some(input) = queue.pop_front() {
                step(self, input)?;
            }
            queue.extend(self.take_dependents()?);
        }
        Ok(())
    }

    // ---- outputs ----

    /// Registers an output for this session.
    ///
    /// An output that is unmodified on disk and recorded by the previous
    /// build keeps its old associations and capabilities unless it is
    /// rewritten. Registered outputs are never collected as stale.
    pub fn register_output(&mut self, path: impl AsRef<Path>) -> Result<Output, BuildError> {
        let path = absolute(path.as_ref())?;
        if self.workspace.is_directory(&path) {
            return Err(BuildError::InvalidOutput {
                path,
                reason: "is a directory".to_string(),
            });
        }
        let id = self.resources.intern(&path);
        if !self.outputs.contains_key(&id) {
            let carried = self.old.outputs.contains_key(&id)
                && !self.deleted.contains(&id)
                && self.status(id) == ResourceStatus::Unmodified;
            self.outputs.insert(
                id,
                SessionOutput {
                    carried,
                    ..SessionOutput::default()
                },
            );
        }
        Ok(Output(id))
    }

    /// Returns the previous build's record of the output at `path`.
    pub fn get_old_output(&self, path: impl AsRef<Path>) -> Option<OldOutput<'_>> {
        let path = absolute(path.as_ref()).ok()?;
        let id = self.old.id(&path)?;
        let record = self.old.outputs.get(&id)?;
        Some(OldOutput {
            table: &self.old.resources,
            id,
            record,
        })
    }

    /// Marks an output as written in this session, dropping the associations
    /// and capabilities it carried over from the previous build.
    pub fn process_output(&mut self, output: Output) -> Result<(), BuildError> {
        self.ensure_executing("write outputs")?;
        let session = self.output_mut(output)?;
        session.written = true;
        session.carried = false;
        Ok(())
    }

    /// Marks an output as written and opens a write-if-different stream to it.
    pub fn new_output_stream(&mut self, output: Output) -> Result<IncrementalFileWriter, BuildError> {
        self.process_output(output)?;
        let path = self.resources.path(output.0);
        Ok(self.workspace.new_output_stream(path)?)
    }

    /// Declares that `output` provides the capability `(qualifier, local_name)`.
    pub fn add_capability(
        &mut self,
        output: Output,
        qualifier: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Result<(), BuildError> {
        let name = QualifiedName::new(qualifier, local_name);
        self.output_mut(output)?.capabilities.insert(name);
        Ok(())
    }

    /// Associates an input with an output it contributes to.
    pub fn associate(&mut self, input: Input, output: Output) -> Result<(), BuildError> {
        self.output_mut(output)?;
        self.input_mut(input)?.outputs.insert(output.0);
        self.output_mut(output)?.inputs.insert(input.0);
        Ok(())
    }

    /// Associates `input` with `output`, from the output's side.
    pub fn associate_input(&mut self, output: Output, input: Input) -> Result<(), BuildError> {
        self.associate(input, output)
    }

    /// Associates `output` with `input`, from the input's side.
    pub fn associate_output(&mut self, input: Input, output: Output) -> Result<(), BuildError> {
        self.associate(input, output)
    }

    // ---- attributes and messages ----

    /// Stores a value on `input` for later builds.
    pub fn set_value<T: Serialize>(
        &mut self,
        input: Input,
        key: &str,
        value: &T,
    ) -> Result<(), BuildError> {
        let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(
            |e| BuildError::Attribute {
                key: key.to_string(),
                reason: e.to_string(),
            },
        )?;
        self.input_mut(input)?
            .attributes
            .insert(key.to_string(), bytes);
        Ok(())
    }

    /// Reads a value stored on `input`.
    ///
    /// Values set in this session win. Otherwise, an unmodified input that
    /// was not processed in this session still sees the value from the
    /// previous build. Use [`get_old_value`](Self::get_old_value) to read
    /// the previous value of a modified input.
    pub fn get_value<T: DeserializeOwned>(
        &self,
        input: Input,
        key: &str,
    ) -> Result<Option<T>, BuildError> {
        let session = self
            .inputs
            .get(&input.0)
            .ok_or_else(|| unregistered(&self.resources, input.0, "input"))?;
        let restored = !session.processed && self.status(input) == ResourceStatus::Unmodified;
        let bytes = match session.attributes.get(key) {
            Some(bytes) => Some(bytes),
            None if restored => self
                .old
                .inputs
                .get(&input.0)
                .and_then(|record| record.attributes.get(key)),
            None => None,
        };
        bytes.map(|bytes| decode_value(key, bytes)).transpose()
    }

    /// Reads the value the previous build stored on `input`.
    pub fn get_old_value<T: DeserializeOwned>(
        &self,
        input: Input,
        key: &str,
    ) -> Result<Option<T>, BuildError> {
        self.old
            .inputs
            .get(&input.0)
            .and_then(|record| record.attributes.get(key))
            .map(|bytes| decode_value(key, bytes))
            .transpose()
    }

    /// Attaches a message to a resource.
    ///
    /// Error-severity messages fail the build at commit. Messages persist
    /// and are replayed in later builds until the resource is processed again.
    pub fn add_message(&mut self, resource: impl Into<ResourceId>, message: Message) {
        let id = resource.into();
        tracing::debug!(
            resource = %self.resources.path(id).display(),
            severity = %message.severity,
            "message recorded"
        );
        self.messages.add(id, message);
    }

    /// Messages recorded for a resource in this session.
    pub fn messages(&self, resource: impl Into<ResourceId>) -> &[Message] {
        self.messages.get(&resource.into())
    }

    // ---- helpers ----

    pub(crate) fn is_processed(&self, id: ResourceId) -> bool {
        self.inputs.get(&id).is_some_and(|input| input.processed)
    }

    pub(crate) fn ensure_executing(&self, action: &str) -> Result<(), BuildError> {
        if self.skip_execution {
            return Err(BuildError::IllegalState(format!(
                "cannot {action} in a skipped session"
            )));
        }
        Ok(())
    }

    fn input_mut(&mut self, input: Input) -> Result<&mut SessionInput, BuildError> {
        self.inputs
            .get_mut(&input.0)
            .ok_or_else(|| unregistered(&self.resources, input.0, "input"))
    }

    fn output_mut(&mut self, output: Output) -> Result<&mut SessionOutput, BuildError> {
        self.outputs
            .get_mut(&output.0)
            .ok_or_else(|| unregistered(&self.resources, output.0, "output"))
    }
}

pub(crate) fn absolute(path: &Path) -> Result<PathBuf, BuildError> {
    std::path::absolute(path).map_err(|e| BuildError::Path {
        path: path.to_path_buf(),
        source: e,
    })
}

fn unregistered(resources: &ResourceTable, id: ResourceId, kind: &str) -> BuildError {
    BuildError::IllegalState(format!(
        "{} is not registered as an {kind} in this session",
        resources.path(id).display()
    ))
}

fn decode_value<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, BuildError> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| BuildError::Attribute {
            key: key.to_string(),
            reason: e.to_string(),
        })
}
