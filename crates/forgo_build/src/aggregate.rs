//! Outputs generated from many inputs at once.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use forgo_state::ResourceId;
use forgo_workspace::{ResourceStatus, Workspace};

use crate::context::{absolute, BuildContext};
use crate::error::BuildError;
use crate::graph::{Input, Output};

/// An output derived from a whole set of inputs, such as an index or a
/// merged manifest.
///
/// Unlike a one-to-one output, an aggregate cannot be updated from the
/// changed inputs alone: when anything about its input set changes, it is
/// regenerated from every candidate input.
///
/// ```no_run
/// use forgo_build::{AggregateOutput, BuildContext};
/// use forgo_config::ConfigurationDigest;
/// use forgo_workspace::FilesystemWorkspace;
/// use std::io::Write;
///
/// # fn main() -> Result<(), forgo_build::BuildError> {
/// let mut ctx = BuildContext::open(
///     "target/index.state",
///     FilesystemWorkspace::new(),
///     &ConfigurationDigest::new(),
/// );
/// let mut index = AggregateOutput::new("target/index.txt");
/// index.add_inputs(&mut ctx, "src", |path| path.extension().is_some_and(|e| e == "txt"))?;
/// index.create_if_necessary(&mut ctx, |ctx, output, inputs| {
///     let names: Vec<String> = inputs.iter().map(|i| ctx.path(*i).display().to_string()).collect();
///     let mut stream = ctx.new_output_stream(output)?;
///     stream.write_all(names.join("\n").as_bytes()).ok();
///     stream.finish()?;
///     Ok(())
/// })?;
/// ctx.commit()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AggregateOutput {
    path: PathBuf,
    candidates: BTreeSet<Input>,
}

impl AggregateOutput {
    /// Creates an aggregate that will be written to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            candidates: BTreeSet::new(),
        }
    }

    /// The aggregate output location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Registers `path` as a candidate input.
    pub fn add_input<W: Workspace>(
        &mut self,
        ctx: &mut BuildContext<W>,
        path: impl AsRef<Path>,
    ) -> Result<Input, BuildError> {
        let input = ctx.register_input(path)?;
        self.candidates.insert(input);
        Ok(input)
    }

    /// Registers every file under `basedir` accepted by `filter` as a
    /// candidate input.
    pub fn add_inputs<W: Workspace>(
        &mut self,
        ctx: &mut BuildContext<W>,
        basedir: impl AsRef<Path>,
        filter: impl FnMut(&Path) -> bool,
    ) -> Result<(), BuildError> {
        self.candidates.extend(ctx.register_inputs(basedir, filter)?);
        Ok(())
    }

    /// The registered candidate inputs, in resource id order.
    pub fn inputs(&self) -> impl Iterator<Item = Input> + '_ {
        self.candidates.iter().copied()
    }

    /// Regenerates the aggregate if its input set changed.
    ///
    /// Regeneration is needed when the session is escalated, a candidate is
    /// new or modified, an input of the previous aggregate was removed,
    /// changed, or is no longer a candidate, or the aggregate itself is
    /// missing or was modified. Changed candidates are then processed, every
    /// candidate is associated with the output, and `creator` is called with
    /// all of them. Otherwise the output and its associations are carried
    /// over. Returns whether `creator` ran.
    pub fn create_if_necessary<W, F>(
        self,
        ctx: &mut BuildContext<W>,
        creator: F,
    ) -> Result<bool, BuildError>
    where
        W: Workspace,
        F: FnOnce(&mut BuildContext<W>, Output, &[Input]) -> Result<(), BuildError>,
    {
        let path = absolute(&self.path)?;
        let regenerate = !ctx.is_skip_execution() && self.requires_regeneration(ctx, &path);
        let output = ctx.register_output(&path)?;
        if !regenerate {
            tracing::debug!(output = %path.display(), "aggregate up to date");
            return Ok(false);
        }

        let inputs: Vec<Input> = self.candidates.iter().copied().collect();
        for input in &inputs {
            if ctx.is_escalated() || ctx.status(*input).is_changed() {
                ctx.process(*input)?;
            }
            ctx.associate(*input, output)?;
        }
        ctx.process_output(output)?;
        tracing::debug!(
            output = %path.display(),
            inputs = inputs.len(),
            "regenerating aggregate"
        );
        creator(ctx, output, &inputs)?;
        Ok(true)
    }

    fn requires_regeneration<W: Workspace>(&self, ctx: &BuildContext<W>, path: &Path) -> bool {
        if ctx.is_escalated() {
            return true;
        }
        let Some(old) = ctx.old_state().output(path) else {
            return true;
        };
        let Some(id) = ctx.old_state().id(path) else {
            return true;
        };
        if ctx.status(id) != ResourceStatus::Unmodified {
            return true;
        }
        let candidates: BTreeSet<ResourceId> = self.candidates.iter().map(|input| input.id()).collect();
        if candidates.iter().any(|id| ctx.status(*id).is_changed()) {
            return true;
        }
        old.inputs
            .iter()
            .any(|id| !candidates.contains(id) || ctx.status(*id) != ResourceStatus::Unmodified)
    }
}
