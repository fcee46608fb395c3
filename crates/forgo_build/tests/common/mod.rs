//! Shared fixtures for multi-session build tests.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use forgo_build::{BuildContext, BuildError, BuildSummary, Input};
use forgo_config::ConfigurationDigest;
use forgo_workspace::FilesystemWorkspace;
use tempfile::TempDir;

/// A scratch project tree with a state file under `target/`.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.path(rel)).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn state(&self) -> PathBuf {
        self.path("target/build.state")
    }

    pub fn context(&self) -> BuildContext {
        self.context_with(&ConfigurationDigest::new())
    }

    pub fn context_with(&self, config: &ConfigurationDigest) -> BuildContext {
        BuildContext::open(self.state(), FilesystemWorkspace::new(), config)
    }
}

/// Writes the upper-cased content of `input` to `out/<file name>`.
pub fn copy_upper(ctx: &mut BuildContext, project: &Project, input: Input) -> Result<(), BuildError> {
    let source = ctx.path(input).to_path_buf();
    let name = source.file_name().unwrap().to_string_lossy().into_owned();
    let output = ctx.register_output(project.path(&format!("out/{name}")))?;
    ctx.associate(input, output)?;
    let content = fs::read_to_string(&source).unwrap().to_uppercase();
    let mut stream = ctx.new_output_stream(output)?;
    stream.write_all(content.as_bytes()).unwrap();
    stream.finish()?;
    Ok(())
}

/// One session of a copier step over every file under `src/`.
///
/// Returns the file names of the inputs that were processed.
pub fn copy_step(project: &Project) -> (Vec<String>, BuildSummary) {
    let mut ctx = project.context();
    let processed = ctx.process_inputs(project.path("src"), |_| true).unwrap();
    let mut names = Vec::new();
    for input in processed {
        names.push(file_name(&ctx, input));
        copy_upper(&mut ctx, project, input).unwrap();
    }
    (names, ctx.commit().unwrap())
}

pub fn file_name(ctx: &BuildContext, input: Input) -> String {
    ctx.path(input)
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned()
}

pub fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| Path::new(p).file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}
