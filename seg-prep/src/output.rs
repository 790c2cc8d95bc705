//! Output directory handling for tiled datasets.

use crate::{
    common::*,
    decision::{confirm, Decider},
    error::PathContext as _,
    utils,
};

pub const INPUTS_DIR: &str = "inputs";
pub const LABELS_DIR: &str = "labels";
pub const STATS_FILE: &str = "stats.csv";

/// Paths of one tiled dataset below the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDir {
    root: PathBuf,
}

impl DatasetDir {
    pub fn new(output_root: impl AsRef<Path>, dataset: &str) -> Self {
        Self {
            root: output_root.as_ref().join(dataset),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn inputs(&self) -> PathBuf {
        self.root.join(INPUTS_DIR)
    }

    pub fn labels(&self) -> PathBuf {
        self.root.join(LABELS_DIR)
    }

    pub fn stats(&self) -> PathBuf {
        self.root.join(STATS_FILE)
    }

    fn create_subdirs(&self) -> Result<()> {
        utils::create_dir_all(&self.inputs())?;
        utils::create_dir_all(&self.labels())?;
        Ok(())
    }
}

/// Prepares `output_root/dataset` for writing.
///
/// Returns `false` when the directory exists and the decider declines to
/// overwrite it. Nothing on disk is touched in that case.
pub fn ensure_output(
    output_root: &Path,
    dataset: &str,
    decider: &mut dyn Decider,
) -> Result<bool> {
    if !output_root.exists() {
        utils::create_dir_all(output_root)?;
        info!("created directory '{}'", output_root.display());
    }

    let dir = DatasetDir::new(output_root, dataset);

    if !dir.root().exists() {
        utils::create_dir_all(dir.root())?;
        dir.create_subdirs()?;
        info!("created directory '{}'", dir.root().display());
        return Ok(true);
    }

    warn!("directory '{}' already exists", dir.root().display());
    let question = format!(
        "Do you want to overwrite '{}'? (y/n): ",
        dir.root().display()
    );
    let overwrite = confirm(decider, &question).at_path(dir.root())?;

    if overwrite {
        utils::remove_dir_all(dir.root())?;
        dir.create_subdirs()?;
        info!("overwritten directory '{}'", dir.root().display());
    } else {
        info!("skipped directory '{}'", dir.root().display());
    }

    Ok(overwrite)
}
