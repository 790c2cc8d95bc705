//! Training session setup: checkpoint directory plus split files.

use crate::{
    common::*,
    config::{HyperParams, TrainConfig},
    error::PathContext as _,
    split::{self, SplitAssignment, SplitRequest},
    utils,
};

/// Format of session identifiers, e.g. `20230720_182607_042`.
pub const SESSION_STRFTIME: &str = "%Y%m%d_%H%M%S_%3f";

/// Snapshot of the session parameters stored next to the split files.
pub const CONFIG_SNAPSHOT_FILE: &str = "config.json5";

/// What to do when the session setup is interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptPolicy {
    /// Clean up and report [SessionOutcome::Interrupted].
    Absorb,
    /// Clean up and return [Error::Interrupted].
    Propagate,
}

impl Default for InterruptPolicy {
    fn default() -> Self {
        Self::Absorb
    }
}

/// A fully populated checkpoint directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub dir: PathBuf,
    pub assignments: Vec<SplitAssignment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Ready(Checkpoint),
    /// Setup was interrupted and the checkpoint directory removed.
    Interrupted,
}

#[derive(Debug, Serialize)]
struct SessionSnapshot<'a> {
    session_id: &'a str,
    dataset: &'a str,
    kfold: usize,
    #[serde(flatten)]
    hyper: HyperParams,
}

/// Creates checkpoint directories for training runs.
#[derive(Debug)]
pub struct TrainingSession<'a> {
    config: &'a TrainConfig,
    interrupted: Arc<AtomicBool>,
    policy: InterruptPolicy,
}

impl<'a> TrainingSession<'a> {
    pub fn new(config: &'a TrainConfig) -> Self {
        Self {
            config,
            interrupted: Arc::new(AtomicBool::new(false)),
            policy: InterruptPolicy::default(),
        }
    }

    /// Uses `flag` as the interruption signal, e.g. one set by a Ctrl-C handler.
    pub fn interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    pub fn interrupt_policy(mut self, policy: InterruptPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Starts a session named after the current local time.
    pub fn start(&self, dataset: &str, kfold: usize) -> Result<SessionOutcome> {
        let session_id = Local::now().format(SESSION_STRFTIME).to_string();
        self.start_with_id(&session_id, dataset, kfold)
    }

    /// Starts a session in `checkpoint_dir/session_id`.
    ///
    /// The directory does not survive a failed or interrupted setup.
    pub fn start_with_id(
        &self,
        session_id: &str,
        dataset: &str,
        kfold: usize,
    ) -> Result<SessionOutcome> {
        let dir = self.config.checkpoint_dir.join(session_id);
        let guard = CheckpointGuard::create(dir)?;
        info!("created checkpoint directory '{}'", guard.dir().display());

        match self.setup(guard.dir(), session_id, dataset, kfold) {
            Ok(assignments) => {
                let dir = guard.commit();
                info!("training session is ready in '{}'", dir.display());
                Ok(SessionOutcome::Ready(Checkpoint { dir, assignments }))
            }
            Err(Error::Interrupted) => {
                let dir = guard.dir().to_owned();
                drop(guard);
                warn!("training interrupted, removed directory '{}'", dir.display());
                match self.policy {
                    InterruptPolicy::Absorb => Ok(SessionOutcome::Interrupted),
                    InterruptPolicy::Propagate => Err(Error::Interrupted),
                }
            }
            Err(err) => {
                let dir = guard.dir().to_owned();
                drop(guard);
                error!("training failed, removed directory '{}'", dir.display());
                Err(err)
            }
        }
    }

    fn setup(
        &self,
        dir: &Path,
        session_id: &str,
        dataset: &str,
        kfold: usize,
    ) -> Result<Vec<SplitAssignment>> {
        let hyper = self.config.hyper;
        let request = SplitRequest {
            output_dir: &self.config.output_dir,
            dataset,
            kfold,
            ratio: hyper.split_ratio,
            seed: hyper.split_seed,
            verbose: self.config.verbose,
        };
        let assignments = split::generate(dir, &request, &self.interrupted)?;

        // save parameters for the training loop
        let snapshot = SessionSnapshot {
            session_id,
            dataset,
            kfold,
            hyper,
        };
        let path = dir.join(CONFIG_SNAPSHOT_FILE);
        let text = serde_json::to_string_pretty(&snapshot)
            .map_err(io::Error::from)
            .at_path(&path)?;
        fs::write(&path, text).at_path(&path)?;

        if self.interrupted.load(Ordering::SeqCst) {
            return Err(Error::Interrupted);
        }

        Ok(assignments)
    }
}

/// Owns a freshly created checkpoint directory and removes it on drop
/// unless committed.
#[derive(Debug)]
struct CheckpointGuard {
    dir: PathBuf,
    committed: bool,
}

impl CheckpointGuard {
    fn create(dir: PathBuf) -> Result<Self> {
        if let Some(parent) = dir.parent() {
            utils::create_dir_all(parent)?;
        }
        // an existing directory belongs to another session
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::SessionExists { path: dir });
            }
            Err(err) => return Err(err).at_path(&dir),
        }
        Ok(Self {
            dir,
            committed: false,
        })
    }

    fn dir(&self) -> &Path {
        &self.dir
    }

    fn commit(mut self) -> PathBuf {
        self.committed = true;
        self.dir.clone()
    }
}

impl Drop for CheckpointGuard {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(err) = fs::remove_dir_all(&self.dir) {
            error!(
                "failed to remove checkpoint directory '{}': {}",
                self.dir.display(),
                err
            );
        }
    }
}
