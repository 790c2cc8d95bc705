//! Tile and split preparation for microscopy segmentation datasets.
//!
//! The [pipeline] crops raw `(input, label)` image pairs into square tiles
//! and records where every tile came from. The [session] module prepares a
//! checkpoint directory with reproducible train/test splits over those tiles.

mod common;
pub mod config;
pub mod decision;
pub mod error;
pub mod mapping;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod session;
pub mod split;
pub mod tiler;
pub mod utils;

pub use config::{Config, HyperParams, PrepConfig, TrainConfig};
pub use decision::{Decider, FixedDecider, ScriptedDecider, StdinDecider};
pub use error::{Error, Result};
pub use pipeline::{DatasetOutcome, DatasetReport};
pub use session::{Checkpoint, InterruptPolicy, SessionOutcome, TrainingSession};
