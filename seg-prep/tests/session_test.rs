mod common;

use anyhow::Result;
use common::*;
use noisy_float::prelude::*;
use seg_prep::{
    pipeline, split, Error, HyperParams, ScriptedDecider, SessionOutcome, TrainConfig,
    TrainingSession,
};
use std::{collections::BTreeSet, fs};

fn train_config(ws: &Workspace) -> TrainConfig {
    TrainConfig {
        output_dir: ws.output_dir(),
        checkpoint_dir: ws.checkpoint_dir(),
        hyper: HyperParams {
            epochs: 10,
            batch_size: 2,
            learning_rate: r64(1e-4),
            split_ratio: r64(0.8),
            split_seed: 42,
        },
        verbose: false,
    }
}

/// Tiles two 100x100 images into 8 tiles.
fn prepared_workspace() -> Workspace {
    let ws = Workspace::new();
    let raw = ws.raw_dataset("ds");
    raw.add_pair("img_a", 100, 100);
    raw.add_pair("img_b", 100, 100);
    raw.write_stats(&["img_a.png", "img_b.png"]);

    let config = ws.prep_config(50, 50, 1);
    pipeline::run(&config, "ds", &mut ScriptedDecider::default()).unwrap();
    ws
}

fn session_dirs(ws: &Workspace) -> usize {
    match fs::read_dir(ws.checkpoint_dir()) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

#[test]
fn session_splits_tiled_dataset() -> Result<()> {
    let ws = prepared_workspace();
    let config = train_config(&ws);

    let checkpoint = match TrainingSession::new(&config).start("ds", 1)? {
        SessionOutcome::Ready(checkpoint) => checkpoint,
        SessionOutcome::Interrupted => panic!("session was not interrupted"),
    };
    assert!(checkpoint.dir.starts_with(ws.checkpoint_dir()));

    let train = split::read_index_file(&checkpoint.dir.join("train_00.txt"))?;
    let test = split::read_index_file(&checkpoint.dir.join("test_00.txt"))?;
    assert_eq!(train.len(), 6);
    assert_eq!(test.len(), 2);
    assert_eq!(train, checkpoint.assignments[0].train);

    let train_set: BTreeSet<_> = train.iter().copied().collect();
    let test_set: BTreeSet<_> = test.iter().copied().collect();
    assert!(train_set.is_disjoint(&test_set));
    let all: BTreeSet<_> = train_set.union(&test_set).copied().collect();
    assert_eq!(all, (1..=8).collect::<BTreeSet<_>>());

    Ok(())
}

#[test]
fn repeated_sessions_give_identical_splits() -> Result<()> {
    let ws = prepared_workspace();
    let config = train_config(&ws);
    let session = TrainingSession::new(&config);

    let first = session.start_with_id("first", "ds", 1)?;
    let second = session.start_with_id("second", "ds", 1)?;
    match (first, second) {
        (SessionOutcome::Ready(a), SessionOutcome::Ready(b)) => {
            assert_eq!(a.assignments, b.assignments);
            assert_eq!(
                fs::read(a.dir.join("test_00.txt"))?,
                fs::read(b.dir.join("test_00.txt"))?
            );
        }
        _ => panic!("sessions were not interrupted"),
    }

    Ok(())
}

#[test]
fn kfold_is_rejected_without_leftovers() {
    let ws = prepared_workspace();
    let config = train_config(&ws);

    let result = TrainingSession::new(&config).start_with_id("s1", "ds", 2);
    assert!(matches!(result, Err(Error::NotImplemented(_))));
    assert!(!ws.checkpoint_dir().join("s1").exists());
    assert_eq!(session_dirs(&ws), 0);
}

#[test]
fn zero_folds_is_invalid() {
    let ws = prepared_workspace();
    let config = train_config(&ws);

    let result = TrainingSession::new(&config).start_with_id("s1", "ds", 0);
    assert!(matches!(result, Err(Error::InvalidParameter(_))));
    assert_eq!(session_dirs(&ws), 0);
}

#[test]
fn incomplete_dataset_removes_checkpoint() {
    let ws = prepared_workspace();
    fs::remove_file(ws.output_dir().join("ds").join("stats.csv")).unwrap();
    let config = train_config(&ws);

    let result = TrainingSession::new(&config).start_with_id("s1", "ds", 1);
    assert!(matches!(result, Err(Error::DatasetIncomplete { .. })));
    assert!(!ws.checkpoint_dir().join("s1").exists());
}

#[test]
fn unknown_dataset_removes_checkpoint() {
    let ws = prepared_workspace();
    let config = train_config(&ws);

    let result = TrainingSession::new(&config).start("missing", 1);
    assert!(matches!(result, Err(Error::DatasetIncomplete { .. })));
    assert_eq!(session_dirs(&ws), 0);
}
