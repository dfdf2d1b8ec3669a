//! Checkpoint Store Integration Tests
//!
//! Verifies that checkpoints written by one store instance are readable by
//! another (the file format survives process restarts) and that each
//! `(platform, scenario)` pair owns exactly one file.

use skill_refine::models::{PlatformId, Scenario};
use skill_refine::services::{CheckpointStore, ForkPlan};

#[test]
fn checkpoint_survives_store_recreation() {
    let temp = tempfile::tempdir().unwrap();
    let scenario = Scenario::new(PlatformId::Splunk, "sre");

    {
        let store = CheckpointStore::new(temp.path());
        store.record(&scenario, 4).unwrap();
    }

    // A fresh store over the same directory sees the same checkpoint
    let store = CheckpointStore::new(temp.path());
    let checkpoint = store.load(&scenario).unwrap();
    assert_eq!(checkpoint.last_passed_step, 4);
    assert_eq!(checkpoint.platform, "splunk");
    assert_eq!(checkpoint.scenario, "sre");
}

#[test]
fn one_file_per_platform_scenario_pair() {
    let temp = tempfile::tempdir().unwrap();
    let store = CheckpointStore::new(temp.path());

    let pairs = [
        Scenario::new(PlatformId::Confluence, "page"),
        Scenario::new(PlatformId::Jira, "issue"),
        Scenario::new(PlatformId::Jira, "sprint"),
    ];

    for (step, scenario) in pairs.iter().enumerate() {
        store.record(scenario, step as u32).unwrap();
        // Overwrite once more; the file count must not grow
        store.record(scenario, step as u32 + 1).unwrap();
    }

    let files = std::fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(files, pairs.len());

    for (step, scenario) in pairs.iter().enumerate() {
        let checkpoint = store.load(scenario).unwrap();
        assert_eq!(checkpoint.last_passed_step, step as u32 + 1);
    }
}

#[test]
fn fork_point_arithmetic() {
    assert_eq!(CheckpointStore::fork_point(None), ForkPlan::default());
    assert_eq!(
        CheckpointStore::fork_point(Some(0)),
        ForkPlan {
            fork_from: None,
            prompt_index: Some(0)
        }
    );
    for k in 1..5u32 {
        assert_eq!(
            CheckpointStore::fork_point(Some(k)),
            ForkPlan {
                fork_from: Some(k - 1),
                prompt_index: Some(k)
            }
        );
    }
}
