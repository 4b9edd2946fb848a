//! The bundled scenario files load and play deterministically.

use std::path::PathBuf;

use frontier_core::replay::{Replay, ReplayPlayer};
use frontier_headless::batch::verify_determinism;
use frontier_headless::runner::{HeadlessConfig, HeadlessRunner};
use frontier_headless::scenario::Scenario;

fn scenario_files() -> Vec<PathBuf> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios");
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();
    files
}

#[test]
fn bundled_scenarios_parse() {
    let files = scenario_files();
    assert!(!files.is_empty());
    for path in files {
        let scenario = Scenario::load(&path).unwrap();
        scenario.start_info().unwrap();
        assert!(!scenario.scripted_turns().unwrap().is_empty(), "{}", path.display());
    }
}

#[test]
fn strait_replicas_agree() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios/strait.ron");
    let mut scenario = Scenario::load(path).unwrap();
    scenario.ticks = 120;
    let report = verify_determinism(&scenario, "strait", 3).unwrap();
    assert_eq!(report.ticks, 120);
    assert_eq!(report.hashes_compared, 12);
}

#[test]
fn recorded_strait_replays_identically() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios/strait.ron");
    let scenario = Scenario::load(path).unwrap();
    let mut runner = HeadlessRunner::from_scenario(&scenario, HeadlessConfig::default()).unwrap();
    runner
        .play_script(&scenario.scripted_turns().unwrap(), 100)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("strait.replay");
    runner.finished_replay().unwrap().save(&file).unwrap();

    let replay = Replay::load(&file).unwrap();
    assert_eq!(replay.turn_count(), 2);
    let mut player = ReplayPlayer::new(replay).unwrap();
    player.verify().unwrap();
    assert_eq!(
        player.game().state_hash().unwrap(),
        runner.game().state_hash().unwrap()
    );
}
