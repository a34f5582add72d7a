use std::fs::File;
use std::path::PathBuf;
use tempfile::tempdir;
use vidbatch_core::settings::{
    Quality, ScaleTarget, Snapshot, SplitMode, SplitSpec, TrimRange, VideoCodec,
};
use vidbatch_core::{compile, CompiledCommand, MediaContext};

fn fixture() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let dir = tempdir().unwrap();
    let source = dir.path().join("clip.mp4");
    File::create(&source).unwrap();
    let dest = dir.path().join("out.mp4");
    (dir, source, dest)
}

fn ctx() -> MediaContext {
    MediaContext {
        duration: Some(120.0),
        resolution: Some((1920, 1080)),
    }
}

#[test]
fn snapshot_survives_json_round_trip() {
    let snapshot = Snapshot {
        speed: 1.5,
        volume: 0.8,
        trim: Some(TrimRange {
            start: Some(10.0),
            end: Some(50.0),
        }),
        scale: Some(ScaleTarget {
            width: 1280,
            height: 720,
        }),
        codec: VideoCodec::Hevc,
        quality: Quality::Bitrate("5M".to_string()),
        split: Some(SplitSpec {
            mode: SplitMode::ByDuration(30.0),
            process_parts: true,
        }),
        ..Default::default()
    };

    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: Snapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, snapshot);
}

#[test]
fn partial_settings_json_fills_defaults() {
    let snapshot: Snapshot = serde_json::from_str(r#"{"speed": 2.0}"#).unwrap();
    assert_eq!(snapshot.speed, 2.0);
    assert_eq!(snapshot.volume, 1.0);
    assert_eq!(snapshot.codec, VideoCodec::H264);
    assert!(snapshot.split.is_none());
}

#[test]
fn same_snapshot_compiles_to_identical_commands() {
    let (_dir, source, dest) = fixture();
    let snapshot = Snapshot {
        speed: 0.5,
        trim: Some(TrimRange {
            start: Some(5.0),
            end: None,
        }),
        ..Default::default()
    };
    let first = compile(&snapshot, &source, &dest, &ctx(), None).unwrap();
    let second = compile(&snapshot, &source, &dest, &ctx(), None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn split_plan_covers_whole_source_in_order() {
    let (_dir, source, dest) = fixture();
    let snapshot = Snapshot {
        split: Some(SplitSpec {
            mode: SplitMode::ByDuration(50.0),
            process_parts: true,
        }),
        ..Default::default()
    };
    let plan = match compile(&snapshot, &source, &dest, &ctx(), None).unwrap() {
        CompiledCommand::Split(plan) => plan,
        CompiledCommand::Single(_) => panic!("expected a split plan"),
    };

    // 120s at 50s per part: 50 + 50 + 20
    assert_eq!(plan.parts.len(), 3);
    let mut expected_start = 0.0;
    for part in &plan.parts {
        assert!((part.range.start - expected_start).abs() < 1e-9);
        expected_start += part.range.length;
        // every part carries its re-encode step
        assert!(part.encode.is_some());
    }
    assert!((expected_start - 120.0).abs() < 1e-9);
    assert_eq!(plan.cleanup.len(), 3);
}

#[test]
fn invalid_snapshot_is_rejected_before_compilation() {
    let (_dir, source, dest) = fixture();
    let snapshot = Snapshot {
        volume: 9.0,
        ..Default::default()
    };
    assert!(compile(&snapshot, &source, &dest, &ctx(), None).is_err());
}
