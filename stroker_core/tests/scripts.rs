use std::fs;
use std::path::Path;

use rstest::rstest;
use stroker_core::matching::{candidate_path, load_for_media, match_scripts};
use stroker_core::{AxisId, ScriptError, load_script};
use tempfile::tempdir;

const STROKE: &str = r#"{"version":"1.0","actions":[{"at":0,"pos":0},{"at":500,"pos":100},{"at":1000,"pos":0}]}"#;
const TWIST: &str = r#"[{"at":0,"pos":25},{"at":1000,"pos":75}]"#;

fn write(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).expect("write script");
}

#[test]
fn scenario_interpolates_at_250ms() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "scene.funscript", STROKE);
    let set = load_script(&dir.path().join("scene.funscript"), AxisId::Stroke).expect("load");
    let track = set.get(AxisId::Stroke).expect("stroke track");
    assert!((track.value_at(250) - 50.0).abs() < 1e-9);
}

#[test]
fn match_finds_only_existing_companions() {
    let dir = tempdir().expect("tempdir");
    let media = dir.path().join("scene.mp4");
    write(dir.path(), "scene.funscript", STROKE);
    write(dir.path(), "scene.roll.funscript", TWIST);

    let matched = match_scripts(&media);
    assert_eq!(matched.get(AxisId::Stroke), Some(candidate_path(&media, AxisId::Stroke).as_path()));
    assert_eq!(matched.get(AxisId::Twist), None);
    assert!(matched.get(AxisId::Roll).is_some());
    assert_eq!(matched.iter().count(), 2);
}

#[test]
fn nothing_matches_in_an_empty_directory() {
    let dir = tempdir().expect("tempdir");
    assert!(match_scripts(&dir.path().join("clip.mkv")).is_empty());
}

#[test]
fn load_for_media_reports_failures_per_axis() {
    let dir = tempdir().expect("tempdir");
    let media = dir.path().join("scene.mp4");
    write(dir.path(), "scene.funscript", STROKE);
    write(dir.path(), "scene.twist.funscript", "{ not json");
    write(dir.path(), "scene.pitch.funscript", "[]");

    let report = load_for_media(&media);
    assert_eq!(report.scripts.axes().collect::<Vec<_>>(), [AxisId::Stroke]);
    let failed: Vec<AxisId> = report.failures.iter().map(|(a, _)| *a).collect();
    assert_eq!(failed, [AxisId::Twist, AxisId::Pitch]);
    assert!(matches!(&report.failures[0].1, ScriptError::InFile { .. }));
}

#[test]
fn dedicated_files_override_container_axes() {
    let dir = tempdir().expect("tempdir");
    let media = dir.path().join("scene.mp4");
    write(
        dir.path(),
        "scene.funscript",
        r#"{"actions":[{"at":0,"pos":10}],
            "axes":[{"id":"R0","actions":[{"at":0,"pos":90}]},
                    {"id":"R1","actions":[{"at":0,"pos":80}]}]}"#,
    );
    write(dir.path(), "scene.twist.funscript", TWIST);

    let report = load_for_media(&media);
    assert!(report.failures.is_empty());
    let twist = report.scripts.get(AxisId::Twist).expect("twist");
    assert!((twist.value_at(0) - 25.0).abs() < 1e-9);
    let roll = report.scripts.get(AxisId::Roll).expect("roll from container");
    assert!((roll.value_at(0) - 80.0).abs() < 1e-9);
}

#[rstest]
#[case::missing(None)]
#[case::directory(Some("dir"))]
fn unreadable_paths_are_io_errors(#[case] kind: Option<&str>) {
    let dir = tempdir().expect("tempdir");
    let path = match kind {
        Some(name) => {
            let p = dir.path().join(name);
            fs::create_dir(&p).expect("mkdir");
            p
        }
        None => dir.path().join("absent.funscript"),
    };
    let err = load_script(&path, AxisId::Stroke).expect_err("should fail");
    assert!(matches!(err, ScriptError::Io { .. }));
}

#[test]
fn invalid_utf8_is_replaced_not_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("latin1.funscript");
    let mut bytes = br#"{"title":"caf"#.to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(br#"","actions":[{"at":0,"pos":40}]}"#);
    fs::write(&path, bytes).expect("write");
    let set = load_script(&path, AxisId::Stroke).expect("lossy parse");
    assert!(set.get(AxisId::Stroke).is_some());
}
