//! CLI argument parsing and macro-file round trips.

use std::process::Command as Process;

fn dojo_bin() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_dojo"))
}

#[test]
fn macro_check_reports_tick_count() {
    let bin = dojo_bin();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("combo.txt");
    std::fs::write(&file, "2 3 6A x2 5{2: 5 5A}").unwrap();

    let out = Process::new(&bin)
        .args(["macro", "check"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(out.status.success(), "{:?}", out);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("5 ticks"), "{stdout}");
}

#[test]
fn macro_check_rejects_malformed_files() {
    let bin = dojo_bin();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("bad.txt");
    std::fs::write(&file, "6A {3: 6 6A}").unwrap();

    let out = Process::new(&bin)
        .args(["macro", "check"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(!out.status.success());
}

#[test]
fn macro_mirror_round_trips_to_identity() {
    let bin = dojo_bin();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("combo.txt");
    let original = "2 3 6A{2: 6 6A} 5x3";
    std::fs::write(&file, original).unwrap();

    // Mirror twice in place: must reproduce the original text.
    for _ in 0..2 {
        let out = Process::new(&bin)
            .args(["macro", "mirror"])
            .arg(&file)
            .output()
            .unwrap();
        assert!(out.status.success(), "{:?}", out);
    }
    let text = std::fs::read_to_string(&file).unwrap();
    assert_eq!(text, original);
}

#[test]
fn macro_mirror_swaps_directions() {
    let bin = dojo_bin();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("combo.txt");
    let out_file = dir.path().join("mirrored.txt");
    std::fs::write(&file, "6 4 8 2A").unwrap();

    let out = Process::new(&bin)
        .args(["macro", "mirror"])
        .arg(&file)
        .arg("-o")
        .arg(&out_file)
        .output()
        .unwrap();
    assert!(out.status.success(), "{:?}", out);
    assert_eq!(std::fs::read_to_string(&out_file).unwrap(), "4 6 8 2A");
}
