use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Command;

use chrono::Utc;
use churnmap_core::{ChurnmapConfig, CommitSource, FileSizeSource};
use churnmap_gitpulse::analysis::Analyzer;
use churnmap_gitpulse::mining::{mine_history, MiningOptions};
use churnmap_gitpulse::sizes::DiskSizes;
use churnmap_store::store::HistoryStore;
use git2::{IndexAddOption, Repository, Signature, Time};

const DAY: i64 = 86_400;

fn commit(repo: &Repository, author: &str, days_ago: i64, files: &[(&str, String)]) {
    let root = repo.workdir().unwrap().to_path_buf();
    for (path, content) in files {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let when = Time::new(Utc::now().timestamp() - days_ago * DAY, 0);
    let sig = Signature::new(author, &format!("{author}@example.com"), &when).unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, "change", &tree, &parents)
        .unwrap();
}

/// engine.rs: 4 commits by alice, 1000 bytes. io.rs: 3 commits by three
/// authors, 500 bytes. README.md is not code.
fn sample_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();

    commit(
        &repo,
        "alice",
        40,
        &[
            ("src/engine.rs", "fn v1() {}\n".into()),
            ("README.md", "# sample\n".into()),
        ],
    );
    commit(&repo, "alice", 30, &[("src/engine.rs", "fn v2() {}\n".into())]);
    commit(&repo, "alice", 20, &[("src/engine.rs", "fn v3() {}\n".into())]);
    commit(&repo, "alice", 10, &[("src/engine.rs", "x".repeat(1000))]);

    commit(&repo, "alice", 9, &[("src/util/io.rs", "fn a() {}\n".into())]);
    commit(&repo, "bob", 8, &[("src/util/io.rs", "fn b() {}\n".into())]);
    commit(&repo, "carol", 7, &[("src/util/io.rs", "y".repeat(500))]);

    commit(&repo, "GitHub", 5, &[("src/engine.rs", "z".repeat(1000))]);
    fs::write(dir.path().join("src/engine.rs"), "x".repeat(1000)).unwrap();

    dir
}

#[test]
fn mined_history_flows_through_store_into_report() {
    let dir = sample_repo();
    let rows = mine_history(dir.path(), &MiningOptions::default()).unwrap();
    assert_eq!(rows.len(), 8);

    let mut store = HistoryStore::in_memory().unwrap();
    store.replace_commits(&rows).unwrap();
    assert_eq!(store.rows().unwrap().len(), 8);

    let config = ChurnmapConfig::default();
    let sizes = DiskSizes::new(&config.sizes);
    let report = Analyzer::new(&config)
        .run(&store, &sizes, dir.path(), Utc::now())
        .unwrap();

    assert_eq!(report.hotspots.len(), 2);
    assert_eq!(report.hotspots[0].file, "src/engine.rs");
    assert_eq!(report.hotspots[0].score, 100.0);
    assert_eq!(report.hotspots[0].commits, 4);
    assert_eq!(report.hotspots[1].file, "src/util/io.rs");
    assert_eq!(report.hotspots[1].score, 37.5);

    assert!(report.bus_factor.is_single_owner("src/engine.rs"));
    assert_eq!(report.bus_factor.authors["src/util/io.rs"].len(), 3);

    assert_eq!(report.directories.totals["src"], 4);
    assert_eq!(report.directories.totals["src/util"], 3);

    report.persist(&mut store).unwrap();
    assert_eq!(store.load_hotspots().unwrap(), report.hotspots);
}

#[test]
fn disk_sizes_match_working_tree() {
    let dir = sample_repo();
    let sizes = DiskSizes::new(&ChurnmapConfig::default().sizes)
        .sizes(dir.path())
        .unwrap();
    let expected: HashMap<String, u64> = HashMap::from([
        ("src/engine.rs".to_string(), 1000),
        ("src/util/io.rs".to_string(), 500),
    ]);
    assert_eq!(sizes, expected);
}

fn run_churnmap(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_churnmap"))
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap()
}

#[test]
fn analyze_mines_on_first_run_and_prints_json() {
    let dir = sample_repo();
    let output = run_churnmap(dir.path(), &["analyze", "--format", "json"]);
    assert!(
        output.status.success(),
        "churnmap analyze failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["hotspots"][0]["file"], "src/engine.rs");
    assert_eq!(json["hotspots"][0]["score"], 100.0);
    assert_eq!(
        json["busFactor"]["authors"]["src/engine.rs"],
        serde_json::json!(["alice"])
    );
    assert_eq!(json["directories"]["totals"]["src/util"], 3);

    assert!(dir.path().join(".churnmap/history.db").exists());
    let store = HistoryStore::open(&dir.path().join(".churnmap/history.db")).unwrap();
    assert_eq!(store.commit_count().unwrap(), 8);
    assert_eq!(store.load_hotspots().unwrap().len(), 2);
}

#[test]
fn bus_factor_text_output_marks_single_owner() {
    let dir = sample_repo();
    let output = run_churnmap(dir.path(), &["analyze", "--analysis", "bus-factor"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Bus Factor (last 365 days)"));
    let engine_line = stdout
        .lines()
        .find(|l| l.contains("src/engine.rs"))
        .unwrap();
    assert!(engine_line.contains("[single owner]"));
    assert!(!stdout.contains("Hotspots"));
}

#[test]
fn analyze_with_oversized_since_keeps_full_history() {
    let dir = sample_repo();
    let output = run_churnmap(
        dir.path(),
        &["analyze", "--format", "json", "--since", "18446744073709551615"],
    );
    assert!(
        output.status.success(),
        "churnmap analyze failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["hotspots"][0]["file"], "src/engine.rs");
    assert_eq!(json["hotspots"][0]["commits"], 4);
}

#[test]
fn mine_reports_stored_rows() {
    let dir = sample_repo();
    let output = run_churnmap(dir.path(), &["mine", "--format", "json"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["commitRows"], 8);
    assert_eq!(json["distinctCommits"], 7);
    assert_eq!(json["distinctFiles"], 3);
}

#[test]
fn analyze_outside_git_repo_fails_with_hint() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_churnmap(dir.path(), &["analyze"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not a git repository"));
}
