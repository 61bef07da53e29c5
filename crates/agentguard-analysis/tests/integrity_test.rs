//! Integrity checker tests: snapshots, tamper detection, deletion, and
//! baseline initialization.

use std::path::PathBuf;
use std::sync::Arc;

use agentguard_analysis::integrity::IntegrityChecker;
use agentguard_core::config::IntegrityConfig;
use agentguard_core::traits::storage::IntegrityStore;
use agentguard_core::types::integrity::ViolationKind;
use agentguard_core::types::severity::Severity;
use agentguard_storage::GuardStorageEngine;
use tempfile::TempDir;

fn temp_checker(
    workspace_base: PathBuf,
    protected: Vec<PathBuf>,
) -> (TempDir, Arc<GuardStorageEngine>, IntegrityChecker) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(GuardStorageEngine::open(&dir.path().join("guard.db")).unwrap());
    let config = IntegrityConfig {
        workspace_base,
        protected_paths: protected,
    };
    let checker = IntegrityChecker::new(store.clone(), &config);
    (dir, store, checker)
}

#[test]
fn unchanged_file_verifies_clean() {
    let files = TempDir::new().unwrap();
    let target = files.path().join("notes.md");
    std::fs::write(&target, "original contents").unwrap();

    let (_dir, _store, checker) = temp_checker(files.path().to_path_buf(), vec![]);
    assert!(checker.snapshot(&target, Some("a1")));
    assert!(checker.verify_file(&target).is_none());
}

#[test]
fn tampered_file_reports_modification_then_deletion() {
    let files = TempDir::new().unwrap();
    let target = files.path().join("SOUL.md");
    std::fs::write(&target, "I am a helpful agent").unwrap();

    let (_dir, _store, checker) = temp_checker(files.path().to_path_buf(), vec![]);
    assert!(checker.snapshot(&target, Some("a1")));
    let expected_hash = checker.compute_hash(&target);

    std::fs::write(&target, "I am a compromised agent").unwrap();
    let violation = checker.verify_file(&target).expect("modification violation");
    assert_eq!(violation.kind, ViolationKind::FileModified);
    assert_eq!(violation.severity, Severity::High);
    assert_eq!(violation.expected_hash, expected_hash);
    assert_eq!(violation.actual_hash, checker.compute_hash(&target));
    assert_ne!(violation.expected_hash, violation.actual_hash);
    assert_eq!(violation.agent_id.as_deref(), Some("a1"));

    // Re-snapshot accepts the new contents.
    assert!(checker.snapshot(&target, Some("a1")));
    assert!(checker.verify_file(&target).is_none());

    // Deleting the file is the second violation kind.
    std::fs::remove_file(&target).unwrap();
    let violation = checker.verify_file(&target).expect("deletion violation");
    assert_eq!(violation.kind, ViolationKind::FileDeleted);
    assert_eq!(violation.severity, Severity::High);
    assert!(violation.actual_hash.is_empty());
}

#[test]
fn first_sighting_creates_a_baseline() {
    let files = TempDir::new().unwrap();
    let target = files.path().join("new.md");
    std::fs::write(&target, "fresh").unwrap();

    let (_dir, store, checker) = temp_checker(files.path().to_path_buf(), vec![]);
    assert!(checker.verify_file(&target).is_none());

    let stored = store
        .get_snapshot(&target.to_string_lossy())
        .unwrap()
        .expect("baseline auto-created");
    assert_eq!(stored.file_hash, checker.compute_hash(&target));
}

#[test]
fn missing_file_with_no_baseline_is_clean() {
    let files = TempDir::new().unwrap();
    let (_dir, _store, checker) = temp_checker(files.path().to_path_buf(), vec![]);
    assert!(checker.verify_file(&files.path().join("never.md")).is_none());
}

#[test]
fn agent_verify_covers_critical_files() {
    let workspace = TempDir::new().unwrap();
    let agent_dir = workspace.path().join("a1");
    std::fs::create_dir_all(&agent_dir).unwrap();
    std::fs::write(agent_dir.join("SOUL.md"), "soul").unwrap();
    std::fs::write(agent_dir.join("IDENTITY.md"), "identity").unwrap();
    std::fs::write(agent_dir.join(".env"), "KEY=value").unwrap();

    let (_dir, _store, checker) = temp_checker(workspace.path().to_path_buf(), vec![]);
    let stats = checker.initialize_baseline(&["a1".to_string()]);
    assert_eq!(stats.created, 3);
    assert_eq!(stats.failed, 0);

    assert!(checker.verify("a1").is_empty());

    std::fs::write(agent_dir.join("IDENTITY.md"), "overwritten identity").unwrap();
    let violations = checker.verify("a1");
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::FileModified);
    assert!(violations[0].file_path.ends_with("IDENTITY.md"));
    assert_eq!(violations[0].agent_id.as_deref(), Some("a1"));

    // Unknown agent directories verify empty.
    assert!(checker.verify("missing-agent").is_empty());
}

#[test]
fn baseline_init_includes_global_protected_paths() {
    let workspace = TempDir::new().unwrap();
    let global = TempDir::new().unwrap();
    let config_file = global.path().join("config.yaml");
    std::fs::write(&config_file, "monitoring: {}").unwrap();
    let absent = global.path().join("absent.yaml");

    let (_dir, store, checker) = temp_checker(
        workspace.path().to_path_buf(),
        vec![config_file.clone(), absent],
    );
    let stats = checker.initialize_baseline(&[]);
    assert_eq!(stats.created, 1, "only the existing protected file counts");

    assert!(store
        .get_snapshot(&config_file.to_string_lossy())
        .unwrap()
        .is_some());
}

#[test]
fn hash_verification_reports_actual_hash() {
    let files = TempDir::new().unwrap();
    let target = files.path().join("check.md");
    std::fs::write(&target, "payload").unwrap();

    let (_dir, _store, checker) = temp_checker(files.path().to_path_buf(), vec![]);
    let expected = checker.compute_hash(&target);

    let (ok, actual) = checker.hash_verification(&target, &expected);
    assert!(ok);
    assert_eq!(actual, expected);

    let (ok, actual) = checker.hash_verification(&target, "deadbeef");
    assert!(!ok);
    assert_eq!(actual, expected);

    let (ok, message) = checker.hash_verification(&files.path().join("gone.md"), &expected);
    assert!(!ok);
    assert_eq!(message, "File not found");
}

#[test]
fn hash_of_unreadable_file_is_empty() {
    let files = TempDir::new().unwrap();
    let (_dir, _store, checker) = temp_checker(files.path().to_path_buf(), vec![]);
    assert!(checker.compute_hash(&files.path().join("nope.bin")).is_empty());
}
