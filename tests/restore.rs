//! End-to-end restore scenarios through the interpreter.

use std::fs;

use pagerestore::catalog::FilesMetadataDto;
use pagerestore::{ArchiveEntry, FileSelection, RestoreOptions, UnwrapMode, UnwrapResult};
use tempfile::TempDir;

mod common;
use common::{PAGE_SIZE, catalog_with_increments, encode_increment, interpreter, page};

const RELATION: &str = "base/1/data/1234";
const RELATION_SIZE: usize = 3 * PAGE_SIZE;

fn relation_increment() -> Vec<u8> {
    encode_increment(
        RELATION_SIZE as u64,
        &[(0, page(b'X', PAGE_SIZE)), (2, page(b'Z', PAGE_SIZE))],
    )
}

// =============================================================================
// Increment scenarios
// =============================================================================

#[test]
fn test_increment_creates_missing_file() {
    let dir = TempDir::new().unwrap();
    let interp = interpreter(
        dir.path(),
        catalog_with_increments(&[RELATION]),
        RestoreOptions::new(),
    );

    interp
        .interpret(&ArchiveEntry::file(RELATION, relation_increment()))
        .unwrap();

    let data = fs::read(dir.path().join(RELATION)).unwrap();
    assert_eq!(data.len(), RELATION_SIZE);
    assert!(data[..PAGE_SIZE].iter().all(|&b| b == b'X'));
    assert!(data[PAGE_SIZE..2 * PAGE_SIZE].iter().all(|&b| b == 0));
    assert!(data[2 * PAGE_SIZE..].iter().all(|&b| b == b'Z'));

    let summary = interp.into_summary();
    assert_eq!(
        summary.outcome(RELATION),
        UnwrapResult::CreatedFromIncrement { blocks: 2 }
    );
    assert!(summary.completed_files.is_empty());
    assert!(summary.written_increment_files.is_empty());
}

#[test]
fn test_increment_merges_into_existing_file() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join(RELATION);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, vec![b'A'; RELATION_SIZE]).unwrap();

    let interp = interpreter(
        dir.path(),
        catalog_with_increments(&[RELATION]),
        RestoreOptions::new(),
    );
    interp
        .interpret(&ArchiveEntry::file(RELATION, relation_increment()))
        .unwrap();

    let data = fs::read(&target).unwrap();
    assert_eq!(data.len(), RELATION_SIZE);
    assert!(data[..PAGE_SIZE].iter().all(|&b| b == b'X'));
    assert!(data[PAGE_SIZE..2 * PAGE_SIZE].iter().all(|&b| b == b'A'));
    assert!(data[2 * PAGE_SIZE..].iter().all(|&b| b == b'Z'));

    assert_eq!(
        interp.into_summary().outcome(RELATION),
        UnwrapResult::WroteIncrementBlocks { blocks: 2 }
    );
}

#[test]
fn test_catchup_merge_resizes_existing_file() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join(RELATION);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, vec![b'A'; 5 * PAGE_SIZE]).unwrap();

    let interp = interpreter(
        dir.path(),
        catalog_with_increments(&[RELATION]),
        RestoreOptions::new().mode(UnwrapMode::Catchup),
    );
    interp
        .interpret(&ArchiveEntry::file(RELATION, relation_increment()))
        .unwrap();

    let data = fs::read(&target).unwrap();
    assert_eq!(data.len(), RELATION_SIZE);
    assert!(data[PAGE_SIZE..2 * PAGE_SIZE].iter().all(|&b| b == b'A'));
    assert_eq!(
        interp.into_summary().outcome(RELATION),
        UnwrapResult::WroteIncrementBlocks { blocks: 2 }
    );
}

#[test]
fn test_catchup_creates_dense_file() {
    let dir = TempDir::new().unwrap();
    let interp = interpreter(
        dir.path(),
        catalog_with_increments(&[RELATION]),
        RestoreOptions::new().mode(UnwrapMode::Catchup),
    );
    interp
        .interpret(&ArchiveEntry::file(RELATION, relation_increment()))
        .unwrap();

    let data = fs::read(dir.path().join(RELATION)).unwrap();
    assert_eq!(data.len(), RELATION_SIZE);
    assert!(data[PAGE_SIZE..2 * PAGE_SIZE].iter().all(|&b| b == 0));
    assert_eq!(
        interp.into_summary().outcome(RELATION),
        UnwrapResult::CreatedFromIncrement { blocks: 2 }
    );
}

// =============================================================================
// Full copies
// =============================================================================

#[test]
fn test_full_copy_round_trip() {
    let dir = TempDir::new().unwrap();
    let interp = interpreter(dir.path(), FilesMetadataDto::default(), RestoreOptions::new());

    let files: Vec<(String, Vec<u8>)> = (0..10)
        .map(|i| (format!("base/1/{}", 2000 + i), vec![i as u8; 100 * i + 1]))
        .collect();
    for (name, data) in &files {
        interp
            .interpret(&ArchiveEntry::file(name.as_str(), data.clone()))
            .unwrap();
    }

    for (name, data) in &files {
        assert_eq!(&fs::read(dir.path().join(name)).unwrap(), data);
    }
    let summary = interp.into_summary();
    let expected: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(summary.completed_files, expected);
}

#[test]
fn test_full_copy_replaces_longer_existing_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("postgresql.conf"), vec![b'#'; 4096]).unwrap();

    let interp = interpreter(dir.path(), FilesMetadataDto::default(), RestoreOptions::new());
    interp
        .interpret(&ArchiveEntry::file("postgresql.conf", b"port = 5432\n".to_vec()))
        .unwrap();

    assert_eq!(
        fs::read(dir.path().join("postgresql.conf")).unwrap(),
        b"port = 5432\n"
    );
}

#[test]
fn test_empty_file() {
    let dir = TempDir::new().unwrap();
    let interp = interpreter(dir.path(), FilesMetadataDto::default(), RestoreOptions::new());
    interp
        .interpret(&ArchiveEntry::file("base/1/pg_filenode.map", Vec::new()))
        .unwrap();
    assert_eq!(
        fs::metadata(dir.path().join("base/1/pg_filenode.map"))
            .unwrap()
            .len(),
        0
    );
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_rerun_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let entries = vec![
        ArchiveEntry::directory("base", 0o700),
        ArchiveEntry::directory("base/1", 0o700),
        ArchiveEntry::file("base/1/PG_VERSION", b"15\n".to_vec()),
        ArchiveEntry::file(RELATION, relation_increment()),
    ];

    let snapshot = |dir: &TempDir| {
        (
            fs::read(dir.path().join("base/1/PG_VERSION")).unwrap(),
            fs::read(dir.path().join(RELATION)).unwrap(),
        )
    };

    let first = {
        let interp = interpreter(
            dir.path(),
            catalog_with_increments(&[RELATION]),
            RestoreOptions::new(),
        );
        for entry in &entries {
            interp.interpret(entry).unwrap();
        }
        snapshot(&dir)
    };

    let interp = interpreter(
        dir.path(),
        catalog_with_increments(&[RELATION]),
        RestoreOptions::new(),
    );
    for entry in &entries {
        interp.interpret(entry).unwrap();
    }
    assert_eq!(snapshot(&dir), first);

    // Second run merges into the file the first run created
    assert_eq!(
        interp.into_summary().outcome(RELATION),
        UnwrapResult::WroteIncrementBlocks { blocks: 2 }
    );
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn test_selection_restricts_files_only() {
    let dir = TempDir::new().unwrap();
    let options =
        RestoreOptions::new().selection(FileSelection::from_names(["base/1/PG_VERSION"]));
    let interp = interpreter(dir.path(), FilesMetadataDto::default(), options);

    interp
        .interpret(&ArchiveEntry::directory("global", 0o700))
        .unwrap();
    interp
        .interpret(&ArchiveEntry::file("global/pg_control", b"ctl".to_vec()))
        .unwrap();
    interp
        .interpret(&ArchiveEntry::file("base/1/PG_VERSION", b"15\n".to_vec()))
        .unwrap();

    assert!(dir.path().join("global").is_dir());
    assert!(!dir.path().join("global/pg_control").exists());
    assert!(dir.path().join("base/1/PG_VERSION").is_file());

    let summary = interp.into_summary();
    assert_eq!(summary.outcome("global/pg_control"), UnwrapResult::Skipped);
    assert_eq!(summary.file_count(), 1);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_failure_keeps_earlier_outcomes() {
    let dir = TempDir::new().unwrap();
    let interp = interpreter(
        dir.path(),
        catalog_with_increments(&["base/1/2"]),
        RestoreOptions::new(),
    );

    interp
        .interpret(&ArchiveEntry::file("base/1/1", b"ok".to_vec()))
        .unwrap();
    let err = interp
        .interpret(&ArchiveEntry::file("base/1/2", b"not an increment".to_vec()))
        .unwrap_err();
    assert!(err.is_corruption());

    let summary = interp.into_summary();
    assert_eq!(summary.completed_files, vec!["base/1/1"]);
    assert_eq!(summary.outcome("base/1/2"), UnwrapResult::Skipped);
}

// =============================================================================
// Archived names with a `./` prefix
// =============================================================================

#[test]
fn test_dot_prefixed_increment_uses_catalog_entry() {
    let dir = TempDir::new().unwrap();
    let interp = interpreter(
        dir.path(),
        catalog_with_increments(&["./base/1/1234"]),
        RestoreOptions::new(),
    );

    let payload = encode_increment(2 * PAGE_SIZE as u64, &[(0, page(b'X', PAGE_SIZE))]);
    interp
        .interpret(&ArchiveEntry::file("./base/1/1234", payload))
        .unwrap();

    let data = fs::read(dir.path().join("base/1/1234")).unwrap();
    assert_eq!(data.len(), 2 * PAGE_SIZE);
    assert!(data[..PAGE_SIZE].iter().all(|&b| b == b'X'));
    assert!(data[PAGE_SIZE..].iter().all(|&b| b == 0));
    assert_eq!(
        interp.into_summary().outcome("base/1/1234"),
        UnwrapResult::CreatedFromIncrement { blocks: 1 }
    );
}

#[test]
fn test_dot_prefixed_selection() {
    let dir = TempDir::new().unwrap();
    let options = RestoreOptions::new().selection(FileSelection::from_names(["./PG_VERSION"]));
    let interp = interpreter(dir.path(), FilesMetadataDto::default(), options);

    interp
        .interpret(&ArchiveEntry::file("./PG_VERSION", b"16\n".to_vec()))
        .unwrap();
    interp
        .interpret(&ArchiveEntry::file("./postgresql.conf", b"port = 5432\n".to_vec()))
        .unwrap();

    assert_eq!(fs::read(dir.path().join("PG_VERSION")).unwrap(), b"16\n");
    assert!(!dir.path().join("postgresql.conf").exists());
}

#[test]
fn test_normalized_catalog_name_still_matches() {
    let dir = TempDir::new().unwrap();
    let interp = interpreter(
        dir.path(),
        catalog_with_increments(&["base/1/1234"]),
        RestoreOptions::new(),
    );

    let payload = encode_increment(PAGE_SIZE as u64, &[(0, page(b'Y', PAGE_SIZE))]);
    interp
        .interpret(&ArchiveEntry::file("./base/1/1234", payload))
        .unwrap();

    assert_eq!(
        interp.into_summary().outcome("base/1/1234"),
        UnwrapResult::CreatedFromIncrement { blocks: 1 }
    );
}

#[test]
fn test_fork_file_is_rebuilt_not_merged() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("base/1/1234_vm");
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, vec![b'A'; 2 * PAGE_SIZE]).unwrap();

    let interp = interpreter(
        dir.path(),
        catalog_with_increments(&["base/1/1234_vm"]),
        RestoreOptions::new(),
    );
    let payload = encode_increment(2 * PAGE_SIZE as u64, &[(1, page(b'V', PAGE_SIZE))]);
    interp
        .interpret(&ArchiveEntry::file("base/1/1234_vm", payload))
        .unwrap();

    let data = fs::read(&target).unwrap();
    assert_eq!(data.len(), 2 * PAGE_SIZE);
    assert!(data[..PAGE_SIZE].iter().all(|&b| b == 0));
    assert!(data[PAGE_SIZE..].iter().all(|&b| b == b'V'));
    assert_eq!(
        interp.into_summary().outcome("base/1/1234_vm"),
        UnwrapResult::CreatedFromIncrement { blocks: 1 }
    );
}
