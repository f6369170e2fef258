use std::path::Path;

use elfdelta::diff::SortKey;
use elfdelta::{
    classify_records, diff_records, scan_directory, ClassifiedRecord, DiffConfig, DiffStatus,
    FileSelection, GroupConfig, Profile, ScanConfig,
};

use crate::common::*;

fn snapshot(root: &Path, config: &GroupConfig) -> Vec<ClassifiedRecord> {
    let report = scan_directory(root, &ScanConfig::default()).unwrap();
    classify_records(report.records, config)
}

fn unlimited(selection: FileSelection) -> DiffConfig {
    DiffConfig {
        selection,
        sort: SortKey::Name,
        top_n_groups: 0,
        top_n_files: 0,
    }
}

#[test]
fn test_text_growth_scenario() {
    let old = tempfile::tempdir().unwrap();
    let new = tempfile::tempdir().unwrap();
    write_file(old.path(), "usr/bin/app", &sample_exec(ElfBuilder::new64(), 1000));
    write_file(new.path(), "usr/bin/app", &sample_exec(ElfBuilder::new64(), 1021));

    let config = Profile::SysV.config();
    let diff = diff_records(
        &snapshot(old.path(), config),
        &snapshot(new.path(), config),
        &unlimited(FileSelection::Common),
    );

    let text = diff.group("TEXT").unwrap();
    assert_eq!(text.old_value, 1000);
    assert_eq!(text.new_value, 1021);
    assert_eq!(text.delta, 21);
    assert_eq!(text.delta_percent, 2.1);
    assert_eq!(text.status, DiffStatus::Common);

    let file = diff.file("usr/bin/app").unwrap();
    assert_eq!(file.status, DiffStatus::Common);
    // section contents sit at fixed offsets, so the file length is unchanged
    assert_eq!(file.delta, 0);

    let rows = diff.group_files("TEXT");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].delta, 21);
}

#[test]
fn test_removed_library_scenario() {
    let old = tempfile::tempdir().unwrap();
    let new = tempfile::tempdir().unwrap();
    write_file(old.path(), "a.so", &sample_shared(0x400));
    write_file(old.path(), "b.so", &sample_shared(0x100));
    write_file(new.path(), "b.so", &sample_shared(0x100));

    let config = Profile::Berkeley.config();
    let old_recs = snapshot(old.path(), config);
    let new_recs = snapshot(new.path(), config);
    let diff = diff_records(&old_recs, &new_recs, &unlimited(FileSelection::All));

    let removed = diff.file("a.so").unwrap();
    assert_eq!(removed.status, DiffStatus::Removed);
    assert_eq!(removed.new_value, 0);
    assert!(removed.old_value > 0);
    assert_eq!(removed.delta_percent, -100.0);

    let text = diff.group("TEXT").unwrap();
    assert_eq!(text.old_value, 0x400 + 0x100);
    assert_eq!(text.new_value, 0x100);
    assert_eq!(diff.file("b.so").unwrap().delta, 0);

    // Only b.so is common
    let common = diff_records(&old_recs, &new_recs, &unlimited(FileSelection::Common));
    assert_eq!(common.group("TEXT").unwrap().delta, 0);
    assert!(common.file("a.so").is_none());

    let changed = diff_records(&old_recs, &new_recs, &unlimited(FileSelection::AddedRemoved));
    assert_eq!(changed.files.len(), 1);
    let text = changed.group("TEXT").unwrap();
    assert_eq!((text.old_value, text.new_value), (0x400, 0));
    assert_eq!(text.status, DiffStatus::Removed);
}

#[test]
fn test_identical_snapshots_have_no_delta() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "bin/app", &sample_exec(ElfBuilder::new64(), 0x300));
    write_file(dir.path(), "lib/libx.so", &sample_shared(0x200));
    write_file(dir.path(), "lib/be.so", &sample_exec(ElfBuilder::new32().big_endian(), 0x20));

    let config = Profile::SysV.config();
    let recs = snapshot(dir.path(), config);
    let diff = diff_records(&recs, &recs, &unlimited(FileSelection::All));

    assert!(!diff.groups.is_empty());
    for row in &diff.groups {
        assert_eq!(row.delta, 0, "{}", row.key);
        assert_eq!(row.delta_percent, 0.0);
        assert_eq!(row.status, DiffStatus::Common);
    }
    assert_eq!(diff.files.len(), 3);
    for row in &diff.files {
        assert_eq!(row.status, DiffStatus::Common);
        assert_eq!(row.delta, 0);
    }
    assert_eq!(diff.total().delta, 0);
}

#[test]
fn test_added_group_has_finite_percent() {
    let old = tempfile::tempdir().unwrap();
    let new = tempfile::tempdir().unwrap();
    write_file(old.path(), "app", &sample_exec(ElfBuilder::new64(), 0x100));
    write_file(new.path(), "app", &sample_exec(ElfBuilder::new64(), 0x100));
    write_file(new.path(), "plugin.so", &sample_shared(0x100));

    let config = Profile::Custom.config();
    let diff = diff_records(
        &snapshot(old.path(), config),
        &snapshot(new.path(), config),
        &unlimited(FileSelection::All),
    );
    let dynamic = diff.group("DYNAMIC").unwrap();
    assert_eq!(dynamic.status, DiffStatus::Added);
    assert_eq!(dynamic.old_value, 0);
    assert_eq!(dynamic.delta_percent, 100.0);
    assert_eq!(diff.file("plugin.so").unwrap().status, DiffStatus::Added);
    for row in diff.groups.iter().chain(diff.files.iter()) {
        assert!(row.delta_percent.is_finite());
    }
}

#[test]
fn test_top_n_limits_rows() {
    let old = tempfile::tempdir().unwrap();
    let new = tempfile::tempdir().unwrap();
    for (i, growth) in [0x10u64, 0x300, 0x80, 0x40].iter().enumerate() {
        let name = format!("lib{}.so", i);
        write_file(old.path(), &name, &sample_shared(0x100));
        write_file(new.path(), &name, &sample_shared(0x100 + growth));
    }

    let config = Profile::Gnu.config();
    let diff = diff_records(
        &snapshot(old.path(), config),
        &snapshot(new.path(), config),
        &DiffConfig {
            selection: FileSelection::Common,
            sort: SortKey::AbsDiff,
            top_n_groups: 1,
            top_n_files: 2,
        },
    );
    assert_eq!(diff.groups.len(), 1);
    assert_eq!(diff.groups[0].key, "TEXT");
    let text_files: Vec<&str> = diff
        .group_files("TEXT")
        .iter()
        .map(|r| r.key.as_str())
        .collect();
    assert_eq!(text_files, vec!["lib1.so", "lib2.so"]);
    assert_eq!(diff.group_files.len(), 1);
}
