use std::collections::BTreeMap;
use std::io::Write;

use elfdelta::classify::{classify_with_stage, Stage};
use elfdelta::scan::image_records;
use elfdelta::{classify, classify_records, GroupConfig, Profile};

use crate::common::*;

fn group_sizes(config: &GroupConfig, image: &[u8]) -> BTreeMap<String, u64> {
    let records = image_records(image, "lib", "libx.so", true).unwrap();
    let mut out = BTreeMap::new();
    for c in classify_records(records, config) {
        if !c.record.is_meta() {
            *out.entry(c.group).or_insert(0) += c.record.size;
        }
    }
    out
}

#[test]
fn test_berkeley_and_gnu_fold_rodata_differently() {
    let image = sample_exec(ElfBuilder::new64(), 0x200);

    let berkeley = group_sizes(Profile::Berkeley.config(), &image);
    assert_eq!(berkeley["TEXT"], 0x200);
    assert_eq!(berkeley["DATA"], 0x100 + 0x100);
    assert_eq!(berkeley["BSS"], 0x100);

    let gnu = group_sizes(Profile::Gnu.config(), &image);
    assert_eq!(gnu["TEXT"], 0x200 + 0x100);
    assert_eq!(gnu["DATA"], 0x100);
    assert_eq!(gnu["BSS"], 0x100);
}

#[test]
fn test_sysv_one_group_per_section() {
    let image = sample_exec(ElfBuilder::new32(), 0x200);
    let sysv = group_sizes(Profile::SysV.config(), &image);
    let groups: Vec<&str> = sysv.keys().map(String::as_str).collect();
    assert_eq!(
        groups,
        vec!["", "BSS", "COMMENT", "DATA", "RODATA", "SHSTRTAB", "TEXT"]
    );
}

#[test]
fn test_custom_profile_on_shared_object() {
    let custom = group_sizes(Profile::Custom.config(), &sample_shared(0x800));
    assert_eq!(custom["DYNAMIC"], 0x90);
    assert_eq!(custom["EXCLUDE"], 0x24);
    assert_eq!(custom["TEXT"], 0x800);
    assert_eq!(custom["BSS"], 0x200);
    assert_eq!(custom["DATA"], 0x200);
    assert!(custom.contains_key("OTHERS"));
}

#[test]
fn test_filesize_record_goes_to_filesize_group() {
    let records = image_records(&sample_shared(0x40), ".", "a.so", true).unwrap();
    let meta = &records[0];
    for profile in [Profile::Berkeley, Profile::Gnu, Profile::Custom, Profile::SysV] {
        assert_eq!(classify(meta, profile.config()), "FILESIZE");
    }
}

#[test]
fn test_user_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "groups": {{"CODE": [".text*", ".init"], "RO": ".rodata*"}},
            "rules": [
                {{"if": {{"load_segment_rwx": "RW*", "is_nobits": true}}, "group": "ZERO"}},
                {{"if": {{"addr_space": "FileOnly", "in_load_segment": false}}, "group": "DISK"}}
            ]
        }}"#
    )
    .unwrap();
    let config = GroupConfig::from_path(file.path()).unwrap();
    let records = image_records(&sample_exec(ElfBuilder::new64(), 0x80), ".", "app", true).unwrap();

    let by_name = |name: &str| {
        let rec = records.iter().find(|r| r.section_name == name).unwrap();
        classify_with_stage(rec, &config)
    };
    assert_eq!(by_name(".bss"), ("ZERO".to_string(), Stage::Rules));
    assert_eq!(by_name(".comment"), ("DISK".to_string(), Stage::Rules));
    assert_eq!(by_name(".text"), ("CODE".to_string(), Stage::NameGroups));
    assert_eq!(by_name(".rodata"), ("RO".to_string(), Stage::NameGroups));
    assert_eq!(by_name(".data"), ("DATA".to_string(), Stage::DerivedName));
}

#[test]
fn test_read_exec_rule_scenario() {
    let config = GroupConfig::from_json_str(
        r#"{"rules": [{"if": {"section_flags_perms": ["RX*"]}, "group": "READ_EXEC"}]}"#,
    )
    .unwrap();
    let records = image_records(&sample_exec(ElfBuilder::new64(), 0x80), ".", "app", true).unwrap();
    let mut text = records
        .iter()
        .find(|r| r.section_name == ".text")
        .unwrap()
        .clone();
    text.flags_summary = "RX".to_string();
    assert_eq!(classify(&text, &config), "READ_EXEC");

    let data = records.iter().find(|r| r.section_name == ".data").unwrap();
    assert_eq!(data.flags_summary, "WA");
    assert_eq!(classify(data, &config), "DATA");
}

#[test]
fn test_bad_config_file_is_fatal() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"rules": [{{"if": {{"secton_name": "*"}}, "group": "X"}}]}}"#).unwrap();
    let err = GroupConfig::from_path(file.path()).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().starts_with("Configuration error"));
}
