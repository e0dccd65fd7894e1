use super::{child_names, get_json, put_json, upload_dir, LocalStore, MemoryStore, ObjectStore};
use crate::error::SweepError;
use std::fs;

fn seed(store: &dyn ObjectStore) {
    store.put("projects/", b"").expect("put marker");
    store
        .put("projects/pipe/config.json", b"{}")
        .expect("put project");
    store
        .put("projects/pipe/studies/re/config.json", b"{}")
        .expect("put study");
    store
        .put("projects/pipe/studies/re/cases/caaaaaaaaaaaa/config.json", b"{}")
        .expect("put case");
    store
        .put("projects/cavity/config.json", b"{}")
        .expect("put project");
}

fn assert_listing_contract(store: &dyn ObjectStore) {
    seed(store);
    assert_eq!(
        child_names(store, "projects/").expect("list projects"),
        vec!["cavity".to_string(), "pipe".to_string()]
    );
    assert_eq!(
        child_names(store, "projects/pipe/studies/re/cases/").expect("list cases"),
        vec!["caaaaaaaaaaaa".to_string()]
    );
    assert_eq!(
        child_names(store, "projects/pipe/studies/re/").expect("list study"),
        vec!["cases".to_string(), "config.json".to_string()]
    );
    assert!(child_names(store, "projects/none/")
        .expect("list missing")
        .is_empty());
    assert!(store.exists("projects/pipe/config.json").expect("exists"));
    assert!(!store.exists("projects/pipe/missing.json").expect("exists"));
    assert_eq!(
        store.list("projects/pipe/studies").expect("list"),
        vec![
            "projects/pipe/studies/re/cases/caaaaaaaaaaaa/config.json".to_string(),
            "projects/pipe/studies/re/config.json".to_string(),
        ]
    );

    store
        .delete("projects/pipe/studies/re/config.json")
        .expect("delete");
    assert!(!store
        .exists("projects/pipe/studies/re/config.json")
        .expect("exists"));

    let err = store.get("projects/none/config.json").expect_err("missing key");
    assert!(matches!(
        err.downcast_ref::<SweepError>(),
        Some(SweepError::NotFound(_))
    ));
}

#[test]
fn memory_store_lists_by_prefix() {
    assert_listing_contract(&MemoryStore::new());
}

#[test]
fn local_store_lists_by_prefix() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = LocalStore::open(dir.path().join("bucket")).expect("open store");
    assert_listing_contract(&store);
    assert!(store.exists("projects/").expect("marker exists"));
    assert!(store.root().join("projects/pipe/config.json").is_file());
}

#[test]
fn local_store_rejects_escaping_keys() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = LocalStore::open(dir.path()).expect("open store");
    for key in ["../outside", "/etc/passwd", "projects/../../x"] {
        let err = store.put(key, b"x").expect_err("escaping key must fail");
        assert!(matches!(
            err.downcast_ref::<SweepError>(),
            Some(SweepError::Malformed(_))
        ));
    }
}

#[test]
fn json_helpers_round_trip_and_flag_bad_records() {
    let store = MemoryStore::new();
    put_json(&store, "a/config.json", &vec![1, 2, 3]).expect("put json");
    let back: Vec<i32> = get_json(&store, "a/config.json").expect("get json");
    assert_eq!(back, vec![1, 2, 3]);

    store.put("b/config.json", b"not json").expect("put");
    let err = get_json::<_, Vec<i32>>(&store, "b/config.json").expect_err("bad json");
    assert!(matches!(
        err.downcast_ref::<SweepError>(),
        Some(SweepError::Malformed(_))
    ));
}

#[test]
fn upload_dir_mirrors_the_tree_below_a_prefix() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let source = dir.path().join("cavity");
    fs::create_dir_all(source.join("system")).expect("create system");
    fs::create_dir_all(source.join("0")).expect("create 0");
    fs::write(source.join("system").join("controlDict"), "endTime @end@;").expect("write");
    fs::write(source.join("0").join("U"), "internalField uniform (1 0 0);").expect("write");
    fs::write(source.join("Allrun"), "#!/bin/sh").expect("write");

    let store = MemoryStore::new();
    let keys = upload_dir(&store, &source, "projects/pipe/base_files/cavity").expect("upload");

    assert_eq!(
        keys,
        vec![
            "projects/pipe/base_files/cavity/0/U".to_string(),
            "projects/pipe/base_files/cavity/Allrun".to_string(),
            "projects/pipe/base_files/cavity/system/controlDict".to_string(),
        ]
    );
    assert_eq!(
        store
            .get("projects/pipe/base_files/cavity/system/controlDict")
            .expect("get"),
        b"endTime @end@;".to_vec()
    );
}
