use super::*;

fn temp_token_path(tag: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("folio-admin-store-{tag}-{}", std::process::id()))
        .join(TOKEN_KEY)
}

#[test]
fn file_store_round_trips_and_clears() {
    let path = temp_token_path("round-trip");
    let store = FileTokenStore::new(&path);
    assert_eq!(store.load(), None);

    store.save("tok-123").unwrap();
    assert_eq!(store.load().as_deref(), Some("tok-123"));
    assert!(path.ends_with(TOKEN_KEY));

    store.clear().unwrap();
    assert_eq!(store.load(), None);
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn file_store_clear_on_missing_file_is_ok() {
    let store = FileTokenStore::new(temp_token_path("missing"));
    assert!(store.clear().is_ok());
    assert!(store.clear().is_ok());
}

#[test]
fn file_store_blank_file_reads_as_absent() {
    let path = temp_token_path("blank");
    let store = FileTokenStore::new(&path);
    store.save("   \n").unwrap();
    assert_eq!(store.load(), None);
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn memory_store_behaves_like_a_slot() {
    let store = MemoryTokenStore::with_token("t-1");
    assert_eq!(store.load().as_deref(), Some("t-1"));
    store.save("t-2").unwrap();
    assert_eq!(store.load().as_deref(), Some("t-2"));
    store.clear().unwrap();
    assert_eq!(store.load(), None);
}
