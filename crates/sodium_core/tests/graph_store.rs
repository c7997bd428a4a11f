use sodium_core::{
    FsNoteFileStore, GraphSnapshot, GraphStore, IntegrityIssue, JsonFileSnapshotRepository,
    LinkOutcome, LoadOutcome, LogMatch, NoteFileStore, RepoError, RepoResult, SnapshotRepository,
    SqliteSnapshotRepository, StoreError,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn graph_file(&self) -> PathBuf {
        self.dir.path().join("graph.json")
    }

    fn notes_dir(&self) -> PathBuf {
        self.dir.path().join("notes")
    }

    fn files(&self) -> FsNoteFileStore {
        FsNoteFileStore::open(self.notes_dir()).unwrap()
    }

    fn open(&self) -> GraphStore {
        GraphStore::open(JsonFileSnapshotRepository::new(self.graph_file()), self.files()).unwrap()
    }
}

/// JSON repository whose saves can be switched to fail.
struct FlakyRepo {
    inner: JsonFileSnapshotRepository,
    fail: Arc<AtomicBool>,
}

impl SnapshotRepository for FlakyRepo {
    fn load_raw(&self) -> RepoResult<Option<Vec<u8>>> {
        self.inner.load_raw()
    }

    fn save(&self, snapshot: &GraphSnapshot) -> RepoResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepoError::Io {
                path: self.inner.path().to_path_buf(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.save(snapshot)
    }

    fn describe(&self) -> String {
        "flaky".to_string()
    }
}

fn content_of<R: SnapshotRepository>(store: &GraphStore<R>, id: &str) -> String {
    store.read_note(id).unwrap().content
}

#[test]
fn create_note_seeds_content_and_persists() {
    let fx = Fixture::new();
    let mut store = fx.open();
    assert_eq!(store.load_outcome(), &LoadOutcome::Fresh);

    let location = store.create_note("Ideas").unwrap();
    assert!(location.ends_with("Ideas.na.md"));
    assert_eq!(content_of(&store, "Ideas"), "# Ideas\n\n");

    let reopened = fx.open();
    assert_eq!(reopened.load_outcome(), &LoadOutcome::Loaded);
    assert_eq!(reopened.note_ids(), vec!["Ideas"]);
    assert_eq!(reopened.note_location("Ideas").unwrap(), location);
}

#[test]
fn create_note_rejects_duplicates_and_invalid_ids() {
    let fx = Fixture::new();
    let mut store = fx.open();
    store.create_note("A").unwrap();

    assert!(matches!(
        store.create_note("A"),
        Err(StoreError::AlreadyExists(id)) if id == "A"
    ));
    assert!(matches!(
        store.create_note("../escape"),
        Err(StoreError::InvalidNoteId(_))
    ));
}

#[test]
fn create_link_is_symmetric_and_writes_markers() {
    let fx = Fixture::new();
    let mut store = fx.open();
    store.create_note("A").unwrap();
    store.create_note("B").unwrap();

    assert_eq!(store.create_link("A", "B").unwrap(), LinkOutcome::Created);

    assert_eq!(store.list_links("A").unwrap(), vec!["B"]);
    assert_eq!(store.list_links("B").unwrap(), vec!["A"]);
    assert_eq!(store.list_backlinks("A"), vec!["B"]);
    assert_eq!(store.list_backlinks("B"), vec!["A"]);

    let view = store.read_note("A").unwrap();
    assert_eq!(view.markers, vec!["B"]);
    assert!(view.content.ends_with("\n[[B]]\n"));
    assert_eq!(store.read_note("B").unwrap().markers, vec!["A"]);
}

#[test]
fn repeated_link_is_a_no_op() {
    let fx = Fixture::new();
    let mut store = fx.open();
    store.create_note("A").unwrap();
    store.create_note("B").unwrap();
    store.create_link("A", "B").unwrap();
    let content_before = content_of(&store, "A");

    assert_eq!(store.create_link("B", "A").unwrap(), LinkOutcome::AlreadyLinked);
    assert_eq!(store.list_links("A").unwrap().len(), 1);
    assert_eq!(content_of(&store, "A"), content_before);
}

#[test]
fn create_link_validates_endpoints() {
    let fx = Fixture::new();
    let mut store = fx.open();
    store.create_note("A").unwrap();

    assert!(matches!(
        store.create_link("A", "missing"),
        Err(StoreError::NotFound(id)) if id == "missing"
    ));
    assert!(matches!(store.create_link("A", "A"), Err(StoreError::SelfLink(_))));
    assert!(matches!(store.list_links("missing"), Err(StoreError::NotFound(_))));
    assert!(store.list_backlinks("missing").is_empty());
}

#[test]
fn remove_note_cascades_to_links_tags_and_content() {
    let fx = Fixture::new();
    let mut store = fx.open();
    for id in ["X", "Y", "Z"] {
        store.create_note(id).unwrap();
    }
    store.create_link("X", "Y").unwrap();
    store.create_link("Z", "X").unwrap();
    store.add_tag("X", "only-x").unwrap();
    store.add_tag("X", "shared").unwrap();
    store.add_tag("Y", "shared").unwrap();
    let x_location = store.note_location("X").unwrap().to_string();

    store.remove_note("X").unwrap();

    assert!(store.list_backlinks("X").is_empty());
    assert!(store.list_links("Y").unwrap().is_empty());
    assert!(store.list_links("Z").unwrap().is_empty());
    assert!(store.list_backlinks("Y").is_empty());
    assert!(!store.list_tags().contains_key("only-x"));
    assert_eq!(store.list_tags()["shared"], vec!["Y"]);
    assert!(!store.files().exists(&x_location));
    assert!(store.verify().is_empty());

    let reopened = fx.open();
    assert!(!reopened.snapshot().contains_note("X"));
    assert!(reopened
        .snapshot()
        .tags
        .values()
        .all(|members| !members.iter().any(|m| m == "X")));
}

#[test]
fn removing_linked_note_clears_partner_links() {
    let fx = Fixture::new();
    let mut store = fx.open();
    store.create_note("A").unwrap();
    store.create_note("B").unwrap();
    store.create_link("A", "B").unwrap();

    store.remove_note("A").unwrap();

    assert!(!store.list_links("B").unwrap().contains(&"A".to_string()));
    assert!(matches!(store.remove_note("A"), Err(StoreError::NotFound(_))));
}

#[test]
fn remove_note_tolerates_missing_content() {
    let fx = Fixture::new();
    let mut store = fx.open();
    store.create_note("A").unwrap();
    std::fs::remove_file(store.note_location("A").unwrap()).unwrap();
    assert_eq!(store.verify(), vec![IntegrityIssue::MissingContent("A".to_string())]);

    store.remove_note("A").unwrap();
    assert!(store.note_ids().is_empty());
}

#[test]
fn add_tag_has_set_semantics_and_rejects_blank_labels() {
    let fx = Fixture::new();
    let mut store = fx.open();
    store.create_note("A").unwrap();

    assert!(store.add_tag("A", " rust ").unwrap());
    assert!(!store.add_tag("A", "rust").unwrap());
    assert_eq!(store.list_tags()["rust"], vec!["A"]);
    assert_eq!(store.tags_for_note("A").unwrap(), vec!["rust"]);

    assert!(matches!(store.add_tag("A", "   "), Err(StoreError::InvalidTag(_))));
    assert!(matches!(
        store.add_tag("missing", "rust"),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn init_from_directory_registers_new_files_once() {
    let fx = Fixture::new();
    let files = fx.files();
    files.create("Found").unwrap();
    files.create("Another").unwrap();
    std::fs::write(fx.notes_dir().join("ignored.txt"), "x").unwrap();

    let mut store = fx.open();
    store.create_note("Known").unwrap();

    let added = store.init_from_directory().unwrap();
    assert_eq!(added, vec!["Another", "Found"]);
    assert_eq!(store.note_ids(), vec!["Another", "Found", "Known"]);

    let again = store.init_from_directory().unwrap();
    assert!(again.is_empty());
}

#[test]
fn log_entry_overwrites_previous_body() {
    let fx = Fixture::new();
    let mut store = fx.open();
    store.log_entry("T", "a").unwrap();
    store.log_entry("T", "b").unwrap();

    assert_eq!(store.logs().len(), 1);
    assert_eq!(store.logs()["T"], "b");
    assert_eq!(fx.open().logs()["T"], "b");
}

#[test]
fn search_matches_notes_and_tags_log_hits() {
    let fx = Fixture::new();
    let mut store = fx.open();
    store.create_note("Rust").unwrap();
    store.create_note("Cooking").unwrap();
    store
        .update_note_content("Cooking", "# Cooking\n\nRUSTIC bread")
        .unwrap();
    store.log_entry("rust meetup", "talked about lifetimes").unwrap();
    store.log_entry("groceries", "buy rust remover").unwrap();
    store.log_entry("unrelated", "nothing here").unwrap();

    let results = store.search_notes("rust").unwrap();
    assert_eq!(results.notes, vec!["Cooking", "Rust"]);
    let hits: Vec<_> = results
        .logs
        .iter()
        .map(|hit| (hit.title.as_str(), hit.matched))
        .collect();
    assert_eq!(
        hits,
        vec![("groceries", LogMatch::Body), ("rust meetup", LogMatch::Title)]
    );

    assert!(store.search_notes("   ").unwrap().is_empty());
}

#[test]
fn search_keeps_surrounding_whitespace_of_the_query() {
    let fx = Fixture::new();
    let mut store = fx.open();
    store.create_note("Trust").unwrap();
    store.create_note("Notes").unwrap();
    store
        .update_note_content("Notes", "# Notes\n\nlearning Rust")
        .unwrap();
    store.log_entry("trustee", "no leading space").unwrap();

    assert_eq!(store.search_notes("rust").unwrap().notes, vec!["Notes", "Trust"]);
    let results = store.search_notes(" rust").unwrap();
    assert_eq!(results.notes, vec!["Notes"]);
    assert!(results.logs.is_empty());
}

#[test]
fn search_skips_notes_with_missing_content() {
    let fx = Fixture::new();
    let mut store = fx.open();
    store.create_note("Gone").unwrap();
    store.create_note("Here").unwrap();
    std::fs::remove_file(store.note_location("Gone").unwrap()).unwrap();

    let results = store.search_notes("#").unwrap();
    assert_eq!(results.notes, vec!["Here"]);
}

#[test]
fn failed_save_rolls_back_memory_and_content() {
    let fx = Fixture::new();
    let fail = Arc::new(AtomicBool::new(false));
    let repo = FlakyRepo {
        inner: JsonFileSnapshotRepository::new(fx.graph_file()),
        fail: Arc::clone(&fail),
    };
    let mut store = GraphStore::open(repo, fx.files()).unwrap();
    store.create_note("A").unwrap();
    store.create_note("B").unwrap();
    let a_before = content_of(&store, "A");

    fail.store(true, Ordering::SeqCst);

    assert!(matches!(store.create_link("A", "B"), Err(StoreError::Persist(_))));
    assert!(store.list_links("A").unwrap().is_empty());
    assert_eq!(content_of(&store, "A"), a_before);

    assert!(matches!(store.remove_note("A"), Err(StoreError::Persist(_))));
    assert!(store.snapshot().contains_note("A"));
    assert_eq!(content_of(&store, "A"), a_before);

    assert!(matches!(store.create_note("C"), Err(StoreError::Persist(_))));
    assert!(!store.files().exists(&store.files().location("C")));

    assert!(matches!(store.add_tag("A", "x"), Err(StoreError::Persist(_))));
    assert!(store.list_tags().is_empty());

    fail.store(false, Ordering::SeqCst);
    assert_eq!(store.create_link("A", "B").unwrap(), LinkOutcome::Created);
}

#[test]
fn malformed_document_recovers_to_empty_graph() {
    let fx = Fixture::new();
    std::fs::write(fx.graph_file(), "{ not json").unwrap();

    let store = fx.open();
    assert!(matches!(store.load_outcome(), LoadOutcome::Recovered { .. }));
    assert_eq!(store.snapshot(), &GraphSnapshot::default());

    let strict = GraphStore::open_strict(
        JsonFileSnapshotRepository::new(fx.graph_file()),
        fx.files(),
    );
    assert!(matches!(strict, Err(StoreError::MalformedPersistedState(_))));
}

#[test]
fn undecodable_bytes_recover_to_empty_graph() {
    let fx = Fixture::new();
    std::fs::write(fx.graph_file(), [0xff, 0xfe, b'{', b'}']).unwrap();

    let mut store = fx.open();
    assert!(matches!(store.load_outcome(), LoadOutcome::Recovered { .. }));
    assert!(store.note_ids().is_empty());

    store.create_note("Fresh").unwrap();
    assert_eq!(fx.open().load_outcome(), &LoadOutcome::Loaded);

    std::fs::write(fx.graph_file(), [0xff, 0xfe, b'{', b'}']).unwrap();
    let strict = GraphStore::open_strict(
        JsonFileSnapshotRepository::new(fx.graph_file()),
        fx.files(),
    );
    assert!(matches!(strict, Err(StoreError::MalformedPersistedState(_))));
}

#[test]
fn older_note_and_log_layouts_load_without_reset() {
    let fx = Fixture::new();
    let files = fx.files();
    let a = files.create("A").unwrap();
    let b = files.create("B").unwrap();
    let document = serde_json::json!({
        "notes": {"A": a, "B": {"path": b}},
        "links": {"A": ["B"], "B": ["A"]},
        "tags": {},
        "logs": {"day": ["one", "two"]},
    });
    std::fs::write(fx.graph_file(), document.to_string()).unwrap();

    let mut store = fx.open();
    assert_eq!(store.load_outcome(), &LoadOutcome::Loaded);
    assert_eq!(store.note_ids(), vec!["A", "B"]);
    assert_eq!(store.note_location("B").unwrap(), b);
    assert_eq!(store.list_links("A").unwrap(), vec!["B"]);
    assert_eq!(store.logs()["day"], "one\ntwo");
    assert_eq!(store.search_notes("two").unwrap().logs.len(), 1);

    store.log_entry("next", "entry").unwrap();
    let value: serde_json::Value =
        serde_json::from_slice(&std::fs::read(fx.graph_file()).unwrap()).unwrap();
    assert_eq!(value["notes"]["B"], serde_json::json!(b));
    assert_eq!(value["logs"]["day"], "one\ntwo");
}

#[test]
fn content_follows_the_recorded_location() {
    let fx = Fixture::new();
    let elsewhere = fx.dir.path().join("elsewhere");
    std::fs::create_dir_all(&elsewhere).unwrap();
    let a_path = elsewhere.join("A.na.md");
    std::fs::write(&a_path, "# A\n\nzebra crossing\n").unwrap();
    let a_location = a_path.to_string_lossy().into_owned();
    std::fs::write(
        fx.graph_file(),
        serde_json::json!({"notes": {"A": a_location}}).to_string(),
    )
    .unwrap();

    let mut store = fx.open();
    store.create_note("B").unwrap();
    assert_eq!(store.note_location("A").unwrap(), a_location);
    assert!(!fx.files().exists(&fx.files().location("A")));
    assert!(store.verify().is_empty());

    assert_eq!(store.search_notes("zebra").unwrap().notes, vec!["A"]);
    assert!(store.read_note("A").unwrap().content.contains("zebra"));

    store.create_link("A", "B").unwrap();
    let on_disk = std::fs::read_to_string(&a_path).unwrap();
    assert!(on_disk.ends_with("zebra crossing\n\n[[B]]\n"));

    store.update_note_content("A", "rewritten").unwrap();
    assert_eq!(std::fs::read_to_string(&a_path).unwrap(), "rewritten");

    store.remove_note("A").unwrap();
    assert!(!a_path.exists());
    assert!(!fx.files().exists(&fx.files().location("A")));
}

#[test]
fn legacy_document_without_logs_loads() {
    let fx = Fixture::new();
    std::fs::write(
        fx.graph_file(),
        r#"{"notes": {"A": "notes/A.na.md"}, "links": {}, "tags": {"x": ["A"]}}"#,
    )
    .unwrap();

    let mut store = fx.open();
    assert_eq!(store.load_outcome(), &LoadOutcome::Loaded);
    assert_eq!(store.list_tags()["x"], vec!["A"]);
    store.log_entry("first", "entry").unwrap();

    let raw = std::fs::read(fx.graph_file()).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(value["logs"]["first"], "entry");
    assert_eq!(value["tags"]["x"], serde_json::json!(["A"]));
}

#[test]
fn sqlite_backend_persists_across_reopen() {
    let fx = Fixture::new();
    let db_path = fx.dir.path().join("graph.sqlite3");
    {
        let repo = SqliteSnapshotRepository::open(&db_path).unwrap();
        let mut store = GraphStore::open(repo, fx.files()).unwrap();
        store.create_note("A").unwrap();
        store.create_note("B").unwrap();
        store.create_link("A", "B").unwrap();
        store.add_tag("B", "db").unwrap();
    }

    let repo = SqliteSnapshotRepository::open(&db_path).unwrap();
    let store = GraphStore::open(repo, fx.files()).unwrap();
    assert_eq!(store.load_outcome(), &LoadOutcome::Loaded);
    assert_eq!(store.list_backlinks("B"), vec!["A"]);
    assert_eq!(store.tags_for_note("B").unwrap(), vec!["db"]);
}
