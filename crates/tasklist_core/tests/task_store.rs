mod support;

use support::{memory_gateway, BrokenSlots, FIXED_MILLIS};
use tasklist_core::{
    Filter, LoadStatus, MemorySlotRepository, PersistenceGateway, SlotRepository, StoreError,
    TaskId, TaskStore, ValidationError,
};

fn ids(store: &TaskStore<&MemorySlotRepository>) -> Vec<u64> {
    store.tasks().iter().map(|task| task.id.get()).collect()
}

fn texts(store: &TaskStore<&MemorySlotRepository>) -> Vec<String> {
    store.tasks().iter().map(|task| task.text.clone()).collect()
}

#[test]
fn scenario_add_toggle_duplicate_blank_clear() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();

    let milk = store.add_task("Buy milk").unwrap();
    assert_eq!(store.len(), 1);
    assert!(!milk.completed);

    store.toggle_completion(milk.id).unwrap();
    assert!(store.get(milk.id).unwrap().completed);

    assert!(matches!(
        store.add_task("Buy milk").unwrap_err(),
        StoreError::DuplicateTask
    ));
    assert_eq!(store.len(), 1);

    assert!(matches!(
        store.add_task("  ").unwrap_err(),
        StoreError::InvalidInput(ValidationError::Required)
    ));

    assert_eq!(store.clear_completed().unwrap(), 1);
    assert!(store.is_empty());
}

#[test]
fn initialize_starts_empty_with_all_filter() {
    let repo = MemorySlotRepository::new();
    let store = TaskStore::initialize(memory_gateway(&repo)).unwrap();

    assert!(store.is_empty());
    assert_eq!(store.filter(), Filter::All);
    assert_eq!(store.load_status(), LoadStatus::Missing);
}

#[test]
fn initialize_fails_when_storage_is_unusable() {
    let err = TaskStore::initialize(PersistenceGateway::new(BrokenSlots))
        .err()
        .unwrap();
    assert!(matches!(err, StoreError::StorageUnavailable(_)));
}

#[test]
fn initialize_recovers_from_corrupted_slot() {
    let repo = MemorySlotRepository::new();
    repo.set("tasklist.tasks", "%%%").unwrap();

    let store = TaskStore::initialize(memory_gateway(&repo)).unwrap();
    assert!(store.is_empty());
    assert_eq!(store.load_status(), LoadStatus::Corrupted);
}

#[test]
fn add_prepends_with_increasing_ids_and_persists() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();

    store.add_task("first").unwrap();
    store.add_task("  second ").unwrap();
    store.add_task("third").unwrap();

    assert_eq!(texts(&store), vec!["third", "second", "first"]);
    assert_eq!(ids(&store), vec![FIXED_MILLIS + 2, FIXED_MILLIS + 1, FIXED_MILLIS]);
    assert_eq!(memory_gateway(&repo).load(), store.tasks());
}

#[test]
fn new_ids_continue_after_loaded_ids() {
    let repo = MemorySlotRepository::new();
    let future_id = FIXED_MILLIS + 1_000;
    repo.set(
        "tasklist.tasks",
        &format!(r#"{{"version":"1.0","timestamp":1,"tasks":[{{"id":{future_id},"text":"from the future","completed":false}}]}}"#),
    )
    .unwrap();

    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();
    let task = store.add_task("now").unwrap();
    assert_eq!(task.id.get(), future_id + 1);
    assert_eq!(task.created_at, "2026-10-18T09:30:00.000Z");
}

#[test]
fn duplicate_detection_normalizes_case_and_whitespace() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();
    store.add_task("Buy milk").unwrap();

    for variant in [
        "buy milk",
        "  BUY MILK  ",
        "Buy Milk\t",
        "Buy  milk",
        "BUY\tMILK",
        "buy \n milk",
    ] {
        assert!(matches!(
            store.add_task(variant).unwrap_err(),
            StoreError::DuplicateTask
        ));
    }
    assert_eq!(store.len(), 1);
}

#[test]
fn internal_whitespace_is_collapsed_before_storing() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();

    let task = store.add_task("  Buy \t  milk ").unwrap();
    assert_eq!(task.text, "Buy milk");
    assert_eq!(memory_gateway(&repo).load()[0].text, "Buy milk");
}

#[test]
fn length_is_measured_after_collapsing_whitespace() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();

    let padded = format!("{}   end", "word ".repeat(39));
    assert_eq!(padded.chars().count(), 201);
    let task = store.add_task(&padded).unwrap();
    assert_eq!(task.text.chars().count(), 198);
}

#[test]
fn loaded_text_with_inner_whitespace_still_blocks_duplicates() {
    let repo = MemorySlotRepository::new();
    repo.set(
        "tasklist.tasks",
        r#"{"version":"1.0","timestamp":1,"tasks":[{"id":5,"text":"Buy  milk","completed":false}]}"#,
    )
    .unwrap();

    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();
    assert!(matches!(
        store.add_task("buy milk").unwrap_err(),
        StoreError::DuplicateTask
    ));
    assert_eq!(store.len(), 1);
}

#[test]
fn invalid_text_is_never_inserted() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();

    let too_long = "x y ".repeat(60);
    for raw in ["<img>", "aaaaaa", "free spam", too_long.as_str()] {
        assert!(matches!(
            store.add_task(raw).unwrap_err(),
            StoreError::InvalidInput(_)
        ));
    }
    assert!(store.is_empty());
    assert_eq!(repo.get("tasklist.tasks").unwrap(), None);
}

#[test]
fn double_toggle_restores_state_and_storage_tracks_memory() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();
    let task = store.add_task("stretch").unwrap();

    store.toggle_completion(task.id).unwrap();
    assert_eq!(memory_gateway(&repo).load(), store.tasks());
    assert!(store.get(task.id).unwrap().completed);

    store.toggle_completion(task.id).unwrap();
    assert_eq!(memory_gateway(&repo).load(), store.tasks());
    assert!(!store.get(task.id).unwrap().completed);
}

#[test]
fn toggle_unknown_id_is_not_found() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();
    let missing = TaskId::new(404).unwrap();

    assert!(matches!(
        store.toggle_completion(missing).unwrap_err(),
        StoreError::NotFound(id) if id == missing
    ));
}

#[test]
fn remove_drops_exactly_one_task() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();
    let first = store.add_task("one").unwrap();
    store.add_task("two").unwrap();

    let removed = store.remove_task(first.id).unwrap();
    assert_eq!(removed, first);
    assert_eq!(store.len(), 1);
    assert!(store.get(first.id).is_none());
    assert_eq!(memory_gateway(&repo).load(), store.tasks());

    assert!(matches!(
        store.remove_task(first.id).unwrap_err(),
        StoreError::NotFound(_)
    ));
    assert_eq!(store.len(), 1);
}

#[test]
fn clear_completed_keeps_active_tasks_in_order() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();
    let names = ["a1", "c1", "a2", "c2", "a3"];
    let mut created = Vec::new();
    for name in names {
        created.push(store.add_task(name).unwrap());
    }
    for task in created.iter().filter(|task| task.text.starts_with('c')) {
        store.toggle_completion(task.id).unwrap();
    }

    assert_eq!(store.clear_completed().unwrap(), 2);
    assert_eq!(texts(&store), vec!["a3", "a2", "a1"]);
    assert_eq!(memory_gateway(&repo).load(), store.tasks());
}

#[test]
fn clear_completed_without_completed_tasks_fails() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();
    store.add_task("open").unwrap();

    assert!(matches!(
        store.clear_completed().unwrap_err(),
        StoreError::NothingToClear
    ));
    assert_eq!(store.len(), 1);
}

#[test]
fn filter_changes_view_but_not_storage() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();
    let done = store.add_task("done").unwrap();
    store.add_task("todo").unwrap();
    store.toggle_completion(done.id).unwrap();
    let before = repo.get("tasklist.tasks").unwrap();

    store.set_filter(Filter::Active);
    let view = store.view();
    assert_eq!(view.filter, Filter::Active);
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].text, "todo");
    assert_eq!(view.counts.total, 2);
    assert_eq!(view.counts.completed, 1);
    assert_eq!(repo.get("tasklist.tasks").unwrap(), before);
}

#[test]
fn failed_save_keeps_memory_and_leaves_warning() {
    let repo = MemorySlotRepository::with_quota(200);
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();

    store.add_task("fits").unwrap();
    assert!(store.take_save_warning().is_none());

    let long = "Long task text that will not fit in the tiny quota. ".repeat(3);
    store.add_task(long.trim()).unwrap();
    assert_eq!(store.len(), 2);
    assert!(store.take_save_warning().is_some());
    assert!(store.take_save_warning().is_none());
}

#[test]
fn import_merges_valid_unique_records_at_head() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();
    let existing = store.add_task("Buy milk").unwrap();

    let document = format!(
        r#"{{"tasks":[
            {{"id":{},"text":"Walk dog","completed":true}},
            {{"id":7,"text":"BUY MILK"}},
            {{"id":8,"text":"spam again"}},
            {{"id":9,"text":"walk dog"}},
            {{"id":10,"text":"Read book"}}
        ]}}"#,
        existing.id
    );

    let summary = store.import_json(&document).unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped_duplicates, 2);
    assert_eq!(summary.skipped_invalid, 1);

    assert_eq!(texts(&store), vec!["Walk dog", "Read book", "Buy milk"]);
    let walk = &store.tasks()[0];
    assert_ne!(walk.id, existing.id);
    assert!(walk.completed);
    assert_eq!(store.tasks()[1].id.get(), 10);
    assert_eq!(memory_gateway(&repo).load(), store.tasks());
}

#[test]
fn import_rejects_document_without_tasks() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();

    assert!(matches!(
        store.import_json("[]").unwrap_err(),
        StoreError::Import(_)
    ));
}

#[test]
fn export_contains_every_task() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();
    store.add_task("one").unwrap();
    store.add_task("two").unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&store.export_json().unwrap()).unwrap();
    assert_eq!(parsed["taskCount"], 2);
    assert_eq!(parsed["tasks"][0]["text"], "two");
}

#[test]
fn end_session_writes_and_tolerates_failure() {
    let repo = MemorySlotRepository::new();
    let mut store = TaskStore::initialize(memory_gateway(&repo)).unwrap();
    store.add_task("persist me").unwrap();
    repo.clear().unwrap();

    store.end_session();
    assert_eq!(memory_gateway(&repo).load(), store.tasks());

    let tiny = MemorySlotRepository::with_quota(150);
    let mut degraded = TaskStore::initialize(memory_gateway(&tiny)).unwrap();
    degraded.add_task("this one is fine").unwrap();
    degraded
        .add_task("and this longer entry pushes the payload over the quota")
        .unwrap();
    degraded.end_session();
}
