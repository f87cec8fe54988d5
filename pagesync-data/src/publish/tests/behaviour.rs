//! Behavioural tests for publishing staged pages using rstest-bdd.

use std::cell::RefCell;

use pagesync_core::{BaseUrl, Operation, WikitextCleaner, test_support::RecordingAuditLog};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::super::{PublishRequest, Publisher};
use crate::test_support::ScratchStore;

#[fixture]
fn store() -> RefCell<Option<ScratchStore>> {
    RefCell::new(None)
}

#[fixture]
fn audit() -> RecordingAuditLog {
    RecordingAuditLog::new()
}

fn with_store<T>(store: &RefCell<Option<ScratchStore>>, f: impl FnOnce(&ScratchStore) -> T) -> T {
    let binding = store.borrow();
    let scratch = binding
        .as_ref()
        .unwrap_or_else(|| panic!("store must be initialised"));
    f(scratch)
}

fn only_message(audit: &RecordingAuditLog) -> String {
    let entries = audit.entries_for(Operation::PublishPages);
    assert_eq!(entries.len(), 1, "expected a single audit entry: {entries:?}");
    entries[0].message.clone()
}

#[given("a page store with My_Page staged as bold Hi")]
fn my_page_staged(store: &RefCell<Option<ScratchStore>>) {
    let scratch = ScratchStore::provisioned();
    scratch.stage(7, "My_Page", "'''Hi'''");
    *store.borrow_mut() = Some(scratch);
}

#[given("My_Page has summaries old from 2024-01-01 and new from 2024-06-01")]
fn my_page_summaries(store: &RefCell<Option<ScratchStore>>) {
    with_store(store, |scratch| {
        scratch.summarise(7, "new", "2024-06-01");
        scratch.summarise(7, "old", "2024-01-01");
    });
}

#[given("a page store without the raw_page_data table and one published page")]
fn store_without_staging(store: &RefCell<Option<ScratchStore>>) {
    let scratch = ScratchStore::without("raw_page_data");
    scratch.publish_stale(42, "Previously Published");
    *store.borrow_mut() = Some(scratch);
}

#[given("a page store with nothing staged and one published page")]
fn store_with_empty_staging(store: &RefCell<Option<ScratchStore>>) {
    let scratch = ScratchStore::provisioned();
    scratch.publish_stale(42, "Previously Published");
    *store.borrow_mut() = Some(scratch);
}

#[when("bob publishes the staged pages")]
fn publish(store: &RefCell<Option<ScratchStore>>, audit: &RecordingAuditLog) {
    let base_url = BaseUrl::new("https://wiki.example/");
    let cleaner = WikitextCleaner::new();
    with_store(store, |scratch| {
        Publisher::new(&scratch.config, &base_url, &cleaner, audit)
            .publish("bob", PublishRequest::default());
    });
}

#[then("the pages table holds exactly My Page with summary new")]
fn my_page_published(store: &RefCell<Option<ScratchStore>>) {
    let pages = with_store(store, ScratchStore::published);
    assert_eq!(pages.len(), 1);
    let (id, title, clean_text, sum_text, _) = &pages[0];
    assert_eq!(*id, 7);
    assert_eq!(title, "My Page");
    assert_eq!(clean_text, "Hi");
    assert_eq!(sum_text, "new");
}

#[then("the published link points at My_Page on the wiki")]
fn my_page_link(store: &RefCell<Option<ScratchStore>>) {
    let pages = with_store(store, ScratchStore::published);
    assert_eq!(pages[0].4, "https://wiki.example/index.php?title=My_Page");
}

#[then("the audit log records that 1 page was published")]
fn audited_publish(audit: &RecordingAuditLog) {
    assert_eq!(
        only_message(audit),
        "Data copied and sanitised from raw_page_data to pages (1 pages)"
    );
}

#[then("the pages table still holds the previously published page")]
fn target_untouched(store: &RefCell<Option<ScratchStore>>) {
    let pages = with_store(store, ScratchStore::published);
    let ids: Vec<i64> = pages.into_iter().map(|page| page.0).collect();
    assert_eq!(ids, vec![42]);
}

#[then("the audit log mentions raw_page_data")]
fn audited_missing_source(audit: &RecordingAuditLog) {
    let message = only_message(audit);
    assert!(message.contains("raw_page_data"), "unexpected message: {message}");
}

#[then("the pages table is empty")]
fn target_empty(store: &RefCell<Option<ScratchStore>>) {
    assert_eq!(with_store(store, |scratch| scratch.count("pages")), 0);
}

#[then("the audit log records that no data was found in raw_page_data")]
fn audited_empty_source(audit: &RecordingAuditLog) {
    assert_eq!(only_message(audit), "No data found in table raw_page_data");
}

#[scenario(path = "tests/features/publish_pages.feature", index = 0)]
fn staged_page_is_published(store: RefCell<Option<ScratchStore>>, audit: RecordingAuditLog) {
    let _ = (store, audit);
}

#[scenario(path = "tests/features/publish_pages.feature", index = 1)]
fn missing_staging_table_keeps_pages(
    store: RefCell<Option<ScratchStore>>,
    audit: RecordingAuditLog,
) {
    let _ = (store, audit);
}

#[scenario(path = "tests/features/publish_pages.feature", index = 2)]
fn empty_staging_empties_pages(store: RefCell<Option<ScratchStore>>, audit: RecordingAuditLog) {
    let _ = (store, audit);
}
