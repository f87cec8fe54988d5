//! Behavioural tests for staging exports using rstest-bdd.

use std::{cell::RefCell, time::Duration};

use camino::Utf8PathBuf;
use pagesync_core::{Operation, test_support::RecordingAuditLog};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::super::StagingLoader;
use crate::test_support::{ScratchStore, write_export};

const EXPORT_TIME: &str = "2024-05-01T10:00:00Z";

#[fixture]
fn store() -> RefCell<Option<ScratchStore>> {
    RefCell::new(None)
}

#[fixture]
fn exports() -> RefCell<Option<(Utf8PathBuf, Option<Utf8PathBuf>)>> {
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

fn export_dir(exports: &RefCell<Option<(Utf8PathBuf, Option<Utf8PathBuf>)>>) -> Utf8PathBuf {
    exports
        .borrow()
        .as_ref()
        .map(|(dir, _)| dir.clone())
        .unwrap_or_else(|| panic!("export directory must be initialised"))
}

fn newest_export(exports: &RefCell<Option<(Utf8PathBuf, Option<Utf8PathBuf>)>>) -> Utf8PathBuf {
    exports
        .borrow()
        .as_ref()
        .and_then(|(_, newest)| newest.clone())
        .unwrap_or_else(|| panic!("a newer export must be written"))
}

#[given("a provisioned page store")]
fn provisioned_store(store: &RefCell<Option<ScratchStore>>) {
    *store.borrow_mut() = Some(ScratchStore::provisioned());
}

#[given("a page store without the raw_page_data table")]
fn store_without_staging(store: &RefCell<Option<ScratchStore>>) {
    *store.borrow_mut() = Some(ScratchStore::without("raw_page_data"));
}

#[given("an export directory holding an older and a newer export")]
fn older_and_newer_exports(
    store: &RefCell<Option<ScratchStore>>,
    exports: &RefCell<Option<(Utf8PathBuf, Option<Utf8PathBuf>)>>,
) {
    let dir = with_store(store, ScratchStore::export_dir);
    write_export(
        &dir,
        "latest_pages_data_zz_older.csv",
        &[(1, "Old_Page", "old body", EXPORT_TIME)],
    );
    std::thread::sleep(Duration::from_millis(50));
    let newer = write_export(
        &dir,
        "latest_pages_data_aa_newer.csv",
        &[
            (2, "New_Page", "new body", EXPORT_TIME),
            (3, "Other_Page", "other, body", EXPORT_TIME),
        ],
    );
    *exports.borrow_mut() = Some((dir, Some(newer)));
}

#[given("an export directory without any exports")]
fn empty_export_dir(
    store: &RefCell<Option<ScratchStore>>,
    exports: &RefCell<Option<(Utf8PathBuf, Option<Utf8PathBuf>)>>,
) {
    let dir = with_store(store, ScratchStore::export_dir);
    std::fs::write(dir.join("pages.csv"), "page_id\n1\n").expect("write decoy");
    *exports.borrow_mut() = Some((dir, None));
}

#[when("alice stages the export directory")]
fn stage(
    store: &RefCell<Option<ScratchStore>>,
    exports: &RefCell<Option<(Utf8PathBuf, Option<Utf8PathBuf>)>>,
    audit: &RecordingAuditLog,
) {
    let dir = export_dir(exports);
    with_store(store, |scratch| {
        StagingLoader::new(&scratch.config, audit).load("alice", &dir);
    });
}

#[then("the staging table holds only the rows of the newer export")]
fn staged_newer_rows(store: &RefCell<Option<ScratchStore>>) {
    let ids: Vec<i64> = with_store(store, |scratch| {
        scratch.staged().into_iter().map(|row| row.0).collect()
    });
    assert_eq!(ids, vec![2, 3]);
}

#[then("the staging table is empty")]
fn staging_empty(store: &RefCell<Option<ScratchStore>>) {
    assert_eq!(with_store(store, |scratch| scratch.count("raw_page_data")), 0);
}

#[then("the audit log records that the newer export was imported")]
fn audited_import(
    exports: &RefCell<Option<(Utf8PathBuf, Option<Utf8PathBuf>)>>,
    audit: &RecordingAuditLog,
) {
    let newest = newest_export(exports);
    let entries = audit.entries_for(Operation::StageExport);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user, "alice");
    assert_eq!(
        entries[0].message,
        format!("Data from {newest} imported successfully (2 rows)")
    );
}

#[then("the audit log records that no CSV file was found")]
fn audited_missing_export(
    exports: &RefCell<Option<(Utf8PathBuf, Option<Utf8PathBuf>)>>,
    audit: &RecordingAuditLog,
) {
    let dir = export_dir(exports);
    let entries = audit.entries_for(Operation::StageExport);
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].message,
        format!("No CSV file found in the directory {dir}")
    );
}

#[then("the audit log records that table raw_page_data does not exist")]
fn audited_missing_table(audit: &RecordingAuditLog) {
    let entries = audit.entries_for(Operation::StageExport);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "Table 'raw_page_data' does not exist.");
}

#[scenario(path = "tests/features/stage_export.feature", index = 0)]
fn newest_export_is_staged(
    store: RefCell<Option<ScratchStore>>,
    exports: RefCell<Option<(Utf8PathBuf, Option<Utf8PathBuf>)>>,
    audit: RecordingAuditLog,
) {
    let _ = (store, exports, audit);
}

#[scenario(path = "tests/features/stage_export.feature", index = 1)]
fn missing_export_is_audited(
    store: RefCell<Option<ScratchStore>>,
    exports: RefCell<Option<(Utf8PathBuf, Option<Utf8PathBuf>)>>,
    audit: RecordingAuditLog,
) {
    let _ = (store, exports, audit);
}

#[scenario(path = "tests/features/stage_export.feature", index = 2)]
fn missing_staging_table_is_audited(
    store: RefCell<Option<ScratchStore>>,
    exports: RefCell<Option<(Utf8PathBuf, Option<Utf8PathBuf>)>>,
    audit: RecordingAuditLog,
) {
    let _ = (store, exports, audit);
}
