//! Test helpers for building CLI workspaces with an export directory.

use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::Connection;
use std::fs;
use tempfile::TempDir;

pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn database(&self) -> Utf8PathBuf {
        self.root.join("store").join("pages.db")
    }

    pub(super) fn exports(&self) -> Utf8PathBuf {
        self.root.join("exports")
    }

    /// Write a single-page export into the export directory.
    pub(super) fn write_export(&self) {
        let dir = self.exports();
        fs::create_dir_all(&dir).expect("create export dir");
        fs::write(
            dir.join("latest_pages_data_2024-06-02.csv"),
            "page_id,page_title,page_text,export_time\n\
             11,\"Getting_Started\",\"'''Welcome''' to the [[Main Page|wiki]].\",\"2024-06-02T08:00:00Z\"\n",
        )
        .expect("write export");
    }

    pub(super) fn connection(&self) -> Connection {
        Connection::open(self.database().as_std_path()).expect("open page store")
    }

    /// Published rows as `(id, title, clean_text, link)`.
    pub(super) fn published(&self) -> Vec<(i64, String, String, String)> {
        let connection = self.connection();
        let mut statement = connection
            .prepare("SELECT id, title, clean_text, link FROM pages ORDER BY id")
            .expect("prepare pages query");
        statement
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .expect("query pages")
            .collect::<Result<_, _>>()
            .expect("read pages")
    }

    /// Audit rows as `(user, operation)`, in insertion order.
    pub(super) fn audit_rows(&self) -> Vec<(String, String)> {
        let connection = self.connection();
        let mut statement = connection
            .prepare("SELECT user, operation FROM audit_log ORDER BY id")
            .expect("prepare audit query");
        statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .expect("query audit log")
            .collect::<Result<_, _>>()
            .expect("read audit log")
    }
}
