//! Scratch stores and export fixtures shared by the crate's tests.

use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::{Connection, params};
use tempfile::TempDir;

use crate::store::{StoreConfig, create_store, initialise_schema};

/// A page store inside a temporary directory that is removed on drop.
pub(crate) struct ScratchStore {
    _dir: TempDir,
    pub(crate) root: Utf8PathBuf,
    pub(crate) config: StoreConfig,
}

impl ScratchStore {
    fn in_tempdir() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        let config = StoreConfig::new(root.join("pages.db"));
        Self {
            _dir: dir,
            root,
            config,
        }
    }

    /// A store with every pipeline table provisioned.
    pub(crate) fn provisioned() -> Self {
        let store = Self::in_tempdir();
        let mut connection = create_store(&store.config).expect("create store");
        initialise_schema(&mut connection).expect("initialise schema");
        store
    }

    /// A store whose database file exists but holds no tables.
    pub(crate) fn empty() -> Self {
        let store = Self::in_tempdir();
        drop(create_store(&store.config).expect("create store"));
        store
    }

    /// A configuration pointing at a database file that does not exist.
    pub(crate) fn missing() -> Self {
        Self::in_tempdir()
    }

    /// A provisioned store with `table` dropped.
    pub(crate) fn without(table: &str) -> Self {
        let store = Self::provisioned();
        store
            .connection()
            .execute_batch(&format!("DROP TABLE {table}"))
            .expect("drop table");
        store
    }

    pub(crate) fn connection(&self) -> Connection {
        Connection::open(self.config.database.as_std_path()).expect("open scratch store")
    }

    /// Create (if needed) and return an export directory inside the store root.
    pub(crate) fn export_dir(&self) -> Utf8PathBuf {
        let dir = self.root.join("exports");
        std::fs::create_dir_all(&dir).expect("create export dir");
        dir
    }

    pub(crate) fn count(&self, table: &str) -> i64 {
        self.connection()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .expect("count rows")
    }

    pub(crate) fn stage(&self, page_id: i64, title: &str, text: &str) {
        self.connection()
            .execute(
                "INSERT INTO raw_page_data (page_id, page_title, page_text, export_time, import_time)
                 VALUES (?1, ?2, ?3, '2024-01-01T00:00:00Z', '2024-01-01T00:00:01Z')",
                params![page_id, title, text],
            )
            .expect("stage page");
    }

    pub(crate) fn stage_bytes(&self, page_id: i64, title: &[u8], text: &[u8]) {
        self.connection()
            .execute(
                "INSERT INTO raw_page_data (page_id, page_title, page_text, export_time, import_time)
                 VALUES (?1, ?2, ?3, '2024-01-01T00:00:00Z', '2024-01-01T00:00:01Z')",
                params![page_id, title, text],
            )
            .expect("stage page bytes");
    }

    pub(crate) fn summarise(&self, page_id: i64, sum_text: &str, sum_update_time: &str) {
        self.connection()
            .execute(
                "INSERT INTO summaries (page_id, sum_text, sum_update_time) VALUES (?1, ?2, ?3)",
                params![page_id, sum_text, sum_update_time],
            )
            .expect("insert summary");
    }

    pub(crate) fn publish_stale(&self, id: i64, title: &str) {
        self.connection()
            .execute(
                "INSERT INTO pages (id, title, clean_text, sum_text, link)
                 VALUES (?1, ?2, 'stale', '', 'stale')",
                params![id, title],
            )
            .expect("seed published page");
    }

    /// Published rows as `(id, title, clean_text, sum_text, link)`, ordered by id.
    pub(crate) fn published(&self) -> Vec<(i64, String, String, String, String)> {
        let connection = self.connection();
        let mut statement = connection
            .prepare("SELECT id, title, clean_text, sum_text, link FROM pages ORDER BY id")
            .expect("prepare pages query");
        statement
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })
            .expect("query pages")
            .collect::<Result<_, _>>()
            .expect("read pages")
    }

    /// Staged rows as `(page_id, page_title, page_text, export_time)`, ordered
    /// by insertion.
    pub(crate) fn staged(&self) -> Vec<(i64, String, String, String)> {
        let connection = self.connection();
        let mut statement = connection
            .prepare(
                "SELECT page_id, page_title, page_text, export_time FROM raw_page_data ORDER BY rowid",
            )
            .expect("prepare staging query");
        statement
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .expect("query staging")
            .collect::<Result<_, _>>()
            .expect("read staging")
    }
}

/// Quote a CSV field, doubling embedded quotes.
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Write an export file with a header row and fully quoted fields.
pub(crate) fn write_export(
    dir: &Utf8Path,
    name: &str,
    rows: &[(i64, &str, &str, &str)],
) -> Utf8PathBuf {
    let mut body = String::from("page_id,page_title,page_text,export_time\n");
    for (page_id, title, text, export_time) in rows {
        body.push_str(&format!(
            "{page_id},{},{},{}\n",
            csv_field(title),
            csv_field(text),
            csv_field(export_time)
        ));
    }
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write export");
    path
}
