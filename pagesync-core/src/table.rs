//! Closed allow-list of table identifiers that may appear in generated SQL.
//!
//! Table names are the only identifiers the pipeline interpolates into SQL
//! text. Accepting them exclusively through [`TableName`] keeps arbitrary
//! caller input out of statements.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Tables the staging and publishing stages may read from or write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableName {
    /// Staging table populated from export files.
    RawPageData,
    /// Published table read by downstream consumers.
    Pages,
}

impl TableName {
    /// Every permitted table, in declaration order.
    pub const ALL: [Self; 2] = [Self::RawPageData, Self::Pages];

    /// SQL identifier for the table.
    #[must_use]
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::RawPageData => "raw_page_data",
            Self::Pages => "pages",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Raised when a table name is not on the allow-list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("table {name:?} is not permitted; expected one of: raw_page_data, pages")]
pub struct UnknownTableError {
    /// The rejected name.
    pub name: String,
}

impl FromStr for TableName {
    type Err = UnknownTableError;

    /// Parse an identifier, matching exactly (no case folding or trimming).
    ///
    /// # Examples
    /// ```
    /// use pagesync_core::TableName;
    ///
    /// assert_eq!("pages".parse::<TableName>(), Ok(TableName::Pages));
    /// assert!("pages; DROP TABLE pages".parse::<TableName>().is_err());
    /// ```
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|table| table.identifier() == value)
            .ok_or_else(|| UnknownTableError {
                name: value.to_owned(),
            })
    }
}
