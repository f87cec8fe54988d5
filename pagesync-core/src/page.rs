//! Page records as they move from staging to publication.
//!
//! Staged payloads arrive either as text or as raw bytes depending on how the
//! export was ingested. [`StagedPage::normalise`] is the single place where
//! those payloads become text; everything downstream works with
//! [`NormalisedPage`] and [`PublishedPage`].

use std::{fmt, string::FromUtf8Error};

use thiserror::Error;

use crate::{BaseUrl, TextCleaner, page_link};

/// A staged column value whose encoding is not yet known to be text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawField {
    /// The store already returned the value as text.
    Text(String),
    /// The store returned raw bytes which must be UTF-8 decoded.
    Bytes(Vec<u8>),
}

impl RawField {
    /// Decode the value into text.
    ///
    /// # Examples
    /// ```
    /// use pagesync_core::RawField;
    ///
    /// let field = RawField::Bytes(b"Main_Page".to_vec());
    /// assert_eq!(field.into_text().expect("valid UTF-8"), "Main_Page");
    /// ```
    pub fn into_text(self) -> Result<String, FromUtf8Error> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Bytes(bytes) => String::from_utf8(bytes),
        }
    }
}

impl From<&str> for RawField {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Identifies which staged column failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageField {
    /// The `page_title` column.
    Title,
    /// The `page_text` column.
    Text,
}

impl fmt::Display for PageField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => f.write_str("title"),
            Self::Text => f.write_str("text"),
        }
    }
}

/// Raised when a staged byte payload is not valid UTF-8.
#[derive(Debug, Error)]
#[error("page {page_id} has a {field} payload that is not valid UTF-8")]
pub struct EncodingError {
    /// Identifier of the offending staged row.
    pub page_id: i64,
    /// Column that failed to decode.
    pub field: PageField,
    /// Underlying decoding error.
    #[source]
    pub source: FromUtf8Error,
}

/// Replace the underscores used in exported titles with spaces.
///
/// The function is idempotent: titles that are already space-separated are
/// returned unchanged.
///
/// # Examples
/// ```
/// use pagesync_core::normalise_title;
///
/// assert_eq!(normalise_title("My_Page"), "My Page");
/// assert_eq!(normalise_title("My Page"), "My Page");
/// ```
#[must_use]
pub fn normalise_title(raw: &str) -> String {
    raw.replace('_', " ")
}

/// Human-readable page title with spaces instead of underscores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTitle(String);

impl PageTitle {
    /// Build a title from its exported, underscore-separated form.
    pub fn from_raw(raw: &str) -> Self {
        Self(normalise_title(raw))
    }

    /// Borrow the display form of the title.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the title as used in wiki URLs, with spaces turned back into
    /// underscores.
    #[must_use]
    pub fn link_segment(&self) -> String {
        self.0.replace(' ', "_")
    }

    /// Consume the wrapper and return the inner [`String`].
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PageTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A row read from the staging table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPage {
    /// Page identifier carried over from the export.
    pub page_id: i64,
    /// Raw, underscore-separated title.
    pub title: RawField,
    /// Raw wikitext body.
    pub text: RawField,
}

impl StagedPage {
    /// Decode both payloads and normalise the title.
    ///
    /// # Examples
    /// ```
    /// use pagesync_core::{RawField, StagedPage};
    ///
    /// let staged = StagedPage {
    ///     page_id: 1,
    ///     title: RawField::Bytes(b"My_Page".to_vec()),
    ///     text: RawField::from("'''Hello'''"),
    /// };
    /// let page = staged.normalise().expect("valid payloads");
    /// assert_eq!(page.title.as_str(), "My Page");
    /// assert_eq!(page.text, "'''Hello'''");
    /// ```
    pub fn normalise(self) -> Result<NormalisedPage, EncodingError> {
        let page_id = self.page_id;
        let title = self.title.into_text().map_err(|source| EncodingError {
            page_id,
            field: PageField::Title,
            source,
        })?;
        let text = self.text.into_text().map_err(|source| EncodingError {
            page_id,
            field: PageField::Text,
            source,
        })?;
        Ok(NormalisedPage {
            page_id,
            title: PageTitle::from_raw(&title),
            text,
        })
    }
}

/// A staged page whose payloads have been decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalisedPage {
    /// Page identifier.
    pub page_id: i64,
    /// Display title.
    pub title: PageTitle,
    /// Raw wikitext body.
    pub text: String,
}

/// A record ready to be written to the published `pages` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPage {
    /// Page identifier.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// Plain text derived from the wikitext body.
    pub clean_text: String,
    /// Latest known summary, or an empty string.
    pub sum_text: String,
    /// Link to the page on the wiki.
    pub link: String,
}

impl PublishedPage {
    /// Combine a normalised page with its cleaned body, link and summary.
    ///
    /// # Examples
    /// ```
    /// use pagesync_core::{BaseUrl, PublishedPage, RawField, StagedPage, WikitextCleaner};
    ///
    /// let page = StagedPage {
    ///     page_id: 1,
    ///     title: RawField::from("My_Page"),
    ///     text: RawField::from("Hello [[World]]"),
    /// }
    /// .normalise()
    /// .expect("valid payloads");
    /// let base = BaseUrl::new("https://wiki.example/");
    /// let published = PublishedPage::compose(page, &WikitextCleaner::new(), &base, None);
    ///
    /// assert_eq!(published.clean_text, "Hello World");
    /// assert_eq!(published.sum_text, "");
    /// assert_eq!(published.link, "https://wiki.example/index.php?title=My_Page");
    /// ```
    pub fn compose<C>(
        page: NormalisedPage,
        cleaner: &C,
        base_url: &BaseUrl,
        summary: Option<String>,
    ) -> Self
    where
        C: TextCleaner + ?Sized,
    {
        let link = page_link(base_url, &page.title);
        Self {
            id: page.page_id,
            clean_text: cleaner.clean(&page.text),
            title: page.title.into_inner(),
            sum_text: summary.unwrap_or_default(),
            link,
        }
    }
}
