//! Base URL handling and display-link construction.

use std::{fmt, ops::Deref};

use thiserror::Error;
use url::Url;

use crate::PageTitle;

/// Base URL of the wiki the published pages link back to.
///
/// The value is used verbatim as a link prefix, so it normally ends with a
/// slash.
///
/// # Examples
/// ```
/// # use pagesync_core::BaseUrl;
/// let url = BaseUrl::new("https://wiki.example/");
/// assert_eq!(url.as_ref(), "https://wiki.example/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    /// Construct a new [`BaseUrl`] from an owned or borrowed string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Validate that `value` is an absolute `http` or `https` URL.
    ///
    /// The original text is kept as-is; validation does not normalise it.
    ///
    /// # Examples
    /// ```
    /// # use pagesync_core::BaseUrl;
    /// assert!(BaseUrl::parse("https://wiki.example/").is_ok());
    /// assert!(BaseUrl::parse("wiki.example").is_err());
    /// assert!(BaseUrl::parse("ftp://wiki.example/").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, BaseUrlError> {
        let parsed = Url::parse(value).map_err(|source| BaseUrlError::Invalid {
            value: value.to_owned(),
            source,
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(Self::new(value)),
            scheme => Err(BaseUrlError::UnsupportedScheme {
                value: value.to_owned(),
                scheme: scheme.to_owned(),
            }),
        }
    }

    /// Consume the wrapper and return the inner [`String`].
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for BaseUrl {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for BaseUrl {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors produced while validating or resolving a base URL.
#[derive(Debug, Error)]
pub enum BaseUrlError {
    /// The value is not a URL at all.
    #[error("base URL {value:?} is not a valid absolute URL")]
    Invalid {
        /// Offending input.
        value: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// The URL uses a scheme other than `http` or `https`.
    #[error("base URL {value:?} uses unsupported scheme {scheme:?}")]
    UnsupportedScheme {
        /// Offending input.
        value: String,
        /// Scheme that was found.
        scheme: String,
    },
    /// A resolver could not produce a base URL.
    #[error("failed to resolve base URL: {message}")]
    Unavailable {
        /// Human-readable reason.
        message: String,
    },
}

/// Source of the base URL used when building page links.
///
/// The publisher resolves the URL once per run and treats it as stable for
/// the remainder of that run.
pub trait BaseUrlResolver {
    /// Produce the base URL for the current run.
    fn resolve(&self) -> Result<BaseUrl, BaseUrlError>;
}

impl BaseUrlResolver for BaseUrl {
    fn resolve(&self) -> Result<BaseUrl, BaseUrlError> {
        Ok(self.clone())
    }
}

/// Build the wiki link for `title`.
///
/// # Examples
/// ```
/// use pagesync_core::{BaseUrl, PageTitle, page_link};
///
/// let link = page_link(&BaseUrl::new("https://wiki.example/"), &PageTitle::from_raw("Foo Bar"));
/// assert_eq!(link, "https://wiki.example/index.php?title=Foo_Bar");
/// ```
#[must_use]
pub fn page_link(base_url: &BaseUrl, title: &PageTitle) -> String {
    format!("{base_url}index.php?title={}", title.link_segment())
}
