//! Continuation-token listings
//!
//! Object stores return keys a page at a time. [`PaginatedBackend`] adapts
//! any [`PageSource`] into a [`Backend`] by draining every page before the
//! listing is handed on; a failure on any page fails the whole listing.

use std::collections::HashSet;

use super::{finish_listing, Backend, BackendError, BucketUrl, ListedArtifact};

/// One page of keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub keys: Vec<String>,
    /// Token for the next page; `None` once the listing is exhausted
    pub next: Option<String>,
}

/// Client side of a paginated key listing.
pub trait PageSource {
    fn fetch_page(&self, prefix: &str, token: Option<&str>) -> Result<Page, BackendError>;
}

/// Fetch pages until no continuation token remains.
pub fn drain_pages<P: PageSource + ?Sized>(
    source: &P,
    location: &str,
    prefix: &str,
) -> Result<Vec<String>, BackendError> {
    let mut keys = Vec::new();
    let mut seen_tokens = HashSet::new();
    let mut token: Option<String> = None;

    loop {
        let page = source.fetch_page(prefix, token.as_deref())?;
        keys.extend(page.keys);

        match page.next {
            None => return Ok(keys),
            Some(next) => {
                if !seen_tokens.insert(next.clone()) {
                    return Err(BackendError::Pagination {
                        location: location.to_string(),
                        reason: format!("continuation token '{}' repeated", next),
                    });
                }
                token = Some(next);
            }
        }
    }
}

/// Backend over a paginated object store listing.
pub struct PaginatedBackend<P> {
    name: String,
    source: P,
    url: BucketUrl,
}

impl<P: PageSource> PaginatedBackend<P> {
    pub fn new(name: String, source: P, url: BucketUrl) -> Self {
        Self { name, source, url }
    }
}

impl<P: PageSource> Backend for PaginatedBackend<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, variant: &str) -> Result<Vec<ListedArtifact>, BackendError> {
        let keys = drain_pages(&self.source, &self.name, variant)?;
        Ok(finish_listing(
            variant,
            keys.into_iter().map(ListedArtifact::key_only).collect(),
        ))
    }

    fn url_for(&self, variant: &str, filename: &str) -> String {
        self.url.url_for(variant, filename)
    }
}
