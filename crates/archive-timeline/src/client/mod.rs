//! Record fetch client.
//!
//! Drives pagination against the gateway and accumulates records into a
//! [`TimelineState`]. The client is an explicit state machine
//! (`Idle → Loading → Loaded | Error`) with a single in-flight guard: a second
//! fetch is refused while one is outstanding, so each cursor is requested at
//! most once at a time and pages are appended strictly in cursor order.
//!
//! A failed fetch leaves the timeline and the cursor untouched, so calling
//! [`RecordFetchClient::fetch_page`] again retries the same page.

mod source;

use tracing::{debug, info, warn};

pub use source::{HttpPageSource, PageSource, RECORDS_PATH};

use crate::error::{Error, Result};
use crate::record::{Page, Record};
use crate::timeline::TimelineState;

/// Message shown to the reader when a page could not be loaded.
pub const FETCH_ERROR_MESSAGE: &str = "Failed to fetch records.";

/// Lifecycle of the fetch client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A page request is outstanding.
    Loading,
    /// The last request succeeded.
    Loaded,
    /// The last request failed.
    Error,
}

impl std::fmt::Display for FetchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Loaded => write!(f, "loaded"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Ticket for an outstanding page request.
///
/// Issued by [`RecordFetchClient::begin_fetch`] and consumed by
/// [`RecordFetchClient::finish_fetch`].
#[derive(Debug)]
#[must_use = "an unfinished fetch leaves the client loading"]
pub struct PendingFetch {
    cursor: Option<String>,
    generation: u64,
}

impl PendingFetch {
    /// Cursor to request; `None` for the first page.
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }
}

/// Paginating client over a [`PageSource`].
#[derive(Debug)]
pub struct RecordFetchClient<S> {
    source: S,
    timeline: TimelineState,
    cursor: Option<String>,
    state: FetchState,
    error: Option<String>,
    activated: bool,
    pages_loaded: usize,
    generation: u64,
}

impl<S: PageSource> RecordFetchClient<S> {
    /// Create an idle client.
    pub fn new(source: S) -> Self {
        Self {
            source,
            timeline: TimelineState::new(),
            cursor: None,
            state: FetchState::Idle,
            error: None,
            activated: false,
            pages_loaded: 0,
            generation: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Accumulated records.
    #[must_use]
    pub fn timeline(&self) -> &TimelineState {
        &self.timeline
    }

    /// Accumulated records as a slice.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        self.timeline.records()
    }

    /// Cursor for the next page, if any.
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Reader-facing error from the last failed fetch.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True while a request is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state == FetchState::Loading
    }

    /// Pages appended since the last mount.
    #[must_use]
    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    /// True once a page without a cursor has been loaded.
    #[must_use]
    pub fn is_end_of_stream(&self) -> bool {
        self.pages_loaded > 0 && self.cursor.is_none()
    }

    /// Whether a "load more" trigger should be offered.
    ///
    /// Only when the last successful page carried a cursor and nothing is
    /// in flight.
    #[must_use]
    pub fn can_load_more(&self) -> bool {
        !self.is_loading() && self.cursor.is_some()
    }

    /// The underlying page source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mark a request as outstanding and return the ticket for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchInFlight`] if a request is already outstanding,
    /// or [`Error::NoMorePages`] once the last page has been loaded.
    pub fn begin_fetch(&mut self) -> Result<PendingFetch> {
        if self.is_loading() {
            return Err(Error::FetchInFlight);
        }
        if self.is_end_of_stream() {
            return Err(Error::NoMorePages);
        }
        self.state = FetchState::Loading;
        self.error = None;
        debug!(cursor = ?self.cursor, "fetching page");
        Ok(PendingFetch {
            cursor: self.cursor.clone(),
            generation: self.generation,
        })
    }

    /// Apply the outcome of an outstanding request.
    ///
    /// On success the records are appended and the cursor advances (or is
    /// cleared at end-of-stream); returns the number of records appended. On
    /// failure the timeline and cursor are left as they were and the error
    /// is returned after recording the reader-facing message.
    ///
    /// # Errors
    ///
    /// Returns the fetch error, or [`Error::Internal`] if the ticket belongs
    /// to a mount that has since been reset.
    pub fn finish_fetch(&mut self, pending: PendingFetch, result: Result<Page>) -> Result<usize> {
        if pending.generation != self.generation {
            return Err(Error::internal("discarded fetch from a previous mount"));
        }

        match result {
            Ok(page) => {
                let count = page.records.len();
                self.cursor = page.next_cursor().map(str::to_string);
                self.timeline.append(page.records);
                self.pages_loaded += 1;
                self.state = FetchState::Loaded;
                info!(
                    appended = count,
                    total = self.timeline.len(),
                    more = self.cursor.is_some(),
                    "page loaded"
                );
                Ok(count)
            }
            Err(err) => {
                warn!(cursor = ?pending.cursor, "error fetching records: {err}");
                self.error = Some(FETCH_ERROR_MESSAGE.to_string());
                self.state = FetchState::Error;
                Err(err)
            }
        }
    }

    /// Fetch the page at the current cursor.
    ///
    /// After a failure this retries the same page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchInFlight`] when a request is outstanding,
    /// [`Error::NoMorePages`] after end-of-stream, or the error from the page
    /// source.
    pub async fn fetch_page(&mut self) -> Result<usize> {
        let pending = self.begin_fetch()?;
        let result = self.source.fetch(pending.cursor()).await;
        self.finish_fetch(pending, result)
    }

    /// Initial fetch for this mount.
    ///
    /// Runs once; later calls return `Ok(false)` without fetching.
    ///
    /// # Errors
    ///
    /// Returns the error from the first page fetch.
    pub async fn activate(&mut self) -> Result<bool> {
        if self.activated {
            return Ok(false);
        }
        self.activated = true;
        self.fetch_page().await?;
        Ok(true)
    }

    /// Fetch the next page in response to an explicit trigger.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchInFlight`] while loading, [`Error::NoMorePages`]
    /// when there is no cursor, or the error from the page source.
    pub async fn load_more(&mut self) -> Result<usize> {
        if self.is_loading() {
            return Err(Error::FetchInFlight);
        }
        if self.cursor.is_none() {
            return Err(Error::NoMorePages);
        }
        self.fetch_page().await
    }

    /// Activate, then follow cursors until end-of-stream or `max_pages`
    /// pages have been fetched by this call.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first fetch error; pages loaded before it
    /// stay in the timeline.
    pub async fn drain(&mut self, max_pages: Option<usize>) -> Result<usize> {
        let mut fetched = 0;
        let within_limit = |n: usize| max_pages.map_or(true, |max| n < max);

        if !self.activated && within_limit(fetched) {
            self.activate().await?;
            fetched += 1;
        }
        while self.can_load_more() && within_limit(fetched) {
            self.load_more().await?;
            fetched += 1;
        }
        Ok(fetched)
    }

    /// Drop everything and return to a fresh, unactivated mount.
    pub fn remount(&mut self) {
        self.timeline.reset();
        self.cursor = None;
        self.state = FetchState::Idle;
        self.error = None;
        self.activated = false;
        self.pages_loaded = 0;
        self.generation += 1;
    }
}
