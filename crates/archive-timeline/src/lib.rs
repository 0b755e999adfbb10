//! `archive-timeline` - Paginated record relay with timeline and map rendering
//!
//! The gateway relays an authenticated, offset-paginated records API to
//! unauthenticated clients. The fetch client walks that relay page by page
//! into an append-only timeline, and the map renderer keeps point layers in
//! sync with the records it holds.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod map;
pub mod record;
pub mod timeline;

pub use client::{FetchState, HttpPageSource, PageSource, RecordFetchClient};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use map::{MapRenderer, MapSurface};
pub use record::{Page, Record};
pub use timeline::{TimelineEntry, TimelineState};
