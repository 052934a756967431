//! Filhaal Core Library
//!
//! Backend for a periodical publishing site: it aggregates debate documents
//! from a public site, merges them with locally uploaded ones, and re-serves
//! PDFs through an allowlisted proxy so browsers can render them inline.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`extract`] - Pure HTML extraction for listing and detail pages
//! - [`remote`] - Outbound page fetching
//! - [`debates`] - Merged catalog, identifier resolution, and uploads
//! - [`proxy`] - Allowlisted PDF proxy
//! - [`issues`] - Monthly issue publishing
//! - [`store`] - Persistence for debates, issues, and taxonomy terms
//! - [`storage`] - Remote object storage for uploaded PDFs
//! - [`auth`] - Bearer token callers and roles
//! - [`http`] - Routes, extractors, and error mapping
//! - [`config`] - Environment configuration
//! - [`db`] - Database connection and schema management

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod db;
pub mod debates;
pub mod extract;
pub mod http;
pub mod issues;
pub mod proxy;
pub mod remote;
pub mod storage;
pub mod store;
pub mod user_agent;

// Re-export commonly used types
pub use auth::{Authenticator, Caller, Role, StaticTokenAuthenticator};
pub use config::{Config, ConfigError, DatabaseLocation};
pub use db::{Database, DatabaseOptions};
pub use debates::{DebateCatalog, DebateError, DocumentDescriptor, DocumentId, SiteConfig};
pub use extract::{DetailExtraction, ListingEntry, extract_detail, extract_listing};
pub use http::{ApiError, AppState, router, serve};
pub use issues::{IssueError, IssuePublisher};
pub use proxy::{HostAllowlist, PdfDocument, ProxyError, SecureProxy};
pub use remote::{FetchError, FetchedPage, HttpPageFetcher, PageFetcher};
pub use storage::{ObjectStorage, StorageError};
