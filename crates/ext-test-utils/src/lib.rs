//! Shared test fixtures for the ext-resolver workspace.
//!
//! This crate builds catalog content for tests so that suites do not repeat
//! JSON by hand. It is a dev-dependency only and never published.
//!
//! # Modules
//!
//! - [`catalog`]: [`CatalogBuilder`], [`BundleBuilder`] and [`ChannelBuilder`]
//! - [`dir`]: [`CatalogDir`], catalogs written to a temporary directory

pub mod catalog;
pub mod dir;

pub use catalog::{BundleBuilder, CatalogBuilder, ChannelBuilder, bundle_entity};
pub use dir::CatalogDir;
