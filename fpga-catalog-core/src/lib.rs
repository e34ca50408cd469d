//! Catalog data model, version ordering and update diffing.
//!
//! Nothing in this crate touches the network or a database; see
//! `fpga-catalog-remote` for fetching and installing, and `fpga-catalog-db`
//! for the SQLite store.

pub mod diff;
pub mod reference;
pub mod settings;
pub mod store;
pub mod types;
pub mod validate;
pub mod version;

pub use diff::{AppliedEntries, Folded, diff, merge_applied};
pub use reference::VersionedRef;
pub use settings::{Overrides, Setting, SettingSource, Settings, SettingsError};
pub use store::{CatalogRow, CatalogStore, NewCatalogRow, Registered};
pub use types::*;
pub use validate::{Document, UniqueNamed, Validate, ValidationError};
pub use version::{Tagged, Versioned, compare, compare_desc, latest_of, latest_tagged, version_of};
