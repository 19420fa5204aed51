//! The list store: a typed repository over a single SQL database holding
//! `DomainList` entries, `DomainLog` events and `User` credentials.
//!
//! Kept narrow on purpose -- the Resolver needs one parameterized lookup per
//! query, not a query builder, so SQL generation never sits on the hot path.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{DomainList, DomainLog, ListSource, ListType, User};

/// Filters accepted by [`Store::list_entries`]. `None` means "don't filter
/// on this column"; `active_only` additionally restricts to entries active
/// at the instant the query runs.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub source: Option<ListSource>,
    pub list_type: Option<ListType>,
    pub active_only: bool,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn list_active_entries(&self, domain: &str) -> Result<Vec<DomainList>>;

    async fn list_entries(
        &self,
        filter: &EntryFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<DomainList>, i64)>;

    /// Inserts `entry`. Returns `Err(FirewallError::Conflict { .. })` if
    /// `domain` is already present, regardless of the existing row's
    /// `list_type`/`source` -- the uniqueness invariant is on `domain` alone.
    async fn insert_entry(&self, entry: &DomainList) -> Result<()>;

    /// Deletes the row matching `(domain, list_type, source)`. For
    /// `source=llm` the row must additionally be active at the time of
    /// deletion, or this returns `NotFound` just as if the row didn't exist.
    async fn delete_entry(&self, domain: &str, list_type: ListType, source: ListSource) -> Result<()>;

    async fn append_log(&self, log: &DomainLog) -> Result<()>;

    /// When `keyword` is given, rows are ranked by fuzzy-match score over
    /// `domain` (descending) instead of recency, and `total` counts only
    /// matched rows.
    async fn list_logs(
        &self,
        offset: i64,
        limit: i64,
        keyword: Option<&str>,
    ) -> Result<(Vec<DomainLog>, i64)>;

    async fn find_user(&self, username: &str) -> Result<Option<User>>;

    /// Used only by the offline admin bootstrap tool -- the Control API
    /// never creates users itself.
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Aggregate counts by `(list_type, source)`, for `/api/lists/stats`.
    async fn stats(&self) -> Result<Vec<(ListType, ListSource, i64)>>;
}
