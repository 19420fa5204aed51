use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteConnectOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use super::{EntryFilter, Store};
use crate::error::{FirewallError, Result};
use crate::model::{DomainList, DomainLog, ListSource, ListType, User};

pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct DomainListRow {
    domain: String,
    list_type: String,
    source: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<DomainListRow> for DomainList {
    type Error = FirewallError;

    fn try_from(row: DomainListRow) -> Result<Self> {
        Ok(DomainList {
            domain: row.domain,
            list_type: ListType::from_str(&row.list_type)?,
            source: ListSource::from_str(&row.source)?,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DomainLogRow {
    domain: String,
    status: String,
    timestamp: DateTime<Utc>,
}

impl TryFrom<DomainLogRow> for DomainLog {
    type Error = FirewallError;

    fn try_from(row: DomainLogRow) -> Result<Self> {
        let status = match row.status.as_str() {
            "allowed" => crate::model::DomainStatus::Allowed,
            "blocked" => crate::model::DomainStatus::Blocked,
            "reviewed" => crate::model::DomainStatus::Reviewed,
            other => return Err(FirewallError::Config(format!("invalid log status: {other}"))),
        };
        Ok(DomainLog {
            domain: row.domain,
            status,
            timestamp: row.timestamp,
        })
    }
}

impl SqliteStore {
    /// Connect (creating the database file if needed) and ensure the schema
    /// exists. There's no migration framework here: three tables, known in
    /// advance, created with `IF NOT EXISTS` at startup.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| FirewallError::Config(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS domain_lists (
                domain TEXT PRIMARY KEY,
                list_type TEXT NOT NULL,
                source TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS domain_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                domain TEXT NOT NULL,
                status TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                hashed_password TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_domain_logs_timestamp ON domain_logs(timestamp)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn list_active_entries(&self, domain: &str) -> Result<Vec<DomainList>> {
        let rows: Vec<DomainListRow> =
            sqlx::query_as("SELECT domain, list_type, source, created_at, expires_at FROM domain_lists WHERE domain = ?")
                .bind(domain)
                .fetch_all(&self.pool)
                .await?;

        let now = Utc::now();
        rows.into_iter()
            .map(DomainList::try_from)
            .filter(|entry| entry.as_ref().map(|e| e.is_active_at(now)).unwrap_or(true))
            .collect()
    }

    async fn list_entries(
        &self,
        filter: &EntryFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<DomainList>, i64)> {
        let mut clauses = Vec::new();
        if filter.source.is_some() {
            clauses.push("source = ?");
        }
        if filter.list_type.is_some() {
            clauses.push("list_type = ?");
        }
        if filter.active_only {
            clauses.push("(expires_at IS NULL OR expires_at > ?)");
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let select_sql = format!(
            "SELECT domain, list_type, source, created_at, expires_at FROM domain_lists{where_clause} ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        let count_sql = format!("SELECT COUNT(*) AS count FROM domain_lists{where_clause}");

        let now = Utc::now();

        let mut select_query = sqlx::query_as::<_, DomainListRow>(&select_sql);
        let mut count_query = sqlx::query(&count_sql);

        if let Some(source) = filter.source {
            select_query = select_query.bind(source.as_str());
            count_query = count_query.bind(source.as_str());
        }
        if let Some(list_type) = filter.list_type {
            select_query = select_query.bind(list_type.as_str());
            count_query = count_query.bind(list_type.as_str());
        }
        if filter.active_only {
            select_query = select_query.bind(now);
            count_query = count_query.bind(now);
        }
        select_query = select_query.bind(limit).bind(offset);

        let rows = select_query.fetch_all(&self.pool).await?;
        let total: i64 = count_query.fetch_one(&self.pool).await?.try_get("count")?;

        let entries = rows
            .into_iter()
            .map(DomainList::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok((entries, total))
    }

    async fn insert_entry(&self, entry: &DomainList) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO domain_lists (domain, list_type, source, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&entry.domain)
        .bind(entry.list_type.as_str())
        .bind(entry.source.as_str())
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(FirewallError::Conflict {
                    domain: entry.domain.clone(),
                    list_type: entry.list_type,
                    source: entry.source,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_entry(&self, domain: &str, list_type: ListType, source: ListSource) -> Result<()> {
        let row: Option<DomainListRow> = sqlx::query_as(
            "SELECT domain, list_type, source, created_at, expires_at FROM domain_lists WHERE domain = ? AND list_type = ? AND source = ?",
        )
        .bind(domain)
        .bind(list_type.as_str())
        .bind(source.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let entry = match row {
            Some(row) => DomainList::try_from(row)?,
            None => return Err(FirewallError::NotFound(domain.to_string())),
        };

        if source == ListSource::Llm && !entry.is_active_at(Utc::now()) {
            return Err(FirewallError::NotFound(domain.to_string()));
        }

        sqlx::query("DELETE FROM domain_lists WHERE domain = ? AND list_type = ? AND source = ?")
            .bind(domain)
            .bind(list_type.as_str())
            .bind(source.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn append_log(&self, log: &DomainLog) -> Result<()> {
        sqlx::query("INSERT INTO domain_logs (domain, status, timestamp) VALUES (?, ?, ?)")
            .bind(&log.domain)
            .bind(log.status.as_str())
            .bind(log.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_logs(
        &self,
        offset: i64,
        limit: i64,
        keyword: Option<&str>,
    ) -> Result<(Vec<DomainLog>, i64)> {
        match keyword {
            None => {
                let rows: Vec<DomainLogRow> = sqlx::query_as(
                    "SELECT domain, status, timestamp FROM domain_logs ORDER BY timestamp DESC LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM domain_logs")
                    .fetch_one(&self.pool)
                    .await?
                    .try_get("count")?;
                let logs = rows.into_iter().map(DomainLog::try_from).collect::<Result<Vec<_>>>()?;
                Ok((logs, total))
            }
            Some(keyword) => {
                // Fuzzy ranking has no native SQL equivalent in sqlite, so
                // score every row in process and paginate the ranked slice.
                let rows: Vec<DomainLogRow> =
                    sqlx::query_as("SELECT domain, status, timestamp FROM domain_logs")
                        .fetch_all(&self.pool)
                        .await?;

                let needle = keyword.to_lowercase();
                let mut scored: Vec<(f64, DomainLogRow)> = rows
                    .into_iter()
                    .map(|row| {
                        let score = strsim::jaro_winkler(&row.domain.to_lowercase(), &needle);
                        (score, row)
                    })
                    .filter(|(score, _)| *score >= 0.7)
                    .collect();

                scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

                let total = scored.len() as i64;
                let page = scored
                    .into_iter()
                    .skip(offset.max(0) as usize)
                    .take(limit.max(0) as usize)
                    .map(|(_, row)| DomainLog::try_from(row))
                    .collect::<Result<Vec<_>>>()?;

                Ok((page, total))
            }
        }
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT username, hashed_password FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| User {
            username: row.get("username"),
            hashed_password: row.get("hashed_password"),
        }))
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query("INSERT INTO users (username, hashed_password) VALUES (?, ?)")
            .bind(&user.username)
            .bind(&user.hashed_password)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn stats(&self) -> Result<Vec<(ListType, ListSource, i64)>> {
        let rows = sqlx::query("SELECT list_type, source, COUNT(*) AS count FROM domain_lists GROUP BY list_type, source")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let list_type = ListType::from_str(row.get::<String, _>("list_type").as_str())?;
                let source = ListSource::from_str(row.get::<String, _>("source").as_str())?;
                let count: i64 = row.get("count");
                Ok((list_type, source, count))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::canonical_domain;

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn schema_is_created_on_a_fresh_file_backed_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("firewall.db");
        let url = format!("sqlite://{}", db_path.display());

        let store = SqliteStore::connect(&url).await.unwrap();
        assert!(db_path.exists());
        assert!(store.find_user("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_and_lookup_active_entry() {
        let store = memory_store().await;
        let domain = canonical_domain("ads.example.com");
        let entry = DomainList {
            domain: domain.clone(),
            list_type: ListType::Blacklist,
            source: ListSource::Manual,
            created_at: Utc::now(),
            expires_at: None,
        };
        store.insert_entry(&entry).await.unwrap();

        let active = store.list_active_entries(&domain).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].list_type, ListType::Blacklist);
    }

    #[tokio::test]
    async fn duplicate_insert_conflicts() {
        let store = memory_store().await;
        let domain = canonical_domain("ads.example.com");
        let entry = DomainList {
            domain: domain.clone(),
            list_type: ListType::Blacklist,
            source: ListSource::Manual,
            created_at: Utc::now(),
            expires_at: None,
        };
        store.insert_entry(&entry).await.unwrap();
        let err = store.insert_entry(&entry).await.unwrap_err();
        assert!(matches!(err, FirewallError::Conflict { .. }));
    }

    #[tokio::test]
    async fn expired_llm_entry_is_not_active() {
        let store = memory_store().await;
        let domain = canonical_domain("news.example.com");
        let entry = DomainList {
            domain: domain.clone(),
            list_type: ListType::Whitelist,
            source: ListSource::Llm,
            created_at: Utc::now() - chrono::Duration::hours(25),
            expires_at: Some(Utc::now() - chrono::Duration::hours(1)),
        };
        store.insert_entry(&entry).await.unwrap();

        let active = store.list_active_entries(&domain).await.unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn delete_requires_active_entry_for_llm_source() {
        let store = memory_store().await;
        let domain = canonical_domain("news.example.com");
        let entry = DomainList {
            domain: domain.clone(),
            list_type: ListType::Whitelist,
            source: ListSource::Llm,
            created_at: Utc::now() - chrono::Duration::hours(25),
            expires_at: Some(Utc::now() - chrono::Duration::hours(1)),
        };
        store.insert_entry(&entry).await.unwrap();

        let err = store
            .delete_entry(&domain, ListType::Whitelist, ListSource::Llm)
            .await
            .unwrap_err();
        assert!(matches!(err, FirewallError::NotFound(_)));
    }

    #[tokio::test]
    async fn fuzzy_log_search_ranks_closest_match_first() {
        let store = memory_store().await;
        for domain in ["facebook.com.", "fakebook.com.", "example.com."] {
            store
                .append_log(&DomainLog {
                    domain: domain.to_string(),
                    status: crate::model::DomainStatus::Allowed,
                    timestamp: Utc::now(),
                })
                .await
                .unwrap();
        }

        let (logs, total) = store.list_logs(0, 2, Some("facebook")).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(logs[0].domain, "facebook.com.");
        assert_eq!(logs[1].domain, "fakebook.com.");
    }
}
