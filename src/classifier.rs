use chrono::Utc;
use std::sync::Arc;

use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::metrics::FirewallMetrics;
use crate::model::{DomainList, ListSource, ListType};
use crate::moderator::Moderator;
use crate::queue::ClassificationQueue;
use crate::store::Store;

/// The single background worker draining the classification queue. Exactly
/// one instance runs at a time; the queue's in-flight set is what would let
/// a future worker pool parallelize this without double-classifying a
/// domain, not anything this worker does itself.
pub struct Classifier {
    store: Arc<dyn Store>,
    queue: Arc<ClassificationQueue>,
    fetcher: Fetcher,
    moderator: Moderator,
    ttl: chrono::Duration,
    metrics: Arc<FirewallMetrics>,
}

impl Classifier {
    pub fn new(
        store: Arc<dyn Store>,
        queue: Arc<ClassificationQueue>,
        config: &Config,
        metrics: Arc<FirewallMetrics>,
    ) -> Self {
        let fetcher = Fetcher::new(
            config.fetch_timeout,
            config.fetch_max_depth,
            config.fetch_max_pages,
            config.fetch_max_bytes,
        );
        let moderator = Moderator::new(config.openai_api_key.clone(), config.moderator_timeout);

        Self {
            store,
            queue,
            fetcher,
            moderator,
            ttl: config.llm_entry_ttl,
            metrics,
        }
    }

    /// Runs until the queue is closed (producer side dropped), honoring
    /// `shutdown_grace`: once shutdown is signaled, in-flight work is
    /// allowed to finish but no new `take()` is attempted past the grace
    /// window.
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::broadcast::Receiver<()>, grace: std::time::Duration) {
        loop {
            tokio::select! {
                domain = self.queue.take() => {
                    match domain {
                        Some(domain) => self.classify_one(&domain).await,
                        None => break,
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("classifier draining in-flight work before shutdown");
                    let _ = tokio::time::timeout(grace, self.drain()).await;
                    break;
                }
            }
        }
    }

    async fn drain(&self) {
        while let Ok(Some(domain)) = tokio::time::timeout(std::time::Duration::from_millis(50), self.queue.take()).await {
            self.classify_one(&domain).await;
        }
    }

    async fn classify_one(&self, domain: &str) {
        self.metrics.classification_queue_depth.set(self.queue.depth() as i64);

        let outcome = self.classify(domain).await;
        if let Err(e) = outcome {
            tracing::warn!(domain, error = %e, "classification failed");
        }
        self.metrics.classifications_completed.inc();
        self.queue.complete(domain);
        self.metrics.classification_queue_depth.set(self.queue.depth() as i64);
    }

    async fn classify(&self, domain: &str) -> crate::error::Result<()> {
        // A racing writer may have classified this domain between offer
        // and take; re-check rather than overwrite.
        if !self.store.list_active_entries(domain).await?.is_empty() {
            return Ok(());
        }

        let text = self.fetcher.fetch(domain).await;
        let harmful = self.moderator.moderate(&text).await;

        let list_type = if harmful { ListType::Blacklist } else { ListType::Whitelist };
        let now = Utc::now();
        let entry = DomainList {
            domain: domain.to_string(),
            list_type,
            source: ListSource::Llm,
            created_at: now,
            expires_at: Some(now + self.ttl),
        };

        match self.store.insert_entry(&entry).await {
            Ok(()) => Ok(()),
            Err(crate::error::FirewallError::Conflict { .. }) => {
                // Someone else classified it first; their verdict wins.
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FirewallError, Result};
    use crate::model::User;
    use crate::store::EntryFilter;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum InsertOutcome {
        Succeed,
        Conflict,
        PanicIfCalled,
    }

    struct FakeStore {
        active: Vec<DomainList>,
        insert_outcome: InsertOutcome,
        inserted: Mutex<Vec<DomainList>>,
    }

    #[async_trait]
    impl Store for FakeStore {
        async fn list_active_entries(&self, _domain: &str) -> Result<Vec<DomainList>> {
            Ok(self.active.clone())
        }

        async fn list_entries(&self, _filter: &EntryFilter, _offset: i64, _limit: i64) -> Result<(Vec<DomainList>, i64)> {
            unimplemented!("not exercised by classifier tests")
        }

        async fn insert_entry(&self, entry: &DomainList) -> Result<()> {
            match self.insert_outcome {
                InsertOutcome::Succeed => {
                    self.inserted.lock().unwrap().push(entry.clone());
                    Ok(())
                }
                InsertOutcome::Conflict => Err(FirewallError::Conflict {
                    domain: entry.domain.clone(),
                    list_type: entry.list_type,
                    source: entry.source,
                }),
                InsertOutcome::PanicIfCalled => panic!("insert_entry should not be called"),
            }
        }

        async fn delete_entry(&self, _domain: &str, _list_type: ListType, _source: ListSource) -> Result<()> {
            unimplemented!("not exercised by classifier tests")
        }

        async fn append_log(&self, _log: &crate::model::DomainLog) -> Result<()> {
            unimplemented!("not exercised by classifier tests")
        }

        async fn list_logs(&self, _offset: i64, _limit: i64, _keyword: Option<&str>) -> Result<(Vec<crate::model::DomainLog>, i64)> {
            unimplemented!("not exercised by classifier tests")
        }

        async fn find_user(&self, _username: &str) -> Result<Option<User>> {
            unimplemented!("not exercised by classifier tests")
        }

        async fn insert_user(&self, _user: &User) -> Result<()> {
            unimplemented!("not exercised by classifier tests")
        }

        async fn stats(&self) -> Result<Vec<(ListType, ListSource, i64)>> {
            unimplemented!("not exercised by classifier tests")
        }
    }

    fn classifier_with(store: FakeStore, queue: Arc<ClassificationQueue>) -> Classifier {
        let config = Config::default();
        let metrics = Arc::new(FirewallMetrics::new().unwrap());
        Classifier::new(Arc::new(store), queue, &config, metrics)
    }

    // "exa mple" embeds a space, which fails `Url::parse` before any socket
    // is opened -- `Fetcher::fetch` resolves to an empty string with no
    // network access, keeping this test hermetic.
    const UNREACHABLE_DOMAIN: &str = "exa mple.test.";

    #[tokio::test]
    async fn classify_skips_a_domain_already_active() {
        let active = vec![DomainList {
            domain: "example.com.".to_string(),
            list_type: ListType::Blacklist,
            source: ListSource::Manual,
            created_at: Utc::now(),
            expires_at: None,
        }];
        let store = FakeStore {
            active,
            insert_outcome: InsertOutcome::PanicIfCalled,
            inserted: Mutex::new(Vec::new()),
        };
        let queue = Arc::new(ClassificationQueue::new(8));
        let classifier = classifier_with(store, queue);

        classifier.classify("example.com.").await.unwrap();
    }

    #[tokio::test]
    async fn classifier_treats_an_insert_conflict_as_a_successful_classification() {
        let store = FakeStore {
            active: Vec::new(),
            insert_outcome: InsertOutcome::Conflict,
            inserted: Mutex::new(Vec::new()),
        };
        let queue = Arc::new(ClassificationQueue::new(8));
        let classifier = classifier_with(store, queue);

        let result = classifier.classify(UNREACHABLE_DOMAIN).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn classify_one_releases_the_queue_slot_on_every_exit_path() {
        let store = FakeStore {
            active: Vec::new(),
            insert_outcome: InsertOutcome::Succeed,
            inserted: Mutex::new(Vec::new()),
        };
        let queue = Arc::new(ClassificationQueue::new(8));
        queue.offer(UNREACHABLE_DOMAIN);
        assert_eq!(queue.depth(), 1);

        let classifier = classifier_with(store, queue.clone());
        classifier.classify_one(UNREACHABLE_DOMAIN).await;

        assert_eq!(queue.depth(), 0);
    }
}
