use chrono::Utc;
use std::sync::Arc;

use crate::dns::DnsPacket;
use crate::forwarder::UpstreamForwarder;
use crate::metrics::FirewallMetrics;
use crate::model::{DomainLog, DomainStatus, ListType};
use crate::queue::{ClassificationQueue, OfferOutcome};
use crate::store::Store;

/// The hot path: classify a query against the Store, log the decision, and
/// either synthesize a blocking answer or forward upstream.
pub struct Resolver {
    store: Arc<dyn Store>,
    forwarder: UpstreamForwarder,
    queue: Arc<ClassificationQueue>,
    metrics: Arc<FirewallMetrics>,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn Store>,
        forwarder: UpstreamForwarder,
        queue: Arc<ClassificationQueue>,
        metrics: Arc<FirewallMetrics>,
    ) -> Self {
        Self {
            store,
            forwarder,
            queue,
            metrics,
        }
    }

    /// Handles one raw query datagram, returning the raw bytes to send
    /// back to the client, or `None` if the query should be dropped
    /// silently (malformed input, per DNS convention).
    pub async fn resolve(&self, raw: &[u8]) -> Option<Vec<u8>> {
        let packet = match DnsPacket::parse(raw) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::debug!(error = %e, "dropping unparseable query");
                self.metrics.queries_parse_failed.inc();
                return None;
            }
        };

        let qname = packet.qname()?;
        let status = self.decide(&qname).await;
        self.log(&qname, status).await;

        match status {
            DomainStatus::Blocked => {
                self.metrics.queries_blocked.inc();
                packet.blocking_response().ok()
            }
            DomainStatus::Allowed | DomainStatus::Reviewed => {
                if status == DomainStatus::Reviewed {
                    self.metrics.queries_reviewed.inc();
                    self.enqueue_for_classification(&qname);
                } else {
                    self.metrics.queries_allowed.inc();
                }

                match self.forwarder.forward(raw).await {
                    Ok(response) => Some(response),
                    Err(e) => {
                        tracing::warn!(domain = %qname, error = %e, "upstream forward failed");
                        self.metrics.upstream_failures.inc();
                        packet.servfail_response().ok()
                    }
                }
            }
        }
    }

    /// Applies the decision rule: blacklist wins over whitelist when both
    /// exist (a theoretical tie-break only, given the Store's uniqueness
    /// invariant on `domain`); a Store read failure degrades to reviewed.
    async fn decide(&self, qname: &str) -> DomainStatus {
        match self.store.list_active_entries(qname).await {
            Ok(entries) => {
                if entries.iter().any(|e| e.list_type == ListType::Blacklist) {
                    DomainStatus::Blocked
                } else if entries.iter().any(|e| e.list_type == ListType::Whitelist) {
                    DomainStatus::Allowed
                } else {
                    DomainStatus::Reviewed
                }
            }
            Err(e) => {
                tracing::warn!(domain = %qname, error = %e, "store read failed, treating as reviewed");
                DomainStatus::Reviewed
            }
        }
    }

    async fn log(&self, qname: &str, status: DomainStatus) {
        let log = DomainLog {
            domain: qname.to_string(),
            status,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.store.append_log(&log).await {
            tracing::warn!(domain = %qname, error = %e, "log append failed");
            self.metrics.log_append_failures.inc();
        }
    }

    fn enqueue_for_classification(&self, qname: &str) {
        match self.queue.offer(qname) {
            OfferOutcome::Accepted => {
                self.metrics.classification_queue_depth.set(self.queue.depth() as i64);
            }
            OfferOutcome::Duplicate => {}
            OfferOutcome::Full => {
                tracing::debug!(domain = %qname, "classification queue full, dropping enqueue");
                self.metrics.classification_queue_full.inc();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{DnsHeader, DnsQuestion, DnsType};
    use crate::error::{FirewallError, Result};
    use crate::model::{DomainList, ListSource, User};
    use crate::store::EntryFilter;
    use async_trait::async_trait;
    use tokio::net::UdpSocket;
    use tokio::sync::Mutex as AsyncMutex;

    struct FakeStore {
        active: Vec<DomainList>,
        fail: bool,
        logged: AsyncMutex<Vec<DomainLog>>,
    }

    impl FakeStore {
        fn with_entries(active: Vec<DomainList>) -> Self {
            Self {
                active,
                fail: false,
                logged: AsyncMutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                active: Vec::new(),
                fail: true,
                logged: AsyncMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Store for FakeStore {
        async fn list_active_entries(&self, _domain: &str) -> Result<Vec<DomainList>> {
            if self.fail {
                return Err(FirewallError::Config("store unavailable".into()));
            }
            Ok(self.active.clone())
        }

        async fn list_entries(&self, _filter: &EntryFilter, _offset: i64, _limit: i64) -> Result<(Vec<DomainList>, i64)> {
            unimplemented!("not exercised by resolver tests")
        }

        async fn insert_entry(&self, _entry: &DomainList) -> Result<()> {
            unimplemented!("not exercised by resolver tests")
        }

        async fn delete_entry(&self, _domain: &str, _list_type: ListType, _source: ListSource) -> Result<()> {
            unimplemented!("not exercised by resolver tests")
        }

        async fn append_log(&self, log: &DomainLog) -> Result<()> {
            self.logged.lock().await.push(log.clone());
            Ok(())
        }

        async fn list_logs(&self, _offset: i64, _limit: i64, _keyword: Option<&str>) -> Result<(Vec<DomainLog>, i64)> {
            unimplemented!("not exercised by resolver tests")
        }

        async fn find_user(&self, _username: &str) -> Result<Option<User>> {
            unimplemented!("not exercised by resolver tests")
        }

        async fn insert_user(&self, _user: &User) -> Result<()> {
            unimplemented!("not exercised by resolver tests")
        }

        async fn stats(&self) -> Result<Vec<(ListType, ListSource, i64)>> {
            unimplemented!("not exercised by resolver tests")
        }
    }

    fn entry(list_type: ListType) -> DomainList {
        DomainList {
            domain: "example.com.".to_string(),
            list_type,
            source: ListSource::Manual,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    fn resolver_with(store: FakeStore, upstream_addr: std::net::SocketAddr) -> (Resolver, Arc<ClassificationQueue>) {
        let queue = Arc::new(ClassificationQueue::new(8));
        let forwarder = UpstreamForwarder::new(upstream_addr, std::time::Duration::from_millis(200));
        let metrics = Arc::new(FirewallMetrics::new().unwrap());
        let resolver = Resolver::new(Arc::new(store), forwarder, queue.clone(), metrics);
        (resolver, queue)
    }

    fn build_query(qname: &str) -> Vec<u8> {
        let header = DnsHeader {
            id: 0xBEEF,
            rd: true,
            qdcount: 1,
            ..Default::default()
        };
        let labels = qname.trim_end_matches('.').split('.').map(str::to_string).collect();
        let question = DnsQuestion {
            labels,
            qtype: DnsType::A,
            qclass: crate::dns::DnsClass::In,
        };
        let packet = crate::dns::DnsPacket {
            header,
            questions: vec![question],
        };
        packet.serialize().unwrap()
    }

    #[tokio::test]
    async fn decide_blocks_when_a_blacklist_entry_is_present() {
        let store = FakeStore::with_entries(vec![entry(ListType::Blacklist)]);
        let (resolver, _queue) = resolver_with(store, "127.0.0.1:1".parse().unwrap());
        assert_eq!(resolver.decide("example.com.").await, DomainStatus::Blocked);
    }

    #[tokio::test]
    async fn decide_blacklist_wins_the_tie_break_when_both_lists_match() {
        let store = FakeStore::with_entries(vec![entry(ListType::Whitelist), entry(ListType::Blacklist)]);
        let (resolver, _queue) = resolver_with(store, "127.0.0.1:1".parse().unwrap());
        assert_eq!(resolver.decide("example.com.").await, DomainStatus::Blocked);
    }

    #[tokio::test]
    async fn decide_allows_when_only_whitelisted() {
        let store = FakeStore::with_entries(vec![entry(ListType::Whitelist)]);
        let (resolver, _queue) = resolver_with(store, "127.0.0.1:1".parse().unwrap());
        assert_eq!(resolver.decide("example.com.").await, DomainStatus::Allowed);
    }

    #[tokio::test]
    async fn decide_defaults_to_reviewed_with_no_matching_entries() {
        let store = FakeStore::with_entries(Vec::new());
        let (resolver, _queue) = resolver_with(store, "127.0.0.1:1".parse().unwrap());
        assert_eq!(resolver.decide("example.com.").await, DomainStatus::Reviewed);
    }

    #[tokio::test]
    async fn decide_degrades_to_reviewed_on_a_store_read_failure() {
        let store = FakeStore::failing();
        let (resolver, _queue) = resolver_with(store, "127.0.0.1:1".parse().unwrap());
        assert_eq!(resolver.decide("example.com.").await, DomainStatus::Reviewed);
    }

    #[tokio::test]
    async fn resolve_enqueues_a_reviewed_domain_for_classification() {
        let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];
            let (len, from) = upstream.recv_from(&mut buf).await.unwrap();
            upstream.send_to(&buf[..len], from).await.unwrap();
        });

        let store = FakeStore::with_entries(Vec::new());
        let (resolver, queue) = resolver_with(store, upstream_addr);

        let raw = build_query("unknown.example.com");
        let response = resolver.resolve(&raw).await;
        assert!(response.is_some());
        assert_eq!(queue.depth(), 1);
        assert_eq!(queue.take().await.as_deref(), Some("unknown.example.com."));
    }

    #[tokio::test]
    async fn resolve_returns_a_blocking_answer_without_contacting_upstream() {
        let store = FakeStore::with_entries(vec![entry(ListType::Blacklist)]);
        // A dead upstream would hang the forwarder if the blocked path ever
        // tried to forward; it must not.
        let (resolver, _queue) = resolver_with(store, "127.0.0.1:1".parse().unwrap());

        let raw = build_query("example.com");
        let response = resolver.resolve(&raw).await.unwrap();
        let ancount = u16::from_be_bytes([response[6], response[7]]);
        assert_eq!(ancount, 1);
        assert!(response.ends_with(&[0, 0, 0, 0]));
    }
}
