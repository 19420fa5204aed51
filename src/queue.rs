use dashmap::DashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outcome of offering a domain to the classification queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    Accepted,
    Duplicate,
    Full,
}

/// Bounded, deduplicating, single-consumer queue feeding the Classifier.
///
/// A domain that is queued or in flight is tracked in `in_flight` until
/// `complete` is called; `offer` consults that set so the same domain is
/// never classified twice concurrently. On overflow the newest enqueue is
/// dropped (not the oldest), so work already in flight is never starved.
pub struct ClassificationQueue {
    sender: mpsc::Sender<String>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<String>>,
    in_flight: Arc<DashSet<String>>,
}

impl ClassificationQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: tokio::sync::Mutex::new(receiver),
            in_flight: Arc::new(DashSet::new()),
        }
    }

    /// Offer `domain` for classification. Non-blocking.
    pub fn offer(&self, domain: &str) -> OfferOutcome {
        if !self.in_flight.insert(domain.to_string()) {
            return OfferOutcome::Duplicate;
        }

        match self.sender.try_send(domain.to_string()) {
            Ok(()) => OfferOutcome::Accepted,
            Err(_) => {
                // Either full or the receiver is gone; either way this
                // enqueue didn't happen, so release the in-flight mark.
                self.in_flight.remove(domain);
                OfferOutcome::Full
            }
        }
    }

    /// Block until a domain is available. Only the Classifier calls this.
    pub async fn take(&self) -> Option<String> {
        self.receiver.lock().await.recv().await
    }

    /// Clear `domain`'s in-flight mark. Must be called on every exit path
    /// once the Classifier has finished with a domain, successfully or not.
    pub fn complete(&self, domain: &str) {
        self.in_flight.remove(domain);
    }

    pub fn depth(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_offer_is_rejected_until_complete() {
        let queue = ClassificationQueue::new(8);
        assert_eq!(queue.offer("a.example.com."), OfferOutcome::Accepted);
        assert_eq!(queue.offer("a.example.com."), OfferOutcome::Duplicate);
        queue.complete("a.example.com.");
        assert_eq!(queue.offer("a.example.com."), OfferOutcome::Accepted);
    }

    #[test]
    fn overflow_drops_the_newest_enqueue() {
        let queue = ClassificationQueue::new(1);
        assert_eq!(queue.offer("a.example.com."), OfferOutcome::Accepted);
        assert_eq!(queue.offer("b.example.com."), OfferOutcome::Full);
        // The in-flight mark for the dropped domain must be released so a
        // later offer can succeed once there's room.
        assert_eq!(queue.depth(), 1);
    }

    #[tokio::test]
    async fn take_returns_offered_domains_in_order() {
        let queue = ClassificationQueue::new(8);
        queue.offer("a.example.com.");
        queue.offer("b.example.com.");
        assert_eq!(queue.take().await.as_deref(), Some("a.example.com."));
        assert_eq!(queue.take().await.as_deref(), Some("b.example.com."));
    }
}
