//! Face abstraction over the named-data network.
//!
//! A producer registers name prefixes and receives every interest under
//! them through an [`InterestHandler`]; it answers by putting [`Data`]
//! packets. A consumer expresses interests and waits for matching data.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chronostate_core::Name;

use crate::error::Result;
use crate::packet::{Data, Interest};

/// Callback invoked on the network context for each interest under a
/// registered prefix. Receives the registered prefix and the interest.
///
/// Handlers must not block: anything slow belongs on a worker.
pub type InterestHandler = Arc<dyn Fn(&Name, Interest) + Send + Sync>;

/// Identifies one prefix registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisteredPrefixId(pub u64);

/// Producer side of a face.
#[async_trait]
pub trait Face: Send + Sync {
    /// Start delivering interests under `prefix` to `handler`.
    async fn register_prefix(
        &self,
        prefix: Name,
        handler: InterestHandler,
    ) -> Result<RegisteredPrefixId>;

    /// Stop delivering interests for a registration.
    async fn unregister_prefix(&self, id: RegisteredPrefixId) -> Result<()>;

    /// Publish a data packet.
    async fn put_data(&self, data: Data) -> Result<()>;
}

/// Consumer side of a face.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Express an interest and wait up to `timeout` for matching data.
    ///
    /// Returns `None` on timeout.
    async fn express_interest(&self, interest: Interest, timeout: Duration) -> Result<Option<Data>>;
}

/// An in-process forwarder for tests and local tooling.
///
/// Interests go to the longest registered prefix that matches. Published
/// data lands in a content store. A packet answers the interests pending
/// when it arrives; later interests get it only while it is fresh, and
/// packets without a freshness period are never fresh.
pub mod memory {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    use tokio::sync::{Notify, RwLock};
    use tokio::time::Instant;
    use tracing::{debug, trace};

    use crate::error::FaceError;

    struct Registration {
        id: RegisteredPrefixId,
        prefix: Name,
        handler: InterestHandler,
    }

    struct Cached {
        data: Data,
        stored: Instant,
    }

    impl Cached {
        fn is_fresh(&self) -> bool {
            self.data
                .freshness
                .is_some_and(|period| self.stored.elapsed() < period)
        }
    }

    /// In-memory face implementation.
    pub struct MemoryFace {
        next_id: AtomicU64,
        closed: AtomicBool,
        registrations: RwLock<Vec<Registration>>,
        /// Every packet put, in publication order.
        content: RwLock<Vec<Cached>>,
        published: Notify,
    }

    impl MemoryFace {
        /// Create a new memory face.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Hand an interest to the longest matching registration.
        ///
        /// Returns `false` if no registered prefix matched.
        pub async fn deliver(&self, interest: Interest) -> bool {
            let target = {
                let registrations = self.registrations.read().await;
                registrations
                    .iter()
                    .filter(|r| interest.name.starts_with(&r.prefix))
                    .max_by_key(|r| r.prefix.len())
                    .map(|r| (r.prefix.clone(), r.handler.clone()))
            };

            match target {
                Some((prefix, handler)) => {
                    trace!(name = %interest.name, prefix = %prefix, "delivering interest");
                    handler(&prefix, interest);
                    true
                }
                None => {
                    debug!(name = %interest.name, "no route for interest");
                    false
                }
            }
        }

        /// Snapshot of every data packet published so far.
        pub async fn published(&self) -> Vec<Data> {
            let content = self.content.read().await;
            content.iter().map(|c| c.data.clone()).collect()
        }

        /// The most recent packet published under exactly `name`.
        pub async fn data_for(&self, name: &Name) -> Option<Data> {
            let content = self.content.read().await;
            content
                .iter()
                .rev()
                .find(|c| &c.data.name == name)
                .map(|c| c.data.clone())
        }

        /// Wait until a packet is published under exactly `name`.
        pub async fn wait_for(&self, name: &Name, timeout: Duration) -> Option<Data> {
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let notified = self.published.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if let Some(data) = self.data_for(name).await {
                    return Some(data);
                }
                if tokio::time::timeout_at(deadline, notified).await.is_err() {
                    return None;
                }
            }
        }

        /// Currently registered prefixes.
        pub async fn registered_prefixes(&self) -> Vec<Name> {
            let registrations = self.registrations.read().await;
            registrations.iter().map(|r| r.prefix.clone()).collect()
        }

        /// Reject all further publications.
        pub fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }

        /// Newest packet for `interest` that is fresh, or that was stored at
        /// or past position `pending_from` of the content store.
        async fn lookup(&self, interest: &Interest, pending_from: Option<usize>) -> Option<Data> {
            let content = self.content.read().await;
            content
                .iter()
                .enumerate()
                .rev()
                .filter(|(_, c)| c.data.satisfies(interest))
                .find(|(i, c)| pending_from.is_some_and(|from| *i >= from) || c.is_fresh())
                .map(|(_, c)| c.data.clone())
        }
    }

    impl Default for MemoryFace {
        fn default() -> Self {
            Self {
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                registrations: RwLock::new(Vec::new()),
                content: RwLock::new(Vec::new()),
                published: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl Face for MemoryFace {
        async fn register_prefix(
            &self,
            prefix: Name,
            handler: InterestHandler,
        ) -> Result<RegisteredPrefixId> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(FaceError::Closed);
            }
            let id = RegisteredPrefixId(self.next_id.fetch_add(1, Ordering::SeqCst));
            debug!(prefix = %prefix, id = id.0, "registered prefix");
            self.registrations.write().await.push(Registration {
                id,
                prefix,
                handler,
            });
            Ok(id)
        }

        async fn unregister_prefix(&self, id: RegisteredPrefixId) -> Result<()> {
            let mut registrations = self.registrations.write().await;
            let before = registrations.len();
            registrations.retain(|r| r.id != id);
            if registrations.len() == before {
                return Err(FaceError::PrefixNotRegistered(id.0));
            }
            debug!(id = id.0, "unregistered prefix");
            Ok(())
        }

        async fn put_data(&self, data: Data) -> Result<()> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(FaceError::Closed);
            }
            trace!(name = %data.name, len = data.content.len(), "put data");
            self.content.write().await.push(Cached {
                data,
                stored: Instant::now(),
            });
            self.published.notify_waiters();
            Ok(())
        }
    }

    #[async_trait]
    impl Consumer for MemoryFace {
        async fn express_interest(
            &self,
            interest: Interest,
            timeout: Duration,
        ) -> Result<Option<Data>> {
            let deadline = Instant::now() + timeout;
            let mut pending_from = None;

            loop {
                let notified = self.published.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if let Some(data) = self.lookup(&interest, pending_from).await {
                    return Ok(Some(data));
                }
                if pending_from.is_none() {
                    pending_from = Some(self.content.read().await.len());
                    if !self.deliver(interest.clone()).await {
                        return Ok(None);
                    }
                }
                if tokio::time::timeout_at(deadline, notified).await.is_err() {
                    return Ok(None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryFace;
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (InterestHandler, Arc<Mutex<Vec<Name>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: InterestHandler = Arc::new(move |_prefix, interest| {
            sink.lock().unwrap().push(interest.name);
        });
        (handler, seen)
    }

    #[tokio::test]
    async fn test_longest_prefix_wins() {
        let face = MemoryFace::new();
        let (short, short_seen) = recorder();
        let (long, long_seen) = recorder();

        face.register_prefix(Name::parse("/a").unwrap(), short).await.unwrap();
        face.register_prefix(Name::parse("/a/b").unwrap(), long).await.unwrap();

        assert!(face.deliver(Interest::new(Name::parse("/a/b/c").unwrap())).await);
        assert!(face.deliver(Interest::new(Name::parse("/a/x").unwrap())).await);
        assert!(!face.deliver(Interest::new(Name::parse("/z").unwrap())).await);

        assert_eq!(long_seen.lock().unwrap().len(), 1);
        assert_eq!(short_seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unregister() {
        let face = MemoryFace::new();
        let (handler, seen) = recorder();
        let id = face
            .register_prefix(Name::parse("/a").unwrap(), handler)
            .await
            .unwrap();

        face.unregister_prefix(id).await.unwrap();
        assert!(!face.deliver(Interest::new(Name::parse("/a/b").unwrap())).await);
        assert!(seen.lock().unwrap().is_empty());
        assert!(face.unregister_prefix(id).await.is_err());
    }

    #[tokio::test]
    async fn test_express_interest_answered_by_handler() {
        let face = MemoryFace::new();
        let producer = Arc::downgrade(&face);
        let handler: InterestHandler = Arc::new(move |_prefix, interest| {
            let producer = producer.clone();
            tokio::spawn(async move {
                if let Some(face) = producer.upgrade() {
                    face.put_data(Data::new(interest.name, "pong")).await.unwrap();
                }
            });
        });
        face.register_prefix(Name::parse("/ping").unwrap(), handler)
            .await
            .unwrap();

        let data = face
            .express_interest(
                Interest::new(Name::parse("/ping/1").unwrap()),
                Duration::from_secs(1),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&data.content[..], b"pong");
    }

    #[tokio::test]
    async fn test_express_interest_times_out() {
        let face = MemoryFace::new();
        let (handler, _seen) = recorder();
        face.register_prefix(Name::parse("/slow").unwrap(), handler)
            .await
            .unwrap();

        let data = face
            .express_interest(
                Interest::new(Name::parse("/slow/1").unwrap()),
                Duration::from_millis(50),
            )
            .await
            .unwrap();
        assert!(data.is_none());
    }

    /// Answers each interest with a packet counting how often it was asked.
    async fn counter(face: &Arc<MemoryFace>, freshness: Option<Duration>) -> Arc<Mutex<u32>> {
        let count = Arc::new(Mutex::new(0u32));
        let producer = Arc::downgrade(face);
        let calls = count.clone();
        let handler: InterestHandler = Arc::new(move |_prefix, interest| {
            let n = {
                let mut calls = calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            let producer = producer.clone();
            tokio::spawn(async move {
                if let Some(face) = producer.upgrade() {
                    let data = Data::new(interest.name, n.to_string()).with_freshness(freshness);
                    face.put_data(data).await.unwrap();
                }
            });
        });
        face.register_prefix(Name::parse("/cmd").unwrap(), handler)
            .await
            .unwrap();
        count
    }

    async fn ask(face: &MemoryFace) -> String {
        let data = face
            .express_interest(
                Interest::new(Name::parse("/cmd/run").unwrap()),
                Duration::from_secs(1),
            )
            .await
            .unwrap()
            .unwrap();
        String::from_utf8(data.content.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_stale_data_is_not_served_from_cache() {
        let face = MemoryFace::new();
        let count = counter(&face, Some(Duration::ZERO)).await;

        assert_eq!(ask(&face).await, "1");
        assert_eq!(ask(&face).await, "2");
        assert_eq!(*count.lock().unwrap(), 2);
        assert_eq!(face.published().await.len(), 2);
    }

    #[tokio::test]
    async fn test_fresh_data_is_served_from_cache() {
        let face = MemoryFace::new();
        let count = counter(&face, Some(Duration::from_secs(60))).await;

        assert_eq!(ask(&face).await, "1");
        assert_eq!(ask(&face).await, "1");
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_closed_face_rejects_put() {
        let face = MemoryFace::new();
        face.close();
        let err = face.put_data(Data::new(Name::new(), "x")).await;
        assert!(matches!(err, Err(crate::FaceError::Closed)));
    }
}
