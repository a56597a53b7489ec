//! Vote dispatch with an in-flight guard.
//!
//! A vote is two store round-trips, awaited in order: write the new direction,
//! then re-tabulate the comment's votes.  The UI only redraws the karma from
//! the tabulated result, never from a guess.
//!
//! While a round-trip is outstanding for a comment, further votes on that
//! comment are refused, so two quick clicks cannot land out of order.
//!
//! # Render states
//! ```text
//!  Normal          — no vote outstanding
//!  PendingVisible  — outstanding, pulse-on frame
//!  PendingHidden   — outstanding, pulse-off frame
//!  TimedOut        — outstanding for longer than VOTE_SLOW_AFTER
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thread_proto::model::VoteSet;
use thread_proto::store::{SocialStore, StoreError};
use thread_proto::votes::Vote;
use tracing::debug;

/// After this long a pending vote renders with the warning colour.
pub const VOTE_SLOW_AFTER: Duration = Duration::from_millis(3000);

/// How to render a comment's karma while a vote may be outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderHint {
    #[default]
    Normal,
    PendingVisible,
    PendingHidden,
    TimedOut,
}

/// Comment URLs with a vote round-trip outstanding.
#[derive(Debug, Default)]
pub struct InFlightVotes {
    pending: HashMap<String, Instant>,
}

impl InFlightVotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `url`.  Returns `false` if a vote for it is already outstanding.
    pub fn begin(&mut self, url: &str) -> bool {
        if self.pending.contains_key(url) {
            return false;
        }
        self.pending.insert(url.to_string(), Instant::now());
        true
    }

    pub fn finish(&mut self, url: &str) {
        self.pending.remove(url);
    }

    #[cfg(test)]
    pub fn is_pending(&self, url: &str) -> bool {
        self.pending.contains_key(url)
    }

    pub fn render_hint(&self, url: &str) -> RenderHint {
        let Some(since) = self.pending.get(url) else {
            return RenderHint::Normal;
        };
        let elapsed = since.elapsed();
        if elapsed >= VOTE_SLOW_AFTER {
            return RenderHint::TimedOut;
        }
        // Pulse on/off every 400ms
        if (elapsed.as_millis() / 400) % 2 == 0 {
            RenderHint::PendingVisible
        } else {
            RenderHint::PendingHidden
        }
    }

    /// Hints for every outstanding URL, for publishing into `AppState`.
    pub fn hints(&self) -> HashMap<String, RenderHint> {
        self.pending
            .keys()
            .map(|url| (url.clone(), self.render_hint(url)))
            .collect()
    }
}

/// Result of one vote round-trip.
#[derive(Debug)]
pub struct VoteOutcome {
    pub url: String,
    pub result: Result<VoteSet, StoreError>,
}

/// Write `direction` for `url`, then fetch the authoritative tally.
///
/// The two calls are strictly sequential; a failed write skips the tabulate.
pub async fn cast_and_tabulate(
    store: &dyn SocialStore,
    url: &str,
    direction: Vote,
) -> Result<VoteSet, StoreError> {
    store.put_vote(url, direction).await?;
    store.tabulate_votes(url).await
}

pub struct VoteDispatcher {
    store: Arc<dyn SocialStore>,
    in_flight: InFlightVotes,
}

impl VoteDispatcher {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self {
            store,
            in_flight: InFlightVotes::new(),
        }
    }

    /// Start a vote round-trip for `url`.
    ///
    /// Returns the future to drive (the caller spawns it), or `None` when a
    /// vote for the same comment is still outstanding.  Call [`finish`] with
    /// the outcome's URL once it resolves.
    ///
    /// [`finish`]: VoteDispatcher::finish
    pub fn dispatch(
        &mut self,
        url: String,
        direction: Vote,
    ) -> Option<impl Future<Output = VoteOutcome> + Send + 'static> {
        if !self.in_flight.begin(&url) {
            debug!("vote on {} ignored: previous vote still in flight", url);
            return None;
        }
        debug!("vote on {} -> {:?}", url, direction);
        let store = Arc::clone(&self.store);
        Some(async move {
            let result = cast_and_tabulate(store.as_ref(), &url, direction).await;
            VoteOutcome { url, result }
        })
    }

    pub fn finish(&mut self, url: &str) {
        self.in_flight.finish(url);
    }

    #[cfg(test)]
    pub fn is_pending(&self, url: &str) -> bool {
        self.in_flight.is_pending(url)
    }

    pub fn hints(&self) -> HashMap<String, RenderHint> {
        self.in_flight.hints()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use thread_proto::model::{Comment, Drive};

    /// Store double that records calls in order and can be told to fail writes.
    pub(crate) struct RecordingStore {
        user: Drive,
        pub calls: Mutex<Vec<String>>,
        pub votes: Mutex<HashMap<String, Vote>>,
        pub fail_put: bool,
    }

    impl RecordingStore {
        pub(crate) fn new(user_url: &str) -> Self {
            Self {
                user: Drive::new(user_url, "Me"),
                calls: Mutex::new(Vec::new()),
                votes: Mutex::new(HashMap::new()),
                fail_put: false,
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SocialStore for RecordingStore {
        fn user(&self) -> &Drive {
            &self.user
        }

        async fn put_vote(&self, url: &str, vote: Vote) -> Result<(), StoreError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("put {} {}", url, vote.as_i8()));
            if self.fail_put {
                return Err(StoreError::NotFound(url.to_string()));
            }
            self.votes.lock().unwrap().insert(url.to_string(), vote);
            Ok(())
        }

        async fn tabulate_votes(&self, url: &str) -> Result<VoteSet, StoreError> {
            self.calls.lock().unwrap().push(format!("tabulate {}", url));
            let mut set = VoteSet::default();
            match self.votes.lock().unwrap().get(url) {
                Some(Vote::Up) => set.upvotes.push(self.user.clone()),
                Some(Vote::Down) => set.downvotes.push(self.user.clone()),
                _ => {}
            }
            Ok(set)
        }

        async fn list_thread(&self, _href: &str) -> Result<Vec<Comment>, StoreError> {
            Ok(Vec::new())
        }

        async fn add_comment(
            &self,
            href: &str,
            _parent: Option<&str>,
            _content: &str,
        ) -> Result<Comment, StoreError> {
            Err(StoreError::NotFound(href.to_string()))
        }

        async fn remove_comment(&self, url: &str) -> Result<(), StoreError> {
            Err(StoreError::NotFound(url.to_string()))
        }
    }

    #[tokio::test]
    async fn test_cast_then_tabulate_in_order() {
        let store = RecordingStore::new("hyper://me");
        let set = cast_and_tabulate(&store, "hyper://c/1", Vote::Up).await.unwrap();
        assert_eq!(set.upvotes.len(), 1);
        assert_eq!(store.calls(), vec!["put hyper://c/1 1", "tabulate hyper://c/1"]);
    }

    #[tokio::test]
    async fn test_failed_write_skips_tabulate() {
        let mut store = RecordingStore::new("hyper://me");
        store.fail_put = true;
        assert!(cast_and_tabulate(&store, "hyper://c/1", Vote::Down).await.is_err());
        assert_eq!(store.calls(), vec!["put hyper://c/1 -1"]);
    }

    #[tokio::test]
    async fn test_retract_already_upvoted() {
        let store = Arc::new(RecordingStore::new("hyper://me"));
        store
            .votes
            .lock()
            .unwrap()
            .insert("hyper://c/1".to_string(), Vote::Up);
        let comment = Comment {
            url: "hyper://c/1".into(),
            drive: Drive::new("hyper://other", "Other"),
            content: "x".into(),
            ctime: chrono::Utc::now(),
            href: None,
            parent: None,
            votes: Some(VoteSet {
                upvotes: vec![Drive::new("hyper://me", "Me")],
                downvotes: vec![],
            }),
            replies: vec![],
        };
        let current = thread_proto::votes::user_vote_of(Some(&comment), "hyper://me");
        let direction = Vote::toggled(current, Vote::Up);
        assert_eq!(direction, Vote::Neutral);

        let mut dispatcher = VoteDispatcher::new(store.clone());
        let fut = dispatcher.dispatch(comment.url.clone(), direction).unwrap();
        let outcome = fut.await;
        dispatcher.finish(&outcome.url);

        assert_eq!(store.calls(), vec!["put hyper://c/1 0", "tabulate hyper://c/1"]);
        let mut patched = comment.clone();
        patched.votes = Some(outcome.result.unwrap());
        assert_eq!(
            thread_proto::votes::user_vote_of(Some(&patched), "hyper://me"),
            Vote::Neutral
        );
    }

    #[tokio::test]
    async fn test_in_flight_guard_refuses_second_vote() {
        let store = Arc::new(RecordingStore::new("hyper://me"));
        let mut dispatcher = VoteDispatcher::new(store.clone());

        let first = dispatcher.dispatch("hyper://c/1".into(), Vote::Up);
        assert!(first.is_some());
        assert!(dispatcher.is_pending("hyper://c/1"));
        assert!(dispatcher.dispatch("hyper://c/1".into(), Vote::Down).is_none());
        // Other comments are not blocked.
        assert!(dispatcher.dispatch("hyper://c/2".into(), Vote::Up).is_some());

        let outcome = first.unwrap().await;
        dispatcher.finish(&outcome.url);
        assert!(!dispatcher.is_pending("hyper://c/1"));
        assert!(dispatcher.dispatch("hyper://c/1".into(), Vote::Down).is_some());
    }

    #[test]
    fn test_render_hint_normal_when_idle() {
        let mut votes = InFlightVotes::new();
        assert_eq!(votes.render_hint("a"), RenderHint::Normal);
        assert!(votes.begin("a"));
        assert_eq!(votes.render_hint("a"), RenderHint::PendingVisible);
        assert_eq!(votes.hints().len(), 1);
        votes.finish("a");
        assert!(votes.hints().is_empty());
    }
}
