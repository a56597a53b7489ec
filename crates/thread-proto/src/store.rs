//! Social store — the read/write surface the thread talks to.
//!
//! `SocialStore` is the narrow async interface the UI depends on.  `LocalStore`
//! is the file-backed implementation: a single JSON document holding drives,
//! comment records, and vote records, kept in memory behind an `RwLock` and
//! written back after every mutation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::model::{Comment, Drive, VoteSet};
use crate::votes::Vote;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no such comment: {0}")]
    NotFound(String),
    #[error("{0} is not authored by the current user")]
    NotAuthor(String),
    #[error("invalid vote direction: {0}")]
    InvalidVote(i8),
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store format error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the thread needs from the underlying social data.
#[async_trait]
pub trait SocialStore: Send + Sync {
    /// The signed-in user's drive.
    fn user(&self) -> &Drive;

    /// Set the current user's vote on `url`.  `Vote::Neutral` retracts.
    async fn put_vote(&self, url: &str, vote: Vote) -> Result<(), StoreError>;

    /// Recompute the authoritative vote set for `url`.
    async fn tabulate_votes(&self, url: &str) -> Result<VoteSet, StoreError>;

    /// All comments attached to `href`, nested by parent, oldest first.
    async fn list_thread(&self, href: &str) -> Result<Vec<Comment>, StoreError>;

    /// Publish a new comment (or reply, when `parent` is set) as the current user.
    async fn add_comment(
        &self,
        href: &str,
        parent: Option<&str>,
        content: &str,
    ) -> Result<Comment, StoreError>;

    /// Delete one of the current user's comments.
    async fn remove_comment(&self, url: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CommentRecord {
    url: String,
    drive_url: String,
    content: String,
    ctime: DateTime<Utc>,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    parent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VoteRecord {
    voter: String,
    target: String,
    vote: Vote,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    drives: Vec<Drive>,
    #[serde(default)]
    comments: Vec<CommentRecord>,
    #[serde(default)]
    votes: Vec<VoteRecord>,
}

impl StoreData {
    fn drive(&self, url: &str) -> Drive {
        self.drives
            .iter()
            .find(|d| d.url == url)
            .cloned()
            .unwrap_or_else(|| Drive::new(url, ""))
    }

    fn register_drive(&mut self, drive: &Drive) {
        match self.drives.iter_mut().find(|d| d.url == drive.url) {
            Some(existing) => {
                if !drive.title.is_empty() {
                    existing.title = drive.title.clone();
                }
            }
            None => self.drives.push(drive.clone()),
        }
    }

    fn set_vote(&mut self, voter: &str, target: &str, vote: Vote) {
        self.votes.retain(|v| !(v.voter == voter && v.target == target));
        if vote != Vote::Neutral {
            self.votes.push(VoteRecord {
                voter: voter.to_string(),
                target: target.to_string(),
                vote,
            });
        }
    }

    fn tabulate(&self, url: &str) -> VoteSet {
        let mut set = VoteSet::default();
        for v in self.votes.iter().filter(|v| v.target == url) {
            match v.vote {
                Vote::Up => set.upvotes.push(self.drive(&v.voter)),
                Vote::Down => set.downvotes.push(self.drive(&v.voter)),
                Vote::Neutral => {}
            }
        }
        set
    }

    fn thread(&self, href: &str) -> Vec<Comment> {
        let mut by_parent: HashMap<Option<&str>, Vec<&CommentRecord>> = HashMap::new();
        for rec in self
            .comments
            .iter()
            .filter(|c| c.href.as_deref() == Some(href))
        {
            by_parent.entry(rec.parent.as_deref()).or_default().push(rec);
        }
        for list in by_parent.values_mut() {
            list.sort_by(|a, b| a.ctime.cmp(&b.ctime).then_with(|| a.url.cmp(&b.url)));
        }
        self.build_level(None, &by_parent)
    }

    fn build_level<'a>(
        &self,
        parent: Option<&'a str>,
        by_parent: &HashMap<Option<&'a str>, Vec<&'a CommentRecord>>,
    ) -> Vec<Comment> {
        let Some(records) = by_parent.get(&parent) else {
            return Vec::new();
        };
        records
            .iter()
            .copied()
            .map(|rec| Comment {
                url: rec.url.clone(),
                drive: self.drive(&rec.drive_url),
                content: rec.content.clone(),
                ctime: rec.ctime,
                href: rec.href.clone(),
                parent: rec.parent.clone(),
                votes: Some(self.tabulate(&rec.url)),
                replies: self.build_level(Some(rec.url.as_str()), by_parent),
            })
            .collect()
    }
}

/// File-backed store for a single signed-in user.
pub struct LocalStore {
    data: Arc<RwLock<StoreData>>,
    /// Held across snapshot, write and rename so saves land in order.
    save_lock: Mutex<()>,
    path: PathBuf,
    user: Drive,
}

impl LocalStore {
    /// Open (or start) the store at `path`; the user's drive is always
    /// registered.  A missing file yields an empty store.  A file that does
    /// not parse is moved aside to `<path>.bak` before starting empty.
    pub fn open(path: impl Into<PathBuf>, user: Drive) -> Result<Self, StoreError> {
        let path = path.into();
        let mut data = Self::load_data(&path)?;
        data.register_drive(&user);
        Ok(Self {
            data: Arc::new(RwLock::new(data)),
            save_lock: Mutex::new(()),
            path,
            user,
        })
    }

    /// Insert a comment authored by an arbitrary drive (used for seeding).
    pub async fn insert_comment_as(
        &self,
        author: &Drive,
        href: &str,
        parent: Option<&str>,
        content: &str,
        ctime: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let url = {
            let mut data = self.data.write().await;
            data.register_drive(author);
            let url = mint_comment_url(&author.url);
            data.comments.push(CommentRecord {
                url: url.clone(),
                drive_url: author.url.clone(),
                content: content.to_string(),
                ctime,
                href: Some(href.to_string()),
                parent: parent.map(str::to_string),
            });
            url
        };
        self.save().await?;
        Ok(url)
    }

    /// Record a vote cast by an arbitrary drive (used for seeding).
    pub async fn put_vote_as(&self, voter: &Drive, url: &str, vote: Vote) -> Result<(), StoreError> {
        {
            let mut data = self.data.write().await;
            data.register_drive(voter);
            data.set_vote(&voter.url, url, vote);
        }
        self.save().await
    }

    /// True when no comment has been stored for `href` yet.
    pub async fn is_thread_empty(&self, href: &str) -> bool {
        let data = self.data.read().await;
        !data.comments.iter().any(|c| c.href.as_deref() == Some(href))
    }

    async fn save(&self) -> Result<(), StoreError> {
        let _guard = self.save_lock.lock().await;
        let json = {
            let data = self.data.read().await;
            serde_json::to_string_pretty(&*data)?
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn load_data(path: &Path) -> Result<StoreData, StoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreData::default()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<StoreData>(&content) {
            Ok(data) => Ok(data),
            Err(e) => {
                let backup = backup_path(path);
                warn!(
                    "unreadable store {}: {}; moved to {}",
                    path.display(),
                    e,
                    backup.display()
                );
                std::fs::rename(path, &backup)?;
                Ok(StoreData::default())
            }
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

#[async_trait]
impl SocialStore for LocalStore {
    fn user(&self) -> &Drive {
        &self.user
    }

    async fn put_vote(&self, url: &str, vote: Vote) -> Result<(), StoreError> {
        debug!("put_vote {} {:?}", url, vote);
        self.data.write().await.set_vote(&self.user.url, url, vote);
        self.save().await
    }

    async fn tabulate_votes(&self, url: &str) -> Result<VoteSet, StoreError> {
        Ok(self.data.read().await.tabulate(url))
    }

    async fn list_thread(&self, href: &str) -> Result<Vec<Comment>, StoreError> {
        Ok(self.data.read().await.thread(href))
    }

    async fn add_comment(
        &self,
        href: &str,
        parent: Option<&str>,
        content: &str,
    ) -> Result<Comment, StoreError> {
        let comment = {
            let mut data = self.data.write().await;
            if let Some(p) = parent {
                if !data.comments.iter().any(|c| c.url == p) {
                    return Err(StoreError::NotFound(p.to_string()));
                }
            }
            let rec = CommentRecord {
                url: mint_comment_url(&self.user.url),
                drive_url: self.user.url.clone(),
                content: content.to_string(),
                ctime: Utc::now(),
                href: Some(href.to_string()),
                parent: parent.map(str::to_string),
            };
            data.comments.push(rec.clone());
            Comment {
                url: rec.url,
                drive: self.user.clone(),
                content: rec.content,
                ctime: rec.ctime,
                href: rec.href,
                parent: rec.parent,
                votes: Some(VoteSet::default()),
                replies: Vec::new(),
            }
        };
        self.save().await?;
        debug!("add_comment {}", comment.url);
        Ok(comment)
    }

    async fn remove_comment(&self, url: &str) -> Result<(), StoreError> {
        {
            let mut data = self.data.write().await;
            let Some(rec) = data.comments.iter().find(|c| c.url == url) else {
                return Err(StoreError::NotFound(url.to_string()));
            };
            if rec.drive_url != self.user.url {
                return Err(StoreError::NotAuthor(url.to_string()));
            }
            data.comments.retain(|c| c.url != url);
            data.votes.retain(|v| v.target != url);
        }
        self.save().await?;
        debug!("remove_comment {}", url);
        Ok(())
    }
}

fn mint_comment_url(drive_url: &str) -> String {
    use rand::Rng;
    let id: u64 = rand::thread_rng().gen();
    format!("{}/comments/{:016x}.md", drive_url.trim_end_matches('/'), id)
}

/// Fill an empty thread with a short sample conversation so a fresh install
/// has something to look at.  No-op when the thread already has comments.
pub async fn seed_sample_thread(store: &LocalStore, href: &str) -> Result<bool, StoreError> {
    if !store.is_thread_empty(href).await {
        return Ok(false);
    }
    let ada = Drive::new("hyper://ada.example", "Ada");
    let grace = Drive::new("hyper://grace.example", "Grace");
    let linus = Drive::new("hyper://linus.example", "Linus");
    let now = Utc::now();

    let root = store
        .insert_comment_as(
            &ada,
            href,
            None,
            "Has anyone tried running this on a read-only drive?",
            now - chrono::Duration::hours(5),
        )
        .await?;
    let reply = store
        .insert_comment_as(
            &grace,
            href,
            Some(root.as_str()),
            "Yes, it works as long as the comments live on your own drive.",
            now - chrono::Duration::hours(4),
        )
        .await?;
    store
        .insert_comment_as(
            &linus,
            href,
            Some(reply.as_str()),
            "Confirmed here too.",
            now - chrono::Duration::minutes(42),
        )
        .await?;
    let second = store
        .insert_comment_as(
            &linus,
            href,
            None,
            "The threading is nice. Keyboard navigation works well.",
            now - chrono::Duration::minutes(10),
        )
        .await?;

    store.put_vote_as(&grace, &root, Vote::Up).await?;
    store.put_vote_as(&linus, &root, Vote::Up).await?;
    store.put_vote_as(&ada, &reply, Vote::Up).await?;
    store.put_vote_as(&ada, &second, Vote::Down).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Drive {
        Drive::new("hyper://me", "Me")
    }

    const HREF: &str = "hyper://site/posts/1.md";

    #[tokio::test]
    async fn test_vote_toggle_and_tabulate() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("store.json"), user()).unwrap();
        let url = store.add_comment(HREF, None, "hi").await.unwrap().url;

        store.put_vote(&url, Vote::Up).await.unwrap();
        let set = store.tabulate_votes(&url).await.unwrap();
        assert_eq!(set.upvotes, vec![user()]);
        assert!(set.downvotes.is_empty());

        // Overwrite, not accumulate.
        store.put_vote(&url, Vote::Down).await.unwrap();
        let set = store.tabulate_votes(&url).await.unwrap();
        assert!(set.upvotes.is_empty());
        assert_eq!(set.downvotes.len(), 1);

        store.put_vote(&url, Vote::Neutral).await.unwrap();
        assert_eq!(store.tabulate_votes(&url).await.unwrap(), VoteSet::default());
    }

    #[tokio::test]
    async fn test_list_thread_nests_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("store.json"), user()).unwrap();
        let other = Drive::new("hyper://other", "Other");
        let t0 = Utc::now() - chrono::Duration::hours(1);

        let late = store
            .insert_comment_as(&other, HREF, None, "late", t0 + chrono::Duration::minutes(30))
            .await
            .unwrap();
        let early = store.insert_comment_as(&other, HREF, None, "early", t0).await.unwrap();
        let child = store
            .insert_comment_as(&other, HREF, Some(early.as_str()), "child", t0 + chrono::Duration::minutes(1))
            .await
            .unwrap();
        let grandchild = store
            .insert_comment_as(&other, HREF, Some(child.as_str()), "gc", t0 + chrono::Duration::minutes(2))
            .await
            .unwrap();
        store
            .insert_comment_as(&other, "hyper://elsewhere", None, "unrelated", t0)
            .await
            .unwrap();

        let thread = store.list_thread(HREF).await.unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].url, early);
        assert_eq!(thread[1].url, late);
        assert_eq!(thread[0].replies[0].url, child);
        assert_eq!(thread[0].replies[0].replies[0].url, grandchild);
        assert_eq!(thread[0].drive.title, "Other");
        assert!(thread[0].votes.is_some());
    }

    #[tokio::test]
    async fn test_remove_comment_requires_author() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("store.json"), user()).unwrap();
        let other = Drive::new("hyper://other", "Other");
        let theirs = store
            .insert_comment_as(&other, HREF, None, "theirs", Utc::now())
            .await
            .unwrap();
        let mine = store.add_comment(HREF, None, "mine").await.unwrap().url;

        assert!(matches!(
            store.remove_comment(&theirs).await,
            Err(StoreError::NotAuthor(_))
        ));
        assert!(matches!(
            store.remove_comment("hyper://nope").await,
            Err(StoreError::NotFound(_))
        ));
        store.put_vote(&mine, Vote::Up).await.unwrap();
        store.remove_comment(&mine).await.unwrap();

        let thread = store.list_thread(HREF).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].url, theirs);
        assert_eq!(store.tabulate_votes(&mine).await.unwrap(), VoteSet::default());
    }

    #[tokio::test]
    async fn test_reply_to_unknown_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("store.json"), user()).unwrap();
        assert!(matches!(
            store.add_comment(HREF, Some("hyper://missing"), "x").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let url = {
            let store = LocalStore::open(&path, user()).unwrap();
            let url = store.add_comment(HREF, None, "persist me").await.unwrap().url;
            store.put_vote(&url, Vote::Up).await.unwrap();
            url
        };
        let store = LocalStore::open(&path, user()).unwrap();
        let thread = store.list_thread(HREF).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].url, url);
        assert_eq!(thread[0].content, "persist me");
        assert_eq!(thread[0].votes.as_ref().unwrap().upvotes.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_votes_all_reach_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = Arc::new(LocalStore::open(&path, user()).unwrap());
        let mut urls = Vec::new();
        for i in 0..32 {
            urls.push(store.add_comment(HREF, None, &format!("c{}", i)).await.unwrap().url);
        }

        let tasks: Vec<_> = urls
            .iter()
            .cloned()
            .map(|url| {
                let store = store.clone();
                tokio::spawn(async move { store.put_vote(&url, Vote::Up).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        drop(store);

        let reopened = LocalStore::open(&path, user()).unwrap();
        for url in &urls {
            assert_eq!(reopened.tabulate_votes(url).await.unwrap().upvotes, vec![user()]);
        }
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = LocalStore::open(&path, user()).unwrap();
        assert!(store.list_thread(HREF).await.unwrap().is_empty());
        store.add_comment(HREF, None, "fresh").await.unwrap();

        let backup = dir.path().join("store.json.bak");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "{ not json");
        assert_eq!(LocalStore::open(&path, user()).unwrap().list_thread(HREF).await.unwrap().len(), 1);
    }

    #[test]
    fn test_read_error_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file.
        assert!(matches!(
            LocalStore::open(dir.path(), user()),
            Err(StoreError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_seed_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("store.json"), user()).unwrap();
        assert!(seed_sample_thread(&store, HREF).await.unwrap());
        assert!(!seed_sample_thread(&store, HREF).await.unwrap());
        let thread = store.list_thread(HREF).await.unwrap();
        assert_eq!(crate::model::count_comments(&thread), 4);
        assert_eq!(thread[0].replies[0].replies.len(), 1);
    }

    #[test]
    fn test_minted_url_shape() {
        let url = mint_comment_url("hyper://me/");
        assert!(url.starts_with("hyper://me/comments/"));
        assert!(url.ends_with(".md"));
        assert_eq!(url.len(), "hyper://me/comments/".len() + 16 + 3);
    }
}
