//! Which reply composers are open, keyed by comment URL.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ReplyState {
    open: HashMap<String, bool>,
    /// Set when a composer has just been opened; consumed once after the
    /// next frame is drawn so focus can move into it.
    focus_request: Option<String>,
}

impl ReplyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, url: &str) -> bool {
        self.open.get(url).copied().unwrap_or(false)
    }

    /// Flip the composer for `url` and return the new state.
    pub fn toggle(&mut self, url: &str) -> bool {
        let now_open = !self.is_open(url);
        self.open.insert(url.to_string(), now_open);
        if now_open {
            self.focus_request = Some(url.to_string());
        } else if self.focus_request.as_deref() == Some(url) {
            self.focus_request = None;
        }
        now_open
    }

    pub fn close(&mut self, url: &str) {
        self.open.insert(url.to_string(), false);
        if self.focus_request.as_deref() == Some(url) {
            self.focus_request = None;
        }
    }

    /// The composer waiting for focus, without consuming the request.
    pub fn focus_request(&self) -> Option<&str> {
        self.focus_request.as_deref()
    }

    pub fn take_focus_request(&mut self) -> Option<String> {
        self.focus_request.take()
    }

    /// Forget every comment not in `keys`, e.g. after a reload dropped it.
    pub fn retain(&mut self, keys: &[String]) {
        self.open.retain(|url, _| keys.contains(url));
        if self
            .focus_request
            .as_ref()
            .is_some_and(|url| !keys.contains(url))
        {
            self.focus_request = None;
        }
    }

    pub fn open_map(&self) -> &HashMap<String, bool> {
        &self.open
    }
}
