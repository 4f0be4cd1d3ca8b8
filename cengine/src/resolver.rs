//! Session identity resolution: slugs, the slug index, and guest continuity.
//!
//! ```rust
//! use cengine::slugify;
//!
//! assert_eq!(slugify("Crème Brûlée recipe!"), "creme-brulee-recipe");
//! assert_eq!(slugify("Привет, мир"), "привет-мир");
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use ccommon::SessionId;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::store::KeyValueStore;

const SLUG_INDEX_KEY: &str = "session_slug_index";
const SESSION_ID_KEY: &str = "session_id";
const SESSION_SLUG_KEY: &str = "session_slug";
const GUEST_SESSIONS_KEY: &str = "guest_chat_history_ids";
const GUEST_TOKENS_KEY: &str = "guest_chat_tokens";

/// Most-recently-used cap on remembered guest sessions.
const GUEST_SESSION_CAP: usize = 50;

/// Normalize text into a URL-safe token.
///
/// NFKD-normalizes, strips combining marks, lowercases, keeps ASCII
/// alphanumerics and Cyrillic, drops other symbols outright, and collapses
/// whitespace/hyphen runs into single hyphens with no leading or trailing
/// separator.
pub fn slugify(text: &str) -> String {
    let mut filtered = String::new();
    for ch in text.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }

        for lower in ch.to_lowercase() {
            if lower.is_ascii_lowercase()
                || lower.is_ascii_digit()
                || is_cyrillic(lower)
                || lower.is_whitespace()
                || lower == '-'
            {
                filtered.push(lower);
            }
        }
    }

    let mut slug = String::new();
    let mut pending_separator = false;
    for ch in filtered.chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_separator = true;
            continue;
        }

        if pending_separator && !slug.is_empty() {
            slug.push('-');
        }

        pending_separator = false;
        slug.push(ch);
    }

    slug
}

fn is_cyrillic(ch: char) -> bool {
    ('\u{0400}'..='\u{04FF}').contains(&ch)
}

/// Bidirectional slug/session-id mapping plus guest continuity records.
///
/// Everything here is best-effort: malformed persisted data reads as empty
/// and is silently rebuilt on the next write. No operation fails.
pub struct SessionDirectory {
    store: Arc<dyn KeyValueStore>,
    slug_index: Mutex<HashMap<String, String>>,
}

impl SessionDirectory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let slug_index = store
            .get(SLUG_INDEX_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();

        Self {
            store,
            slug_index: Mutex::new(slug_index),
        }
    }

    fn index(&self) -> MutexGuard<'_, HashMap<String, String>> {
        match self.slug_index.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Map a slug (or raw id) to the session id it names.
    pub fn resolve(&self, slug_or_id: &str) -> SessionId {
        self.index()
            .get(slug_or_id)
            .cloned()
            .map(SessionId::from)
            .unwrap_or_else(|| SessionId::from(slug_or_id))
    }

    /// A previously registered slug for the id, else a derived one.
    pub fn slug_for(&self, session_id: &SessionId) -> String {
        self.index()
            .iter()
            .find(|(_, id)| id.as_str() == session_id.as_str())
            .map(|(slug, _)| slug.clone())
            .unwrap_or_else(|| slugify(session_id.as_str()))
    }

    pub fn register(&self, session_id: &SessionId, slug: &str) {
        if slug.is_empty() || session_id.as_str().is_empty() {
            return;
        }

        let snapshot = {
            let mut index = self.index();
            index.insert(slug.to_string(), session_id.to_string());
            index.clone()
        };

        if let Ok(raw) = serde_json::to_string(&snapshot) {
            self.store.set(SLUG_INDEX_KEY, &raw);
        }
    }

    /// Record the active session so a reload can pick the conversation back up.
    pub fn remember_current(&self, session_id: &SessionId, slug: Option<&str>) {
        self.store.set(SESSION_ID_KEY, session_id.as_str());
        if let Some(slug) = slug {
            self.store.set(SESSION_SLUG_KEY, slug);
        }
    }

    pub fn remember_guest_session(&self, session_id: &SessionId) {
        if session_id.as_str().is_empty() {
            return;
        }

        let mut list = self.guest_session_ids();
        list.retain(|id| id != session_id.as_str());
        list.insert(0, session_id.to_string());
        list.truncate(GUEST_SESSION_CAP);

        if let Ok(raw) = serde_json::to_string(&list) {
            self.store.set(GUEST_SESSIONS_KEY, &raw);
        }
    }

    pub fn guest_session_ids(&self) -> Vec<String> {
        self.store
            .get(GUEST_SESSIONS_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn store_guest_token(&self, session_id: &SessionId, token: &str) {
        if token.is_empty() || session_id.as_str().is_empty() {
            return;
        }

        let mut tokens = self.guest_tokens();
        tokens.insert(session_id.to_string(), token.to_string());
        if let Ok(raw) = serde_json::to_string(&tokens) {
            self.store.set(GUEST_TOKENS_KEY, &raw);
        }
    }

    pub fn guest_token(&self, session_id: &SessionId) -> Option<String> {
        self.guest_tokens().remove(session_id.as_str())
    }

    pub fn guest_tokens(&self) -> HashMap<String, String> {
        self.store
            .get(GUEST_TOKENS_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }
}
