use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::RngCore;
use subtle::ConstantTimeEq;
use tracing::debug;
use uuid::Uuid;

/// A value stored in the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionValue {
    Text(String),
    Integer(i64),
    Flag(bool),
    Map(HashMap<String, SessionValue>),
}

impl SessionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SessionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SessionValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SessionValue::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for SessionValue {
    fn from(value: &str) -> Self {
        SessionValue::Text(value.to_string())
    }
}

impl From<String> for SessionValue {
    fn from(value: String) -> Self {
        SessionValue::Text(value)
    }
}

impl From<i64> for SessionValue {
    fn from(value: i64) -> Self {
        SessionValue::Integer(value)
    }
}

impl From<bool> for SessionValue {
    fn from(value: bool) -> Self {
        SessionValue::Flag(value)
    }
}

impl From<HashMap<String, SessionValue>> for SessionValue {
    fn from(value: HashMap<String, SessionValue>) -> Self {
        SessionValue::Map(value)
    }
}

/// One session's data plus the housekeeping timestamps used for expiry and
/// id-rotation decisions. The timestamps are never exposed to callers.
struct SessionRecord {
    values: HashMap<String, SessionValue>,
    csrf_token: Option<String>,
    created: Instant,
    last_activity: Instant,
}

impl SessionRecord {
    fn new() -> Self {
        let now = Instant::now();
        SessionRecord {
            values: HashMap::new(),
            csrf_token: None,
            created: now,
            last_activity: now,
        }
    }
}

/// Process-wide session registry. Holds every live session keyed by id;
/// per-request access goes through a `SessionStore` handle.
pub struct SessionManager {
    sessions: Mutex<HashMap<Uuid, SessionRecord>>,
    prefix: String,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(prefix: String, timeout: Duration) -> Self {
        SessionManager {
            sessions: Mutex::new(HashMap::new()),
            prefix,
            timeout,
        }
    }

    /// Bind a request to a session. A supplied id is adopted only when it
    /// names a live session; anything else, including an id this registry
    /// never issued, starts fresh under a new id. The cookie catches up from
    /// `SessionStore::id` afterwards.
    pub fn attach(self: &Arc<Self>, id: Option<Uuid>) -> SessionStore {
        let id = {
            let mut sessions = self.sessions.lock();
            self.sweep(&mut sessions);
            match id {
                Some(candidate) if sessions.contains_key(&candidate) => candidate,
                _ => Uuid::new_v4(),
            }
        };
        SessionStore {
            manager: Arc::clone(self),
            id,
        }
    }

    pub fn live_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Drop records idle past the timeout. Runs on every attach, so
    /// abandoned sessions are reclaimed without a background task.
    fn sweep(&self, sessions: &mut HashMap<Uuid, SessionRecord>) {
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, record| now.duration_since(record.last_activity) <= self.timeout);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "swept expired sessions");
        }
    }
}

/// Per-request handle onto one session.
///
/// Every operation acquires the registry lock, applies housekeeping,
/// performs the operation and releases immediately, so no lock is held
/// across a request. Keys are namespaced with the configured prefix.
pub struct SessionStore {
    manager: Arc<SessionManager>,
    id: Uuid,
}

impl SessionStore {
    /// Current session id, as the cookie should carry it. Rotation and
    /// expiry may change it between operations.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn set(&mut self, key: &str, value: impl Into<SessionValue>) {
        let prefixed = self.prefixed(key);
        let value = value.into();
        self.with_record(|record| {
            record.values.insert(prefixed, value);
        });
    }

    pub fn get(&mut self, key: &str, second_key: Option<&str>) -> Option<SessionValue> {
        let prefixed = self.prefixed(key);
        self.with_record(|record| {
            let value = record.values.get(&prefixed)?;
            match second_key {
                None => Some(value.clone()),
                Some(second) => match value {
                    SessionValue::Map(map) => map.get(second).cloned(),
                    _ => None,
                },
            }
        })
    }

    pub fn has(&mut self, key: &str, second_key: Option<&str>) -> bool {
        self.get(key, second_key).is_some()
    }

    pub fn clear(&mut self, key: &str, second_key: Option<&str>) {
        let prefixed = self.prefixed(key);
        self.with_record(|record| match second_key {
            None => {
                record.values.remove(&prefixed);
            }
            Some(second) => {
                if let Some(SessionValue::Map(map)) = record.values.get_mut(&prefixed) {
                    map.remove(second);
                }
            }
        });
    }

    /// Drop the session entirely and start over with a fresh id
    pub fn destroy(&mut self) {
        let mut sessions = self.manager.sessions.lock();
        sessions.remove(&self.id);
        self.id = Uuid::new_v4();
        debug!(session = %self.id, "session destroyed");
    }

    /// Return the session's CSRF token, minting one on first use.
    /// The token stays stable until the session is destroyed or expires.
    pub fn issue_csrf_token(&mut self) -> String {
        self.with_record(|record| {
            record
                .csrf_token
                .get_or_insert_with(|| {
                    let mut bytes = [0u8; 32];
                    rand::rng().fill_bytes(&mut bytes);
                    hex::encode(bytes)
                })
                .clone()
        })
    }

    /// Constant-time comparison against the stored token
    pub fn validate_csrf_token(&mut self, token: &str) -> bool {
        let token = token.to_string();
        self.with_record(|record| match &record.csrf_token {
            Some(stored) => bool::from(stored.as_bytes().ct_eq(token.as_bytes())),
            None => false,
        })
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.manager.prefix, key)
    }

    /// Open the record, run housekeeping, apply the operation, close.
    ///
    /// Inactivity beyond the timeout discards the record (forced logout);
    /// age beyond the timeout rotates the id while keeping the data
    /// (fixation mitigation).
    fn with_record<R>(&mut self, op: impl FnOnce(&mut SessionRecord) -> R) -> R {
        let mut sessions = self.manager.sessions.lock();
        let now = Instant::now();

        let mut record = sessions
            .remove(&self.id)
            .unwrap_or_else(SessionRecord::new);

        if now.duration_since(record.last_activity) > self.manager.timeout {
            debug!(session = %self.id, "session expired, forcing logout");
            record = SessionRecord::new();
            self.id = Uuid::new_v4();
        } else if now.duration_since(record.created) > self.manager.timeout {
            debug!(session = %self.id, "rotating session id");
            self.id = Uuid::new_v4();
            record.created = now;
        }
        record.last_activity = now;

        let result = op(&mut record);
        sessions.insert(self.id, record);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> Arc<SessionManager> {
        Arc::new(SessionManager::new(
            "test_".to_string(),
            Duration::from_secs(1800),
        ))
    }

    #[test]
    fn test_set_get_round_trip() {
        let manager = manager();
        let mut session = manager.attach(None);
        session.set("user", "alice");
        assert_eq!(
            session.get("user", None),
            Some(SessionValue::Text("alice".to_string()))
        );
        assert!(session.has("user", None));
        assert!(!session.has("missing", None));
    }

    #[test]
    fn test_second_key_addresses_nested_map() {
        let manager = manager();
        let mut session = manager.attach(None);
        let mut flash = HashMap::new();
        flash.insert("notice".to_string(), SessionValue::from("saved"));
        session.set("flash", flash);

        assert_eq!(
            session.get("flash", Some("notice")),
            Some(SessionValue::Text("saved".to_string()))
        );
        assert_eq!(session.get("flash", Some("other")), None);

        session.clear("flash", Some("notice"));
        assert!(!session.has("flash", Some("notice")));
        // The outer key survives clearing one nested entry
        assert!(session.has("flash", None));
    }

    #[test]
    fn test_keys_are_prefix_namespaced() {
        let alpha = Arc::new(SessionManager::new(
            "a_".to_string(),
            Duration::from_secs(1800),
        ));
        let mut session = alpha.attach(None);
        session.set("k", "v");
        // Raw map key carries the prefix
        let sessions = alpha.sessions.lock();
        let record = sessions.values().next().unwrap();
        assert!(record.values.contains_key("a_k"));
    }

    #[test]
    fn test_destroy_drops_data_and_rotates_id() {
        let manager = manager();
        let mut session = manager.attach(None);
        session.set("user", "alice");
        let before = session.id();

        session.destroy();
        assert_ne!(session.id(), before);
        assert!(!session.has("user", None));
    }

    #[test]
    fn test_attach_with_known_id_resumes() {
        let manager = manager();
        let mut first = manager.attach(None);
        first.set("user", "alice");
        let id = first.id();

        let mut second = manager.attach(Some(id));
        assert_eq!(
            second.get("user", None),
            Some(SessionValue::Text("alice".to_string()))
        );
    }

    #[test]
    fn test_attach_rejects_unknown_id() {
        let manager = manager();
        let forged = Uuid::new_v4();

        // A cookie id the registry never issued is not adopted
        let mut session = manager.attach(Some(forged));
        assert_ne!(session.id(), forged);

        session.set("user", "alice");

        // Nothing was created under the forged id, so presenting it again
        // still starts an empty session
        let mut other = manager.attach(Some(forged));
        assert_ne!(other.id(), forged);
        assert!(!other.has("user", None));
    }

    #[test]
    fn test_attach_sweeps_expired_sessions() {
        let manager = Arc::new(SessionManager::new(
            "test_".to_string(),
            Duration::from_millis(10),
        ));
        for _ in 0..20 {
            let mut session = manager.attach(None);
            session.set("user", "alice");
        }
        assert_eq!(manager.live_sessions(), 20);

        // Every record is now idle past the timeout; the next attach
        // reclaims all of them
        std::thread::sleep(Duration::from_millis(50));
        manager.attach(None);
        assert_eq!(manager.live_sessions(), 0);
    }

    #[test]
    fn test_inactivity_expiry_forces_logout() {
        let manager = Arc::new(SessionManager::new(
            "test_".to_string(),
            Duration::ZERO,
        ));
        let mut session = manager.attach(None);
        session.set("user", "alice");
        let before = session.id();

        // Timeout of zero: the next operation sees an expired session
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(session.get("user", None), None);
        assert_ne!(session.id(), before);
    }

    #[test]
    fn test_creation_age_rotates_id_keeping_data() {
        let manager = manager();
        let mut session = manager.attach(None);
        session.set("user", "alice");
        let before = session.id();

        // Age the record past the rotation window while keeping it active
        {
            let mut sessions = manager.sessions.lock();
            let record = sessions.get_mut(&before).unwrap();
            record.created = Instant::now() - Duration::from_secs(3600);
        }

        let value = session.get("user", None);
        assert_eq!(value, Some(SessionValue::Text("alice".to_string())));
        assert_ne!(session.id(), before);

        // The old id no longer resolves to the data
        let mut stale = manager.attach(Some(before));
        assert!(!stale.has("user", None));
    }

    #[test]
    fn test_csrf_token_round_trip() {
        let manager = manager();
        let mut session = manager.attach(None);
        let token = session.issue_csrf_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

        assert!(session.validate_csrf_token(&token));
        // Stable until reissued: validation does not rotate the token
        assert!(session.validate_csrf_token(&token));
        assert_eq!(session.issue_csrf_token(), token);

        assert!(!session.validate_csrf_token("deadbeef"));
        assert!(!session.validate_csrf_token(""));
    }

    #[test]
    fn test_csrf_token_unset_never_validates() {
        let manager = manager();
        let mut session = manager.attach(None);
        assert!(!session.validate_csrf_token(""));
        assert!(!session.validate_csrf_token("anything"));
    }
}
