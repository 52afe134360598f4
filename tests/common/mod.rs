#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use lightblog::context::RequestContext;
use lightblog::db::DatabaseGateway;
use lightblog::session::SessionManager;

pub const POSTS_SCHEMA: &str = "CREATE TABLE posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)";

pub fn test_gateway() -> Arc<DatabaseGateway> {
    let db = DatabaseGateway::open_in_memory().expect("in-memory database");
    db.query(POSTS_SCHEMA).expect("posts schema");
    Arc::new(db)
}

pub fn test_sessions() -> Arc<SessionManager> {
    Arc::new(SessionManager::new(
        "lightblog_".to_string(),
        Duration::from_secs(1800),
    ))
}

pub fn test_context(
    db: &Arc<DatabaseGateway>,
    sessions: &Arc<SessionManager>,
) -> RequestContext {
    RequestContext::new(Arc::clone(db), sessions.attach(None))
}
