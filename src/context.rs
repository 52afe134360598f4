use std::sync::Arc;

use crate::db::DatabaseGateway;
use crate::http::Response;
use crate::session::SessionStore;

/// Everything a controller may touch while handling one request.
///
/// Built per dispatch cycle and passed explicitly; there is no global
/// session or database state.
pub struct RequestContext {
    pub db: Arc<DatabaseGateway>,
    pub session: SessionStore,
    pub response: Response,
}

impl RequestContext {
    pub fn new(db: Arc<DatabaseGateway>, session: SessionStore) -> Self {
        RequestContext {
            db,
            session,
            response: Response::new(),
        }
    }
}
