// Module for session handling
pub mod store;

pub use store::{SessionManager, SessionStore, SessionValue};
