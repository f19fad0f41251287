/// Session state module - Gateway

mod store;

pub use store::{LoadingGuard, SessionError, SessionField, SessionState, SessionStore, SessionUpdate};
