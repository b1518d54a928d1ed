//! Session lifecycle and per-session turn serialization.

mod session_registry;

pub use session_registry::{SessionError, SessionRegistry, SESSION_IDLE_TIMEOUT};
