//! # engram-session
//!
//! Issues and tracks sessions keyed by workspace, bounded by a cap on
//! concurrent sessions and expired by an idle timeout. State changes can
//! be mirrored to the relational `sessions` table and rehydrated on
//! startup.

pub mod id;
pub mod manager;

pub use id::generate_session_id;
pub use manager::SessionManager;
