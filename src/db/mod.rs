//! User storage collaborators.
//!
//! The auth core never owns accounts; it reads them through `UserStore`.

pub mod memory;
pub mod models;
pub mod operations;

pub use memory::InMemoryUserStore;
pub use models::{UserProfile, UserRecord};
pub use operations::{PgUserStore, UserStore};
