//! Session persistence: cached warmup results keyed by site and profile.

mod disk;
mod record;

pub use disk::{SessionStore, StoreStats};
pub use record::{RECORD_SCHEMA_VERSION, SessionRecord};
