pub mod disease;
pub mod enums;
pub mod filters;
pub mod record;
pub mod statistics;
pub mod trend;
pub mod user;

pub use disease::*;
pub use enums::*;
pub use filters::*;
pub use record::*;
pub use statistics::*;
pub use trend::*;
pub use user::*;

/// Fresh opaque identifier for users, records, diseases and reminders.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
