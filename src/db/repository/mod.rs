//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a borrowed `Connection`. Multi-step writes open
//! their own transaction; the `*_where` cascade helpers run inside the
//! caller's.

mod chronic_disease;
mod decode;
mod maintenance;
mod medical_record;
mod statistics;
mod user;

pub use chronic_disease::*;
pub use maintenance::*;
pub use medical_record::*;
pub use statistics::*;
pub use user::*;
