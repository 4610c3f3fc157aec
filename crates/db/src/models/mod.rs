//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for the writes the API accepts

pub mod device;
pub mod directory;
pub mod notification;
pub mod queue;
pub mod subscription;
pub mod user;
