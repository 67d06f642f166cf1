//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod deployment;
pub mod fix_request;
pub mod invoice;
pub mod pipeline_job;
pub mod project;
pub mod status;
pub mod user;
