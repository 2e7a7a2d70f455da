pub mod application_service;
pub mod entities;
pub mod events;
pub mod stats;
pub mod value_objects;

pub use application_service::*;
pub use entities::*;
pub use events::*;
pub use schedlog_errors::{SchedlogError, SchedlogResult};
pub use stats::*;
pub use value_objects::*;
