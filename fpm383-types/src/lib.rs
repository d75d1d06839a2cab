//! Type definitions for fpm383

pub mod error;
pub mod index_table;
pub mod matching;
pub mod stage_event;
pub mod system_parameters;

pub use error::{Error, Result};
pub use index_table::IndexTable;
pub use matching::SearchHit;
pub use stage_event::{EnrollStage, Flow, IdentifyStage, StageEvent};
pub use system_parameters::SystemParameters;
