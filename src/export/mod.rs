//! Export surfaces the engine feeds: per-node `jsonBag()` records and
//! the tick's flat health snapshot.

pub mod json_bag;
pub mod snapshot;

pub use json_bag::export_all;
pub use snapshot::{HealthSnapshot, PositiveSymptom};
