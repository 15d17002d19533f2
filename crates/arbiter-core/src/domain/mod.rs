//! Domain model (type tags, values, activities, recognition data, outcomes).

pub mod activity;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod recognition;
pub mod types;
pub mod value;

pub use activity::{Activity, ActivityKind};
pub use errors::DispatchError;
pub use ids::{ActivityId, PassId};
pub use outcome::{Outcome, OutcomeKind};
pub use recognition::{Capture, Entity, IntentScore, PatternMatch, Recognition};
pub use types::TypeTag;
pub use value::Value;
