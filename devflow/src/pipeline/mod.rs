//! Stage registry and transition gating.
//!
//! The registry is the static, ordered table of stage contracts; the
//! transition engine evaluates a feature against that table and the shared
//! artifact store to decide whether it may advance.

mod registry;
mod transition;

pub use registry::{GateCondition, StageConfig, StageRegistry};
pub use transition::{TransitionDecision, TransitionEngine};
