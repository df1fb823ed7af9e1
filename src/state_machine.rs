//! Agent state machine
//!
//! `transition` is pure: it maps (state, event) to a new state plus the
//! effects the runtime must apply. All I/O lives in `runtime`.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{AgentPhase, AgentState, ToolCall, TurnContext};
pub use transition::{transition, TransitionError, TransitionResult};
