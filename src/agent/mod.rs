//! Agent orchestration
//!
//! `react` holds the bounded tool-selection/generation loop, `history` the
//! fixed-capacity conversation ring buffer shared across requests.

pub mod history;
pub mod react;

pub use history::{ConversationHistory, SessionStore};
pub use react::{AgentOutcome, Orchestrator, StepRecord};
