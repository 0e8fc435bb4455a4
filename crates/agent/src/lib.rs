//! The core agent loop of Quarry.
//!
//! The agent follows a **Think → Act → Observe** cycle:
//!
//! 1. **Discover** the primary table's schema with the schema tool
//! 2. **Build context**: system prompt with tool list and schema, then the task
//! 3. **Send to LLM** via the configured provider
//! 4. **If tool calls** (structured, or an `Action:` line): execute them,
//!    append one observation per call, loop back to step 3
//! 5. **If `Final Answer:`**: return it
//!
//! The loop also stops on a communication error or when the step budget
//! is spent. Every ending produces an answer string.

pub mod interpreter;
pub mod loop_runner;
pub mod observation;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use interpreter::{Interpretation, ModelOutput, interpret, parse_action_args};
pub use loop_runner::{AgentLoop, AgentSettings, MAX_STEPS_MESSAGE, RunOutcome, RunPhase, RunState};
pub use observation::{ObservationFormatter, TEXT_TRUNCATION_NOTICE};
