//! # Quarry Core
//!
//! Domain types, traits, and error definitions for the Quarry data-analysis
//! agent. This crate has **no framework dependencies**; it defines the
//! domain model that the provider, store, tool and agent crates implement
//! against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here:
//! - [`Provider`]: the reasoning service (language model)
//! - [`Tool`]: a named capability with a data-described argument contract
//!
//! Implementations live in their respective crates, so the agent loop can be
//! tested against scripted providers and in-memory tools.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod table;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use event::{DomainEvent, EventBus};
pub use message::{Message, MessageToolCall, Role, Transcript};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use table::Table;
pub use tool::{ArgKind, ArgumentContract, ArgumentField, Tool, ToolOutput, ToolRegistry};
