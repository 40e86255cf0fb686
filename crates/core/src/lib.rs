//! # UniPath Core
//!
//! Domain types, traits, and error definitions for the UniPath study-abroad
//! counselling backend. This crate has **no framework dependencies**: it
//! defines the model that the store, tools, agent and gateway crates
//! implement against.
//!
//! ## Layout
//!
//! - [`domain`] — profiles, universities, shortlist entries, tasks, stages
//! - [`store`] — the `CounselStore` trait over the relational store
//! - [`provider`] / [`message`] — the language-model boundary
//! - [`tool`] — the `Tool` trait and the registry the agent dispatches through
//! - [`event`] — broadcast bus for domain events

pub mod domain;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use domain::{
    AcademicData, AcademicHistory, BachelorsRecord, Category, ChatRole, ChatTurn, FlexValue,
    Preferences, Profile, ReadinessData, SchoolRecord, ShortlistEntry, ShortlistView, Stage,
    Task, TaskStatus, TaskType, University,
};
pub use error::Error;
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use store::{CounselStore, NewShortlistEntry, NewTask, OnboardingUpdate, UniversityFilter};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
