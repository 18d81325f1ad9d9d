//! # Core Chat Logic
//!
//! This module contains the chat's conversation model and its reducer.
//! It owns the widget components but performs no I/O of its own: adapter
//! calls are requested through [`action::Effect`] and run by the host.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • AiChat (state)       │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    └───────────┬─────────────┘
//!                                │ Effect
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │  ChatHost  │      │  Adapter   │      │  Session   │
//!     │ (ui, tokio)│      │ (backend)  │      │  (files)   │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `AiChat` struct, all chat state in one place
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`config`]: Config file loading and option resolution
//! - [`error`]: The `ChatError` type
//! - [`session`]: Conversation history files

pub mod action;
pub mod config;
pub mod error;
pub mod session;
pub mod state;

pub use action::{Action, Effect, update};
pub use error::ChatError;
pub use state::AiChat;
