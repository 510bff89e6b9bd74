//! Core types and trait definitions for ZenFlow plan tracking.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::PlanStore`]; push transports implement
//! [`notification::Dispatcher`].

pub mod error;
pub mod instance;
pub mod notification;
pub mod plan;
pub mod push;
pub mod recurrence;
pub mod store;
pub mod tracker;
pub mod window;

pub use error::{Error, Result};
