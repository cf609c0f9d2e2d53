//! `honorfx` - effect groups for honor titles
//!
//! Stores named effect groups on disk, serves them from a refreshable
//! in-memory cache, and applies the group bound to each session's selected
//! honor on a jittered per-session schedule.

pub mod cache;
pub mod cli;
pub mod config;
pub mod effect;
pub mod error;
pub mod host;
pub mod observability;
pub mod scheduler;
pub mod store;
