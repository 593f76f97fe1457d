//! motionctl library.
//!
//! Supervisory core of a six-axis motion controller: one-shot bootstrap,
//! the per-pass subsystem reset, and hand-off to the command engine.  The
//! core only talks to hardware through the port traits in [`app::ports`];
//! [`adapters`] supplies a simulated machine and a reference line
//! protocol.  ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod settings;
pub mod supervisor;
pub mod system;

pub mod adapters;
pub mod drivers;
pub mod pins;
