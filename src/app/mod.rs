//! Application boundary — ports and events, zero I/O.
//!
//! The supervisory core talks to the rest of the firmware only through
//! the **port traits** in [`ports`] and reports what it does through the
//! events in [`events`], keeping it testable without real peripherals.

pub mod events;
pub mod ports;
