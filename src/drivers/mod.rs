//! Hardware initialisation and interrupt-context handlers.

pub mod hw_init;
pub mod limits;
pub mod reset_button;
