//! GPIO assignments for the six-axis controller board (ESP32-S3).
//!
//! Every driver references this module rather than hard-coding pin
//! numbers.

// ---------------------------------------------------------------------------
// Step / direction outputs (one pair per axis, order X Y Z A B C)
// ---------------------------------------------------------------------------

pub const STEP_GPIO: [i32; 6] = [1, 2, 3, 4, 5, 6];
pub const DIR_GPIO: [i32; 6] = [7, 8, 9, 10, 11, 12];
/// Shared driver enable, active LOW unless `InvertStepEnable` is set.
pub const STEPPER_ENABLE_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Limit switches (normally-closed, pulled up; pin change interrupt)
// ---------------------------------------------------------------------------

pub const LIMIT_GPIO: [i32; 6] = [14, 15, 16, 17, 18, 21];

// ---------------------------------------------------------------------------
// Control inputs
// ---------------------------------------------------------------------------

/// Touch probe, LOW on contact unless `InvertProbePin` is set.
pub const PROBE_GPIO: i32 = 35;
/// Physical reset button, active LOW with external pull-up.
pub const RESET_BUTTON_GPIO: i32 = 0;

// ---------------------------------------------------------------------------
// Spindle and coolant outputs
// ---------------------------------------------------------------------------

pub const SPINDLE_ENABLE_GPIO: i32 = 38;
pub const SPINDLE_DIR_GPIO: i32 = 39;
/// Second spindle enable when a secondary spindle is fitted.
pub const SPINDLE2_ENABLE_GPIO: i32 = 40;
pub const COOLANT_FLOOD_GPIO: i32 = 41;
pub const COOLANT_MIST_GPIO: i32 = 42;

// ---------------------------------------------------------------------------
// Serial
// ---------------------------------------------------------------------------

/// Secondary UART (primary is the USB-CDC console).
pub const UART1_TX_GPIO: i32 = 43;
pub const UART1_RX_GPIO: i32 = 44;
