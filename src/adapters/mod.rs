//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter     | Implements                      | Connects to               |
//! |-------------|---------------------------------|---------------------------|
//! | `eeprom`    | SettingsPort, StoragePort       | EEPROM / in-memory store  |
//! | `io`        | (spindle, coolant, limits, probe state) | GPIO via `hw_init` |
//! | `log_sink`  | EventSink                       | Serial log output         |
//! | `machine`   | every collaborator port         | all of the below          |
//! | `parser`    | (G-code subset)                 | —                         |
//! | `planner`   | (segment queue)                 | —                         |
//! | `protocol`  | ProtocolEngine                  | primary serial channel    |
//! | `serial`    | (line RX/TX)                    | UART / USB-CDC, stdin     |
//! | `stepper`   | (pulse generation)              | `embedded-hal` outputs    |

pub mod eeprom;
pub mod io;
pub mod log_sink;
pub mod machine;
pub mod parser;
pub mod planner;
pub mod protocol;
pub mod serial;
pub mod stepper;
