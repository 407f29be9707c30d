//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements   | Connects to                   |
//! |-----------------|--------------|-------------------------------|
//! | `sim_gpio`      | GpioPort     | In-memory pin simulation      |
//! | `printer_link`  | PrinterPort  | JSON lines to the print host  |
//! | `settings_file` | ConfigPort   | JSON settings file on disk    |
//! | `log_sink`      | EventSink    | `log` facade                  |
//!
//! `host_protocol` is the inbound side of the print host link: it decodes
//! host messages and drives the monitor.

pub mod host_protocol;
pub mod log_sink;
pub mod printer_link;
pub mod settings_file;
pub mod sim_gpio;
