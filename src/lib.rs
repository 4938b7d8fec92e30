//! socketCAN support.
//!
//! The Linux kernel supports using CAN-devices through a network-like API
//! (see https://www.kernel.org/doc/Documentation/networking/can.txt). This
//! crate allows easy access to this functionality without having to wrestle
//! libc calls, plus a DBC (CAN database) text parser and signal codec for
//! translating between engineering-unit values and raw payload bytes.
//!
//! # An introduction to CAN
//!
//! The CAN bus was originally designed to allow microcontrollers inside a
//! vehicle to communicate over a single shared bus. Messages called
//! *frames* are multicast to all devices on the bus.
//!
//! Every frame consists of an ID and a payload of up to 8 bytes (64 for CAN
//! FD). If two devices attempt to send a frame at the same time, the device
//! with the higher ID will notice the conflict, stop sending and reattempt
//! to send its frame in the next time slot — the lower the ID, the higher
//! the priority.
//!
//! The Linux socketcan subsystem makes the CAN bus available as a regular
//! networking device. Opening a network interface allows receiving all CAN
//! messages received on it; a device can be opened multiple times, every
//! client receives all frames simultaneously.
//!
//! # Module map
//!
//! - [`frame`]: bit-exact classic/FD frame build and parse.
//! - [`socket`]: the raw SocketCAN transport and the `SocketAdapter` capability trait.
//! - [`filter`]: the post-parse id predicate (`None`/`Exact`/`Range`/`Set`).
//! - [`messenger`]: `Messenger`, the send/listen glue most callers use directly.
//! - [`dbc`]: DBC text parsing and the signal/message codec.

pub mod dbc;
pub mod error;
pub mod filter;
pub mod frame;
pub mod messenger;
mod retry;
mod socket;
mod util;

pub(crate) mod constants;

pub use dbc::Dbc;
pub use error::Error;
pub use filter::Filter;
pub use frame::{Endianness, Frame};
pub use messenger::{Messenger, MessengerOptions};
pub use socket::{CanSocket, SocketAdapter};

use colored::Color;
use fern::colors::ColoredLevelConfig;

/// Installs a colored, timestamped `log` subscriber writing to stdout. Optional: a caller
/// embedding this crate alongside its own logging setup should skip this and just consume the
/// `log` facade directly, since installing a global subscriber is a decision an application makes,
/// not a library.
pub fn init_logging() {
    let colors_line = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::White)
        .debug(Color::Green)
        .trace(Color::Blue);

    let _ = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}{}[{}][{}] {}",
                format_args!(
                    "\x1B[{}m",
                    colors_line.get_color(&record.level()).to_fg_str()
                ),
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .chain(std::io::stdout())
        .apply();
}
