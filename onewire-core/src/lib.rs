//! A no-std, non-blocking, poll-driven driver core for the 1-Wire serial bus.
//!
//! Two pieces, strictly layered:
//!
//! - [`OneWireBus`] bit-bangs the wire: it generates the reset/presence pulse
//!   and shifts single bytes in or out, one bit slot at a time, through a
//!   [`OneWireTimer`] and a [`OneWirePins`] capability bundle supplied by the
//!   host. It never blocks longer than a single bit slot (or, during reset,
//!   a single bounded presence-detect window).
//! - [`OneWireDevice`] holds a device's 8-byte ROM address and drives the bus
//!   through one of the built-in operation scripts (read ROM, read
//!   scratchpad, convert temperature) via repeated [`OneWireDevice::continue_operation`]
//!   calls.
//!
//! Both `continue_operation` methods return [`core::task::Poll<Result<(),
//! OneWireError>>`]: `Pending` means "still running, poll me again",
//! `Ready(Ok(()))` means the operation completed, and `Ready(Err(_))` means
//! it failed and the state machine has already been reset to idle.
//!
//! Nothing in this crate allocates, recurses, spawns a task, or assumes an
//! operating system is present.
#![no_std]
#![deny(missing_docs)]

pub mod consts;
mod bus;
mod device;
mod error;
mod pins;
mod script;
mod timer;

pub use bus::OneWireBus;
pub use device::OneWireDevice;
pub use error::OneWireError;
pub use pins::OneWirePins;
pub use timer::OneWireTimer;

/// Result type used by the immediate accept/reject calls in this crate
/// (`reset`, `write`, `read`, `read_rom`, ...). Poll-driven progress uses
/// `core::task::Poll<Result<(), OneWireError>>` instead, see the crate docs.
pub type OneWireResult<T> = Result<T, OneWireError>;
