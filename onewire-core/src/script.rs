/// One step of a device operation script.
///
/// Scripts describe shape only; `Write` and `Read` carry no payload.
/// `Write` always pulls its next byte from the device's own send buffer
/// (advancing `data_source`); the send buffer must be populated by the
/// operation that started the script (`read_rom`, `read_scratchpad`,
/// `convert_temperature`) before the first `Write` opcode runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Opcode {
    /// Issue a reset/presence pulse.
    Reset,
    /// Write the next byte of the send buffer.
    Write,
    /// Read one byte into the active sink.
    Read,
    /// Sample single bits until the line reaches the armed wait value.
    WaitForOne,
}

use Opcode::{Read as R, Reset as X, WaitForOne as WF1, Write as W};

/// `RESET, WRITE, READ x8`: retrieves the ROM code of the sole device on the bus.
pub(crate) static READ_ROM: [Opcode; 10] = [X, W, R, R, R, R, R, R, R, R];

/// `RESET, WRITE(0x55), WRITE x8 (address), WRITE(0xBE), READ x9`.
pub(crate) static READ_SCRATCHPAD: [Opcode; 20] = [
    X, W, W, W, W, W, W, W, W, W, W, R, R, R, R, R, R, R, R, R,
];

/// `RESET, WRITE(0x55), WRITE x8 (address), WRITE(0x44), WAIT_FOR_ONE`.
pub(crate) static CONVERT_TEMPERATURE: [Opcode; 12] =
    [X, W, W, W, W, W, W, W, W, W, W, WF1];
