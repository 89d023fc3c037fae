use core::cell::RefCell;
use core::task::Poll;

use crate::bus::OneWireBus;
use crate::consts::{CONVERT_T_CMD, MATCH_ROM_CMD, READ_ROM_CMD, READ_SCRATCHPAD_CMD};
use crate::error::OneWireError;
use crate::pins::OneWirePins;
use crate::script::{self, Opcode};
use crate::timer::OneWireTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceState {
    Idle,
    Busy,
    Wait,
}

/// Where `continue_operation` should stash the next byte read off the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    None,
    Address,
    Scratchpad,
}

const SEND_BUFFER_LEN: usize = 19;
const SCRATCHPAD_LEN: usize = 9;
const ADDRESS_LEN: usize = 8;

/// Drives a [`OneWireBus`] through one of the built-in operation scripts on
/// behalf of a single addressed device.
///
/// Holds the device's 8-byte ROM address and a 19-byte send buffer laid out
/// as `[command, address[0..8], function/payload]`, so a match-ROM
/// transaction can stream the whole buffer through a single advancing
/// pointer without copying the address around. The bus is a shared,
/// borrow-checked resource: exactly one device can be driving it (holding it
/// `Busy`) at a time, enforced at runtime by the `RefCell` the bus lives in.
pub struct OneWireDevice<'a, P, T> {
    bus: &'a RefCell<OneWireBus<P, T>>,
    send_buffer: [u8; SEND_BUFFER_LEN],
    scratchpad: [u8; SCRATCHPAD_LEN],
    state: DeviceState,
    script: &'static [Opcode],
    pc: usize,
    remaining: usize,
    data_source: usize,
    sink: Sink,
    sink_index: usize,
    wait_value: bool,
}

impl<'a, P: OneWirePins, T: OneWireTimer> OneWireDevice<'a, P, T> {
    /// Construct a device bound to an already-shared bus.
    pub fn new(bus: &'a RefCell<OneWireBus<P, T>>) -> Self {
        Self {
            bus,
            send_buffer: [0; SEND_BUFFER_LEN],
            scratchpad: [0; SCRATCHPAD_LEN],
            state: DeviceState::Idle,
            script: &[],
            pc: 0,
            remaining: 0,
            data_source: 0,
            sink: Sink::None,
            sink_index: 0,
            wait_value: false,
        }
    }

    /// The 8-byte ROM address slot (bytes `[1..9]` of the send buffer).
    pub fn address(&self) -> [u8; ADDRESS_LEN] {
        core::array::from_fn(|i| self.send_buffer[1 + i])
    }

    /// Overwrite the 8-byte ROM address slot.
    pub fn set_address(&mut self, address: [u8; ADDRESS_LEN]) {
        self.send_buffer[1..1 + ADDRESS_LEN].copy_from_slice(&address);
    }

    /// The 9-byte scratchpad slot, valid once `read_scratchpad` has completed.
    pub fn scratchpad(&self) -> &[u8; SCRATCHPAD_LEN] {
        &self.scratchpad
    }

    /// True if a script is currently running.
    pub fn is_busy(&self) -> bool {
        self.state != DeviceState::Idle
    }

    /// Kick off the `READ_ROM` script. Fails with [`OneWireError::Busy`] if a
    /// script is already active. On completion, [`OneWireDevice::address`]
    /// holds the sole bus device's ROM code.
    pub fn read_rom(&mut self) -> Result<(), OneWireError> {
        self.send_buffer[0] = READ_ROM_CMD;
        self.begin(&script::READ_ROM, Sink::Address)
    }

    /// Kick off the `READ_SCRATCHPAD` script against the addressed device.
    /// Fails with [`OneWireError::Busy`] if a script is already active. On
    /// completion, [`OneWireDevice::scratchpad`] holds the raw 9 scratchpad
    /// bytes (CRC validation and decoding are a device-specific concern
    /// outside this crate).
    pub fn read_scratchpad(&mut self) -> Result<(), OneWireError> {
        self.send_buffer[0] = MATCH_ROM_CMD;
        self.send_buffer[1 + ADDRESS_LEN] = READ_SCRATCHPAD_CMD;
        self.begin(&script::READ_SCRATCHPAD, Sink::Scratchpad)
    }

    /// Kick off the `CONVERT_TEMPERATURE` script against the addressed
    /// device. Fails with [`OneWireError::Busy`] if a script is already
    /// active. The script waits on the line until the device releases it
    /// (conversion complete) before reporting done.
    pub fn convert_temperature(&mut self) -> Result<(), OneWireError> {
        self.send_buffer[0] = MATCH_ROM_CMD;
        self.send_buffer[1 + ADDRESS_LEN] = CONVERT_T_CMD;
        self.begin(&script::CONVERT_TEMPERATURE, Sink::None)
    }

    /// Forcibly abort the active script and the bus operation it was
    /// driving, returning both to idle. Idempotent.
    pub fn abort(&mut self) {
        self.bus.borrow_mut().terminate_operation();
        self.state = DeviceState::Idle;
    }

    /// Advance the active script by one step.
    ///
    /// Returns `Pending` while the script is still running, `Ready(Ok(()))`
    /// once every opcode has completed, or `Ready(Err(_))` if the bus
    /// reported a failure (the device has already been reset to idle).
    /// Calling this while idle returns `Ready(Err(OneWireError::Noop))`.
    pub fn continue_operation(&mut self) -> Poll<Result<(), OneWireError>> {
        match self.state {
            DeviceState::Idle => Poll::Ready(Err(OneWireError::Noop)),
            DeviceState::Busy => {
                let progress = self.bus.borrow_mut().continue_operation();
                match progress {
                    Poll::Pending => Poll::Pending,
                    Poll::Ready(Ok(())) => {
                        if self.script[self.pc] == Opcode::Read {
                            let byte = self.bus.borrow().read_value();
                            self.store_sink(byte);
                        }
                        self.advance()
                    }
                    Poll::Ready(Err(e)) => {
                        self.state = DeviceState::Idle;
                        Poll::Ready(Err(e))
                    }
                }
            }
            DeviceState::Wait => {
                let sampled = self.bus.borrow_mut().read_bit();
                if sampled == self.wait_value {
                    self.advance()
                } else {
                    Poll::Pending
                }
            }
        }
    }

    fn begin(&mut self, script: &'static [Opcode], sink: Sink) -> Result<(), OneWireError> {
        if self.state != DeviceState::Idle {
            return Err(OneWireError::Busy);
        }
        self.script = script;
        self.pc = 0;
        self.remaining = script.len();
        self.data_source = 0;
        self.sink = sink;
        self.sink_index = 0;
        self.state = DeviceState::Busy;
        match self.start_operation() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state = DeviceState::Idle;
                Err(e)
            }
        }
    }

    fn start_operation(&mut self) -> Result<(), OneWireError> {
        match self.script[self.pc] {
            Opcode::Reset => self.bus.borrow_mut().reset(),
            Opcode::Write => {
                let byte = self.send_buffer[self.data_source];
                self.data_source += 1;
                self.bus.borrow_mut().write(byte)
            }
            Opcode::Read => self.bus.borrow_mut().read(),
            Opcode::WaitForOne => {
                self.wait_value = true;
                self.state = DeviceState::Wait;
                Ok(())
            }
        }
    }

    fn store_sink(&mut self, byte: u8) {
        match self.sink {
            Sink::None => {}
            Sink::Address => {
                self.send_buffer[1 + self.sink_index] = byte;
                self.sink_index += 1;
            }
            Sink::Scratchpad => {
                self.scratchpad[self.sink_index] = byte;
                self.sink_index += 1;
            }
        }
    }

    fn advance(&mut self) -> Poll<Result<(), OneWireError>> {
        self.remaining -= 1;
        if self.remaining == 0 {
            self.state = DeviceState::Idle;
            return Poll::Ready(Ok(()));
        }
        self.pc += 1;
        self.state = DeviceState::Busy;
        match self.start_operation() {
            Ok(()) => Poll::Pending,
            Err(e) => {
                self.state = DeviceState::Idle;
                Poll::Ready(Err(e))
            }
        }
    }
}
