//! A software-simulated 1-Wire line, driven by a real wall clock.
//!
//! Unlike `onewire-core`'s own test doubles (which advance a virtual clock
//! by hand, one tick per poll), this one runs against [`std::time::Instant`]
//! so it exercises the engine's actual timing constants in real time: a
//! reset genuinely takes on the order of a millisecond of wall-clock time.
//!
//! The simulated slave can't see the bytes the master intends to send or
//! receive, only pin-direction and drive-level calls, exactly like real
//! hardware. It disambiguates a reset pulse from a read slot purely from
//! the call sequence: a read slot goes straight from `drive_low` to
//! `set_input`, while a reset releases the line (`drive_high`) before
//! switching to input. Matching read data is supplied out of band by
//! pre-arming a queue of response bits before kicking off a script whose
//! shape is already known to the caller (exactly which script is about to
//! run is known to the driver loop, not guessed from the wire).

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use onewire_core::{OneWirePins, OneWireTimer};

/// A fault scenario to inject into the simulated slave's reset response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetFault {
    /// The slave behaves normally: asserts presence shortly after the
    /// master releases the line, then releases it well within the window.
    None,
    /// The slave never asserts presence.
    NoResponse,
    /// The slave asserts presence but never releases the line.
    BusDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Output,
    AfterDriveLow,
    AfterReleaseFromLow,
    ReadSlot,
    Presence,
}

struct LineState {
    mode: Mode,
    master_low: bool,
    presence_released_at: Option<Instant>,
    response_bits: VecDeque<bool>,
    busy_until: Option<Instant>,
}

/// A simulated 1-Wire line plus the fault/response configuration of the one
/// slave living on it. `onewire-core` has no bus enumeration (ROM search is
/// an explicit non-goal), so this models exactly one addressed device.
pub struct SimulatedLine {
    fault: ResetFault,
    state: RefCell<LineState>,
}

impl SimulatedLine {
    /// Construct a line with the given reset-fault scenario. The response
    /// queue starts empty; arm it with [`SimulatedLine::arm_response_bytes`]
    /// or a conversion delay with [`SimulatedLine::arm_conversion`] before
    /// starting a script that expects one.
    pub fn new(fault: ResetFault) -> Self {
        Self {
            fault,
            state: RefCell::new(LineState {
                mode: Mode::Output,
                master_low: false,
                presence_released_at: None,
                response_bits: VecDeque::new(),
                busy_until: None,
            }),
        }
    }

    /// Queue bytes (LSB-first per byte, matching 1-Wire's wire order) to be
    /// returned by the next `READ` opcodes the script executes.
    pub fn arm_response_bytes(&self, bytes: &[u8]) {
        let mut state = self.state.borrow_mut();
        for &byte in bytes {
            for bit in 0..8 {
                state.response_bits.push_back((byte >> bit) & 1 == 1);
            }
        }
    }

    /// Arm a conversion-busy window: every `read_bit` poll samples low
    /// (busy) until `duration` has elapsed in wall-clock time, then high
    /// (conversion complete) exactly once.
    pub fn arm_conversion(&self, duration: Duration) {
        self.state.borrow_mut().busy_until = Some(Instant::now() + duration);
    }

    fn slave_low_during_reset(&self, state: &LineState) -> bool {
        let Some(released_at) = state.presence_released_at else {
            return false;
        };
        let elapsed = released_at.elapsed();
        match self.fault {
            ResetFault::NoResponse => false,
            ResetFault::BusDown => elapsed >= Duration::from_micros(5),
            ResetFault::None => {
                elapsed >= Duration::from_micros(20) && elapsed < Duration::from_micros(60)
            }
        }
    }

    fn next_read_bit(&self, state: &mut LineState) -> bool {
        if let Some(until) = state.busy_until {
            if Instant::now() < until {
                return false;
            }
            state.busy_until = None;
            return true;
        }
        state.response_bits.pop_front().unwrap_or(true)
    }
}

impl OneWirePins for &SimulatedLine {
    fn set_output(&mut self) {
        let mut state = self.state.borrow_mut();
        state.mode = Mode::Output;
    }

    fn set_input(&mut self) {
        let mut state = self.state.borrow_mut();
        state.mode = match state.mode {
            Mode::AfterDriveLow => Mode::ReadSlot,
            Mode::AfterReleaseFromLow => {
                state.presence_released_at = Some(Instant::now());
                Mode::Presence
            }
            other => other,
        };
    }

    fn drive_high(&mut self) {
        let mut state = self.state.borrow_mut();
        state.master_low = false;
        state.mode = match state.mode {
            Mode::AfterDriveLow => Mode::AfterReleaseFromLow,
            _ => Mode::Output,
        };
    }

    fn drive_low(&mut self) {
        let mut state = self.state.borrow_mut();
        state.master_low = true;
        state.mode = Mode::AfterDriveLow;
    }

    fn sample(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.master_low {
            return false;
        }
        match state.mode {
            Mode::Presence => !self.slave_low_during_reset(&state),
            Mode::ReadSlot => self.next_read_bit(&mut state),
            _ => true,
        }
    }
}

/// A microsecond timer backed by [`std::time::Instant`].
pub struct WallClockTimer {
    origin: Instant,
}

impl WallClockTimer {
    /// Construct a timer whose zero point is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClockTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl OneWireTimer for WallClockTimer {
    fn now_us(&self) -> u32 {
        self.origin.elapsed().as_micros() as u32
    }

    fn wait_us(&self, delay_us: u32) {
        std::thread::sleep(Duration::from_micros(delay_us as u64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell as CoreRefCell;
    use core::task::Poll;
    use onewire_core::{OneWireBus, OneWireDevice};

    fn drive_to_completion<P: OneWirePins, T: OneWireTimer>(
        device: &mut OneWireDevice<P, T>,
    ) -> Result<(), onewire_core::OneWireError> {
        loop {
            match device.continue_operation() {
                Poll::Pending => {}
                Poll::Ready(result) => return result,
            }
        }
    }

    #[test]
    fn never_present_slave_yields_no_response() {
        let line = SimulatedLine::new(ResetFault::NoResponse);
        let bus = CoreRefCell::new(OneWireBus::new(&line, WallClockTimer::new()));
        let mut device = OneWireDevice::new(&bus);
        device.read_rom().unwrap();
        let result = drive_to_completion(&mut device);
        assert_eq!(result, Err(onewire_core::OneWireError::NoResponse));
    }

    #[test]
    fn never_releasing_slave_yields_bus_down() {
        let line = SimulatedLine::new(ResetFault::BusDown);
        let bus = CoreRefCell::new(OneWireBus::new(&line, WallClockTimer::new()));
        let mut device = OneWireDevice::new(&bus);
        device.read_rom().unwrap();
        let result = drive_to_completion(&mut device);
        assert_eq!(result, Err(onewire_core::OneWireError::BusDown));
    }

    #[test]
    fn read_rom_returns_armed_response() {
        let line = SimulatedLine::new(ResetFault::None);
        let rom = [0x28, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0xA1];
        line.arm_response_bytes(&rom);
        let bus = CoreRefCell::new(OneWireBus::new(&line, WallClockTimer::new()));
        let mut device = OneWireDevice::new(&bus);
        device.read_rom().unwrap();
        let result = drive_to_completion(&mut device);
        assert_eq!(result, Ok(()));
        assert_eq!(device.address(), rom);
    }

    #[test]
    fn late_conversion_eventually_completes() {
        let line = SimulatedLine::new(ResetFault::None);
        line.arm_conversion(Duration::from_millis(2));
        let bus = CoreRefCell::new(OneWireBus::new(&line, WallClockTimer::new()));
        let mut device = OneWireDevice::new(&bus);
        device.convert_temperature().unwrap();
        let started = Instant::now();
        let result = drive_to_completion(&mut device);
        assert_eq!(result, Ok(()));
        assert!(started.elapsed() >= Duration::from_millis(2));
    }
}
