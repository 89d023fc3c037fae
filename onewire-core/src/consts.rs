//! ROM command bytes and bus timing windows.
//!
//! The command bytes are the ones the canonical operation scripts in
//! [`crate::OneWireDevice`] recognize; the timing constants are all in
//! microseconds and are bit-exact with the 1-Wire physical layer.

/// Read ROM command: retrieves the 8-byte ROM code of the sole device on the bus.
pub const READ_ROM_CMD: u8 = 0x33;
/// Match ROM command: addresses one device on the bus by its 8-byte ROM code.
pub const MATCH_ROM_CMD: u8 = 0x55;
/// Read Scratchpad command: streams back the device's 9-byte scratchpad.
pub const READ_SCRATCHPAD_CMD: u8 = 0xBE;
/// Convert T command: starts a temperature conversion.
pub const CONVERT_T_CMD: u8 = 0x44;

/// Bus timing windows, all in microseconds.
pub(crate) mod timing {
    /// Duration the master holds the line low to start a reset pulse.
    pub const RESET_LOW_US: u32 = 500;
    /// Settle time after releasing the line, before switching to input.
    pub const RESET_SETTLE_US: u32 = 1;
    /// Maximum time to wait for presence (line pulled low), and separately
    /// for release (line pulled high) once presence is seen.
    pub const PRESENCE_WINDOW_US: u32 = 480;
    /// Recovery time after presence detection before the bus is usable again.
    pub const RESET_RECOVER_US: u32 = 500;
    /// Initial pulldown that marks the start of every write slot.
    pub const WRITE_PULLDOWN_US: u32 = 2;
    /// Total duration of one write slot.
    pub const WRITE_SLOT_US: u32 = 92;
    /// Initial pulldown that marks the start of every read slot.
    pub const READ_PULLDOWN_US: u32 = 1;
    /// Time from the start of a read slot to the sampling point.
    pub const READ_SAMPLE_US: u32 = 12;
}
