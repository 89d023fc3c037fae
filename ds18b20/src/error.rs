use onewire_core::OneWireError;

/// Errors reported while driving a DS18B20-family sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ds18b20Error {
    /// A bus or device engine error, propagated unchanged.
    Bus(OneWireError),
    /// The scratchpad's trailing CRC byte did not validate.
    CrcMismatch,
}

impl From<OneWireError> for Ds18b20Error {
    fn from(error: OneWireError) -> Self {
        Self::Bus(error)
    }
}
