/// Temperature conversion resolution, encoded exactly as the DS18B20
/// configuration register byte (bits 5-6; bits 0-4 and 7 are always set).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 9-bit resolution, 0.5 degC steps.
    Bits9 = 0x1F,
    /// 10-bit resolution, 0.25 degC steps.
    Bits10 = 0x3F,
    /// 11-bit resolution, 0.125 degC steps.
    Bits11 = 0x5F,
    /// 12-bit resolution, 0.0625 degC steps.
    Bits12 = 0x7F,
}

impl Default for Resolution {
    fn default() -> Self {
        Self::Bits12
    }
}

impl Resolution {
    /// Worst-case conversion time for this resolution, per the datasheet.
    pub fn conversion_delay_us(&self) -> u32 {
        use Resolution::*;
        match self {
            Bits9 => 93_750,
            Bits10 => 187_500,
            Bits11 => 375_000,
            Bits12 => 750_000,
        }
    }
}

impl TryFrom<u8> for Resolution {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Resolution::*;
        match value {
            0x1F => Ok(Bits9),
            0x3F => Ok(Bits10),
            0x5F => Ok(Bits11),
            0x7F => Ok(Bits12),
            _ => Err("invalid DS18B20 resolution byte"),
        }
    }
}
