/// Microsecond timer capability a host must provide to drive bus timing.
///
/// The counter is free-running and may wrap; [`OneWireBus`](crate::OneWireBus)
/// never compares two raw samples directly, only the wrapping distance from
/// an armed start value (`now_us().wrapping_sub(start)`), which is correct
/// across a single wrap regardless of the counter's modulus.
pub trait OneWireTimer {
    /// Sample the free-running microsecond counter.
    fn now_us(&self) -> u32;

    /// Busy-spin for exactly `delay_us` microseconds.
    ///
    /// Used only for the fixed, known-length sub-delays inside a single bit
    /// slot (the 2 µs write pulldown, the ~90 µs write-1 hold, the 1 µs read
    /// pulldown, the 11 µs settle before sampling). The longer, edge-gated
    /// waits (reset low, recovery, presence windows) are cooperative and
    /// spread across repeated [`continue_operation`](crate::OneWireBus::continue_operation)
    /// calls instead of going through this method.
    fn wait_us(&self, delay_us: u32);
}
