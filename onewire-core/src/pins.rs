/// Hardware capability bundle a host must provide to drive a single 1-Wire line.
///
/// This collapses the five install-a-callback hooks of the original design
/// (`set_output_fn`, `set_input_fn`, `set_pull_up_fn` aka drive-high,
/// `set_pull_down_fn` aka drive-low, `set_read_fn`) into a single trait that
/// [`OneWireBus::new`](crate::OneWireBus::new) takes by value, so a bus
/// value can never exist half-configured.
///
/// Implementors are expected to be thin wrappers around a single open-drain
/// GPIO pin. None of these methods may block.
pub trait OneWirePins {
    /// Configure the line as an output (needed before driving it high or low).
    fn set_output(&mut self);
    /// Configure the line as an input (needed before sampling it).
    fn set_input(&mut self);
    /// Release the line high (the external pull-up resistor does the rest).
    fn drive_high(&mut self);
    /// Actively pull the line low.
    fn drive_low(&mut self);
    /// Sample the current line level. `true` is high, `false` is low.
    fn sample(&self) -> bool;
}
