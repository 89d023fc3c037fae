/// Error kinds reported by the bus and device engines.
///
/// Errors are tags, not strings: the core never formats a message, and
/// never retains state past the call that detected the failure. The
/// offending state machine is always reset to idle in the same call that
/// returns the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneWireError {
    /// Rejected a new operation because another one is already active.
    Busy,
    /// `continue_operation` was called while idle; nothing to advance.
    Noop,
    /// No slave asserted presence within the presence-detect window after reset.
    NoResponse,
    /// A slave asserted presence but never released the line.
    BusDown,
    /// Null argument, misconfiguration, or an otherwise impossible state.
    Generic,
}
