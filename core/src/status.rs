/// Change status of a state relative to stored session data.
///
/// Computable purely from the current request's submitted data and the
/// current session contents; no other mutable state participates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateStatus {
    /// Neither request nor session carries this state's key(s).
    New,
    /// The request carries the key(s) but the session does not.
    Set,
    /// Submitted and stored values match, or no submission was expected.
    Unchanged,
    /// The submitted value differs from the stored value.
    Changed,
    /// Submitted data failed validation.
    Error,
}
