use crate::{SignalState, Token};
use std::fmt;

/// Index of a channel's buffer in the director-owned buffer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub usize);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// Errors raised when a buffer is written against its monotonic contract.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("signal already known as {current}, cannot become {attempted} in the same instant")]
    Conflict {
        current: SignalState,
        attempted: SignalState,
    },
}

/// Tri-state holder for one channel's value in the current instant.
///
/// Once the state leaves `Unknown` it stays put until [`reset`](Self::reset)
/// is called at the start of the next instant. Writing the same known state
/// twice is accepted; writing a different one is a [`SignalError::Conflict`].
///
/// # Ownership
///
/// Buffers are owned by the director for the lifetime of a run. The only
/// writer during an instant is the component driving the channel, or the
/// director when it concludes that the producer will not speak again.
#[derive(Debug, Clone, Default)]
pub struct SignalBuffer {
    state: SignalState,
}

impl SignalBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the buffer back to `Unknown`.
    pub fn reset(&mut self) {
        self.state = SignalState::Unknown;
    }

    pub fn is_known(&self) -> bool {
        self.state.is_known()
    }

    /// Current state. Check [`is_known`](Self::is_known) before relying on
    /// the absence of a token.
    pub fn get(&self) -> &SignalState {
        &self.state
    }

    pub fn put_present(&mut self, token: Token) -> Result<(), SignalError> {
        self.transition(SignalState::Present(token))
    }

    pub fn put_absent(&mut self) -> Result<(), SignalError> {
        self.transition(SignalState::Absent)
    }

    /// Mark an unknown buffer absent. Known buffers are left alone.
    ///
    /// Returns `true` if the state changed.
    pub fn force_absent(&mut self) -> bool {
        if self.state.is_known() {
            return false;
        }
        self.state = SignalState::Absent;
        true
    }

    fn transition(&mut self, next: SignalState) -> Result<(), SignalError> {
        match &self.state {
            SignalState::Unknown => {
                self.state = next;
                Ok(())
            }
            current if *current == next => Ok(()),
            current => Err(SignalError::Conflict {
                current: current.clone(),
                attempted: next,
            }),
        }
    }
}
