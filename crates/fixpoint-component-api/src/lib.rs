pub use fixpoint_signals::{
    ChannelId, DataType, PortDesc, PortDirection, SignalBuffer, SignalError, SignalState, Token,
};

use std::fmt;

static UNCONNECTED: SignalState = SignalState::Absent;

/// Whether a component needs all of its inputs known before it may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Fires once per instant, after every input is known
    #[default]
    Strict,
    /// May fire with unknown inputs; offered a firing on every pass
    NonStrict,
}

/// Which outputs can be influenced by which inputs within a single instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependencies {
    /// Every output depends on every input
    AllToAll,
    /// No output depends on any input in the same instant (e.g. a delay)
    Decoupled,
    /// Explicit (input port, output port) pairs
    Pairs(Vec<(String, String)>),
}

/// The step of the firing protocol currently being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Prefire,
    Fire,
    Postfire,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Prefire => write!(f, "prefire"),
            Phase::Fire => write!(f, "fire"),
            Phase::Postfire => write!(f, "postfire"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PortError {
    #[error("no port named '{0}'")]
    UnknownPort(String),

    #[error("port '{0}' is not an input")]
    NotAnInput(String),

    #[error("port '{0}' is not an output")]
    NotAnOutput(String),

    #[error("port '{port}' cannot be written during {phase}")]
    WriteOutsidePhase { port: String, phase: Phase },

    #[error("port '{port}' carries {expected:?}, got a {found:?} token")]
    TypeMismatch {
        port: String,
        expected: DataType,
        found: DataType,
    },

    #[error("port '{port}': {source}")]
    Signal {
        port: String,
        #[source]
        source: SignalError,
    },
}

/// Maps each of a component's ports (by position) to the channel behind it.
///
/// Outputs always own a channel. Inputs have one only when connected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortWiring {
    channels: Vec<Option<ChannelId>>,
}

impl PortWiring {
    pub fn new(channels: Vec<Option<ChannelId>>) -> Self {
        Self { channels }
    }

    pub fn channel(&self, port_index: usize) -> Option<ChannelId> {
        self.channels.get(port_index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// A component's window onto its own ports for one protocol call.
///
/// Only the channels wired to this component's ports are reachable, and
/// outputs can only be written during [`Phase::Fire`].
pub struct FireCx<'a> {
    /// Index of the current instant (0-based)
    pub instant: u64,
    /// Logical time of the current instant
    pub time: f64,
    phase: Phase,
    ports: &'a [PortDesc],
    wiring: &'a PortWiring,
    buffers: &'a mut [SignalBuffer],
}

impl<'a> FireCx<'a> {
    pub fn new(
        instant: u64,
        time: f64,
        phase: Phase,
        ports: &'a [PortDesc],
        wiring: &'a PortWiring,
        buffers: &'a mut [SignalBuffer],
    ) -> Self {
        Self {
            instant,
            time,
            phase,
            ports,
            wiring,
            buffers,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// State of an input port. Unconnected inputs read as absent.
    pub fn input(&self, port: &str) -> Result<&SignalState, PortError> {
        let index = self.port_index(port)?;
        if !self.ports[index].is_input() {
            return Err(PortError::NotAnInput(port.to_string()));
        }
        Ok(self.state_at(index))
    }

    /// Token on an input port, if it is known and present.
    pub fn token(&self, port: &str) -> Result<Option<&Token>, PortError> {
        Ok(self.input(port)?.token())
    }

    pub fn is_known(&self, port: &str) -> Result<bool, PortError> {
        Ok(self.input(port)?.is_known())
    }

    pub fn all_inputs_known(&self) -> bool {
        self.ports
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_input())
            .all(|(i, _)| self.state_at(i).is_known())
    }

    /// Current state of one of this component's outputs.
    pub fn output(&self, port: &str) -> Result<&SignalState, PortError> {
        let index = self.port_index(port)?;
        if !self.ports[index].is_output() {
            return Err(PortError::NotAnOutput(port.to_string()));
        }
        Ok(self.state_at(index))
    }

    /// Emit a token on an output port.
    pub fn put(&mut self, port: &str, token: impl Into<Token>) -> Result<(), PortError> {
        let token = token.into();
        let index = self.writable_output(port)?;
        let expected = self.ports[index].data_type;
        if !token.data_type().compatible_with(expected) {
            return Err(PortError::TypeMismatch {
                port: port.to_string(),
                expected,
                found: token.data_type(),
            });
        }
        match self.wiring.channel(index) {
            Some(channel) => self.buffers[channel.0]
                .put_present(token)
                .map_err(|source| PortError::Signal {
                    port: port.to_string(),
                    source,
                }),
            None => Ok(()),
        }
    }

    /// Declare an output port absent for this instant.
    pub fn put_absent(&mut self, port: &str) -> Result<(), PortError> {
        let index = self.writable_output(port)?;
        match self.wiring.channel(index) {
            Some(channel) => {
                self.buffers[channel.0]
                    .put_absent()
                    .map_err(|source| PortError::Signal {
                        port: port.to_string(),
                        source,
                    })
            }
            None => Ok(()),
        }
    }

    fn writable_output(&self, port: &str) -> Result<usize, PortError> {
        let index = self.port_index(port)?;
        if !self.ports[index].is_output() {
            return Err(PortError::NotAnOutput(port.to_string()));
        }
        if self.phase != Phase::Fire {
            return Err(PortError::WriteOutsidePhase {
                port: port.to_string(),
                phase: self.phase,
            });
        }
        Ok(index)
    }

    fn port_index(&self, port: &str) -> Result<usize, PortError> {
        self.ports
            .iter()
            .position(|p| p.id == port)
            .ok_or_else(|| PortError::UnknownPort(port.to_string()))
    }

    fn state_at(&self, index: usize) -> &SignalState {
        match self.wiring.channel(index) {
            Some(channel) => self.buffers[channel.0].get(),
            None => &UNCONNECTED,
        }
    }
}

/// A reactive component driven by a fixed-point director.
///
/// Within one instant the director may call `prefire` and `fire` any
/// number of times, but `postfire` exactly once, after the fixed point is
/// found. `prefire` must be monotonic: once it has returned `true` in an
/// instant, it would keep returning `true` for that instant.
pub trait Component: Send {
    /// Name of this component, unique within a network
    fn name(&self) -> &str;

    /// Declared ports, captured once when the component joins a network
    fn ports(&self) -> Vec<PortDesc>;

    fn strictness(&self) -> Strictness {
        Strictness::Strict
    }

    /// Causality interface used by the dependency-graph scheduler.
    ///
    /// Strict components default to every output depending on every input;
    /// non-strict ones default to no same-instant dependencies.
    fn dependencies(&self) -> Dependencies {
        match self.strictness() {
            Strictness::Strict => Dependencies::AllToAll,
            Strictness::NonStrict => Dependencies::Decoupled,
        }
    }

    /// Decide whether this component can run in the current instant.
    fn prefire(&mut self, _cx: &mut FireCx) -> anyhow::Result<bool> {
        Ok(true)
    }

    /// Read known inputs and define outputs.
    fn fire(&mut self, cx: &mut FireCx) -> anyhow::Result<()>;

    /// Commit state. Returning `false` removes the component from all
    /// later instants.
    fn postfire(&mut self, _cx: &mut FireCx) -> anyhow::Result<bool> {
        Ok(true)
    }
}
