pub use fixpoint_component_api::{
    ChannelId, Component, DataType, Dependencies, FireCx, Phase, PortDesc, PortDirection,
    PortError, PortWiring, SignalBuffer, SignalError, SignalState, Strictness, Token,
};
pub use fixpoint_config::{
    ConfigError, DirectorConfig, RunConfig, SchedulerConfig, SchedulerKind,
};

pub mod network;
pub use network::{ComponentId, Connection, ConnectionId, Network, NetworkError};

pub mod schedule;
pub use schedule::{Firing, Schedule};

pub mod scheduler;
pub use scheduler::{
    CycleError, DependencyGraph, DependencyScheduler, RandomScheduler, Scheduler, SlotName,
};

pub mod director;
pub use director::{
    Director, DirectorError, DirectorStats, InstantPhase, InstantReport, RunSummary, StopHandle,
    StopReason,
};

#[cfg(test)]
mod testing;
