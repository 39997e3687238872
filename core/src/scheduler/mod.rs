//! Strategies for ordering component firings within an instant.

mod dependency;
pub mod graph;
mod random;

pub use dependency::{CycleError, DependencyScheduler, SlotName};
pub use graph::{DependencyGraph, Slot};
pub use random::RandomScheduler;

use crate::network::Network;
use crate::schedule::Schedule;
use crate::{SchedulerConfig, SchedulerKind};

/// The scheduling strategy a director was set up with.
#[derive(Debug)]
pub enum Scheduler {
    Dependency(DependencyScheduler),
    Random(RandomScheduler),
}

impl Scheduler {
    pub fn dependency() -> Self {
        Scheduler::Dependency(DependencyScheduler::new())
    }

    pub fn random(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Scheduler::Random(RandomScheduler::with_seed(seed)),
            None => Scheduler::Random(RandomScheduler::new()),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        match config.kind {
            SchedulerKind::Dependency => Self::dependency(),
            SchedulerKind::Random => Self::random(config.seed),
        }
    }

    pub fn kind(&self) -> SchedulerKind {
        match self {
            Scheduler::Dependency(_) => SchedulerKind::Dependency,
            Scheduler::Random(_) => SchedulerKind::Random,
        }
    }

    /// Build a schedule for the current topology. Only the dependency
    /// strategy can fail.
    pub fn build(&mut self, network: &Network) -> Result<Schedule, CycleError> {
        match self {
            Scheduler::Dependency(s) => s.build(network),
            Scheduler::Random(s) => Ok(s.build(network)),
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::dependency()
    }
}
