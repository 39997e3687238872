//! The fixed-point director: drives a network through synchronous instants.

use crate::network::{ComponentId, Network};
use crate::schedule::Schedule;
use crate::scheduler::{CycleError, Scheduler};
use crate::{
    ConfigError, DirectorConfig, Phase, PortWiring, RunConfig, SignalBuffer, SignalState,
    Strictness,
};
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where the director is within the current instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InstantPhase {
    ResetBuffers,
    Converging,
    Finalizing,
    Done,
}

/// Cloneable flag for asking a running director to stop.
///
/// Checked between firings. The pass in progress is abandoned and no new
/// instant is started.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Cost counters accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectorStats {
    /// Completed instants
    pub instants: u64,
    /// Schedule walks summed over all instants
    pub total_passes: u64,
    /// Passes times schedule length, summed over instants
    pub rough_cost: u64,
    /// Actual `fire` invocations
    pub real_cost: u64,
}

/// Outcome of a single instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstantReport {
    pub instant: u64,
    /// Logical time at which the instant ran
    pub time: f64,
    pub passes: u64,
    /// Channels still unknown at the fixed point
    pub unknown_channels: usize,
    pub keep_running: bool,
    /// A stop request cut the instant short; nothing was postfired
    pub interrupted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    IterationLimit,
    AllDisabled,
    StopRequested,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub stats: DirectorStats,
    /// Logical time after the last completed instant
    pub time: f64,
    pub reason: StopReason,
}

#[derive(thiserror::Error, Debug)]
pub enum DirectorError {
    #[error(transparent)]
    Schedule(#[from] CycleError),

    #[error("component '{component}' failed during {phase}")]
    Component {
        component: String,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    /// Some component still has an unknown input once the instant has
    /// converged. Nothing was postfired.
    #[error("unknown inputs remain at '{component}' in instant {instant}; possible causality loop")]
    CausalityLoop { component: String, instant: u64 },

    #[error("invalid director config: {0}")]
    Config(#[from] ConfigError),

    #[error("director has not been initialized")]
    NotInitialized,
}

/// Evaluates a [`Network`] one instant at a time until each instant
/// reaches its least fixed point.
///
/// The director owns the network, every signal buffer and all firing
/// bookkeeping. Components only ever see their own ports through
/// [`FireCx`](crate::FireCx).
pub struct Director {
    network: Network,
    config: DirectorConfig,
    scheduler: Scheduler,
    schedule: Option<Arc<Schedule>>,
    wiring: Vec<PortWiring>,
    buffers: Vec<SignalBuffer>,
    /// Components whose postfire returned false; never fired again
    disabled: HashSet<ComponentId>,
    /// Components whose prefire returned true this instant
    allowed: IndexSet<ComponentId>,
    fired: HashSet<ComponentId>,
    instant: u64,
    time: f64,
    stats: DirectorStats,
    stop: StopHandle,
    phase: InstantPhase,
}

impl Director {
    pub fn new(network: Network, config: DirectorConfig, scheduler: Scheduler) -> Self {
        let time = config.start_time;
        Self {
            network,
            config,
            scheduler,
            schedule: None,
            wiring: Vec::new(),
            buffers: Vec::new(),
            disabled: HashSet::new(),
            allowed: IndexSet::new(),
            fired: HashSet::new(),
            instant: 0,
            time,
            stats: DirectorStats::default(),
            stop: StopHandle::default(),
            phase: InstantPhase::Done,
        }
    }

    pub fn from_config(network: Network, config: &RunConfig) -> Self {
        Self::new(
            network,
            config.director.clone(),
            Scheduler::from_config(&config.scheduler),
        )
    }

    /// Build the schedule and buffers and reset all run state.
    pub fn initialize(&mut self) -> Result<(), DirectorError> {
        self.config.validate()?;
        self.schedule = None;
        self.disabled.clear();
        self.stats = DirectorStats::default();
        self.instant = 0;
        self.time = self.config.start_time;
        self.stop.clear();
        self.rebuild()?;
        log::info!(
            "Director: Initialized with {} components, {} channels",
            self.network.len(),
            self.buffers.len()
        );
        Ok(())
    }

    fn rebuild(&mut self) -> Result<(), DirectorError> {
        let schedule = self.scheduler.build(&self.network)?;
        let wiring = self.network.build_wiring();
        self.buffers = vec![SignalBuffer::new(); wiring.channels];
        self.wiring = wiring.ports;
        self.schedule = Some(Arc::new(schedule));
        Ok(())
    }

    /// Replace the scheduling strategy. Takes effect on the next
    /// [`initialize`](Self::initialize).
    pub fn set_scheduler(&mut self, scheduler: Scheduler) {
        self.scheduler = scheduler;
        self.schedule = None;
    }

    /// Run exactly one instant.
    pub fn iterate(&mut self) -> Result<InstantReport, DirectorError> {
        let Some(current) = &self.schedule else {
            return Err(DirectorError::NotInitialized);
        };
        if !current.is_current(&self.network) {
            log::info!("Director: Topology changed, rebuilding schedule");
            self.rebuild()?;
        }
        let schedule = match &self.schedule {
            Some(schedule) => Arc::clone(schedule),
            None => return Err(DirectorError::NotInitialized),
        };

        self.enter(InstantPhase::ResetBuffers);
        for buffer in &mut self.buffers {
            buffer.reset();
        }
        self.allowed.clear();
        self.fired.clear();

        self.enter(InstantPhase::Converging);
        let mut previous: Option<(usize, usize)> = None;
        let mut passes = 0u64;
        let mut interrupted = false;
        loop {
            passes += 1;
            for id in schedule.components() {
                if self.stop.is_stop_requested() {
                    interrupted = true;
                    break;
                }
                self.visit(id)?;
            }
            if interrupted {
                break;
            }

            let counts = (self.known_count(), self.allowed.len());
            log::trace!(
                "Director: Instant {} pass {}: {} known, {} allowed",
                self.instant,
                passes,
                counts.0,
                counts.1
            );
            if previous == Some(counts) {
                break;
            }
            previous = Some(counts);
        }

        let unknown_channels = self.buffers.len() - self.known_count();
        if interrupted {
            log::info!(
                "Director: Stop requested during instant {}, skipping postfire",
                self.instant
            );
            self.enter(InstantPhase::Done);
            return Ok(InstantReport {
                instant: self.instant,
                time: self.time,
                passes,
                unknown_channels,
                keep_running: false,
                interrupted: true,
            });
        }
        if unknown_channels > 0 {
            self.check_inputs_resolved(&schedule)?;
            log::warn!(
                "Director: Instant {} reached a fixed point with {} unknown channels",
                self.instant,
                unknown_channels
            );
        }

        self.enter(InstantPhase::Finalizing);
        let mut postfired = HashSet::new();
        for id in schedule.components() {
            if !postfired.insert(id) || !self.allowed.contains(&id) {
                continue;
            }
            if !self.call(id, Phase::Postfire)? {
                log::info!(
                    "Director: '{}' deactivated after instant {}",
                    self.network.name(id).unwrap_or("?"),
                    self.instant
                );
                self.disabled.insert(id);
            }
        }

        self.enter(InstantPhase::Done);
        self.stats.instants += 1;
        self.stats.total_passes += passes;
        self.stats.rough_cost += passes * schedule.len() as u64;

        let report = InstantReport {
            instant: self.instant,
            time: self.time,
            passes,
            unknown_channels,
            keep_running: false,
            interrupted: false,
        };
        self.instant += 1;
        self.time += self.config.period;
        Ok(InstantReport {
            keep_running: self.stop_reason().is_none(),
            ..report
        })
    }

    /// Fail before any postfire if a live component would see an unknown
    /// input, unless the config tolerates it.
    fn check_inputs_resolved(&mut self, schedule: &Schedule) -> Result<(), DirectorError> {
        if self.config.allow_unknown_inputs {
            return Ok(());
        }
        let stuck = schedule
            .components()
            .find(|&id| !self.disabled.contains(&id) && !self.all_inputs_known(id));
        let Some(id) = stuck else {
            return Ok(());
        };
        let component = self.network.name(id).unwrap_or("?").to_string();
        log::error!(
            "Director: '{}' has unknown inputs at the end of instant {}",
            component,
            self.instant
        );
        self.enter(InstantPhase::Done);
        Err(DirectorError::CausalityLoop {
            component,
            instant: self.instant,
        })
    }

    /// Iterate until the iteration limit, until every component is
    /// disabled, or until a stop is requested.
    pub fn run(&mut self) -> Result<RunSummary, DirectorError> {
        if self.schedule.is_none() {
            self.initialize()?;
        }

        loop {
            let report = self.iterate()?;
            if !report.keep_running {
                break;
            }
        }

        let reason = self.stop_reason().unwrap_or(StopReason::StopRequested);
        log::info!(
            "Director: Run finished after {} instants ({:?}), {} fires in {} passes",
            self.stats.instants,
            reason,
            self.stats.real_cost,
            self.stats.total_passes
        );
        Ok(RunSummary {
            stats: self.stats.clone(),
            time: self.time,
            reason,
        })
    }

    fn stop_reason(&self) -> Option<StopReason> {
        if self.stop.is_stop_requested() {
            return Some(StopReason::StopRequested);
        }
        if let Some(limit) = self.config.iteration_limit() {
            if self.instant >= limit {
                return Some(StopReason::IterationLimit);
            }
        }
        if self.network.ids().all(|id| self.disabled.contains(&id)) {
            return Some(StopReason::AllDisabled);
        }
        None
    }

    fn enter(&mut self, phase: InstantPhase) {
        log::trace!("Director: Instant {} -> {:?}", self.instant, phase);
        self.phase = phase;
    }

    /// Offer one firing to a component.
    fn visit(&mut self, id: ComponentId) -> Result<(), DirectorError> {
        if self.disabled.contains(&id) {
            self.force_unknown_outputs_absent(id);
            return Ok(());
        }

        let strict = self.network.strictness(id) == Some(Strictness::Strict);
        if strict && !self.all_inputs_known(id) {
            return Ok(());
        }

        if !self.allowed.contains(&id) {
            if !self.call(id, Phase::Prefire)? {
                return Ok(());
            }
            self.allowed.insert(id);
        }

        if self.is_finished(id) {
            return Ok(());
        }

        let inputs_known = self.all_inputs_known(id);
        self.call(id, Phase::Fire)?;
        self.fired.insert(id);
        self.stats.real_cost += 1;

        // Nothing upstream can change any more, so neither can this
        // component's undefined outputs.
        if inputs_known {
            let forced = self.force_unknown_outputs_absent(id);
            if forced > 0 {
                log::debug!(
                    "Director: Assumed {} outputs of '{}' absent",
                    forced,
                    self.network.name(id).unwrap_or("?")
                );
            }
        }
        Ok(())
    }

    /// Invoke one protocol step, attaching component identity to failures.
    fn call(&mut self, id: ComponentId, phase: Phase) -> Result<bool, DirectorError> {
        let entry = self.network.entry_mut(id);
        log::debug!("Director: {} '{}' at instant {}", phase, entry.name, self.instant);

        let mut cx = crate::FireCx::new(
            self.instant,
            self.time,
            phase,
            &entry.ports,
            &self.wiring[id.0],
            &mut self.buffers,
        );
        let result = match phase {
            Phase::Prefire => entry.component.prefire(&mut cx),
            Phase::Fire => entry.component.fire(&mut cx).map(|()| true),
            Phase::Postfire => entry.component.postfire(&mut cx),
        };
        result.map_err(|source| DirectorError::Component {
            component: entry.name.clone(),
            phase,
            source,
        })
    }

    /// Strict, fired this instant, and every output known.
    fn is_finished(&self, id: ComponentId) -> bool {
        self.network.strictness(id) == Some(Strictness::Strict)
            && self.fired.contains(&id)
            && self.all_outputs_known(id)
    }

    fn all_inputs_known(&self, id: ComponentId) -> bool {
        self.ports_known(id, true)
    }

    fn all_outputs_known(&self, id: ComponentId) -> bool {
        self.ports_known(id, false)
    }

    fn ports_known(&self, id: ComponentId, inputs: bool) -> bool {
        let ports = self.network.entry(id).ports.iter().enumerate();
        ports
            .filter(|(_, p)| p.is_input() == inputs)
            .all(|(i, _)| match self.wiring[id.0].channel(i) {
                Some(channel) => self.buffers[channel.0].is_known(),
                None => true,
            })
    }

    fn force_unknown_outputs_absent(&mut self, id: ComponentId) -> usize {
        let entry = self.network.entry(id);
        let wiring = &self.wiring[id.0];
        let mut forced = 0;
        for (i, _) in entry.ports.iter().enumerate().filter(|(_, p)| p.is_output()) {
            if let Some(channel) = wiring.channel(i) {
                if self.buffers[channel.0].force_absent() {
                    forced += 1;
                }
            }
        }
        forced
    }

    fn known_count(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_known()).count()
    }

    /// State of an output port's channel in the current (or last) instant.
    pub fn output_state(&self, component: &str, port: &str) -> Option<&SignalState> {
        let id = self.network.component_id(component)?;
        let index = self.network.port_index(id, port)?;
        if !self.network.entry(id).ports[index].is_output() {
            return None;
        }
        let channel = self.wiring.get(id.0)?.channel(index)?;
        self.buffers.get(channel.0).map(SignalBuffer::get)
    }

    /// Every output channel keyed by `component.port`.
    pub fn channel_states(&self) -> BTreeMap<String, SignalState> {
        let mut states = BTreeMap::new();
        for id in self.network.ids() {
            let Some(wiring) = self.wiring.get(id.0) else {
                continue;
            };
            let entry = self.network.entry(id);
            for (i, port) in entry.ports.iter().enumerate() {
                if !port.is_output() {
                    continue;
                }
                if let Some(buffer) = wiring.channel(i).and_then(|c| self.buffers.get(c.0)) {
                    states.insert(format!("{}.{}", entry.name, port.id), buffer.get().clone());
                }
            }
        }
        states
    }

    pub fn is_disabled(&self, component: &str) -> bool {
        self.network
            .component_id(component)
            .is_some_and(|id| self.disabled.contains(&id))
    }

    /// Logical time of the next instant.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Index of the next instant.
    pub fn instant(&self) -> u64 {
        self.instant
    }

    pub fn phase(&self) -> InstantPhase {
        self.phase
    }

    pub fn stats(&self) -> &DirectorStats {
        &self.stats
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Topology edits made here are picked up before the next instant.
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_deref()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn into_network(self) -> Network {
        self.network
    }
}
