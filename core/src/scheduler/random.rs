use crate::network::{ComponentId, Network};
use crate::schedule::Schedule;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fmt;

/// Orders components by a uniform shuffle, ignoring structure entirely.
///
/// Always succeeds, including on cyclic networks. Successive builds draw
/// from the same RNG stream, so a seeded scheduler is reproducible across
/// a whole run rather than per build.
pub struct RandomScheduler {
    rng: ChaCha8Rng,
    seed: Option<u64>,
}

impl RandomScheduler {
    /// Seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
            seed: None,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn build(&mut self, network: &Network) -> Schedule {
        let mut order: Vec<ComponentId> = network.ids().collect();
        order.shuffle(&mut self.rng);

        let schedule = Schedule::new(order, network.version());
        log::info!(
            "RandomScheduler: Scheduled {} components: {:?}",
            schedule.len(),
            schedule.names(network)
        );
        schedule
    }
}

impl Default for RandomScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RandomScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomScheduler")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}
