//! The generation loop: evaluate, update stats, cull/retune, reproduce, re-speciate — the one
//! place that owns the whole population end to end.
//!
//! # Concurrency
//!
//! Fitness evaluation (step 1) is the only parallel phase. A fixed pool of `config.threads`
//! workers claims species one at a time by atomically flipping each [Species]'s `processing`
//! flag (see [Species::try_claim]) rather than handing out work through a data-parallel
//! iterator — this mirrors the original design's "one species per worker" claim protocol. A
//! single join barrier separates that phase from every subsequent (single-threaded) step;
//! the innovation registry and RNG are only ever touched after the barrier.

use crate::{
    config::Config, fitness::FitnessEvaluator, innovation::InnovationRegistry,
    population::Population, random::WyRng,
};
use log::{debug, info};

/// Lets several worker threads race over the same `&mut [Species]` without a lock: each
/// species' own `processing` flag (see [crate::species::Species::try_claim]) guarantees at
/// most one thread ever dereferences a given slot at a time, so handing out raw pointers to
/// the others is sound even though the borrow checker can't see that invariant.
#[cfg(feature = "parallel")]
struct ClaimableSpecies {
    ptr: *mut crate::species::Species,
    len: usize,
}

#[cfg(feature = "parallel")]
unsafe impl Sync for ClaimableSpecies {}

#[cfg(feature = "parallel")]
impl ClaimableSpecies {
    fn new(species: &mut [crate::species::Species]) -> Self {
        Self {
            ptr: species.as_mut_ptr(),
            len: species.len(),
        }
    }

    fn claim_next(&self) -> Option<&mut crate::species::Species> {
        for i in 0..self.len {
            // SAFETY: indices are disjoint across concurrent callers by construction (each
            // slot is only ever handed out once `try_claim` succeeds for it), and `self.ptr`
            // outlives every borrow handed out here because it's derived from the driver's
            // `&mut Population` for the duration of this scope.
            let slot = unsafe { &mut *self.ptr.add(i) };
            if slot.try_claim() {
                return Some(slot);
            }
        }
        None
    }
}

pub struct GenerationDriver {
    pub population: Population,
    pub registry: InnovationRegistry,
    pub rng: WyRng,
    pub config: Config,
    pub generation: usize,
}

impl GenerationDriver {
    pub fn new(config: Config, sensory: usize, action: usize) -> Self {
        let mut registry = InnovationRegistry::new(0);
        let population = Population::new(
            sensory,
            action,
            config.population_size,
            config.compat_threshold,
            &mut registry,
        );
        Self {
            registry,
            rng: crate::random::seeded_rng(config.seed),
            population,
            config,
            generation: 0,
        }
    }

    /// Step 1: evaluate every genome's fitness, one species at a time, claimed by whichever
    /// worker gets to it first.
    fn evaluate_generation(&mut self, evaluator: &dyn FitnessEvaluator) {
        #[cfg(feature = "parallel")]
        {
            let threads = self.config.threads as usize;
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .expect("failed to build evaluation thread pool");
            let claimable = ClaimableSpecies::new(&mut self.population.species);
            pool.scope(|scope| {
                for _ in 0..threads {
                    scope.spawn(|_| {
                        while let Some(species) = claimable.claim_next() {
                            for genome in species.members.iter_mut() {
                                crate::fitness::get_fitness(genome, evaluator);
                            }
                        }
                    });
                }
            });
            for s in self.population.species.iter() {
                s.reset_claim();
            }
        }

        #[cfg(not(feature = "parallel"))]
        {
            for s in self.population.species.iter_mut() {
                for genome in s.members.iter_mut() {
                    crate::fitness::get_fitness(genome, evaluator);
                }
            }
        }
    }

    /// Run the full ten-step generation sequence once.
    pub fn step(&mut self, evaluator: &dyn FitnessEvaluator) {
        // 1. Set Gaussian sigma: folded into `self.config.perturb_stdev`, already fixed or
        //    auto-scaling per connection (see `PerturbStdev`), so there's nothing to do here.

        // 2. Self-tune the compatibility threshold toward a target species count.
        if self.config.best_compat {
            if let Some(target) = self.config.target_species {
                self.population.retune_threshold(target);
            }
        }

        // 3. Evaluate fitness of every genome (parallel, per-species claim).
        self.evaluate_generation(evaluator);

        // Join barrier implicit: everything below is single-threaded.

        // 4. Within each species, sort ascending by fitness and drop the bottom
        //    `floor(survival_threshold · size)` genomes, before stats/stagnation/quota below
        //    ever see the species' size or membership.
        for s in self.population.species.iter_mut() {
            s.cull(self.config.survival_threshold);
        }

        // 5. Update stats, apply stagnation policies.
        for s in self.population.species.iter_mut() {
            s.update_stats();
        }

        let stats = self.population.stats(self.generation);
        info!(
            "generation {}: species={} best={:.4} mean={:.4}",
            stats.generation, stats.species_count, stats.best_fitness, stats.mean_fitness
        );

        self.population
            .apply_stagnation_policy(self.config.kill_stagnated, self.config.refocus_stagnated);

        // 6. Snapshot each surviving species' champion into the successor population: elitism
        //    inside `Species::reproduce` carries the champion into `offspring` unmutated, and
        //    `speciate` below re-places it against its own (frozen) representative, so no
        //    separate pre-seeding pass is needed here.

        // 7. Allocate each surviving species a share of the next generation proportional to
        //    its adjusted (fitness-shared) total.
        let total_size = self.config.population_size;
        let fit_totals: Vec<f64> = self
            .population
            .species
            .iter()
            .map(|s| s.adjusted_fitness_total())
            .collect();
        let fit_sum: f64 = fit_totals.iter().sum();
        let allocations: Vec<usize> = if fit_sum <= 0.0 {
            let share = total_size / self.population.species.len().max(1);
            vec![share; self.population.species.len()]
        } else {
            fit_totals
                .iter()
                .map(|f| ((f / fit_sum) * total_size as f64).round() as usize)
                .collect()
        };

        // 8. Reproduce each species into its allocated share of offspring.
        let mut next_id = self
            .population
            .species
            .iter()
            .flat_map(|s| s.members.iter().map(|g| g.id))
            .max()
            .map(|m| m + 1)
            .unwrap_or(0);

        let mut offspring = Vec::with_capacity(total_size);
        for (s, &alloc) in self.population.species.iter().zip(allocations.iter()) {
            // Clamp each species' quota so one lucky allocation round can't let it double in
            // size outright; offspring still come from this generation's survivors only.
            let alloc = alloc.min(2 * s.len().max(1));
            debug!("species with {} members -> {alloc} offspring", s.len());
            let kids = s.reproduce(
                alloc,
                &mut self.registry,
                &mut self.rng,
                &mut next_id,
                self.config.p_mutate_only,
                self.config.p_mate_only,
                self.config.p_inherit_disabled,
                [
                    self.config.p_mutate_addnode,
                    self.config.p_mutate_addconn,
                    self.config.p_mutate_weights,
                ],
                self.config.p_perturb_or_new,
                self.config.perturb_stdev,
            );
            offspring.extend(kids);
        }

        // 9. Re-speciate the flat offspring pool against (now-stable) species representatives.
        self.population.speciate(offspring, &self.config);

        // 10. Advance the generation counter.
        self.generation += 1;
    }

    pub fn run(&mut self, evaluator: &dyn FitnessEvaluator) {
        for _ in 0..self.config.generations {
            self.step(evaluator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::{DatasetRecord, RegressionEvaluator};

    #[test]
    fn driver_runs_generations_without_losing_the_population() {
        let mut config = Config::default();
        config.population_size = 12;
        config.generations = 3;
        config.seed = 123;

        let dataset = vec![
            DatasetRecord::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1.0),
            DatasetRecord::new([0.0, 1.0, 0.0, 0.0, 0.0, 0.0], 0.5),
        ];
        let evaluator = RegressionEvaluator::new(dataset);

        let mut driver = GenerationDriver::new(config, 6, 1);
        driver.run(&evaluator);

        assert_eq!(driver.generation, 3);
        let total: usize = driver.population.species.iter().map(|s| s.len()).sum();
        assert!(total > 0);
    }
}
