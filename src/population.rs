//! Speciation, stats, and self-tuning compatibility threshold across the whole population.

use crate::{
    compatibility::compatibility, config::Config, genome::Genome, innovation::InnovationRegistry,
    species::Species,
};

pub struct PopulationStats {
    pub generation: usize,
    pub species_count: usize,
    pub best_fitness: f64,
    pub mean_fitness: f64,
}

pub struct Population {
    pub species: Vec<Species>,
    pub compat_threshold: f64,
    next_genome_id: u64,
    /// One-way latch for the self-tuning threshold: once the species count has exceeded
    /// `target_species` at all, the threshold is nudged every generation from then on, even
    /// in generations where the count dips back below target.
    reached_target_species: bool,
}

impl Population {
    pub fn new(
        sensory: usize,
        action: usize,
        size: usize,
        compat_threshold: f64,
        registry: &mut InnovationRegistry,
    ) -> Self {
        let members: Vec<Genome> = (0..size as u64)
            .map(|id| Genome::new(id, sensory, action, registry))
            .collect();
        let next_genome_id = size as u64;
        let founder = members[0].clone();
        let mut species = Species::new(founder);
        species.members = members;
        Self {
            species: vec![species],
            compat_threshold,
            next_genome_id,
            reached_target_species: false,
        }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next_genome_id;
        self.next_genome_id += 1;
        id
    }

    /// Partition a flat, freshly-evaluated generation into species against each existing
    /// species' frozen representative, opening a new species when no existing one is close
    /// enough. Two modes, selected by `config.best_compat`: first-match (default) places a
    /// genome in the first species whose representative is within threshold; best-match
    /// (opt-in) instead finds the argmin-distance species and only falls back to first-match's
    /// "open a new species" behavior if even that minimum misses the threshold.
    pub fn speciate(&mut self, genomes: Vec<Genome>, config: &Config) {
        let mut next = Vec::with_capacity(self.species.len());
        for old in &self.species {
            next.push(Species {
                representative: old.representative.clone(),
                members: Vec::new(),
                best_fitness: old.best_fitness,
                generations_since_improvement: old.generations_since_improvement,
                processing: std::sync::atomic::AtomicBool::new(false),
            });
        }

        for genome in genomes {
            let distances: Vec<f64> = next
                .iter()
                .map(|s| {
                    compatibility(
                        &genome,
                        s.representative.genome(),
                        config.c1_excess,
                        config.c2_disjoint,
                        config.c3_weight,
                    )
                })
                .collect();

            let placed = if config.best_compat {
                distances
                    .iter()
                    .enumerate()
                    .filter(|(_, &d)| d > 0.0)
                    .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                    .filter(|&(_, &d)| d < self.compat_threshold)
                    .map(|(idx, _)| idx)
            } else {
                distances.iter().position(|&d| d < self.compat_threshold)
            };

            match placed {
                Some(idx) => next[idx].members.push(genome),
                None => next.push(Species::new(genome)),
            }
        }

        next.retain(|s| !s.is_empty());
        self.species = next;
    }

    /// Nudge the compatibility threshold toward hitting `target_species`, per the `best-compat`
    /// self-tuning mode the original CLI exposed: a one-way latch arms once the species count
    /// has ever exceeded the target, after which the threshold is stepped by a small fixed
    /// delta whenever the count strays outside `[0.8·target, 1.2·target]`, floored at that
    /// same delta so it can never reach (or cross) zero.
    pub fn retune_threshold(&mut self, target_species: u16) {
        const DELTA: f64 = 0.01;
        let current = self.species.len();
        let target = target_species as f64;

        if !self.reached_target_species && current as f64 > target {
            self.reached_target_species = true;
        }
        if !self.reached_target_species {
            return;
        }

        if current as f64 > target * 1.20 {
            self.compat_threshold += DELTA;
        } else if (current as f64) < target * 0.80 {
            self.compat_threshold -= DELTA;
        }
        if self.compat_threshold < DELTA {
            self.compat_threshold = DELTA;
        }
    }

    pub fn stats(&self, generation: usize) -> PopulationStats {
        let all: Vec<f64> = self
            .species
            .iter()
            .flat_map(|s| s.members.iter().map(|g| g.fitness()))
            .collect();
        let best_fitness = all.iter().cloned().fold(f64::INFINITY, f64::min);
        let mean_fitness = if all.is_empty() {
            0.0
        } else {
            all.iter().sum::<f64>() / all.len() as f64
        };
        PopulationStats {
            generation,
            species_count: self.species.len(),
            best_fitness,
            mean_fitness,
        }
    }

    pub fn fittest(&self) -> Option<&Genome> {
        self.species
            .iter()
            .filter_map(|s| s.best())
            .min_by(|a, b| a.fitness().partial_cmp(&b.fitness()).unwrap())
    }

    /// Stagnation policy: species untouched by improvement for `kill_stagnated` generations are
    /// dropped outright (unless they hold the population's best genome); species stagnant past
    /// `refocus_stagnated` but short of the kill threshold are truncated to their top
    /// performers only, forcing renewed exploration from a narrower gene pool.
    pub fn apply_stagnation_policy(
        &mut self,
        kill_stagnated: Option<u32>,
        refocus_stagnated: Option<u32>,
    ) {
        let global_best = self.fittest().map(|g| g.fitness());

        if let Some(kill_after) = kill_stagnated {
            self.species.retain(|s| {
                !(s.generations_since_improvement >= kill_after
                    && s.len() <= 3
                    && s.best().map(|g| g.fitness()) != global_best)
            });
        }

        if let Some(refocus_after) = refocus_stagnated {
            for s in self.species.iter_mut() {
                if s.generations_since_improvement >= refocus_after && s.members.len() > 2 {
                    let mut ranked = std::mem::take(&mut s.members);
                    ranked.sort_by(|a, b| a.fitness().partial_cmp(&b.fitness()).unwrap());
                    ranked.truncate(2);
                    s.members = ranked;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_population_starts_as_one_species() {
        let mut reg = InnovationRegistry::new(0);
        let pop = Population::new(6, 1, 50, 3.0, &mut reg);
        assert_eq!(pop.species.len(), 1);
        assert_eq!(pop.species[0].members.len(), 50);
    }

    #[test]
    fn speciate_splits_diverging_genomes() {
        let mut reg = InnovationRegistry::new(0);
        let mut pop = Population::new(6, 1, 1, 3.0, &mut reg);
        let config = Config::default();
        let mut rng = crate::random::seeded_rng(77);

        let mut divergent = Genome::new(100, 6, 1, &mut reg);
        for _ in 0..10 {
            divergent.mutate_add_connection(&mut rng, &mut reg);
            divergent.mutate_add_node(&mut rng, &mut reg);
        }

        let base = Genome::new(0, 6, 1, &mut reg);
        pop.speciate(vec![base, divergent], &config);
        assert!(pop.species.len() >= 2);
    }

    #[test]
    fn kill_stagnated_spares_large_stagnant_species() {
        let mut reg = InnovationRegistry::new(0);
        let mut pop = Population::new(6, 1, 4, 3.0, &mut reg);
        pop.species[0].generations_since_improvement = 10;
        pop.species[0].members[0].set_fitness(1.0);
        // A global champion below the kill/refocus thresholds exists elsewhere, so this
        // species isn't protected by the "holds the champion" exception.
        let mut elsewhere = Species::new(Genome::new(99, 6, 1, &mut reg));
        elsewhere.members[0].set_fitness(0.0);
        pop.species.push(elsewhere);

        pop.apply_stagnation_policy(Some(5), None);
        // Size 4 > 3, so the kill condition's size guard spares it even though it's stagnant.
        assert_eq!(pop.species.len(), 2);
    }

    #[test]
    fn kill_stagnated_drops_small_stagnant_species() {
        let mut reg = InnovationRegistry::new(0);
        let mut pop = Population::new(6, 1, 2, 3.0, &mut reg);
        pop.species[0].generations_since_improvement = 10;
        pop.species[0].members[0].set_fitness(1.0);
        let mut elsewhere = Species::new(Genome::new(99, 6, 1, &mut reg));
        elsewhere.members[0].set_fitness(0.0);
        pop.species.push(elsewhere);

        pop.apply_stagnation_policy(Some(5), None);
        assert_eq!(pop.species.len(), 1);
    }

    #[test]
    fn retune_threshold_moves_toward_target() {
        let mut reg = InnovationRegistry::new(0);
        let mut pop = Population::new(6, 1, 1, 3.0, &mut reg);
        pop.species.push(Species::new(Genome::new(1, 6, 1, &mut reg)));
        pop.species.push(Species::new(Genome::new(2, 6, 1, &mut reg)));
        let before = pop.compat_threshold;
        pop.retune_threshold(1);
        assert!(pop.compat_threshold > before);
    }

    #[test]
    fn retune_threshold_does_nothing_before_target_is_ever_exceeded() {
        let mut reg = InnovationRegistry::new(0);
        let mut pop = Population::new(6, 1, 1, 3.0, &mut reg);
        let before = pop.compat_threshold;
        // A single species, well within [0.8*10, 1.2*10] = [8, 12]; the latch hasn't armed
        // because the count has never exceeded the target, so nothing moves yet.
        pop.retune_threshold(10);
        assert_eq!(pop.compat_threshold, before);
    }

    #[test]
    fn retune_threshold_latch_keeps_tuning_after_dropping_back_in_band() {
        let mut reg = InnovationRegistry::new(0);
        let mut pop = Population::new(6, 1, 1, 3.0, &mut reg);
        for id in 1..=5u64 {
            pop.species.push(Species::new(Genome::new(id, 6, 1, &mut reg)));
        }
        // 6 species > target*1.2 = 1.2 for target=1: arms the latch and nudges up.
        pop.retune_threshold(1);
        let after_first = pop.compat_threshold;

        // Species count drops back within [0.8, 1.2] of target=1 (i.e. to 1), but the latch
        // stays armed, so a later generation under target still nudges the threshold down.
        pop.species.truncate(1);
        pop.retune_threshold(5);
        assert_ne!(pop.compat_threshold, after_first);
    }

    #[test]
    fn retune_threshold_never_drops_below_the_delta_floor() {
        let mut reg = InnovationRegistry::new(0);
        let mut pop = Population::new(6, 1, 1, 3.0, &mut reg);
        pop.compat_threshold = 0.015;
        pop.reached_target_species = true;
        // A single species, far under target*0.8 = 8: threshold would drop to 0.005 without
        // the floor clamp.
        pop.retune_threshold(10);
        assert!(pop.compat_threshold >= 0.01);
    }
}
