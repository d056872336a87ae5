//! A species: a cluster of genomes under one compatibility representative, together with the
//! reproduction and stagnation-tracking logic that operates at that granularity.

use crate::{
    crossover::mate_genomes,
    genome::{Genome, PerturbStdev},
    innovation::InnovationRegistry,
    random::percent,
};
use rand::{Rng, RngCore};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

/// A species' representative genome, frozen at the point the species was last (re)formed, used
/// only to measure compatibility distance against candidate new members — never mutated.
#[derive(Debug, Clone)]
pub struct Representative(Genome);

impl Representative {
    pub fn new(genome: Genome) -> Self {
        Self(genome)
    }

    pub fn genome(&self) -> &Genome {
        &self.0
    }
}

pub struct Species {
    pub representative: Representative,
    pub members: Vec<Genome>,
    pub best_fitness: f64,
    pub generations_since_improvement: u32,
    /// Flipped by a worker claiming this species for fitness evaluation (see the concurrency
    /// design notes); `false` once a worker has finished with it this generation.
    pub processing: AtomicBool,
}

impl Species {
    pub fn new(representative: Genome) -> Self {
        Self {
            representative: Representative::new(representative.clone()),
            members: vec![representative],
            best_fitness: f64::INFINITY,
            generations_since_improvement: 0,
            processing: AtomicBool::new(false),
        }
    }

    /// Attempt to atomically claim this species for processing. Returns `true` exactly once
    /// per generation, to exactly one caller.
    pub fn try_claim(&self) -> bool {
        self.processing
            .compare_exchange(false, true, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .is_ok()
    }

    pub fn reset_claim(&self) {
        self.processing.store(false, AtomicOrdering::Release);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The champion: the member with the lowest (best) fitness.
    pub fn best(&self) -> Option<&Genome> {
        self.members
            .iter()
            .min_by(|a, b| a.fitness().partial_cmp(&b.fitness()).unwrap_or(Ordering::Equal))
    }

    /// Sum of each member's fitness divided by species size — explicit fitness sharing.
    pub fn adjusted_fitness_total(&self) -> f64 {
        let n = self.len() as f64;
        if n == 0.0 {
            0.0
        } else {
            self.members.iter().map(|g| g.fitness() / n).sum()
        }
    }

    /// Update stagnation bookkeeping for this generation; returns whether the species improved
    /// (strict decrease in its best-ever fitness).
    pub fn update_stats(&mut self) -> bool {
        let gen_best = self.best().map(|g| g.fitness()).unwrap_or(f64::INFINITY);
        if gen_best < self.best_fitness {
            self.best_fitness = gen_best;
            self.generations_since_improvement = 0;
            true
        } else {
            self.generations_since_improvement += 1;
            false
        }
    }

    /// Drop the bottom `floor(survival_threshold · size)` genomes (sorted ascending by
    /// fitness, so "bottom" means worst), keeping this species' own member list as the
    /// surviving parent pool for the reproduction step that follows. A species with one or
    /// zero members is left untouched — there is nothing to cull a champion down from.
    pub fn cull(&mut self, survival_threshold: f64) {
        if self.members.len() <= 1 {
            return;
        }
        self.members
            .sort_by(|a, b| a.fitness().partial_cmp(&b.fitness()).unwrap_or(Ordering::Equal));
        let drop_count = (self.members.len() as f64 * survival_threshold).floor() as usize;
        self.members.truncate(self.members.len() - drop_count.min(self.members.len() - 1));
    }

    /// Produce `size` offspring from this species' (already-culled) members, all of which are
    /// eligible parents. The single best member is always preserved unmutated (the species
    /// champion), matching the elitism convention in the design notes.
    #[allow(clippy::too_many_arguments)]
    pub fn reproduce(
        &self,
        size: usize,
        registry: &mut InnovationRegistry,
        rng: &mut impl RngCore,
        next_id: &mut u64,
        p_mutate_only: u64,
        p_mate_only: u64,
        p_inherit_disabled: f64,
        p_mutate_probs: [u64; 3],
        p_perturb: u64,
        perturb_stdev: PerturbStdev,
    ) -> Vec<Genome> {
        if size == 0 || self.members.is_empty() {
            return Vec::new();
        }

        let mut ranked: Vec<&Genome> = self.members.iter().collect();
        ranked.sort_by(|a, b| a.fitness().partial_cmp(&b.fitness()).unwrap_or(Ordering::Equal));
        let survivors = &ranked[..];

        let mut offspring = Vec::with_capacity(size);

        // The champion is always carried forward verbatim (elitism), regardless of species
        // size, so a species can never lose its best genome to an unlucky reproduction draw.
        offspring.push(ranked[0].clone());

        while offspring.len() < size {
            let id = {
                let id = *next_id;
                *next_id += 1;
                id
            };

            // Mirrors the original's two-stage roll: first decide mutate-only (asexual) vs.
            // mate, then — only on the mate branch — decide whether the mated child also gets
            // mutated, or is left as a pure crossover product.
            if survivors.len() < 2 || rng.next_u64() < p_mutate_only {
                let parent = survivors[rng.random_range(0..survivors.len())];
                let mut child = parent.clone();
                child.set_id(id);
                child.mutate(rng, registry, p_mutate_probs, p_perturb, perturb_stdev);
                offspring.push(child);
            } else {
                let a = survivors[rng.random_range(0..survivors.len())];
                let b = survivors[rng.random_range(0..survivors.len())];
                let (fitter, other) = if a.fitness() <= b.fitness() { (a, b) } else { (b, a) };
                let mut child = mate_genomes(fitter, other, id, rng, p_inherit_disabled);
                if rng.next_u64() >= p_mate_only {
                    child.mutate(rng, registry, p_mutate_probs, p_perturb, perturb_stdev);
                }
                offspring.push(child);
            }
        }

        offspring.truncate(size);
        offspring
    }
}
