//! The knobs an evolutionary run is parameterized by, and the one place they're validated.

use crate::{constants::*, error::NeatError, genome::PerturbStdev};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub seed: u64,
    pub generations: usize,
    pub population_size: usize,

    pub c1_excess: f64,
    pub c2_disjoint: f64,
    pub c3_weight: f64,
    pub compat_threshold: f64,
    pub survival_threshold: f64,

    pub p_perturb_or_new: u64,
    pub p_inherit_disabled: f64,
    pub p_mutate_weights: u64,
    pub p_mutate_addnode: u64,
    pub p_mutate_addconn: u64,
    pub p_mutate_only: u64,
    pub p_mate_only: u64,
    pub perturb_stdev: PerturbStdev,

    pub kill_stagnated: Option<u32>,
    pub refocus_stagnated: Option<u32>,
    pub target_species: Option<u16>,
    pub best_compat: bool,
    pub threads: u8,

    pub seed_genome: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 0,
            generations: 100,
            population_size: 150,

            c1_excess: DEFAULT_C1_EXCESS,
            c2_disjoint: DEFAULT_C2_DISJOINT,
            c3_weight: DEFAULT_C3_WEIGHT,
            compat_threshold: DEFAULT_COMPAT_THRESHOLD,
            survival_threshold: DEFAULT_SURVIVAL_THRESHOLD,

            p_perturb_or_new: DEFAULT_P_PERTURB_OR_NEW,
            p_inherit_disabled: DEFAULT_P_INHERIT_DISABLED as f64 / u64::MAX as f64,
            p_mutate_weights: DEFAULT_P_MUTATE_WEIGHTS,
            p_mutate_addnode: DEFAULT_P_MUTATE_ADDNODE,
            p_mutate_addconn: DEFAULT_P_MUTATE_ADDCONN,
            p_mutate_only: DEFAULT_P_MUTATE_ONLY,
            p_mate_only: DEFAULT_P_MATE_ONLY,
            perturb_stdev: PerturbStdev::Fixed(DEFAULT_PARAM_PERTURB_STDEV),

            kill_stagnated: None,
            refocus_stagnated: None,
            target_species: None,
            best_compat: false,
            threads: DEFAULT_THREADS,

            seed_genome: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), NeatError> {
        if self.threads < MIN_THREADS || self.threads > MAX_THREADS {
            return Err(NeatError::InvalidConfig(format!(
                "threads must be between {MIN_THREADS} and {MAX_THREADS}, got {}",
                self.threads
            )));
        }

        if let (Some(refocus), Some(kill)) = (self.refocus_stagnated, self.kill_stagnated) {
            if refocus >= kill {
                return Err(NeatError::InvalidConfig(format!(
                    "refocus-stagnated ({refocus}) must be inferior to kill-stagnated ({kill})"
                )));
            }
        }

        if self.population_size == 0 {
            return Err(NeatError::InvalidConfig(
                "population_size must be nonzero".into(),
            ));
        }

        if let Some(path) = &self.seed_genome {
            if !path.exists() {
                return Err(NeatError::InvalidConfig(format!(
                    "seed genome path does not exist: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn threads_out_of_range_is_invalid() {
        let mut c = Config::default();
        c.threads = 0;
        assert!(c.validate().is_err());
        c.threads = 33;
        assert!(c.validate().is_err());
    }

    #[test]
    fn refocus_must_be_below_kill() {
        let mut c = Config::default();
        c.kill_stagnated = Some(5);
        c.refocus_stagnated = Some(5);
        assert!(c.validate().is_err());
        c.refocus_stagnated = Some(4);
        assert!(c.validate().is_ok());
    }
}
