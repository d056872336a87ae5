//! Crossover reproduction between two parent genomes.

use crate::{
    gene::ConnectionGene,
    genome::Genome,
    random::{CrossoverOrigin, EventKind},
};
use rand::{Rng, RngCore};

/// Probability a gene disabled in either parent stays disabled in the child.
const INHERIT_DISABLED_PROB: f64 = 0.75;

/// Even odds of inheriting an aligned gene from either parent.
const EVEN_ODDS: [u64; 2] = [crate::random::percent(50), crate::random::percent(50)];

#[inline]
fn pick_either(fitter: &ConnectionGene, other: &ConnectionGene, rng: &mut impl RngCore) -> ConnectionGene {
    match CrossoverOrigin::pick(rng, EVEN_ODDS) {
        Some(CrossoverOrigin::OtherParent) => other.clone(),
        _ => fitter.clone(),
    }
}

/// A matching (aligned) gene pair, present in both parents at the same innovation. Three
/// cases per spec: both enabled picks either parent 50/50; both disabled always copies the
/// fitter parent's gene; exactly one disabled picks either parent 50/50 and then independently
/// rolls the gene's enable-state, `p_inherit_disabled` being the probability it comes back
/// *enabled*.
#[inline]
fn pick_aligned(
    fitter: &ConnectionGene,
    other: &ConnectionGene,
    rng: &mut impl RngCore,
    p_inherit_disabled: f64,
) -> ConnectionGene {
    match (fitter.enabled, other.enabled) {
        (true, true) => pick_either(fitter, other, rng),
        (false, false) => fitter.clone(),
        _ => {
            let mut picked = pick_either(fitter, other, rng);
            picked.enabled = rng.random_bool(p_inherit_disabled);
            picked
        }
    }
}

/// Mate `fitter` with `other`, where `fitter`'s fitness is >= `other`'s (ties broken by the
/// caller before calling in, per the always-asymmetric design note — there is always a
/// definite "fitter" side once a tie-break has been applied). Disjoint and excess genes are
/// inherited only from `fitter`; matching genes are drawn from either parent at random.
pub fn mate_genomes(
    fitter: &Genome,
    other: &Genome,
    child_id: u64,
    rng: &mut impl RngCore,
    p_inherit_disabled: f64,
) -> Genome {
    let mut fitter_conns = fitter.connections().to_vec();
    fitter_conns.sort_by_key(|c| c.innovation);
    let mut other_conns = other.connections().to_vec();
    other_conns.sort_by_key(|c| c.innovation);

    let mut child_conns = Vec::with_capacity(fitter_conns.len());
    let mut other_idx = 0;
    for fc in &fitter_conns {
        while other_conns
            .get(other_idx)
            .is_some_and(|oc| oc.innovation < fc.innovation)
        {
            other_idx += 1;
        }
        let aligned = other_conns
            .get(other_idx)
            .filter(|oc| oc.innovation == fc.innovation);
        child_conns.push(match aligned {
            Some(oc) => pick_aligned(fc, oc, rng, p_inherit_disabled),
            None => fc.clone(),
        });
    }

    let mut child = fitter.clone();
    child.replace_connections(child_conns);
    child.set_id(child_id);
    child
}
