//! Genetic-distance compatibility measure used to decide whether two genomes belong to the
//! same species.
//!
//! This intentionally does NOT reproduce a known defect in the reference C++ implementation's
//! `Compatibility()`, which reads the same genome's innovation field twice (once meant for
//! each side) instead of advancing an independent cursor into the other genome — collapsing
//! every disjoint/excess count onto one side. The walk below uses two honestly-independent
//! cursors, which is the textbook NEAT definition.

use crate::genome::Genome;

fn disjoint_excess_and_weight_diff(g1: &Genome, g2: &Genome) -> (f64, f64, f64) {
    let mut c1 = g1.connections().to_vec();
    c1.sort_by_key(|c| c.innovation);
    let mut c2 = g2.connections().to_vec();
    c2.sort_by_key(|c| c.innovation);

    let mut i1 = c1.iter().peekable();
    let mut i2 = c2.iter().peekable();

    let mut disjoint = 0.0;
    let mut excess = 0.0;
    let mut weight_diff_sum = 0.0;
    let mut matching = 0.0;

    loop {
        match (i1.peek(), i2.peek()) {
            (Some(a), Some(b)) => {
                if a.innovation == b.innovation {
                    weight_diff_sum += (a.weight - b.weight).abs();
                    matching += 1.0;
                    i1.next();
                    i2.next();
                } else if a.innovation < b.innovation {
                    disjoint += 1.0;
                    i1.next();
                } else {
                    disjoint += 1.0;
                    i2.next();
                }
            }
            (Some(_), None) => {
                excess += i1.clone().count() as f64;
                break;
            }
            (None, Some(_)) => {
                excess += i2.clone().count() as f64;
                break;
            }
            (None, None) => break,
        }
    }

    let avg_weight_diff = if matching > 0.0 {
        weight_diff_sum / matching
    } else {
        0.0
    };

    (disjoint, excess, avg_weight_diff)
}

/// `c1`/`c2`/`c3` are the excess/disjoint/weight-difference coefficients; `n` is
/// `max(|g1.connections|, |g2.connections|)`, floored at 1 only to avoid division by zero for
/// two empty genomes (not a small-genome normalization override — the original has that
/// behavior but leaves it commented out).
pub fn compatibility(g1: &Genome, g2: &Genome, c1: f64, c2: f64, c3: f64) -> f64 {
    let (disjoint, excess, avg_weight_diff) = disjoint_excess_and_weight_diff(g1, g2);
    let n = usize::max(g1.connections().len(), g2.connections().len()).max(1) as f64;

    (c1 * excess + c2 * disjoint) / n + c3 * avg_weight_diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{innovation::InnovationRegistry, random::seeded_rng};

    #[test]
    fn identical_genomes_have_zero_distance() {
        let mut reg = InnovationRegistry::new(0);
        let g = Genome::new(1, 2, 1, &mut reg);
        assert_eq!(compatibility(&g, &g, 1.0, 1.0, 0.4), 0.0);
    }

    #[test]
    fn disjoint_genes_increase_distance() {
        let mut rng = seeded_rng(4);
        let mut reg = InnovationRegistry::new(0);
        let mut a = Genome::new(1, 2, 1, &mut reg);
        a.mutate_add_connection(&mut rng, &mut reg);
        let b = Genome::new(2, 2, 1, &mut reg);

        assert!(compatibility(&a, &b, 1.0, 1.0, 0.4) > 0.0);
    }

    #[test]
    fn symmetry_holds() {
        let mut rng = seeded_rng(5);
        let mut reg = InnovationRegistry::new(0);
        let mut a = Genome::new(1, 2, 1, &mut reg);
        a.mutate_add_connection(&mut rng, &mut reg);
        a.mutate_add_connection(&mut rng, &mut reg);
        let mut b = Genome::new(2, 2, 1, &mut reg);
        b.mutate_add_connection(&mut rng, &mut reg);

        let ab = compatibility(&a, &b, 1.0, 1.0, 0.4);
        let ba = compatibility(&b, &a, 1.0, 1.0, 0.4);
        assert!((ab - ba).abs() < 1e-12);
    }
}
