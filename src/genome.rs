//! A single evolvable network: a bag of [NodeGene]s and [ConnectionGene]s, the mutations that
//! grow and perturb it, and the discrete recurrent activation that gives it behavior.

use crate::{
    error::{NeatError, Result},
    gene::{ConnectionGene, NodeGene, NodeKind},
    innovation::InnovationRegistry,
    random::GenomeMutation,
};
use rand::{Rng, RngCore};
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Write as _,
    fs,
    path::Path,
};

/// How a weight-mutation's jitter magnitude is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerturbStdev {
    Fixed(f64),
    /// Scale jitter by the connection's own current magnitude rather than a fixed spread, so
    /// small weights move in small steps and large ones can still swing widely.
    Auto,
}

impl PerturbStdev {
    fn stdev_for(&self, weight: f64) -> f64 {
        match self {
            PerturbStdev::Fixed(s) => *s,
            PerturbStdev::Auto => weight.abs().max(0.1),
        }
    }
}

fn steep_sigmoid(x: f64) -> f64 {
    1. / (1. + (-4.9 * x).exp())
}

/// Output nodes activate with the identity function: this is a regression network, not a
/// classifier, and the target (contact time) is unbounded in sign and magnitude.
fn identity(x: f64) -> f64 {
    x
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genome {
    pub id: u64,
    sensory: usize,
    action: usize,
    nodes: Vec<NodeGene>,
    connections: Vec<ConnectionGene>,
    #[serde(skip, default = "default_fitness")]
    fitness: f64,
}

/// Unevaluated genomes carry `+inf` fitness (lower is better) until [Genome::set_fitness] runs.
fn default_fitness() -> f64 {
    f64::INFINITY
}

impl Genome {
    /// A fresh seed genome: `sensory` sensor nodes, `action` output nodes, one bias node, and
    /// one enabled weight-1.0 connection from every sensor to every output, each registered
    /// through `registry` so repeated seed construction yields stable innovation numbers. Node
    /// ids are laid out `[0..sensory)` sensors, `[sensory..sensory+action)` outputs, then a
    /// single bias node, matching the order the original printer expects.
    pub fn new(id: u64, sensory: usize, action: usize, registry: &mut InnovationRegistry) -> Self {
        let mut nodes = Vec::with_capacity(sensory + action + 1);
        for i in 0..sensory {
            nodes.push(NodeGene::new(i as u16, NodeKind::Sensor));
        }
        for i in sensory..sensory + action {
            nodes.push(NodeGene::new(i as u16, NodeKind::Output));
        }
        nodes.push(NodeGene::new((sensory + action) as u16, NodeKind::Bias));

        let mut connections = Vec::with_capacity(sensory * action);
        for s in 0..sensory as u16 {
            for a in sensory as u16..(sensory + action) as u16 {
                let innovation = registry.lookup_or_assign((s, a));
                connections.push(ConnectionGene::new(innovation, s, a, 1.0));
            }
        }

        Self {
            id,
            sensory,
            action,
            nodes,
            connections,
            fitness: f64::INFINITY,
        }
    }

    pub fn sensory_ids(&self) -> impl Iterator<Item = u16> {
        0..self.sensory as u16
    }

    pub fn action_ids(&self) -> impl Iterator<Item = u16> {
        self.sensory as u16..(self.sensory + self.action) as u16
    }

    pub fn bias_id(&self) -> u16 {
        (self.sensory + self.action) as u16
    }

    pub fn nodes(&self) -> &[NodeGene] {
        &self.nodes
    }

    pub fn connections(&self) -> &[ConnectionGene] {
        &self.connections
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    /// Replace this genome's connections wholesale, e.g. with the product of crossover.
    pub fn replace_connections(&mut self, connections: Vec<ConnectionGene>) {
        self.connections = connections;
    }

    /// Lower is better; a non-finite result (a diverging recurrent network) clamps to the
    /// largest finite real rather than ever storing `NaN`, so downstream sorts stay total.
    pub fn set_fitness(&mut self, raw: f64) -> f64 {
        let clamped = if raw.is_finite() { raw } else { f64::MAX };
        self.fitness = clamped;
        clamped
    }

    fn node_kind(&self, id: u16) -> Option<NodeKind> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.kind)
    }

    fn has_path(&self, from: u16, to: u16) -> bool {
        self.connections.iter().any(|c| c.from == from && c.to == to)
    }

    /// Every destination eligible to receive a fresh edge (sensors and the bias node never
    /// accept incoming connections).
    fn candidate_targets(&self) -> Vec<u16> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Hidden | NodeKind::Output))
            .map(|n| n.id)
            .collect()
    }

    /// Find an unoccupied `(from, to)` path, if any remain. Self-loops and cycles through
    /// hidden/output nodes are permitted (the network is recurrent); sensors/bias are never a
    /// destination.
    pub fn open_path(&self, rng: &mut impl RngCore) -> Option<(u16, u16)> {
        let sources: Vec<u16> = self.nodes.iter().map(|n| n.id).collect();
        let targets = self.candidate_targets();
        if sources.is_empty() || targets.is_empty() {
            return None;
        }

        let total = sources.len() * targets.len();
        if self.connections.len() >= total {
            return None;
        }

        // Small genomes early in a run are rarely anywhere near saturated; retry a bounded
        // number of times before falling back to an exhaustive scan.
        for _ in 0..32 {
            let from = sources[rng.random_range(0..sources.len())];
            let to = targets[rng.random_range(0..targets.len())];
            if !self.has_path(from, to) {
                return Some((from, to));
            }
        }

        sources
            .iter()
            .flat_map(|&from| targets.iter().map(move |&to| (from, to)))
            .find(|&(from, to)| !self.has_path(from, to))
    }

    /// Grow a new connection between two previously-unconnected nodes. Returns `false`
    /// (`Saturated`, per the design notes — never an `Err`) if no open path remains.
    pub fn mutate_add_connection(
        &mut self,
        rng: &mut impl RngCore,
        registry: &mut InnovationRegistry,
    ) -> bool {
        match self.open_path(rng) {
            Some((from, to)) => {
                let innovation = registry.lookup_or_assign((from, to));
                let weight: f64 = rng.random_range(-1.0..=1.0);
                self.connections
                    .push(ConnectionGene::new(innovation, from, to, weight));
                true
            }
            None => false,
        }
    }

    /// Split an existing enabled connection in two around a new hidden node: `from -{1.0}>
    /// hidden` and `hidden -{old weight}> to`, disabling the original. Returns `false`
    /// (`Saturated`) if there are no connections to split.
    pub fn mutate_add_node(
        &mut self,
        rng: &mut impl RngCore,
        registry: &mut InnovationRegistry,
    ) -> bool {
        let enabled_idx: Vec<usize> = self
            .connections
            .iter()
            .enumerate()
            .filter(|(_, c)| c.enabled)
            .map(|(i, _)| i)
            .collect();
        if enabled_idx.is_empty() {
            return false;
        }

        let idx = enabled_idx[rng.random_range(0..enabled_idx.len())];
        let (from, to, old_weight) = {
            let c = &mut self.connections[idx];
            c.enabled = false;
            (c.from, c.to, c.weight)
        };

        let new_id = self.nodes.iter().map(|n| n.id).max().unwrap_or(0) + 1;
        self.nodes.push(NodeGene::new(new_id, NodeKind::Hidden));

        let into_inno = registry.lookup_or_assign((from, new_id));
        let outof_inno = registry.lookup_or_assign((new_id, to));
        self.connections
            .push(ConnectionGene::new(into_inno, from, new_id, 1.0));
        self.connections
            .push(ConnectionGene::new(outof_inno, new_id, to, old_weight));
        true
    }

    /// Perturb or replace every connection's weight. Each connection independently rolls
    /// whether it's perturbed (Gaussian jitter about its current value) or replaced outright
    /// with a fresh draw from `[-1, 1]`.
    pub fn mutate_weights(&mut self, rng: &mut impl RngCore, p_perturb: u64, perturb_stdev: PerturbStdev) {
        for c in self.connections.iter_mut() {
            if rng.next_u64() < p_perturb {
                let jitter: f64 = StandardNormal.sample(rng);
                c.weight += jitter * perturb_stdev.stdev_for(c.weight);
            } else {
                c.weight = rng.random_range(-1.0..=1.0);
            }
        }
    }

    /// Apply at most one mutation this generation, picked from the structural/weight table in
    /// `probs` (`[p_mutate_addnode, p_mutate_addconn, p_mutate_weights]`, each a [percent]
    /// scaled value), in that priority order: add-node first, else add-connection, else
    /// perturb weights. A structural pick that turns out saturated silently falls through to
    /// weight mutation instead of doing nothing; exhausting the whole table is a true no-op.
    pub fn mutate(
        &mut self,
        rng: &mut impl RngCore,
        registry: &mut InnovationRegistry,
        probs: [u64; 3],
        p_perturb: u64,
        perturb_stdev: PerturbStdev,
    ) {
        use crate::random::EventKind;
        match GenomeMutation::pick(rng, probs) {
            Some(GenomeMutation::AddNode) => {
                if !self.mutate_add_node(rng, registry) {
                    self.mutate_weights(rng, p_perturb, perturb_stdev);
                }
            }
            Some(GenomeMutation::AddConnection) => {
                if !self.mutate_add_connection(rng, registry) {
                    self.mutate_weights(rng, p_perturb, perturb_stdev);
                }
            }
            Some(GenomeMutation::MutateWeights) => {
                self.mutate_weights(rng, p_perturb, perturb_stdev);
            }
            None => {}
        }
    }

    /// Zero every node's activation state (bias re-pinned to 1.0). Called once before a fresh
    /// pass over a dataset so a genome's recurrent memory never leaks between evaluations.
    pub fn reset_activation(&mut self) {
        for node in self.nodes.iter_mut() {
            let v = if node.kind == NodeKind::Bias { 1.0 } else { 0.0 };
            node.value_last = v;
            node.value_now = v;
        }
    }

    /// Run one discrete time-step of the (possibly recurrent) network and return the output
    /// layer's values.
    ///
    /// 1. The input vector is written into the sensors' `value_now`.
    /// 2. Every node's `value_now` shifts into `value_last`, then `value_now` is zeroed (bias
    ///    is re-pinned to 1.0 in both slots). A sensor's freshly-written input is therefore
    ///    already visible through `value_last` later this same tick; a hidden/output node's
    ///    own prior output is only visible one tick late, which is what gives recurrent and
    ///    self-looping edges their one-step memory.
    /// 3. Every enabled connection, walked in innovation order, accumulates
    ///    `to.value_now += from.value_last * weight`.
    /// 4. Hidden nodes squash their accumulated input through the steepened sigmoid.
    /// 5. Output nodes use the identity transfer (already the case after step 3).
    pub fn activate(&mut self, input: &[f64]) -> Vec<f64> {
        debug_assert_eq!(input.len(), self.sensory);

        for (i, &v) in input.iter().enumerate() {
            let id = i as u16;
            if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                node.value_now = v;
            }
        }

        for node in self.nodes.iter_mut() {
            node.value_last = node.value_now;
            node.value_now = 0.0;
            if node.kind == NodeKind::Bias {
                node.value_last = 1.0;
                node.value_now = 1.0;
            }
        }

        let mut ordered = self.connections.clone();
        ordered.sort_by_key(|c| c.innovation);
        for c in ordered.iter().filter(|c| c.enabled) {
            let from_last = self
                .nodes
                .iter()
                .find(|n| n.id == c.from)
                .map(|n| n.value_last)
                .unwrap_or(0.0);
            if let Some(to_node) = self.nodes.iter_mut().find(|n| n.id == c.to) {
                to_node.value_now += from_last * c.weight;
            }
        }

        for node in self.nodes.iter_mut() {
            if node.kind == NodeKind::Hidden {
                node.value_now = steep_sigmoid(node.value_now);
            } else if node.kind == NodeKind::Output {
                node.value_now = identity(node.value_now);
            }
        }

        self.action_ids()
            .map(|id| self.nodes.iter().find(|n| n.id == id).unwrap().value_now)
            .collect()
    }

    /// Serialize to the line-oriented genome format: an `id,<hex>` header, one `node,` line per
    /// node, one `link,` line per connection, connections in innovation order.
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "id,{:x}", self.id);
        for node in &self.nodes {
            let _ = writeln!(out, "node,{},{}", node.id, node.kind);
        }
        let mut conns = self.connections.clone();
        conns.sort_by_key(|c| c.innovation);
        for c in &conns {
            let _ = writeln!(
                out,
                "link,{},{},{},{},{}",
                c.from,
                c.to,
                c.weight,
                c.enabled as u8,
                c.innovation
            );
        }
        out
    }

    pub fn from_lines(s: &str) -> Result<Self> {
        let mut id = 0u64;
        let mut nodes = Vec::new();
        let mut connections = Vec::new();

        for (lineno, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            match fields.as_slice() {
                ["id", hex] => {
                    id = u64::from_str_radix(hex, 16).map_err(|e| NeatError::MalformedRecord {
                        line: lineno + 1,
                        reason: e.to_string(),
                    })?;
                }
                ["node", node_id, kind] => {
                    let node_id: u16 =
                        node_id.parse().map_err(|_| NeatError::MalformedRecord {
                            line: lineno + 1,
                            reason: format!("bad node id {node_id}"),
                        })?;
                    let kind: NodeKind = kind.parse().map_err(|reason| NeatError::MalformedRecord {
                        line: lineno + 1,
                        reason,
                    })?;
                    nodes.push(NodeGene::new(node_id, kind));
                }
                ["link", from, to, weight, enabled, innovation] => {
                    let from: u16 = from.parse().map_err(|_| NeatError::MalformedRecord {
                        line: lineno + 1,
                        reason: format!("bad from {from}"),
                    })?;
                    let to: u16 = to.parse().map_err(|_| NeatError::MalformedRecord {
                        line: lineno + 1,
                        reason: format!("bad to {to}"),
                    })?;
                    let weight: f64 = weight.parse().map_err(|_| NeatError::MalformedRecord {
                        line: lineno + 1,
                        reason: format!("bad weight {weight}"),
                    })?;
                    let enabled = *enabled == "1";
                    let innovation: usize =
                        innovation.parse().map_err(|_| NeatError::MalformedRecord {
                            line: lineno + 1,
                            reason: format!("bad innovation {innovation}"),
                        })?;
                    connections.push(ConnectionGene {
                        innovation,
                        from,
                        to,
                        weight,
                        enabled,
                    });
                }
                _ => {
                    return Err(NeatError::MalformedRecord {
                        line: lineno + 1,
                        reason: format!("unrecognized record: {line}"),
                    })
                }
            }
        }

        nodes.sort_by_key(|n| n.id);
        for pair in nodes.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(NeatError::DuplicateNode { id: pair[0].id });
            }
        }

        let sensory = nodes.iter().filter(|n| n.kind == NodeKind::Sensor).count();
        let action = nodes.iter().filter(|n| n.kind == NodeKind::Output).count();
        Ok(Self {
            id,
            sensory,
            action,
            nodes,
            connections,
            fitness: f64::MIN,
        })
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_lines())?;
        Ok(())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_lines(&fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::seeded_rng;

    #[test]
    fn new_genome_seeds_sensor_to_output_connections() {
        let mut reg = InnovationRegistry::new(0);
        let g = Genome::new(0, 6, 1, &mut reg);
        assert_eq!(g.nodes().len(), 8); // 6 sensor + 1 output + 1 bias
        assert_eq!(g.connections().len(), 6);
        assert!(g.connections().iter().all(|c| c.enabled && c.weight == 1.0));
    }

    #[test]
    fn seed_construction_is_innovation_stable() {
        let mut reg = InnovationRegistry::new(0);
        let a = Genome::new(0, 2, 1, &mut reg);
        let b = Genome::new(1, 2, 1, &mut reg);
        let mut a_inno: Vec<usize> = a.connections().iter().map(|c| c.innovation).collect();
        let mut b_inno: Vec<usize> = b.connections().iter().map(|c| c.innovation).collect();
        a_inno.sort();
        b_inno.sort();
        assert_eq!(a_inno, b_inno);
    }

    #[test]
    fn add_connection_then_add_node_bisects() {
        let mut rng = seeded_rng(1);
        let mut reg = InnovationRegistry::new(0);
        let mut g = Genome::new(0, 2, 1, &mut reg);
        let seeded = g.connections().len();

        assert!(g.mutate_add_node(&mut rng, &mut reg));
        assert_eq!(g.connections().len(), seeded + 2);
        assert_eq!(g.connections().iter().filter(|c| !c.enabled).count(), 1);
        assert_eq!(g.nodes().len(), 5);
    }

    #[test]
    fn add_connection_saturates() {
        let mut rng = seeded_rng(2);
        let mut reg = InnovationRegistry::new(0);
        let mut g = Genome::new(0, 1, 1, &mut reg);
        // seed wires sensor->output; the only remaining open paths into the lone output are
        // the self-loop and bias->output, since sensors/bias are never destinations.
        let mut fired = 0;
        for _ in 0..2 {
            if g.mutate_add_connection(&mut rng, &mut reg) {
                fired += 1;
            }
        }
        assert_eq!(fired, 2);
        assert!(!g.mutate_add_connection(&mut rng, &mut reg));
    }

    #[test]
    fn activate_propagates_sensor_to_output() {
        let mut reg = InnovationRegistry::new(0);
        let mut g = Genome::new(0, 1, 1, &mut reg);
        g.replace_connections(vec![ConnectionGene::new(0, 0, 1, 2.0)]);
        g.reset_activation();
        let out = g.activate(&[3.0]);
        assert_eq!(out, vec![6.0]);
    }

    #[test]
    fn activate_recurrent_self_loop_needs_multiple_ticks() {
        let mut reg = InnovationRegistry::new(0);
        let mut g = Genome::new(0, 1, 1, &mut reg);
        g.replace_connections(vec![
            ConnectionGene::new(0, 0, 1, 1.0),
            ConnectionGene::new(1, 1, 1, 1.0),
        ]);
        g.reset_activation();
        let out_1 = g.activate(&[1.0]);
        let out_2 = g.activate(&[1.0]);
        assert!(out_2[0] > out_1[0]);
    }

    #[test]
    fn fitness_clamps_nan_and_infinite() {
        let mut reg = InnovationRegistry::new(0);
        let mut g = Genome::new(0, 1, 1, &mut reg);
        assert_eq!(g.set_fitness(f64::NAN), f64::MAX);
        assert_eq!(g.set_fitness(f64::INFINITY), f64::MAX);
        assert_eq!(g.set_fitness(f64::NEG_INFINITY), f64::MAX);
        assert_eq!(g.set_fitness(1.5), 1.5);
    }

    #[test]
    fn round_trips_through_line_format() {
        let mut rng = seeded_rng(3);
        let mut reg = InnovationRegistry::new(0);
        let mut g = Genome::new(0x2a, 2, 1, &mut reg);
        g.mutate_add_connection(&mut rng, &mut reg);
        g.mutate_add_node(&mut rng, &mut reg);

        let text = g.to_lines();
        let back = Genome::from_lines(&text).unwrap();
        assert_eq!(back.id, g.id);
        assert_eq!(back.nodes().len(), g.nodes().len());
        assert_eq!(back.connections().len(), g.connections().len());
    }

    #[test]
    fn malformed_record_is_reported() {
        let err = Genome::from_lines("node,notanumber,Sen\n").unwrap_err();
        assert!(matches!(err, NeatError::MalformedRecord { .. }));
    }

    #[test]
    fn duplicate_node_id_is_reported() {
        let err = Genome::from_lines("node,0,Sen\nnode,0,Out\n").unwrap_err();
        assert!(matches!(err, NeatError::DuplicateNode { id: 0 }));
    }
}
