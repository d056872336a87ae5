//! The atomic units a [crate::genome::Genome] is built from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node's role. Sensory and bias nodes never receive connections; output nodes may
/// additionally feed hidden/other-output nodes on recurrent edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Sensor,
    Hidden,
    Output,
    Bias,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Sensor => "Sen",
            NodeKind::Hidden => "Hid",
            NodeKind::Output => "Out",
            NodeKind::Bias => "Bia",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sen" => Ok(NodeKind::Sensor),
            "Hid" => Ok(NodeKind::Hidden),
            "Out" => Ok(NodeKind::Output),
            "Bia" => Ok(NodeKind::Bias),
            other => Err(format!("unknown node kind {other}")),
        }
    }
}

/// A node's identity is immutable once created; `value_last`/`value_now` are the discrete
/// recurrent activation's double buffer, mutated every tick by [crate::genome::Genome::activate].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub id: u16,
    pub kind: NodeKind,
    pub value_last: f64,
    pub value_now: f64,
}

impl NodeGene {
    /// Bias nodes start (and stay) pinned at 1.0 in both slots; everything else starts at 0.
    pub fn new(id: u16, kind: NodeKind) -> Self {
        let v = if kind == NodeKind::Bias { 1.0 } else { 0.0 };
        Self {
            id,
            kind,
            value_last: v,
            value_now: v,
        }
    }
}

/// A single weighted, possibly-disabled edge between two node ids, tagged with the
/// historical marking that lets genomes from different lineages align it during crossover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    pub innovation: usize,
    pub from: u16,
    pub to: u16,
    pub weight: f64,
    pub enabled: bool,
}

impl ConnectionGene {
    pub fn new(innovation: usize, from: u16, to: u16, weight: f64) -> Self {
        Self {
            innovation,
            from,
            to,
            weight,
            enabled: true,
        }
    }

    pub fn path(&self) -> (u16, u16) {
        (self.from, self.to)
    }
}
