//! Graphviz (`dot`) export of a genome's topology, styled to match the original tool's
//! `PrintToGV` output: sensors clustered and shaded, a distinctly-styled bias node, the single
//! output node in its own cluster, and only enabled edges drawn.

use crate::{
    gene::NodeKind,
    genome::Genome,
};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Render `genome` as a `dot` digraph. `labels` optionally renames node ids (e.g. `id`, `lat`,
/// `lon`, `speed`, `bearing`) — any id absent from the map falls back to its raw number.
pub fn to_dot(genome: &Genome, labels: &HashMap<u16, &str>) -> String {
    let name_of = |id: u16| -> String {
        labels
            .get(&id)
            .map(|s| s.to_string())
            .unwrap_or_else(|| id.to_string())
    };

    let mut out = String::new();
    let _ = writeln!(out, "digraph genome {{");
    let _ = writeln!(out, "  rankdir=LR;");

    let _ = writeln!(out, "  subgraph cluster_0 {{");
    let _ = writeln!(out, "    label=\"sensors\";");
    let _ = writeln!(out, "    style=filled; color=lightgrey;");
    for node in genome.nodes().iter().filter(|n| n.kind == NodeKind::Sensor) {
        let _ = writeln!(out, "    \"{}\";", name_of(node.id));
    }
    let _ = writeln!(out, "  }}");

    let _ = writeln!(out, "  subgraph cluster_1 {{");
    let _ = writeln!(out, "    label=\"output\";");
    for node in genome.nodes().iter().filter(|n| n.kind == NodeKind::Output) {
        let _ = writeln!(out, "    \"{}\";", name_of(node.id));
    }
    let _ = writeln!(out, "  }}");

    for node in genome.nodes().iter().filter(|n| n.kind == NodeKind::Bias) {
        let _ = writeln!(
            out,
            "  \"{}\" [style=filled, color=dimgrey, fontcolor=white];",
            name_of(node.id)
        );
    }

    for c in genome.connections().iter().filter(|c| c.enabled) {
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [label=\"{:.1}\"];",
            name_of(c.from),
            name_of(c.to),
            c.weight
        );
    }

    let _ = writeln!(out, "}}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_connections_are_not_drawn() {
        let mut reg = crate::innovation::InnovationRegistry::new(0);
        let mut g = Genome::new(0, 1, 1, &mut reg);
        g.replace_connections(vec![{
            let mut c = crate::gene::ConnectionGene::new(0, 0, 1, 1.0);
            c.enabled = false;
            c
        }]);
        let dot = to_dot(&g, &HashMap::new());
        assert!(!dot.contains("->"));
    }

    #[test]
    fn enabled_connection_is_drawn_with_weight_label() {
        let mut reg = crate::innovation::InnovationRegistry::new(0);
        let mut g = Genome::new(0, 1, 1, &mut reg);
        g.replace_connections(vec![crate::gene::ConnectionGene::new(0, 0, 1, 2.5)]);
        let dot = to_dot(&g, &HashMap::new());
        assert!(dot.contains("label=\"2.5\""));
    }
}
