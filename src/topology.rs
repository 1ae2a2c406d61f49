use crate::{error::SimError, types::NodeId};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Row width used by the grid topologies.
pub const DEFAULT_GRID_WIDTH: usize = 3;

/// Neighbor lists indexed by node id.
pub type Adjacency = Vec<Vec<NodeId>>;

/// Static neighbor structure assigned to nodes before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Every node neighbors every other node.
    Full,

    /// Nodes form a chain `0 - 1 - ... - n-1`.
    Line,

    /// Row-major grid without wrap-around (the "3D" topology).
    Grid,

    /// Grid plus an extra `i -> i+1` link per node.
    ImperfectGrid,
}

impl Topology {
    /// All topologies, in reporting order.
    pub const ALL: [Topology; 4] = [
        Topology::Full,
        Topology::Line,
        Topology::Grid,
        Topology::ImperfectGrid,
    ];
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Topology::Full => "full",
            Topology::Line => "line",
            Topology::Grid => "3d",
            Topology::ImperfectGrid => "imperfect3d",
        };
        f.write_str(token)
    }
}

impl FromStr for Topology {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(Topology::Full),
            "line" => Ok(Topology::Line),
            "grid" | "3d" => Ok(Topology::Grid),
            "imperfectgrid" | "imperfect-grid" | "imperfect3d" | "imp3d" => {
                Ok(Topology::ImperfectGrid)
            }
            _ => Err(SimError::UnknownTopology(s.to_string())),
        }
    }
}

/// Builds the adjacency for `n` nodes with the default grid width.
pub fn build(n: usize, kind: Topology) -> Adjacency {
    build_with_width(n, kind, DEFAULT_GRID_WIDTH)
}

/// Builds the adjacency for `n` nodes.
///
/// Pure and deterministic: the same arguments always yield the same lists.
/// `width` only affects the grid topologies.
pub fn build_with_width(n: usize, kind: Topology, width: usize) -> Adjacency {
    (0..n)
        .map(|id| match kind {
            Topology::Full => (0..n).filter(|&other| other != id).collect(),
            Topology::Line => line_neighbors(id, n),
            Topology::Grid => grid_neighbors(id, n, width),
            Topology::ImperfectGrid => {
                let mut neighbors = grid_neighbors(id, n, width);
                // Deterministic stand-in for a random long-range link.
                if id + 1 < n {
                    neighbors.push(id + 1);
                }
                neighbors
            }
        })
        .collect()
}

fn line_neighbors(id: NodeId, n: usize) -> Vec<NodeId> {
    let mut neighbors = Vec::with_capacity(2);
    if id > 0 {
        neighbors.push(id - 1);
    }
    if id + 1 < n {
        neighbors.push(id + 1);
    }
    neighbors
}

fn grid_neighbors(id: NodeId, n: usize, width: usize) -> Vec<NodeId> {
    let candidates = [
        id.checked_sub(width),
        id.checked_add(width),
        id.checked_sub(1),
        id.checked_add(1),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter(|&c| c < n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_symmetric(adj: &Adjacency) -> bool {
        adj.iter()
            .enumerate()
            .all(|(id, neighbors)| neighbors.iter().all(|&nb| adj[nb].contains(&id)))
    }

    #[test]
    fn test_empty() {
        for kind in Topology::ALL {
            assert!(build(0, kind).is_empty());
        }
    }

    #[test]
    fn test_full() {
        for n in 1..=12 {
            let adj = build(n, Topology::Full);
            assert_eq!(adj.len(), n);
            for (id, neighbors) in adj.iter().enumerate() {
                assert_eq!(neighbors.len(), n - 1);
                assert!(!neighbors.contains(&id));
            }
            assert!(is_symmetric(&adj));
        }
    }

    #[test]
    fn test_line() {
        assert_eq!(build(1, Topology::Line), vec![Vec::<NodeId>::new()]);
        for n in 2..=12 {
            let adj = build(n, Topology::Line);
            let ends = adj.iter().filter(|nb| nb.len() == 1).count();
            let interior = adj.iter().filter(|nb| nb.len() == 2).count();
            assert_eq!(ends, 2);
            assert_eq!(interior, n - 2);
            assert!(is_symmetric(&adj));
        }
        let adj = build(4, Topology::Line);
        assert_eq!(adj[0], vec![1]);
        assert_eq!(adj[2], vec![1, 3]);
        assert_eq!(adj[3], vec![2]);
    }

    #[test]
    fn test_grid() {
        let adj = build(9, Topology::Grid);
        assert_eq!(adj[0], vec![3, 1]);
        assert_eq!(adj[4], vec![1, 7, 3, 5]);
        assert_eq!(adj[8], vec![5, 7]);
        assert!(is_symmetric(&adj));
        for (id, neighbors) in adj.iter().enumerate() {
            assert!(!neighbors.contains(&id));
        }
    }

    #[test]
    fn test_imperfect_grid_adds_forward_link() {
        let grid = build(10, Topology::Grid);
        let imperfect = build(10, Topology::ImperfectGrid);
        for id in 0..10 {
            let extra = if id + 1 < 10 { 1 } else { 0 };
            assert_eq!(imperfect[id].len(), grid[id].len() + extra);
            assert_eq!(&imperfect[id][..grid[id].len()], &grid[id][..]);
        }
        assert_eq!(imperfect[9], grid[9]);
    }

    #[test]
    fn test_oversized_width_degenerates_to_line() {
        assert_eq!(
            build_with_width(5, Topology::Grid, usize::MAX),
            build(5, Topology::Line)
        );
    }

    #[test]
    fn test_idempotent() {
        for kind in Topology::ALL {
            assert_eq!(build(17, kind), build(17, kind));
        }
    }

    #[test]
    fn test_parse_tokens() {
        assert_eq!("full".parse::<Topology>().unwrap(), Topology::Full);
        assert_eq!("3D".parse::<Topology>().unwrap(), Topology::Grid);
        assert_eq!("imp3D".parse::<Topology>().unwrap(), Topology::ImperfectGrid);
        assert_eq!(
            "imperfect3d".parse::<Topology>().unwrap(),
            Topology::ImperfectGrid
        );
        assert!("ring".parse::<Topology>().is_err());
        for kind in Topology::ALL {
            assert_eq!(kind.to_string().parse::<Topology>().unwrap(), kind);
        }
    }
}
