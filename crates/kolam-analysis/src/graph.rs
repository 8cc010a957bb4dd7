//! Topology of a stroke skeleton.
//!
//! Nodes are skeleton pixel coordinates, edges connect 8-neighboring
//! skeleton pixels, and isolated pixels are pruned. Many traditional
//! kolam designs are drawn in a single unbroken pass, which corresponds
//! to the graph admitting an Eulerian path.

use kolam_core::GrayImageView;
use serde::Serialize;
use std::collections::HashMap;

/// Undirected pixel-adjacency graph of a 1-pixel-wide skeleton.
#[derive(Clone, Debug)]
pub struct SkeletonGraph {
    nodes: Vec<(u32, u32)>,
    adjacency: Vec<Vec<usize>>,
    edge_count: usize,
}

/// Summary of the skeleton topology, embedded in the stroke report.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct SkeletonGraphMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub component_count: usize,
    /// Independent cycles: E - V + C.
    pub cycle_count: usize,
    /// True when the pattern can be traced without lifting the hand.
    pub single_stroke_traceable: bool,
}

impl SkeletonGraph {
    /// Build from a 0/255 skeleton mask. Isolated skeleton pixels (no
    /// 8-neighbor on the skeleton) are pruned, so every node has degree
    /// at least 1.
    pub fn from_mask(mask: &GrayImageView<'_>) -> Self {
        let w = mask.width as i32;
        let h = mask.height as i32;

        let has_neighbor = |x: i32, y: i32| -> bool {
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    if mask.get(x + dx, y + dy) != 0 {
                        return true;
                    }
                }
            }
            false
        };

        let mut nodes = Vec::new();
        let mut index: HashMap<(u32, u32), usize> = HashMap::new();
        for y in 0..h {
            for x in 0..w {
                if mask.get(x, y) != 0 && has_neighbor(x, y) {
                    index.insert((x as u32, y as u32), nodes.len());
                    nodes.push((x as u32, y as u32));
                }
            }
        }

        let mut adjacency = vec![Vec::new(); nodes.len()];
        let mut edge_count = 0usize;
        for (i, &(x, y)) in nodes.iter().enumerate() {
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx < 0 || ny < 0 {
                        continue;
                    }
                    if let Some(&j) = index.get(&(nx as u32, ny as u32)) {
                        adjacency[i].push(j);
                        if i < j {
                            edge_count += 1;
                        }
                    }
                }
            }
        }

        Self {
            nodes,
            adjacency,
            edge_count,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn component_count(&self) -> usize {
        let mut visited = vec![false; self.nodes.len()];
        let mut components = 0usize;

        for start in 0..self.nodes.len() {
            if visited[start] {
                continue;
            }
            components += 1;
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                if visited[node] {
                    continue;
                }
                visited[node] = true;
                for &next in &self.adjacency[node] {
                    if !visited[next] {
                        stack.push(next);
                    }
                }
            }
        }

        components
    }

    /// Independent cycle count of the graph: `E - V + C`.
    pub fn cycle_count(&self) -> usize {
        let components = self.component_count();
        (self.edge_count + components).saturating_sub(self.nodes.len())
    }

    /// An Eulerian path exists iff the graph is connected and has zero or
    /// two odd-degree nodes. The empty graph is not traceable.
    pub fn has_eulerian_path(&self) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        if self.component_count() != 1 {
            return false;
        }
        let odd = self
            .adjacency
            .iter()
            .filter(|nbrs| nbrs.len() % 2 == 1)
            .count();
        odd == 0 || odd == 2
    }

    pub fn metrics(&self) -> SkeletonGraphMetrics {
        let component_count = if self.nodes.is_empty() {
            0
        } else {
            self.component_count()
        };
        SkeletonGraphMetrics {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            component_count,
            cycle_count: self.cycle_count(),
            single_stroke_traceable: self.has_eulerian_path(),
        }
    }
}
