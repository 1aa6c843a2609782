use crate::types::Node;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

/// Parent -> child view over a flat node list, for callers that lay nodes out
///
/// Nodes whose parent pointer is null or names a node outside the list are
/// treated as roots.
pub struct ChartGraph<'a> {
    graph: DiGraph<&'a Node, ()>,
    index: HashMap<&'a str, NodeIndex>,
}

impl<'a> ChartGraph<'a> {
    pub fn new(nodes: &'a [Node]) -> Self {
        let mut graph = DiGraph::with_capacity(nodes.len(), nodes.len());
        let mut index = HashMap::with_capacity(nodes.len());

        for node in nodes {
            let idx = graph.add_node(node);
            index.insert(node.id(), idx);
        }

        for node in nodes {
            let Some(parent) = node.parent_id() else {
                continue;
            };
            if let (Some(&from), Some(&to)) = (index.get(parent), index.get(node.id())) {
                if from != to {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self { graph, index }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes without a parent inside the chart, in input order
    pub fn roots(&self) -> Vec<&'a Node> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx])
            .collect()
    }

    /// Direct children of `id`, sorted by display name
    pub fn children(&self, id: &str) -> Vec<&'a Node> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut children: Vec<&'a Node> = self
            .graph
            .edges(idx)
            .map(|edge| self.graph[edge.target()])
            .collect();
        children.sort_by(|a, b| a.base.display_name.cmp(&b.base.display_name));
        children
    }

    /// Depth-first walk from every root, yielding `(depth, node)`
    ///
    /// Each node is visited once, so stray cycles in parent pointers cannot
    /// loop.
    pub fn walk(&self) -> Vec<(usize, &'a Node)> {
        let mut visited = vec![false; self.graph.node_count()];
        let mut out = Vec::with_capacity(self.graph.node_count());
        let mut stack: Vec<(usize, &'a Node)> =
            self.roots().into_iter().rev().map(|node| (0, node)).collect();

        while let Some((depth, node)) = stack.pop() {
            let idx = self.index[node.id()];
            if visited[idx.index()] {
                continue;
            }
            visited[idx.index()] = true;
            out.push((depth, node));

            for child in self.children(node.id()).into_iter().rev() {
                stack.push((depth + 1, child));
            }
        }

        out
    }

    /// Indented text rendering of the chart
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (depth, node) in self.walk() {
            out.push_str(&"  ".repeat(depth));
            out.push_str(&node.base.display_name);
            out.push_str(&format!(" [{}]", node.base.node_type));
            out.push('\n');
        }
        out
    }
}
