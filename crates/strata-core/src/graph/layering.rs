// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Breadth-first, back-to-front dependency layering.
//!
//! Turns a set of requested nodes into an ordered list of layers such that
//! every node of a layer can be processed in parallel, and every dependency of
//! a node lives in a layer consumed before it.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// An error indicating that the dependency graph reachable from the request
/// contains a cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dependency cycle detected among {} node(s)", unresolved.len())]
pub struct CycleError<T> {
    /// The frontier that was still being expanded when the cycle was detected.
    pub unresolved: Vec<T>,
}

/// The output of [`resolve_layers`].
///
/// Layers are stored in production order: the first layer holds the requested
/// nodes and each following layer goes one dependency level deeper. Consumers
/// must walk them in reverse, see [`DependencyLayers::consumption_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyLayers<T> {
    layers: Vec<Vec<T>>,
}

impl<T> DependencyLayers<T> {
    /// The layers in the order they were produced (requested nodes first).
    pub fn production_order(&self) -> &[Vec<T>] {
        &self.layers
    }

    /// The layers in the order they must be processed (deepest dependencies first).
    pub fn consumption_order(&self) -> impl Iterator<Item = &[T]> {
        self.layers.iter().rev().map(Vec::as_slice)
    }

    /// The layer processed at `step` (0-based) in consumption order.
    pub fn layer_for_consumption(&self, step: usize) -> Option<&[T]> {
        let index = self.layers.len().checked_sub(step + 1)?;
        self.layers.get(index).map(Vec::as_slice)
    }

    /// Consumes the layers, returning them in consumption order.
    pub fn into_consumption_order(mut self) -> Vec<Vec<T>> {
        self.layers.reverse();
        self.layers
    }

    /// The number of non-empty layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if there is nothing left to process.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The total number of nodes across all layers.
    pub fn node_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }
}

/// Resolves `requested` and its transitive dependencies into layers.
///
/// The algorithm walks the graph breadth-first, producing one layer per
/// frontier. A node always ends up in the latest (deepest) layer that needs it:
/// when it shows up again in a later frontier it is removed from every earlier
/// layer. Nodes for which `is_satisfied` returns `true` are never placed in a
/// layer, and empty layers are dropped.
///
/// # Arguments
///
/// * `requested`: The nodes the caller wants.
/// * `deps_of`: Returns the declared dependencies of a node.
/// * `is_satisfied`: Returns `true` for nodes that need no processing (already loaded).
///
/// # Errors
///
/// Returns a [`CycleError`] if the graph reachable from `requested` contains a
/// cycle. In an acyclic graph the number of expanded frontiers can never
/// exceed the number of distinct nodes, so exceeding it proves a cycle.
pub fn resolve_layers<T, I>(
    requested: impl IntoIterator<Item = T>,
    mut deps_of: impl FnMut(&T) -> I,
    mut is_satisfied: impl FnMut(&T) -> bool,
) -> Result<DependencyLayers<T>, CycleError<T>>
where
    T: Copy + Eq + Hash,
    I: IntoIterator<Item = T>,
{
    let mut frontier: Vec<T> = Vec::new();
    let mut in_frontier: HashSet<T> = HashSet::new();
    for node in requested {
        if !is_satisfied(&node) && in_frontier.insert(node) {
            frontier.push(node);
        }
    }

    // Production-order layers, possibly containing holes left by removals.
    let mut layers: Vec<Vec<T>> = Vec::new();
    let mut placement: HashMap<T, usize> = HashMap::new();
    let mut seen: HashSet<T> = HashSet::new();
    let mut expansions = 0usize;

    while !frontier.is_empty() {
        expansions += 1;
        seen.extend(frontier.iter().copied());
        if expansions > seen.len() {
            return Err(CycleError {
                unresolved: frontier,
            });
        }

        let depth = layers.len();
        let mut layer = Vec::new();
        let mut next: Vec<T> = Vec::new();
        let mut in_next: HashSet<T> = HashSet::new();

        for node in frontier {
            // Move the node out of any shallower layer.
            if let Some(previous) = placement.remove(&node) {
                layers[previous].retain(|placed| *placed != node);
            }

            if !is_satisfied(&node) {
                layer.push(node);
                placement.insert(node, depth);
            }

            for dep in deps_of(&node) {
                if in_next.insert(dep) {
                    next.push(dep);
                }
            }
        }

        layers.push(layer);
        frontier = next;
    }

    layers.retain(|layer| !layer.is_empty());
    Ok(DependencyLayers { layers })
}
