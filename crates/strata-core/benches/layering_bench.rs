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

use criterion::{criterion_group, criterion_main, Criterion};
use std::collections::HashMap;
use std::hint::black_box;
use strata_core::resolve_layers;

/// A layered asset graph: every node of a level depends on a handful of
/// nodes of the level below, the way materials reference textures and
/// meshes reference materials.
fn build_graph(levels: usize, width: usize) -> HashMap<usize, Vec<usize>> {
    let mut graph = HashMap::new();
    for level in 0..levels {
        for slot in 0..width {
            let id = level * width + slot;
            let deps = if level + 1 < levels {
                (0..4)
                    .map(|k| (level + 1) * width + (slot * 7 + k * 13) % width)
                    .collect()
            } else {
                Vec::new()
            };
            graph.insert(id, deps);
        }
    }
    graph
}

fn bench_layering(c: &mut Criterion) {
    let graph = build_graph(6, 500);
    let roots: Vec<usize> = (0..500).collect();

    let mut group = c.benchmark_group("Dependency Layering");

    group.bench_function("Cold (nothing loaded)", |b| {
        b.iter(|| {
            let layers = resolve_layers(roots.iter().copied(), |id| graph[id].clone(), |_| false);
            black_box(layers.map(|l| l.len()).unwrap_or(0));
        });
    });

    group.bench_function("Warm (deepest level loaded)", |b| {
        b.iter(|| {
            let layers = resolve_layers(
                roots.iter().copied(),
                |id| graph[id].clone(),
                |id| *id >= 5 * 500,
            );
            black_box(layers.map(|l| l.len()).unwrap_or(0));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_layering);
criterion_main!(benches);
