//! Benchmarks for the downstream routing pass.
//!
//! Run with: `cargo bench --bench router_bench`
//!
//! Compares response-function families on binary drainage trees of
//! increasing size.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sedflux_rs::{
    NodeStatus, ResponseFunction, ResponseShape, RouterInputs, RouterScratch,
    route_sediment_downstream,
};

struct Tree {
    order: Vec<usize>,
    receiver: Vec<usize>,
    status: Vec<NodeStatus>,
    cell_area: Vec<f64>,
    supply: Vec<f64>,
    capacity: Vec<f64>,
    erosion: Vec<f64>,
    flooded: Vec<bool>,
}

/// Binary tree numbered outlet-first: node i drains to (i - 1) / 2.
fn binary_tree(n: usize) -> Tree {
    let receiver: Vec<usize> = (0..n).map(|i| if i == 0 { 0 } else { (i - 1) / 2 }).collect();
    let mut area: Vec<f64> = vec![1.0e4; n];
    for i in (1..n).rev() {
        let a = area[i];
        area[receiver[i]] += a;
    }
    let mut status = vec![NodeStatus::Core; n];
    status[0] = NodeStatus::FixedValue;

    Tree {
        order: (0..n).collect(),
        receiver,
        status,
        cell_area: vec![1.0e4; n],
        supply: (0..n).map(|i| 1e-6 * (1.0 + (i as f64 * 0.37).sin())).collect(),
        capacity: area.iter().map(|a| 1e-12 * a.powf(1.5)).collect(),
        erosion: area.iter().map(|a| 1e-12 * a.sqrt()).collect(),
        flooded: vec![false; n],
    }
}

fn bench_router(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_sediment_downstream");

    let shapes = [
        ("constant", ResponseShape::Constant),
        ("linear_decline", ResponseShape::LinearDecline),
        ("generalized_humped", ResponseShape::leh_valley()),
    ];

    for n in [1_000usize, 10_000, 100_000] {
        let tree = binary_tree(n);
        let mut scratch = RouterScratch::new(n);

        for (name, shape) in shapes {
            let response = ResponseFunction::new(shape).unwrap();
            group.bench_with_input(BenchmarkId::new(name, n), &n, |b, _| {
                b.iter(|| {
                    let inputs = RouterInputs {
                        upstream_order: &tree.order,
                        receiver: &tree.receiver,
                        status: &tree.status,
                        cell_area: &tree.cell_area,
                        hillslope_supply: &tree.supply,
                        capacity: &tree.capacity,
                        erosion_rate: &tree.erosion,
                        flooded: &tree.flooded,
                        porosity: 1.0,
                        response: &response,
                        max_repeats: 50,
                        tolerance: 0.01,
                    };
                    black_box(route_sediment_downstream(black_box(&inputs), &mut scratch))
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_router);
criterion_main!(benches);
