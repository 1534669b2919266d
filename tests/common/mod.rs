//! Shared fixtures for integration tests.
//!
//! A 10-row by 3-column raster with 200 m spacing. The left, right and top
//! edges are closed and the bottom row is closed except for node 1, the only
//! outlet. The middle column (nodes 4, 7, ..., 25) is a straight channel of
//! core nodes draining south to node 1.

#![allow(dead_code)]

use sedflux_rs::{FlowNetwork, NodeStatus};

pub const N_ROWS: usize = 10;
pub const N_COLS: usize = 3;
pub const N_NODES: usize = N_ROWS * N_COLS;
pub const SPACING: f64 = 200.0;
pub const CELL_AREA: f64 = SPACING * SPACING;
pub const OUTLET: usize = 1;

/// Node id at (row, col).
pub fn node(row: usize, col: usize) -> usize {
    row * N_COLS + col
}

/// y coordinate of a node (m).
pub fn y_of(node: usize) -> f64 {
    (node / N_COLS) as f64 * SPACING
}

/// Core channel nodes, outlet-most first.
pub fn channel_nodes() -> Vec<usize> {
    (1..N_ROWS - 1).map(|row| node(row, 1)).collect()
}

pub fn is_channel(n: usize) -> bool {
    n % N_COLS == 1 && (1..N_ROWS - 1).contains(&(n / N_COLS))
}

/// Initial surface: z = y / 10000.
pub fn initial_elevation() -> Vec<f64> {
    (0..N_NODES).map(|n| y_of(n) / 10_000.0).collect()
}

/// Uniform sediment thickness on core nodes.
pub fn uniform_sediment(h0: f64) -> Vec<f64> {
    (0..N_NODES)
        .map(|n| if is_channel(n) { h0 } else { 0.0 })
        .collect()
}

/// Flow routing over the fixed channel topology.
///
/// Drainage area and receivers never change; slopes follow the elevation.
pub fn route_flow(elevation: &[f64]) -> FlowNetwork {
    let mut status = vec![NodeStatus::Closed; N_NODES];
    let mut receiver: Vec<usize> = (0..N_NODES).collect();
    let mut drainage_area = vec![0.0; N_NODES];
    let mut link_length = vec![None; N_NODES];
    let mut cell_area = vec![0.0; N_NODES];
    let mut slope = vec![0.0; N_NODES];

    status[OUTLET] = NodeStatus::FixedValue;
    drainage_area[OUTLET] = (N_ROWS - 2) as f64 * CELL_AREA;

    for n in channel_nodes() {
        let row = n / N_COLS;
        let r = node(row - 1, 1);
        status[n] = NodeStatus::Core;
        receiver[n] = r;
        drainage_area[n] = (N_ROWS - 1 - row) as f64 * CELL_AREA;
        link_length[n] = Some(SPACING);
        cell_area[n] = CELL_AREA;
        slope[n] = ((elevation[n] - elevation[r]) / SPACING).max(0.0);
    }

    let mut upstream_order: Vec<usize> = (0..N_NODES)
        .filter(|&n| !is_channel(n) && n != OUTLET)
        .collect();
    upstream_order.push(OUTLET);
    upstream_order.extend(channel_nodes());

    FlowNetwork::new(
        drainage_area,
        receiver,
        upstream_order,
        slope,
        link_length,
        status,
        cell_area,
    )
    .expect("fixture network is valid")
}

/// One implicit stream-power step with n = 1 (Braun and Willett, 2013).
///
/// z_i <- (z_i + a z_r) / (1 + a), a = K A^m dt / L, solved outlet-first.
pub fn stream_power_implicit_step(
    network: &FlowNetwork,
    elevation: &mut [f64],
    k_per_year: f64,
    m: f64,
    dt_years: f64,
) {
    for &n in &network.upstream_order {
        if !network.is_core_draining(n) {
            continue;
        }
        let Some(length) = network.link_length[n] else {
            continue;
        };
        let r = network.receiver[n];
        let a = k_per_year * network.drainage_area[n].powf(m) * dt_years / length;
        elevation[n] = (elevation[n] + a * elevation[r]) / (1.0 + a);
    }
}

/// Raise every channel node by `amount`.
pub fn uplift(elevation: &mut [f64], amount: f64) {
    for n in channel_nodes() {
        elevation[n] += amount;
    }
}
