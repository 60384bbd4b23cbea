//! Shared fixtures for benches and integration tests: a small, named transit
//! network shaped like the scenario table (a metro line plus a couple of
//! connecting routes and one explicit transfer), and a larger synthetic
//! network generator for latency benchmarking. No real timetable data ships
//! with this crate, so both are built in code rather than loaded from disk.

use raptor_core::network::{Network, RawRoute, RawStop};

pub const GARE_ST_CHARLES: u32 = 1;
pub const VIEUX_PORT: u32 = 2;
pub const CASTELLANE: u32 = 3;
pub const ROND_POINT_DU_PRADO: u32 = 4;
pub const CASTELLANE_ANNEX: u32 = 5;
pub const LA_ROSE: u32 = 6;
pub const BOUGAINVILLE: u32 = 7;
pub const NOAILLES: u32 = 8;

fn stop(id: u32, name: &str) -> RawStop {
    RawStop { id, name: name.to_string(), lat: 0.0, lon: 0.0, route_ids: vec![], transfers: vec![] }
}

/// Stops for the demo network. `CASTELLANE` and `CASTELLANE_ANNEX` share a
/// display name on purpose, so `Network::build` links them with an implicit
/// 120-second transfer. `NOAILLES` and `BOUGAINVILLE` carry an explicit
/// walking transfer instead.
pub fn demo_stops() -> Vec<RawStop> {
    vec![
        stop(GARE_ST_CHARLES, "Gare St Charles"),
        stop(VIEUX_PORT, "Vieux-Port"),
        stop(CASTELLANE, "Castellane"),
        stop(ROND_POINT_DU_PRADO, "Rond-Point du Prado"),
        stop(CASTELLANE_ANNEX, "Castellane"),
        stop(LA_ROSE, "La Rose"),
        RawStop {
            id: BOUGAINVILLE,
            name: "Bougainville".to_string(),
            lat: 0.0,
            lon: 0.0,
            route_ids: vec![],
            transfers: vec![(NOAILLES, 180)],
        },
        RawStop {
            id: NOAILLES,
            name: "Noailles".to_string(),
            lat: 0.0,
            lon: 0.0,
            route_ids: vec![],
            transfers: vec![(BOUGAINVILLE, 180)],
        },
    ]
}

/// Routes for the demo network: a direct metro line (`M1`, satisfying the
/// "one-transit-leg" scenario), a branch reachable only via the implicit
/// Castellane transfer (`M2`), and a branch reached via the explicit
/// Noailles/Bougainville transfer (`M3`).
pub fn demo_routes() -> Vec<RawRoute> {
    const HEADWAY: u32 = 600;
    let trip = |base: u32, hops: &[u32]| -> Vec<u32> {
        let mut row = Vec::with_capacity(hops.len());
        let mut t = base;
        for &hop in hops {
            t += hop;
            row.push(t);
        }
        row
    };

    let m1_hops = [0, 300, 300, 300]; // departs base, then +5 min per hop
    let mut m1_schedule = Vec::new();
    for trip_index in 0..3 {
        m1_schedule.extend(trip(8 * 3600 + trip_index * HEADWAY, &m1_hops));
    }

    let m2_hops = [0, 900]; // Castellane (annex) -> La Rose, 15 min
    let mut m2_schedule = Vec::new();
    for trip_index in 0..3 {
        m2_schedule.extend(trip(8 * 3600 + 300 + trip_index * HEADWAY, &m2_hops));
    }

    let m3_hops = [0, 600]; // Castellane -> Noailles, 10 min
    let mut m3_schedule = Vec::new();
    for trip_index in 0..3 {
        m3_schedule.extend(trip(8 * 3600 + 300 + trip_index * HEADWAY, &m3_hops));
    }

    vec![
        RawRoute {
            id: 1,
            name: "M1".to_string(),
            stop_ids: vec![GARE_ST_CHARLES, VIEUX_PORT, CASTELLANE, ROND_POINT_DU_PRADO],
            schedule: m1_schedule,
            trip_count: 3,
        },
        RawRoute {
            id: 2,
            name: "M2".to_string(),
            stop_ids: vec![CASTELLANE_ANNEX, LA_ROSE],
            schedule: m2_schedule,
            trip_count: 3,
        },
        RawRoute {
            id: 3,
            name: "M3".to_string(),
            stop_ids: vec![CASTELLANE, NOAILLES],
            schedule: m3_schedule,
            trip_count: 3,
        },
    ]
}

pub fn build_demo_network() -> Network {
    Network::build(demo_stops(), demo_routes()).expect("demo fixture respects the monotonicity invariants by construction")
}

/// Builds a larger synthetic network for latency benchmarking: `num_routes`
/// lines, each covering a random contiguous window of `stops_per_route`
/// stops out of `num_stops`, with deterministic fixed-headway schedules.
/// Only the topology is randomized; trip times follow a strict arithmetic
/// progression so the monotonicity invariants always hold regardless of
/// which stops a line happens to cover.
pub fn build_random_network(num_stops: usize, num_routes: usize, stops_per_route: usize, trips_per_route: usize, seed: u64) -> Network {
    let rng = fastrand::Rng::with_seed(seed);
    let stops = (0..num_stops).map(|i| stop(i as u32 + 1, &format!("Stop{i}"))).collect();

    const HEADWAY: u32 = 300;
    const HOP_SECONDS: u32 = 90;
    let window = stops_per_route.min(num_stops).max(1);
    let mut routes = Vec::with_capacity(num_routes);
    for r in 0..num_routes {
        let max_start = num_stops.saturating_sub(window);
        let start = if max_start == 0 { 0 } else { rng.usize(0..=max_start) };
        let stop_ids: Vec<u32> = (0..window).map(|k| (start + k) as u32 + 1).collect();

        let mut schedule = Vec::with_capacity(trips_per_route * window);
        for trip_index in 0..trips_per_route {
            let base = 6 * 3600 + trip_index as u32 * HEADWAY;
            for position in 0..window {
                schedule.push(base + position as u32 * HOP_SECONDS);
            }
        }
        routes.push(RawRoute { id: r as u32 + 1, name: format!("R{r}"), stop_ids, schedule, trip_count: trips_per_route });
    }
    Network::build(stops, routes).expect("random fixture respects the monotonicity invariants by construction")
}
