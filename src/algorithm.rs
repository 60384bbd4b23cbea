//! The core round-based earliest-arrival loop (component E). Everything here
//! operates on borrowed, pre-built [`Network`] data and a caller-owned
//! [`RoutingState`]; no allocation sized in stop or route count happens once
//! the state's scratch buffers are warm.

use crate::filter::RouteFilter;
use crate::network::{Network, RouteIndex, StopIndex, Timestamp, UNRESOLVED_STOP};
use crate::state::RoutingState;

/// One trip currently boarded while scanning a route's pattern left to
/// right. `None` means we have not boarded anything on this route yet this
/// round.
struct Boarding {
    trip: crate::network::TripIndex,
    stop: StopIndex,
    departure: Timestamp,
    position: usize,
}

/// Runs up to `k_max` rounds of the earliest-arrival search from `origins`
/// (already marked with arrival time `tau0` at round 0) toward `destinations`,
/// writing every improving arrival and its parent pointer into `state`.
///
/// Returns the earliest arrival time across `destinations` at any round, or
/// `Timestamp::MAX` if none of them were ever reached. Callers that need the
/// actual itineraries walk `state`'s parent pointers afterward (see
/// [`crate::journey::reconstruct`]); this function only establishes reachability
/// and the round at which each stop was first or better reached.
///
/// `origins` and `destinations` must already be disjoint and in range;
/// resolving names/ids and handling the "origin is already a destination" edge
/// case is the facade's job, not this loop's.
pub fn run(
    network: &Network,
    state: &mut RoutingState,
    origins: &[StopIndex],
    destinations: &[StopIndex],
    tau0: Timestamp,
    k_max: usize,
    filter: Option<&RouteFilter>,
) -> Timestamp {
    debug_assert!(k_max <= state.max_rounds());

    state.reset(origins, tau0);
    state.set_destinations(destinations);

    let mut best_at_destination = Timestamp::MAX;
    for &origin in origins {
        if state.is_destination(origin) {
            best_at_destination = best_at_destination.min(tau0);
        }
    }

    let route_stops = network.route_stops();
    let schedule = network.schedule();

    for round in 1..=k_max {
        state.shift_marks();
        if state.marked_prev_stops().is_empty() {
            break;
        }
        state.carry_forward_best_arrival(round);
        state.note_round_used(round);

        // Step 2: scan every route touched by a stop marked in the previous
        // round, walking its pattern once left to right.
        let routes_to_scan = state.collect_routes_to_scan(network);
        for &route_idx in &routes_to_scan {
            let route = &network.routes[route_idx as usize];
            if let Some(filter) = filter {
                if !filter.allows(route) {
                    continue;
                }
            }
            scan_route(network, state, route_idx, route_stops, schedule, round, &mut best_at_destination);
        }
        state.return_routes_scratch(routes_to_scan);

        // Step 3: relax transfers out of every stop marked so far this round
        // (by step 2 or earlier in this same step), snapshotting the count so
        // a transfer's own target is not itself re-scanned in this pass.
        scan_transfers(network, state, round, &mut best_at_destination);

        // Step 4: fold the destinations' arrivals at this round into the
        // running bound, catching any reached only via a transfer above.
        for &destination in destinations {
            best_at_destination = best_at_destination.min(state.best_arrival(round, destination));
        }

        // Step 5: stop before K if nothing new was marked this round.
        if !state.any_marked() {
            break;
        }
    }

    best_at_destination
}

#[allow(clippy::too_many_arguments)]
fn scan_route(
    network: &Network,
    state: &mut RoutingState,
    route_idx: RouteIndex,
    route_stops: &[StopIndex],
    schedule: &[Timestamp],
    round: usize,
    best_at_destination: &mut Timestamp,
) {
    let route = &network.routes[route_idx as usize];
    let pattern = route.stops(route_stops);
    let mut boarding: Option<Boarding> = None;

    for (position, &stop_idx) in pattern.iter().enumerate() {
        if stop_idx == UNRESOLVED_STOP {
            continue;
        }

        let time_on_current_trip = boarding.as_ref().map(|b| route.time_at(schedule, b.trip, position));

        if let (Some(time), Some(b)) = (time_on_current_trip, boarding.as_ref()) {
            if time < state.best_arrival(round, stop_idx) && time < *best_at_destination {
                state.set_best_arrival(round, stop_idx, time);
                state.set_parent_transit(round, stop_idx, b.stop, round - 1, route_idx, b.departure, b.trip, b.position, position);
                state.mark(stop_idx);
                if state.is_destination(stop_idx) {
                    *best_at_destination = (*best_at_destination).min(time);
                }
            }
        }

        if state.is_marked_prev(stop_idx) {
            let not_before = state.best_arrival(round - 1, stop_idx);
            if let Some(candidate_trip) = route.earliest_trip_at_or_after(schedule, position, not_before) {
                let candidate_departure = route.time_at(schedule, candidate_trip, position);
                let should_adopt = match time_on_current_trip {
                    None => true,
                    Some(current) => candidate_departure < current,
                };
                if should_adopt {
                    boarding = Some(Boarding { trip: candidate_trip, stop: stop_idx, departure: candidate_departure, position });
                }
            }
        }
    }
}

fn scan_transfers(network: &Network, state: &mut RoutingState, round: usize, best_at_destination: &mut Timestamp) {
    let snapshot_len = state.marked_stops().len();
    for index in 0..snapshot_len {
        let from = state.marked_stops()[index];
        let arrival = state.best_arrival(round, from);

        let stop = &network.stops[from as usize];
        for &(to, walk) in stop.explicit_transfers(network.explicit_transfers()) {
            relax_transfer(state, round, to, arrival + walk, from, arrival, best_at_destination);
        }
        for &to in stop.implicit_transfers(network.implicit_transfers()) {
            relax_transfer(state, round, to, arrival + crate::network::IMPLICIT_TRANSFER_SECONDS, from, arrival, best_at_destination);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn relax_transfer(state: &mut RoutingState, round: usize, to: StopIndex, candidate: Timestamp, from: StopIndex, departure: Timestamp, best_at_destination: &mut Timestamp) {
    if candidate < state.best_arrival(round, to) {
        state.set_best_arrival(round, to, candidate);
        state.set_parent_transfer(round, to, from, departure);
        state.mark(to);
        if state.is_destination(to) {
            *best_at_destination = (*best_at_destination).min(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{RawRoute, RawStop};

    fn stop(id: u32, name: &str) -> RawStop {
        RawStop { id, name: name.to_string(), lat: 0.0, lon: 0.0, route_ids: vec![], transfers: vec![] }
    }

    #[test]
    fn single_trip_direct_connection_is_found() {
        let stops = vec![stop(1, "A"), stop(2, "B"), stop(3, "C")];
        let routes = vec![RawRoute { id: 1, name: "L1".into(), stop_ids: vec![1, 2, 3], schedule: vec![1000, 1100, 1200], trip_count: 1 }];
        let network = Network::build(stops, routes).unwrap();
        let mut state = RoutingState::new(network.stop_count(), network.route_count(), 3);

        let arrival = run(&network, &mut state, &[0], &[2], 900, 3, None);
        assert_eq!(arrival, 1200);
        let journey = crate::journey::reconstruct(&state, &network, 2, 1).unwrap();
        assert_eq!(journey.legs.len(), 1);
        assert_eq!(journey.legs[0].departure, 1000);
    }

    #[test]
    fn unreachable_destination_returns_max() {
        let stops = vec![stop(1, "A"), stop(2, "B")];
        let network = Network::build(stops, vec![]).unwrap();
        let mut state = RoutingState::new(network.stop_count(), network.route_count(), 2);
        let arrival = run(&network, &mut state, &[0], &[1], 0, 2, None);
        assert_eq!(arrival, Timestamp::MAX);
    }

    #[test]
    fn transfer_then_second_route_reaches_destination_in_two_rounds() {
        // A --L1--> B, then a 120s implicit transfer to a same-named "B" stop
        // that is the boarding point of L2 onward to C.
        let stops = vec![stop(1, "A"), stop(2, "B"), stop(3, "B"), stop(4, "C")];
        let routes = vec![
            RawRoute { id: 1, name: "L1".into(), stop_ids: vec![1, 2], schedule: vec![1000, 1100], trip_count: 1 },
            RawRoute { id: 2, name: "L2".into(), stop_ids: vec![3, 4], schedule: vec![1300, 1400], trip_count: 1 },
        ];
        let network = Network::build(stops, routes).unwrap();
        let mut state = RoutingState::new(network.stop_count(), network.route_count(), 3);

        let arrival = run(&network, &mut state, &[0], &[3], 900, 3, None);
        assert_eq!(arrival, 1400);
        let journey = crate::journey::reconstruct(&state, &network, 3, 2).unwrap();
        assert_eq!(journey.legs.len(), 3);
        assert!(!journey.legs[0].is_transfer);
        assert!(journey.legs[1].is_transfer);
        assert!(!journey.legs[2].is_transfer);
    }

    #[test]
    fn target_pruning_ignores_a_later_arrival_at_destination() {
        // Two parallel routes reach the destination: a fast direct trip and a
        // slower one-stop one. Only the fast arrival should be retained.
        let stops = vec![stop(1, "A"), stop(2, "Z")];
        let routes = vec![
            RawRoute { id: 1, name: "Fast".into(), stop_ids: vec![1, 2], schedule: vec![1000, 1100], trip_count: 1 },
            RawRoute { id: 2, name: "Slow".into(), stop_ids: vec![1, 2], schedule: vec![1000, 1500], trip_count: 1 },
        ];
        let network = Network::build(stops, routes).unwrap();
        let mut state = RoutingState::new(network.stop_count(), network.route_count(), 2);

        let arrival = run(&network, &mut state, &[0], &[1], 900, 2, None);
        assert_eq!(arrival, 1100);
    }

    #[test]
    fn route_filter_excludes_a_blocked_route_from_the_scan() {
        let stops = vec![stop(1, "A"), stop(2, "B")];
        let routes = vec![RawRoute { id: 7, name: "M1".into(), stop_ids: vec![1, 2], schedule: vec![1000, 1100], trip_count: 1 }];
        let network = Network::build(stops, routes).unwrap();
        let mut state = RoutingState::new(network.stop_count(), network.route_count(), 2);
        let filter = RouteFilter { blocked_ids: [7u32].into_iter().collect(), ..Default::default() };

        let arrival = run(&network, &mut state, &[0], &[1], 900, 2, Some(&filter));
        assert_eq!(arrival, Timestamp::MAX);
    }

    #[test]
    fn stops_before_k_max_when_no_new_stop_is_marked() {
        let stops = vec![stop(1, "A"), stop(2, "B")];
        let routes = vec![RawRoute { id: 1, name: "L1".into(), stop_ids: vec![1, 2], schedule: vec![1000, 1100], trip_count: 1 }];
        let network = Network::build(stops, routes).unwrap();
        let mut state = RoutingState::new(network.stop_count(), network.route_count(), 10);

        let arrival = run(&network, &mut state, &[0], &[1], 900, 10, None);
        assert_eq!(arrival, 1100);
    }
}
