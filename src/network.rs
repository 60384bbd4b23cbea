//! Flat, cache-dense data model plus the derived indices built on top of it
//! (components A and B): stops and routes as row-major arrays with no
//! pointer chasing in the hot scan loop, and the stop->routes / stop->stop
//! transfer indices precomputed once at load time.

use std::collections::HashMap;

use crate::error::NetworkError;

pub type StopId = u32;
pub type StopIndex = u32;
pub type RouteIndex = u32;
pub type TripIndex = u32;
/// Seconds since local midnight. May exceed 86_400 to encode post-midnight
/// service; not timezone-aware.
pub type Timestamp = u32;

/// Marks a route-pattern position whose stop id did not resolve against
/// [`Network::stop_index`]. Positions carrying this sentinel are skipped at
/// scan time rather than treated as an error (see spec invariant on unknown
/// references).
pub const UNRESOLVED_STOP: StopIndex = StopIndex::MAX;

/// Pre-index record for one stop, as a loader would hand it to
/// [`Network::build`]. Not retained after the network is built.
pub struct RawStop {
    pub id: StopId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Route ids serving this stop. Informational only at this stage: the
    /// authoritative stop->route index is rebuilt from the routes' own
    /// patterns in [`Network::build`], so a route id listed here that never
    /// actually contains this stop in its pattern has no effect.
    pub route_ids: Vec<u32>,
    pub transfers: Vec<(StopId, Timestamp)>,
}

/// Pre-index record for one route (one direction-specific pattern and its
/// trips), as a loader would hand it to [`Network::build`].
pub struct RawRoute {
    pub id: u32,
    pub name: String,
    pub stop_ids: Vec<StopId>,
    /// Row-major `trip_count * stop_ids.len()` absolute times, already sorted
    /// by first-stop departure (the loader's job, not ours).
    pub schedule: Vec<Timestamp>,
    pub trip_count: usize,
}

impl RawRoute {
    fn stop_count(&self) -> usize {
        self.stop_ids.len()
    }
}

#[derive(Debug)]
pub struct Stop {
    pub id: StopId,
    pub name: Box<str>,
    pub lat: f64,
    pub lon: f64,
    routes_idx: usize,
    num_routes: usize,
    transfers_idx: usize,
    num_transfers: usize,
    implicit_idx: usize,
    num_implicit: usize,
}

impl Stop {
    pub fn routes<'a>(&self, stop_routes: &'a [RouteIndex]) -> &'a [RouteIndex] {
        &stop_routes[self.routes_idx..self.routes_idx + self.num_routes]
    }

    pub fn explicit_transfers<'a>(&self, transfers: &'a [(StopIndex, Timestamp)]) -> &'a [(StopIndex, Timestamp)] {
        &transfers[self.transfers_idx..self.transfers_idx + self.num_transfers]
    }

    pub fn implicit_transfers<'a>(&self, implicit: &'a [StopIndex]) -> &'a [StopIndex] {
        &implicit[self.implicit_idx..self.implicit_idx + self.num_implicit]
    }
}

/// Fixed walk time assumed for a same-name implicit transfer.
pub const IMPLICIT_TRANSFER_SECONDS: Timestamp = 120;

pub struct Route {
    pub id: u32,
    pub name: Box<str>,
    pub stop_count: StopIndex,
    pub trip_count: TripIndex,
    route_stops_idx: usize,
    schedule_idx: usize,
}

impl Route {
    pub fn stops<'a>(&self, route_stops: &'a [StopIndex]) -> &'a [StopIndex] {
        &route_stops[self.route_stops_idx..self.route_stops_idx + self.stop_count as usize]
    }

    fn row_start(&self, trip: TripIndex) -> usize {
        self.schedule_idx + trip as usize * self.stop_count as usize
    }

    pub fn trip_row<'a>(&self, schedule: &'a [Timestamp], trip: TripIndex) -> &'a [Timestamp] {
        let start = self.row_start(trip);
        &schedule[start..start + self.stop_count as usize]
    }

    pub fn time_at(&self, schedule: &[Timestamp], trip: TripIndex, position: usize) -> Timestamp {
        schedule[self.row_start(trip) + position]
    }

    /// Binary search over the T rows of this route's schedule for the
    /// earliest trip whose time at `position` is >= `not_before`. O(log T).
    /// Depends on the row-monotonicity invariant checked at load time.
    pub fn earliest_trip_at_or_after(&self, schedule: &[Timestamp], position: usize, not_before: Timestamp) -> Option<TripIndex> {
        let stop_count = self.stop_count as usize;
        let trip_count = self.trip_count as usize;
        if trip_count == 0 {
            return None;
        }
        let mut lo = 0usize;
        let mut hi = trip_count;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let time = schedule[self.schedule_idx + mid * stop_count + position];
            if time >= not_before {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        if lo < trip_count {
            Some(lo as TripIndex)
        } else {
            None
        }
    }
}

/// Immutable, post-load network representation. Read-only after
/// [`Network::build`] returns, and safely shareable across concurrent
/// queries provided each caller owns its own [`crate::state::RoutingState`].
pub struct Network {
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    stop_id_to_index: HashMap<StopId, StopIndex>,
    route_stops: Vec<StopIndex>,
    schedule: Vec<Timestamp>,
    stop_routes: Vec<RouteIndex>,
    explicit_transfers: Vec<(StopIndex, Timestamp)>,
    implicit_transfers: Vec<StopIndex>,
}

impl Network {
    pub fn build(raw_stops: Vec<RawStop>, raw_routes: Vec<RawRoute>) -> Result<Network, NetworkError> {
        let mut stop_id_to_index = HashMap::with_capacity(raw_stops.len());
        let mut stops = Vec::with_capacity(raw_stops.len());
        for (i, raw) in raw_stops.iter().enumerate() {
            if stop_id_to_index.insert(raw.id, i as StopIndex).is_some() {
                return Err(NetworkError::DuplicateStopId(raw.id));
            }
            stops.push(Stop {
                id: raw.id,
                name: raw.name.clone().into_boxed_str(),
                lat: raw.lat,
                lon: raw.lon,
                routes_idx: 0,
                num_routes: 0,
                transfers_idx: 0,
                num_transfers: 0,
                implicit_idx: 0,
                num_implicit: 0,
            });
        }

        // Explicit transfers: flattened per stop, in input order. Unknown
        // target ids and self-transfers are dropped at build time rather
        // than stored with a sentinel, since the effect at scan time is
        // identical and this keeps the hot loop sentinel-free.
        let mut explicit_transfers = Vec::new();
        for (i, raw) in raw_stops.iter().enumerate() {
            stops[i].transfers_idx = explicit_transfers.len();
            for &(target_id, walk) in &raw.transfers {
                if let Some(&target_idx) = stop_id_to_index.get(&target_id) {
                    if target_idx as usize != i {
                        explicit_transfers.push((target_idx, walk));
                    }
                }
            }
            stops[i].num_transfers = explicit_transfers.len() - stops[i].transfers_idx;
        }

        // Routes: resolve each pattern position, flatten the schedule, and
        // validate the monotonicity invariants the earliest-trip binary
        // search depends on.
        let mut routes = Vec::with_capacity(raw_routes.len());
        let mut route_stops = Vec::new();
        let mut schedule = Vec::new();
        for raw in &raw_routes {
            let stop_count = raw.stop_count();
            let route_stops_idx = route_stops.len();
            for &stop_id in &raw.stop_ids {
                let resolved = stop_id_to_index.get(&stop_id).copied().unwrap_or(UNRESOLVED_STOP);
                route_stops.push(resolved);
            }

            Self::validate_route_schedule(raw)?;

            let schedule_idx = schedule.len();
            schedule.extend_from_slice(&raw.schedule);

            routes.push(Route {
                id: raw.id,
                name: raw.name.clone().into_boxed_str(),
                stop_count: stop_count as StopIndex,
                trip_count: raw.trip_count as TripIndex,
                route_stops_idx,
                schedule_idx,
            });
        }

        // stop -> routes index, expanded across every route object (distinct
        // direction variants of one logical route id are distinct entries
        // here automatically, since each is its own Route in `routes`).
        let mut per_stop_routes: Vec<Vec<RouteIndex>> = vec![Vec::new(); stops.len()];
        for (route_idx, route) in routes.iter().enumerate() {
            for &stop_idx in route.stops(&route_stops) {
                if stop_idx != UNRESOLVED_STOP {
                    per_stop_routes[stop_idx as usize].push(route_idx as RouteIndex);
                }
            }
        }
        let mut stop_routes = Vec::new();
        for (i, routes_for_stop) in per_stop_routes.into_iter().enumerate() {
            stops[i].routes_idx = stop_routes.len();
            stop_routes.extend(routes_for_stop);
            stops[i].num_routes = stop_routes.len() - stops[i].routes_idx;
        }

        // Implicit same-name transfers: bucket stop indices by exact display
        // name, then every stop in a bucket of size > 1 gets every other
        // member as an implicit neighbour. Symmetric and self-excluding by
        // construction.
        let mut by_name: HashMap<&str, Vec<StopIndex>> = HashMap::new();
        for (i, stop) in stops.iter().enumerate() {
            by_name.entry(&stop.name).or_default().push(i as StopIndex);
        }
        let mut implicit_by_stop: Vec<Vec<StopIndex>> = vec![Vec::new(); stops.len()];
        for members in by_name.values() {
            if members.len() < 2 {
                continue;
            }
            for &a in members {
                for &b in members {
                    if a != b {
                        implicit_by_stop[a as usize].push(b);
                    }
                }
            }
        }
        let mut implicit_transfers = Vec::new();
        for (i, neighbours) in implicit_by_stop.into_iter().enumerate() {
            stops[i].implicit_idx = implicit_transfers.len();
            implicit_transfers.extend(neighbours);
            stops[i].num_implicit = implicit_transfers.len() - stops[i].implicit_idx;
        }

        Ok(Network {
            stops,
            routes,
            stop_id_to_index,
            route_stops,
            schedule,
            stop_routes,
            explicit_transfers,
            implicit_transfers,
        })
    }

    fn validate_route_schedule(raw: &RawRoute) -> Result<(), NetworkError> {
        let stop_count = raw.stop_count();
        if stop_count == 0 || raw.trip_count == 0 {
            return Ok(());
        }
        // Each trip row non-decreasing across positions.
        for trip in 0..raw.trip_count {
            let row = &raw.schedule[trip * stop_count..(trip + 1) * stop_count];
            for position in 1..stop_count {
                if row[position] < row[position - 1] {
                    return Err(NetworkError::NonMonotonicTrip {
                        route_id: raw.id,
                        trip_index: trip,
                        position,
                        previous: row[position - 1],
                        time: row[position],
                    });
                }
            }
        }
        // Each column non-decreasing across trips.
        for position in 0..stop_count {
            for trip in 1..raw.trip_count {
                let previous = raw.schedule[(trip - 1) * stop_count + position];
                let time = raw.schedule[trip * stop_count + position];
                if time < previous {
                    return Err(NetworkError::NonMonotonicRoute {
                        route_id: raw.id,
                        trip_index: trip,
                        position,
                        previous,
                        time,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn stop_index(&self, id: StopId) -> Option<StopIndex> {
        self.stop_id_to_index.get(&id).copied()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn route_stops(&self) -> &[StopIndex] {
        &self.route_stops
    }

    pub fn schedule(&self) -> &[Timestamp] {
        &self.schedule
    }

    pub fn stop_routes(&self) -> &[RouteIndex] {
        &self.stop_routes
    }

    pub fn explicit_transfers(&self) -> &[(StopIndex, Timestamp)] {
        &self.explicit_transfers
    }

    pub fn implicit_transfers(&self) -> &[StopIndex] {
        &self.implicit_transfers
    }

    /// Unions `routesByStopIndex` over every stop marked in the previous
    /// round into `out`, each route index written at most once. `seen`
    /// is a caller-owned scratch buffer of length `route_count()`: consumed
    /// and cleared by this call so no allocation happens on the hot path.
    pub fn collect_routes_for_marks(&self, marked_prev: &[StopIndex], seen: &mut [bool], out: &mut Vec<RouteIndex>) -> usize {
        out.clear();
        for &stop_idx in marked_prev {
            for &route_idx in self.stops[stop_idx as usize].routes(&self.stop_routes) {
                let seen_slot = &mut seen[route_idx as usize];
                if !*seen_slot {
                    *seen_slot = true;
                    out.push(route_idx);
                }
            }
        }
        for &route_idx in out.iter() {
            seen[route_idx as usize] = false;
        }
        out.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(id: StopId, name: &str) -> RawStop {
        RawStop { id, name: name.to_string(), lat: 0.0, lon: 0.0, route_ids: vec![], transfers: vec![] }
    }

    #[test]
    fn resolves_stop_ids_to_dense_indices() {
        let stops = vec![stop(10, "A"), stop(20, "B")];
        let network = Network::build(stops, vec![]).unwrap();
        assert_eq!(network.stop_index(10), Some(0));
        assert_eq!(network.stop_index(20), Some(1));
        assert_eq!(network.stop_index(99), None);
    }

    #[test]
    fn duplicate_stop_id_is_rejected() {
        let stops = vec![stop(1, "A"), stop(1, "A again")];
        assert!(matches!(Network::build(stops, vec![]), Err(NetworkError::DuplicateStopId(1))));
    }

    #[test]
    fn implicit_transfers_are_symmetric_and_exclude_self() {
        let stops = vec![stop(1, "Central"), stop(2, "Central"), stop(3, "Other")];
        let network = Network::build(stops, vec![]).unwrap();
        assert_eq!(network.stops[0].implicit_transfers(&network.implicit_transfers), &[1]);
        assert_eq!(network.stops[1].implicit_transfers(&network.implicit_transfers), &[0]);
        assert!(network.stops[2].implicit_transfers(&network.implicit_transfers).is_empty());
    }

    #[test]
    fn unresolved_transfer_target_is_dropped_not_stored() {
        let stops = vec![RawStop { id: 1, name: "A".into(), lat: 0.0, lon: 0.0, route_ids: vec![], transfers: vec![(999, 60)] }];
        let network = Network::build(stops, vec![]).unwrap();
        assert!(network.stops[0].explicit_transfers(&network.explicit_transfers).is_empty());
    }

    fn route(id: u32, stop_ids: Vec<StopId>, schedule: Vec<Timestamp>, trip_count: usize) -> RawRoute {
        RawRoute { id, name: format!("R{id}"), stop_ids, schedule, trip_count }
    }

    #[test]
    fn rejects_non_monotonic_trip() {
        let stops = vec![stop(1, "A"), stop(2, "B")];
        let routes = vec![route(1, vec![1, 2], vec![100, 50], 1)];
        assert!(matches!(Network::build(stops, routes), Err(NetworkError::NonMonotonicTrip { .. })));
    }

    #[test]
    fn rejects_non_monotonic_route() {
        let stops = vec![stop(1, "A"), stop(2, "B")];
        // Two trips, stop_count 2: trip0 = [100, 200], trip1 = [90, 210] -> column 0 decreases.
        let routes = vec![route(1, vec![1, 2], vec![100, 200, 90, 210], 2)];
        assert!(matches!(Network::build(stops, routes), Err(NetworkError::NonMonotonicRoute { .. })));
    }

    #[test]
    fn earliest_trip_binary_search() {
        let stops = vec![stop(1, "A"), stop(2, "B")];
        let routes = vec![route(1, vec![1, 2], vec![100, 110, 200, 210, 300, 310], 3)];
        let network = Network::build(stops, routes).unwrap();
        let route = &network.routes[0];
        let schedule = network.schedule();
        assert_eq!(route.earliest_trip_at_or_after(schedule, 0, 0), Some(0));
        assert_eq!(route.earliest_trip_at_or_after(schedule, 0, 100), Some(0));
        assert_eq!(route.earliest_trip_at_or_after(schedule, 0, 101), Some(1));
        assert_eq!(route.earliest_trip_at_or_after(schedule, 0, 300), Some(2));
        assert_eq!(route.earliest_trip_at_or_after(schedule, 0, 301), None);
    }

    #[test]
    fn collect_routes_for_marks_deduplicates_and_clears_scratch() {
        let stops = vec![stop(1, "A"), stop(2, "B"), stop(3, "C")];
        let routes = vec![
            route(10, vec![1, 2], vec![0, 10, 100, 110], 2),
            route(20, vec![1, 3], vec![0, 10], 1),
        ];
        let network = Network::build(stops, routes).unwrap();
        let mut seen = vec![false; network.route_count()];
        let mut out = Vec::new();
        let marked = [0u32, 1u32]; // stop A and stop B both reference route 10; A also references route 20.
        let count = network.collect_routes_for_marks(&marked, &mut seen, &mut out);
        assert_eq!(count, 2);
        out.sort();
        assert_eq!(out, vec![0, 1]);
        assert!(seen.iter().all(|&s| !s));
    }
}
