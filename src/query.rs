//! Public query facade (component F) and period registry (component H). Maps
//! caller-facing ids and times onto the flat algorithm in `algorithm::run`,
//! Pareto-enumerates the round-indexed results into journeys, and owns one
//! `(Network, RoutingState)` pair per loaded period.

use std::collections::HashMap;

use crate::algorithm;
use crate::error::PlannerError;
use crate::filter::RouteFilter;
use crate::journey::{self, Journey};
use crate::network::{Network, StopId, StopIndex, Timestamp};
use crate::state::RoutingState;

pub const DEFAULT_MAX_ROUNDS: usize = 5;
pub const DEFAULT_ARRIVE_BY_WINDOW_MINUTES: u32 = 120;

/// Holds every loaded period's network and its matching routing state, with
/// at most one period "active" at a time. A caller needing concurrent
/// queries keeps one `Planner` per worker, per the single-threaded-per-query
/// resource model.
pub struct Planner {
    periods: HashMap<String, (Network, RoutingState)>,
    active: Option<String>,
}

impl Planner {
    pub fn new() -> Self {
        Planner { periods: HashMap::new(), active: None }
    }

    /// Registers `network` under `id`, sizing its routing state for up to
    /// `max_rounds` rounds so later queries never reallocate it. The first
    /// period ever inserted becomes active automatically; this is the
    /// obvious symmetric counterpart to `setPeriod`/`availablePeriods` (see
    /// DESIGN.md).
    pub fn insert_period(&mut self, id: impl Into<String>, network: Network, max_rounds: usize) {
        let id = id.into();
        let state = RoutingState::new(network.stop_count(), network.route_count(), max_rounds);
        let activate = self.active.is_none();
        self.periods.insert(id.clone(), (network, state));
        if activate {
            self.active = Some(id);
        }
    }

    pub fn set_period(&mut self, id: &str) -> Result<(), PlannerError> {
        if !self.periods.contains_key(id) {
            return Err(PlannerError::UnknownPeriod(id.to_string()));
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    pub fn current_period(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn available_periods(&self) -> impl Iterator<Item = &str> {
        self.periods.keys().map(String::as_str)
    }

    fn active_mut(&mut self) -> Option<(&Network, &mut RoutingState)> {
        let id = self.active.as_ref()?;
        let entry = self.periods.get_mut(id)?;
        Some((&entry.0, &mut entry.1))
    }

    /// Forward query: departs at or after `departure_time`, Pareto-enumerates
    /// by round. Unknown ids are dropped; an empty origin or destination set
    /// after resolution (including the O=D case, where any destination also
    /// named as an origin is stripped) returns an empty list rather than an
    /// error, per the soft-failure design.
    pub fn forward_query(
        &mut self,
        origin_ids: &[StopId],
        destination_ids: &[StopId],
        departure_time: Timestamp,
        max_rounds: Option<usize>,
        filter: Option<&RouteFilter>,
    ) -> Vec<Journey> {
        let Some((network, state)) = self.active_mut() else { return Vec::new() };
        let origins = resolve_indices(network, origin_ids);
        let mut destinations = resolve_indices(network, destination_ids);
        destinations.retain(|d| !origins.contains(d));
        if origins.is_empty() || destinations.is_empty() {
            return Vec::new();
        }

        let k = max_rounds.unwrap_or(DEFAULT_MAX_ROUNDS).min(state.max_rounds());
        algorithm::run(network, state, &origins, &destinations, departure_time, k, filter);
        enumerate_pareto(state, network, &destinations, k)
    }

    /// Arrive-by query: binary-searches the departure time in
    /// `[max(0, deadline - window), deadline]` at 60-second granularity for
    /// the latest departure whose forward search reaches `destination_ids`
    /// by `arrival_deadline`, and returns that probe's Pareto set.
    pub fn arrive_by_query(
        &mut self,
        origin_ids: &[StopId],
        destination_ids: &[StopId],
        arrival_deadline: Timestamp,
        max_rounds: Option<usize>,
        window_minutes: Option<u32>,
        filter: Option<&RouteFilter>,
    ) -> Vec<Journey> {
        let Some((network, state)) = self.active_mut() else { return Vec::new() };
        let origins = resolve_indices(network, origin_ids);
        let mut destinations = resolve_indices(network, destination_ids);
        destinations.retain(|d| !origins.contains(d));
        if origins.is_empty() || destinations.is_empty() {
            return Vec::new();
        }

        let k = max_rounds.unwrap_or(DEFAULT_MAX_ROUNDS).min(state.max_rounds());
        let window_seconds = window_minutes.unwrap_or(DEFAULT_ARRIVE_BY_WINDOW_MINUTES) as Timestamp * 60;
        let lower_bound = arrival_deadline.saturating_sub(window_seconds);
        let steps = arrival_deadline.saturating_sub(lower_bound) / 60;

        // Binary search over the 60-second grid for the latest feasible
        // departure: feasibility (arrival <= deadline) is true for early
        // probes and false once departing too late to make the deadline.
        let mut lo: i64 = 0;
        let mut hi: i64 = steps as i64;
        let mut best: Option<Vec<Journey>> = None;
        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            let probe = lower_bound + mid as Timestamp * 60;
            let arrival = algorithm::run(network, state, &origins, &destinations, probe, k, filter);
            if arrival != Timestamp::MAX && arrival <= arrival_deadline {
                best = Some(enumerate_pareto(state, network, &destinations, k));
                lo = mid + 1;
            } else {
                hi = mid - 1;
            }
        }
        best.unwrap_or_default()
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_indices(network: &Network, ids: &[StopId]) -> Vec<StopIndex> {
    ids.iter().filter_map(|&id| network.stop_index(id)).collect()
}

/// For each round 1..=k, finds the destination with the earliest arrival and
/// emits a journey for it iff that arrival strictly improves on the last one
/// emitted, producing a non-dominated set ordered by non-increasing transfer
/// count and strictly decreasing arrival time.
fn enumerate_pareto(state: &RoutingState, network: &Network, destinations: &[StopIndex], k: usize) -> Vec<Journey> {
    let mut journeys = Vec::new();
    let mut last_arrival = Timestamp::MAX;
    for round in 1..=k {
        let mut best_destination = None;
        let mut best_arrival = Timestamp::MAX;
        for &destination in destinations {
            let arrival = state.best_arrival(round, destination);
            if arrival < best_arrival {
                best_arrival = arrival;
                best_destination = Some(destination);
            }
        }
        let Some(destination) = best_destination else { continue };
        if best_arrival >= last_arrival {
            continue;
        }
        if let Some(journey) = journey::reconstruct(state, network, destination, round) {
            last_arrival = best_arrival;
            journeys.push(journey);
        }
    }
    journeys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{RawRoute, RawStop};

    fn stop(id: u32, name: &str) -> RawStop {
        RawStop { id, name: name.to_string(), lat: 0.0, lon: 0.0, route_ids: vec![], transfers: vec![] }
    }

    fn small_network() -> Network {
        let stops = vec![stop(1, "A"), stop(2, "B"), stop(3, "C")];
        let routes = vec![
            RawRoute { id: 1, name: "L1".into(), stop_ids: vec![1, 2, 3], schedule: vec![1000, 1100, 1200], trip_count: 1 },
            RawRoute { id: 2, name: "L2".into(), stop_ids: vec![1, 3], schedule: vec![950, 1150], trip_count: 1 },
        ];
        Network::build(stops, routes).unwrap()
    }

    #[test]
    fn insert_period_activates_the_first_one_automatically() {
        let mut planner = Planner::new();
        assert_eq!(planner.current_period(), None);
        planner.insert_period("summer2026", small_network(), 5);
        assert_eq!(planner.current_period(), Some("summer2026"));
    }

    #[test]
    fn set_period_rejects_an_unknown_id() {
        let mut planner = Planner::new();
        planner.insert_period("summer2026", small_network(), 5);
        assert!(matches!(planner.set_period("winter2026"), Err(PlannerError::UnknownPeriod(_))));
        assert_eq!(planner.current_period(), Some("summer2026"));
    }

    #[test]
    fn forward_query_with_no_active_period_is_empty() {
        let mut planner = Planner::new();
        assert!(planner.forward_query(&[1], &[3], 900, None, None).is_empty());
    }

    #[test]
    fn forward_query_finds_the_faster_of_two_competing_routes() {
        let mut planner = Planner::new();
        planner.insert_period("now", small_network(), 5);
        let journeys = planner.forward_query(&[1], &[3], 900, None, None);
        assert!(!journeys.is_empty());
        assert_eq!(journeys[0].arrival, 1150);
    }

    #[test]
    fn forward_query_same_stop_as_origin_and_destination_is_empty() {
        let mut planner = Planner::new();
        planner.insert_period("now", small_network(), 5);
        assert!(planner.forward_query(&[1], &[1], 900, None, None).is_empty());
    }

    #[test]
    fn forward_query_drops_unknown_ids_and_is_empty_if_nothing_resolves() {
        let mut planner = Planner::new();
        planner.insert_period("now", small_network(), 5);
        assert!(planner.forward_query(&[999], &[3], 900, None, None).is_empty());
    }

    #[test]
    fn arrive_by_query_respects_the_deadline_and_picks_the_latest_feasible_departure() {
        let mut planner = Planner::new();
        planner.insert_period("now", small_network(), 5);
        let journeys = planner.arrive_by_query(&[1], &[3], 1300, None, Some(10), None);
        assert!(!journeys.is_empty());
        assert!(journeys[0].arrival <= 1300);
    }

    #[test]
    fn arrive_by_query_with_an_unreachable_deadline_is_empty() {
        let mut planner = Planner::new();
        planner.insert_period("now", small_network(), 5);
        assert!(planner.arrive_by_query(&[1], &[3], 100, None, Some(1), None).is_empty());
    }
}
