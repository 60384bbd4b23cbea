//! Per-query mutable routing state (component D): the best-arrival matrix,
//! parent pointers as seven parallel arrays, and the mark sets the round loop
//! reads and writes. Allocated once per network and reused across queries so
//! a steady-state query allocates nothing sized in stop or route count.

use crate::network::{Network, RouteIndex, StopIndex, Timestamp, TripIndex};

const NO_PARENT: i32 = -1;

/// One resolved parent pointer, read back out of the struct-of-arrays
/// storage for journey reconstruction.
#[derive(Debug, Clone, Copy)]
pub struct Parent {
    pub stop: StopIndex,
    pub round: usize,
    /// `None` for a walking transfer, `Some` for a transit leg.
    pub route: Option<RouteIndex>,
    pub departure: Timestamp,
    pub trip: Option<TripIndex>,
    pub boarding_position: Option<u32>,
    pub alighting_position: Option<u32>,
}

pub struct RoutingState {
    num_stops: usize,
    rounds: usize, // K + 1
    best_arrival: Vec<Timestamp>,

    parent_stop: Vec<i32>,
    parent_round: Vec<i32>,
    parent_route: Vec<i32>,
    parent_departure: Vec<Timestamp>,
    parent_trip: Vec<i32>,
    parent_boarding_pos: Vec<i32>,
    parent_alighting_pos: Vec<i32>,

    marked: Vec<bool>,
    marked_list: Vec<StopIndex>,
    marked_prev: Vec<bool>,
    marked_prev_list: Vec<StopIndex>,

    /// Scratch reused by `Network::collect_routes_for_marks`.
    pub(crate) route_seen_scratch: Vec<bool>,
    /// Scratch output buffer for the routes serving the previous round's marks.
    pub(crate) routes_scratch: Vec<RouteIndex>,

    /// `true` for stops that are a destination of the in-flight query, so the
    /// round loop can tighten its target-pruning bound in O(1) without an
    /// allocation sized to the destination set.
    destination_flags: Vec<bool>,
    destination_list: Vec<StopIndex>,

    last_max_round_used: usize,
}

impl RoutingState {
    pub fn new(num_stops: usize, route_count: usize, max_rounds: usize) -> Self {
        let rounds = max_rounds + 1;
        let cells = rounds * num_stops;
        RoutingState {
            num_stops,
            rounds,
            best_arrival: vec![Timestamp::MAX; cells],
            parent_stop: vec![NO_PARENT; cells],
            parent_round: vec![NO_PARENT; cells],
            parent_route: vec![NO_PARENT; cells],
            parent_departure: vec![0; cells],
            parent_trip: vec![NO_PARENT; cells],
            parent_boarding_pos: vec![NO_PARENT; cells],
            parent_alighting_pos: vec![NO_PARENT; cells],
            marked: vec![false; num_stops],
            marked_list: Vec::new(),
            marked_prev: vec![false; num_stops],
            marked_prev_list: Vec::new(),
            route_seen_scratch: vec![false; route_count],
            routes_scratch: Vec::new(),
            destination_flags: vec![false; num_stops],
            destination_list: Vec::new(),
            last_max_round_used: 0,
        }
    }

    pub fn max_rounds(&self) -> usize {
        self.rounds - 1
    }

    fn idx(&self, round: usize, stop: StopIndex) -> usize {
        round * self.num_stops + stop as usize
    }

    /// Clears only the rounds touched by the previous query, then seeds
    /// round 0 with `tau0` at every origin and marks them for round 1's
    /// route scan.
    pub fn reset(&mut self, origins: &[StopIndex], tau0: Timestamp) {
        for round in 0..=self.last_max_round_used {
            let start = round * self.num_stops;
            let end = start + self.num_stops;
            self.best_arrival[start..end].fill(Timestamp::MAX);
            self.parent_stop[start..end].fill(NO_PARENT);
            self.parent_round[start..end].fill(NO_PARENT);
            self.parent_route[start..end].fill(NO_PARENT);
            self.parent_trip[start..end].fill(NO_PARENT);
            self.parent_boarding_pos[start..end].fill(NO_PARENT);
            self.parent_alighting_pos[start..end].fill(NO_PARENT);
        }
        for &stop in &self.marked_list {
            self.marked[stop as usize] = false;
        }
        self.marked_list.clear();
        for &stop in &self.marked_prev_list {
            self.marked_prev[stop as usize] = false;
        }
        self.marked_prev_list.clear();
        self.last_max_round_used = 0;

        for &origin in origins {
            let i = self.idx(0, origin);
            self.best_arrival[i] = tau0;
            self.mark(origin);
        }
    }

    /// Records the active query's destination set so `is_destination` is an
    /// O(1) lookup during the round loop. Clears only the previous query's
    /// destinations rather than the whole stop space.
    pub fn set_destinations(&mut self, destinations: &[StopIndex]) {
        for &stop in &self.destination_list {
            self.destination_flags[stop as usize] = false;
        }
        self.destination_list.clear();
        self.destination_list.extend_from_slice(destinations);
        for &stop in destinations {
            self.destination_flags[stop as usize] = true;
        }
    }

    pub fn is_destination(&self, stop: StopIndex) -> bool {
        self.destination_flags[stop as usize]
    }

    pub fn note_round_used(&mut self, round: usize) {
        if round > self.last_max_round_used {
            self.last_max_round_used = round;
        }
    }

    pub fn best_arrival(&self, round: usize, stop: StopIndex) -> Timestamp {
        self.best_arrival[self.idx(round, stop)]
    }

    pub fn set_best_arrival(&mut self, round: usize, stop: StopIndex, time: Timestamp) {
        let i = self.idx(round, stop);
        self.best_arrival[i] = time;
    }

    /// Copies `bestArrival[k-1]` forward into `bestArrival[k]`, the
    /// monotonic-improvement baseline step 1 of each round relies on.
    pub fn carry_forward_best_arrival(&mut self, round: usize) {
        debug_assert!(round >= 1);
        let (prev, current) = {
            let prev_start = (round - 1) * self.num_stops;
            let current_start = round * self.num_stops;
            (prev_start, current_start)
        };
        self.best_arrival.copy_within(prev..prev + self.num_stops, current);
    }

    pub fn set_parent_transit(
        &mut self,
        round: usize,
        stop: StopIndex,
        parent_stop: StopIndex,
        parent_round: usize,
        route: RouteIndex,
        departure: Timestamp,
        trip: TripIndex,
        boarding_position: usize,
        alighting_position: usize,
    ) {
        let i = self.idx(round, stop);
        self.parent_stop[i] = parent_stop as i32;
        self.parent_round[i] = parent_round as i32;
        self.parent_route[i] = route as i32;
        self.parent_departure[i] = departure;
        self.parent_trip[i] = trip as i32;
        self.parent_boarding_pos[i] = boarding_position as i32;
        self.parent_alighting_pos[i] = alighting_position as i32;
    }

    pub fn set_parent_transfer(&mut self, round: usize, stop: StopIndex, parent_stop: StopIndex, departure: Timestamp) {
        let i = self.idx(round, stop);
        self.parent_stop[i] = parent_stop as i32;
        self.parent_round[i] = round as i32;
        self.parent_route[i] = NO_PARENT;
        self.parent_departure[i] = departure;
        self.parent_trip[i] = NO_PARENT;
        self.parent_boarding_pos[i] = NO_PARENT;
        self.parent_alighting_pos[i] = NO_PARENT;
    }

    pub fn parent(&self, round: usize, stop: StopIndex) -> Option<Parent> {
        let i = self.idx(round, stop);
        if self.parent_stop[i] == NO_PARENT {
            return None;
        }
        Some(Parent {
            stop: self.parent_stop[i] as StopIndex,
            round: self.parent_round[i] as usize,
            route: if self.parent_route[i] == NO_PARENT { None } else { Some(self.parent_route[i] as RouteIndex) },
            departure: self.parent_departure[i],
            trip: if self.parent_trip[i] == NO_PARENT { None } else { Some(self.parent_trip[i] as TripIndex) },
            boarding_position: if self.parent_boarding_pos[i] == NO_PARENT { None } else { Some(self.parent_boarding_pos[i] as u32) },
            alighting_position: if self.parent_alighting_pos[i] == NO_PARENT { None } else { Some(self.parent_alighting_pos[i] as u32) },
        })
    }

    pub fn is_marked(&self, stop: StopIndex) -> bool {
        self.marked[stop as usize]
    }

    pub fn is_marked_prev(&self, stop: StopIndex) -> bool {
        self.marked_prev[stop as usize]
    }

    pub fn mark(&mut self, stop: StopIndex) {
        let slot = &mut self.marked[stop as usize];
        if !*slot {
            *slot = true;
            self.marked_list.push(stop);
        }
    }

    pub fn marked_stops(&self) -> &[StopIndex] {
        &self.marked_list
    }

    pub fn marked_prev_stops(&self) -> &[StopIndex] {
        &self.marked_prev_list
    }

    pub fn any_marked(&self) -> bool {
        !self.marked_list.is_empty()
    }

    /// Step 1 of a round: snapshot the current marks as `markedPrev`, then
    /// clear the current set for this round's writes.
    pub fn shift_marks(&mut self) {
        for &stop in &self.marked_prev_list {
            self.marked_prev[stop as usize] = false;
        }
        self.marked_prev_list.clear();
        std::mem::swap(&mut self.marked_prev, &mut self.marked);
        std::mem::swap(&mut self.marked_prev_list, &mut self.marked_list);
        debug_assert!(self.marked_list.is_empty());
        debug_assert!(self.marked.iter().all(|&m| !m));
    }

    /// Unions the routes serving every stop in `markedPrev` into an owned
    /// buffer, reusing `routes_scratch`'s backing allocation across queries.
    /// The vector is handed back to the caller instead of returned by
    /// reference because the round loop needs to read it while also calling
    /// other `&mut self` methods on this same state.
    pub fn collect_routes_to_scan(&mut self, network: &Network) -> Vec<RouteIndex> {
        let mut routes_to_scan = std::mem::take(&mut self.routes_scratch);
        network.collect_routes_for_marks(&self.marked_prev_list, &mut self.route_seen_scratch, &mut routes_to_scan);
        routes_to_scan
    }

    /// Returns a buffer obtained from [`Self::collect_routes_to_scan`] so its
    /// allocation is reused by the next round or query.
    pub fn return_routes_scratch(&mut self, routes: Vec<RouteIndex>) {
        self.routes_scratch = routes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_seeds_round_zero_and_marks_origins() {
        let mut state = RoutingState::new(4, 2, 3);
        state.reset(&[1, 2], 100);
        assert_eq!(state.best_arrival(0, 1), 100);
        assert_eq!(state.best_arrival(0, 2), 100);
        assert_eq!(state.best_arrival(0, 0), Timestamp::MAX);
        assert!(state.is_marked(1));
        assert!(state.is_marked(2));
        assert!(!state.is_marked(0));
    }

    #[test]
    fn reset_clears_only_previously_used_rounds() {
        let mut state = RoutingState::new(3, 1, 5);
        state.reset(&[0], 0);
        state.set_best_arrival(3, 1, 42);
        state.note_round_used(3);
        state.reset(&[0], 0);
        // Round 3 was in-bounds of the previous reset's clear sweep.
        assert_eq!(state.best_arrival(3, 1), Timestamp::MAX);
    }

    #[test]
    fn shift_marks_moves_current_into_prev_and_clears_current() {
        let mut state = RoutingState::new(3, 1, 2);
        state.mark(0);
        state.mark(1);
        state.shift_marks();
        assert!(!state.any_marked());
        assert_eq!(state.marked_prev_stops(), &[0, 1]);
    }

    #[test]
    fn transit_parent_round_trips_through_accessor() {
        let mut state = RoutingState::new(3, 1, 2);
        state.set_parent_transit(1, 2, 0, 0, 5, 1000, 7, 1, 3);
        let parent = state.parent(1, 2).unwrap();
        assert_eq!(parent.stop, 0);
        assert_eq!(parent.route, Some(5));
        assert_eq!(parent.trip, Some(7));
        assert_eq!(parent.boarding_position, Some(1));
        assert_eq!(parent.alighting_position, Some(3));
    }

    #[test]
    fn transfer_parent_has_no_route_or_trip() {
        let mut state = RoutingState::new(3, 1, 2);
        state.set_parent_transfer(1, 2, 0, 500);
        let parent = state.parent(1, 2).unwrap();
        assert_eq!(parent.route, None);
        assert_eq!(parent.trip, None);
        assert_eq!(parent.departure, 500);
    }
}
