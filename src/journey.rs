//! Journey leg representation and parent-pointer reconstruction. A leg is a
//! single record with an `is_transfer` discriminant rather than an
//! inheritance hierarchy, per the design notes: transit fields are `None` on
//! a transfer leg instead of two leg types behind a trait object.

use crate::network::{Network, RouteIndex, StopIndex, Timestamp, TripIndex, UNRESOLVED_STOP};
use crate::state::RoutingState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntermediateStop {
    pub stop: StopIndex,
    pub time: Timestamp,
}

#[derive(Debug, Clone)]
pub struct Leg {
    pub from_stop: StopIndex,
    pub to_stop: StopIndex,
    pub departure: Timestamp,
    pub arrival: Timestamp,
    pub is_transfer: bool,
    /// Route display name; absent on a transfer leg.
    pub route_name: Option<Box<str>>,
    pub route_id: Option<u32>,
    pub route: Option<RouteIndex>,
    pub trip: Option<TripIndex>,
    /// Name of the last stop of the route's pattern, i.e. the destination
    /// headsign direction travellers would see on the vehicle.
    pub direction: Option<Box<str>>,
    pub intermediate_stops: Vec<IntermediateStop>,
}

impl Leg {
    fn transfer(from_stop: StopIndex, to_stop: StopIndex, departure: Timestamp, arrival: Timestamp) -> Self {
        Leg {
            from_stop,
            to_stop,
            departure,
            arrival,
            is_transfer: true,
            route_name: None,
            route_id: None,
            route: None,
            trip: None,
            direction: None,
            intermediate_stops: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Journey {
    pub legs: Vec<Leg>,
    pub arrival: Timestamp,
    /// The RAPTOR round this journey was enumerated at: the number of
    /// boarded transit trips used, i.e. transfer count + 1 for a simple
    /// point-to-point itinerary.
    pub round: usize,
    pub destination: StopIndex,
}

impl Journey {
    pub fn departure(&self) -> Option<Timestamp> {
        self.legs.first().map(|leg| leg.departure)
    }
}

/// Finds the round at or before `round` in which `(round, stop)` actually
/// recorded a parent write, walking back through rounds where the value was
/// only carried forward unchanged.
fn resolve_write_round(state: &RoutingState, mut round: usize, stop: StopIndex) -> usize {
    while round > 0 && state.parent(round, stop).is_none() {
        round -= 1;
    }
    round
}

/// Chases parent pointers from `(destination, round)` back to an origin
/// (a stop with no parent, per the open question on origin seeding) and
/// returns the journey with legs in departure order. `None` if the
/// destination was unreached at `round`.
pub fn reconstruct(state: &RoutingState, network: &Network, destination: StopIndex, round: usize) -> Option<Journey> {
    let arrival = state.best_arrival(round, destination);
    if arrival == Timestamp::MAX {
        return None;
    }

    let mut legs = Vec::new();
    let mut current_round = resolve_write_round(state, round, destination);
    let mut current_stop = destination;

    const MAX_LEGS: usize = 1024;
    loop {
        let Some(parent) = state.parent(current_round, current_stop) else { break };
        let leg_arrival = state.best_arrival(current_round, current_stop);

        let leg = if let Some(route_idx) = parent.route {
            let route = &network.routes[route_idx as usize];
            let trip = parent.trip.expect("transit parent always records a trip");
            let boarding_position = parent.boarding_position.expect("transit parent always records boarding position") as usize;
            let alighting_position = parent.alighting_position.expect("transit parent always records alighting position") as usize;
            let pattern = route.stops(network.route_stops());

            let mut intermediate_stops = Vec::new();
            for position in (boarding_position + 1)..alighting_position {
                let stop_idx = pattern[position];
                if stop_idx != UNRESOLVED_STOP {
                    intermediate_stops.push(IntermediateStop { stop: stop_idx, time: route.time_at(network.schedule(), trip, position) });
                }
            }
            let direction = pattern
                .last()
                .copied()
                .filter(|&stop_idx| stop_idx != UNRESOLVED_STOP)
                .map(|stop_idx| network.stops[stop_idx as usize].name.clone());

            Leg {
                from_stop: parent.stop,
                to_stop: current_stop,
                departure: parent.departure,
                arrival: leg_arrival,
                is_transfer: false,
                route_name: Some(route.name.clone()),
                route_id: Some(route.id),
                route: Some(route_idx),
                trip: Some(trip),
                direction,
                intermediate_stops,
            }
        } else {
            Leg::transfer(parent.stop, current_stop, parent.departure, leg_arrival)
        };

        legs.push(leg);
        if legs.len() > MAX_LEGS {
            log::warn!("journey reconstruction exceeded {MAX_LEGS} legs, aborting to avoid an unbounded chase");
            return None;
        }

        current_stop = parent.stop;
        current_round = resolve_write_round(state, parent.round, current_stop);
    }

    legs.reverse();
    Some(Journey { legs, arrival, round, destination })
}
