pub mod algorithm;
pub mod error;
pub mod filter;
pub mod journey;
pub mod loader;
pub mod network;
pub mod query;
pub mod state;
pub mod utils;

pub use error::{LoadError, NetworkError, PlannerError};
pub use filter::RouteFilter;
pub use journey::{IntermediateStop, Journey, Leg};
pub use network::{Network, RawRoute, RawStop};
pub use query::Planner;
pub use state::RoutingState;
