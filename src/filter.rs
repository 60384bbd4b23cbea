//! Route whitelist/blacklist (component G). A plain predicate evaluated once
//! per route at the start of each scan; deliberately not a closure, so
//! dispatch stays a straightforward struct read rather than an indirect call.

use std::collections::HashSet;

use crate::network::Route;

#[derive(Default, Debug, Clone)]
pub struct RouteFilter {
    pub allowed_ids: Option<HashSet<u32>>,
    pub allowed_names: Option<HashSet<String>>,
    pub blocked_ids: HashSet<u32>,
    pub blocked_names: HashSet<String>,
}

impl RouteFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allows(&self, route: &Route) -> bool {
        if let Some(allowed) = &self.allowed_ids {
            if !allowed.contains(&route.id) {
                return false;
            }
        }
        if let Some(allowed) = &self.allowed_names {
            if !allowed.contains(route.name.as_ref()) {
                return false;
            }
        }
        if self.blocked_ids.contains(&route.id) {
            return false;
        }
        if self.blocked_names.contains(route.name.as_ref()) {
            return false;
        }
        true
    }
}
