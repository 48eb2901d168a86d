// Copyright 2026 The plexec Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The command resource arbiter (spec §4.3), grounded on
//! `examples/original_source/src/intfc/ResourceArbiterInterface.cc`: expand
//! each requested resource into its transitive child claims, try the whole
//! batch against a tentative ledger, and keep the arbiter's ledger in sync
//! with which commands are actually executing.

pub mod hierarchy;

pub use hierarchy::ResourceHierarchy;

use crate::node::{NodeId, ResourceValue};
use std::collections::HashMap;

const EPSILON: f64 = 1e-9;

pub struct CommandRequest<'a> {
    pub command: NodeId,
    pub resources: &'a [ResourceValue],
    /// Original insertion order, used as the tiebreak within a priority
    /// band so arbitration stays deterministic (spec §4.3 ordering
    /// guarantee); see SPEC_FULL.md §4.10.
    pub sequence: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ArbitrationOutcome {
    pub accepted: Vec<NodeId>,
    pub rejected: Vec<NodeId>,
}

struct Reservation {
    name: String,
    amount: f64,
    release_on_termination: bool,
}

pub struct ResourceArbiter {
    hierarchy: ResourceHierarchy,
    ledger: HashMap<String, f64>,
    /// Resources referenced at runtime but absent from the hierarchy file
    /// default to `max_consumable = 1.0` (spec §4.3 failure semantics).
    unknown_resource_max: HashMap<String, f64>,
    reservations: HashMap<NodeId, Vec<Reservation>>,
}

impl ResourceArbiter {
    pub fn new(hierarchy: ResourceHierarchy) -> Self {
        ResourceArbiter {
            hierarchy,
            ledger: HashMap::new(),
            unknown_resource_max: HashMap::new(),
            reservations: HashMap::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(ResourceHierarchy::empty())
    }

    fn max_consumable(&mut self, name: &str) -> f64 {
        if let Some(n) = self.hierarchy.get(name) {
            n.max_consumable
        } else {
            *self.unknown_resource_max.entry(name.to_owned()).or_insert(1.0)
        }
    }

    fn expand(&self, name: &str, amount: f64, out: &mut Vec<(String, f64)>) {
        out.push((name.to_owned(), amount));
        if let Some(node) = self.hierarchy.get(name) {
            for child in node.children.clone() {
                self.expand(&child.name, amount * child.weight, out);
            }
        }
    }

    pub fn ledger_value(&self, name: &str) -> f64 {
        *self.ledger.get(name).unwrap_or(&0.0)
    }

    /// Partition `requests` into accepted/rejected by priority, expanding
    /// each through the resource hierarchy and checking worst-case
    /// feasibility against a tentative ledger (spec §4.3).
    pub fn arbitrate(&mut self, requests: &[CommandRequest<'_>]) -> ArbitrationOutcome {
        let mut outcome = ArbitrationOutcome::default();
        let mut with_resources: Vec<&CommandRequest<'_>> = Vec::new();
        for req in requests {
            if req.resources.is_empty() {
                outcome.accepted.push(req.command);
            } else {
                with_resources.push(req);
            }
        }
        with_resources.sort_by(|a, b| {
            a.resources[0]
                .priority
                .cmp(&b.resources[0].priority)
                .then(a.sequence.cmp(&b.sequence))
        });

        for req in with_resources {
            let mut claims = Vec::new();
            for rv in req.resources {
                self.expand(&rv.name, rv.upper_bound, &mut claims);
            }

            // Consumable and renewable usage are tracked as two independent
            // running subtotals per resource (spec §4.3 step 2), matching
            // `ResourceArbiterInterface.cc`'s separate `totalConsResMap`/
            // `totalRenewResMap`: a positive claim and a negative (renewable)
            // claim on the same resource must each stay within bounds on
            // their own, not net to zero and slip past the check together.
            let mut merged_consumable: HashMap<String, f64> = HashMap::new();
            let mut merged_renewable: HashMap<String, f64> = HashMap::new();
            for (name, amount) in &claims {
                if *amount < 0.0 {
                    *merged_renewable.entry(name.clone()).or_insert(0.0) += amount;
                } else {
                    *merged_consumable.entry(name.clone()).or_insert(0.0) += amount;
                }
            }

            let mut touched: Vec<String> = merged_consumable
                .keys()
                .chain(merged_renewable.keys())
                .cloned()
                .collect();
            touched.sort();
            touched.dedup();

            let mut feasible = true;
            for name in &touched {
                let base = self.ledger_value(name);
                let consumable_total = base + merged_consumable.get(name).copied().unwrap_or(0.0);
                let renewable_total = base + merged_renewable.get(name).copied().unwrap_or(0.0);
                let max = self.max_consumable(name);
                if consumable_total < -EPSILON || consumable_total > max + EPSILON {
                    feasible = false;
                    break;
                }
                if renewable_total < -EPSILON || renewable_total > max + EPSILON {
                    feasible = false;
                    break;
                }
            }

            if feasible {
                let mut net: HashMap<String, f64> = HashMap::new();
                for name in &touched {
                    let total = merged_consumable.get(name).copied().unwrap_or(0.0)
                        + merged_renewable.get(name).copied().unwrap_or(0.0);
                    net.insert(name.clone(), total);
                    *self.ledger.entry(name.clone()).or_insert(0.0) += total;
                }
                let reservations = net
                    .into_iter()
                    .map(|(name, amount)| {
                        let release_on_termination = req
                            .resources
                            .iter()
                            .find(|r| r.name == name)
                            .map(|r| r.release_on_termination)
                            .unwrap_or(true);
                        Reservation {
                            name,
                            amount,
                            release_on_termination,
                        }
                    })
                    .collect();
                self.reservations.insert(req.command, reservations);
                outcome.accepted.push(req.command);
            } else {
                outcome.rejected.push(req.command);
            }
        }
        outcome
    }

    /// Subtract every `release_on_termination` claim of `command` from the
    /// ledger; claims with the flag unset stay reserved forever (spec §3
    /// invariant list), but the command is always dropped from tracking.
    pub fn release(&mut self, command: NodeId) {
        let Some(claims) = self.reservations.remove(&command) else {
            return;
        };
        for claim in claims {
            if !claim.release_on_termination {
                continue;
            }
            if let Some(entry) = self.ledger.get_mut(&claim.name) {
                *entry -= claim.amount;
                if entry.abs() < EPSILON {
                    self.ledger.remove(&claim.name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;

    fn nid(i: u32) -> NodeId {
        NodeId::for_test(i)
    }

    #[test]
    fn empty_requests_leave_ledger_unchanged() {
        let mut arb = ResourceArbiter::empty();
        let outcome = arb.arbitrate(&[]);
        assert!(outcome.accepted.is_empty());
        assert!(outcome.rejected.is_empty());
        assert_eq!(arb.ledger_value("anything"), 0.0);
    }

    #[test]
    fn command_without_resources_is_always_accepted() {
        let mut arb = ResourceArbiter::empty();
        let req = CommandRequest {
            command: nid(1),
            resources: &[],
            sequence: 0,
        };
        let outcome = arb.arbitrate(&[req]);
        assert_eq!(outcome.accepted, vec![nid(1)]);
    }

    #[test]
    fn priority_denies_the_loser() {
        let hierarchy = ResourceHierarchy::parse("armA 1.0\n").unwrap();
        let mut arb = ResourceArbiter::new(hierarchy);
        let high = ResourceValue::new("armA", 10);
        let low = ResourceValue::new("armA", 20);
        let reqs = [
            CommandRequest {
                command: nid(1),
                resources: std::slice::from_ref(&high),
                sequence: 0,
            },
            CommandRequest {
                command: nid(2),
                resources: std::slice::from_ref(&low),
                sequence: 1,
            },
        ];
        let outcome = arb.arbitrate(&reqs);
        assert_eq!(outcome.accepted, vec![nid(1)]);
        assert_eq!(outcome.rejected, vec![nid(2)]);
    }

    #[test]
    fn bound_equal_to_max_consumable_succeeds_alone_but_blocks_a_second() {
        let hierarchy = ResourceHierarchy::parse("armA 1.0\n").unwrap();
        let mut arb = ResourceArbiter::new(hierarchy);
        let rv = ResourceValue::new("armA", 1);
        let outcome = arb.arbitrate(&[CommandRequest {
            command: nid(1),
            resources: std::slice::from_ref(&rv),
            sequence: 0,
        }]);
        assert_eq!(outcome.accepted, vec![nid(1)]);

        let rv2 = ResourceValue::new("armA", 1);
        let outcome2 = arb.arbitrate(&[CommandRequest {
            command: nid(2),
            resources: std::slice::from_ref(&rv2),
            sequence: 1,
        }]);
        assert_eq!(outcome2.rejected, vec![nid(2)]);
    }

    #[test]
    fn hierarchical_resource_reserves_through_children() {
        let hierarchy = ResourceHierarchy::parse("bus 2.0 1.0 armA 1.0 armB\n").unwrap();
        let mut arb = ResourceArbiter::new(hierarchy);
        let bus_req = ResourceValue::new("bus", 1);
        arb.arbitrate(&[CommandRequest {
            command: nid(1),
            resources: std::slice::from_ref(&bus_req),
            sequence: 0,
        }]);
        assert_eq!(arb.ledger_value("bus"), 1.0);
        assert_eq!(arb.ledger_value("armA"), 1.0);
        assert_eq!(arb.ledger_value("armB"), 1.0);

        let arm_req = ResourceValue::new("armA", 1);
        let outcome = arb.arbitrate(&[CommandRequest {
            command: nid(2),
            resources: std::slice::from_ref(&arm_req),
            sequence: 1,
        }]);
        assert_eq!(outcome.rejected, vec![nid(2)], "armA already fully reserved via bus");
    }

    #[test]
    fn release_restores_capacity_for_flagged_claims_only() {
        let hierarchy = ResourceHierarchy::parse("armA 1.0\n").unwrap();
        let mut arb = ResourceArbiter::new(hierarchy);
        let held = ResourceValue {
            release_on_termination: false,
            ..ResourceValue::new("armA", 1)
        };
        arb.arbitrate(&[CommandRequest {
            command: nid(1),
            resources: std::slice::from_ref(&held),
            sequence: 0,
        }]);
        arb.release(nid(1));
        assert_eq!(arb.ledger_value("armA"), 1.0, "release=false claim stays reserved");
    }
}
