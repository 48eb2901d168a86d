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

//! Backing storage for variable and lookup leaf expressions.

use crate::value::Value;
use std::collections::HashMap;

/// Named plan variables written by `executeAssignment`/`retractAssignment`.
#[derive(Default)]
pub struct VariableStore {
    values: HashMap<String, Option<Value>>,
    /// Value to restore on `retract`, pushed by `set` when a variable
    /// already held one (spec §6: retract restores the prior value).
    saved: HashMap<String, Vec<Option<Value>>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure(&mut self, name: &str) {
        self.values.entry(name.to_owned()).or_insert(None);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned().flatten()
    }

    pub fn set(&mut self, name: &str, value: Value) {
        let prior = self.values.insert(name.to_owned(), Some(value));
        self.saved.entry(name.to_owned()).or_default().push(prior.unwrap_or(None));
    }

    pub fn clear(&mut self, name: &str) {
        let restored = self.saved.get_mut(name).and_then(|stack| stack.pop()).flatten();
        self.values.insert(name.to_owned(), restored);
    }
}

/// External state pulled through `(name, args)` queries (spec §6 Lookup).
#[derive(Default)]
pub struct StateCache {
    values: HashMap<(String, Vec<Value>), Option<Value>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure(&mut self, name: String, args: Vec<Value>) {
        self.values.entry((name, args)).or_insert(None);
    }

    pub fn get(&self, name: &str, args: &[Value]) -> Option<Value> {
        self.values
            .get(&(name.to_owned(), args.to_vec()))
            .cloned()
            .flatten()
    }

    pub fn set(&mut self, name: &str, args: &[Value], value: Value) {
        self.values
            .insert((name.to_owned(), args.to_vec()), Some(value));
    }
}
