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

//! Parser for the resource hierarchy file (spec §6): line-oriented text,
//! `%` comments, one entry per line:
//! `<parent-name> <max-consumable> [<weight> <child-name>]*`.

use crate::error::ExecError;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ChildResource {
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub name: String,
    pub max_consumable: f64,
    pub children: Vec<ChildResource>,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceHierarchy {
    pub(crate) nodes: HashMap<String, ResourceNode>,
}

impl ResourceHierarchy {
    pub fn empty() -> Self {
        ResourceHierarchy::default()
    }

    pub fn parse(text: &str) -> Result<Self, ExecError> {
        let mut nodes = HashMap::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 2 || tokens.len() % 2 != 0 {
                return Err(ExecError::Configuration(format!(
                    "resource hierarchy line {}: malformed entry '{raw}'",
                    lineno + 1
                )));
            }
            let parent = tokens[0].to_owned();
            let max_consumable: f64 = tokens[1].parse().map_err(|_| {
                ExecError::Configuration(format!(
                    "resource hierarchy line {}: max-consumable '{}' is not a number",
                    lineno + 1,
                    tokens[1]
                ))
            })?;
            let mut children = Vec::new();
            let mut i = 2;
            while i + 1 < tokens.len() {
                let weight: f64 = tokens[i].parse().map_err(|_| {
                    ExecError::Configuration(format!(
                        "resource hierarchy line {}: weight '{}' is not a number",
                        lineno + 1,
                        tokens[i]
                    ))
                })?;
                let child_name = tokens[i + 1].to_owned();
                children.push(ChildResource {
                    name: child_name,
                    weight,
                });
                i += 2;
            }
            if nodes
                .insert(
                    parent.clone(),
                    ResourceNode {
                        name: parent.clone(),
                        max_consumable,
                        children,
                    },
                )
                .is_some()
            {
                return Err(ExecError::Configuration(format!(
                    "resource hierarchy line {}: duplicate parent name '{parent}'",
                    lineno + 1
                )));
            }
        }
        Ok(ResourceHierarchy { nodes })
    }

    pub fn get(&self, name: &str) -> Option<&ResourceNode> {
        self.nodes.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_entry() {
        let h = ResourceHierarchy::parse("armA 1.0\n").unwrap();
        assert_eq!(h.get("armA").unwrap().max_consumable, 1.0);
        assert!(h.get("armA").unwrap().children.is_empty());
    }

    #[test]
    fn parses_hierarchical_entry_and_skips_comments() {
        let text = "% comment\nbus 2.0 1.0 armA 1.0 armB\n";
        let h = ResourceHierarchy::parse(text).unwrap();
        let bus = h.get("bus").unwrap();
        assert_eq!(bus.max_consumable, 2.0);
        assert_eq!(bus.children.len(), 2);
        assert_eq!(bus.children[0].name, "armA");
        assert_eq!(bus.children[1].name, "armB");
    }

    #[test]
    fn duplicate_parent_is_an_error() {
        let text = "armA 1.0\narmA 2.0\n";
        assert!(ResourceHierarchy::parse(text).is_err());
    }

    #[test]
    fn malformed_line_is_an_error() {
        assert!(ResourceHierarchy::parse("armA notanumber\n").is_err());
    }
}
