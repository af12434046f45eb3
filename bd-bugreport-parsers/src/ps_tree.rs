// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./ps_tree_test.rs"]
mod tests;

use crate::diagnostics::{DiagnosticSink, Severity};
use crate::ps::ProcessRecord;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

//
// Parent
//

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Parent {
  /// The synthetic root adopting every record whose parent is unknown.
  Root,
  Process(u32),
}

#[derive(Debug)]
struct Node {
  record: ProcessRecord,
  parent: Parent,
  children: Vec<u32>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
  New,
  Active,
  Done,
}

//
// ProcessHierarchy
//

/// A single tree over the process records, rooted at a synthetic node. Records are kept in scan
/// order and children are listed in scan order.
#[derive(Debug, Default)]
pub struct ProcessHierarchy {
  nodes: Vec<Node>,
  index: HashMap<u32, usize>,
  root_children: Vec<u32>,
}

impl ProcessHierarchy {
  /// Links every record to the record named by its `ppid`, or to the synthetic root when that
  /// parent is not in the set. Parent cycles are broken at the member seen first, which is moved
  /// under the root.
  pub fn build(records: Vec<ProcessRecord>, sink: &dyn DiagnosticSink) -> Self {
    let mut nodes: Vec<Node> = Vec::with_capacity(records.len());
    let mut index = HashMap::with_capacity(records.len());
    for record in records {
      let pid = record.pid;
      let node = Node {
        record,
        parent: Parent::Root,
        children: Vec::new(),
      };
      if let Some(&position) = index.get(&pid) {
        log::debug!("duplicate pid {pid} in hierarchy input, keeping the later record");
        nodes[position] = node;
      } else {
        index.insert(pid, nodes.len());
        nodes.push(node);
      }
    }

    let mut parents: Vec<Option<usize>> = nodes
      .iter()
      .map(|node| {
        node
          .record
          .ppid
          .and_then(|ppid| index.get(&ppid).copied())
      })
      .collect();
    break_cycles(&nodes, &mut parents, sink);

    let mut root_children = Vec::new();
    for (position, parent) in parents.into_iter().enumerate() {
      let pid = nodes[position].record.pid;
      match parent {
        Some(parent) => {
          nodes[position].parent = Parent::Process(nodes[parent].record.pid);
          nodes[parent].children.push(pid);
        },
        None => root_children.push(pid),
      }
    }

    Self {
      nodes,
      index,
      root_children,
    }
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  #[must_use]
  pub fn get(&self, pid: u32) -> Option<&ProcessRecord> {
    self.node(pid).map(|node| &node.record)
  }

  #[must_use]
  pub fn parent(&self, pid: u32) -> Option<Parent> {
    self.node(pid).map(|node| node.parent)
  }

  /// Children of `pid`. Empty for leaves and unknown pids.
  #[must_use]
  pub fn children(&self, pid: u32) -> &[u32] {
    self.node(pid).map_or(&[], |node| &node.children)
  }

  /// Children of the synthetic root.
  #[must_use]
  pub fn root_children(&self) -> &[u32] {
    &self.root_children
  }

  /// All records in scan order.
  pub fn iter(&self) -> impl Iterator<Item = &ProcessRecord> {
    self.nodes.iter().map(|node| &node.record)
  }

  /// Depth first, pre-order traversal from the synthetic root. Root children have depth 0.
  #[must_use]
  pub fn walk(&self) -> Walk<'_> {
    Walk {
      hierarchy: self,
      stack: self.root_children.iter().rev().map(|pid| (0, *pid)).collect(),
    }
  }

  fn node(&self, pid: u32) -> Option<&Node> {
    self.index.get(&pid).map(|position| &self.nodes[*position])
  }
}

// Walks each parent chain once. Reaching a node that is still on the current path means the path
// loops back on itself.
fn break_cycles(nodes: &[Node], parents: &mut [Option<usize>], sink: &dyn DiagnosticSink) {
  let mut state = vec![Visit::New; nodes.len()];
  let mut path: Vec<usize> = Vec::new();

  for start in 0 .. nodes.len() {
    let mut current = Some(start);
    while let Some(position) = current {
      match state[position] {
        Visit::Done => break,
        Visit::Active => {
          let cycle_start = path.iter().position(|p| *p == position).unwrap_or_default();
          if let Some(&first) = path[cycle_start ..].iter().min() {
            sink.report(
              Severity::DETAIL,
              &format!(
                "Parent cycle through pid {}, attaching it to the root",
                nodes[first].record.pid
              ),
            );
            parents[first] = None;
          }
          break;
        },
        Visit::New => {
          state[position] = Visit::Active;
          path.push(position);
          current = parents[position];
        },
      }
    }

    for position in path.drain(..) {
      state[position] = Visit::Done;
    }
  }
}

//
// Walk
//

pub struct Walk<'a> {
  hierarchy: &'a ProcessHierarchy,
  stack: Vec<(usize, u32)>,
}

impl<'a> Iterator for Walk<'a> {
  type Item = (usize, &'a ProcessRecord);

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      let (depth, pid) = self.stack.pop()?;
      let Some(node) = self.hierarchy.node(pid) else {
        continue;
      };
      self
        .stack
        .extend(node.children.iter().rev().map(|child| (depth + 1, *child)));
      return Some((depth, &node.record));
    }
  }
}

//
// Serialization
//

// Serializes as a nested list starting at the root's children.
impl Serialize for ProcessHierarchy {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    Subtrees {
      hierarchy: self,
      pids: &self.root_children,
    }
    .serialize(serializer)
  }
}

struct Subtrees<'a> {
  hierarchy: &'a ProcessHierarchy,
  pids: &'a [u32],
}

impl Serialize for Subtrees<'_> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(self.pids.iter().filter_map(|pid| self.hierarchy.node(*pid)).map(
      |node| Subtree {
        hierarchy: self.hierarchy,
        node,
      },
    ))
  }
}

struct Subtree<'a> {
  hierarchy: &'a ProcessHierarchy,
  node: &'a Node,
}

impl Serialize for Subtree<'_> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("Process", 2)?;
    state.serialize_field("process", &self.node.record)?;
    state.serialize_field(
      "children",
      &Subtrees {
        hierarchy: self.hierarchy,
        pids: &self.node.children,
      },
    )?;
    state.end()
  }
}
