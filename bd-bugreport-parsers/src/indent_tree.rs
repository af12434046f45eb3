// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./indent_tree_test.rs"]
mod tests;

//
// TreeNode
//

/// One non-blank line of an indented dump together with the lines nested beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
  text: String,
  depth: usize,
  children: Vec<TreeNode>,
}

impl TreeNode {
  fn new(text: &str, depth: usize) -> Self {
    Self {
      text: text.trim().to_owned(),
      depth,
      children: Vec::new(),
    }
  }

  /// The line content without its indentation.
  #[must_use]
  pub fn text(&self) -> &str {
    &self.text
  }

  /// Leading whitespace count of the source line.
  #[must_use]
  pub fn depth(&self) -> usize {
    self.depth
  }

  #[must_use]
  pub fn children(&self) -> &[TreeNode] {
    &self.children
  }

  #[must_use]
  pub fn child(&self, index: usize) -> Option<&TreeNode> {
    self.children.get(index)
  }

  fn find<P: Fn(&str) -> bool>(&self, predicate: &P) -> Option<&TreeNode> {
    if predicate(&self.text) {
      return Some(self);
    }
    self.children.iter().find_map(|child| child.find(predicate))
  }
}

//
// IndentTree
//

/// A forest built from indentation. A line becomes a child of the closest preceding line with
/// strictly smaller indentation; lines with no such predecessor are roots. Blank lines are
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndentTree {
  roots: Vec<TreeNode>,
}

impl IndentTree {
  pub fn parse<L: AsRef<str>>(lines: &[L]) -> Self {
    let mut roots = Vec::new();
    // Each entry is the open node at its level. A node is attached to its parent when it is
    // popped, at which point all of its own children have already been attached.
    let mut open: Vec<TreeNode> = Vec::new();

    for line in lines {
      let line = line.as_ref();
      if line.trim().is_empty() {
        continue;
      }

      let depth = line.chars().take_while(|c| c.is_whitespace()).count();
      while open.last().is_some_and(|top| top.depth >= depth) {
        close_top(&mut open, &mut roots);
      }
      open.push(TreeNode::new(line, depth));
    }

    while !open.is_empty() {
      close_top(&mut open, &mut roots);
    }

    Self { roots }
  }

  #[must_use]
  pub fn roots(&self) -> &[TreeNode] {
    &self.roots
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.roots.is_empty()
  }

  /// Depth first, pre-order search over the whole forest.
  pub fn find<P: Fn(&str) -> bool>(&self, predicate: P) -> Option<&TreeNode> {
    self.roots.iter().find_map(|root| root.find(&predicate))
  }

  /// Shorthand for finding the first node whose text equals `text`.
  #[must_use]
  pub fn find_text(&self, text: &str) -> Option<&TreeNode> {
    self.find(|candidate| candidate == text)
  }
}

fn close_top(open: &mut Vec<TreeNode>, roots: &mut Vec<TreeNode>) {
  let Some(node) = open.pop() else {
    return;
  };
  match open.last_mut() {
    Some(parent) => parent.children.push(node),
    None => roots.push(node),
  }
}
