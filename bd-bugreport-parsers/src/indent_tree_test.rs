// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use super::*;
use pretty_assertions::assert_eq;

fn texts(nodes: &[TreeNode]) -> Vec<&str> {
  nodes.iter().map(TreeNode::text).collect()
}

#[test]
fn nested_children() {
  let tree = IndentTree::parse(&["A", "  B", "    C", "  D"]);

  assert_eq!(vec!["A"], texts(tree.roots()));
  let a = &tree.roots()[0];
  assert_eq!(vec!["B", "D"], texts(a.children()));
  assert_eq!(vec!["C"], texts(a.children()[0].children()));
  assert!(a.children()[1].children().is_empty());
  assert_eq!(2, a.children()[0].depth());
  assert_eq!(4, a.children()[0].children()[0].depth());
}

#[test]
fn forest_of_roots() {
  let tree = IndentTree::parse(&["first:", "  one", "second:", "  two", "  three"]);

  assert_eq!(vec!["first:", "second:"], texts(tree.roots()));
  assert_eq!(vec!["two", "three"], texts(tree.roots()[1].children()));
}

#[test]
fn blank_lines_are_ignored() {
  let tree = IndentTree::parse(&["A", "", "   ", "  B", "", "C"]);

  assert_eq!(vec!["A", "C"], texts(tree.roots()));
  assert_eq!(vec!["B"], texts(tree.roots()[0].children()));
}

#[test]
fn dedent_to_intermediate_level() {
  // "D" is shallower than "C" but deeper than "B", so it still belongs to "B".
  let tree = IndentTree::parse(&["A", "  B", "      C", "    D", "E"]);

  let b = &tree.roots()[0].children()[0];
  assert_eq!(vec!["C", "D"], texts(b.children()));
  assert_eq!(vec!["A", "E"], texts(tree.roots()));
}

#[test]
fn indented_first_line() {
  let tree = IndentTree::parse(&["    deep", "shallow", "  child"]);

  assert_eq!(vec!["deep", "shallow"], texts(tree.roots()));
  assert_eq!(vec!["child"], texts(tree.roots()[1].children()));
}

#[test]
fn tabs_count_as_whitespace() {
  let tree = IndentTree::parse(&["A", "\tB", "\t\tC"]);

  let b = tree.roots()[0].child(0).unwrap();
  assert_eq!("B", b.text());
  assert_eq!(Some("C"), b.child(0).map(TreeNode::text));
}

#[test]
fn find_searches_whole_forest_pre_order() {
  let tree = IndentTree::parse(&["A", "  target", "B", "  C", "    target"]);

  let found = tree.find(|text| text == "target").unwrap();
  assert_eq!(2, found.depth());

  let nested = tree.find(|text| text.starts_with('C')).unwrap();
  assert_eq!(vec!["target"], texts(nested.children()));

  assert!(tree.find_text("missing").is_none());
  assert!(tree.find_text("B").is_some());
}

#[test]
fn empty_input() {
  let lines: [&str; 0] = [];
  let tree = IndentTree::parse(&lines);
  assert!(tree.is_empty());
  assert!(tree.find(|_| true).is_none());
}
