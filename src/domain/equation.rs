// ============================================================
// Layer 3 - Equation Representation
// ============================================================
// Equations arrive either as a flat token sequence (infix,
// postfix or prefix notation) or as a nested tree where a
// group is an ordered list of symbols and sub-groups
// (multi-way tree mode).
//
// Both shapes are one tagged type, Equation<T>, and every
// operation that touches the symbols goes through the single
// recursive traversal `map_leaves`. The indexer uses it to turn
// Equation<String> into Equation<usize> without caring which
// shape it was given.
//
// Reference: Rust Book §6 (Enums), §8 (Vectors)

use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// The notation an equation is converted to before indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixType {
    Infix,
    Postfix,
    Prefix,
    MultiWayTree,
}

impl FixType {
    pub fn is_tree(self) -> bool {
        matches!(self, FixType::MultiWayTree)
    }
}

impl FromStr for FixType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "infix" => Ok(Self::Infix),
            "postfix" => Ok(Self::Postfix),
            "prefix" => Ok(Self::Prefix),
            "multi_way_tree" | "multiway_tree" => Ok(Self::MultiWayTree),
            other => bail!(
                "unsupported equation format '{other}' \
                 (expected infix, postfix, prefix or multi_way_tree)"
            ),
        }
    }
}

/// One element of a tree equation: a symbol or a nested group.
///
/// Untagged so JSON can write `["+", "NUM_0", ["*", "NUM_1", "2"]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EquationNode<T> {
    Leaf(T),
    Group(Vec<EquationNode<T>>),
}

impl<T> EquationNode<T> {
    fn map<U, F: FnMut(&T) -> U>(&self, f: &mut F) -> EquationNode<U> {
        match self {
            EquationNode::Leaf(leaf) => EquationNode::Leaf(f(leaf)),
            EquationNode::Group(children) => {
                EquationNode::Group(children.iter().map(|c| c.map(&mut *f)).collect())
            }
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            EquationNode::Leaf(leaf) => out.push(leaf),
            EquationNode::Group(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

/// An equation in either flat or tree form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Equation<T> {
    Flat(Vec<T>),
    Tree(Vec<EquationNode<T>>),
}

impl<T> Equation<T> {
    /// Apply `f` to every symbol, keeping the shape (and nesting depth).
    pub fn map_leaves<U, F: FnMut(&T) -> U>(&self, mut f: F) -> Equation<U> {
        match self {
            Equation::Flat(symbols) => Equation::Flat(symbols.iter().map(&mut f).collect()),
            Equation::Tree(nodes) => Equation::Tree(nodes.iter().map(|n| n.map(&mut f)).collect()),
        }
    }

    /// All symbols in reading order, ignoring nesting.
    pub fn leaves(&self) -> Vec<&T> {
        match self {
            Equation::Flat(symbols) => symbols.iter().collect(),
            Equation::Tree(nodes) => {
                let mut out = Vec::new();
                for node in nodes {
                    node.collect_leaves(&mut out);
                }
                out
            }
        }
    }

    /// Number of top-level elements (the length used for padding).
    pub fn len(&self) -> usize {
        match self {
            Equation::Flat(symbols) => symbols.len(),
            Equation::Tree(nodes) => nodes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The flat sequence, if this is a flat equation.
    pub fn as_flat(&self) -> Option<&[T]> {
        match self {
            Equation::Flat(symbols) => Some(symbols),
            Equation::Tree(_) => None,
        }
    }

    /// Append a symbol at the top level.
    pub fn push(&mut self, symbol: T) {
        match self {
            Equation::Flat(symbols) => symbols.push(symbol),
            Equation::Tree(nodes) => nodes.push(EquationNode::Leaf(symbol)),
        }
    }
}

impl Equation<String> {
    /// Build the equation the dataloader works with from the raw
    /// (infix, possibly nested) problem equation.
    pub fn from_nodes(nodes: &[EquationNode<String>], fix: FixType) -> Self {
        if fix.is_tree() {
            return Equation::Tree(nodes.to_vec());
        }
        let mut infix = Vec::new();
        for node in nodes {
            node.collect_leaves(&mut infix);
        }
        let infix: Vec<String> = infix.into_iter().cloned().collect();
        match fix {
            FixType::Postfix => Equation::Flat(infix_to_postfix(&infix)),
            FixType::Prefix => Equation::Flat(infix_to_prefix(&infix)),
            _ => Equation::Flat(infix),
        }
    }
}

// ─── Infix Conversion ─────────────────────────────────────────────────────────
// Shunting-yard. `^` binds tightest and is right-associative.

fn precedence(symbol: &str) -> Option<u8> {
    match symbol {
        "+" | "-" => Some(1),
        "*" | "/" => Some(2),
        "^" | "**" => Some(3),
        _ => None,
    }
}

fn is_right_assoc(symbol: &str) -> bool {
    matches!(symbol, "^" | "**")
}

fn is_open(symbol: &str) -> bool {
    matches!(symbol, "(" | "[")
}

fn is_close(symbol: &str) -> bool {
    matches!(symbol, ")" | "]")
}

/// Convert an infix token sequence to postfix. Brackets are dropped.
pub fn infix_to_postfix(infix: &[String]) -> Vec<String> {
    shunting_yard(infix.iter().map(String::as_str), false)
}

/// Convert an infix token sequence to prefix. Brackets are dropped.
pub fn infix_to_prefix(infix: &[String]) -> Vec<String> {
    // Scan right to left with brackets swapped, then reverse.
    let mirrored = infix.iter().rev().map(|t| match t.as_str() {
        "(" => ")",
        ")" => "(",
        "[" => "]",
        "]" => "[",
        other => other,
    });
    let mut out = shunting_yard(mirrored, true);
    out.reverse();
    out
}

fn shunting_yard<'a, I: Iterator<Item = &'a str>>(tokens: I, mirrored: bool) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut ops: Vec<&str> = Vec::new();

    for token in tokens {
        if is_open(token) {
            ops.push(token);
        } else if is_close(token) {
            while let Some(top) = ops.pop() {
                if is_open(top) {
                    break;
                }
                out.push(top.to_string());
            }
        } else if let Some(prec) = precedence(token) {
            while let Some(&top) = ops.last() {
                let Some(top_prec) = precedence(top) else { break };
                // Mirrored scanning flips which side of a tie pops.
                let pop_on_tie = if mirrored { is_right_assoc(token) } else { !is_right_assoc(token) };
                if top_prec > prec || (top_prec == prec && pop_on_tie) {
                    out.push(top.to_string());
                    ops.pop();
                } else {
                    break;
                }
            }
            ops.push(token);
        } else {
            out.push(token.to_string());
        }
    }
    while let Some(top) = ops.pop() {
        if !is_open(top) {
            out.push(top.to_string());
        }
    }
    out
}
