//! Parse trees produced by the LL(1) driver.

use crate::{grammar::Symbol, util::display_fn};
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeID(usize);
impl fmt::Debug for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N#{:03}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ParseTreeNode {
    symbol: Symbol,
    parent: Option<NodeID>,
    children: Vec<NodeID>,
}

impl ParseTreeNode {
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// The enclosing node, or `None` for the root.
    pub fn parent(&self) -> Option<NodeID> {
        self.parent
    }

    pub fn children(&self) -> &[NodeID] {
        &self.children[..]
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A parse tree stored as a flat arena of nodes linked by index.
#[derive(Debug, Clone)]
pub struct ParseTree {
    nodes: Vec<ParseTreeNode>,
    root: NodeID,
}

impl ParseTree {
    pub fn root(&self) -> NodeID {
        self.root
    }

    pub fn node(&self, id: NodeID) -> &ParseTreeNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeID, &ParseTreeNode)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeID(i), n))
    }

    /// The symbols of the leaf nodes, from left to right.
    pub fn leaves(&self) -> Vec<&Symbol> {
        let mut leaves = vec![];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.is_leaf() {
                leaves.push(&node.symbol);
            }
            stack.extend(node.children.iter().rev());
        }
        leaves
    }

    pub fn display(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            let mut stack = vec![(self.root, 0)];
            while let Some((id, depth)) = stack.pop() {
                let node = self.node(id);
                writeln!(f, "{:indent$}{}", "", node.symbol, indent = depth * 2)?;
                stack.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
            }
            Ok(())
        })
    }
}

/// Incremental construction of a `ParseTree` with a cursor.
///
/// The root is created up front and the cursor starts on it, so every
/// builder finishes into a well-formed tree.
#[derive(Debug)]
pub(crate) struct ParseTreeBuilder {
    nodes: Vec<ParseTreeNode>,
    cursor: NodeID,
}

impl ParseTreeBuilder {
    pub(crate) fn new(root: Symbol) -> Self {
        Self {
            nodes: vec![ParseTreeNode {
                symbol: root,
                parent: None,
                children: vec![],
            }],
            cursor: NodeID(0),
        }
    }

    /// Attach a new node under the cursor.
    pub(crate) fn attach(&mut self, symbol: Symbol) -> NodeID {
        let id = NodeID(self.nodes.len());
        self.nodes.push(ParseTreeNode {
            symbol,
            parent: Some(self.cursor),
            children: vec![],
        });
        self.nodes[self.cursor.0].children.push(id);
        id
    }

    /// Attach a new node under the cursor and move the cursor into it.
    pub(crate) fn descend(&mut self, symbol: Symbol) -> NodeID {
        let id = self.attach(symbol);
        self.cursor = id;
        id
    }

    /// Move the cursor to the parent of the current node. The root has no parent.
    pub(crate) fn ascend(&mut self) {
        if let Some(parent) = self.nodes[self.cursor.0].parent {
            self.cursor = parent;
        }
    }

    pub(crate) fn finish(self) -> ParseTree {
        ParseTree {
            nodes: self.nodes,
            root: NodeID(0),
        }
    }
}
