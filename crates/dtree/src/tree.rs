use std::collections::BTreeMap;
use std::fmt;

use crate::title::Title;

/// Which side of a decision an edge belongs to. `False` carries the
/// colors for which the tested fix does not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    False,
    True,
}

impl Branch {
    pub fn bit(self) -> u8 {
        match self {
            Branch::False => 0,
            Branch::True => 1,
        }
    }

    pub fn is_true(self) -> bool {
        self == Branch::True
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::False => write!(f, "false"),
            Branch::True => write!(f, "true"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Decision,
}

/// Tree node as handed to the graph-rendering layer.
///
/// Ids are 1-based and contiguous, assigned in post-order of the
/// parse, so the root always carries the highest id.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: u32,
    pub kind: NodeKind,
    pub label: String,
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEdge {
    pub from: u32,
    pub to: u32,
    pub branch: Branch,
    /// Color count the producer assigned to this branch.
    pub weight: u64,
}

/// Complete result of decoding one tree message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTree {
    pub nodes: Vec<TreeNode>,
    pub edges: Vec<TreeEdge>,
    /// Total color count per driver-set label, accumulated over all
    /// leaves that realize the label.
    pub partition: BTreeMap<String, u64>,
    /// Normalized separation score, `>= 0`.
    pub entropy: f64,
}

impl DecodedTree {
    /// The root is the last node appended, i.e. the highest id.
    pub fn root_id(&self) -> u32 {
        self.nodes.len() as u32
    }

    pub fn node(&self, id: u32) -> Option<&TreeNode> {
        id.checked_sub(1).and_then(|i| self.nodes.get(i as usize))
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Leaf)
            .count()
    }

    pub fn decision_count(&self) -> usize {
        self.nodes.len() - self.leaf_count()
    }
}
