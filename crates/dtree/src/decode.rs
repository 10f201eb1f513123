use std::collections::BTreeMap;

use crate::driver_set::{DriverSet, UnknownVariable};
use crate::entropy::partition_entropy;
use crate::title::{Span, Title, Tone};
use crate::tree::{Branch, DecodedTree, NodeKind, TreeEdge, TreeNode};

const LEAF_OPEN: &str = "[";
const LEAF_CLOSE: &str = "]";

/// The token stream does not conform to the tree grammar. This always
/// means a producer/consumer mismatch, never a transient condition, so
/// the whole decode is abandoned.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedTree {
    #[error("token stream ended before the tree was complete")]
    UnexpectedEnd,
    #[error("leaf opened at token {0} is never closed")]
    UnterminatedLeaf(usize),
    #[error("invalid assignment token '{0}'")]
    BadAssignment(String),
    #[error("expected a branch color count, found '{0}'")]
    BadBranchCount(String),
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("{0} unconsumed tokens after the root completed")]
    TrailingTokens(usize),
    #[error("{branch} branch claims {claimed} colors but its leaves hold {actual}")]
    BranchSumMismatch {
        branch: Branch,
        claimed: u64,
        actual: u64,
    },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed decision tree: {0}")]
    Malformed(#[from] MalformedTree),
    #[error(transparent)]
    UnknownVariable(#[from] UnknownVariable),
}

/// Decodes the prefix-encoded decision tree of one attractor.
///
/// Constructed over the model's ordered variable names (the fixed
/// label width); each `decode` call is independent and owns its
/// accumulators, so one decoder can serve any number of trees.
pub struct Decoder<'a> {
    var_names: &'a [String],
    check_branch_sums: bool,
}

impl<'a> Decoder<'a> {
    pub fn new(var_names: &'a [String]) -> Self {
        Self {
            var_names,
            check_branch_sums: false,
        }
    }

    /// Cross-check every decision's branch color counts against the
    /// leaves actually reached through that branch. Off by default:
    /// the counts are ground truth from the producer.
    pub fn check_branch_sums(mut self, check: bool) -> Self {
        self.check_branch_sums = check;
        self
    }

    /// Decode a tree message as extracted from the wire, tokenizing on
    /// spaces.
    pub fn decode_str(&self, tree: &str, total_colors: u64) -> Result<DecodedTree, DecodeError> {
        let tokens: Vec<&str> = tree.split_whitespace().collect();
        self.decode(&tokens, total_colors)
    }

    pub fn decode(&self, tokens: &[&str], total_colors: u64) -> Result<DecodedTree, DecodeError> {
        let mut acc = TreeAccum::default();
        let mut pos = 0;
        self.parse_subtree(tokens, &mut pos, total_colors, &mut acc)?;
        if pos < tokens.len() {
            return Err(MalformedTree::TrailingTokens(tokens.len() - pos).into());
        }

        // Leaves report the total color mass of their label, which is
        // only known once the whole tree is parsed.
        for node in &mut acc.nodes {
            if node.kind == NodeKind::Leaf {
                if let Some(count) = acc.partition.get(&node.label) {
                    node.title
                        .push_line(vec![Span::plain(format!("Total colors: {count}"))]);
                }
            }
        }

        let entropy = partition_entropy(&acc.partition, total_colors);
        Ok(DecodedTree {
            nodes: acc.nodes,
            edges: acc.edges,
            partition: acc.partition,
            entropy,
        })
    }

    /// One production of the recursive descent. `colors` is the color
    /// mass flowing into this subtree, not the attractor total.
    fn parse_subtree(
        &self,
        tokens: &[&str],
        pos: &mut usize,
        colors: u64,
        acc: &mut TreeAccum,
    ) -> Result<SubTree, DecodeError> {
        let token = *tokens.get(*pos).ok_or(MalformedTree::UnexpectedEnd)?;
        if token == LEAF_OPEN {
            return self.parse_leaf(tokens, pos, colors, acc);
        }
        if token == LEAF_CLOSE {
            return Err(MalformedTree::UnexpectedToken(token.into()).into());
        }
        *pos += 1;

        let (label, title) = parse_decision(token);
        let colors_false = parse_count(tokens, pos)?;
        let colors_true = parse_count(tokens, pos)?;

        let false_sub = self.parse_subtree(tokens, pos, colors_false, acc)?;
        let true_sub = self.parse_subtree(tokens, pos, colors_true, acc)?;

        if self.check_branch_sums {
            check_branch_sum(Branch::False, colors_false, false_sub.leaf_colors)?;
            check_branch_sum(Branch::True, colors_true, true_sub.leaf_colors)?;
        }

        // Both subtrees are complete, so the decision takes the next
        // id: one greater than everything below it.
        let id = acc.push_node(NodeKind::Decision, label, title);
        acc.edges.push(TreeEdge {
            from: id,
            to: false_sub.root,
            branch: Branch::False,
            weight: colors_false,
        });
        acc.edges.push(TreeEdge {
            from: id,
            to: true_sub.root,
            branch: Branch::True,
            weight: colors_true,
        });

        Ok(SubTree {
            root: id,
            leaf_colors: false_sub.leaf_colors + true_sub.leaf_colors,
        })
    }

    fn parse_leaf(
        &self,
        tokens: &[&str],
        pos: &mut usize,
        colors: u64,
        acc: &mut TreeAccum,
    ) -> Result<SubTree, DecodeError> {
        let opened_at = *pos;
        *pos += 1;

        let mut dset = DriverSet::new();
        loop {
            let token = *tokens
                .get(*pos)
                .ok_or(MalformedTree::UnterminatedLeaf(opened_at))?;
            *pos += 1;
            if token == LEAF_CLOSE {
                break;
            }
            let (name, value) = parse_assignment(token)?;
            dset.insert(name, value);
        }

        let label = dset.label(self.var_names)?;
        let title = leaf_title(&dset);
        let id = acc.push_node(NodeKind::Leaf, label.clone(), title);
        *acc.partition.entry(label).or_insert(0) += colors;

        Ok(SubTree {
            root: id,
            leaf_colors: colors,
        })
    }
}

struct SubTree {
    root: u32,
    leaf_colors: u64,
}

#[derive(Default)]
struct TreeAccum {
    nodes: Vec<TreeNode>,
    edges: Vec<TreeEdge>,
    partition: BTreeMap<String, u64>,
}

impl TreeAccum {
    fn push_node(&mut self, kind: NodeKind, label: String, title: Title) -> u32 {
        let id = self.nodes.len() as u32 + 1;
        self.nodes.push(TreeNode {
            id,
            kind,
            label,
            title,
        });
        id
    }
}

/// Parse one `name=value` leaf token.
pub fn parse_assignment(token: &str) -> Result<(String, bool), MalformedTree> {
    let bad = || MalformedTree::BadAssignment(token.to_string());
    let (name, value) = token.split_once('=').ok_or_else(bad)?;
    if name.is_empty() {
        return Err(bad());
    }
    let value = match value {
        "0" => false,
        "1" => true,
        _ => return Err(bad()),
    };
    Ok((name.to_string(), value))
}

fn parse_count(tokens: &[&str], pos: &mut usize) -> Result<u64, MalformedTree> {
    let token = *tokens.get(*pos).ok_or(MalformedTree::UnexpectedEnd)?;
    *pos += 1;
    token
        .parse::<u64>()
        .map_err(|_| MalformedTree::BadBranchCount(token.to_string()))
}

fn check_branch_sum(branch: Branch, claimed: u64, actual: u64) -> Result<(), MalformedTree> {
    if claimed == actual {
        Ok(())
    } else {
        Err(MalformedTree::BranchSumMismatch {
            branch,
            claimed,
            actual,
        })
    }
}

/// Two fixed variables per line, toned by their assigned value.
fn leaf_title(dset: &DriverSet) -> Title {
    let mut title = Title::default();
    let mut line = Vec::new();
    for (name, value) in dset.iter() {
        if !line.is_empty() {
            line.push(Span::plain(" "));
        }
        line.push(Span::toned(name, Tone::from_bit(value)));
        if line.len() >= 3 {
            title.push_line(std::mem::take(&mut line));
        }
    }
    if !line.is_empty() {
        title.push_line(line);
    }
    title
}

/// Split a compound decision token into its display title (one line
/// per conjoined test, negation kept, regulator references toned by
/// their sign bit) and its node label (the distinct parameter names,
/// negation stripped, in first-seen order).
fn parse_decision(token: &str) -> (String, Title) {
    let mut params: Vec<&str> = Vec::new();
    let mut title = Title::default();

    for test in token.split(';') {
        let (negated, body) = match test.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, test),
        };

        let mut line = Vec::new();
        if let Some((name, regs)) = body.split_once('(') {
            let regs = regs.strip_suffix(')').unwrap_or(regs);
            let neg = if negated { "!" } else { "" };
            line.push(Span::plain(format!("{neg}{name}(")));
            let mut first = true;
            for reg in regs.split(',') {
                let mut chars = reg.chars();
                let Some(sign) = chars.next() else { continue };
                if !first {
                    line.push(Span::plain(" "));
                }
                first = false;
                let tone = Tone::from_bit(sign == '1');
                line.push(Span::toned(chars.as_str(), tone));
            }
            line.push(Span::plain(")"));
            if !params.contains(&name) {
                params.push(name);
            }
        } else {
            line.push(Span::plain(test));
            if !params.contains(&body) {
                params.push(body);
            }
        }
        title.push_line(line);
    }

    (params.join("\n"), title)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn plain(text: &str) -> Span {
        Span::plain(text)
    }

    fn active(text: &str) -> Span {
        Span::toned(text, Tone::Active)
    }

    fn inactive(text: &str) -> Span {
        Span::toned(text, Tone::Inactive)
    }

    #[test]
    fn single_empty_leaf() {
        let vars = names(&[]);
        let tree = Decoder::new(&vars).decode(&["[", "]"], 4).unwrap();

        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].id, 1);
        assert_eq!(tree.nodes[0].kind, NodeKind::Leaf);
        assert_eq!(tree.nodes[0].label, "");
        assert!(tree.edges.is_empty());
        assert_eq!(tree.partition.get(""), Some(&4));
        assert_eq!(tree.entropy, 0.0);
        assert_eq!(tree.root_id(), 1);
    }

    #[test]
    fn one_decision_two_leaves() {
        let vars = names(&["x"]);
        let tokens = ["x", "2", "2", "[", "x=0", "]", "[", "x=1", "]"];
        let tree = Decoder::new(&vars).decode(&tokens, 4).unwrap();

        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.decision_count(), 1);
        assert_eq!(tree.edges.len(), 2);

        assert_eq!(tree.nodes[0].label, "0");
        assert_eq!(tree.nodes[1].label, "1");
        assert_eq!(tree.nodes[2].label, "x");
        assert_eq!(tree.root_id(), 3);

        assert_eq!(
            tree.edges[0],
            TreeEdge {
                from: 3,
                to: 1,
                branch: Branch::False,
                weight: 2
            }
        );
        assert_eq!(
            tree.edges[1],
            TreeEdge {
                from: 3,
                to: 2,
                branch: Branch::True,
                weight: 2
            }
        );

        assert_eq!(tree.partition.get("0"), Some(&2));
        assert_eq!(tree.partition.get("1"), Some(&2));
        assert_eq!(tree.entropy, 1.0);
    }

    #[test]
    fn nested_tree_assigns_postorder_ids() {
        let vars = names(&["a", "b"]);
        // p splits 4 into 3/1; its false branch is q splitting 3 into 2/1.
        let tokens = [
            "p", "3", "1", "q", "2", "1", "[", "a=0", "]", "[", "a=1", "]", "[", "b=1", "]",
        ];
        let tree = Decoder::new(&vars).decode(&tokens, 4).unwrap();

        assert_eq!(tree.nodes.len(), 5);
        assert_eq!(tree.edges.len(), 4);
        assert_eq!(tree.root_id(), 5);

        // Ids are contiguous from 1 and every edge points downward.
        for (i, node) in tree.nodes.iter().enumerate() {
            assert_eq!(node.id, i as u32 + 1);
        }
        for edge in &tree.edges {
            assert!(edge.to < edge.from);
        }

        assert_eq!(tree.partition.get("0-"), Some(&2));
        assert_eq!(tree.partition.get("1-"), Some(&1));
        assert_eq!(tree.partition.get("-1"), Some(&1));
        assert_eq!(tree.partition.values().sum::<u64>(), 4);

        let raw = 2.0 * 2.0f64.log2();
        let expected = -((raw / 4.0) - 4.0f64.log2());
        assert!((tree.entropy - expected).abs() < 1e-12);
    }

    #[test]
    fn duplicate_leaf_labels_accumulate() {
        let vars = names(&[]);
        let tokens = ["p", "2", "2", "[", "]", "[", "]"];
        let tree = Decoder::new(&vars).decode(&tokens, 4).unwrap();

        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.partition.len(), 1);
        assert_eq!(tree.partition.get(""), Some(&4));
        // Two leaves with the same label separate nothing.
        assert_eq!(tree.entropy, 0.0);
    }

    #[test]
    fn branch_counts_reach_the_leaves() {
        let vars = names(&["x"]);
        let tokens = ["x", "5", "3", "[", "x=0", "]", "[", "x=1", "]"];
        let tree = Decoder::new(&vars).decode(&tokens, 8).unwrap();

        assert_eq!(tree.partition.get("0"), Some(&5));
        assert_eq!(tree.partition.get("1"), Some(&3));
        assert!(tree.entropy > 0.0);
        assert!(tree.entropy < 1.0);
    }

    #[test]
    fn leaf_title_groups_two_fixes_per_line() {
        let vars = names(&["a", "b", "c"]);
        let tokens = ["[", "a=1", "b=0", "c=1", "]"];
        let tree = Decoder::new(&vars).decode(&tokens, 2).unwrap();

        let title = &tree.nodes[0].title;
        assert_eq!(title.lines.len(), 3);
        assert_eq!(title.lines[0], vec![active("a"), plain(" "), inactive("b")]);
        assert_eq!(title.lines[1], vec![active("c")]);
        assert_eq!(title.lines[2], vec![plain("Total colors: 2")]);
    }

    #[test]
    fn compound_decision_label_and_title() {
        let vars = names(&[]);
        let tokens = ["!p;q(1a,0b);p", "1", "1", "[", "]", "[", "]"];
        let tree = Decoder::new(&vars).decode(&tokens, 2).unwrap();

        let decision = &tree.nodes[2];
        assert_eq!(decision.kind, NodeKind::Decision);
        // Negation is stripped for dedup, so `!p` and `p` collapse.
        assert_eq!(decision.label, "p\nq");

        assert_eq!(decision.title.lines.len(), 3);
        assert_eq!(decision.title.lines[0], vec![plain("!p")]);
        assert_eq!(
            decision.title.lines[1],
            vec![
                plain("q("),
                active("a"),
                plain(" "),
                inactive("b"),
                plain(")")
            ]
        );
        assert_eq!(decision.title.lines[2], vec![plain("p")]);
    }

    #[test]
    fn negated_parenthesized_test_keeps_negation_in_title() {
        let (label, title) = parse_decision("!f(1x)");
        assert_eq!(label, "f");
        assert_eq!(title.lines[0][0], plain("!f("));
    }

    #[test]
    fn unterminated_leaf_is_malformed() {
        let vars = names(&["x"]);
        let err = Decoder::new(&vars).decode(&["[", "x=0"], 4).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Malformed(MalformedTree::UnterminatedLeaf(0))
        );
    }

    #[test]
    fn unknown_variable_fails_hard() {
        let vars = names(&["x"]);
        let err = Decoder::new(&vars)
            .decode(&["[", "y=1", "]"], 4)
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownVariable(UnknownVariable("y".into()))
        );
    }

    #[test]
    fn bad_assignment_values_are_rejected() {
        let vars = names(&["x"]);
        for token in ["x=2", "x", "=1", "x="] {
            let err = Decoder::new(&vars).decode(&["[", token, "]"], 4).unwrap_err();
            assert_eq!(
                err,
                DecodeError::Malformed(MalformedTree::BadAssignment(token.into())),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn missing_or_bad_branch_counts_are_malformed() {
        let vars = names(&[]);
        let decoder = Decoder::new(&vars);

        assert_eq!(
            decoder.decode(&["p"], 4).unwrap_err(),
            DecodeError::Malformed(MalformedTree::UnexpectedEnd)
        );
        assert_eq!(
            decoder.decode(&["p", "2", "[", "]", "[", "]"], 4).unwrap_err(),
            DecodeError::Malformed(MalformedTree::BadBranchCount("[".into()))
        );
        assert_eq!(
            decoder.decode(&["p", "2", "-1", "[", "]", "[", "]"], 4).unwrap_err(),
            DecodeError::Malformed(MalformedTree::BadBranchCount("-1".into()))
        );
    }

    #[test]
    fn exhausted_stream_is_malformed() {
        let vars = names(&[]);
        let err = Decoder::new(&vars)
            .decode(&["p", "2", "2", "[", "]"], 4)
            .unwrap_err();
        assert_eq!(err, DecodeError::Malformed(MalformedTree::UnexpectedEnd));
    }

    #[test]
    fn trailing_tokens_are_malformed() {
        let vars = names(&[]);
        let err = Decoder::new(&vars).decode(&["[", "]", "[", "]"], 4).unwrap_err();
        assert_eq!(err, DecodeError::Malformed(MalformedTree::TrailingTokens(2)));
    }

    #[test]
    fn stray_close_marker_is_malformed() {
        let vars = names(&[]);
        let err = Decoder::new(&vars).decode(&["]"], 4).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Malformed(MalformedTree::UnexpectedToken("]".into()))
        );
    }

    #[test]
    fn branch_sums_are_trusted_by_default() {
        let vars = names(&[]);
        // Inner decision claims 1+1 on a branch fed 3 colors.
        let tokens = ["p", "3", "1", "q", "1", "1", "[", "]", "[", "]", "[", "]"];
        assert!(Decoder::new(&vars).decode(&tokens, 4).is_ok());
    }

    #[test]
    fn branch_sum_check_catches_mismatch() {
        let vars = names(&[]);
        let tokens = ["p", "3", "1", "q", "1", "1", "[", "]", "[", "]", "[", "]"];
        let err = Decoder::new(&vars)
            .check_branch_sums(true)
            .decode(&tokens, 4)
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::Malformed(MalformedTree::BranchSumMismatch {
                branch: Branch::False,
                claimed: 3,
                actual: 2,
            })
        );
    }

    #[test]
    fn branch_sum_check_passes_consistent_trees() {
        let vars = names(&["x"]);
        let tokens = ["x", "2", "2", "[", "x=0", "]", "[", "x=1", "]"];
        assert!(
            Decoder::new(&vars)
                .check_branch_sums(true)
                .decode(&tokens, 4)
                .is_ok()
        );
    }

    #[test]
    fn total_of_one_color_is_defined() {
        let vars = names(&[]);
        let tree = Decoder::new(&vars).decode(&["[", "]"], 1).unwrap();
        assert_eq!(tree.entropy, 0.0);
    }

    #[test]
    fn decode_str_tokenizes_on_spaces() {
        let vars = names(&["x"]);
        let tree = Decoder::new(&vars)
            .decode_str("x 2 2 [ x=0 ] [ x=1 ]", 4)
            .unwrap();
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.entropy, 1.0);
    }

    #[test]
    fn partition_mass_is_conserved() {
        let vars = names(&["a", "b", "c"]);
        let tokens = [
            "f(1a,0b)", "5", "3", "[", "b=0", "]", "b;!c", "2", "1", "[", "a=1", "]", "[", "a=1",
            "c=0", "]",
        ];
        let tree = Decoder::new(&vars).decode(&tokens, 8).unwrap();

        assert_eq!(tree.partition.values().sum::<u64>(), 8);
        assert_eq!(tree.nodes.len(), tree.leaf_count() + tree.decision_count());
        assert_eq!(tree.edges.len(), 2 * tree.decision_count());
        assert!(tree.entropy >= 0.0);
    }
}
