//! Text protocol spoken by the analysis server.
//!
//! Replies are space-delimited. A model upload is answered by
//! `OK <colors> <var>...` or `ERR <reason>`; `START` by an alternating
//! `<colors> <bitstring>` list; `TREE <id>` by a driver-set prefix
//! `[ name=v ... ]` followed by the tree token stream.

use std::fmt;

use dtree::{DriverSet, parse_assignment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Tree(usize),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Start => write!(f, "START"),
            Command::Tree(id) => write!(f, "TREE {id}"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("server rejected the model:{0}")]
    Rejected(String),
    #[error("malformed server reply: {0}")]
    Malformed(String),
}

/// Model facts from the `OK` reply: total color count and the ordered
/// variable names that fix the label width everywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub color_count: u64,
    pub var_names: Vec<String>,
}

pub fn parse_model_reply(msg: &str) -> Result<ModelInfo, ProtocolError> {
    if let Some(reason) = msg.strip_prefix("ERR") {
        return Err(ProtocolError::Rejected(reason.to_string()));
    }
    let mut tokens = msg.split_whitespace();
    match tokens.next() {
        Some("OK") => {}
        _ => return Err(ProtocolError::Malformed(format!("unexpected reply '{msg}'"))),
    }
    let color_count = tokens
        .next()
        .and_then(|t| t.parse::<u64>().ok())
        .ok_or_else(|| ProtocolError::Malformed("OK reply without a color count".into()))?;
    Ok(ModelInfo {
        color_count,
        var_names: tokens.map(String::from).collect(),
    })
}

/// Attractor list reply: `(color count, state bitstring)` pairs,
/// already sorted by the server in descending color count.
pub fn parse_attractor_list(msg: &str) -> Result<Vec<(u64, String)>, ProtocolError> {
    let tokens: Vec<&str> = msg.split_whitespace().collect();
    if tokens.len() % 2 != 0 {
        return Err(ProtocolError::Malformed(
            "attractor list with an odd number of tokens".into(),
        ));
    }
    tokens
        .chunks_exact(2)
        .map(|pair| {
            let colors = pair[0].parse::<u64>().map_err(|_| {
                ProtocolError::Malformed(format!("bad attractor color count '{}'", pair[0]))
            })?;
            Ok((colors, pair[1].to_string()))
        })
        .collect()
}

/// Split a `TREE` reply into the attractor's minimal driver set and
/// the tree token stream that follows it.
pub fn parse_tree_reply(msg: &str) -> Result<(DriverSet, Vec<&str>), ProtocolError> {
    let mut tokens = msg.split_whitespace();
    if tokens.next() != Some("[") {
        return Err(ProtocolError::Malformed(
            "tree reply without a driver-set prefix".into(),
        ));
    }

    let mut dset = DriverSet::new();
    for token in tokens.by_ref() {
        if token == "]" {
            return Ok((dset, tokens.collect()));
        }
        let (name, value) =
            parse_assignment(token).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        dset.insert(name, value);
    }
    Err(ProtocolError::Malformed(
        "unterminated driver-set prefix".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_encode_as_sent() {
        assert_eq!(Command::Start.to_string(), "START");
        assert_eq!(Command::Tree(3).to_string(), "TREE 3");
    }

    #[test]
    fn ok_reply_carries_colors_and_variables() {
        let info = parse_model_reply("OK 12 ctrA gcrA dnaA").unwrap();
        assert_eq!(info.color_count, 12);
        assert_eq!(info.var_names, vec!["ctrA", "gcrA", "dnaA"]);
    }

    #[test]
    fn ok_reply_may_have_no_variables() {
        let info = parse_model_reply("OK 1").unwrap();
        assert_eq!(info.color_count, 1);
        assert!(info.var_names.is_empty());
    }

    #[test]
    fn err_reply_is_a_rejection() {
        let err = parse_model_reply("ERR unknown syntax").unwrap_err();
        assert_eq!(err, ProtocolError::Rejected(" unknown syntax".into()));
    }

    #[test]
    fn garbage_model_reply_is_malformed() {
        assert!(matches!(
            parse_model_reply("HELLO"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            parse_model_reply("OK twelve"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn attractor_list_parses_pairs() {
        let attrs = parse_attractor_list("8 1010 3 0110 1 0001").unwrap();
        assert_eq!(
            attrs,
            vec![
                (8, "1010".to_string()),
                (3, "0110".to_string()),
                (1, "0001".to_string())
            ]
        );
    }

    #[test]
    fn empty_attractor_list_is_valid() {
        assert_eq!(parse_attractor_list(""), Ok(vec![]));
    }

    #[test]
    fn odd_attractor_list_is_malformed() {
        assert!(matches!(
            parse_attractor_list("8 1010 3"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn tree_reply_splits_prefix_from_tokens() {
        let (dset, tree) = parse_tree_reply("[ a=1 b=0 ] x 2 2 [ x=0 ] [ x=1 ]").unwrap();
        assert_eq!(dset.get("a"), Some(true));
        assert_eq!(dset.get("b"), Some(false));
        assert_eq!(tree, vec!["x", "2", "2", "[", "x=0", "]", "[", "x=1", "]"]);
    }

    #[test]
    fn empty_driver_set_prefix() {
        let (dset, tree) = parse_tree_reply("[ ] [ ]").unwrap();
        assert!(dset.is_empty());
        assert_eq!(tree, vec!["[", "]"]);
    }

    #[test]
    fn tree_reply_without_prefix_is_malformed() {
        assert!(matches!(
            parse_tree_reply("x 2 2 [ ] [ ]"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            parse_tree_reply("[ a=1"),
            Err(ProtocolError::Malformed(_))
        ));
    }
}
