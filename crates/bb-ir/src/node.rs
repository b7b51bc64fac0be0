//! Externally parsed description tree.
//!
//! The table parser that produces descriptions lives outside this crate;
//! this is the shape it hands over. With the `serde` feature a description
//! can be read straight from JSON:
//!
//! ```text
//! [["T", 1.0, 0.5, "LN"], ["T", 0.0, 0.5, "LN"]]
//! ```

use alloc::string::String;
use alloc::vec::Vec;

/// One node of a parsed description.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Node {
    Bool(bool),
    Number(f32),
    Str(String),
    List(Vec<Node>),
}

impl Node {
    /// Build a list node.
    pub fn list<I: IntoIterator<Item = Node>>(items: I) -> Self {
        Node::List(items.into_iter().collect())
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Str(s) => Some(s),
            _ => None,
        }
    }

    /// First character of a string node (the discriminant of a stage or operator).
    pub fn discriminant(&self) -> Option<char> {
        self.as_str().and_then(|s| s.chars().next())
    }

    /// Short tag for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Bool(_) => "bool",
            Node::Number(_) => "number",
            Node::Str(_) => "string",
            Node::List(_) => "list",
        }
    }
}

impl From<f32> for Node {
    fn from(v: f32) -> Self {
        Node::Number(v)
    }
}

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Node::Bool(v)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Node::Str(v.into())
    }
}

impl From<Vec<Node>> for Node {
    fn from(v: Vec<Node>) -> Self {
        Node::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn discriminant_is_first_char() {
        assert_eq!(Node::from("T").discriminant(), Some('T'));
        assert_eq!(Node::from("LN").discriminant(), Some('L'));
        assert_eq!(Node::from(1.0).discriminant(), None);
        assert_eq!(Node::from("").discriminant(), None);
    }

    #[test]
    fn list_builder() {
        let n = Node::list([Node::from("T"), 1.0.into(), 0.5.into(), "LN".into()]);
        assert_eq!(n.as_list().map(|l| l.len()), Some(4));
        assert_eq!(n.kind(), "list");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_from_json() {
        let n: Node = serde_json::from_str(r#"[["T", 1.0, 0.5, "LN"], ["I", true]]"#).unwrap();
        let expected = Node::list([
            Node::list([Node::from("T"), 1.0.into(), 0.5.into(), "LN".into()]),
            Node::list([Node::from("I"), true.into()]),
        ]);
        assert_eq!(n, expected);
        assert_eq!(Node::from(vec![Node::from(2.0)]).kind(), "list");
    }
}
