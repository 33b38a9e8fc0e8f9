//! Expression tree JSON serialization, for front-end consumption.
use super::types::Node;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Node::Fixed(value) => serializer.serialize_f64(*value),
            Node::Constant(constant) => serializer.serialize_str(&constant.name),
            Node::Variable(variable) => serializer.serialize_str(&variable.name),
            Node::Unary(unary) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(unary.op.name(), &unary.arg)?;
                map.end()
            }
            Node::Binary(binary) => {
                let mut map = serializer.serialize_map(Some(1))?;
                struct Pair<'a>(&'a Node, &'a Node);
                impl<'a> Serialize for Pair<'a> {
                    fn serialize<S2>(&self, serializer: S2) -> Result<S2::Ok, S2::Error>
                    where
                        S2: Serializer,
                    {
                        let mut seq = serializer.serialize_seq(Some(2))?;
                        seq.serialize_element(self.0)?;
                        seq.serialize_element(self.1)?;
                        seq.end()
                    }
                }
                map.serialize_entry(binary.op.symbol(), &Pair(&binary.left, &binary.right))?;
                map.end()
            }
        }
    }
}
