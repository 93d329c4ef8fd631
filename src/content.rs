use crate::object::Object;

/// A single content-stream operation: zero or more operands followed by an operator.
/// This is the structured form the L1 object parser's *content-stream mode* (
/// §4.2) produces instead of a generic `Object` — operands accumulate on a stack and
/// flush into an `Operation` each time an operator (`Command`) token arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: String,
    pub operands: Vec<Object>,
}

impl Operation {
    pub fn new(operator: impl Into<String>, operands: Vec<Object>) -> Self {
        Operation { operator: operator.into(), operands }
    }
}

/// A parsed content stream: the flat operator list. Interpreting what the operators
/// *mean* (painting, text positioning, …) is out of scope — this layer
/// stops at "strongly typed operator list".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    pub operations: Vec<Operation>,
}
