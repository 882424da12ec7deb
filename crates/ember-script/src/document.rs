/// A parsed template, ready for the engine. Never mutated by it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    For,
    Echo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal output.
    Text(String),
    /// A bounded numeric loop over `variable`.
    For(ForLoop),
    /// A postfix expression whose leftover operands are written out.
    Echo(Vec<Element>),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Text(_) => NodeKind::Text,
            Node::For(_) => NodeKind::For,
            Node::Echo(_) => NodeKind::Echo,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::For(l) => &l.body,
            Node::Text(_) | Node::Echo(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub variable: String,
    pub start: Operand,
    pub end: Operand,
    /// `None` steps by one.
    pub step: Option<Operand>,
    pub body: Vec<Node>,
}

/// A loop bound: a literal or the current value of a loop variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(String),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Literal(String),
    Variable(String),
    Operator(String),
    Function(String),
}
