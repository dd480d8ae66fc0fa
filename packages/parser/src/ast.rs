use serde::{Deserialize, Serialize};

/// Parsed markup node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HtmlNode {
    Element {
        tag: String,
        /// Attributes in source order
        attributes: Vec<(String, String)>,
        children: Vec<HtmlNode>,
    },

    Text { content: String },

    Comment { content: String },
}

impl HtmlNode {
    pub fn element(tag: impl Into<String>) -> Self {
        HtmlNode::Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        HtmlNode::Text {
            content: content.into(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            HtmlNode::Element { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }
}

/// Script statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),

    /// `let`/`const`/`var` declaration
    Let { name: String, init: Option<Expr> },

    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },

    Block(Vec<Stmt>),

    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },

    ForOf {
        binding: String,
        iterable: Expr,
        body: Box<Stmt>,
    },

    While { test: Expr, body: Box<Stmt> },

    Return(Option<Expr>),

    Break,

    Continue,

    Throw(Expr),

    Empty,
}

/// Script expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),

    Str(String),

    Bool(bool),

    Null,

    Undefined,

    /// Backtick template string
    Template(Vec<TemplatePart>),

    Array(Vec<Expr>),

    Object(Vec<(String, Expr)>),

    Ident(String),

    This,

    /// Member access (obj.prop, obj?.prop)
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },

    /// Computed access (obj[expr])
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },

    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },

    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
    },

    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
    },

    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    Assign {
        target: Box<Expr>,
        operator: AssignOp,
        value: Box<Expr>,
    },

    /// `++`/`--`
    Update {
        target: Box<Expr>,
        increment: bool,
        prefix: bool,
    },
}

impl Expr {
    /// Whether the expression can appear on the left of an assignment
    pub fn is_place(&self) -> bool {
        matches!(
            self,
            Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Expression(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    /// `==`
    LooseEquals,
    /// `!=`
    LooseNotEquals,
    /// `===`
    Equals,
    /// `!==`
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

impl AssignOp {
    /// The binary operator a compound assignment applies
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Subtract => Some(BinaryOp::Subtract),
            AssignOp::Multiply => Some(BinaryOp::Multiply),
            AssignOp::Divide => Some(BinaryOp::Divide),
            AssignOp::Remainder => Some(BinaryOp::Remainder),
        }
    }
}
