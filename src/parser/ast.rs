// Abstract Syntax Tree for condition and domain expressions

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    /// Identifier looked up in the evaluation scope
    Name(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    /// `value.attr`
    Attribute(Box<Expr>, String),
    /// `callee(args...)`
    Call(Box<Expr>, Vec<Expr>),
    /// `name=value`, only as a call argument
    Keyword(String, Box<Expr>),
    /// `value[index]`
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    /// Chained comparison: `a < b <= c` holds when every link holds
    Compare(Box<Expr>, Vec<(CompareOp, Expr)>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// `&`, logical AND on non-integers
    BitAnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

impl Expr {
    /// `a.b.c` for a chain of attribute accesses on a name.
    pub fn dotted_path(&self) -> Option<String> {
        match self {
            Expr::Name(name) => Some(name.clone()),
            Expr::Attribute(base, attr) => base.dotted_path().map(|p| format!("{}.{}", p, attr)),
            _ => None,
        }
    }
}
