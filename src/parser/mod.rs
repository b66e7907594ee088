// Parsers for view documents and the condition/domain expression language

pub mod ast;
pub mod expression;
pub mod lexer;
pub mod view;

// Public API re-exports
pub use ast::{BinaryOp, CompareOp, Expr, UnaryOp};
pub use expression::parse_expression;
pub use view::{parse_document, Element};
