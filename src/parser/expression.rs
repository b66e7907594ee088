// Expression grammar
//
// Precedence, loosest first:
//   or > and > not > comparison > & > + - > * / % > unary > postfix > atom

use super::ast::{BinaryOp, CompareOp, Expr, UnaryOp};
use super::lexer::{identifier, keyword, number_literal, string_literal, ws, Number};
use crate::error::{Error, Result};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{eof, map, not, opt, value, verify},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

const RESERVED: &[&str] = &["and", "or", "not", "in", "is", "True", "False", "None"];

/// Parse a complete expression. Trailing input is an error.
pub fn parse_expression(input: &str) -> Result<Expr> {
    match terminated(ws(or_expr), eof)(input) {
        Ok((_, expr)) => Ok(expr),
        Err(e) => Err(Error::Validation(format!(
            "Invalid expression '{}': {}",
            input, e
        ))),
    }
}

fn fold_left(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    rest.into_iter()
        .fold(first, |acc, (op, rhs)| Expr::Binary(Box::new(acc), op, Box::new(rhs)))
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(ws(keyword("or")), and_expr))(input)?;
    let expr = rest
        .into_iter()
        .fold(first, |acc, rhs| Expr::Or(Box::new(acc), Box::new(rhs)));
    Ok((input, expr))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(ws(keyword("and")), not_expr))(input)?;
    let expr = rest
        .into_iter()
        .fold(first, |acc, rhs| Expr::And(Box::new(acc), Box::new(rhs)));
    Ok((input, expr))
}

fn not_expr(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(ws(keyword("not")), not_expr), |e| Expr::Not(Box::new(e))),
        comparison,
    ))(input)
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        value(CompareOp::Eq, tag("==")),
        value(CompareOp::NotEq, tag("!=")),
        value(CompareOp::LtE, tag("<=")),
        value(CompareOp::GtE, tag(">=")),
        value(CompareOp::Lt, tag("<")),
        value(CompareOp::Gt, tag(">")),
        value(CompareOp::NotIn, pair(keyword("not"), ws(keyword("in")))),
        value(CompareOp::In, keyword("in")),
        value(CompareOp::IsNot, pair(keyword("is"), ws(keyword("not")))),
        value(CompareOp::Is, keyword("is")),
    ))(input)
}

fn comparison(input: &str) -> IResult<&str, Expr> {
    let (input, first) = bitand_expr(input)?;
    let (input, rest) = many0(pair(ws(compare_op), bitand_expr))(input)?;
    if rest.is_empty() {
        Ok((input, first))
    } else {
        Ok((input, Expr::Compare(Box::new(first), rest)))
    }
}

fn bitand_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = additive(input)?;
    let (input, rest) = many0(pair(value(BinaryOp::BitAnd, ws(char('&'))), additive))(input)?;
    Ok((input, fold_left(first, rest)))
}

fn additive(input: &str) -> IResult<&str, Expr> {
    let (input, first) = multiplicative(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            value(BinaryOp::Add, char('+')),
            value(BinaryOp::Sub, char('-')),
        ))),
        multiplicative,
    ))(input)?;
    Ok((input, fold_left(first, rest)))
}

fn multiplicative(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            value(BinaryOp::Mul, terminated(char('*'), not(char('*')))),
            value(BinaryOp::Div, terminated(char('/'), not(char('/')))),
            value(BinaryOp::Mod, char('%')),
        ))),
        unary,
    ))(input)?;
    Ok((input, fold_left(first, rest)))
}

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(ws(char('-')), unary), |e| Expr::Unary(UnaryOp::Neg, Box::new(e))),
        map(preceded(ws(char('+')), unary), |e| Expr::Unary(UnaryOp::Pos, Box::new(e))),
        postfix,
    ))(input)
}

enum Suffix {
    Attr(String),
    Call(Vec<Expr>),
    Index(Expr),
}

fn suffix(input: &str) -> IResult<&str, Suffix> {
    alt((
        map(preceded(ws(char('.')), identifier), Suffix::Attr),
        map(delimited(ws(char('(')), call_arguments, ws(char(')'))), Suffix::Call),
        map(delimited(ws(char('[')), or_expr, ws(char(']'))), Suffix::Index),
    ))(input)
}

/// `name=value`; `name==value` is left to the comparison parser.
fn keyword_argument(input: &str) -> IResult<&str, Expr> {
    map(
        pair(terminated(ws(identifier), pair(char('='), not(char('=')))), or_expr),
        |(name, value)| Expr::Keyword(name, Box::new(value)),
    )(input)
}

fn call_arguments(input: &str) -> IResult<&str, Vec<Expr>> {
    let (input, items) = separated_list0(ws(char(',')), alt((keyword_argument, or_expr)))(input)?;
    let (input, _) = if items.is_empty() {
        (input, None)
    } else {
        opt(ws(char(',')))(input)?
    };
    Ok((input, items))
}

fn postfix(input: &str) -> IResult<&str, Expr> {
    let (input, base) = atom(input)?;
    let (input, suffixes) = many0(suffix)(input)?;
    let expr = suffixes.into_iter().fold(base, |acc, s| match s {
        Suffix::Attr(name) => Expr::Attribute(Box::new(acc), name),
        Suffix::Call(args) => Expr::Call(Box::new(acc), args),
        Suffix::Index(idx) => Expr::Index(Box::new(acc), Box::new(idx)),
    });
    Ok((input, expr))
}

/// Comma separated expressions, trailing comma allowed. The flag reports
/// whether a trailing comma was present.
fn comma_list(input: &str) -> IResult<&str, (Vec<Expr>, bool)> {
    let (input, items) = separated_list0(ws(char(',')), or_expr)(input)?;
    let (input, trailing) = if items.is_empty() {
        (input, None)
    } else {
        opt(ws(char(',')))(input)?
    };
    Ok((input, (items, trailing.is_some())))
}

fn parenthesized(input: &str) -> IResult<&str, Expr> {
    let (input, (mut items, trailing)) = delimited(ws(char('(')), comma_list, ws(char(')')))(input)?;
    if items.len() == 1 && !trailing {
        if let Some(inner) = items.pop() {
            return Ok((input, inner));
        }
    }
    Ok((input, Expr::Tuple(items)))
}

fn list(input: &str) -> IResult<&str, Expr> {
    map(
        delimited(ws(char('[')), comma_list, ws(char(']'))),
        |(items, _)| Expr::List(items),
    )(input)
}

fn name(input: &str) -> IResult<&str, Expr> {
    map(verify(identifier, |s: &str| !RESERVED.contains(&s)), Expr::Name)(input)
}

fn atom(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        map(number_literal, |n| match n {
            Number::Int(i) => Expr::Int(i),
            Number::Float(f) => Expr::Float(f),
        }),
        map(string_literal, Expr::Str),
        value(Expr::Bool(true), keyword("True")),
        value(Expr::Bool(false), keyword("False")),
        value(Expr::None, keyword("None")),
        name,
        parenthesized,
        list,
    )))(input)
}
