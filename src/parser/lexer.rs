// Lexer utilities for condition and domain expressions

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{anychar, char, digit0, digit1, multispace0, none_of},
    combinator::{map, not, opt, peek, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

/// Numeric literal as written in the source text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// Parse and consume whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Parse an identifier (field name, function name)
/// Format: [a-zA-Z_][a-zA-Z0-9_]*
pub fn identifier(input: &str) -> IResult<&str, String> {
    let (input, ident) = recognize(take_while1(is_ident_char))(input)?;

    // Validate first character
    if let Some(first) = ident.chars().next() {
        if !first.is_alphabetic() && first != '_' {
            return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Alpha)));
        }
    }

    Ok((input, ident.to_string()))
}

/// Match a reserved word that is not the prefix of a longer identifier
/// (`in` must not match the start of `index`).
pub fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(peek(take_while1(is_ident_char))))
}

fn escaped_char(input: &str) -> IResult<&str, char> {
    preceded(
        char('\\'),
        map(anychar, |c| match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            other => other,
        }),
    )(input)
}

fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    let forbidden = if quote == '\'' { "'\\" } else { "\"\\" };
    map(
        delimited(
            char(quote),
            many0(alt((escaped_char, none_of(forbidden)))),
            char(quote),
        ),
        |chars| chars.into_iter().collect(),
    )
}

/// Parse a string literal
/// Format: '...' or "...", backslash escapes allowed, may be empty
pub fn string_literal(input: &str) -> IResult<&str, String> {
    alt((quoted('\''), quoted('"')))(input)
}

/// Parse an unsigned number literal. Integers stay integers.
pub fn number_literal(input: &str) -> IResult<&str, Number> {
    let exponent = tuple((
        alt((char('e'), char('E'))),
        opt(alt((char('+'), char('-')))),
        digit1,
    ));
    let (rest, text) = recognize(tuple((
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(exponent),
    )))(input)?;
    // `1abc` is neither a number nor an identifier
    let (rest, _) = not(peek(take_while1(|c: char| c.is_alphabetic() || c == '_')))(rest)?;

    if !text.contains(['.', 'e', 'E']) {
        if let Ok(i) = text.parse::<i64>() {
            return Ok((rest, Number::Int(i)));
        }
    }
    match text.parse::<f64>() {
        Ok(f) => Ok((rest, Number::Float(f))),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Float))),
    }
}
