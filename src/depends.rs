//! Compiler for the `depends` attribute of extensions and `<require>` blocks.
//!
//! The language has bare identifiers, `+` (and), `,` (or) and parentheses.
//! `+` binds tighter than `,` and both associate to the left, so
//! `a,b+c` means `a,(b+c)`.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::{all_consuming, map, recognize},
    error::ParseError as NomParseError,
    multi::{many0, many0_count},
    sequence::{delimited, pair, preceded},
    Finish, IResult, Parser,
};
use std::fmt;
use thiserror::Error;

/// A compiled dependency predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Dependency {
    /// An extension or version name, true when its macro is defined.
    Defined(String),
    And(Box<Dependency>, Box<Dependency>),
    Or(Box<Dependency>, Box<Dependency>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid dependency expression '{expression}' at offset {offset}")]
pub struct ParseError {
    pub expression: String,
    pub offset: usize,
}

/// Compiles a dependency expression into a predicate tree.
pub fn compile(expression: &str) -> Result<Dependency, ParseError> {
    match all_consuming(ws(or_chain))(expression).finish() {
        Ok((_, dependency)) => Ok(dependency),
        Err(e) => Err(ParseError {
            expression: expression.to_owned(),
            offset: expression.len() - e.input.len(),
        }),
    }
}

/// Compiles a dependency expression straight into a preprocessor guard
/// fragment.
pub fn compile_guard(expression: &str) -> Result<String, ParseError> {
    compile(expression).map(|dependency| dependency.to_string())
}

impl Dependency {
    /// Evaluates the predicate with `is_defined` answering for each name.
    pub fn eval<F: Fn(&str) -> bool>(&self, is_defined: &F) -> bool {
        match self {
            Dependency::Defined(name) => is_defined(name),
            Dependency::And(l, r) => l.eval(is_defined) && r.eval(is_defined),
            Dependency::Or(l, r) => l.eval(is_defined) || r.eval(is_defined),
        }
    }

    /// Names referenced by the predicate, in order of appearance.
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Dependency::Defined(name) => names.push(name),
            Dependency::And(l, r) | Dependency::Or(l, r) => {
                l.collect_names(names);
                r.collect_names(names);
            }
        }
    }

    /// Renders the predicate back into registry syntax, fully parenthesized.
    pub fn to_expression(&self) -> String {
        match self {
            Dependency::Defined(name) => name.clone(),
            Dependency::And(l, r) => format!("({}+{})", l.to_expression(), r.to_expression()),
            Dependency::Or(l, r) => format!("({},{})", l.to_expression(), r.to_expression()),
        }
    }
}

/// Renders the predicate as a preprocessor expression, e.g.
/// `(defined(VK_KHR_surface) && defined(VK_VERSION_1_1))`.
impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Defined(name) => write!(f, "defined({})", name),
            Dependency::And(l, r) => write!(f, "({} && {})", l, r),
            Dependency::Or(l, r) => write!(f, "({} || {})", l, r),
        }
    }
}

/// A combinator that takes a parser `inner` and produces a parser that also consumes both leading and
/// trailing whitespace, returning the output of `inner`.
fn ws<'a, F: 'a, O, E: NomParseError<&'a str>>(
    inner: F,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where
    F: FnMut(&'a str) -> IResult<&'a str, O, E>,
{
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn fold_left(
    first: Dependency,
    rest: Vec<Dependency>,
    op: fn(Box<Dependency>, Box<Dependency>) -> Dependency,
) -> Dependency {
    rest.into_iter()
        .fold(first, |left, right| op(Box::new(left), Box::new(right)))
}

fn primary(input: &str) -> IResult<&str, Dependency> {
    alt((
        identifier.map(|name| Dependency::Defined(name.to_owned())),
        delimited(char('('), ws(or_chain), char(')')),
    ))(input)
}

fn and_chain(input: &str) -> IResult<&str, Dependency> {
    map(
        pair(ws(primary), many0(preceded(char('+'), ws(primary)))),
        |(first, rest)| fold_left(first, rest, Dependency::And),
    )(input)
}

fn or_chain(input: &str) -> IResult<&str, Dependency> {
    map(
        pair(and_chain, many0(preceded(char(','), and_chain))),
        |(first, rest)| fold_left(first, rest, Dependency::Or),
    )(input)
}
