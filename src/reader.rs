//! S-expression reader.
//!
//! Turns source text into [`Node`] trees:
//!
//! - atoms: symbols (`FOO`, `x1`, `λ`) and integers (`42`, `-7`, `+3`)
//! - lists: `(A B C)`, with `()` read as `NIL`
//! - dotted tails: `(A . (B C))` reads as `(A B C)`; the tail must be a list or `NIL`
//! - quote shorthand: `'X` reads as `(QUOTE X)`
//! - line comments starting with `;`, unless disabled in [`ParseConfig`]

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace1, not_line_ending},
    combinator::value,
    error::{ErrorKind, ParseError},
    multi::many0_count,
    sequence::preceded,
};

use crate::Error;
use crate::MAX_PARSE_DEPTH;
use crate::ast::{Atom, Node};

/// Reader options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Treat `;` to end of line as whitespace
    pub handle_comments: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            handle_comments: true,
        }
    }
}

/// nom error carrying an interpreter error for failures that are not syntax
/// errors, such as an out-of-range integer.
#[derive(Debug)]
struct ReadError<'a> {
    input: &'a str,
    code: ErrorKind,
    cause: Option<Error>,
}

impl<'a> ParseError<&'a str> for ReadError<'a> {
    fn from_error_kind(input: &'a str, code: ErrorKind) -> Self {
        ReadError {
            input,
            code,
            cause: None,
        }
    }

    fn append(_: &'a str, _: ErrorKind, other: Self) -> Self {
        other
    }
}

type ReadResult<'a, T> = IResult<&'a str, T, ReadError<'a>>;

/// Abort parsing with `cause`; alternatives are not tried
fn fail(input: &str, cause: Error) -> nom::Err<ReadError<'_>> {
    nom::Err::Failure(ReadError {
        input,
        code: ErrorKind::Verify,
        cause: Some(cause),
    })
}

/// Past an opening `(` or `'` no other alternative can match, so recoverable
/// errors become final and keep their position
fn committed<'a, T>(result: ReadResult<'a, T>) -> ReadResult<'a, T> {
    result.map_err(|err| match err {
        nom::Err::Error(e) => nom::Err::Failure(e),
        other => other,
    })
}

/// Convert nom parsing errors to interpreter errors with user-friendly messages
fn to_error(input: &str, error: nom::Err<ReadError<'_>>) -> Error {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            if let Some(cause) = e.cause {
                return cause;
            }
            let position = input.len().saturating_sub(e.input.len());
            if e.input.is_empty() {
                return Error::Parse("Unexpected end of input".into());
            }
            match (e.code, e.input.chars().next()) {
                (_, Some(')')) => Error::Parse(format!("Unexpected ')' at position {position}")),
                (ErrorKind::Char, _) => {
                    Error::Parse(format!("Expected character at position {position}"))
                }
                _ => {
                    let near: String = e.input.chars().take(10).collect();
                    Error::Parse(format!("Invalid syntax near '{near}'"))
                }
            }
        }
        nom::Err::Incomplete(_) => Error::Parse("Incomplete input".into()),
    }
}

/// Skip whitespace and, if enabled, comments
fn skip_ws(input: &str, config: ParseConfig) -> ReadResult<'_, ()> {
    let comment = preceded(char(';'), not_line_ending);
    if config.handle_comments {
        value((), many0_count(alt((multispace1, comment)))).parse(input)
    } else {
        value((), many0_count(multispace1)).parse(input)
    }
}

fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '\'' | ';')
}

/// The raw text of the next atom, up to a delimiter
fn atom_token(input: &str) -> ReadResult<'_, &str> {
    take_while1(is_atom_char).parse(input)
}

fn close_paren(input: &str) -> ReadResult<'_, char> {
    char(')').parse(input)
}

/// Parse an atom, validating the literal
fn parse_atom(input: &str) -> ReadResult<'_, Node> {
    let (rest, token) = atom_token(input)?;
    match Atom::new(token) {
        Ok(atom) => Ok((rest, Node::Atom(atom))),
        Err(err) => Err(fail(input, err)),
    }
}

/// Parse quoted expression ('expr -> (QUOTE expr))
fn parse_quote(input: &str, config: ParseConfig, depth: usize) -> ReadResult<'_, Node> {
    let (input, _) = char('\'').parse(input)?;
    let (input, expr) = committed(parse_sexpr(input, config, depth + 1))?;
    let quote = Node::atom("QUOTE").map_err(|err| fail(input, err))?;
    Ok((input, Node::list(vec![quote, expr])))
}

/// Parse a list, including the `()` and dotted-tail shapes
fn parse_list(input: &str, config: ParseConfig, depth: usize) -> ReadResult<'_, Node> {
    let (mut input, _) = char('(').parse(input)?;
    let mut items = Vec::new();

    loop {
        let (rest, _) = committed(skip_ws(input, config))?;

        if let Ok((rest, _)) = close_paren(rest) {
            return Ok((rest, Node::list(items)));
        }

        if let Ok((after_dot, ".")) = atom_token(rest) {
            if items.is_empty() {
                return Err(fail(
                    rest,
                    Error::MalformedList("Dotted pair requires a head before '.'".into()),
                ));
            }
            let (after, tail) = committed(parse_sexpr(after_dot, config, depth + 1))?;
            let (after, _) = committed(skip_ws(after, config))?;
            let (after, _) = committed(close_paren(after))?;
            let list = items
                .into_iter()
                .rev()
                .try_fold(tail, |tail, head| Node::cons(head, tail))
                .map_err(|err| fail(after_dot, err))?;
            return Ok((after, list));
        }

        let (rest, item) = committed(parse_sexpr(rest, config, depth + 1))?;
        items.push(item);
        input = rest;
    }
}

/// Parse one S-expression, skipping leading whitespace
fn parse_sexpr(input: &str, config: ParseConfig, depth: usize) -> ReadResult<'_, Node> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(fail(
            input,
            Error::Parse(format!(
                "Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"
            )),
        ));
    }
    let (input, _) = skip_ws(input, config)?;
    alt((
        |input| parse_quote(input, config, depth),
        |input| parse_list(input, config, depth),
        parse_atom,
    ))
    .parse(input)
}

/// Parse exactly one S-expression from `input` with default options
pub fn parse_node(input: &str) -> Result<Node, Error> {
    parse_node_with_config(input, ParseConfig::default())
}

/// Parse exactly one S-expression; anything but whitespace after it is an error
pub fn parse_node_with_config(input: &str, config: ParseConfig) -> Result<Node, Error> {
    let (rest, node) = parse_sexpr(input, config, 0).map_err(|e| to_error(input, e))?;
    let (rest, _) = skip_ws(rest, config).map_err(|e| to_error(input, e))?;
    if rest.is_empty() {
        Ok(node)
    } else {
        Err(Error::Parse(format!("Unexpected remaining input: '{rest}'")))
    }
}

/// Parse a whole program: zero or more S-expressions, in order
pub fn parse_program(input: &str) -> Result<Vec<Node>, Error> {
    parse_program_with_config(input, ParseConfig::default())
}

pub fn parse_program_with_config(input: &str, config: ParseConfig) -> Result<Vec<Node>, Error> {
    let mut nodes = Vec::new();
    let mut rest = input;
    loop {
        let (next, _) = skip_ws(rest, config).map_err(|e| to_error(input, e))?;
        if next.is_empty() {
            return Ok(nodes);
        }
        let (next, node) = parse_sexpr(next, config, 0).map_err(|e| to_error(input, e))?;
        nodes.push(node);
        rest = next;
    }
}
