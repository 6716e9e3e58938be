//! Lispreter - a small Lisp interpreter
//!
//! This crate reads Lisp source text into symbolic expression trees and evaluates
//! them against a mutable environment of variable and function bindings, including
//! named user functions and anonymous (lambda) functions.
//!
//! ```lisp
//! (DEFUN SQUARE (X) (TIMES X X))
//! (SQUARE 7)                          ; 49
//! ((LAMBDA (A B) (PLUS A B)) 2 3)     ; 5
//! (COND ((NULL NIL) (QUOTE EMPTY)) (T (QUOTE FULL)))
//! ```
//!
//! ## Conventions
//!
//! - Atoms are symbols (leading letter, then letters or digits) or integers.
//! - `T` is true and `NIL` is both false and the empty list.
//! - Functions have fixed arity: calling with too few or too many arguments is an error.
//!
//! ## Modules
//!
//! - `ast`: `Node`, `Atom` and `SExpression`, the symbolic data model
//! - `function`: user-defined and lambda functions, parameter binding
//! - `evaluator`: the `Environment` and the recursive evaluator
//! - `builtinops`: the primitive operation table
//! - `reader`: S-expression parsing from text
//! - `driver`: whole-program evaluation against an output sink

use thiserror::Error;

/// Maximum parsing depth to prevent stack overflow on deeply nested input
pub const MAX_PARSE_DEPTH: usize = 64;

/// Maximum number of nested user function and lambda calls.
/// Expression nesting within one call is already bounded by [`MAX_PARSE_DEPTH`].
pub const MAX_CALL_DEPTH: usize = 2_000;

/// Stack size of the thread [`driver::on_eval_stack`] evaluates on, enough for
/// [`MAX_CALL_DEPTH`] nested calls
pub const EVAL_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Broad category of an [`Error`], one per failure family of the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed atom literal or ill-formed list
    NodeInit,
    /// Bad function definition or call shape (parameters, arity)
    FunctionDefinition,
    /// Undefined function, variable or lambda
    Environment,
    /// Runtime failures inside special forms or primitives
    Evaluation,
    /// Reader failures
    Parse,
    /// Input/output failures at the program boundary
    Io,
}

/// Error types for the interpreter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("ParseError: {0}")]
    Parse(String),
    #[error("NodeInitError: {0}")]
    InvalidAtom(String),
    #[error("NodeInitError: {0}")]
    MalformedList(String),
    #[error("FuncDefError: {0}")]
    FuncDef(String),
    #[error("FuncDefError: Parameter names must be alphanumeric literals : {0}")]
    InvalidParameter(String),
    #[error("FuncDefError: Formal param names cannot be duplicates : {0}")]
    DuplicateParameter(String),
    #[error("FuncDefError: Too few args for function : {0}")]
    TooFewArgs(String),
    #[error("FuncDefError: Too many args for function : {0}")]
    TooManyArgs(String),
    #[error("FuncDefError: Invalid parameters passed to function : {0}")]
    InvalidActuals(String),
    #[error("EnvironmentError: The function {0} is undefined.")]
    UndefinedFunction(String),
    #[error("EnvironmentError: The variable {0} is undefined.")]
    UndefinedVariable(String),
    #[error("EnvironmentError: No lambda is registered for formals {0}")]
    UndefinedLambda(String),
    #[error("EvaluationError: {0}")]
    Eval(String),
    #[error("Type error: {0}")]
    Type(String),
    #[error("ArityError: {name} expected {expected} arguments, got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },
    #[error("IoError: {0}")]
    Io(String),
}

impl Error {
    /// Which failure family this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(_) => ErrorKind::Parse,
            Error::InvalidAtom(_) | Error::MalformedList(_) => ErrorKind::NodeInit,
            Error::FuncDef(_)
            | Error::InvalidParameter(_)
            | Error::DuplicateParameter(_)
            | Error::TooFewArgs(_)
            | Error::TooManyArgs(_)
            | Error::InvalidActuals(_) => ErrorKind::FunctionDefinition,
            Error::UndefinedFunction(_)
            | Error::UndefinedVariable(_)
            | Error::UndefinedLambda(_) => ErrorKind::Environment,
            Error::Eval(_) | Error::Type(_) | Error::Arity { .. } => ErrorKind::Evaluation,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

// io::Error is neither Clone nor PartialEq, so it is carried as its message.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub mod ast;
pub mod builtinops;
pub mod driver;
pub mod evaluator;
pub mod function;
pub mod reader;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let cases = vec![
            (Error::Parse("x".into()), ErrorKind::Parse),
            (Error::InvalidAtom("x".into()), ErrorKind::NodeInit),
            (Error::MalformedList("x".into()), ErrorKind::NodeInit),
            (Error::DuplicateParameter("x".into()), ErrorKind::FunctionDefinition),
            (Error::TooManyArgs("f".into()), ErrorKind::FunctionDefinition),
            (Error::UndefinedVariable("v".into()), ErrorKind::Environment),
            (Error::UndefinedLambda("(X)".into()), ErrorKind::Environment),
            (Error::Type("x".into()), ErrorKind::Evaluation),
            (Error::Io("x".into()), ErrorKind::Io),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn test_error_messages_name_the_culprit() {
        assert_eq!(
            Error::TooFewArgs("ADD2".into()).to_string(),
            "FuncDefError: Too few args for function : ADD2"
        );
        assert_eq!(
            Error::UndefinedFunction("FOO".into()).to_string(),
            "EnvironmentError: The function FOO is undefined."
        );
        let arity = Error::Arity {
            name: "CAR".into(),
            expected: "1".into(),
            got: 2,
        };
        assert_eq!(arity.to_string(), "ArityError: CAR expected 1 arguments, got 2");
    }
}
