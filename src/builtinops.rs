//! Built-in primitive operations.
//!
//! This module provides the registry of primitives that user code reaches by
//! name, and the [`PrimitiveHandler`] seam through which the
//! [`Environment`](crate::evaluator::Environment) invokes them.
//!
//! ```lisp
//! (CAR (QUOTE (1 2 3)))   ; 1
//! (CONS 1 (QUOTE (2)))    ; (1 2)
//! (PLUS 2 3)              ; 5, also reachable as (ADD 2 3)
//! (LESS 1 2)              ; T
//! ```
//!
//! ## Functions vs Special Forms
//!
//! Every entry here receives already-evaluated operands. Forms that control
//! evaluation of their operands (`QUOTE`, `COND`, `DEFUN`, `LAMBDA`, `LET`) are
//! handled by the evaluator and are not in this registry.
//!
//! ## Error Handling
//!
//! - **Arity**: every primitive has a fixed operand count, checked before the call
//! - **Types**: integer primitives reject non-integers, list primitives reject atoms
//! - **Overflow**: arithmetic is checked and reports overflow instead of wrapping
//!
//! ## Adding New Operations
//!
//! 1. **Implement the function** with the signature `fn(args: &[Node]) -> Result<Node, Error>`
//! 2. **Add to BUILTIN_OPS** with its name, aliases and arity
//! 3. **Add tests** covering edge cases and error conditions

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::Error;
use crate::ast::{Node, NumberType};

/// Accepted operand counts of a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly n operands
    Exact(usize),
    /// Any number of operands
    Any,
}

impl Arity {
    /// Check an operand count against this arity on behalf of primitive `name`
    pub fn validate(&self, name: &str, got: usize) -> Result<(), Error> {
        match *self {
            Arity::Exact(expected) if expected != got => Err(Error::Arity {
                name: name.to_owned(),
                expected: expected.to_string(),
                got,
            }),
            Arity::Exact(_) | Arity::Any => Ok(()),
        }
    }
}

/// Signature shared by all primitive implementations
pub type PrimitiveFn = fn(&[Node]) -> Result<Node, Error>;

/// Definition of a built-in primitive
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    /// Canonical (upper-case) name
    pub name: &'static str,
    /// Alternative names resolving to the same primitive
    pub aliases: &'static [&'static str],
    pub arity: Arity,
    pub func: PrimitiveFn,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl BuiltinOp {
    /// Validate arity and apply the primitive to evaluated operands
    pub fn apply(&self, args: &[Node]) -> Result<Node, Error> {
        self.arity.validate(self.name, args.len())?;
        (self.func)(args)
    }
}

/// Executes built-in operations by name.
///
/// The environment imposes no validation of its own: name resolution and
/// arity/type checks are the handler's responsibility.
pub trait PrimitiveHandler {
    /// Whether `name` resolves to a primitive
    fn is_primitive(&self, name: &str) -> bool;

    /// Invoke primitive `name` with a list of evaluated operands, or `None` for
    /// a call without operands.
    fn call(&self, name: &str, args: Option<&Node>) -> Result<Node, Error>;
}

/// Handler backed by the static primitive registry
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinPrimitives;

impl PrimitiveHandler for BuiltinPrimitives {
    fn is_primitive(&self, name: &str) -> bool {
        find_builtin_op(name).is_some()
    }

    fn call(&self, name: &str, args: Option<&Node>) -> Result<Node, Error> {
        let op = find_builtin_op(name).ok_or_else(|| Error::UndefinedFunction(name.to_owned()))?;
        let operands: Vec<Node> = match args {
            None => Vec::new(),
            Some(list) if list.is_list() || list.is_nil() => list.iter().cloned().collect(),
            Some(other) => {
                return Err(Error::Type(format!(
                    "{} expects an operand list, got {other}",
                    op.name
                )));
            }
        };
        op.apply(&operands)
    }
}

//
// Primitive Implementations
//

fn integer_operand(op_name: &str, node: &Node) -> Result<NumberType, Error> {
    node.as_integer()
        .ok_or_else(|| Error::Type(format!("{op_name} requires integer operands, got {node}")))
}

fn integer_pair(op_name: &str, args: &[Node]) -> Result<(NumberType, NumberType), Error> {
    match args {
        [a, b] => Ok((integer_operand(op_name, a)?, integer_operand(op_name, b)?)),
        _ => Err(Error::Arity {
            name: op_name.to_owned(),
            expected: "2".to_owned(),
            got: args.len(),
        }),
    }
}

fn single<'a>(op_name: &str, args: &'a [Node]) -> Result<&'a Node, Error> {
    match args {
        [only] => Ok(only),
        _ => Err(Error::Arity {
            name: op_name.to_owned(),
            expected: "1".to_owned(),
            got: args.len(),
        }),
    }
}

// Macro to generate overflow-checked arithmetic primitives
macro_rules! checked_arithmetic {
    ($name:ident, $method:ident, $op_str:expr, $what:expr) => {
        fn $name(args: &[Node]) -> Result<Node, Error> {
            let (a, b) = integer_pair($op_str, args)?;
            a.$method(b)
                .map(Node::from)
                .ok_or_else(|| Error::Eval(concat!("Integer overflow in ", $what).to_owned()))
        }
    };
}

checked_arithmetic!(builtin_plus, checked_add, "PLUS", "addition");
checked_arithmetic!(builtin_minus, checked_sub, "MINUS", "subtraction");
checked_arithmetic!(builtin_times, checked_mul, "TIMES", "multiplication");

// Macro to generate integer comparison primitives
macro_rules! integer_comparison {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name(args: &[Node]) -> Result<Node, Error> {
            let (a, b) = integer_pair($op_str, args)?;
            Ok(Node::from(a $op b))
        }
    };
}

integer_comparison!(builtin_less, <, "LESS");
integer_comparison!(builtin_greater, >, "GREATER");

fn builtin_quotient(args: &[Node]) -> Result<Node, Error> {
    let (a, b) = integer_pair("QUOTIENT", args)?;
    if b == 0 {
        return Err(Error::Eval("Division by zero in QUOTIENT".into()));
    }
    a.checked_div(b)
        .map(Node::from)
        .ok_or_else(|| Error::Eval("Integer overflow in division".into()))
}

fn builtin_remainder(args: &[Node]) -> Result<Node, Error> {
    let (a, b) = integer_pair("REMAINDER", args)?;
    if b == 0 {
        return Err(Error::Eval("Division by zero in REMAINDER".into()));
    }
    a.checked_rem(b)
        .map(Node::from)
        .ok_or_else(|| Error::Eval("Integer overflow in remainder".into()))
}

fn builtin_car(args: &[Node]) -> Result<Node, Error> {
    match single("CAR", args)? {
        Node::Pair(pair) => Ok(pair.head().clone()),
        other => Err(Error::Type(format!("CAR requires a list, got {other}"))),
    }
}

fn builtin_cdr(args: &[Node]) -> Result<Node, Error> {
    match single("CDR", args)? {
        Node::Pair(pair) => Ok(pair.tail().clone()),
        other => Err(Error::Type(format!("CDR requires a list, got {other}"))),
    }
}

fn builtin_cons(args: &[Node]) -> Result<Node, Error> {
    match args {
        [head, tail] => Node::cons(head.clone(), tail.clone()),
        _ => Err(Error::Arity {
            name: "CONS".to_owned(),
            expected: "2".to_owned(),
            got: args.len(),
        }),
    }
}

fn builtin_atom(args: &[Node]) -> Result<Node, Error> {
    Ok(Node::from(!single("ATOM", args)?.is_list()))
}

fn builtin_null(args: &[Node]) -> Result<Node, Error> {
    Ok(Node::from(single("NULL", args)?.is_nil()))
}

fn builtin_int(args: &[Node]) -> Result<Node, Error> {
    Ok(Node::from(single("INT", args)?.as_integer().is_some()))
}

fn builtin_eq(args: &[Node]) -> Result<Node, Error> {
    match args {
        [Node::Atom(a), Node::Atom(b)] => Ok(Node::from(a == b)),
        [_, _] => Err(Error::Type("EQ requires atom operands".into())),
        _ => Err(Error::Arity {
            name: "EQ".to_owned(),
            expected: "2".to_owned(),
            got: args.len(),
        }),
    }
}

fn builtin_list(args: &[Node]) -> Result<Node, Error> {
    Ok(Node::list(args.to_vec()))
}

/// Global registry of all built-in primitives.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    vec![
        // List operations
        BuiltinOp {
            name: "CAR",
            aliases: &[],
            arity: Arity::Exact(1),
            func: builtin_car,
        },
        BuiltinOp {
            name: "CDR",
            aliases: &[],
            arity: Arity::Exact(1),
            func: builtin_cdr,
        },
        BuiltinOp {
            name: "CONS",
            aliases: &[],
            arity: Arity::Exact(2),
            func: builtin_cons,
        },
        BuiltinOp {
            name: "LIST",
            aliases: &[],
            arity: Arity::Any,
            func: builtin_list,
        },
        // Predicates
        BuiltinOp {
            name: "ATOM",
            aliases: &[],
            arity: Arity::Exact(1),
            func: builtin_atom,
        },
        BuiltinOp {
            name: "EQ",
            aliases: &[],
            arity: Arity::Exact(2),
            func: builtin_eq,
        },
        BuiltinOp {
            name: "NULL",
            aliases: &[],
            arity: Arity::Exact(1),
            func: builtin_null,
        },
        BuiltinOp {
            name: "INT",
            aliases: &[],
            arity: Arity::Exact(1),
            func: builtin_int,
        },
        // Arithmetic
        BuiltinOp {
            name: "PLUS",
            aliases: &["ADD"],
            arity: Arity::Exact(2),
            func: builtin_plus,
        },
        BuiltinOp {
            name: "MINUS",
            aliases: &["SUB"],
            arity: Arity::Exact(2),
            func: builtin_minus,
        },
        BuiltinOp {
            name: "TIMES",
            aliases: &["MUL"],
            arity: Arity::Exact(2),
            func: builtin_times,
        },
        BuiltinOp {
            name: "QUOTIENT",
            aliases: &["DIV"],
            arity: Arity::Exact(2),
            func: builtin_quotient,
        },
        BuiltinOp {
            name: "REMAINDER",
            aliases: &["MOD"],
            arity: Arity::Exact(2),
            func: builtin_remainder,
        },
        // Comparison
        BuiltinOp {
            name: "LESS",
            aliases: &["LT"],
            arity: Arity::Exact(2),
            func: builtin_less,
        },
        BuiltinOp {
            name: "GREATER",
            aliases: &["GT"],
            arity: Arity::Exact(2),
            func: builtin_greater,
        },
    ]
});

/// Upper-cased name and alias -> primitive (private - use find_builtin_op)
static BUILTIN_INDEX: LazyLock<HashMap<&'static str, &'static BuiltinOp>> = LazyLock::new(|| {
    let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
    ops.iter()
        .flat_map(|op| {
            std::iter::once(op.name)
                .chain(op.aliases.iter().copied())
                .map(move |id| (id, op))
        })
        .collect()
});

/// All registered primitives
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a primitive by name or alias, ignoring case
pub fn find_builtin_op(name: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_INDEX.get(name.to_uppercase().as_str()).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{int, nil, sym};

    /// Expected outcome of a primitive call
    #[derive(Debug)]
    enum Expect {
        Value(Node),
        Fails,
    }
    use Expect::*;

    fn list(items: Vec<Node>) -> Node {
        Node::list(items)
    }

    fn call_builtin(name: &str, args: &[Node]) -> Result<Node, Error> {
        BuiltinPrimitives.call(name, Some(&list(args.to_vec())))
    }

    #[test]
    fn test_builtin_ops_registry() {
        let plus = find_builtin_op("PLUS").unwrap();
        let by_alias = find_builtin_op("add").unwrap();
        assert!(std::ptr::eq(plus, by_alias));
        assert_eq!(plus.arity, Arity::Exact(2));
        assert!(find_builtin_op("car").is_some());
        assert!(find_builtin_op("Cdr").is_some());
        assert!(find_builtin_op("QUOTE").is_none());
        assert!(find_builtin_op("nosuch").is_none());
        assert!(BuiltinPrimitives.is_primitive("greater"));
        assert!(!BuiltinPrimitives.is_primitive("DEFUN"));
        assert_eq!(get_builtin_ops().len(), 15);
    }

    #[test]
    fn test_builtin_function_implementations() {
        let t = || Value(Node::t());
        let f = || Value(nil());
        let cases: Vec<(&str, Vec<Node>, Expect)> = vec![
            // list operations
            ("CAR", vec![list(vec![int(1), int(2)])], Value(int(1))),
            ("CAR", vec![list(vec![list(vec![sym("A")]), int(2)])], Value(list(vec![sym("A")]))),
            ("CAR", vec![nil()], Fails),
            ("CAR", vec![int(3)], Fails),
            ("CDR", vec![list(vec![int(1), int(2)])], Value(list(vec![int(2)]))),
            ("CDR", vec![list(vec![int(1)])], Value(nil())),
            ("CDR", vec![sym("A")], Fails),
            ("CONS", vec![int(1), list(vec![int(2)])], Value(list(vec![int(1), int(2)]))),
            ("CONS", vec![int(1), nil()], Value(list(vec![int(1)]))),
            ("CONS", vec![int(1), int(2)], Fails),
            ("LIST", vec![], Value(nil())),
            ("LIST", vec![int(1), sym("B")], Value(list(vec![int(1), sym("B")]))),
            // predicates
            ("ATOM", vec![int(1)], t()),
            ("ATOM", vec![nil()], t()),
            ("ATOM", vec![list(vec![int(1)])], f()),
            ("NULL", vec![nil()], t()),
            ("NULL", vec![int(0)], f()),
            ("NULL", vec![list(vec![nil()])], f()),
            ("INT", vec![int(-4)], t()),
            ("INT", vec![sym("X")], f()),
            ("EQ", vec![sym("A"), sym("A")], t()),
            ("EQ", vec![int(5), Node::atom("+5").unwrap()], t()),
            ("EQ", vec![sym("A"), sym("B")], f()),
            ("EQ", vec![list(vec![int(1)]), list(vec![int(1)])], Fails),
            // arithmetic
            ("PLUS", vec![int(2), int(3)], Value(int(5))),
            ("ADD", vec![int(-2), int(3)], Value(int(1))),
            ("PLUS", vec![int(i64::MAX), int(1)], Fails),
            ("PLUS", vec![sym("A"), int(1)], Fails),
            ("MINUS", vec![int(2), int(5)], Value(int(-3))),
            ("MINUS", vec![int(i64::MIN), int(1)], Fails),
            ("TIMES", vec![int(6), int(7)], Value(int(42))),
            ("TIMES", vec![int(i64::MAX), int(2)], Fails),
            ("QUOTIENT", vec![int(7), int(2)], Value(int(3))),
            ("QUOTIENT", vec![int(-7), int(2)], Value(int(-3))),
            ("QUOTIENT", vec![int(7), int(0)], Fails),
            ("QUOTIENT", vec![int(i64::MIN), int(-1)], Fails),
            ("REMAINDER", vec![int(7), int(2)], Value(int(1))),
            ("MOD", vec![int(-7), int(2)], Value(int(-1))),
            ("REMAINDER", vec![int(7), int(0)], Fails),
            // comparison
            ("LESS", vec![int(1), int(2)], t()),
            ("LESS", vec![int(2), int(2)], f()),
            ("GREATER", vec![int(3), int(2)], t()),
            ("GT", vec![int(-3), int(2)], f()),
            ("LESS", vec![nil(), int(2)], Fails),
            // arity
            ("CAR", vec![], Fails),
            ("CAR", vec![int(1), int(2)], Fails),
            ("PLUS", vec![int(1)], Fails),
            ("PLUS", vec![int(1), int(2), int(3)], Fails),
        ];

        for (i, (name, args, expected)) in cases.into_iter().enumerate() {
            match (call_builtin(name, &args), expected) {
                (Ok(actual), Value(expected)) => {
                    assert_eq!(actual, expected, "case #{} ({name})", i + 1);
                }
                (Err(_), Fails) => {}
                (Ok(actual), Fails) => panic!("case #{} ({name}): expected error, got {actual}", i + 1),
                (Err(err), Value(expected)) => {
                    panic!("case #{} ({name}): expected {expected}, got error {err}", i + 1)
                }
            }
        }
    }

    #[test]
    fn test_call_shapes() {
        // no operand list behaves like an empty one
        assert_eq!(BuiltinPrimitives.call("LIST", None).unwrap(), nil());
        assert_eq!(BuiltinPrimitives.call("LIST", Some(&nil())).unwrap(), nil());
        assert!(matches!(
            BuiltinPrimitives.call("CAR", None).unwrap_err(),
            Error::Arity { got: 0, .. }
        ));
        assert!(matches!(
            BuiltinPrimitives.call("CAR", Some(&int(1))).unwrap_err(),
            Error::Type(_)
        ));
        assert_eq!(
            BuiltinPrimitives.call("FROB", None).unwrap_err(),
            Error::UndefinedFunction("FROB".into())
        );
    }

    #[test]
    fn test_arity_validation() {
        use Arity::*;

        Exact(2).validate("F", 2).unwrap();
        Exact(2).validate("F", 1).unwrap_err();
        Exact(2).validate("F", 3).unwrap_err();
        Any.validate("F", 0).unwrap();
        Any.validate("F", 100).unwrap();

        match Exact(2).validate("F", 1).unwrap_err() {
            Error::Arity { name, expected, got } => {
                assert_eq!(name, "F");
                assert_eq!(expected, "2");
                assert_eq!(got, 1);
            }
            other => panic!("Expected ArityError, got {other:?}"),
        }
    }
}
