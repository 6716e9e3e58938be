//! Callable user code: named functions registered with `DEFUN` and anonymous
//! functions registered with `LAMBDA`. Both variants carry the same payload (an
//! ordered list of distinct parameter names and a body) and share one binding
//! routine that enforces strict arity.

use std::collections::HashMap;

use log::debug;

use crate::Error;
use crate::ast::{Node, is_valid_symbol};
use crate::evaluator::{Environment, eval};

/// Variable bindings produced by [`Function::bind`] (formal name -> evaluated actual)
pub type Bindings = HashMap<String, Node>;

/// Which kind of callable a [`Function`] is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionKind {
    /// Named function, looked up by identifier
    UserDef { name: String },
    /// Anonymous function, looked up by its formals node
    Lambda,
}

/// A user-defined callable: validated formals plus a body expression
#[derive(Debug, Clone)]
pub struct Function {
    kind: FunctionKind,
    params: Vec<String>,
    body: Node,
}

impl Function {
    /// Validate `formals` and `body` and build a function of the given kind.
    ///
    /// Both `formals` and `body` must be lists or `NIL`. Every formal must be a
    /// symbol other than `T`/`NIL`, and no formal may repeat.
    pub fn new(kind: FunctionKind, formals: &Node, body: Node) -> Result<Self, Error> {
        if !(formals.is_list() || formals.is_nil()) {
            return Err(Error::FuncDef(format!(
                "Invalid function parameters: {formals}"
            )));
        }
        if !(body.is_list() || body.is_nil()) {
            return Err(Error::FuncDef(format!("Invalid function body: {body}")));
        }
        let params = parse_params(formals)?;
        Ok(Function { kind, params, body })
    }

    pub fn user_def(name: impl Into<String>, formals: &Node, body: Node) -> Result<Self, Error> {
        Self::new(FunctionKind::UserDef { name: name.into() }, formals, body)
    }

    pub fn lambda(formals: &Node, body: Node) -> Result<Self, Error> {
        Self::new(FunctionKind::Lambda, formals, body)
    }

    pub fn kind(&self) -> &FunctionKind {
        &self.kind
    }

    /// Name used in error messages; lambdas report as `lambda`
    pub fn name(&self) -> &str {
        match &self.kind {
            FunctionKind::UserDef { name } => name,
            FunctionKind::Lambda => "lambda",
        }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn body(&self) -> &Node {
        &self.body
    }

    /// Evaluate the body in a scope where each formal is bound to the
    /// corresponding evaluated actual. The caller's variables are restored
    /// afterwards, whether or not the body succeeds.
    pub fn eval(&self, args: &Node, env: &mut Environment) -> Result<Node, Error> {
        let bindings = self.bind(args, env)?;
        debug!("calling {} with {} binding(s)", self.name(), bindings.len());
        env.call_frame(self.name(), |env| {
            env.scoped(bindings, |env| eval(&self.body, env))
        })
    }

    /// Walk `actuals` in lock-step with the formals, evaluating each actual in
    /// the caller's environment.
    ///
    /// Actuals left over once every formal is bound are not evaluated; any
    /// non-`NIL` remainder fails with [`Error::TooManyArgs`].
    pub fn bind(&self, actuals: &Node, env: &mut Environment) -> Result<Bindings, Error> {
        let mut bindings = Bindings::new();

        if !actuals.is_list() {
            if self.params.is_empty() {
                return Ok(bindings);
            }
            if actuals.is_nil() {
                return Err(Error::TooFewArgs(self.name().to_owned()));
            }
            return Err(Error::InvalidActuals(self.name().to_owned()));
        }

        let mut rest = actuals;
        for param in &self.params {
            let Some(pair) = rest.as_pair() else {
                return Err(Error::TooFewArgs(self.name().to_owned()));
            };
            let value = eval(pair.head(), env)?;
            bindings.insert(param.clone(), value);
            rest = pair.tail();
        }

        if rest.is_nil() {
            Ok(bindings)
        } else {
            Err(Error::TooManyArgs(self.name().to_owned()))
        }
    }
}

/// Turn a formals node into an ordered list of distinct parameter names
fn parse_params(formals: &Node) -> Result<Vec<String>, Error> {
    let mut params: Vec<String> = Vec::new();
    for formal in formals.iter() {
        let name = match formal.as_atom() {
            Some(atom) if is_valid_symbol(atom.literal()) && !atom.is_t() && !atom.is_nil() => {
                atom.literal()
            }
            _ => return Err(Error::InvalidParameter(formal.to_string())),
        };
        if params.iter().any(|p| p == name) {
            return Err(Error::DuplicateParameter(name.to_owned()));
        }
        params.push(name.to_owned());
    }
    Ok(params)
}

/// Remembers the formals node of the most recently registered lambda, so the
/// call site that evaluated a `LAMBDA` form can find the function it just
/// registered without re-deriving its key.
#[derive(Debug, Clone, Default)]
pub struct ClosureState {
    next_node: Option<Node>,
}

impl ClosureState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_next_node(&mut self, node: Node) {
        self.next_node = Some(node);
    }

    pub fn next_node(&self) -> Option<&Node> {
        self.next_node.as_ref()
    }

    /// Read and clear the pending formals node
    pub fn take_next_node(&mut self) -> Option<Node> {
        self.next_node.take()
    }
}
