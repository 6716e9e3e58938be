use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::{debug, trace};

use crate::Error;
use crate::MAX_CALL_DEPTH;
use crate::ast::{Atom, Node, SExpression};
use crate::builtinops::{BuiltinPrimitives, PrimitiveHandler};
use crate::function::{Bindings, ClosureState, Function};

/// Reserved names of the anonymous function form, matched case-insensitively
const LAMBDA_NAMES: [&str; 2] = ["lambda", "λ"];

fn is_lambda_name(name: &str) -> bool {
    LAMBDA_NAMES.contains(&name.to_lowercase().as_str())
}

/// The working d-list of a program: named functions, anonymous functions keyed
/// by their formals node, and variable bindings, plus the primitive handler
/// that built-in calls are routed to.
///
/// An `Environment` is an explicit evaluation context. Independent interpreters
/// simply use independent environments.
pub struct Environment {
    functions: HashMap<String, Rc<Function>>,
    lambdas: HashMap<Node, Rc<Function>>,
    variables: HashMap<String, Node>,
    closure: ClosureState,
    handler: Box<dyn PrimitiveHandler>,
    call_depth: usize,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("lambdas", &self.lambdas.keys().collect::<Vec<_>>())
            .field("variables", &self.variables)
            .field("closure", &self.closure)
            .finish_non_exhaustive()
    }
}

impl Environment {
    /// Create an environment backed by the built-in primitive table
    pub fn new() -> Self {
        Self::with_handler(Box::new(BuiltinPrimitives))
    }

    /// Create an environment that routes primitive calls to `handler`
    pub fn with_handler(handler: Box<dyn PrimitiveHandler>) -> Self {
        Environment {
            functions: HashMap::new(),
            lambdas: HashMap::new(),
            variables: HashMap::new(),
            closure: ClosureState::new(),
            handler,
            call_depth: 0,
        }
    }

    /// Execute the named user function with unevaluated actuals `args`
    pub fn exec_func(&mut self, name: &str, args: &Node) -> Result<Node, Error> {
        let func = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UndefinedFunction(name.to_owned()))?;
        func.eval(args, self)
    }

    /// Execute the lambda registered under `formals` with unevaluated actuals `args`
    pub fn exec_lamb(&mut self, formals: &Node, args: &Node) -> Result<Node, Error> {
        let func = self
            .lambdas
            .get(formals)
            .cloned()
            .ok_or_else(|| Error::UndefinedLambda(formals.to_string()))?;
        func.eval(args, self)
    }

    /// Register (or overwrite) a named function.
    ///
    /// `lambda` and `λ` are reserved for anonymous registration in any case.
    pub fn register_func(&mut self, name: &str, formals: &Node, body: Node) -> Result<(), Error> {
        if is_lambda_name(name) {
            return Err(Error::FuncDef(
                "Use the anonymous function registration to register a lambda expression.".into(),
            ));
        }
        let func = Function::user_def(name, formals, body)?;
        debug!("registered function {name} {formals}");
        self.functions.insert(name.to_owned(), Rc::new(func));
        Ok(())
    }

    /// Register an anonymous function keyed by its formals node and mark it as
    /// the lambda the next call site should resolve to.
    pub fn register_anon(&mut self, formals: &Node, body: Node) -> Result<(), Error> {
        let func = Function::lambda(formals, body)?;
        debug!("registered lambda {formals}");
        self.lambdas.insert(formals.clone(), Rc::new(func));
        self.closure.set_next_node(formals.clone());
        Ok(())
    }

    /// Merge `table` into the live variables and return a snapshot of the result
    pub fn substitute(&mut self, table: Bindings) -> Bindings {
        self.variables.extend(table);
        self.get_variables()
    }

    pub fn unbind(&mut self, name: &str) -> Result<(), Error> {
        self.variables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::UndefinedVariable(name.to_owned()))
    }

    /// Remove several bindings at once. If any name is unbound nothing is
    /// removed and the first missing name is reported.
    pub fn unbind_multi<I, S>(&mut self, names: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        if let Some(missing) = names.iter().find(|name| !self.is_defined_v(name.as_ref())) {
            return Err(Error::UndefinedVariable(missing.as_ref().to_owned()));
        }
        for name in &names {
            self.variables.remove(name.as_ref());
        }
        Ok(())
    }

    pub fn is_defined_f(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn is_defined_v(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn get_variable_value(&self, name: &str) -> Result<&Node, Error> {
        self.variables
            .get(name)
            .ok_or_else(|| Error::UndefinedVariable(name.to_owned()))
    }

    /// Snapshot of the variable table
    pub fn get_variables(&self) -> Bindings {
        self.variables.clone()
    }

    /// Snapshot of the lambda table
    pub fn get_lambdas(&self) -> HashMap<Node, Rc<Function>> {
        self.lambdas.clone()
    }

    /// Snapshot of the named function table
    pub fn get_functions(&self) -> HashMap<String, Rc<Function>> {
        self.functions.clone()
    }

    /// Replace the variable table wholesale, e.g. to restore a saved scope
    pub fn set_variables(&mut self, values: Bindings) {
        self.variables = values;
    }

    /// Invoke a primitive through the handler. No validation happens here.
    pub fn invoke_prim(&self, name: &str, formals: Option<&Node>) -> Result<Node, Error> {
        self.handler.call(name, formals)
    }

    pub fn handler(&self) -> &dyn PrimitiveHandler {
        self.handler.as_ref()
    }

    pub fn closure_state(&self) -> &ClosureState {
        &self.closure
    }

    /// Run `body` with `bindings` layered over the current variables, then
    /// restore the variables as they were before, on success and on error.
    pub(crate) fn scoped<F>(&mut self, bindings: Bindings, body: F) -> Result<Node, Error>
    where
        F: FnOnce(&mut Environment) -> Result<Node, Error>,
    {
        let saved = self.get_variables();
        self.substitute(bindings);
        let result = body(self);
        self.set_variables(saved);
        trace!("scope restored ({} variable(s))", self.variables.len());
        result
    }

    /// Run `body` as one level of user function or lambda call
    pub(crate) fn call_frame<F>(&mut self, name: &str, body: F) -> Result<Node, Error>
    where
        F: FnOnce(&mut Environment) -> Result<Node, Error>,
    {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(Error::Eval(format!(
                "Call depth limit exceeded in {name} (max: {MAX_CALL_DEPTH})"
            )));
        }
        self.call_depth += 1;
        let result = body(self);
        self.call_depth -= 1;
        result
    }
}

/// Evaluate an S-expression (public API)
pub fn eval(expr: &Node, env: &mut Environment) -> Result<Node, Error> {
    match expr {
        Node::Atom(atom) => Ok(eval_atom(atom, env)),
        Node::Pair(pair) => eval_pair(pair, env).map_err(|err| add_context(err, expr)),
    }
}

/// Helper function to add expression context to errors
fn add_context(error: Error, expr: &Node) -> Error {
    let context = format!("while evaluating: {expr}");
    match error {
        Error::Eval(msg) if !msg.contains("Context:") => {
            Error::Eval(format!("{msg}\n  Context: {context}"))
        }
        Error::Type(msg) if !msg.contains("Context:") => {
            Error::Type(format!("{msg}\n  Context: {context}"))
        }
        // Other errors already name their culprit
        other => other,
    }
}

/// Bound variables evaluate to their value; everything else evaluates to itself
fn eval_atom(atom: &Atom, env: &Environment) -> Node {
    if atom.is_symbol()
        && let Ok(value) = env.get_variable_value(atom.literal())
    {
        trace!("variable {atom} -> {value}");
        return value.clone();
    }
    atom.eval()
}

/// Evaluate a list form: special form, function application or lambda application
fn eval_pair(pair: &SExpression, env: &mut Environment) -> Result<Node, Error> {
    match pair.head() {
        Node::Atom(atom) if atom.is_symbol() => apply_symbol(atom.literal(), pair, env),
        head @ Node::Pair(_) => {
            let callee = eval(head, env)?;
            apply_lambda_value(&callee, pair.tail(), env)
        }
        Node::Atom(atom) => Err(Error::Eval(format!("{atom} is not a function name"))),
    }
}

/// Dispatch on the operator symbol of a list form
fn apply_symbol(name: &str, form: &SExpression, env: &mut Environment) -> Result<Node, Error> {
    let operands = form.tail();

    if let Some(special) = SpecialForm::from_name(name) {
        return special.eval(form, env);
    }
    if env.is_defined_f(name) {
        return env.exec_func(name, operands);
    }
    if env.handler().is_primitive(name) {
        let args = eval_operands(operands, env)?;
        return env.invoke_prim(name, Some(&args));
    }
    if env.is_defined_v(name) {
        let callee = env.get_variable_value(name)?.clone();
        return apply_lambda_value(&callee, operands, env);
    }
    Err(Error::UndefinedFunction(name.to_owned()))
}

/// Evaluate each operand left to right into a new list
fn eval_operands(operands: &Node, env: &mut Environment) -> Result<Node, Error> {
    let values = operands
        .iter()
        .map(|operand| eval(operand, env))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Node::list(values))
}

/// Split a `(LAMBDA formals body)` value into its formals and body
fn lambda_parts(node: &Node) -> Option<(&Node, &Node)> {
    let mut parts = node.iter();
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(keyword), Some(formals), Some(body), None)
            if keyword.as_symbol().is_some_and(is_lambda_name) =>
        {
            Some((formals, body))
        }
        _ => None,
    }
}

/// Apply a lambda value to unevaluated actuals.
///
/// The lambda is normally the one whose registration just happened while the
/// callee was evaluated; the pending formals node in the closure state says so.
/// When nothing matching is pending (for example a lambda passed in through a
/// variable) the form is registered again before the call.
fn apply_lambda_value(callee: &Node, operands: &Node, env: &mut Environment) -> Result<Node, Error> {
    let (formals, body) = lambda_parts(callee)
        .ok_or_else(|| Error::Eval(format!("{callee} is not a function")))?;

    let pending = env.closure.take_next_node();
    let registered = pending.as_ref() == Some(formals)
        && env.lambdas.get(formals).is_some_and(|f| f.body() == body);
    if !registered {
        trace!("re-registering lambda {formals}");
        env.register_anon(formals, body.clone())?;
        env.closure.take_next_node();
    }
    env.exec_lamb(formals, operands)
}

/// Forms that receive their operands unevaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecialForm {
    Quote,
    Cond,
    Defun,
    Lambda,
    Let,
}

impl SpecialForm {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "quote" => Some(SpecialForm::Quote),
            "cond" => Some(SpecialForm::Cond),
            "defun" => Some(SpecialForm::Defun),
            "lambda" | "λ" => Some(SpecialForm::Lambda),
            "let" => Some(SpecialForm::Let),
            _ => None,
        }
    }

    fn eval(self, form: &SExpression, env: &mut Environment) -> Result<Node, Error> {
        match self {
            SpecialForm::Quote => eval_quote(form.tail()),
            SpecialForm::Cond => eval_cond(form.tail(), env),
            SpecialForm::Defun => eval_defun(form.tail(), env),
            SpecialForm::Lambda => eval_lambda(form, env),
            SpecialForm::Let => eval_let(form.tail(), env),
        }
    }
}

/// Collect exactly `N` operands of a special form
fn operands_of<'a, const N: usize>(
    keyword: &str,
    operands: &'a Node,
) -> Result<[&'a Node; N], Error> {
    let items: Vec<&'a Node> = operands.iter().collect();
    items.try_into().map_err(|items: Vec<&'a Node>| {
        Error::Eval(format!(
            "{keyword} expects {N} operand(s), got {}",
            items.len()
        ))
    })
}

/// Evaluate QUOTE special form
fn eval_quote(operands: &Node) -> Result<Node, Error> {
    let [expr] = operands_of::<1>("QUOTE", operands)?;
    Ok(expr.clone())
}

/// Evaluate COND special form: the first clause whose test is not NIL wins
fn eval_cond(clauses: &Node, env: &mut Environment) -> Result<Node, Error> {
    for clause in clauses.iter() {
        let [test, expr] = operands_of::<2>("COND clause", clause)?;
        if !eval(test, env)?.is_nil() {
            return eval(expr, env);
        }
    }
    Err(Error::Eval("COND: no clause has a non-NIL test".into()))
}

/// Evaluate DEFUN special form, returning the function name
fn eval_defun(operands: &Node, env: &mut Environment) -> Result<Node, Error> {
    let [name, formals, body] = operands_of::<3>("DEFUN", operands)?;
    let id = match name.as_atom() {
        Some(atom) if atom.is_symbol() && !atom.is_t() && !atom.is_nil() => atom.literal(),
        _ => return Err(Error::FuncDef(format!("Invalid function name: {name}"))),
    };
    if SpecialForm::from_name(id).is_some() && !is_lambda_name(id) {
        return Err(Error::FuncDef(format!("Cannot redefine special form {id}")));
    }
    env.register_func(id, formals, body.clone())?;
    Ok(name.clone())
}

/// Evaluate LAMBDA special form. The form itself is the lambda value.
fn eval_lambda(form: &SExpression, env: &mut Environment) -> Result<Node, Error> {
    let [formals, body] = operands_of::<2>("LAMBDA", form.tail())?;
    env.register_anon(formals, body.clone())?;
    Ok(Node::Pair(form.clone()))
}

/// Evaluate LET special form: `(LET ((name expr) ...) body)`
fn eval_let(operands: &Node, env: &mut Environment) -> Result<Node, Error> {
    let [bindings, body] = operands_of::<2>("LET", operands)?;
    if !(bindings.is_list() || bindings.is_nil()) {
        return Err(Error::Eval(format!("LET bindings must be a list, got {bindings}")));
    }

    let mut table = Bindings::new();
    for binding in bindings.iter() {
        let [name, expr] = operands_of::<2>("LET binding", binding)?;
        let id = match name.as_atom() {
            Some(atom) if atom.is_symbol() && !atom.is_t() && !atom.is_nil() => atom.literal(),
            _ => return Err(Error::InvalidParameter(name.to_string())),
        };
        if table.contains_key(id) {
            return Err(Error::DuplicateParameter(id.to_owned()));
        }
        let value = eval(expr, env)?;
        table.insert(id.to_owned(), value);
    }

    env.scoped(table, |env| eval(body, env))
}
