//! Whole-program evaluation: read every top-level form, evaluate it, and write
//! its result to an output sink.

use std::io::Write;
use std::thread;

use log::{debug, info};

use crate::{EVAL_STACK_SIZE, Error};
use crate::ast::Node;
use crate::evaluator::{Environment, eval};
use crate::reader::{ParseConfig, parse_node_with_config, parse_program_with_config};

/// Evaluate every form in `source`, writing one rendered result per line.
///
/// Returns the number of forms evaluated. The first failure aborts the run;
/// results already written stay written.
pub fn run<W: Write>(source: &str, env: &mut Environment, out: &mut W) -> Result<usize, Error> {
    run_with_config(source, env, out, ParseConfig::default())
}

pub fn run_with_config<W: Write>(
    source: &str,
    env: &mut Environment,
    out: &mut W,
    config: ParseConfig,
) -> Result<usize, Error> {
    let program = parse_program_with_config(source, config)?;
    info!("evaluating {} form(s)", program.len());

    for (index, form) in program.iter().enumerate() {
        debug!("form #{}: {form}", index + 1);
        let result = eval(form, env)?;
        writeln!(out, "{result}")?;
    }
    out.flush()?;
    Ok(program.len())
}

/// Run `f` on a thread whose stack holds [`MAX_CALL_DEPTH`](crate::MAX_CALL_DEPTH)
/// nested calls, and wait for its result.
///
/// The [`Environment`] should be created inside `f`.
pub fn on_eval_stack<T, F>(f: F) -> Result<T, Error>
where
    F: FnOnce() -> Result<T, Error> + Send,
    T: Send,
{
    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name("lispreter-eval".into())
            .stack_size(EVAL_STACK_SIZE)
            .spawn_scoped(scope, f)?;
        handle
            .join()
            .map_err(|_| Error::Eval("evaluation thread panicked".into()))?
    })
}

/// Parse and evaluate a single expression
pub fn eval_str(source: &str, env: &mut Environment) -> Result<Node, Error> {
    let expr = parse_node_with_config(source, ParseConfig::default())?;
    eval(&expr, env)
}
