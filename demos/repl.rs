use lispreter::builtinops::get_builtin_ops;
use lispreter::driver;
use lispreter::evaluator::Environment;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io;
use std::panic;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let result = panic::catch_unwind(|| {
        driver::on_eval_stack(|| {
            run_repl();
            Ok(())
        })
    });

    match result {
        Ok(Ok(())) => {}
        // A panic on the evaluation thread surfaces here
        Ok(Err(err)) => {
            eprintln!("The REPL encountered an unexpected error and must exit.");
            eprintln!("Error: {err}");
            process::exit(1);
        }
        Err(panic_info) => {
            eprintln!("The REPL encountered an unexpected error and must exit.");

            if let Some(msg) = panic_info.downcast_ref::<&str>() {
                eprintln!("Error: {msg}");
            } else if let Some(msg) = panic_info.downcast_ref::<String>() {
                eprintln!("Error: {msg}");
            } else {
                eprintln!("Error: Unknown panic occurred");
            }

            process::exit(1);
        }
    }
}

fn run_repl() {
    println!("Lispreter");
    println!("Enter S-expressions like: (PLUS 1 2)");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let mut env = Environment::new();

    loop {
        match rl.readline("lisp> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&env);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                // Every form on the line is evaluated and echoed; the environment
                // keeps whatever succeeded before an error.
                if let Err(e) = driver::run(line, &mut env, &mut io::stdout()) {
                    println!("Error: {e}");
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_help() {
    println!("Lispreter commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show defined functions, lambdas and variables");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("Special forms:");
    println!("  (QUOTE x) or 'x, (COND (test expr) ...), (LET ((v expr) ...) body)");
    println!("  (DEFUN name (params) body), (LAMBDA (params) body) or (λ (params) body)");
    println!();
    println!("Primitives:");
    let mut col = 0;
    for op in get_builtin_ops() {
        print!("  {:<15}", op.name);
        col += 1;
        if col % 4 == 0 {
            println!();
        }
    }
    if col % 4 != 0 {
        println!();
    }
    println!();
    println!("Examples:");
    println!("  (DEFUN SQUARE (X) (TIMES X X))");
    println!("  (SQUARE 7)");
    println!("  ((LAMBDA (A B) (PLUS A B)) 2 3)");
    println!();
}

fn print_environment(env: &Environment) {
    let functions = env.get_functions();
    let lambdas = env.get_lambdas();
    let variables = env.get_variables();

    if functions.is_empty() && lambdas.is_empty() && variables.is_empty() {
        println!("Environment is empty.");
        return;
    }

    if !functions.is_empty() {
        println!("Functions ({}):", functions.len());
        let mut names: Vec<_> = functions.iter().collect();
        names.sort_by(|a, b| a.0.cmp(b.0));
        for (name, func) in names {
            println!("  ({name} ({}) {})", func.params().join(" "), func.body());
        }
    }

    if !lambdas.is_empty() {
        println!("Lambdas ({}):", lambdas.len());
        for (formals, func) in &lambdas {
            println!("  (LAMBDA {formals} {})", func.body());
        }
    }

    if !variables.is_empty() {
        println!("Variables ({}):", variables.len());
        for (name, value) in &variables {
            println!("  {name} = {value}");
        }
    }
}
