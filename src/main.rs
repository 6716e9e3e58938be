use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

use log::{debug, error};

use lispreter::Error;
use lispreter::driver;
use lispreter::evaluator::Environment;

const USAGE: &str = "Usage: lispreter [-i <input file>] [-o <output file>] [-d]";

/// Command line options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CliConfig {
    /// Program source; stdin when absent
    input: Option<PathBuf>,
    /// Result sink; stdout when absent
    output: Option<PathBuf>,
    /// Print error details and enable debug logging
    debug: bool,
}

impl CliConfig {
    fn from_args<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = CliConfig::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_owned(), Some(value.to_owned())),
                None => (arg, None),
            };
            match flag.as_str() {
                "-d" | "--debug" if inline.is_none() => config.debug = true,
                "-i" | "--input" => {
                    let path = inline
                        .or_else(|| args.next())
                        .ok_or_else(|| format!("{flag} requires a file name"))?;
                    config.input = Some(PathBuf::from(path));
                }
                "-o" | "--output" => {
                    let path = inline
                        .or_else(|| args.next())
                        .ok_or_else(|| format!("{flag} requires a file name"))?;
                    config.output = Some(PathBuf::from(path));
                }
                _ => return Err(format!("Unknown argument: {flag}")),
            }
        }
        Ok(config)
    }
}

fn read_source(config: &CliConfig) -> Result<String, Error> {
    match &config.input {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

fn execute(config: &CliConfig) -> Result<usize, Error> {
    let source = read_source(config)?;
    let mut env = Environment::new();
    let mut out: Box<dyn Write> = match &config.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    driver::run(&source, &mut env, &mut out)
}

fn main() {
    let config = match CliConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    let default_level = if config.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    debug!("{config:?}");

    match driver::on_eval_stack(|| execute(&config)) {
        Ok(count) => debug!("evaluated {count} form(s)"),
        Err(err) => {
            error!("{err}");
            eprintln!("Error occurred!");
            if config.debug {
                eprintln!("{err}");
            } else {
                eprintln!("Specify '-d' to debug the error!");
            }
            process::exit(1);
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliConfig, String> {
        CliConfig::from_args(args.iter().map(|s| (*s).to_owned()))
    }

    #[test]
    fn test_cli_args() {
        assert_eq!(parse(&[]).unwrap(), CliConfig::default());

        let config = parse(&["-i", "prog.lisp", "-o", "out.txt", "-d"]).unwrap();
        assert_eq!(config.input, Some(PathBuf::from("prog.lisp")));
        assert_eq!(config.output, Some(PathBuf::from("out.txt")));
        assert!(config.debug);

        let config = parse(&["--input=a.lisp", "--debug"]).unwrap();
        assert_eq!(config.input, Some(PathBuf::from("a.lisp")));
        assert!(config.output.is_none());
        assert!(config.debug);

        let config = parse(&["-o=b.txt"]).unwrap();
        assert_eq!(config.output, Some(PathBuf::from("b.txt")));
    }

    #[test]
    fn test_cli_usage_errors() {
        assert!(parse(&["-i"]).unwrap_err().contains("requires a file name"));
        assert!(parse(&["--output"]).is_err());
        assert!(parse(&["-x"]).unwrap_err().contains("Unknown argument: -x"));
        assert!(parse(&["-d=yes"]).is_err());
        assert!(parse(&["prog.lisp"]).is_err());
    }
}
