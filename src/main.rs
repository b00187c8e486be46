use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use sable::{Value, Vm};

#[derive(Parser)]
#[command(name = "sable", version, about = "The sable interpreter")]
struct Cli {
  /// Dump the AST, bytecode and execution trace
  #[arg(short = 'd', long = "debug")]
  debug: bool,
  /// Script to run
  entry: PathBuf,
  /// Arguments passed to the script's `main`
  args: Vec<String>,
}

fn main() -> Result<()> {
  env_logger::init();
  let cli = Cli::parse();

  let source = fs::read_to_string(&cli.entry)
    .with_context(|| format!("failed to read {}", cli.entry.display()))?;
  let module = cli.entry.display().to_string();

  let mut vm = Vm::new(|message| eprintln!("sable error: {message}"));
  vm.debug = cli.debug;

  let entry = vm.compile(&source, &module);
  if entry.is_null() {
    return Ok(());
  }

  // the entry function returns the script's `main`
  vm.interpret(entry, 0);
  if vm.stack_len() == 0 {
    return Ok(());
  }
  let main = vm.pop();
  vm.reset_stack();
  let Some(function) = main.to_function() else {
    return Ok(());
  };

  // main(argv) when it takes arguments, main(argv, env) when it takes two
  let mut args = Vec::new();
  if function.arity >= 1 {
    args.push(make_argv(&mut vm, &module, &cli.args));
  }
  if function.arity >= 2 {
    args.push(make_env(&mut vm));
  }
  vm.call(main, &args);

  Ok(())
}

/// The script path followed by its arguments, as an Array of Strings.
fn make_argv(vm: &mut Vm, entry: &str, args: &[String]) -> Value {
  let mut argv = vm.new_array();
  let name = vm.new_string(entry);
  argv.values.push(Value::object(name));
  for arg in args {
    let arg = vm.new_string(arg);
    argv.values.push(Value::object(arg));
  }
  Value::object(argv)
}

/// The process environment as a Table of String to String, split on the
/// first `=` of each entry.
fn make_env(vm: &mut Vm) -> Value {
  let mut env = vm.new_table();
  for (key, value) in std::env::vars() {
    let key = vm.new_string(&key);
    let value = vm.new_string(&value);
    env.set(Value::object(key), Value::object(value));
  }
  Value::object(env)
}
