//! The interactive Privvy prompt.
//!
//! Each line is tokenized, parsed as a single statement, and evaluated
//! against one persistent global scope shared for the whole session, so
//! a `let` or `fun` on one line stays visible to every line after it.

use privvy_common::PrivvyError;
use privvy_parser::{Node, Parser};
use privvy_rt::Interpreter;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub const PROMPT: &str = ">>> ";
pub const BANNER: &str = "Privvy Programming Language v0.1.0";
pub const HELP_LINE: &str = "Type 'exit' or 'quit' to exit";

/// Run the prompt loop until the user exits, an unrecoverable readline
/// error occurs, or EOF is reached. Returns the number of lines that
/// evaluated successfully, mostly useful for tests.
pub fn run(show_banner: bool) -> rustyline::Result<usize> {
    if show_banner {
        println!("{BANNER}");
        println!("{HELP_LINE}");
    }

    let interpreter = Interpreter::new();
    let globals = interpreter.globals.clone();
    let mut editor = DefaultEditor::new()?;
    let mut evaluated = 0;

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);
                if trimmed == "exit" || trimmed == "quit" {
                    println!("Goodbye!");
                    break;
                }
                match eval_line(&interpreter, &globals, trimmed) {
                    Ok(Some(value)) => {
                        println!("{}", value.to_display_string());
                        evaluated += 1;
                    }
                    Ok(None) => evaluated += 1,
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("\nKeyboardInterrupt");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(evaluated)
}

fn eval_line(
    interpreter: &Interpreter,
    globals: &std::rc::Rc<std::cell::RefCell<privvy_rt::Environment>>,
    line: &str,
) -> Result<Option<privvy_rt::Value>, PrivvyError> {
    let program = Parser::parse_source(line)?;
    let statements = match &program {
        Node::Program { statements } => statements,
        _ => unreachable!("parse_source always produces a Program node"),
    };
    let mut last = None;
    for statement in statements {
        last = interpreter.interpret_repl_statement(statement, globals)?;
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use privvy_rt::Value;

    fn eval(interpreter: &Interpreter, line: &str) -> Result<Option<Value>, PrivvyError> {
        let globals = interpreter.globals.clone();
        eval_line(interpreter, &globals, line)
    }

    #[test]
    fn bare_expression_echoes_its_value() {
        let interpreter = Interpreter::new();
        let value = eval(&interpreter, "1 + 2").unwrap().unwrap();
        assert!(matches!(value, Value::Int(3)));
    }

    #[test]
    fn declarations_produce_no_echoed_value() {
        let interpreter = Interpreter::new();
        assert!(eval(&interpreter, "let x = 5").unwrap().is_none());
    }

    #[test]
    fn a_later_line_sees_an_earlier_declaration() {
        let interpreter = Interpreter::new();
        eval(&interpreter, "let x = 10").unwrap();
        let value = eval(&interpreter, "x * 2").unwrap().unwrap();
        assert!(matches!(value, Value::Int(20)));
    }

    #[test]
    fn a_function_defined_on_one_line_is_callable_on_the_next() {
        let interpreter = Interpreter::new();
        eval(&interpreter, "fun square(n) { return n * n; }").unwrap();
        let value = eval(&interpreter, "square(4)").unwrap().unwrap();
        assert!(matches!(value, Value::Int(16)));
    }

    #[test]
    fn a_runtime_error_does_not_poison_the_session() {
        let interpreter = Interpreter::new();
        assert!(eval(&interpreter, "1 / 0").is_err());
        let value = eval(&interpreter, "1 + 1").unwrap().unwrap();
        assert!(matches!(value, Value::Int(2)));
    }
}
