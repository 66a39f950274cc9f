//! duMalloc shell
//!
//! Interactive heap driver and script runner.
//!
//! ```text
//! dumalloc [--first-fit | --best-fit] [script]
//! ```

use dumalloc::shell::{Outcome, Shell};
use dumalloc::{HeapConfig, Strategy};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut strategy = Strategy::FirstFit;
    let mut script = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--first-fit" => strategy = Strategy::FirstFit,
            "--best-fit" => strategy = Strategy::BestFit,
            _ => script = Some(arg),
        }
    }

    let mut shell = match Shell::new(HeapConfig::new(strategy)) {
        Ok(shell) => shell,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match script {
        Some(path) => run_file(&mut shell, &path),
        None => run_repl(&mut shell),
    }
}

fn run_file(shell: &mut Shell, filename: &str) {
    let source = match std::fs::read_to_string(filename) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", filename, e);
            std::process::exit(1);
        }
    };

    for (number, line) in source.lines().enumerate() {
        match shell.execute(line) {
            Ok(Outcome::Output(text)) => {
                if !text.is_empty() {
                    println!("{}", text);
                }
            }
            Ok(Outcome::Quit) => break,
            Err(e) => {
                eprintln!("{}:{}: {}", filename, number + 1, e);
                std::process::exit(1);
            }
        }
    }
}

fn run_repl(shell: &mut Shell) {
    println!("duMalloc - generational heap shell");
    println!("Type 'help' for commands, Ctrl+D to exit.\n");

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Error starting line editor: {}", e);
            std::process::exit(1);
        }
    };

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());

                match shell.execute(&line) {
                    Ok(Outcome::Output(text)) => println!("{}", text),
                    Ok(Outcome::Quit) => break,
                    Err(e) => println!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        }
    }
}
