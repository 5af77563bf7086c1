use std::{
    io::{self, BufRead, Write},
    process::ExitCode,
};

use protolith::{ReplSession, ReplStep};

const ERROR_COLOR: &str = "\x1b[31m";
const RESET_COLOR: &str = "\x1b[0m";

/// Character source feeding the reader one terminal line at a time.
///
/// Prints `">> "` before the first line of a logical form and `"-- "` before
/// continuation lines. Each physical line is terminated with a synthetic
/// newline so the reader can tell where a top-level form ends.
struct ReplInput {
    line: Vec<char>,
    index: usize,
    first_prompt: bool,
    eof: bool,
}

impl ReplInput {
    fn new() -> Self {
        Self {
            line: Vec::new(),
            // Past the (empty) initial line so the first next() prompts.
            index: 1,
            first_prompt: true,
            eof: false,
        }
    }

    /// The next fetched line gets the first-line prompt again.
    fn reset_prompt(&mut self) {
        self.first_prompt = true;
    }

    /// Drops the rest of the buffered line after an error.
    fn discard_line(&mut self) {
        self.line.clear();
        self.index = 1;
    }
}

impl Iterator for ReplInput {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        if self.eof {
            return None;
        }
        if self.index > self.line.len() {
            let prompt = if self.first_prompt { ">> " } else { "-- " };
            self.first_prompt = false;
            print!("{prompt}");
            let _ = io::stdout().flush();

            let mut buffer = String::new();
            match io::stdin().lock().read_line(&mut buffer) {
                Ok(0) | Err(_) => {
                    self.eof = true;
                    return None;
                }
                Ok(_) => {
                    while buffer.ends_with('\n') || buffer.ends_with('\r') {
                        buffer.pop();
                    }
                    self.line = buffer.chars().collect();
                    self.index = 0;
                }
            }
        }
        if self.index == self.line.len() {
            self.index += 1;
            Some('\n')
        } else {
            let c = self.line[self.index];
            self.index += 1;
            Some(c)
        }
    }
}

fn main() -> ExitCode {
    let mut session = ReplSession::new();
    let mut input = ReplInput::new();

    loop {
        input.reset_prompt();
        match session.step(&mut input) {
            Ok(ReplStep::Eof) => return ExitCode::SUCCESS,
            Ok(ReplStep::Empty) => {}
            Ok(ReplStep::Value {
                rendered, expr_dump, ..
            }) => {
                if let Some(dump) = expr_dump {
                    print!("{dump}");
                }
                println!("{rendered}");
            }
            Err(error) => {
                input.discard_line();
                eprintln!("{ERROR_COLOR}{error}{RESET_COLOR}");
            }
        }
        session.collect_garbage();
    }
}
