//! Operator confirmation prompts.
//!
//! Prompts only happen in interactive mode. Silent runs never reach a
//! [`Prompter`]; they take the conservative branch instead.

use crate::Result;
use std::io::{self, BufRead, Write};

const YES: [&str; 2] = ["y", "yes"];
const NO: [&str; 2] = ["n", "no"];

/// Asks the operator yes/no questions.
pub trait Prompter {
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Prompts on a terminal-like input/output pair.
///
/// Invalid answers are re-prompted. End of input counts as "no", so a closed
/// stdin never grants consent.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        write!(self.output, "{} (y/n) ", question)?;
        self.output.flush()?;

        loop {
            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                tracing::debug!("prompt input closed; treating as no");
                return Ok(false);
            }

            let answer = answer.trim().to_lowercase();
            if YES.contains(&answer.as_str()) {
                return Ok(true);
            }
            if NO.contains(&answer.as_str()) {
                return Ok(false);
            }

            writeln!(
                self.output,
                "Please type either 'y'/'yes' or 'n'/'no' to proceed."
            )?;
            self.output.flush()?;
        }
    }
}
