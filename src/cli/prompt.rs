//! Yes/no confirmation.

use crate::error::Result;
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Invalid answers accepted before the question counts as declined.
pub const MAX_INVALID_ANSWERS: usize = 3;

/// Ask `question` on stdout and read the answer from stdin.
///
/// # Errors
///
/// Returns an error if the terminal cannot be read or written.
pub fn confirm(question: &str) -> Result<bool> {
    let stdin = io::stdin();
    confirm_with(question, &mut stdin.lock(), &mut io::stdout())
}

/// Ask until the answer is yes or no. End of input, or too many invalid
/// answers, is a no.
///
/// # Errors
///
/// Returns an error if `input` or `output` fails.
pub fn confirm_with<R: BufRead, W: Write>(
    question: &str,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    let mut invalid = 0;
    loop {
        write!(output, "{question} [y/n] ")?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            return Ok(false);
        }
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            other => {
                invalid += 1;
                if invalid >= MAX_INVALID_ANSWERS {
                    warn!(answer = other, "Too many invalid answers, assuming no");
                    return Ok(false);
                }
                writeln!(output, "Please answer y or n.")?;
            }
        }
    }
}
