//! Console device shared by the I/O capabilities
//!
//! Collects everything the program prints, keeps `ilog`/`slog` lines apart
//! from program output, and serves line and key input either from a
//! preloaded script or from standard input.

use crate::interpreter::errors::{VmError, VmResult};
use std::collections::VecDeque;
use std::io::BufRead;

/// Key code reported for the end of a line
pub const ENTER_KEY: i32 = 13;

#[derive(Debug)]
enum InputSource {
    Script(VecDeque<String>),
    Stdin,
}

#[derive(Debug)]
pub struct Console {
    output: String,
    log: Vec<String>,
    input: InputSource,
    keys: VecDeque<i32>,
    echo_prompts: bool,
}

impl Console {
    /// Console that reads input from standard input and echoes prompts to stderr
    pub fn interactive() -> Self {
        Console {
            output: String::new(),
            log: Vec::new(),
            input: InputSource::Stdin,
            keys: VecDeque::new(),
            echo_prompts: true,
        }
    }

    /// Console whose input is the given lines; end of script reads as end of input
    pub fn scripted<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Console {
            output: String::new(),
            log: Vec::new(),
            input: InputSource::Script(lines.into_iter().map(Into::into).collect()),
            keys: VecDeque::new(),
            echo_prompts: false,
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn log_lines(&self) -> &[String] {
        &self.log
    }

    pub fn print(&mut self, text: &str) {
        self.output.push_str(text);
    }

    pub fn log(&mut self, line: String) {
        tracing::info!(target: "tvmtty::program", "{}", line);
        self.log.push(line);
    }

    /// Next input line without its terminator, `None` at end of input
    pub fn read_line(&mut self, prompt: &str) -> VmResult<Option<String>> {
        if self.echo_prompts {
            eprint!("{} ", prompt);
        }
        match &mut self.input {
            InputSource::Script(lines) => Ok(lines.pop_front()),
            InputSource::Stdin => {
                let mut line = String::new();
                let read = std::io::stdin().lock().read_line(&mut line)?;
                if read == 0 {
                    return Ok(None);
                }
                let trimmed = line.trim_end_matches(['\r', '\n']).len();
                line.truncate(trimmed);
                Ok(Some(line))
            }
        }
    }

    /// Read a line and parse it as a decimal integer
    pub fn read_int(&mut self, prompt: &str) -> VmResult<i32> {
        let line = self.read_line(prompt)?.ok_or_else(|| VmError::InvalidInput {
            message: "end of input while reading an integer".to_string(),
        })?;
        line.trim().parse().map_err(|_| VmError::InvalidInput {
            message: format!("'{}' is not an integer", line.trim()),
        })
    }

    /// Next key code; each input line yields its characters followed by Enter
    pub fn next_key(&mut self) -> VmResult<Option<i32>> {
        if self.keys.is_empty() {
            let Some(line) = self.read_line("key:")? else {
                return Ok(None);
            };
            self.keys.extend(line.chars().map(|c| c as i32));
            self.keys.push_back(ENTER_KEY);
        }
        Ok(self.keys.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_lines_then_end() {
        let mut console = Console::scripted(["12", "hello"]);
        assert_eq!(console.read_int("n?"), Ok(12));
        assert_eq!(console.read_line("s?"), Ok(Some("hello".to_string())));
        assert_eq!(console.read_line("s?"), Ok(None));
    }

    #[test]
    fn test_bad_integer_is_invalid_input() {
        let mut console = Console::scripted(["twelve"]);
        assert!(matches!(
            console.read_int("n?"),
            Err(VmError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_keys_from_lines() {
        let mut console = Console::scripted(["ab"]);
        assert_eq!(console.next_key(), Ok(Some('a' as i32)));
        assert_eq!(console.next_key(), Ok(Some('b' as i32)));
        assert_eq!(console.next_key(), Ok(Some(ENTER_KEY)));
        assert_eq!(console.next_key(), Ok(None));
    }
}
