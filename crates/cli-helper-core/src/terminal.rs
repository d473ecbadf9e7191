//! Line-oriented terminal used by the session and the presenter.

use std::io::{BufRead, Write};

use crate::errors::AssistantError;

pub trait Terminal {
    /// Print `prompt` without a newline and read one line.
    ///
    /// Returns `None` at end of input. The trailing line break is stripped.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, AssistantError>;

    fn write_line(&mut self, line: &str) -> Result<(), AssistantError>;
}

/// Terminal over any reader and writer; `stdin`/`stdout` in the binary.
pub struct StdTerminal<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> StdTerminal<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl<R: BufRead, W: Write> Terminal for StdTerminal<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, AssistantError> {
        write!(self.writer, "{}", prompt)?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    fn write_line(&mut self, line: &str) -> Result<(), AssistantError> {
        writeln!(self.writer, "{}", line)?;
        Ok(())
    }
}
