use std::io::{self, BufRead, Write};

use crate::{context::{EvaluationContext, Outcome}, error::CalcError, lexer::TokenStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Reads statements line by line, prints each result and reports each
/// error without stopping.
///
/// Text is buffered until it holds complete statements, so a statement may
/// span several lines and one line may hold several statements.
pub struct Repl {
    context: EvaluationContext,
    prompt: String,
    continuation: String,
    pending: String,
}

impl Repl {
    pub fn new(context: EvaluationContext) -> Self {
        Self {
            context,
            prompt: "Calc> ".to_owned(),
            continuation: "...> ".to_owned(),
            pending: String::new(),
        }
    }

    pub fn with_prompts(mut self, prompt: impl Into<String>, continuation: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self.continuation = continuation.into();
        self
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    /// Runs until `quit` or the end of `input`
    pub fn run<R: BufRead, W: Write, E: Write>(&mut self, mut input: R, output: &mut W, errors: &mut E) -> io::Result<()> {
        let mut line = String::new();
        loop {
            let prompt = if self.pending.trim().is_empty() { &self.prompt } else { &self.continuation };
            output.write_all(prompt.as_bytes())?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 { break; }
            if self.feed(&line, output, errors)? == Flow::Quit {
                return Ok(())
            }
        }

        if !self.pending.trim().is_empty() {
            writeln!(errors, "{}", CalcError::IncompleteInput)?;
            self.pending.clear();
        }
        Ok(())
    }

    /// Executes every complete statement buffered so far, keeping the text
    /// of a trailing incomplete one for the next line
    pub fn feed<W: Write, E: Write>(&mut self, line: &str, output: &mut W, errors: &mut E) -> io::Result<Flow> {
        self.pending.push_str(line);
        let mut stream = TokenStream::new(&self.pending);

        while !stream.is_exhausted() {
            let start = stream.offset();
            match self.context.execute(&mut stream) {
                Ok(Outcome::Value(value)) => writeln!(output, "{}", value)?,
                Ok(Outcome::Defined(name)) => writeln!(output, "{}", name)?,
                Ok(Outcome::Quit) => {
                    self.pending.clear();
                    return Ok(Flow::Quit)
                }
                Err(CalcError::IncompleteInput) => {
                    self.pending.replace_range(..start, "");
                    return Ok(Flow::Continue)
                }
                Err(err) => writeln!(errors, "{}", err)?,
            }
        }

        self.pending.clear();
        Ok(Flow::Continue)
    }
}
