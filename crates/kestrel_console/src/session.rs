//! The embedding contract: prompt, feed, result.

use crate::parser::LineParser;

/// One executed statement's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// The runtime's textual output.
    pub output: String,
    /// Whether execution failed.
    pub is_error: bool,
}

/// The scripting runtime behind the console.
///
/// The engine never depends on what language sits here: the GUI (or the
/// hook runner) produces the prompt, feeds submitted lines, and receives
/// textual results with an error flag.
pub trait Runtime {
    /// Executes one complete statement.
    fn execute(&mut self, statement: &str) -> ExecResult;
}

/// A console session: the line parser plus a runtime.
pub struct Session<R: Runtime> {
    parser: LineParser,
    runtime: R,
    primary_prompt: String,
    continuation_prompt: String,
}

impl<R: Runtime> Session<R> {
    /// Creates a session with the default prompts.
    pub fn new(runtime: R) -> Self {
        Self {
            parser: LineParser::new(),
            runtime,
            primary_prompt: ">>> ".to_string(),
            continuation_prompt: "... ".to_string(),
        }
    }

    /// Returns the prompt to display before the next line.
    pub fn prompt(&self) -> &str {
        if self.parser.is_continuing() {
            &self.continuation_prompt
        } else {
            &self.primary_prompt
        }
    }

    /// Feeds one submitted line, executing any statements it completes.
    pub fn feed_line(&mut self, line: &str) -> Vec<ExecResult> {
        self.parser
            .feed(line)
            .iter()
            .map(|stmt| self.runtime.execute(stmt))
            .collect()
    }

    /// Ends the input stream, executing any pending statement.
    pub fn finish(&mut self) -> Option<ExecResult> {
        self.parser.flush().map(|stmt| self.runtime.execute(&stmt))
    }

    /// Returns the runtime.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }
}

/// A trivial runtime that echoes statements back; used by the hook runner
/// and the tests.
#[derive(Debug, Default)]
pub struct EchoRuntime {
    /// Every statement executed so far.
    pub executed: Vec<String>,
}

impl Runtime for EchoRuntime {
    fn execute(&mut self, statement: &str) -> ExecResult {
        self.executed.push(statement.to_string());
        ExecResult {
            output: statement.to_string(),
            is_error: false,
        }
    }
}
