//! Line-wise statement chunking.

/// The parser's current multi-line state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseState {
    /// Between statements.
    Ready,
    /// Inside an indented block opened by a line ending in `:`. The block
    /// ends at the first non-empty line that does not carry the block's
    /// indentation.
    Block {
        /// The indentation token of the block body (empty until the first
        /// body line fixes it).
        indent: String,
        /// Lines collected so far.
        buffer: Vec<String>,
    },
    /// After a trailing-backslash line.
    Continuation {
        /// Lines collected so far, with continuations stripped.
        buffer: Vec<String>,
    },
    /// Inside unbalanced brackets.
    Bracket {
        /// The stack of currently open brackets.
        stack: Vec<char>,
        /// Lines collected so far.
        buffer: Vec<String>,
    },
}

const OPENING: &[char] = &['(', '[', '{'];
const CLOSING: &[char] = &[')', ']', '}'];

fn matching_open(close: char) -> char {
    match close {
        ')' => '(',
        ']' => '[',
        _ => '{',
    }
}

/// Pushes a line's brackets onto `stack`; returns `false` on mismatch.
fn load_brackets(line: &str, stack: &mut Vec<char>) -> bool {
    for c in line.chars() {
        if OPENING.contains(&c) {
            stack.push(c);
        } else if CLOSING.contains(&c) {
            match stack.pop() {
                Some(open) if open == matching_open(c) => {}
                _ => return false,
            }
        }
    }
    true
}

fn leading_whitespace(line: &str) -> String {
    line.chars().take_while(|c| c.is_whitespace()).collect()
}

/// The statement chunker: feed lines in, completed statements come out in
/// order.
#[derive(Debug)]
pub struct LineParser {
    state: ParseState,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser {
    /// Creates a parser in the ready state.
    pub fn new() -> Self {
        Self {
            state: ParseState::Ready,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> &ParseState {
        &self.state
    }

    /// Returns `true` if a multi-line construct is open (the prompt should
    /// switch to its continuation form).
    pub fn is_continuing(&self) -> bool {
        !matches!(self.state, ParseState::Ready)
    }

    /// Feeds one line, returning every statement it completed. A line that
    /// both closes an indented block and starts something new yields the
    /// block first.
    pub fn feed(&mut self, line: &str) -> Vec<String> {
        let mut completed = Vec::new();
        self.feed_into(line, &mut completed);
        completed
    }

    fn feed_into(&mut self, line: &str, completed: &mut Vec<String>) {
        let state = std::mem::replace(&mut self.state, ParseState::Ready);
        match state {
            ParseState::Ready => self.feed_ready(line, completed),
            ParseState::Block { indent, buffer } => {
                self.feed_block(line, indent, buffer, completed)
            }
            ParseState::Continuation { buffer } => self.feed_continuation(line, buffer, completed),
            ParseState::Bracket { stack, buffer } => {
                self.feed_bracket(line, stack, buffer, completed)
            }
        }
    }

    /// Flushes any pending multi-line statement (end of input).
    pub fn flush(&mut self) -> Option<String> {
        let state = std::mem::replace(&mut self.state, ParseState::Ready);
        match state {
            ParseState::Ready => None,
            ParseState::Block { buffer, .. }
            | ParseState::Continuation { buffer }
            | ParseState::Bracket { buffer, .. } => {
                if buffer.is_empty() {
                    None
                } else {
                    Some(buffer.join("\n"))
                }
            }
        }
    }

    fn feed_ready(&mut self, line: &str, completed: &mut Vec<String>) {
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            return;
        }
        if let Some(stripped) = trimmed.strip_suffix('\\') {
            self.state = ParseState::Continuation {
                buffer: vec![stripped.to_string()],
            };
            return;
        }
        let mut stack = Vec::new();
        if load_brackets(trimmed, &mut stack) && !stack.is_empty() {
            self.state = ParseState::Bracket {
                stack,
                buffer: vec![trimmed.to_string()],
            };
            return;
        }
        if trimmed.ends_with(':') {
            self.state = ParseState::Block {
                indent: String::new(),
                buffer: vec![trimmed.to_string()],
            };
            return;
        }
        completed.push(trimmed.to_string());
    }

    fn feed_block(
        &mut self,
        line: &str,
        mut indent: String,
        mut buffer: Vec<String>,
        completed: &mut Vec<String>,
    ) {
        let trimmed_end = line.trim_end();
        if trimmed_end.is_empty() {
            // A blank line closes the block.
            completed.push(buffer.join("\n"));
            return;
        }
        if indent.is_empty() {
            // The first body line fixes the block indentation.
            indent = leading_whitespace(trimmed_end);
            if indent.is_empty() {
                // Not indented: the block is over; this line stands alone.
                completed.push(buffer.join("\n"));
                self.feed_into(trimmed_end, completed);
                return;
            }
            buffer.push(trimmed_end.to_string());
            self.state = ParseState::Block { indent, buffer };
            return;
        }
        if trimmed_end.starts_with(indent.as_str()) {
            buffer.push(trimmed_end.to_string());
            self.state = ParseState::Block { indent, buffer };
        } else {
            completed.push(buffer.join("\n"));
            self.feed_into(trimmed_end, completed);
        }
    }

    fn feed_continuation(
        &mut self,
        line: &str,
        mut buffer: Vec<String>,
        completed: &mut Vec<String>,
    ) {
        let trimmed = line.trim_end();
        if let Some(stripped) = trimmed.strip_suffix('\\') {
            buffer.push(stripped.to_string());
            self.state = ParseState::Continuation { buffer };
        } else {
            buffer.push(trimmed.to_string());
            completed.push(buffer.join(" "));
        }
    }

    fn feed_bracket(
        &mut self,
        line: &str,
        mut stack: Vec<char>,
        mut buffer: Vec<String>,
        completed: &mut Vec<String>,
    ) {
        let trimmed = line.trim_end();
        buffer.push(trimmed.to_string());
        if !load_brackets(trimmed, &mut stack) {
            // Mismatched bracket: hand the whole mess to the runtime, which
            // reports the syntax error.
            completed.push(buffer.join("\n"));
            return;
        }
        if stack.is_empty() {
            completed.push(buffer.join("\n"));
        } else {
            self.state = ParseState::Bracket { stack, buffer };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(parser: &mut LineParser, lines: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        for line in lines {
            out.extend(parser.feed(line));
        }
        if let Some(stmt) = parser.flush() {
            out.push(stmt);
        }
        out
    }

    #[test]
    fn simple_statements_pass_through() {
        let mut parser = LineParser::new();
        let stmts = feed_all(&mut parser, &["x = 1", "print(x)"]);
        assert_eq!(stmts, vec!["x = 1", "print(x)"]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut parser = LineParser::new();
        let stmts = feed_all(&mut parser, &["", "  ", "a = 2"]);
        assert_eq!(stmts, vec!["a = 2"]);
    }

    #[test]
    fn indented_block_collects_until_blank() {
        let mut parser = LineParser::new();
        let stmts = feed_all(
            &mut parser,
            &["for i in range(10):", "    print(i)", "    print(i*i)", ""],
        );
        assert_eq!(
            stmts,
            vec!["for i in range(10):\n    print(i)\n    print(i*i)"]
        );
    }

    #[test]
    fn dedent_closes_block_and_keeps_the_line() {
        let mut parser = LineParser::new();
        let stmts = feed_all(&mut parser, &["if x:", "    y()", "z()"]);
        assert_eq!(stmts, vec!["if x:\n    y()", "z()"]);
    }

    #[test]
    fn backslash_continuation_joins_lines() {
        let mut parser = LineParser::new();
        let stmts = feed_all(&mut parser, &["a = 1 + \\", "    2"]);
        assert_eq!(stmts, vec!["a = 1 +     2"]);
    }

    #[test]
    fn bracket_continuation_spans_lines() {
        let mut parser = LineParser::new();
        let stmts = feed_all(&mut parser, &["f(1,", "  2,", "  3)"]);
        assert_eq!(stmts, vec!["f(1,\n  2,\n  3)"]);
        assert!(!parser.is_continuing());
    }

    #[test]
    fn nested_brackets_tracked() {
        let mut parser = LineParser::new();
        assert!(parser.feed("a = [ (1,").is_empty());
        assert!(matches!(parser.state(), ParseState::Bracket { stack, .. } if stack.len() == 2));
        assert_eq!(parser.feed("2) ]"), vec!["a = [ (1,\n2) ]"]);
    }

    #[test]
    fn mismatched_bracket_flushes_for_error_reporting() {
        let mut parser = LineParser::new();
        assert!(parser.feed("f(1,").is_empty());
        let out = parser.feed("2]");
        assert_eq!(out.len(), 1);
        assert!(!parser.is_continuing());
    }

    #[test]
    fn flush_emits_unterminated_block() {
        let mut parser = LineParser::new();
        parser.feed("while 1:");
        parser.feed("    spin()");
        assert_eq!(parser.flush(), Some("while 1:\n    spin()".to_string()));
    }

    #[test]
    fn dedent_into_new_block() {
        let mut parser = LineParser::new();
        let stmts = feed_all(&mut parser, &["if a:", "    b()", "if c:", "    d()", ""]);
        assert_eq!(stmts, vec!["if a:\n    b()", "if c:\n    d()"]);
    }
}
