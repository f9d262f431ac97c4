//! Shell-like splitting of operator input into a command word and arguments.
//!
//! Supports single and double quotes and backslash escapes:
//!
//! ```text
//! subset "My Question" 'Someone\'s name'  ->  subset, [My Question, Someone's name]
//! ```

/// Errors produced while splitting a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    /// Input ended right after a backslash.
    #[error("unfinished escape at end of input")]
    UnterminatedEscape,

    /// Input ended while a quoted run was still open.
    #[error("unclosed {quote} quote in input")]
    UnterminatedQuote { quote: char },
}

/// One line of operator input, split into a command word and its arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    /// First token, or empty for blank input.
    pub command: String,
    /// Remaining tokens in input order.
    pub args: Vec<String>,
}

impl CommandLine {
    /// Parse a line of input.
    ///
    /// Blank input is not an error: it yields an empty command and no arguments.
    pub fn parse(line: &str) -> Result<Self, TokenizeError> {
        let mut tokens = split(line)?.into_iter();
        let command = tokens.next().unwrap_or_default();
        Ok(Self {
            command,
            args: tokens.collect(),
        })
    }

    /// True when the line held no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.command.is_empty() && self.args.is_empty()
    }
}

/// Split a line into tokens.
///
/// The escape check runs before any quote check, so a backslash escapes the
/// next character inside quotes too (`'bar\'s'` is `bar's`).
fn split(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;

    for c in line.chars() {
        match c {
            _ if escaped => {
                current.push(c);
                escaped = false;
            }
            '\\' => escaped = true,
            '\'' if in_single => in_single = false,
            '"' if in_double => in_double = false,
            _ if in_single || in_double => current.push(c),
            '\'' => in_single = true,
            '"' => in_double = true,
            ' ' | '\t' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if escaped {
        return Err(TokenizeError::UnterminatedEscape);
    }
    if in_single {
        return Err(TokenizeError::UnterminatedQuote { quote: '\'' });
    }
    if in_double {
        return Err(TokenizeError::UnterminatedQuote { quote: '"' });
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}
