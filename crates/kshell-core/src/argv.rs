// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Split raw input lines into tokens and track parse position.
// Author: Lukas Bower

//! Split raw input lines into tokens and track the parse position.
//!
//! Tokens are separated by whitespace. Double quotes group text containing
//! whitespace and a backslash escapes the next character. A line is
//! continuable when it ends inside its last token, which is how completion
//! distinguishes `sh` from `sh `.

/// Tokenised input line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Argv {
    args: Vec<String>,
    continuable: bool,
}

impl Argv {
    /// Tokenise `line`.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut args = Vec::new();
        let mut current = String::new();
        let mut in_token = false;
        let mut quoted = false;
        let mut chars = line.chars();

        while let Some(ch) = chars.next() {
            if quoted {
                match ch {
                    '"' => quoted = false,
                    '\\' => {
                        if let Some(next) = chars.next() {
                            current.push(next);
                        }
                    }
                    _ => current.push(ch),
                }
                continue;
            }
            match ch {
                '"' => {
                    quoted = true;
                    in_token = true;
                }
                '\\' => {
                    in_token = true;
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                c if c.is_whitespace() => {
                    if in_token {
                        args.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                _ => {
                    in_token = true;
                    current.push(ch);
                }
            }
        }

        let continuable = in_token;
        if in_token {
            args.push(current);
        }
        Self { args, continuable }
    }

    /// Parsed tokens.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether the line held no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Whether the line ends inside its last token.
    #[must_use]
    pub fn is_continuable(&self) -> bool {
        self.continuable
    }

    /// Cursor positioned on the first token.
    #[must_use]
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor {
            args: &self.args,
            pos: 0,
        }
    }
}

/// Copyable position inside an [`Argv`].
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    args: &'a [String],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Token under the cursor, if any remain.
    #[must_use]
    pub fn current(&self) -> Option<&'a str> {
        self.args.get(self.pos).map(String::as_str)
    }

    /// Whether every token has been consumed.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.pos >= self.args.len()
    }

    /// Whether the cursor sits on the final token.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.pos + 1 == self.args.len()
    }

    /// Index of the token under the cursor.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Step past the current token.
    pub fn advance(&mut self) {
        if !self.is_end() {
            self.pos += 1;
        }
    }
}

impl PartialEq for Cursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos && std::ptr::eq(self.args, other.args)
    }
}

impl Eq for Cursor<'_> {}
