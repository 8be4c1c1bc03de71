//! # Input Tokenizer
//!
//! Splits a raw text line into an ordered sequence of tokens. Tokens are
//! maximal runs of non-whitespace, or a double-quoted run with the quotes
//! stripped and interior whitespace preserved. The sequence is lazy,
//! borrowed, and restartable (call [`tokenize`] again, or clone the
//! iterator).

/// Produce the token sequence for `input`. An unmatched trailing quote
/// swallows the remainder of the line as a single token; empty input yields
/// an empty sequence.
pub fn tokenize(input: &str) -> Tokens<'_> {
    Tokens { rest: input }
}

/// Lazy iterator over the tokens of one input line.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return None;
        }

        if let Some(after_quote) = self.rest.strip_prefix('"') {
            match after_quote.find('"') {
                Some(end) => {
                    let token = &after_quote[..end];
                    self.rest = &after_quote[end + 1..];
                    Some(token)
                }
                None => {
                    // Unmatched quote: the remainder is one token.
                    self.rest = "";
                    Some(after_quote)
                }
            }
        } else {
            let end = self
                .rest
                .find(char::is_whitespace)
                .unwrap_or(self.rest.len());
            let token = &self.rest[..end];
            self.rest = &self.rest[end..];
            Some(token)
        }
    }
}
