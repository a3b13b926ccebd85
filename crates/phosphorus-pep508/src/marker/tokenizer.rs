use std::sync::LazyLock;

use regex::Regex;

use crate::{Pep508Error, Pep508ErrorSource};

/// The tokens of the marker language, each defined by a regular expression anchored at the
/// current position.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum TokenRule {
    LeftParenthesis,
    RightParenthesis,
    Whitespace,
    QuotedString,
    Variable,
    Operator,
    BooleanOperator,
    In,
    NotIn,
}

impl TokenRule {
    const ALL: [Self; 9] = [
        Self::LeftParenthesis,
        Self::RightParenthesis,
        Self::Whitespace,
        Self::QuotedString,
        Self::Variable,
        Self::Operator,
        Self::BooleanOperator,
        Self::In,
        Self::NotIn,
    ];

    const fn pattern(self) -> &'static str {
        match self {
            Self::LeftParenthesis => r"\(",
            Self::RightParenthesis => r"\)",
            Self::Whitespace => r"\s+",
            Self::QuotedString => r#"'[^']*'|"[^"]*""#,
            Self::Variable => {
                r"(?:python_full_version|python_version|os[._]name|sys[._]platform|platform_release|platform_system|platform[._]version|platform[._]machine|platform[._]python_implementation|implementation_name|implementation_version|extra)\b"
            }
            // Longest first, so `===` isn't read as `==`.
            Self::Operator => r"===|==|~=|!=|<=|>=|<|>",
            Self::BooleanOperator => r"(?:and|or)\b",
            Self::In => r"in\b",
            Self::NotIn => r"not\s+in\b",
        }
    }

    fn regex(self) -> &'static Regex {
        static RULES: LazyLock<[Regex; 9]> = LazyLock::new(|| {
            TokenRule::ALL.map(|rule| Regex::new(&format!("^(?:{})", rule.pattern())).unwrap())
        });
        &RULES[self as usize]
    }
}

/// A matched token and the byte offset it starts at.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Token<'a> {
    pub(crate) text: &'a str,
    pub(crate) start: usize,
}

impl Token<'_> {
    /// The byte offset right after the token.
    pub(crate) fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// A peek/consume cursor over marker tokens.
///
/// Positions are byte offsets into the whole input, so a marker embedded in a requirement
/// reports its errors against the requirement string.
#[derive(Debug, Clone)]
pub(crate) struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(input: &'a str, pos: usize) -> Self {
        Self { input, pos }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    /// Returns the token matching `rule` at the current position, without consuming it.
    pub(crate) fn peek(&self, rule: TokenRule) -> Option<Token<'a>> {
        let remaining = &self.input[self.pos..];
        rule.regex().find(remaining).map(|found| Token {
            text: &remaining[..found.end()],
            start: self.pos,
        })
    }

    /// Consumes the token matching `rule` at the current position, if any.
    pub(crate) fn consume(&mut self, rule: TokenRule) -> Option<Token<'a>> {
        let token = self.peek(rule)?;
        self.pos = token.end();
        Some(token)
    }

    pub(crate) fn eat_whitespace(&mut self) {
        self.consume(TokenRule::Whitespace);
    }

    /// The next character, for error messages.
    pub(crate) fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// An error spanning `len` bytes from `start`.
    pub(crate) fn error(&self, message: impl Into<String>, start: usize, len: usize) -> Pep508Error {
        Pep508Error {
            message: Pep508ErrorSource::String(message.into()),
            start,
            len,
            input: self.input.to_string(),
        }
    }

    /// An error pointing at the next character, or at the end of the input.
    pub(crate) fn unexpected(&self, expected: &str) -> Pep508Error {
        match self.peek_char() {
            Some(char) => self.error(
                format!("Expected {expected}, found '{char}'"),
                self.pos,
                char.len_utf8(),
            ),
            None => self.error(
                format!("Expected {expected}, found end of input"),
                self.pos,
                1,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_need_a_word_boundary() {
        assert!(Tokenizer::new("python_version", 0).peek(TokenRule::Variable).is_some());
        assert!(Tokenizer::new("python_versions", 0).peek(TokenRule::Variable).is_none());
        assert_eq!(
            Tokenizer::new("platform.python_implementation==", 0)
                .peek(TokenRule::Variable)
                .map(|token| token.text),
            Some("platform.python_implementation")
        );
    }

    #[test]
    fn boolean_operators_are_words() {
        assert!(Tokenizer::new("and (", 0).peek(TokenRule::BooleanOperator).is_some());
        assert!(Tokenizer::new("android", 0).peek(TokenRule::BooleanOperator).is_none());
        assert!(Tokenizer::new("order", 0).peek(TokenRule::BooleanOperator).is_none());
    }

    #[test]
    fn operators_are_longest_first() {
        let token = Tokenizer::new("===1", 0).peek(TokenRule::Operator).unwrap();
        assert_eq!(token.text, "===");
        let token = Tokenizer::new("<'3'", 0).peek(TokenRule::Operator).unwrap();
        assert_eq!(token.text, "<");
    }

    #[test]
    fn consume_advances_from_offset() {
        let input = "x ; 'a' not  in extra";
        let mut tokenizer = Tokenizer::new(input, 4);
        let literal = tokenizer.consume(TokenRule::QuotedString).unwrap();
        assert_eq!((literal.text, literal.start, literal.end()), ("'a'", 4, 7));
        tokenizer.eat_whitespace();
        assert!(tokenizer.peek(TokenRule::In).is_none());
        let not_in = tokenizer.consume(TokenRule::NotIn).unwrap();
        assert_eq!(not_in.text, "not  in");
        assert_eq!(tokenizer.pos(), 15);
    }

    #[test]
    fn unexpected_end_of_input() {
        let tokenizer = Tokenizer::new("os_name ==", 10);
        let err = tokenizer.unexpected("a quoted string");
        assert_eq!(err.start, 10);
        assert_eq!(err.message.to_string(), "Expected a quoted string, found end of input");
    }
}
