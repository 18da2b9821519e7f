//! Lexical analyzer.
//!
//! The lexer scans the whole input eagerly when constructed and then acts
//! as a cursor over the materialized token sequence.  Line structure is
//! reified into `Newline` tokens and, for every two-space change of leading
//! indentation at the start of a non-blank, non-comment line, `Indent` or
//! `Dedent` tokens.

use std::error::Error;
use std::fmt;
use std::io;
use std::io::prelude::*;
use std::iter::Peekable;

use crate::token::Token;

/// One indentation step is exactly this many leading spaces.
const INDENT_WIDTH: usize = 2;

const KEYWORDS: [(&str, Token); 12] = [
    ("class", Token::Class),
    ("return", Token::Return),
    ("if", Token::If),
    ("else", Token::Else),
    ("def", Token::Def),
    ("print", Token::Print),
    ("and", Token::And),
    ("or", Token::Or),
    ("not", Token::Not),
    ("None", Token::None),
    ("True", Token::True),
    ("False", Token::False),
];

fn keyword(name: &str) -> Option<Token> {
    KEYWORDS
        .iter()
        .find(|(text, _)| *text == name)
        .map(|(_, token)| token.clone())
}

/// Cursor over the token sequence of one source text.
#[derive(Debug)]
pub struct Lexer {
    tokens: Vec<Token>,
    pos: usize,
}

impl Lexer {
    /// Scans `input` to the end and positions the cursor on the first token.
    ///
    /// The produced sequence always ends with a single `Eof`, preceded by a
    /// `Newline` (synthesized when the input does not end in one) or by the
    /// `Dedent` tokens closing still-open blocks.
    pub fn new<R: BufRead>(input: R) -> Result<Lexer, LexerError> {
        let tokens = Scanner::new(input).run()?;
        Ok(Lexer { tokens, pos: 0 })
    }

    /// Returns the token under the cursor.
    pub fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// Moves the cursor one token forward and returns the new current token.
    ///
    /// Once the cursor reaches the trailing `Eof` it stays there.
    pub fn advance(&mut self) -> &Token {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        self.current()
    }

    /// Fails unless the current token equals `expected`.
    pub fn expect(&self, expected: &Token) -> Result<(), LexerError> {
        if self.current() == expected {
            Ok(())
        } else {
            Err(self.mismatch(expected.to_string()))
        }
    }

    /// Advances, then fails unless the new current token equals `expected`.
    pub fn expect_next(&mut self, expected: &Token) -> Result<(), LexerError> {
        self.advance();
        self.expect(expected)
    }

    /// Fails unless the current token is an identifier; returns its name.
    pub fn expect_identifier(&self) -> Result<&str, LexerError> {
        match self.current() {
            Token::Identifier(name) => Ok(name),
            _ => Err(self.mismatch("identifier".to_string())),
        }
    }

    /// Advances, then fails unless the new current token is an identifier.
    pub fn expect_next_identifier(&mut self) -> Result<&str, LexerError> {
        self.advance();
        self.expect_identifier()
    }

    fn mismatch(&self, expected: String) -> LexerError {
        LexerError::UnexpectedToken {
            found: self.current().to_string(),
            expected,
        }
    }
}

/// Single-pass byte scanner used by [`Lexer::new`].
struct Scanner<R: BufRead> {
    input: Peekable<io::Bytes<R>>,
    tokens: Vec<Token>,

    // Leading spaces of the most recent line that adjusted indentation.
    indent: usize,
}

impl<R: BufRead> Scanner<R> {
    fn new(input: R) -> Scanner<R> {
        Scanner {
            input: input.bytes().peekable(),
            tokens: Vec::new(),
            indent: 0,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexerError> {
        while let Some(byte) = self.peek()? {
            match byte {
                b'\n' => {
                    self.bump()?;
                    self.newline()?;
                }
                b' ' | b'\t' | b'\r' => {
                    self.bump()?;
                }
                b'#' => self.comment()?,
                b'\'' | b'"' => self.string_literal(byte)?,
                b'0'..=b'9' => self.number()?,
                b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.identifier()?,
                _ => self.operator(byte)?,
            }
        }

        if !matches!(
            self.tokens.last(),
            None | Some(Token::Newline) | Some(Token::Dedent)
        ) {
            self.tokens.push(Token::Newline);
        }
        for _ in 0..self.indent / INDENT_WIDTH {
            self.tokens.push(Token::Dedent);
        }
        self.tokens.push(Token::Eof);
        Ok(self.tokens)
    }

    /// Handles the end of a line: emits `Newline` (collapsing runs of blank
    /// lines and skipping a leading one) and adjusts the indentation level
    /// against the next logical line.
    fn newline(&mut self) -> Result<(), LexerError> {
        if !matches!(self.tokens.last(), None | Some(Token::Newline)) {
            self.tokens.push(Token::Newline);
        }

        let mut spaces = 0;
        while self.peek()? == Some(b' ') {
            self.bump()?;
            spaces += 1;
        }

        match self.peek()? {
            // Blank and comment-only lines leave the level untouched.
            Some(b'\n') | Some(b'#') => return Ok(()),
            // End of input closes every open block.
            None => spaces = 0,
            Some(_) => (),
        }

        if spaces > self.indent {
            for _ in 0..(spaces - self.indent) / INDENT_WIDTH {
                self.tokens.push(Token::Indent);
            }
        } else {
            for _ in 0..(self.indent - spaces) / INDENT_WIDTH {
                self.tokens.push(Token::Dedent);
            }
        }
        self.indent = spaces;
        Ok(())
    }

    fn comment(&mut self) -> Result<(), LexerError> {
        self.bump()?;
        while let Some(byte) = self.peek()? {
            if byte == b'\n' {
                break;
            }
            self.bump()?;
        }
        Ok(())
    }

    fn string_literal(&mut self, quote: u8) -> Result<(), LexerError> {
        self.bump()?;
        let mut bytes = Vec::new();
        loop {
            let byte = match self.bump()? {
                Some(byte) => byte,
                None => return Err(LexerError::UnterminatedString),
            };
            match byte {
                _ if byte == quote => break,
                b'\\' => {
                    let escaped = match self.bump()? {
                        Some(byte) => byte,
                        None => return Err(LexerError::UnterminatedString),
                    };
                    let replacement = match escaped {
                        b'n' => b'\n',
                        b't' => b'\t',
                        b'r' => b'\r',
                        b'"' => b'"',
                        b'\'' => b'\'',
                        b'\\' => b'\\',
                        other => return Err(LexerError::UnknownEscape(other as char)),
                    };
                    bytes.push(replacement);
                }
                b'\n' | b'\r' => return Err(LexerError::NewlineInString),
                _ => bytes.push(byte),
            }
        }
        let text = String::from_utf8_lossy(&bytes).into_owned();
        self.tokens.push(Token::String(text));
        Ok(())
    }

    fn number(&mut self) -> Result<(), LexerError> {
        let mut digits = String::new();
        while let Some(byte) = self.peek()? {
            if !byte.is_ascii_digit() {
                break;
            }
            self.bump()?;
            digits.push(byte as char);
        }
        let value = digits
            .parse::<i32>()
            .map_err(|_| LexerError::BadNumber(digits.clone()))?;
        self.tokens.push(Token::Number(value));
        Ok(())
    }

    fn identifier(&mut self) -> Result<(), LexerError> {
        let mut name = String::new();
        while let Some(byte) = self.peek()? {
            if !byte.is_ascii_alphanumeric() && byte != b'_' {
                break;
            }
            self.bump()?;
            name.push(byte as char);
        }
        let token = keyword(&name).unwrap_or(Token::Identifier(name));
        self.tokens.push(token);
        Ok(())
    }

    fn operator(&mut self, first: u8) -> Result<(), LexerError> {
        self.bump()?;
        let token = match (first, self.peek()?) {
            (b'=', Some(b'=')) => {
                self.bump()?;
                Token::Eq
            }
            (b'!', Some(b'=')) => {
                self.bump()?;
                Token::NotEq
            }
            (b'<', Some(b'=')) => {
                self.bump()?;
                Token::LessOrEq
            }
            (b'>', Some(b'=')) => {
                self.bump()?;
                Token::GreaterOrEq
            }
            _ if first.is_ascii_punctuation() => Token::Char(first as char),
            _ => return Err(LexerError::BadByte(first)),
        };
        self.tokens.push(token);
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<u8>, LexerError> {
        match self.input.peek() {
            Some(Ok(byte)) => Ok(Some(*byte)),
            Some(Err(_)) => match self.input.next() {
                Some(Err(e)) => Err(LexerError::Io(e)),
                _ => Ok(None),
            },
            None => Ok(None),
        }
    }

    fn bump(&mut self) -> Result<Option<u8>, LexerError> {
        match self.input.next() {
            Some(Ok(byte)) => Ok(Some(byte)),
            Some(Err(e)) => Err(LexerError::Io(e)),
            None => Ok(None),
        }
    }
}

#[derive(Debug)]
pub enum LexerError {
    Io(io::Error),
    UnterminatedString,
    NewlineInString,
    UnknownEscape(char),
    BadNumber(String),
    BadByte(u8),
    UnexpectedToken { found: String, expected: String },
}

impl Error for LexerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LexerError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerError::Io(e) => write!(f, "read error: {}", e),
            LexerError::UnterminatedString => write!(f, "unterminated string literal"),
            LexerError::NewlineInString => write!(f, "unexpected end of line in string literal"),
            LexerError::UnknownEscape(c) => write!(f, "unrecognized escape sequence \\{}", c),
            LexerError::BadNumber(text) => write!(f, "cannot parse number literal: {}", text),
            LexerError::BadByte(b) => write!(f, "unexpected byte: 0x{:02x}", b),
            LexerError::UnexpectedToken { found, expected } => {
                write!(f, "unexpected token '{}', expected '{}'", found, expected)
            }
        }
    }
}

impl From<io::Error> for LexerError {
    fn from(e: io::Error) -> LexerError {
        LexerError::Io(e)
    }
}
