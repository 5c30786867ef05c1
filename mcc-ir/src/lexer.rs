//! Textual IR Lexer
//!
//! Tokenizes the on-disk IR format into a stream of tokens with source
//! locations. The language is small: value references (`%x`), block
//! references (`^bb0`), function symbols (`@main`), bare identifiers for
//! operation names, integer literals, and a handful of punctuation.

use crate::error::ParseError;
use mcc_common::SourceLocation;
use std::fmt;

/// Token types for the textual IR
#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    /// `%name` - a value reference
    ValueRef(String),
    /// `^name` - a block reference
    BlockRef(String),
    /// `@name` - a function symbol
    FuncRef(String),
    /// Bare identifier (operation names, the `func` keyword)
    Ident(String),
    /// Integer literal, possibly negative
    IntLiteral(i64),

    LeftBrace,
    RightBrace,
    Colon,
    Comma,
    Equal,

    EndOfFile,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::ValueRef(name) => write!(f, "%{}", name),
            TokenType::BlockRef(name) => write!(f, "^{}", name),
            TokenType::FuncRef(name) => write!(f, "@{}", name),
            TokenType::Ident(name) => write!(f, "{}", name),
            TokenType::IntLiteral(value) => write!(f, "{}", value),
            TokenType::LeftBrace => write!(f, "{{"),
            TokenType::RightBrace => write!(f, "}}"),
            TokenType::Colon => write!(f, ":"),
            TokenType::Comma => write!(f, ","),
            TokenType::Equal => write!(f, "="),
            TokenType::EndOfFile => write!(f, "end of input"),
        }
    }
}

/// A token with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(token_type: TokenType, location: SourceLocation) -> Self {
        Self {
            token_type,
            location,
        }
    }
}

/// Textual IR lexer
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    filename: String,
    line: u32,
    column: u32,
}

impl Lexer {
    pub fn new(input: &str, filename: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            filename: filename.to_string(),
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input, ending with an EndOfFile token
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            let location = self.location();

            let Some(ch) = self.peek() else {
                tokens.push(Token::new(TokenType::EndOfFile, location));
                return Ok(tokens);
            };

            let token_type = match ch {
                '{' => {
                    self.advance();
                    TokenType::LeftBrace
                }
                '}' => {
                    self.advance();
                    TokenType::RightBrace
                }
                ':' => {
                    self.advance();
                    TokenType::Colon
                }
                ',' => {
                    self.advance();
                    TokenType::Comma
                }
                '=' => {
                    self.advance();
                    TokenType::Equal
                }
                '%' => {
                    self.advance();
                    TokenType::ValueRef(self.read_name()?)
                }
                '^' => {
                    self.advance();
                    TokenType::BlockRef(self.read_name()?)
                }
                '@' => {
                    self.advance();
                    TokenType::FuncRef(self.read_name()?)
                }
                '-' => self.read_int(&location)?,
                _ if ch.is_ascii_digit() => self.read_int(&location)?,
                _ if is_name_char(ch) => TokenType::Ident(self.read_name()?),
                _ => return Err(ParseError::UnexpectedChar { ch, location }),
            };

            tokens.push(Token::new(token_type, location));
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(&self.filename, self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.input.get(self.position + 1) == Some(&'/') {
                // Line comment
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if is_name_char(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if name.is_empty() {
            match self.peek() {
                Some(ch) => Err(ParseError::UnexpectedChar {
                    ch,
                    location: self.location(),
                }),
                None => Err(ParseError::UnexpectedEof),
            }
        } else {
            Ok(name)
        }
    }

    fn read_int(&mut self, start: &SourceLocation) -> Result<TokenType, ParseError> {
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if text == "-" || text.is_empty() {
            return Err(ParseError::UnexpectedChar {
                ch: self.peek().unwrap_or('-'),
                location: start.clone(),
            });
        }

        text.parse::<i64>()
            .map(TokenType::IntLiteral)
            .map_err(|_| ParseError::IntOutOfRange {
                location: start.clone(),
            })
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
