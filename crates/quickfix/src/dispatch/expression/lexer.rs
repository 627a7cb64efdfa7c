//! Tokeniser for the restricted expression grammar.

use super::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Root,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Token {
    pub(super) kind: TokenKind,
    pub(super) offset: usize,
}

pub(super) fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct Lexer {
    chars: Vec<(usize, char)>,
    position: usize,
    end: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.char_indices().collect(),
            position: 0,
            end: source.len(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars
            .get(self.position + ahead)
            .map(|&(_, character)| character)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.position)
            .map_or(self.end, |&(offset, _)| offset)
    }

    fn bump(&mut self) -> Option<char> {
        let character = self.peek()?;
        self.position += 1;
        Some(character)
    }

    fn next_token(&mut self) -> Result<Option<Token>, ExpressionError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
        let offset = self.offset();
        let Some(character) = self.peek() else {
            return Ok(None);
        };

        let kind = match character {
            '0'..='9' => self.number(offset)?,
            '\'' | '"' => self.string(offset)?,
            '#' => self.root(offset)?,
            c if is_ident_start(c) => TokenKind::Ident(self.ident()),
            _ => {
                let kind = punctuation(character).ok_or_else(|| {
                    ExpressionError::syntax(offset, format!("unexpected character '{character}'"))
                })?;
                self.position += 1;
                kind
            }
        };
        Ok(Some(Token { kind, offset }))
    }

    fn number(&mut self, offset: usize) -> Result<TokenKind, ExpressionError> {
        let mut digits = String::new();
        self.take_digits(&mut digits);
        let is_float =
            self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
        if is_float {
            digits.push('.');
            self.position += 1;
            self.take_digits(&mut digits);
            return digits
                .parse()
                .map(TokenKind::Float)
                .map_err(|_| ExpressionError::syntax(offset, "invalid number literal"));
        }
        digits
            .parse()
            .map(TokenKind::Int)
            .map_err(|_| ExpressionError::syntax(offset, "integer literal out of range"))
    }

    fn take_digits(&mut self, digits: &mut String) {
        while let Some(digit) = self.peek().filter(char::is_ascii_digit) {
            digits.push(digit);
            self.position += 1;
        }
    }

    fn string(&mut self, offset: usize) -> Result<TokenKind, ExpressionError> {
        let quote = self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(ExpressionError::syntax(offset, "unterminated string literal")),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some(other @ ('\\' | '\'' | '"')) => other,
                        _ => {
                            return Err(ExpressionError::syntax(offset, "invalid escape sequence"));
                        }
                    };
                    text.push(escaped);
                }
                Some(character) if Some(character) == quote => return Ok(TokenKind::Str(text)),
                Some(character) => text.push(character),
            }
        }
    }

    fn root(&mut self, offset: usize) -> Result<TokenKind, ExpressionError> {
        self.position += 1;
        let name = self.ident();
        if name == "root" {
            Ok(TokenKind::Root)
        } else {
            Err(ExpressionError::syntax(offset, "expected #root"))
        }
    }

    fn ident(&mut self) -> String {
        let mut name = String::new();
        while let Some(character) = self.peek().filter(|&c| is_ident_continue(c)) {
            name.push(character);
            self.position += 1;
        }
        name
    }
}

fn is_ident_start(character: char) -> bool {
    character.is_alphabetic() || character == '_'
}

fn is_ident_continue(character: char) -> bool {
    character.is_alphanumeric() || character == '_'
}

fn punctuation(character: char) -> Option<TokenKind> {
    let kind = match character {
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '*' => TokenKind::Star,
        '/' => TokenKind::Slash,
        '%' => TokenKind::Percent,
        '.' => TokenKind::Dot,
        ',' => TokenKind::Comma,
        '(' => TokenKind::LParen,
        ')' => TokenKind::RParen,
        '[' => TokenKind::LBracket,
        ']' => TokenKind::RBracket,
        _ => return None,
    };
    Some(kind)
}
