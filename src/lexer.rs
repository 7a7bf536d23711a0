//! Tokenizer (§4.2).
//!
//! Converts the raw formula string into a flat token stream. Multi-character
//! operators are matched longest-first so that, e.g., `<=` is never split
//! into `<` followed by a dangling `=`.

use crate::error::{CalcError, Span};

/// A lexical token, paired implicitly with its source span via [`Lexer`].
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A numeric literal, already parsed to `f64`.
    Number(f64),
    /// An identifier: a variable, function, or closure name.
    Identifier(String),
    /// A recognized operator lexeme (`+`, `<=`, `**`, ...).
    Operator(&'static str),
    /// `(`
    Open,
    /// `)`
    Close,
    /// `,`
    Sep,
    /// End of input.
    End,
}

/// A token together with its location in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token's kind.
    pub kind: TokenKind,
    /// Where it was found in the source.
    pub span: Span,
}

/// Multi-character operators, longest first so the lexer's linear scan
/// always prefers the longest match.
const MULTI_CHAR_OPERATORS: &[&str] =
    &["**", "<<", ">>", "<=", ">=", "==", "!=", "<>", "&&", "||", "^^"];

/// Single-character operators.
const SINGLE_CHAR_OPERATORS: &[char] =
    &['+', '-', '*', '/', '%', '^', '<', '>', '&', '|', '!', '~'];

/// Streaming tokenizer over a formula string.
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `input`.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Lexer { input, bytes: input.as_bytes(), pos: 0 }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn starts_with_at(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    fn lex_number(&mut self) -> Result<Token, CalcError> {
        let start = self.pos;
        let mut end = self.pos;
        let rest = &self.input[self.pos..];
        let mut chars = rest.char_indices().peekable();
        let mut seen_dot = false;
        let mut seen_exp = false;

        while let Some(&(i, c)) = chars.peek() {
            if c.is_ascii_digit() {
                end = self.pos + i + c.len_utf8();
                chars.next();
            } else if c == '.' && !seen_dot && !seen_exp {
                seen_dot = true;
                end = self.pos + i + c.len_utf8();
                chars.next();
            } else if (c == 'e' || c == 'E') && !seen_exp {
                // Only consume as exponent marker if followed by digits
                // or a signed digit; otherwise this is the start of an
                // identifier like `e2x` and we stop the number here.
                let mut lookahead = chars.clone();
                lookahead.next();
                let next_is_sign_or_digit = matches!(
                    lookahead.peek(),
                    Some((_, d)) if d.is_ascii_digit() || *d == '+' || *d == '-'
                );
                if !next_is_sign_or_digit {
                    break;
                }
                seen_exp = true;
                end = self.pos + i + c.len_utf8();
                chars.next();
                if let Some(&(j, sign)) = chars.peek() {
                    if sign == '+' || sign == '-' {
                        end = self.pos + j + sign.len_utf8();
                        chars.next();
                    }
                }
            } else {
                break;
            }
        }

        let text = &self.input[start..end];
        self.pos = end;
        match text.parse::<f64>() {
            Ok(v) => Ok(Token { kind: TokenKind::Number(v), span: Span::new(start, end) }),
            Err(_) => Err(CalcError::InvalidNumber { text: text.to_string(), span: Span::new(start, end) }),
        }
    }

    fn lex_identifier(&mut self) -> Token {
        let start = self.pos;
        let mut end = self.pos;
        for (i, c) in self.input[self.pos..].char_indices() {
            if c.is_alphanumeric() || c == '_' {
                end = self.pos + i + c.len_utf8();
            } else {
                break;
            }
        }
        let text = self.input[start..end].to_string();
        self.pos = end;
        Token { kind: TokenKind::Identifier(text), span: Span::new(start, end) }
    }

    /// Produce the next token, or [`TokenKind::End`] at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`CalcError::LexError`] for an unrecognized character and
    /// [`CalcError::InvalidNumber`] for a malformed numeric literal.
    pub fn next_token(&mut self) -> Result<Token, CalcError> {
        self.skip_whitespace();
        let start = self.pos;

        let Some(c) = self.peek_char() else {
            // Point at the last real character (not one past the end), so
            // "an operator with a missing right operand" reports the
            // operator's own position rather than an out-of-range index.
            return Ok(Token { kind: TokenKind::End, span: Span::at(start.saturating_sub(1)) });
        };

        if c.is_ascii_digit() || (c == '.' && self.input[self.pos + 1..].starts_with(|d: char| d.is_ascii_digit())) {
            return self.lex_number();
        }

        if c.is_alphabetic() || c == '_' {
            return Ok(self.lex_identifier());
        }

        if c == '(' {
            self.pos += 1;
            return Ok(Token { kind: TokenKind::Open, span: Span::new(start, self.pos) });
        }
        if c == ')' {
            self.pos += 1;
            return Ok(Token { kind: TokenKind::Close, span: Span::new(start, self.pos) });
        }
        if c == ',' {
            self.pos += 1;
            return Ok(Token { kind: TokenKind::Sep, span: Span::new(start, self.pos) });
        }

        for op in MULTI_CHAR_OPERATORS {
            if self.starts_with_at(op) {
                self.pos += op.len();
                return Ok(Token { kind: TokenKind::Operator(op), span: Span::new(start, self.pos) });
            }
        }

        if SINGLE_CHAR_OPERATORS.contains(&c) {
            self.pos += c.len_utf8();
            let sym = SINGLE_CHAR_OPERATORS.iter().position(|&x| x == c).map(|i| SINGLE_CHAR_SYMBOLS[i]);
            return Ok(Token {
                kind: TokenKind::Operator(sym.expect("single-char operator table mismatch")),
                span: Span::new(start, self.pos),
            });
        }

        Err(CalcError::LexError {
            msg: format!("unrecognized character '{c}'"),
            span: Span::at(start),
        })
    }
}

/// Static `&'static str` spellings matching [`SINGLE_CHAR_OPERATORS`] index
/// for index, so the lexer can hand back a `'static` symbol without
/// allocating.
const SINGLE_CHAR_SYMBOLS: &[&str] = &["+", "-", "*", "/", "%", "^", "<", ">", "&", "|", "!", "~"];

/// Lex the entire input into a `Vec<Token>`, including a trailing `End`.
///
/// # Errors
///
/// Propagates the first lex error encountered.
pub fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token()?;
        let is_end = tok.kind == TokenKind::End;
        tokens.push(tok);
        if is_end {
            break;
        }
    }
    Ok(tokens)
}
