//! Splits a timestamp string into WORD, NUMBER, PUNCT and SPACE tokens.
//!
//! The scanner never fails; anything it does not understand comes out as
//! one-character PUNCT tokens for the assembly engine to deal with.

/// The lexical class of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A run of letters or underscores.
    Word,
    /// A run of digits, possibly containing one decimal point.
    Number,
    /// A single character of punctuation.
    Punct,
    /// A run of whitespace, collapsed to a single space.
    Space,
}

/// One token of a timestamp string.
///
/// NUMBER tokens keep their original text so that the engine can
/// distinguish `"04"` from `"2004"` by width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn word(text: String) -> Token {
        Token { kind: TokenKind::Word, text }
    }

    fn number<S: Into<String>>(text: S) -> Token {
        Token { kind: TokenKind::Number, text: text.into() }
    }

    fn punct(c: char) -> Token {
        Token { kind: TokenKind::Punct, text: c.to_string() }
    }

    fn space() -> Token {
        Token { kind: TokenKind::Space, text: " ".to_string() }
    }

    /// The numeric value of a NUMBER token, if it has one.
    pub fn number_value(&self) -> Option<f64> {
        if self.kind == TokenKind::Number {
            self.text.parse().ok()
        } else {
            None
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Whether `text` is exactly `width` ASCII digits. WORD tokens may carry
/// multi-byte characters, so this must hold before slicing a token by
/// byte offset.
pub(crate) fn ascii_digits(text: &str, width: usize) -> bool {
    text.len() == width && text.bytes().all(|b| b.is_ascii_digit())
}

fn is_space_char(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Split `s` into tokens, in input order.
pub fn tokenize(s: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(&c) = chars.peek() {
        if is_word_char(c) {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if !is_word_char(c) {
                    break;
                }
                word.push(c);
                chars.next();
            }
            tokens.push(Token::word(word));
        } else if c.is_ascii_digit() {
            let mut num = String::new();
            while let Some(&c) = chars.peek() {
                if !c.is_ascii_digit() && c != '.' {
                    break;
                }
                num.push(c);
                chars.next();
            }
            emit_numeric(num, &mut tokens);
        } else if is_space_char(c) {
            while let Some(&c) = chars.peek() {
                if !is_space_char(c) {
                    break;
                }
                chars.next();
            }
            tokens.push(Token::space());
        } else {
            tokens.push(Token::punct(c));
            chars.next();
        }
    }

    tokens
}

/*
 * A numeric run may contain dots that are not decimal separators.
 *
 * A single interior dot keeps the run as one NUMBER ("3.14"); a trailing
 * dot is punctuation ("25." ends a sentence); two or more dots mean the
 * run is date-shaped ("1.2.3") and is split into NUMBERs joined by '.'.
 */
fn emit_numeric(mut num: String, tokens: &mut Vec<Token>) {
    let mut trailing_dot = false;
    if num.ends_with('.') {
        num.pop();
        trailing_dot = true;
    }

    if num.matches('.').count() > 1 {
        let mut parts = num.split('.');
        if let Some(first) = parts.next() {
            tokens.push(Token::number(first));
        }
        for part in parts {
            tokens.push(Token::punct('.'));
            tokens.push(Token::number(part));
        }
    } else {
        tokens.push(Token::number(num));
    }

    if trailing_dot {
        tokens.push(Token::punct('.'));
    }
}
