//! Tokenizer: numbers (with exponents), identifiers, operators, parentheses and commas.

use super::tokens::{Operator, Spanned, Token};
use crate::error::{CasError, Span};

pub(crate) fn lex(input: &str) -> Result<Vec<Spanned>, CasError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::with_capacity(input.len() / 2 + 1);
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        let token = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'0'..=b'9' | b'.' => {
                i = scan_number(bytes, i);
                let text = &input[start..i];
                let value = text.parse::<f64>().map_err(|_| CasError::InvalidNumber {
                    value: text.to_string(),
                    span: Some(Span::new(start, i)),
                })?;
                Token::Number(value)
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                Token::Identifier(input[start..i].to_string())
            }
            b'+' => {
                i += 1;
                Token::Operator(Operator::Add)
            }
            b'-' => {
                i += 1;
                Token::Operator(Operator::Sub)
            }
            b'*' => {
                if bytes.get(i + 1) == Some(&b'*') {
                    i += 2;
                    Token::Operator(Operator::Pow)
                } else {
                    i += 1;
                    Token::Operator(Operator::Mul)
                }
            }
            b'/' => {
                i += 1;
                Token::Operator(Operator::Div)
            }
            b'^' => {
                i += 1;
                Token::Operator(Operator::Pow)
            }
            b'(' => {
                i += 1;
                Token::LeftParen
            }
            b')' => {
                i += 1;
                Token::RightParen
            }
            b',' => {
                i += 1;
                Token::Comma
            }
            _ => {
                let ch = input[start..].chars().next().unwrap_or('?');
                return Err(CasError::invalid_token_at(
                    ch.to_string(),
                    Span::new(start, start + ch.len_utf8()),
                ));
            }
        };
        tokens.push(Spanned {
            token,
            span: Span::new(start, i),
        });
    }

    Ok(tokens)
}

/// Advance over `digits[.digits][e[+-]digits]`. A trailing `e` not followed by digits
/// is left for the identifier scanner (`2e` is `2*e`).
fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
        i += 1;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            return j;
        }
    }
    i
}
