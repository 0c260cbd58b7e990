//! Implicit multiplication insertion for natural notation
//!
//! Inserts `*` operators between tokens where multiplication is implied, e.g. `2x` → `2 * x`.

use super::tokens::{Operator, Spanned, Token};
use crate::error::Span;
use crate::functions::is_known_function;

fn should_insert_mul(current: &Token, next: &Token) -> bool {
    match (current, next) {
        // Identifier * (: only when the identifier is not a function name
        (Token::Identifier(name), Token::LeftParen) => !is_known_function(name),

        // 2x, 2(x), xy, x2, )x, )2, )(
        (Token::Number(_) | Token::Identifier(_) | Token::RightParen, Token::Identifier(_))
        | (Token::Number(_) | Token::RightParen, Token::LeftParen)
        | (Token::Identifier(_) | Token::RightParen, Token::Number(_)) => true,

        _ => false,
    }
}

/// Insert implicit multiplication operators between appropriate tokens
///
/// Rules:
/// - Number * Identifier: `2 x` → `2 * x`
/// - Identifier * Identifier: `a x` → `a * x`
/// - ) * Identifier/Number/(: `(a) x` → `(a) * x`
/// - Identifier/Number * (: `x (y)` → `x * (y)` unless the identifier is a function
pub(crate) fn insert_implicit_multiplication(tokens: Vec<Spanned>) -> Vec<Spanned> {
    let mut out: Vec<Spanned> = Vec::with_capacity(tokens.len() * 3 / 2);
    for tok in tokens {
        if let Some(prev) = out.last()
            && should_insert_mul(&prev.token, &tok.token)
        {
            let at = tok.span.start;
            out.push(Spanned {
                token: Token::Operator(Operator::Mul),
                span: Span::new(at, at),
            });
        }
        out.push(tok);
    }
    out
}
