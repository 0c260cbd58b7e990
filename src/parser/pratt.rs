use super::tokens::{Operator, Spanned, Token, UNARY_PRECEDENCE};
use crate::Expr;
use crate::error::{CasError, Span};
use crate::functions::registry::Registry;

/// Parse tokens into an expression using Pratt parsing
pub(crate) fn parse_expression(tokens: &[Spanned]) -> Result<Expr, CasError> {
    if tokens.is_empty() {
        return Err(CasError::UnexpectedEndOfInput);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr(0)?;

    if let Some(extra) = parser.current() {
        return Err(CasError::unexpected_token_at(
            "end of input",
            extra.token.describe(),
            extra.span,
        ));
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn current(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect_right_paren(&mut self) -> Result<(), CasError> {
        match self.current() {
            Some(Spanned {
                token: Token::RightParen,
                ..
            }) => {
                self.advance();
                Ok(())
            }
            Some(other) => Err(CasError::unexpected_token_at(
                ")",
                other.token.describe(),
                other.span,
            )),
            None => Err(CasError::UnexpectedEndOfInput),
        }
    }

    fn parse_expr(&mut self, min_precedence: u8) -> Result<Expr, CasError> {
        let mut left = self.parse_prefix()?;

        while let Some(Spanned {
            token: Token::Operator(op),
            ..
        }) = self.current()
        {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();

            // `^` is right-associative: parse the right side at the same level
            let next_min = if *op == Operator::Pow {
                precedence
            } else {
                precedence + 1
            };
            let right = self.parse_expr(next_min)?;
            left = match op {
                Operator::Add => Expr::sum(vec![left, right]),
                Operator::Sub => Expr::sub_expr(left, right),
                Operator::Mul => Expr::product(vec![left, right]),
                Operator::Div => Expr::div_expr(left, right),
                Operator::Pow => Expr::pow(left, right),
            };
        }

        Ok(left)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, CasError> {
        let mut args = Vec::new();
        loop {
            args.push(self.parse_expr(0)?);
            match self.current() {
                Some(Spanned {
                    token: Token::Comma,
                    ..
                }) => self.advance(),
                _ => break,
            }
        }
        self.expect_right_paren()?;
        Ok(args)
    }

    fn parse_prefix(&mut self) -> Result<Expr, CasError> {
        let spanned = self.current().ok_or(CasError::UnexpectedEndOfInput)?;

        match &spanned.token {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::number(*n))
            }

            Token::Identifier(name) => {
                self.advance();
                if let Some(Spanned {
                    token: Token::LeftParen,
                    ..
                }) = self.current()
                {
                    self.advance();
                    let args = self.parse_arguments()?;
                    return build_call(name, args, spanned.span);
                }
                Ok(match name.as_str() {
                    "e" => Expr::number(std::f64::consts::E),
                    "oo" | "inf" | "infinity" => Expr::infinity(),
                    _ => Expr::symbol(name),
                })
            }

            Token::Operator(Operator::Sub) => {
                self.advance();
                let operand = self.parse_expr(UNARY_PRECEDENCE)?;
                Ok(match operand.as_number() {
                    Some(n) => Expr::number(-n),
                    None => operand.negate(),
                })
            }

            Token::Operator(Operator::Add) => {
                self.advance();
                self.parse_expr(UNARY_PRECEDENCE)
            }

            Token::LeftParen => {
                self.advance();
                let inner = self.parse_expr(0)?;
                self.expect_right_paren()?;
                Ok(inner)
            }

            other => Err(CasError::unexpected_token_at(
                "an expression",
                other.describe(),
                spanned.span,
            )),
        }
    }
}

fn build_call(name: &str, args: Vec<Expr>, span: Span) -> Result<Expr, CasError> {
    let canonical = Registry::canonical(name);
    let def = Registry::get(canonical).ok_or_else(|| {
        CasError::invalid_syntax_at(format!("unknown function '{name}'"), span)
    })?;
    if !def.validate_arity(args.len()) {
        return Err(CasError::InvalidFunctionCall {
            name: canonical.to_string(),
            expected: def.arity,
            got: args.len(),
        });
    }
    let mut args = args;
    if canonical == "sqrt" {
        return Ok(args.remove(0).sqrt());
    }
    Ok(Expr::func_multi(canonical, args))
}
