//! Expression lexer and operator-precedence parser, adapted from the
//! donor's shunting-yard `parser.rs` into a precedence-climbing recursive
//! descent that builds the closed `Node` enum directly rather than a flat
//! token queue for a separate tree-builder.
use super::error::ParseError;
use crate::expression::types::{BinaryOp, Node, UnaryOp};
use std::collections::HashMap;
use std::f64::consts::{E, PI};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    BinaryOp(BinaryOp),
    UnaryMinus,
    UnaryPlus,
    LParen,
    RParen,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
    prev_was_value: bool,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            chars: input.chars().peekable(),
            position: 0,
            prev_was_value: false,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            if c.is_ascii_digit() || c == '.' {
                tokens.push(Token::Number(self.read_number()?));
                self.prev_was_value = true;
                continue;
            }
            if c.is_alphabetic() || c == '_' {
                tokens.push(Token::Ident(self.read_ident()));
                self.prev_was_value = true;
                continue;
            }
            let position = self.position;
            match c {
                '(' => {
                    tokens.push(Token::LParen);
                    self.bump();
                    self.prev_was_value = false;
                }
                ')' => {
                    tokens.push(Token::RParen);
                    self.bump();
                    self.prev_was_value = true;
                }
                '+' => {
                    tokens.push(if self.prev_was_value {
                        Token::BinaryOp(BinaryOp::Add)
                    } else {
                        Token::UnaryPlus
                    });
                    self.bump();
                    self.prev_was_value = false;
                }
                '-' => {
                    tokens.push(if self.prev_was_value {
                        Token::BinaryOp(BinaryOp::Sub)
                    } else {
                        Token::UnaryMinus
                    });
                    self.bump();
                    self.prev_was_value = false;
                }
                '*' => {
                    tokens.push(Token::BinaryOp(BinaryOp::Mul));
                    self.bump();
                    self.prev_was_value = false;
                }
                '/' => {
                    tokens.push(Token::BinaryOp(BinaryOp::Div));
                    self.bump();
                    self.prev_was_value = false;
                }
                '^' => {
                    tokens.push(Token::BinaryOp(BinaryOp::Pow));
                    self.bump();
                    self.prev_was_value = false;
                }
                other => {
                    return Err(ParseError::UnexpectedCharacter {
                        character: other,
                        position,
                    })
                }
            }
        }
        Ok(tokens)
    }

    /// Digits, an optional decimal point, and an optional `e`/`E` exponent
    /// with its own optional sign, e.g. `1`, `3.14`, `1e-7`, `6.02E23`.
    fn read_number(&mut self) -> Result<f64, ParseError> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if matches!(self.chars.peek(), Some('e') | Some('E')) {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if let Some(&sign) = lookahead.peek() {
                if sign == '+' || sign == '-' {
                    lookahead.next();
                }
            }
            if matches!(lookahead.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.bump().expect("peeked"));
                if let Some(&sign) = self.chars.peek() {
                    if sign == '+' || sign == '-' {
                        text.push(sign);
                        self.bump();
                    }
                }
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        text.parse::<f64>()
            .map_err(|_| ParseError::InvalidNumber { text })
    }

    fn read_ident(&mut self) -> String {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        text
    }
}

/// Parse a full arithmetic expression, e.g. `"m * a"` or `"sin(x) + 1"`.
/// `constants` holds user-defined named constants (from `==` lines) in
/// addition to the built-in `pi`/`e`; any other identifier is a variable.
pub fn parse_expression(input: &str, constants: &HashMap<String, f64>) -> Result<Node, ParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    if tokens.is_empty() {
        return Err(ParseError::EmptyExpression);
    }
    let mut parser = TokenParser {
        tokens: &tokens,
        pos: 0,
        constants,
    };
    let node = parser.parse_sum()?;
    if parser.pos != tokens.len() {
        return Err(ParseError::UnexpectedToken {
            found: format!("{:?}", tokens[parser.pos]),
        });
    }
    Ok(node)
}

struct TokenParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    constants: &'a HashMap<String, f64>,
}

impl<'a> TokenParser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Lowest precedence: binary `+`/`-`, left-associative.
    fn parse_sum(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_product()?;
        loop {
            let op = match self.peek() {
                Some(Token::BinaryOp(op @ (BinaryOp::Add | BinaryOp::Sub))) => *op,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_product()?;
            node = Node::binary(op, node, rhs);
        }
        Ok(node)
    }

    /// `*`/`/`, left-associative, binds tighter than `+`/`-`.
    fn parse_product(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_power()?;
        loop {
            let op = match self.peek() {
                Some(Token::BinaryOp(op @ (BinaryOp::Mul | BinaryOp::Div))) => *op,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_power()?;
            node = Node::binary(op, node, rhs);
        }
        Ok(node)
    }

    /// `^`, right-associative, binds tighter than `*`/`/`.
    fn parse_power(&mut self) -> Result<Node, ParseError> {
        let base = self.parse_unary()?;
        if let Some(Token::BinaryOp(BinaryOp::Pow)) = self.peek() {
            self.pos += 1;
            let exponent = self.parse_power()?;
            Ok(Node::binary(BinaryOp::Pow, base, exponent))
        } else {
            Ok(base)
        }
    }

    /// Leading unary `+`/`-`, binding tighter than any binary operator.
    /// The node model has no dedicated negation kind, so `-e` desugars
    /// to `0 - e`; `+e` is the identity and is simply dropped.
    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            Some(Token::UnaryMinus) => {
                self.pos += 1;
                let inner = self.parse_unary()?;
                Ok(Node::binary(BinaryOp::Sub, Node::fixed(0.0), inner))
            }
            Some(Token::UnaryPlus) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            Some(Token::Number(value)) => {
                let value = *value;
                self.pos += 1;
                Ok(Node::fixed(value))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let node = self.parse_sum()?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(node)
                    }
                    _ => Err(ParseError::UnbalancedParentheses),
                }
            }
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                if let Some(Token::LParen) = self.peek() {
                    self.pos += 1;
                    let argument = self.parse_sum()?;
                    match self.peek() {
                        Some(Token::RParen) => self.pos += 1,
                        _ => return Err(ParseError::UnbalancedParentheses),
                    }
                    let op = UnaryOp::from_name(&name).ok_or_else(|| ParseError::UnknownFunction {
                        name: name.clone(),
                    })?;
                    Ok(Node::unary(op, argument))
                } else {
                    Ok(self.named_value(&name))
                }
            }
            Some(token) => Err(ParseError::UnexpectedToken {
                found: format!("{:?}", token),
            }),
            None => Err(ParseError::UnexpectedEndOfExpression),
        }
    }

    fn named_value(&self, name: &str) -> Node {
        if let Some(&value) = self.constants.get(name) {
            return Node::constant(name, value);
        }
        match name {
            "pi" => Node::constant("pi", PI),
            "e" => Node::constant("e", E),
            _ => Node::variable(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::expression::compute::Evaluate;

    fn parse(input: &str) -> Result<Node, ParseError> {
        parse_expression(input, &HashMap::new())
    }

    #[test]
    fn test_parse_number() {
        let node = parse("42").unwrap();
        assert_eq!(Some(42.0), node.value(&Context::new()));
    }

    #[test]
    fn test_parse_variable() {
        let node = parse("x").unwrap();
        assert_eq!(Node::variable("x"), node);
    }

    #[test]
    fn test_parse_named_constant() {
        let node = parse("pi").unwrap();
        assert_eq!(Some(PI), node.value(&Context::new()));
    }

    #[test]
    fn test_parse_function_call() {
        let node = parse("sin(0)").unwrap();
        assert_eq!(Some(0.0), node.value(&Context::new()));
    }

    #[test]
    fn test_parse_precedence() {
        let node = parse("2 + 3 * 4").unwrap();
        assert_eq!(Some(14.0), node.value(&Context::new()));
    }

    #[test]
    fn test_parse_power_is_right_associative() {
        let node = parse("2 ^ 3 ^ 2").unwrap();
        assert_eq!(Some(2.0_f64.powf(9.0)), node.value(&Context::new()));
    }

    #[test]
    fn test_parse_parentheses_override_precedence() {
        let node = parse("(2 + 3) * 4").unwrap();
        assert_eq!(Some(20.0), node.value(&Context::new()));
    }

    #[test]
    fn test_parse_unary_minus_binds_tighter_than_power() {
        let node = parse("-2 ^ 2").unwrap();
        assert_eq!(Some(4.0), node.value(&Context::new()));
    }

    #[test]
    fn test_parse_unbalanced_parentheses_is_an_error() {
        let err = parse("(1 + 2").unwrap_err();
        assert_eq!(ParseError::UnbalancedParentheses, err);
    }

    #[test]
    fn test_parse_empty_expression_is_an_error() {
        let err = parse("   ").unwrap_err();
        assert_eq!(ParseError::EmptyExpression, err);
    }

    #[test]
    fn test_parse_scientific_notation() {
        let node = parse("1e-7").unwrap();
        assert_eq!(Some(1e-7), node.value(&Context::new()));
        let node = parse("6.02E23").unwrap();
        assert_eq!(Some(6.02e23), node.value(&Context::new()));
    }

    #[test]
    fn test_parse_unknown_function_is_an_error() {
        let err = parse("sqrt(4)").unwrap_err();
        assert!(matches!(err, ParseError::UnknownFunction { .. }));
    }
}
