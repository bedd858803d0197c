//! Parser for arithmetic expressions
//!
//! Implements a recursive descent parser with one function per precedence
//! level. Operators of equal precedence associate to the left.

use crate::calculator::ast::Node;
use crate::error::{CalcError, CalcResult};
use abacus_types::{OperatorSymbol, UnknownOperator};
use std::fmt;

/// Most operators a single expression may contain
pub const MAX_OPERATORS: usize = 1_000;

/// Deepest parenthesis nesting accepted
pub const MAX_NESTING: usize = 256;

/// Token types recognized by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Operator(OperatorSymbol),

    // Delimiters
    LeftParen,
    RightParen,

    // Special
    Eof,
}

impl Token {
    fn operator(&self) -> Option<OperatorSymbol> {
        match self {
            Token::Operator(operator) => Some(*operator),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Operator(operator) => write!(f, "{operator}"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Eof => write!(f, "end of expression"),
        }
    }
}

/// Lexer for tokenizing arithmetic expressions
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
    token_start: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self { input: chars, position: 0, current_char, token_start: 0 }
    }

    /// Character offset of the most recently returned token
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> CalcResult<Token> {
        let mut number = String::new();

        // Swallow every digit and dot so "1.2.3" is reported as one bad literal
        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() || ch == '.' {
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        number
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| CalcError::parse(self.token_start, format!("malformed number '{number}'")))
    }

    fn single(&mut self, token: Token) -> CalcResult<Token> {
        self.advance();
        Ok(token)
    }

    pub fn next_token(&mut self) -> CalcResult<Token> {
        self.skip_whitespace();
        self.token_start = self.position;

        match self.current_char {
            None => Ok(Token::Eof),
            Some(ch) => match ch {
                '0'..='9' | '.' => self.read_number(),
                '(' => self.single(Token::LeftParen),
                ')' => self.single(Token::RightParen),
                _ => match OperatorSymbol::try_from(ch) {
                    Ok(operator) => self.single(Token::Operator(operator)),
                    Err(UnknownOperator(ch)) => {
                        Err(CalcError::parse(self.position, format!("unexpected character '{ch}'")))
                    }
                },
            },
        }
    }
}

/// Parser for arithmetic expressions
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    current_position: usize,
    operators: usize,
    nesting: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> CalcResult<Self> {
        let current_token = lexer.next_token()?;
        let current_position = lexer.token_start();
        Ok(Self { lexer, current_token, current_position, operators: 0, nesting: 0 })
    }

    fn advance(&mut self) -> CalcResult<()> {
        self.current_token = self.lexer.next_token()?;
        self.current_position = self.lexer.token_start();
        Ok(())
    }

    fn count_operator(&mut self) -> CalcResult<()> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(CalcError::parse(
                self.current_position,
                format!("expression has more than {MAX_OPERATORS} operators"),
            ));
        }
        Ok(())
    }

    fn unexpected(&self) -> CalcError {
        match self.current_token {
            Token::Eof => CalcError::parse(self.current_position, "unexpected end of expression"),
            Token::RightParen => {
                CalcError::parse(self.current_position, "unbalanced parentheses: unexpected ')'")
            }
            ref token => CalcError::parse(self.current_position, format!("unexpected token '{token}'")),
        }
    }

    /// Parse a complete expression, requiring all input to be consumed
    pub fn parse(&mut self) -> CalcResult<Node> {
        if matches!(self.current_token, Token::Eof) {
            return Err(CalcError::parse(self.current_position, "empty expression"));
        }

        let node = self.parse_additive_expression()?;

        if !matches!(self.current_token, Token::Eof) {
            return Err(self.unexpected());
        }

        Ok(node)
    }

    fn parse_additive_expression(&mut self) -> CalcResult<Node> {
        let mut left = self.parse_multiplicative_expression()?;

        while let Some(op @ (OperatorSymbol::Plus | OperatorSymbol::Minus)) =
            self.current_token.operator()
        {
            self.count_operator()?;
            self.advance()?;
            let right = self.parse_multiplicative_expression()?;
            left = Node::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> CalcResult<Node> {
        let mut left = self.parse_primary_expression()?;

        while let Some(op @ (OperatorSymbol::Multiply | OperatorSymbol::Divide)) =
            self.current_token.operator()
        {
            self.count_operator()?;
            self.advance()?;
            let right = self.parse_primary_expression()?;
            left = Node::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_primary_expression(&mut self) -> CalcResult<Node> {
        match self.current_token {
            Token::Number(value) => {
                self.advance()?;
                Ok(Node::number(value))
            }
            Token::LeftParen => {
                let open_position = self.current_position;
                self.nesting += 1;
                if self.nesting > MAX_NESTING {
                    return Err(CalcError::parse(
                        open_position,
                        format!("parentheses nest deeper than {MAX_NESTING} levels"),
                    ));
                }
                self.advance()?;
                let node = self.parse_additive_expression()?;
                self.nesting -= 1;
                match self.current_token {
                    Token::RightParen => {
                        self.advance()?;
                        Ok(node)
                    }
                    Token::Eof => Err(CalcError::parse(
                        open_position,
                        "unbalanced parentheses: missing ')'",
                    )),
                    _ => Err(self.unexpected()),
                }
            }
            _ => Err(self.unexpected()),
        }
    }
}

/// Convenience function to parse an expression string
pub fn parse_expression(input: &str) -> CalcResult<Node> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}
