//! Arithmetic expression evaluator for the `calculator` tool.
//!
//! Expressions are tokenized and parsed with precedence climbing. Only the
//! operators `+ - * / ^`, `%`, parentheses, the constants `pi` and `e`, and the
//! functions in [`apply_function`] are accepted; anything else is rejected at
//! tokenization or parse time.
//!
//! `%` is a percentage: `a % b` is `a/100*b` (so `15 % 80` is `12`), and a
//! trailing `%` with no operand after it divides by 100 (`50%` is `0.5`).
//! Nesting is capped at [`MAX_DEPTH`] levels.

use std::fmt;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("Invalid character '{0}' in expression")]
    UnexpectedChar(char),
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
    #[error("Unexpected '{0}' in expression")]
    UnexpectedToken(String),
    #[error("Unexpected end of expression")]
    UnexpectedEnd,
    #[error("Unknown name '{0}'")]
    UnknownIdentifier(String),
    #[error("{name}() takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Result is not a number")]
    NotFinite,
    #[error("Expression is nested too deeply")]
    TooDeep,
}

/// Deepest nesting of parentheses, calls and signs accepted.
pub const MAX_DEPTH: usize = 64;

/// Evaluates an expression such as `"2 + 2 * 3"`, `"sqrt(16)"` or `"15% * 80"`.
pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression(0)?;
    if let Some(token) = parser.peek() {
        return Err(CalcError::UnexpectedToken(token.to_string()));
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Ident(name) => write!(f, "{name}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::Percent => write!(f, "%"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c.is_ascii_digit() || c == '.' {
            let mut literal = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    literal.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            let value = literal
                .parse::<f64>()
                .map_err(|_| CalcError::InvalidNumber(literal.clone()))?;
            tokens.push(Token::Number(value));
            continue;
        }
        if c.is_ascii_alphabetic() {
            let mut name = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_alphanumeric() || d == '_' {
                    name.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(name.to_ascii_lowercase()));
            continue;
        }
        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            other => return Err(CalcError::UnexpectedChar(other)),
        };
        tokens.push(token);
        chars.next();
    }
    Ok(tokens)
}

#[derive(Debug, Clone, Copy)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Percent,
}

impl BinaryOp {
    fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Caret => Some(BinaryOp::Pow),
            Token::Percent => Some(BinaryOp::Percent),
            _ => None,
        }
    }

    /// Precedence and right-associativity.
    fn binding(self) -> (u8, bool) {
        match self {
            BinaryOp::Add | BinaryOp::Sub => (1, false),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Percent => (2, false),
            BinaryOp::Pow => (4, true),
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Pow => lhs.powf(rhs),
            BinaryOp::Percent => lhs / 100.0 * rhs,
        }
    }
}

/// Binds tighter than `*` but looser than `^`, so `-2^2` is `-4`.
const UNARY_PRECEDENCE: u8 = 3;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

/// Whether `token` can begin an operand.
fn starts_operand(token: Option<&Token>) -> bool {
    matches!(
        token,
        Some(Token::Number(_) | Token::Ident(_) | Token::LParen)
    )
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), CalcError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(CalcError::UnexpectedToken(token.to_string())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    /// Every recursive path in the grammar passes through here.
    fn expression(&mut self, min_precedence: u8) -> Result<f64, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        self.depth += 1;
        let value = self.binary(min_precedence);
        self.depth -= 1;
        value
    }

    fn binary(&mut self, min_precedence: u8) -> Result<f64, CalcError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek().and_then(BinaryOp::from_token) {
            let (precedence, right_assoc) = op.binding();
            if precedence < min_precedence {
                break;
            }
            self.pos += 1;
            let next_min = if right_assoc { precedence } else { precedence + 1 };
            let rhs = self.expression(next_min)?;
            lhs = op.apply(lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.expression(UNARY_PRECEDENCE)?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.expression(UNARY_PRECEDENCE)
            }
            _ => self.postfix(),
        }
    }

    /// Trailing percent signs. A `%` followed by an operand is left for
    /// [`Parser::binary`].
    fn postfix(&mut self) -> Result<f64, CalcError> {
        let mut value = self.primary()?;
        while self.peek() == Some(&Token::Percent)
            && !starts_operand(self.tokens.get(self.pos + 1))
        {
            self.pos += 1;
            value /= 100.0;
        }
        Ok(value)
    }

    fn primary(&mut self) -> Result<f64, CalcError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expression(0)?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let args = self.arguments()?;
                    apply_function(&name, &args)
                } else {
                    constant(&name)
                }
            }
            Some(token) => Err(CalcError::UnexpectedToken(token.to_string())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    /// Parses `a, b, ...)` after an opening parenthesis.
    fn arguments(&mut self) -> Result<Vec<f64>, CalcError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expression(0)?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(token) => return Err(CalcError::UnexpectedToken(token.to_string())),
                None => return Err(CalcError::UnexpectedEnd),
            }
        }
    }
}

fn constant(name: &str) -> Result<f64, CalcError> {
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        _ => Err(CalcError::UnknownIdentifier(name.to_string())),
    }
}

/// The function table. Trigonometry is in radians and `log` is natural.
fn apply_function(name: &str, args: &[f64]) -> Result<f64, CalcError> {
    let arity = |expected: usize| CalcError::Arity {
        name: name.to_string(),
        expected,
        found: args.len(),
    };
    let unary = |f: fn(f64) -> f64| match args {
        [x] => Ok(f(*x)),
        _ => Err(arity(1)),
    };
    match name {
        "sqrt" => unary(f64::sqrt),
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "tan" => unary(f64::tan),
        "log" => unary(f64::ln),
        "exp" => unary(f64::exp),
        "abs" => unary(f64::abs),
        "pow" => match args {
            [base, exponent] => Ok(base.powf(*exponent)),
            _ => Err(arity(2)),
        },
        _ => Err(CalcError::UnknownIdentifier(name.to_string())),
    }
}
