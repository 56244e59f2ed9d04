//! Calculator Agent
//!
//! Evaluates arithmetic expressions and solves linear equations in one
//! variable. Every outcome, including bad input, is a normal text reply; the
//! agent only fails when there is no user message to answer.

use async_trait::async_trait;
use parley_a2a::{
    AgentCard, AgentHandler, InteractionMode, MessageRole, ParameterSpec, Skill, TaskMessage,
};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// Variables an equation may be written in
pub const VARIABLES: [char; 3] = ['x', 'y', 'z'];

/// Deepest nesting of parentheses and unary signs the parser accepts
pub const MAX_DEPTH: usize = 256;

/// Longest token sequence accepted for one expression or equation side
pub const MAX_TOKENS: usize = 1024;

const INVALID_EXPRESSION: &str =
    "Invalid expression. Please use only numbers and operators (+, -, *, /, parentheses).";

/// Errors raised while evaluating or solving
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("invalid character '{0}'")]
    InvalidCharacter(char),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NotFinite,

    #[error("equation is not linear in {0}")]
    NotLinear(char),

    #[error("equation has no solution")]
    NoSolution,

    #[error("every value of {0} is a solution")]
    Indeterminate(char),

    #[error("expected exactly one '=' sign")]
    BadEquation,

    #[error("expression nested deeper than {} levels", MAX_DEPTH)]
    TooDeep,

    #[error("expression longer than {} tokens", MAX_TOKENS)]
    TooLong,
}

pub type CalcResult<T> = Result<T, CalcError>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Variable,
    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {n}"),
            Token::Variable => "variable".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::LeftParen => "'('".to_string(),
            Token::RightParen => "')'".to_string(),
        }
    }
}

/// Split `input` into tokens; `variable` is the only letter accepted
fn tokenize(input: &str, variable: Option<char>) -> CalcResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => {
                pos += 1;
                continue;
            }
            '0'..='9' | '.' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| CalcError::InvalidNumber(text.clone()))?;
                tokens.push(Token::Number(value));
                continue;
            }
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' => tokens.push(Token::Star),
            '/' => tokens.push(Token::Slash),
            '(' => tokens.push(Token::LeftParen),
            ')' => tokens.push(Token::RightParen),
            c if Some(c) == variable => tokens.push(Token::Variable),
            other => return Err(CalcError::InvalidCharacter(other)),
        }
        pos += 1;
        if tokens.len() > MAX_TOKENS {
            return Err(CalcError::TooLong);
        }
    }
    Ok(tokens)
}

/// Parsed arithmetic expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable,
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate with the variable bound to `value`
    pub fn eval(&self, value: f64) -> CalcResult<f64> {
        let result = match self {
            Expr::Number(n) => *n,
            Expr::Variable => value,
            Expr::Neg(inner) => -inner.eval(value)?,
            Expr::Add(a, b) => a.eval(value)? + b.eval(value)?,
            Expr::Sub(a, b) => a.eval(value)? - b.eval(value)?,
            Expr::Mul(a, b) => a.eval(value)? * b.eval(value)?,
            Expr::Div(a, b) => {
                let divisor = b.eval(value)?;
                if divisor == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                a.eval(value)? / divisor
            }
        };
        if result.is_finite() {
            Ok(result)
        } else {
            Err(CalcError::NotFinite)
        }
    }
}

/// Recursive-descent parser.
///
/// ```text
/// expr    := term (('+' | '-') term)*
/// term    := unary (('*' | '/') unary | implicit)*
/// unary   := ('-' | '+') unary | primary
/// primary := number | variable | '(' expr ')'
/// ```
///
/// A factor directly followed by a variable or `(` multiplies implicitly, so
/// `2x` and `3(x + 1)` parse as products.
///
/// Token count and nesting depth are both bounded, which also bounds the
/// height of the resulting tree.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn parse(input: &str, variable: Option<char>) -> CalcResult<Expr> {
        let mut parser = Parser {
            tokens: tokenize(input, variable)?,
            pos: 0,
            depth: 0,
        };
        let expr = parser.expression()?;
        match parser.peek() {
            None => Ok(expr),
            Some(token) => Err(CalcError::UnexpectedToken(token.describe())),
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn nested(&mut self, rule: fn(&mut Self) -> CalcResult<Expr>) -> CalcResult<Expr> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn expression(&mut self) -> CalcResult<Expr> {
        let mut left = self.term()?;
        while let Some(token @ (Token::Plus | Token::Minus)) = self.peek() {
            self.advance();
            let right = self.term()?;
            left = if token == Token::Plus {
                Expr::Add(Box::new(left), Box::new(right))
            } else {
                Expr::Sub(Box::new(left), Box::new(right))
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> CalcResult<Expr> {
        let mut left = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    left = Expr::Mul(Box::new(left), Box::new(self.unary()?));
                }
                Some(Token::Slash) => {
                    self.advance();
                    left = Expr::Div(Box::new(left), Box::new(self.unary()?));
                }
                Some(Token::Variable | Token::LeftParen) => {
                    left = Expr::Mul(Box::new(left), Box::new(self.primary()?));
                }
                _ => return Ok(left),
            }
        }
    }

    fn unary(&mut self) -> CalcResult<Expr> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.nested(Self::unary)?)))
            }
            Some(Token::Plus) => {
                self.advance();
                self.nested(Self::unary)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> CalcResult<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Variable) => Ok(Expr::Variable),
            Some(Token::LeftParen) => {
                let inner = self.nested(Self::expression)?;
                match self.advance() {
                    Some(Token::RightParen) => Ok(inner),
                    Some(other) => Err(CalcError::UnexpectedToken(other.describe())),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(other) => Err(CalcError::UnexpectedToken(other.describe())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

/// Evaluate a plain arithmetic expression
pub fn evaluate(expression: &str) -> CalcResult<f64> {
    Parser::parse(expression, None)?.eval(0.0)
}

/// Solve a linear equation in `variable`, e.g. `2x + 5 = 15`.
///
/// Both sides may mention the variable. The difference of the two sides is
/// sampled at three points to obtain its slope and confirm it is linear.
pub fn solve_linear(equation: &str, variable: char) -> CalcResult<f64> {
    let mut sides = equation.split('=');
    let (Some(left), Some(right), None) = (sides.next(), sides.next(), sides.next()) else {
        return Err(CalcError::BadEquation);
    };
    let left = Parser::parse(left, Some(variable))?;
    let right = Parser::parse(right, Some(variable))?;
    let f = |v: f64| -> CalcResult<f64> { Ok(left.eval(v)? - right.eval(v)?) };

    let (f0, f1, f2) = (f(0.0)?, f(1.0)?, f(2.0)?);
    let slope = f1 - f0;
    let tolerance = 1e-9 * (1.0 + f0.abs().max(f1.abs()).max(f2.abs()));
    if ((f2 - f1) - slope).abs() > tolerance {
        return Err(CalcError::NotLinear(variable));
    }
    if slope.abs() <= tolerance {
        return Err(if f0.abs() <= tolerance {
            CalcError::Indeterminate(variable)
        } else {
            CalcError::NoSolution
        });
    }

    let solution = -f0 / slope;
    let residual = f(solution)?;
    if residual.abs() > 1e-6 * (1.0 + f0.abs()) {
        return Err(CalcError::NotLinear(variable));
    }
    Ok(solution)
}

/// Render a number without a fractional part when it is integral
pub fn format_number(value: f64) -> String {
    if value.abs() >= 1e15 {
        return format!("{value}");
    }
    let rounded = (value * 1e10).round() / 1e10;
    if rounded == 0.0 {
        return "0".to_string();
    }
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

/// Answer one calculator request as reply text
pub fn respond(input: &str) -> String {
    let content = input.trim().to_lowercase();

    if content.contains('=') {
        if let Some(variable) = VARIABLES.into_iter().find(|v| content.contains(*v)) {
            let equation = content.replace("solve", "");
            let equation = equation.trim();
            return match solve_linear(equation, variable) {
                Ok(value) => format!("The solution is {variable} = {}", format_number(value)),
                Err(CalcError::BadEquation) => {
                    "Invalid equation format. Please use format like '2x + 5 = 15'".to_string()
                }
                Err(err) => format!("Error solving equation: {err}"),
            };
        }
    }

    let expression = content.replace("calculate", "").replace("what is", "");
    let expression = expression.trim().trim_end_matches('?').trim_end();
    if expression.is_empty()
        || !expression
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || "+-*/().".contains(c))
    {
        return INVALID_EXPRESSION.to_string();
    }

    match evaluate(expression) {
        Ok(value) => format!("The result of {expression} is {}", format_number(value)),
        Err(err) => format!("Error calculating expression: {err}"),
    }
}

/// Agent that performs calculations
#[derive(Debug, Clone)]
pub struct CalculatorAgent {
    url: String,
}

impl CalculatorAgent {
    pub const NAME: &'static str = "CalculatorAgent";

    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl AgentHandler for CalculatorAgent {
    fn agent_card(&self) -> AgentCard {
        AgentCard::new(
            Self::NAME,
            "An agent that performs basic mathematical calculations",
            self.url.clone(),
        )
        .with_skill(
            Skill::new(
                "calculate",
                "Perform mathematical calculations (addition, subtraction, multiplication, division)",
            )
            .with_parameter(
                "expression",
                ParameterSpec::string("Mathematical expression to evaluate"),
            ),
        )
        .with_skill(
            Skill::new("solve_equation", "Solve simple linear equations").with_parameter(
                "equation",
                ParameterSpec::string("Linear equation to solve (e.g., '2x + 5 = 15')"),
            ),
        )
        .with_interaction_modes(vec![InteractionMode::Text])
        .with_metadata("version", json!("1.0.0"))
        .with_metadata("type", json!("calculator"))
    }

    async fn handle_message(&self, history: &[TaskMessage]) -> Result<String, String> {
        let message = history
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .ok_or_else(|| "no user message to answer".to_string())?;
        let reply = respond(&message.content);
        debug!(input = %message.content, reply = %reply, "Calculated");
        Ok(reply)
    }
}
