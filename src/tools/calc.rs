//! Safe arithmetic evaluator used by the `calculate` endpoint.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/' | '%') unary)*
//! unary  := ('+' | '-') unary | power
//! power  := atom ('^' unary)?
//! atom   := number | constant | func '(' expr ')' | '(' expr ')'
//! ```
//!
//! Functions: `sin cos tan sqrt log abs exp`, optionally prefixed with
//! `Math.`. Trigonometric functions take radians. Constants: `pi`, `e`.
//! Nesting (parentheses, function calls, repeated signs) is capped at
//! [`MAX_DEPTH`] levels.

use thiserror::Error;

/// Deepest nesting the evaluator accepts.
pub const MAX_DEPTH: usize = 64;

/// Evaluation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    /// Nothing but whitespace.
    #[error("Empty expression")]
    Empty,

    /// A character the grammar does not allow here.
    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedChar {
        /// Offending character.
        found: char,
        /// Character offset.
        position: usize,
    },

    /// Input ended mid-expression.
    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    /// Neither a known function nor a constant.
    #[error("Unknown identifier: {name}")]
    UnknownIdentifier {
        /// Identifier as written.
        name: String,
    },

    /// Nesting went past [`MAX_DEPTH`].
    #[error("Expression nested deeper than {max} levels")]
    TooDeep {
        /// The limit that was hit.
        max: usize,
    },

    /// Division or remainder by zero.
    #[error("Division by zero")]
    DivisionByZero,

    /// NaN or infinity.
    #[error("Result is not a finite number")]
    NotFinite,
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let chars: Vec<char> = expression.chars().collect();
    let mut parser = Parser {
        chars,
        pos: 0,
        depth: 0,
    };

    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Err(CalcError::Empty);
    }

    let value = parser.expr()?;
    parser.skip_whitespace();
    if let Some(found) = parser.peek() {
        return Err(CalcError::UnexpectedChar {
            found,
            position: parser.pos,
        });
    }

    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalcError::NotFinite)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), CalcError> {
        if self.eat(expected) {
            return Ok(());
        }
        match self.peek() {
            Some(found) => Err(CalcError::UnexpectedChar {
                found,
                position: self.pos,
            }),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        loop {
            if self.eat('+') {
                value += self.term()?;
            } else if self.eat('-') {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        loop {
            if self.eat('*') {
                value *= self.unary()?;
            } else if self.eat('/') {
                let divisor = self.unary()?;
                if divisor == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                value /= divisor;
            } else if self.eat('%') {
                let divisor = self.unary()?;
                if divisor == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                value %= divisor;
            } else {
                return Ok(value);
            }
        }
    }

    // Every recursive path passes through here, so the depth is tracked once.
    fn unary(&mut self) -> Result<f64, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep { max: MAX_DEPTH });
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<f64, CalcError> {
        if self.eat('-') {
            return Ok(-self.unary()?);
        }
        if self.eat('+') {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.atom()?;
        if self.eat('^') {
            // Right associative: 2^3^2 = 2^9
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, CalcError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(CalcError::UnexpectedEnd),
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                self.expect(')')?;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.identifier(),
            Some(found) => Err(CalcError::UnexpectedChar {
                found,
                position: self.pos,
            }),
        }
    }

    fn number(&mut self) -> Result<f64, CalcError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.')
        {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal.parse().map_err(|_| CalcError::UnexpectedChar {
            found: '.',
            position: start,
        })
    }

    fn identifier(&mut self) -> Result<f64, CalcError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
        {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        let lowered = raw.to_lowercase();
        let name = lowered.strip_prefix("math.").unwrap_or(&lowered);

        match name {
            "pi" => return Ok(std::f64::consts::PI),
            "e" => return Ok(std::f64::consts::E),
            _ => {}
        }

        let function: fn(f64) -> f64 = match name {
            "sin" => f64::sin,
            "cos" => f64::cos,
            "tan" => f64::tan,
            "sqrt" => f64::sqrt,
            "log" => f64::ln,
            "abs" => f64::abs,
            "exp" => f64::exp,
            _ => return Err(CalcError::UnknownIdentifier { name: raw }),
        };

        self.expect('(')?;
        let argument = self.expr()?;
        self.expect(')')?;
        Ok(function(argument))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("2+3*4"), Ok(14.0));
        assert_eq!(evaluate("(2+3)*4"), Ok(20.0));
        assert_eq!(evaluate("10 - 4 - 3"), Ok(3.0));
        assert_eq!(evaluate("20 / 4 / 5"), Ok(1.0));
        assert_eq!(evaluate("7 % 4"), Ok(3.0));
    }

    #[test]
    fn test_unary_and_power() {
        assert_eq!(evaluate("-3 + 5"), Ok(2.0));
        assert_eq!(evaluate("2^3^2"), Ok(512.0));
        assert_eq!(evaluate("-2^2"), Ok(-4.0));
        assert_eq!(evaluate("2^-1"), Ok(0.5));
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(evaluate("sqrt(16)"), Ok(4.0));
        assert_eq!(evaluate("Math.sqrt(16)"), Ok(4.0));
        assert!(approx(evaluate("sin(pi / 2)").unwrap(), 1.0));
        assert!(approx(evaluate("log(e)").unwrap(), 1.0));
        assert_eq!(evaluate("abs(-2.5)"), Ok(2.5));
    }

    #[test]
    fn test_errors() {
        assert_eq!(evaluate(""), Err(CalcError::Empty));
        assert_eq!(evaluate("1/0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("2+"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("(1+2"), Err(CalcError::UnexpectedEnd));
        assert!(matches!(
            evaluate("alert(1)"),
            Err(CalcError::UnknownIdentifier { .. })
        ));
        assert!(matches!(
            evaluate("2 $ 3"),
            Err(CalcError::UnexpectedChar { found: '$', .. })
        ));
        assert_eq!(evaluate("sqrt(-1)"), Err(CalcError::NotFinite));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(evaluate(&nested(20)), Ok(1.0));

        let max = Err(CalcError::TooDeep { max: MAX_DEPTH });
        assert_eq!(evaluate(&nested(200_000)), max);
        assert_eq!(evaluate(&"-".repeat(200_000)), max);
        assert_eq!(evaluate(&format!("{}1", "sqrt(".repeat(1_000))), max);
    }
}
