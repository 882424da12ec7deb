//! The runtime value model.
//!
//! A [`Value`] is an integer, a float or a string. Arithmetic coerces both
//! sides to numbers first: the result stays an integer only when both sides
//! are integer-valued (an `Int`, or a string that parses as one without a
//! decimal point); any float contributor promotes the result to `Float`.
//!
//! Two flavours are offered. The in-place forms (`add`, `subtract`, ...)
//! mutate `self` and hand it back, and are what the loop step uses on its
//! hot path. The `checked_*` forms leave both operands alone and return a
//! new value; echo operators use those.

use std::cmp::Ordering;
use std::fmt;

use ember_core::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Subtract),
            "*" => Some(BinaryOp::Multiply),
            "/" => Some(BinaryOp::Divide),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
        }
    }
}

/// A value after numeric coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

/// Locale-independent parsing. Integers are tried first, but only for text
/// without a decimal point or exponent.
fn parse_number(text: &str) -> Result<Number, ScriptError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ScriptError::Format("empty string is not a number".into()));
    }
    if !trimmed.contains(['.', 'e', 'E']) {
        if let Ok(i) = trimmed.parse::<i64>() {
            return Ok(Number::Int(i));
        }
    }
    // Rust accepts "inf" and "NaN"; plain decimal notation only.
    if trimmed
        .bytes()
        .any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E')
    {
        return Err(ScriptError::Format(format!("'{}' is not a number", trimmed)));
    }
    trimmed
        .parse::<f64>()
        .map(Number::Float)
        .map_err(|_| ScriptError::Format(format!("'{}' is not a number", trimmed)))
}

fn compute(op: BinaryOp, lhs: Number, rhs: Number) -> Result<Number, ScriptError> {
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Subtract => a.checked_sub(b),
                BinaryOp::Multiply => a.checked_mul(b),
                BinaryOp::Divide => {
                    if b == 0 {
                        return Err(ScriptError::Arithmetic("division by zero".into()));
                    }
                    a.checked_div(b)
                }
            };
            result.map(Number::Int).ok_or_else(|| {
                ScriptError::Arithmetic(format!("integer overflow in {} {} {}", a, op.symbol(), b))
            })
        }
        _ => {
            let (a, b) = (lhs.as_f64(), rhs.as_f64());
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Subtract => a - b,
                BinaryOp::Multiply => a * b,
                BinaryOp::Divide => {
                    if b == 0.0 {
                        return Err(ScriptError::Arithmetic("division by zero".into()));
                    }
                    a / b
                }
            };
            Ok(Number::Float(result))
        }
    }
}

impl Value {
    fn number(&self) -> Result<Number, ScriptError> {
        match self {
            Value::Int(i) => Ok(Number::Int(*i)),
            Value::Float(f) => Ok(Number::Float(*f)),
            Value::Str(s) => parse_number(s),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.number().is_ok()
    }

    pub fn as_f64(&self) -> Result<f64, ScriptError> {
        self.number().map(Number::as_f64)
    }

    /// Applies `self OP operand` in place and returns `self` for chaining.
    pub fn apply(&mut self, op: BinaryOp, operand: &Value) -> Result<&mut Self, ScriptError> {
        let result = compute(op, self.number()?, operand.number()?)?;
        *self = result.into_value();
        Ok(self)
    }

    pub fn add(&mut self, operand: &Value) -> Result<&mut Self, ScriptError> {
        self.apply(BinaryOp::Add, operand)
    }

    pub fn subtract(&mut self, operand: &Value) -> Result<&mut Self, ScriptError> {
        self.apply(BinaryOp::Subtract, operand)
    }

    pub fn multiply(&mut self, operand: &Value) -> Result<&mut Self, ScriptError> {
        self.apply(BinaryOp::Multiply, operand)
    }

    pub fn divide(&mut self, operand: &Value) -> Result<&mut Self, ScriptError> {
        self.apply(BinaryOp::Divide, operand)
    }

    /// Non-mutating `self OP operand`.
    pub fn combine(&self, op: BinaryOp, operand: &Value) -> Result<Value, ScriptError> {
        compute(op, self.number()?, operand.number()?).map(Number::into_value)
    }

    pub fn checked_add(&self, operand: &Value) -> Result<Value, ScriptError> {
        self.combine(BinaryOp::Add, operand)
    }

    pub fn checked_sub(&self, operand: &Value) -> Result<Value, ScriptError> {
        self.combine(BinaryOp::Subtract, operand)
    }

    pub fn checked_mul(&self, operand: &Value) -> Result<Value, ScriptError> {
        self.combine(BinaryOp::Multiply, operand)
    }

    pub fn checked_div(&self, operand: &Value) -> Result<Value, ScriptError> {
        self.combine(BinaryOp::Divide, operand)
    }

    /// Numeric ordering; fails with a format error if either side is not a
    /// number. This is the comparison the for-loop termination test uses.
    pub fn numeric_compare(&self, operand: &Value) -> Result<Ordering, ScriptError> {
        match (self.number()?, operand.number()?) {
            (Number::Int(a), Number::Int(b)) => Ok(a.cmp(&b)),
            (a, b) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .ok_or_else(|| ScriptError::Format("NaN has no ordering".into())),
        }
    }

    /// Numeric when both sides are numbers, lexicographic on the rendered
    /// text otherwise.
    pub fn compare(&self, other: &Value) -> Ordering {
        match self.numeric_compare(other) {
            Ok(ordering) => ordering,
            Err(_) => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            // Whole floats keep one fractional digit so the tag stays visible.
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 => {
                write!(f, "{:.1}", x)
            }
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
