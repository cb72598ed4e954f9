use std::fmt::Display;

use thiserror::Error;

/// ByteString - raw 8-bit string, kept apart from UTF-8 text on the wire
pub type ByteString = Vec<u8>;

#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Null,
    Int(i64),
    Long(LongNum),
    Float(f64),
    Complex(f64, f64),
    Bool(bool),
    Bytes(ByteString),
    Text(String),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    Dict(Vec<(Value, Value)>),
    Pickle(Opaque),
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Null => write!(f, "none"),
            Self::Int(_) => write!(f, "int"),
            Self::Long(_) => write!(f, "long"),
            Self::Float(_) => write!(f, "float"),
            Self::Complex(..) => write!(f, "complex"),
            Self::Bool(_) => write!(f, "bool"),
            Self::Bytes(_) => write!(f, "string"),
            Self::Text(_) => write!(f, "unicode"),
            Self::Tuple(_) => write!(f, "tuple"),
            Self::List(_) => write!(f, "list"),
            Self::Dict(_) => write!(f, "dict"),
            Self::Pickle(_) => write!(f, "pickle"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<LongNum> for Value {
    fn from(value: LongNum) -> Self {
        Self::Long(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<(Value, Value)>> for Value {
    fn from(value: Vec<(Value, Value)>) -> Self {
        Self::Dict(value)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, Self::Int(v) if v == other)
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        matches!(self, Self::Bool(v) if v == other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, Self::Text(v) if v == other)
    }
}

/// Arbitrary-precision signed decimal, stored canonically: optional leading
/// '-', no leading zeros, never "-0". The codec only carries these numbers,
/// it never computes with them.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LongNum(String);

#[derive(Debug, PartialEq, Eq, Error)]
pub enum LongNumError {
    #[error("empty long literal")]
    Empty,
    #[error("invalid digit in long literal: {0:?}")]
    InvalidDigit(char),
}

impl LongNum {
    pub fn parse(text: &str) -> Result<LongNum, LongNumError> {
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };

        if digits.is_empty() {
            return Err(LongNumError::Empty);
        }
        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_digit()) {
            return Err(LongNumError::InvalidDigit(bad));
        }

        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(LongNum(String::from("0")));
        }

        let mut canonical = String::with_capacity(digits.len() + 1);
        if negative {
            canonical.push('-');
        }
        canonical.push_str(digits);
        Ok(LongNum(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for LongNum {
    fn from(value: i64) -> Self {
        LongNum(value.to_string())
    }
}

impl From<i128> for LongNum {
    fn from(value: i128) -> Self {
        LongNum(value.to_string())
    }
}

impl Display for LongNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fallback carrier for data outside the core taxonomy. The method
/// identifier travels with the payload, so a peer that cannot interpret the
/// bytes can still re-emit them verbatim.
#[derive(Clone, PartialEq, Debug)]
pub struct Opaque {
    pub method: String,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod test_value {
    use super::*;

    #[test]
    fn display_is_the_wire_tag() {
        assert_eq!(Value::Null.to_string(), "none");
        assert_eq!(Value::Tuple(vec![]).to_string(), "tuple");
        assert_eq!(Value::Bytes(b"x".to_vec()).to_string(), "string");
        assert_eq!(Value::Text(String::from("x")).to_string(), "unicode");
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from("hi"), Value::Text(String::from("hi")));
        assert_eq!(Value::from(&b"hi"[..]), Value::Bytes(b"hi".to_vec()));
        assert_eq!(Value::from(true), Value::Bool(true));
    }

    #[test]
    fn long_parse_canonicalizes() {
        assert_eq!(LongNum::parse("0042").unwrap().as_str(), "42");
        assert_eq!(LongNum::parse("-0042").unwrap().as_str(), "-42");
        assert_eq!(LongNum::parse("+7").unwrap().as_str(), "7");
        assert_eq!(LongNum::parse("-0").unwrap().as_str(), "0");
        assert_eq!(LongNum::parse("000").unwrap().as_str(), "0");
    }

    #[test]
    fn long_parse_keeps_big_numbers_intact() {
        let digits = "123456789012345678901234567890";
        assert_eq!(LongNum::parse(digits).unwrap().as_str(), digits);
    }

    #[test]
    fn long_parse_rejects_garbage() {
        assert_eq!(LongNum::parse("").unwrap_err(), LongNumError::Empty);
        assert_eq!(LongNum::parse("-").unwrap_err(), LongNumError::Empty);
        assert_eq!(
            LongNum::parse("12x4").unwrap_err(),
            LongNumError::InvalidDigit('x')
        );
    }

    #[test]
    fn long_from_i128() {
        assert_eq!(
            LongNum::from(-170141183460469231731687303715884105728i128).as_str(),
            "-170141183460469231731687303715884105728"
        );
    }
}
