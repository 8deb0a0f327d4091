//! Dynamic values callers hand to the interpreter and get back from it.
//!
//! Inputs are either raw little-endian byte buffers or nested arrays of typed
//! numbers whose nesting mirrors the tensor shape. Scalars and text exist so a
//! caller can express an ill-formed input and get a proper error back.

use bytes::{BufMut, Bytes, BytesMut};

use crate::DType;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    F32(f32),
    I64(i64),
    I32(i32),
    I16(i16),
    U8(u8),
}

impl Number {
    pub fn dtype(&self) -> DType {
        match self {
            Number::F32(_) => DType::F32,
            Number::I64(_) => DType::I64,
            Number::I32(_) => DType::I32,
            Number::I16(_) => DType::I16,
            Number::U8(_) => DType::U8,
        }
    }

    pub fn put_le(&self, buf: &mut BytesMut) {
        match *self {
            Number::F32(v) => buf.put_f32_le(v),
            Number::I64(v) => buf.put_i64_le(v),
            Number::I32(v) => buf.put_i32_le(v),
            Number::I16(v) => buf.put_i16_le(v),
            Number::U8(v) => buf.put_u8(v),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bytes(Bytes),
    Array(Vec<Value>),
    Number(Number),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bytes(_) => "byte buffer",
            Value::Array(_) => "array",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// A Rust scalar type with a tensor element type.
pub trait Element: Copy + Into<Number> {
    const DTYPE: DType;

    fn from_le_slice(b: &[u8]) -> Self;
}

macro_rules! element {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Number {
            fn from(v: $ty) -> Self {
                Number::$variant(v)
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::Number(Number::$variant(v))
            }
        }

        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            fn from_le_slice(b: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(b);
                <$ty>::from_le_bytes(raw)
            }
        }
    };
}

element!(f32, F32);
element!(i64, I64);
element!(i32, I32);
element!(i16, I16);
element!(u8, U8);

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Packs a flat slice of elements into little-endian bytes.
pub fn bytes_from_elements<T: Element>(values: &[T]) -> Bytes {
    let mut buf = BytesMut::with_capacity(values.len() * T::DTYPE.byte_size());
    for v in values {
        Into::<Number>::into(*v).put_le(&mut buf);
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_vec_builds_array() {
        let v = Value::from(vec![vec![1.0f32, 2.0], vec![3.0, 4.0]]);
        let rows = v.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].as_array().unwrap()[0], Value::Number(Number::F32(3.0)));
    }

    #[test]
    fn packs_little_endian() {
        let b = bytes_from_elements(&[1i16, -2]);
        assert_eq!(&b[..], &[1, 0, 0xfe, 0xff]);
        assert_eq!(i16::from_le_slice(&b[2..4]), -2);
    }
}
