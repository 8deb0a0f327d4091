use bytes::Bytes;

use crate::{DType, Element, InterpreterError, Result, Shape, Tensor, Value};

/// Caller values for one request, aligned by position with the input formats.
#[derive(Clone, Debug, Default)]
pub struct ModelInputs {
    values: Vec<Value>,
}

impl ModelInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, value: impl Into<Value>) -> &mut Self {
        self.values.push(value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl<V: Into<Value>> FromIterator<V> for ModelInputs {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Validated, execution-ready inputs keyed by graph index.
#[derive(Clone, Debug, Default)]
pub struct BoundInputs {
    pub tensors: Vec<(usize, Tensor)>,
}

impl BoundInputs {
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tensor> {
        self.tensors
            .iter()
            .find_map(|(i, t)| (*i == index).then_some(t))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutputTensor {
    pub index: usize,
    pub dtype: DType,
    pub shape: Shape,
    pub data: Bytes,
}

impl OutputTensor {
    pub fn from_tensor(index: usize, tensor: Tensor) -> Self {
        Self {
            index,
            dtype: tensor.dtype,
            shape: tensor.shape,
            data: tensor.data,
        }
    }

    /// Flat element values; `T` must match the output's element type.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.dtype {
            return Err(InterpreterError::invalid_argument(format!(
                "output {} holds {} elements, not {}",
                self.index,
                self.dtype,
                T::DTYPE
            )));
        }
        Ok(self
            .data
            .chunks_exact(self.dtype.byte_size())
            .map(T::from_le_slice)
            .collect())
    }

    /// Values nested along the output shape. A rank-0 output is a bare number.
    pub fn to_value(&self) -> Value {
        let width = self.dtype.byte_size();
        let leaves: Vec<Value> = self
            .data
            .chunks_exact(width)
            .map(|b| decode(self.dtype, b))
            .collect();
        nest(&leaves, self.shape.dims())
    }
}

fn decode(dtype: DType, b: &[u8]) -> Value {
    match dtype {
        DType::F32 => f32::from_le_slice(b).into(),
        DType::I64 => i64::from_le_slice(b).into(),
        DType::I32 => i32::from_le_slice(b).into(),
        DType::I16 => i16::from_le_slice(b).into(),
        DType::U8 => u8::from_le_slice(b).into(),
    }
}

fn nest(leaves: &[Value], dims: &[usize]) -> Value {
    match dims.split_first() {
        None => leaves.first().cloned().unwrap_or(Value::Array(Vec::new())),
        Some((_, rest)) => {
            let stride = rest.iter().product::<usize>();
            if stride == 0 {
                return Value::Array(Vec::new());
            }
            Value::Array(leaves.chunks(stride).map(|c| nest(c, rest)).collect())
        }
    }
}

/// Results of one `run`, aligned by position with the output formats.
#[derive(Clone, Debug, Default)]
pub struct ModelOutputs {
    outputs: Vec<OutputTensor>,
}

impl ModelOutputs {
    pub fn new(outputs: Vec<OutputTensor>) -> Self {
        Self { outputs }
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn output(&self, position: usize) -> Result<&OutputTensor> {
        self.outputs.get(position).ok_or_else(|| {
            InterpreterError::out_of_range(format!(
                "output {position} requested, {} available",
                self.outputs.len()
            ))
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OutputTensor> {
        self.outputs.iter()
    }
}

impl IntoIterator for ModelOutputs {
    type Item = OutputTensor;
    type IntoIter = std::vec::IntoIter<OutputTensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.outputs.into_iter()
    }
}
