use std::fmt;

use crate::{DType, Shape};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IOName(pub String);

impl IOName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IOName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IOName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for IOName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Anything the registry can index by position and by name.
pub trait NamedTensor {
    fn index(&self) -> usize;
    fn name(&self) -> Option<&IOName>;
}

/// A tensor as the loaded model graph declares it.
#[derive(Clone, Debug, PartialEq)]
pub struct IoSpec {
    pub index: usize,
    pub name: IOName,
    pub dtype: DType,
    pub dims: Vec<Option<usize>>, // None = dynamic
}

impl IoSpec {
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Fixed dimensions must agree; dynamic ones accept anything.
    pub fn accepts_shape(&self, shape: &Shape) -> bool {
        self.dims.len() == shape.rank()
            && self
                .dims
                .iter()
                .zip(shape.dims())
                .all(|(want, got)| want.is_none_or(|w| w == *got))
    }
}

impl NamedTensor for IoSpec {
    fn index(&self) -> usize {
        self.index
    }
    fn name(&self) -> Option<&IOName> {
        Some(&self.name)
    }
}

/// The loaded model graph's inputs and outputs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelSpec {
    pub inputs: Vec<IoSpec>,
    pub outputs: Vec<IoSpec>,
}

impl ModelSpec {
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Locates the graph input tensor carrying `index`.
    pub fn input(&self, index: usize) -> Option<&IoSpec> {
        self.inputs.iter().find(|t| t.index == index)
    }

    pub fn output(&self, index: usize) -> Option<&IoSpec> {
        self.outputs.iter().find(|t| t.index == index)
    }
}

/// Caller-declared contract for one input or output position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorSpec {
    pub index: usize,
    pub name: Option<IOName>,
    pub dtype: DType,
    pub shape: Shape,
    /// `None` when the shape is too large to address.
    pub byte_size: Option<usize>,
}

impl TensorSpec {
    pub fn new(index: usize, dtype: DType, shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        let byte_size = shape
            .numel()
            .and_then(|n| n.checked_mul(dtype.byte_size()));
        Self {
            index,
            name: None,
            dtype,
            shape,
            byte_size,
        }
    }

    pub fn with_name(mut self, name: impl Into<IOName>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl NamedTensor for TensorSpec {
    fn index(&self) -> usize {
        self.index
    }
    fn name(&self) -> Option<&IOName> {
        self.name.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_size_is_derived() {
        let spec = TensorSpec::new(0, DType::F32, [1, 4]);
        assert_eq!(spec.byte_size, Some(16));
        assert_eq!(TensorSpec::new(0, DType::U8, [3, 2]).byte_size, Some(6));
    }

    #[test]
    fn oversized_shape_has_no_byte_size() {
        assert_eq!(TensorSpec::new(0, DType::F32, [usize::MAX, 2]).byte_size, None);
        assert_eq!(TensorSpec::new(0, DType::I64, [usize::MAX / 4]).byte_size, None);
        assert_eq!(TensorSpec::new(0, DType::U8, [usize::MAX]).byte_size, Some(usize::MAX));
    }

    #[test]
    fn dynamic_dims_accept_any_extent() {
        let io = IoSpec {
            index: 0,
            name: "x".into(),
            dtype: DType::F32,
            dims: vec![None, Some(4)],
        };
        assert!(io.accepts_shape(&Shape::from([7, 4])));
        assert!(!io.accepts_shape(&Shape::from([7, 3])));
        assert!(!io.accepts_shape(&Shape::from([4])));
    }
}
