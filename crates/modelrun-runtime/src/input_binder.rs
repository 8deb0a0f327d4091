//! Turns caller values into execution-ready tensors.
//!
//! Checks run in a fixed order and the first failure wins: option lists,
//! input count, then per input its representation, size or nesting, and
//! finally agreement with the loaded graph. Everything but the graph check
//! runs in [`pack`], before a model has to be loaded.

use bytes::{Bytes, BytesMut};
use modelrun_core::{
    BoundInputs, DType, InterpreterError, ModelInputOutputOptions, ModelInputs, ModelSpec,
    Result, Tensor, TensorSpec, Value,
};

/// Checks that need no loaded model.
pub fn validate_request(inputs: &ModelInputs, options: &ModelInputOutputOptions) -> Result<()> {
    if options.inputs().is_empty() {
        return Err(InterpreterError::invalid_argument(
            "input formats in options are empty",
        ));
    }
    if options.outputs().is_empty() {
        return Err(InterpreterError::invalid_argument(
            "output formats in options are empty",
        ));
    }
    if inputs.len() != options.inputs().len() {
        return Err(InterpreterError::invalid_argument(format!(
            "expected {} inputs as declared in options, got {}",
            options.inputs().len(),
            inputs.len()
        )));
    }
    Ok(())
}

/// Validates every input against its declared format and packs it into a
/// tensor. Does not look at the model graph.
pub fn pack(inputs: &ModelInputs, options: &ModelInputOutputOptions) -> Result<BoundInputs> {
    validate_request(inputs, options)?;

    let mut tensors = Vec::with_capacity(inputs.len());
    for (pos, (value, spec)) in inputs.values().iter().zip(options.inputs()).enumerate() {
        let byte_size = spec.byte_size.ok_or_else(|| {
            InterpreterError::invalid_argument(format!(
                "input {pos}: format shape {} is too large",
                spec.shape
            ))
        })?;
        let data = match value {
            Value::Bytes(bytes) => {
                if bytes.len() != byte_size {
                    return Err(InterpreterError::invalid_argument(format!(
                        "input {pos}: byte buffer holds {} bytes, format expects {byte_size}",
                        bytes.len()
                    )));
                }
                bytes.clone()
            }
            Value::Array(_) => pack_array(value, spec, byte_size, pos)?,
            other => {
                return Err(InterpreterError::invalid_argument(format!(
                    "input {pos} is a {}, expected a byte buffer or an array",
                    other.kind()
                )))
            }
        };
        tensors.push((
            spec.index,
            Tensor::from_cpu_bytes(spec.dtype, spec.shape.clone(), data),
        ));
    }

    Ok(BoundInputs { tensors })
}

/// Checks every input format against the loaded graph.
pub fn check_graph(options: &ModelInputOutputOptions, graph: &ModelSpec) -> Result<()> {
    options
        .inputs()
        .iter()
        .try_for_each(|spec| check_against_graph(spec, graph))
}

pub fn bind(
    inputs: &ModelInputs,
    options: &ModelInputOutputOptions,
    graph: &ModelSpec,
) -> Result<BoundInputs> {
    let bound = pack(inputs, options)?;
    check_graph(options, graph)?;
    Ok(bound)
}

fn check_against_graph(spec: &TensorSpec, graph: &ModelSpec) -> Result<()> {
    if spec.index >= graph.input_count() {
        return Err(InterpreterError::out_of_range(format!(
            "input index {} is out of range, the model has {} inputs",
            spec.index,
            graph.input_count()
        )));
    }
    let Some(io) = graph.input(spec.index) else {
        return Err(InterpreterError::internal(format!(
            "input tensor {} cannot be located in the model",
            spec.index
        )));
    };
    if io.dtype != spec.dtype {
        return Err(InterpreterError::invalid_argument(format!(
            "input {} is declared as {} but the model expects {}",
            spec.index, spec.dtype, io.dtype
        )));
    }
    if !io.accepts_shape(&spec.shape) {
        return Err(InterpreterError::invalid_argument(format!(
            "input {} dimensions {} do not match the model's {:?}",
            spec.index, spec.shape, io.dims
        )));
    }
    Ok(())
}

// Upper bound on the up-front buffer for array inputs; larger ones grow.
const PREALLOC_LIMIT: usize = 16 << 20;

fn pack_array(
    value: &Value,
    spec: &TensorSpec,
    byte_size: usize,
    pos: usize,
) -> Result<Bytes> {
    if spec.shape.rank() == 0 {
        return Err(InterpreterError::invalid_argument(format!(
            "input {pos}: a scalar format cannot be fed by an array"
        )));
    }
    let mut packer = Packer {
        pos,
        dtype: spec.dtype,
        rank: spec.shape.rank(),
        buf: BytesMut::with_capacity(byte_size.min(PREALLOC_LIMIT)),
    };
    packer.pack(value, spec.shape.dims())?;
    Ok(packer.buf.freeze())
}

struct Packer {
    pos: usize,
    dtype: DType,
    rank: usize,
    buf: BytesMut,
}

impl Packer {
    fn pack(&mut self, value: &Value, dims: &[usize]) -> Result<()> {
        let pos = self.pos;
        let Some((&extent, rest)) = dims.split_first() else {
            return match value {
                Value::Number(n) if n.dtype() == self.dtype => {
                    n.put_le(&mut self.buf);
                    Ok(())
                }
                Value::Number(n) => Err(InterpreterError::invalid_argument(format!(
                    "input {pos}: element type {} does not match format type {}",
                    n.dtype(),
                    self.dtype
                ))),
                Value::Array(_) => Err(InterpreterError::invalid_argument(format!(
                    "input {pos}: array nests deeper than the {}-d format",
                    self.rank
                ))),
                other => Err(InterpreterError::invalid_argument(format!(
                    "input {pos}: element is a {}, not a number",
                    other.kind()
                ))),
            };
        };

        let depth = self.rank - dims.len();
        match value {
            Value::Array(items) if items.len() == extent => {
                items.iter().try_for_each(|item| self.pack(item, rest))
            }
            Value::Array(items) => Err(InterpreterError::invalid_argument(format!(
                "input {pos}: dimension {depth} has {} elements, format expects {extent}",
                items.len()
            ))),
            other => Err(InterpreterError::invalid_argument(format!(
                "input {pos}: expected an array at dimension {depth}, found a {}",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use modelrun_core::{bytes_from_elements, ErrorKind, IoSpec};

    fn graph() -> ModelSpec {
        ModelSpec {
            inputs: vec![IoSpec {
                index: 0,
                name: "x".into(),
                dtype: DType::F32,
                dims: vec![None, Some(4)],
            }],
            outputs: vec![IoSpec {
                index: 0,
                name: "y".into(),
                dtype: DType::F32,
                dims: vec![Some(1), Some(2)],
            }],
        }
    }

    fn options() -> ModelInputOutputOptions {
        let mut opts = ModelInputOutputOptions::new();
        opts.set_input_format(0, DType::F32, [1, 4])
            .set_output_format(0, DType::F32, [1, 2]);
        opts
    }

    fn single(value: impl Into<Value>) -> ModelInputs {
        let mut inputs = ModelInputs::new();
        inputs.add_input(value);
        inputs
    }

    fn kind(res: Result<BoundInputs>) -> ErrorKind {
        res.unwrap_err().kind()
    }

    #[test]
    fn binds_exact_byte_buffer() {
        let data = bytes_from_elements(&[1.0f32, 2.0, 3.0, 4.0]);
        let bound = bind(&single(data.clone()), &options(), &graph()).unwrap();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound.get(0).unwrap().data, data);
    }

    #[test]
    fn nested_array_packs_like_bytes() {
        let bound = bind(
            &single(vec![vec![1.0f32, 2.0, 3.0, 4.0]]),
            &options(),
            &graph(),
        )
        .unwrap();
        assert_eq!(
            bound.get(0).unwrap().data,
            bytes_from_elements(&[1.0f32, 2.0, 3.0, 4.0])
        );
    }

    #[test]
    fn empty_format_lists_are_rejected() {
        let mut no_outputs = ModelInputOutputOptions::new();
        no_outputs.set_input_format(0, DType::F32, [1, 4]);
        let data = Bytes::from(vec![0u8; 16]);
        assert_eq!(
            kind(bind(&single(data.clone()), &no_outputs, &graph())),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            kind(bind(&single(data), &ModelInputOutputOptions::new(), &graph())),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn input_count_must_match() {
        let res = bind(&ModelInputs::new(), &options(), &graph());
        assert_eq!(kind(res), ErrorKind::InvalidArgument);
    }

    #[test]
    fn off_by_one_byte_is_rejected() {
        for len in [15, 17] {
            let res = bind(&single(Bytes::from(vec![0u8; len])), &options(), &graph());
            assert_eq!(kind(res), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn scalar_and_text_inputs_are_rejected() {
        assert_eq!(
            kind(bind(&single(1.0f32), &options(), &graph())),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            kind(bind(&single("pixels"), &options(), &graph())),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn array_shape_and_leaves_are_checked() {
        let cases: Vec<Value> = vec![
            vec![vec![1.0f32, 2.0, 3.0]].into(),
            vec![1.0f32, 2.0, 3.0, 4.0].into(),
            vec![vec![1i32, 2, 3, 4]].into(),
            vec![Value::from(vec![Value::from(1.0f32), "two".into(), 3.0f32.into(), 4.0f32.into()])]
                .into(),
            vec![vec![vec![1.0f32], vec![2.0], vec![3.0], vec![4.0]]].into(),
        ];
        for value in cases {
            let res = bind(&single(value.clone()), &options(), &graph());
            assert_eq!(kind(res), ErrorKind::InvalidArgument, "{value:?}");
        }
    }

    #[test]
    fn graph_disagreements_map_to_their_kinds() {
        let data = || single(Bytes::from(vec![0u8; 16]));

        let mut wrong_type = ModelInputOutputOptions::new();
        wrong_type
            .set_input_format(0, DType::I32, [1, 4])
            .set_output_format(0, DType::F32, [1, 2]);
        assert_eq!(
            kind(bind(&data(), &wrong_type, &graph())),
            ErrorKind::InvalidArgument
        );

        let mut wrong_dims = ModelInputOutputOptions::new();
        wrong_dims
            .set_input_format(0, DType::F32, [2, 2])
            .set_output_format(0, DType::F32, [1, 2]);
        assert_eq!(
            kind(bind(&data(), &wrong_dims, &graph())),
            ErrorKind::InvalidArgument
        );

        let mut out_of_range = ModelInputOutputOptions::new();
        out_of_range
            .set_input_format(1, DType::F32, [1, 4])
            .set_output_format(0, DType::F32, [1, 2]);
        assert_eq!(
            kind(bind(&data(), &out_of_range, &graph())),
            ErrorKind::OutOfRange
        );

        let mut sparse = graph();
        sparse.inputs[0].index = 3;
        assert_eq!(kind(bind(&data(), &options(), &sparse)), ErrorKind::Internal);
    }

    #[test]
    fn packing_errors_win_over_graph_errors() {
        let mut out_of_range = ModelInputOutputOptions::new();
        out_of_range
            .set_input_format(1, DType::F32, [1, 4])
            .set_output_format(0, DType::F32, [1, 2]);
        let short = single(Bytes::from(vec![0u8; 12]));
        assert_eq!(
            kind(bind(&short, &out_of_range, &graph())),
            ErrorKind::InvalidArgument
        );
        assert_eq!(kind(pack(&short, &options())), ErrorKind::InvalidArgument);
        assert!(pack(&single(Bytes::from(vec![0u8; 16])), &out_of_range).is_ok());
    }

    #[test]
    fn oversized_format_is_rejected() {
        let mut huge = ModelInputOutputOptions::new();
        huge.set_input_format(0, DType::F32, [usize::MAX, 2])
            .set_output_format(0, DType::F32, [1, 2]);
        for value in [
            Value::from(Bytes::from(vec![0u8; 16])),
            vec![vec![1.0f32, 2.0]].into(),
        ] {
            let res = pack(&single(value), &huge);
            assert_eq!(kind(res), ErrorKind::InvalidArgument);
        }

        let mut wide = ModelInputOutputOptions::new();
        wide.set_input_format(0, DType::U8, [usize::MAX])
            .set_output_format(0, DType::F32, [1, 2]);
        let res = pack(&single(vec![1u8, 2, 3]), &wide);
        assert_eq!(kind(res), ErrorKind::InvalidArgument);
    }
}
