use std::collections::HashMap;

use crate::{InterpreterError, ModelSpec, NamedTensor, Result};

/// Ordered input and output specs, indexed by position and by name.
#[derive(Clone, Debug)]
pub struct TensorSpecRegistry<T> {
    inputs: Vec<T>,
    outputs: Vec<T>,
    input_names: HashMap<String, usize>,
    output_names: HashMap<String, usize>,
}

impl<T> Default for TensorSpecRegistry<T> {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            input_names: HashMap::new(),
            output_names: HashMap::new(),
        }
    }
}

impl<T: NamedTensor> TensorSpecRegistry<T> {
    pub fn new(inputs: Vec<T>, outputs: Vec<T>) -> Self {
        let input_names = name_map(&inputs);
        let output_names = name_map(&outputs);
        Self {
            inputs,
            outputs,
            input_names,
            output_names,
        }
    }

    pub fn inputs(&self) -> &[T] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[T] {
        &self.outputs
    }

    pub fn input_by_name(&self, name: &str) -> Option<&T> {
        self.input_names.get(name).map(|&pos| &self.inputs[pos])
    }

    pub fn output_by_name(&self, name: &str) -> Option<&T> {
        self.output_names.get(name).map(|&pos| &self.outputs[pos])
    }

    /// Index of the input op called `name`, checked against `graph`.
    pub fn resolve_input_index(&self, name: &str, graph: &ModelSpec) -> Result<usize> {
        let spec = self
            .input_by_name(name)
            .ok_or_else(|| InterpreterError::out_of_range(format!("no input op named `{name}`")))?;
        if graph.input(spec.index()).is_none() {
            return Err(InterpreterError::internal(format!(
                "input op `{name}` (index {}) cannot be located in the model",
                spec.index()
            )));
        }
        Ok(spec.index())
    }

    pub fn resolve_output_index(&self, name: &str, graph: &ModelSpec) -> Result<usize> {
        let spec = self
            .output_by_name(name)
            .ok_or_else(|| InterpreterError::out_of_range(format!("no output op named `{name}`")))?;
        if graph.output(spec.index()).is_none() {
            return Err(InterpreterError::internal(format!(
                "output op `{name}` (index {}) cannot be located in the model",
                spec.index()
            )));
        }
        Ok(spec.index())
    }

    pub(crate) fn upsert_input(&mut self, spec: T) {
        upsert(&mut self.inputs, spec);
        self.input_names = name_map(&self.inputs);
    }

    pub(crate) fn upsert_output(&mut self, spec: T) {
        upsert(&mut self.outputs, spec);
        self.output_names = name_map(&self.outputs);
    }
}

impl TensorSpecRegistry<crate::IoSpec> {
    pub fn from_graph(graph: &ModelSpec) -> Self {
        Self::new(graph.inputs.clone(), graph.outputs.clone())
    }
}

fn upsert<T: NamedTensor>(specs: &mut Vec<T>, spec: T) {
    match specs.iter_mut().find(|s| s.index() == spec.index()) {
        Some(slot) => *slot = spec,
        None => specs.push(spec),
    }
}

fn name_map<T: NamedTensor>(specs: &[T]) -> HashMap<String, usize> {
    specs
        .iter()
        .enumerate()
        .filter_map(|(pos, s)| s.name().map(|n| (n.0.clone(), pos)))
        .collect()
}
