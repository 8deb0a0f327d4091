use modelrun_core::Result;
use tracing::debug;

use crate::LoadedModel;

// The registry here is built from the graph it is checked against, so a
// known name always locates its tensor and lookups fail only with
// `OutOfRange`. `Internal` is reachable only through registries built from
// caller options.

/// Index of the graph input op called `name`. An unknown name is
/// `OutOfRange`.
pub fn input_index_for_op(model: &LoadedModel, name: &str) -> Result<usize> {
    let index = model.registry().resolve_input_index(name, model.spec())?;
    debug!(op = name, index, "resolved input op");
    Ok(index)
}

/// Index of the graph output op called `name`.
pub fn output_index_for_op(model: &LoadedModel, name: &str) -> Result<usize> {
    let index = model.registry().resolve_output_index(name, model.spec())?;
    debug!(op = name, index, "resolved output op");
    Ok(index)
}
