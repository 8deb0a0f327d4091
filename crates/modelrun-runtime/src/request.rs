use std::fmt;
use std::time::Instant;

/// Public entry points, as reported to the stats sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Api {
    Run,
    InputIndexForOp,
    OutputIndexForOp,
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Api::Run => "run",
            Api::InputIndexForOp => "input_index_for_op",
            Api::OutputIndexForOp => "output_index_for_op",
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub validate_us: u64,
    pub backend_us: u64,
    pub bind_us: u64,
}

pub(crate) fn micros_since(t0: Instant) -> u64 {
    t0.elapsed().as_micros() as u64
}
