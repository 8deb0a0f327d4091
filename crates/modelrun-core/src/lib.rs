pub mod artifact;
pub mod backend;
pub mod error;
pub mod io;
pub mod options;
pub mod registry;
pub mod spec;
pub mod tensor;
pub mod value;

pub use artifact::*;
pub use backend::*;
pub use error::*;
pub use io::*;
pub use options::*;
pub use registry::*;
pub use spec::*;
pub use tensor::*;
pub use value::*;
