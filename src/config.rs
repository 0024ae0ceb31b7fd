pub mod error;
pub mod loader;
pub mod model;
pub mod sample;

pub use error::ConfigError;
pub use model::{
    OutputPolicy, ProcessKey, ResolvedProcess, ResolvedProcessConfig, ResolvedProcessGroup,
    RestartMode, RestartPolicy,
};
