pub mod runtime;

mod error;
mod output;
mod params;
pub mod registry;

pub use crate::error::RuntimeError;
pub use crate::output::write_json;
pub use crate::params::load_params_file;
pub use crate::registry::ScenarioRegistry;
pub use crate::runtime::WsstRuntime;
