pub mod ai;
pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod hook;

pub use commit::{run_hook, Outcome};
pub use config::{ConfigLayer, ConfigSources, EffectiveConfig};
pub use error::AppError;
pub use hook::HookInvocation;
