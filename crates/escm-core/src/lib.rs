pub mod config;
pub mod types;

pub use config::EscmConfig;
pub use types::*;
