mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{build_eval_config, build_table_config};
pub use models::AppConfig;
