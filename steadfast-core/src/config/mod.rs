pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_from_env, load_from_file, load_with_source, ConfigSource};
pub use schema::Config;
pub use validation::validate_config;
