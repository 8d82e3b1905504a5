mod defaults;
mod resolve;
mod types;

pub use self::resolve::{
    load_config, minimal_config_template, parse_config, resolve_config_path, ConfigSource,
    CONFIG_ENV_VAR,
};
pub use self::types::*;
