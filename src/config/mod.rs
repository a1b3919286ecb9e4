//! Configuration of the display engine.
//!
//! Looked up at `<config dir>/dprof/config.toml` unless `--config` or
//! `DPROF_CONFIG` names another file. YAML files are accepted as well.

mod engine;

pub use engine::{
    ConfigFormat, EngineConfig, MAX_SETTLE_DELAY_MS, UnmatchedAdapterPolicy, default_config_path,
    load_config, load_config_from_str, load_engine_config, to_toml,
};
