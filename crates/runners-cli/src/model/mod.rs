pub mod run_config;
pub mod runner_model;
