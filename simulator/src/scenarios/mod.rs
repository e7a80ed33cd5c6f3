pub mod sim_simple;
pub mod sweep_runner;
