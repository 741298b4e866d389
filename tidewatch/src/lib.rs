pub mod benchmark;
pub mod config;
pub mod runner;
pub mod scenario;
pub mod sim;
pub mod util;
