pub mod runner;
pub mod sheet;
