//! CSV adapters: decision scripts in, per-round results out.

pub mod results_writer;
pub mod script_reader;
