pub(crate) mod bootstrap;
mod level_file;
pub(crate) mod loop_runner;
