pub mod cli;
pub mod manifest;

pub use cli::{Cli, Commands, EvaluateArgs, PrepareArgs, TableFormat, TermsArgs};
