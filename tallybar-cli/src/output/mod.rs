//! Output formatting for CLI.

mod json;
mod text;

pub use json::{
    usage_output, JsonFormatter, KeyStatusOutput, ProviderInfoOutput, StateOutput,
};
pub use text::TextFormatter;
#[cfg(test)]
mod tests;
