//! Cross-module scenarios

mod narrow_scenarios;
mod tree_scenarios;
