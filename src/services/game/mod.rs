pub mod config_blk;
pub mod detect;
pub mod validator;

#[cfg(test)]
#[path = "tests/validator_tests.rs"]
mod validator_tests;
