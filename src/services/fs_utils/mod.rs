pub mod disk_space;
pub mod file_utils;
pub mod path_utils;

#[cfg(test)]
#[path = "tests/file_utils_tests.rs"]
mod file_utils_tests;

#[cfg(test)]
#[path = "tests/path_utils_tests.rs"]
mod path_utils_tests;
