mod common;
mod wom_tests;
