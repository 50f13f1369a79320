pub mod csv;

pub use csv::{write_branch, write_branch_file};
