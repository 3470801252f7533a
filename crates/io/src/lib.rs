// File I/O operations

pub mod sheet_file;
pub mod transcript;
