pub mod common_io;
pub mod mat_ops;
pub mod named_table;
