pub mod playlist;
pub mod source_tool;
pub mod traits;
