/// Delimited-text tables and checkpoint files on the local filesystem.
pub mod fs;
