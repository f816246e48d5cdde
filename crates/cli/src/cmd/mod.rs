//! CLI command implementations

pub mod add_files;
pub mod create;
pub mod delete_dataset;
pub mod delete_files;
pub mod info;
pub mod init;
pub mod list;
pub mod tree;
pub mod verify;
