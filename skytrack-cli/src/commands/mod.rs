//! Command implementations.

pub mod init;
pub mod resolve;
pub mod track;
