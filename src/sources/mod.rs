//! Frame source implementations

pub mod command;

pub use command::CommandSource;
