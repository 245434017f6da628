//! Core of pybox: dependency extraction, command assembly, and the build
//! plumbing around them.

pub mod build;
pub mod command;
pub mod config;
pub mod deps;
pub mod error;
pub mod history;
pub mod options;
pub mod output;
pub mod runner;
pub mod version;
