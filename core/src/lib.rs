pub mod command;
pub mod error;
pub mod help;
pub mod layout;
pub mod provider;
pub mod response;
pub mod runner;
pub mod session;
pub mod sys;
pub mod types;
