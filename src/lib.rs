pub mod classify;
pub mod config;
pub mod domain;
pub mod llm;
pub mod mail;
pub mod session;
pub mod shell;
pub mod speech;
