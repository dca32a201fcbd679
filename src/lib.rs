#![forbid(unsafe_code)]

pub mod app;
pub mod auth;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod http;
pub mod logging;
pub mod recipe;
