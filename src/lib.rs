pub mod collector;
pub mod commands;
pub mod config;
pub mod error_utils;
pub mod extractor;
pub mod fetcher;
pub mod filename_utils;
pub mod report;
pub mod session;
pub mod status;
