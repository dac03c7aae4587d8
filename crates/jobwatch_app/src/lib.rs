//! Command-line front end for following scraping jobs.

pub mod cli;
pub mod config;
pub mod logging;
pub mod runner;
pub mod sink;
