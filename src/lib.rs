#![forbid(unsafe_code)]

pub mod budget;
pub mod cli;
pub mod clone;
pub mod crawl;
pub mod extract;
pub mod logging;
pub mod project;
pub mod rewrite;
pub mod serve;
