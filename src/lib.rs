pub mod audit;
pub mod cli;
pub mod config;
pub mod decide;
pub mod detect;
pub mod diff;
pub mod error;
pub mod git;
pub mod journal;
pub mod layout;
pub mod model;
pub mod naming;
pub mod project;
pub mod rewrite;
pub mod serve;
pub mod sync;
pub mod watch;
