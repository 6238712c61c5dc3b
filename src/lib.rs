//! Export the history of the WeChat desktop client's embedded browser.
//!
//! Profiles are discovered under the radium web profiles folder, each
//! history database is copied and queried, WebKit timestamps are converted
//! and the merged visits are written to a spreadsheet.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod logging;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod timestamp;
pub mod util;
