//! konstruktor: the admin backend of the Konstruktor site.
//!
//! Cashout entries and project metadata live in a Google spreadsheet. Each project has its own
//! tab in which entries are grouped into month blocks that end with a total row. This crate finds
//! or creates the right block for a new entry, writes it, reads entries back, aggregates them for
//! a dashboard and serves all of it over a bearer-token protected JSON API.

mod api;
pub mod args;
pub mod auth;
pub mod backup;
pub mod commands;
mod config;
pub mod dashboard;
mod error;
pub mod ledger;
pub mod model;
pub mod projects;
pub mod rekap;
pub mod server;
mod utils;


pub use api::{CopiedFile, Grid, Input, Mode, Render, Sheet, Tab, TestSheet, TEST_MODE_ENV};
pub use config::Config;
pub use error::{Error, ErrorType, Result};
