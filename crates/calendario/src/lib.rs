//! Calendario - pick a fixed number of dates inside a schedule range.
//!
//! The selection rules and counters are pure and synchronous. The only
//! asynchronous edges are the schedule backend ([`store`]) and the web
//! front end ([`server`]).

pub mod calendar;
pub mod commands;
pub mod config;
pub mod html;
pub mod rules;
pub mod selection;
pub mod server;
pub mod store;
pub mod types;
