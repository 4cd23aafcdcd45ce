#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub(crate) mod api;
pub mod app;
pub mod classifier;
pub mod config;
pub mod error;
pub mod export;
pub mod observability;
pub mod pipeline;
pub mod table;
pub mod wordcloud;
