pub mod consts;
pub mod error;
pub mod registry;
pub mod config;
pub mod io;
pub mod layout;
pub mod engine;
pub mod pipeline;
pub mod prep;
pub mod service;
