pub mod cli;
pub mod engine;
pub mod error;
pub mod example;
pub mod list_chains;
pub mod model;
pub mod run;
pub mod schema;
pub mod validate;
pub mod venues;
