pub mod builder;
pub mod config;
pub mod constants;
pub mod engine;
pub mod geo;
pub mod headless;
pub mod map;
pub mod scope;
pub mod stylesheet;
