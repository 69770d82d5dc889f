pub mod config;
pub mod geometry;
pub mod output;
pub mod pipelines;
pub mod records;
pub mod source;
