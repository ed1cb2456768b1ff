//! Configuration and the data types shared by every pipeline stage

pub mod config;
pub mod models;
