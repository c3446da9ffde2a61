// src/lib.rs

//! Job requirements crawler library.
//!
//! Walks every result page of a job search, visits each posting and collects
//! its requirement lines in discovery order.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;
