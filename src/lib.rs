#![recursion_limit = "256"]

//! Convolutional default-prediction models over customer statement
//! sequences, built on burn.
//!
//! Layers, outermost first:
//!
//! - [`cli`]: clap commands
//! - [`application`]: train and predict use cases
//! - [`domain`]: customer sequences and source/scorer traits
//! - [`data`]: CSV loading, datasets, batching
//! - [`ml`]: architectures, training loop, inference
//! - [`infra`]: checkpoints and metrics
//! - [`error`]: typed library errors

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod infra;
pub mod ml;
