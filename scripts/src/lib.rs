//! Scripts for deploying the governance contracts and generating the
//! batches that configure them

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(unsafe_code)]

pub mod artifacts;
pub mod catalogue;
pub mod chain;
pub mod cli;
mod commands;
pub mod config;
pub mod constants;
pub mod deploy;
pub mod encoder;
pub mod errors;
pub mod executor;
pub mod export;
pub mod plan;
pub mod registry;
#[cfg(test)]
mod solidity;
pub mod types;
pub mod utils;
