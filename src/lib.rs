//! # class-enhancer
//!
//! Build-cycle post-processing for compiled JVM class files: entity-bean
//! and query-bean enhancement driven by an external build trigger.
//!
//! ## Architecture
//!
//! - **probe**: binary-name extraction from raw class-file headers
//! - **classpath**: runtime classpath resolution and auxiliary class lookup
//! - **transform**: composed entity / query-bean enhancement passes
//! - **agent**: subprocess-backed passes invoking external agent jars
//! - **builder**: full and incremental build orchestration
//! - **marker**: problem annotations with best-effort source mapping
//! - **sink**: verbosity-gated transform log
//! - **scan**: class-file discovery under the classes directory
//! - **config**: project configuration (enhancer.toml)
//! - **cli**: command-line interface of the build trigger

pub mod agent;
pub mod builder;
pub mod classpath;
pub mod cli;
pub mod config;
pub mod error;
pub mod marker;
pub mod probe;
pub mod scan;
pub mod sink;
pub mod transform;
