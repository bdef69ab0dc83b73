// src/lib.rs

//! Realtor contact enrichment pipeline.
//!
//! Builds a contact table in three resumable stages:
//!
//! 1. **listing** scrapes a paginated realtor index into base records
//!    (name, phone, website),
//! 2. **website** visits each record's own site to mine a missing email,
//! 3. **search** runs batched web searches for whatever is still missing,
//!    attaching a confidence score to every value it adopts.
//!
//! Every fetch lands in a persistent response cache keyed by request, so
//! an interrupted run resumes where it stopped and a rerun over an
//! unchanged cache reproduces its output tables byte for byte.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

pub use error::{AppError, Result};
