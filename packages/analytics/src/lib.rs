#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytics engine for the crime lens dashboard.
//!
//! Each module implements one analytic component over a filtered view of
//! the dataset: DBSCAN hotspot clustering, the random-forest arrest
//! classifier, and the cascading trend engine. [`sanitize`] holds the
//! response-layer clamp applied before trend results are serialized.
//!
//! Components are total functions: too-little-data outcomes are values
//! (`None`, empty results, the insufficient-data marker), never panics or
//! errors that could reach a client.

pub mod cluster;
pub mod forest;
pub mod predict;
pub mod rng;
pub mod sanitize;
pub mod trends;
