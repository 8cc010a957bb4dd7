//! Core types and utilities for kolam/rangoli pattern analysis.
//!
//! This crate is intentionally small: the grayscale image container,
//! intensity moments, and logger setup. It does *not* depend on any
//! concrete detector or on the analysis pipeline.

mod image;
mod logger;
mod moments;

pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView};
pub use moments::IntensityMoments;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
