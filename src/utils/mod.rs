//! Imaging utilities: luminance sources, binarization, projective geometry.

pub mod binarization;
pub mod geometry;
pub mod luminance;
