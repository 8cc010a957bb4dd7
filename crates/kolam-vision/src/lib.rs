//! Primitive detectors for kolam/rangoli pattern analysis.
//!
//! Every detector here is a pure function over a [`kolam_core::GrayImageView`]
//! with a serde-derived parameter struct. The analysis pipeline treats these
//! as black-box collaborators: swapping an implementation must not change a
//! contract, only the parameter values.

mod blob;
mod contours;
mod edges;
mod hough;
mod integral;
mod io;
mod morphology;
mod shape;
mod skeleton;
mod template;
mod threshold;
mod transform;

pub use blob::{detect_blobs, BlobKeypoint, BlobParams};
pub use contours::{
    approx_poly_dp, convex_hull, extract_contours, Contour, PointF,
};
pub use edges::detect_edges;
pub use hough::{
    detect_circles, hough_lines, hough_lines_p, CircleCandidate, HoughCircleParams,
    HoughLine, HoughLineParams, HoughLinePParams, LineSegment,
};
pub use integral::IntegralImage;
pub use io::{load_gray, ImageLoadError};
pub use morphology::{dilate_rect, erode_rect, open_rect};
pub use shape::{hu_distance, hu_moments, shape_distance};
pub use skeleton::skeletonize;
pub use template::{match_ring_templates, RingMatch, RingTemplateParams};
pub use threshold::{binarize, otsu_threshold, Polarity};
pub use transform::{flip_horizontal, flip_vertical, ncc, rotate_about_center, transpose};
