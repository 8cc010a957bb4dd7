//! Binary morphology with rectangular structuring elements.

use kolam_core::{GrayImage, GrayImageView};

fn window_extremum(img: &GrayImageView<'_>, kw: usize, kh: usize, take_max: bool) -> GrayImage {
    let w = img.width;
    let h = img.height;
    let ax = (kw / 2) as i32;
    let ay = (kh / 2) as i32;
    let mut out = GrayImage::new(w, h);

    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let mut acc = if take_max { 0u8 } else { 255u8 };
            for dy in -ay..=(kh as i32 - 1 - ay) {
                for dx in -ax..=(kw as i32 - 1 - ax) {
                    // Outside pixels read as background (0).
                    let v = img.get(x + dx, y + dy);
                    acc = if take_max { acc.max(v) } else { acc.min(v) };
                }
            }
            out.set(x as usize, y as usize, acc);
        }
    }
    out
}

/// Erosion with a `kw x kh` rectangle.
pub fn erode_rect(img: &GrayImageView<'_>, kw: usize, kh: usize) -> GrayImage {
    window_extremum(img, kw, kh, false)
}

/// Dilation with a `kw x kh` rectangle.
pub fn dilate_rect(img: &GrayImageView<'_>, kw: usize, kh: usize) -> GrayImage {
    window_extremum(img, kw, kh, true)
}

/// Morphological opening: erosion followed by dilation. Keeps only
/// structures that contain the full structuring element, which extracts
/// long horizontal or vertical line runs from an edge map.
pub fn open_rect(img: &GrayImageView<'_>, kw: usize, kh: usize) -> GrayImage {
    let eroded = erode_rect(img, kw, kh);
    dilate_rect(&eroded.as_view(), kw, kh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kolam_core::GrayImage;

    #[test]
    fn opening_keeps_long_runs_and_drops_specks() {
        let mut img = GrayImage::new(40, 9);
        for x in 5..35 {
            img.set(x, 4, 255); // long horizontal run
        }
        img.set(10, 1, 255); // isolated speck

        let opened = open_rect(&img.as_view(), 25, 1);
        assert_eq!(0, opened.at(10, 1));
        assert_eq!(255, opened.at(20, 4));
    }
}
