//! Zhang-Suen morphological thinning.

use kolam_core::{GrayImage, GrayImageView};

/// Thin a 0/255 mask to its 1-pixel-wide skeleton.
///
/// The result is a fresh owned image; the input mask is untouched.
pub fn skeletonize(mask: &GrayImageView<'_>) -> GrayImage {
    let w = mask.width;
    let h = mask.height;
    let mut img: Vec<bool> = mask.data.iter().map(|&v| v != 0).collect();
    if w < 3 || h < 3 {
        let mut out = GrayImage::new(w, h);
        for (dst, &v) in out.data.iter_mut().zip(img.iter()) {
            *dst = if v { 255 } else { 0 };
        }
        return out;
    }

    let idx = |x: usize, y: usize| y * w + x;
    let mut to_clear: Vec<usize> = Vec::new();

    loop {
        let mut changed = false;
        for pass in 0..2 {
            to_clear.clear();
            for y in 1..h - 1 {
                for x in 1..w - 1 {
                    if !img[idx(x, y)] {
                        continue;
                    }
                    // Neighbors p2..p9 clockwise from north.
                    let p = [
                        img[idx(x, y - 1)],
                        img[idx(x + 1, y - 1)],
                        img[idx(x + 1, y)],
                        img[idx(x + 1, y + 1)],
                        img[idx(x, y + 1)],
                        img[idx(x - 1, y + 1)],
                        img[idx(x - 1, y)],
                        img[idx(x - 1, y - 1)],
                    ];
                    let b: usize = p.iter().filter(|&&v| v).count();
                    if !(2..=6).contains(&b) {
                        continue;
                    }
                    // 0 -> 1 transitions around the ring.
                    let a = (0..8)
                        .filter(|&i| !p[i] && p[(i + 1) % 8])
                        .count();
                    if a != 1 {
                        continue;
                    }
                    let (c1, c2) = if pass == 0 {
                        // p2*p4*p6 == 0 and p4*p6*p8 == 0
                        (p[0] && p[2] && p[4], p[2] && p[4] && p[6])
                    } else {
                        // p2*p4*p8 == 0 and p2*p6*p8 == 0
                        (p[0] && p[2] && p[6], p[0] && p[4] && p[6])
                    };
                    if c1 || c2 {
                        continue;
                    }
                    to_clear.push(idx(x, y));
                }
            }
            if !to_clear.is_empty() {
                changed = true;
                for &i in &to_clear {
                    img[i] = false;
                }
            }
        }
        if !changed {
            break;
        }
    }

    let mut out = GrayImage::new(w, h);
    for (dst, &v) in out.data.iter_mut().zip(img.iter()) {
        *dst = if v { 255 } else { 0 };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kolam_core::GrayImage;

    #[test]
    fn thick_bar_thins_to_single_pixel_width() {
        let mut mask = GrayImage::new(40, 20);
        for y in 7..13 {
            for x in 5..35 {
                mask.set(x, y, 255);
            }
        }
        let skel = skeletonize(&mask.as_view());
        // Every column crossed by the bar keeps at most one skeleton pixel.
        for x in 8..32 {
            let count = (0..20).filter(|&y| skel.at(x, y) > 0).count();
            assert!(count <= 2, "column {x} kept {count} pixels");
            assert!(count >= 1, "column {x} lost the centerline");
        }
    }

    #[test]
    fn empty_mask_stays_empty() {
        let mask = GrayImage::new(10, 10);
        let skel = skeletonize(&mask.as_view());
        assert!(skel.data.iter().all(|&v| v == 0));
    }
}
