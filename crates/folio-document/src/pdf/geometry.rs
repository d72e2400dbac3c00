// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry — rectangles in PDF user space (origin bottom-left, points)
// and the affine placement of content onto output pages.

use folio_core::types::ScaleMode;

/// Axis-aligned rectangle in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        // Normalise so x0 <= x1 and y0 <= y1; PDF boxes may be given in any
        // corner order.
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Rectangle anchored at the origin.
    pub fn sized(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

/// Compute where an item of `item_size` lands on a page of `page_size`.
///
/// - `Fill` fits the item into the page keeping its aspect ratio, centred.
/// - `Preserve` keeps the native size anchored at the page's top-left corner;
///   an oversized item extends past the page and is clipped by the caller.
pub fn placement(item_size: (f32, f32), page_size: (f32, f32), mode: ScaleMode) -> Rect {
    let (iw, ih) = item_size;
    let (pw, ph) = page_size;
    match mode {
        ScaleMode::Fill => {
            let scale = (pw / iw).min(ph / ih);
            let (dw, dh) = (iw * scale, ih * scale);
            let x = (pw - dw) / 2.0;
            let y = (ph - dh) / 2.0;
            Rect::new(x, y, x + dw, y + dh)
        }
        ScaleMode::Preserve => Rect::new(0.0, ph - ih, iw, ph),
    }
}

/// Whether content drawn at `rect` spills outside a page of `page_size`.
pub fn overflows(rect: &Rect, page_size: (f32, f32)) -> bool {
    const EPSILON: f32 = 0.01;
    rect.x0 < -EPSILON
        || rect.y0 < -EPSILON
        || rect.x1 > page_size.0 + EPSILON
        || rect.y1 > page_size.1 + EPSILON
}

/// A PDF transformation matrix `[a b c d e f]`:
/// `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine(pub [f32; 6]);

impl Affine {
    pub const IDENTITY: Affine = Affine([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translate(tx: f32, ty: f32) -> Self {
        Affine([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Affine([sx, 0.0, 0.0, sy, 0.0, 0.0])
    }

    /// Apply `self` first, then `next`.
    pub fn then(self, next: Affine) -> Affine {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = next.0;
        Affine([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// Display rotation of a `width`×`height` box anchored at the origin, as
    /// applied by a page's `/Rotate` (clockwise, multiples of 90). The result
    /// maps the box onto a new box anchored at the origin.
    pub fn page_rotation(degrees: i64, width: f32, height: f32) -> Affine {
        match degrees.rem_euclid(360) {
            90 => Affine([0.0, -1.0, 1.0, 0.0, 0.0, width]),
            180 => Affine([-1.0, 0.0, 0.0, -1.0, width, height]),
            270 => Affine([0.0, 1.0, -1.0, 0.0, height, 0.0]),
            _ => Affine::IDENTITY,
        }
    }
}

/// Matrix drawing a source page box (in its own coordinates, before
/// `/Rotate`) into `target` on the output page.
///
/// The source is translated to the origin, rotated for display, then scaled
/// non-uniformly onto `target`. `target` already carries the aspect ratio
/// decision, so in practice the two scale factors are equal.
pub fn page_to_rect(source_box: &Rect, rotation: i64, target: &Rect) -> Affine {
    let (w, h) = (source_box.width(), source_box.height());
    let (vw, vh) = if rotation.rem_euclid(180) == 90 {
        (h, w)
    } else {
        (w, h)
    };
    Affine::translate(-source_box.x0, -source_box.y0)
        .then(Affine::page_rotation(rotation, w, h))
        .then(Affine::scale(target.width() / vw, target.height() / vh))
        .then(Affine::translate(target.x0, target.y0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn fill_centres_and_keeps_aspect() {
        let rect = placement((100.0, 200.0), (400.0, 400.0), ScaleMode::Fill);
        assert!(close(rect.width(), 200.0));
        assert!(close(rect.height(), 400.0));
        assert!(close(rect.x0, 100.0));
        assert!(close(rect.y0, 0.0));
    }

    #[test]
    fn preserve_anchors_top_left() {
        let rect = placement((100.0, 50.0), (400.0, 300.0), ScaleMode::Preserve);
        assert_eq!(rect, Rect::new(0.0, 250.0, 100.0, 300.0));
        assert!(!overflows(&rect, (400.0, 300.0)));
    }

    #[test]
    fn oversized_preserve_overflows() {
        let rect = placement((1000.0, 2000.0), (595.0, 842.0), ScaleMode::Preserve);
        assert!(overflows(&rect, (595.0, 842.0)));
    }

    #[test]
    fn rotation_maps_box_corners() {
        // 90° clockwise: the top-left corner ends up at the top-right.
        let m = Affine::page_rotation(90, 100.0, 200.0);
        let (x, y) = m.apply(0.0, 200.0);
        assert!(close(x, 200.0) && close(y, 100.0));

        // 270°: top-left ends up bottom-left.
        let m = Affine::page_rotation(270, 100.0, 200.0);
        let (x, y) = m.apply(0.0, 200.0);
        assert!(close(x, 0.0) && close(y, 0.0));
    }

    #[test]
    fn page_to_rect_fits_offset_box() {
        let source = Rect::new(50.0, 50.0, 150.0, 250.0);
        let target = Rect::new(10.0, 20.0, 60.0, 120.0);
        let m = page_to_rect(&source, 0, &target);
        let (x0, y0) = m.apply(50.0, 50.0);
        let (x1, y1) = m.apply(150.0, 250.0);
        assert!(close(x0, 10.0) && close(y0, 20.0));
        assert!(close(x1, 60.0) && close(y1, 120.0));
    }

    #[test]
    fn page_to_rect_honours_rotation() {
        let source = Rect::sized(100.0, 200.0);
        // Rotated 90°, the page displays as 200×100.
        let target = Rect::sized(200.0, 100.0);
        let m = page_to_rect(&source, 90, &target);
        let (x, y) = m.apply(0.0, 0.0);
        assert!(close(x, 0.0) && close(y, 100.0));
        let (x, y) = m.apply(100.0, 200.0);
        assert!(close(x, 200.0) && close(y, 0.0));
    }
}
