use nalgebra::Matrix1x4;
use num::Float;
use std::fmt::Debug;

/* ------------------------------------------------------------------------------
 * Type aliases
 * ------------------------------------------------------------------------------ */
pub type Tlwh<T> = Matrix1x4<T>;

/* ------------------------------------------------------------------------------
 * Rect struct
 * ------------------------------------------------------------------------------ */

/// Axis aligned box stored as top-left / width / height.
///
/// Areas are continuous (no `+1` pixel convention) so the same code works on
/// pixel coordinates and on coordinates normalised to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<T>
where
    T: Debug + Float + 'static,
{
    tlwh: Tlwh<T>,
}

impl<T> Rect<T>
where
    T: Debug + Float + 'static,
{
    pub fn new(x: T, y: T, width: T, height: T) -> Self {
        Self {
            tlwh: Matrix1x4::new(x, y, width, height),
        }
    }

    /// Create Rect from [x1, y1, x2, y2] format
    pub fn from_xyxy(x1: T, y1: T, x2: T, y2: T) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    #[inline(always)]
    pub fn x(&self) -> T {
        self.tlwh[(0, 0)]
    }

    #[inline(always)]
    pub fn y(&self) -> T {
        self.tlwh[(0, 1)]
    }

    #[inline(always)]
    pub fn width(&self) -> T {
        self.tlwh[(0, 2)]
    }

    #[inline(always)]
    pub fn height(&self) -> T {
        self.tlwh[(0, 3)]
    }

    pub fn tlwh(&self) -> &Tlwh<T> {
        &self.tlwh
    }

    pub fn area(&self) -> T {
        self.width().max(T::zero()) * self.height().max(T::zero())
    }

    /// Get bounding box as [x1, y1, x2, y2] format
    pub fn get_xyxy(&self) -> [T; 4] {
        [
            self.x(),
            self.y(),
            self.x() + self.width(),
            self.y() + self.height(),
        ]
    }

    pub fn center(&self) -> (T, T) {
        let two = T::one() + T::one();
        (self.x() + self.width() / two, self.y() + self.height() / two)
    }

    /// Euclidean distance between the centers of two boxes.
    pub fn center_distance(&self, other: &Rect<T>) -> T {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    /// Scale x by `1 / width` and y by `1 / height` of an image.
    pub fn normalized(&self, img_width: T, img_height: T) -> Self {
        Self::new(
            self.x() / img_width,
            self.y() / img_height,
            self.width() / img_width,
            self.height() / img_height,
        )
    }

    pub fn calc_iou(&self, other: &Rect<T>) -> T {
        let [ax1, ay1, ax2, ay2] = self.get_xyxy();
        let [bx1, by1, bx2, by2] = other.get_xyxy();

        let iw = (ax2.min(bx2) - ax1.max(bx1)).max(T::zero());
        let ih = (ay2.min(by2) - ay1.max(by1)).max(T::zero());
        let inter = iw * ih;
        let union = self.area() + other.area() - inter;
        if union > T::zero() {
            inter / union
        } else {
            T::zero()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearly_eq::assert_nearly_eq;

    #[test]
    fn test_xyxy_roundtrip_keeps_corners() {
        let rect = Rect::from_xyxy(10.0f32, 20.0, 30.0, 60.0);
        assert_eq!(rect.width(), 20.0);
        assert_eq!(rect.height(), 40.0);
        assert_eq!(rect.get_xyxy(), [10.0, 20.0, 30.0, 60.0]);
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = Rect::new(0.0f32, 0.0, 10.0, 10.0);
        assert_nearly_eq!(a.calc_iou(&a), 1.0, 1e-6);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = Rect::new(0.0f32, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0f32, 0.0, 10.0, 10.0);
        // inter 50, union 150
        assert_nearly_eq!(a.calc_iou(&b), 1.0 / 3.0, 1e-6);
    }

    #[test]
    fn test_iou_disjoint_and_degenerate() {
        let a = Rect::new(0.0f32, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0f32, 20.0, 5.0, 5.0);
        let empty = Rect::new(0.0f32, 0.0, 0.0, 0.0);
        assert_eq!(a.calc_iou(&b), 0.0);
        assert_eq!(empty.calc_iou(&empty), 0.0);
    }

    #[test]
    fn test_center_distance() {
        let a = Rect::new(0.0f64, 0.0, 2.0, 2.0);
        let b = Rect::new(3.0f64, 4.0, 2.0, 2.0);
        assert_nearly_eq!(a.center_distance(&b), 5.0, 1e-9);
    }

    #[test]
    fn test_normalized_is_iou_invariant() {
        let a = Rect::new(100.0f32, 50.0, 40.0, 20.0);
        let b = Rect::new(110.0f32, 55.0, 40.0, 20.0);
        let na = a.normalized(640.0, 480.0);
        let nb = b.normalized(640.0, 480.0);
        assert_nearly_eq!(a.calc_iou(&b), na.calc_iou(&nb), 1e-5);
        assert_nearly_eq!(na.x(), 100.0 / 640.0, 1e-6);
        assert_nearly_eq!(na.height(), 20.0 / 480.0, 1e-6);
    }
}
