//! Integer pixel geometry: points and axis-aligned rectangles.

/// Integer 2D pixel position.
///
/// Image convention: `x` grows rightwards, `y` grows down the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn dist(&self, other: &Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// This point shifted by `(dx, dy)`.
    pub fn offset(&self, dx: i32, dy: i32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn as_f64(&self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle with integer origin and size.
///
/// `right`/`bottom` are exclusive; a rectangle with non-positive width or
/// height is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Whether `p` lies inside the rectangle (half-open on right/bottom).
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Shrink the rectangle by `margin` pixels on every side.
    pub fn trim(&self, margin: i32) -> Rect {
        Rect::new(
            self.x + margin,
            self.y + margin,
            self.width - 2 * margin,
            self.height - 2 * margin,
        )
    }

    /// Intersect with the image bounds `[0, width) × [0, height)`.
    pub fn clip_to(&self, width: u32, height: u32) -> Rect {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(width as i32);
        let y1 = self.bottom().min(height as i32);
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Center of the rectangle, rounded towards the origin.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn point_distance_is_euclidean() {
        let a = Point::new(0, 0);
        let b = Point::new(3, 4);
        assert_relative_eq!(a.dist(&b), 5.0);
        assert_relative_eq!(b.dist(&a), 5.0);
        assert_relative_eq!(a.dist(&a), 0.0);
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(10, 20, 30, 40);
        assert!(r.contains(Point::new(10, 20)));
        assert!(r.contains(Point::new(39, 59)));
        assert!(!r.contains(Point::new(40, 20)));
        assert!(!r.contains(Point::new(10, 60)));
    }

    #[test]
    fn rect_trim_shrinks_every_side() {
        let r = Rect::new(100, 50, 200, 100).trim(10);
        assert_eq!(r, Rect::new(110, 60, 180, 80));
        assert!(Rect::new(0, 0, 10, 10).trim(6).is_empty());
    }

    #[test]
    fn rect_clip_to_image_bounds() {
        let r = Rect::new(-5, -5, 50, 50).clip_to(40, 30);
        assert_eq!(r, Rect::new(0, 0, 40, 30));
        let r = Rect::new(30, 10, 20, 20).clip_to(40, 30);
        assert_eq!(r, Rect::new(30, 10, 10, 20));
    }

    #[test]
    fn rect_area_of_empty_is_zero() {
        assert_eq!(Rect::new(0, 0, -3, 10).area(), 0);
        assert_eq!(Rect::new(0, 0, 4, 10).area(), 40);
    }
}
