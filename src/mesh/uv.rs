//! UV coordinate storage.
//!
//! This module provides the [`UVMap`] type for storing 2D parameterization
//! coordinates for mesh vertices.

use nalgebra::Point2;

/// UV coordinates for mesh vertices.
///
/// Index `i` holds the texture coordinate of vertex `i`. Coordinates are
/// usually in `[0, 1]`, but nothing here enforces that; the coverage metric
/// simply ignores whatever falls outside the unit square.
///
/// # Example
///
/// ```
/// use uvwrap::mesh::UVMap;
/// use nalgebra::Point2;
///
/// let uvs = UVMap::new(vec![Point2::new(0.0, 0.0), Point2::new(2.0, 1.0)]);
/// assert_eq!(uvs.len(), 2);
/// assert_eq!(uvs.get(1), Point2::new(2.0, 1.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UVMap {
    coords: Vec<Point2<f64>>,
}

impl UVMap {
    /// Create a new UV map with the given coordinates.
    pub fn new(coords: Vec<Point2<f64>>) -> Self {
        Self { coords }
    }

    /// Create a UV map filled with zeros.
    pub fn zeros(n: usize) -> Self {
        Self {
            coords: vec![Point2::origin(); n],
        }
    }

    /// Get the UV coordinates for a vertex.
    #[inline]
    pub fn get(&self, vertex: usize) -> Point2<f64> {
        self.coords[vertex]
    }

    /// Set the UV coordinates for a vertex.
    #[inline]
    pub fn set(&mut self, vertex: usize, uv: Point2<f64>) {
        self.coords[vertex] = uv;
    }

    /// Get the number of UV coordinates.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Iterate over all UV coordinates with their vertex indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Point2<f64>)> + '_ {
        self.coords.iter().copied().enumerate()
    }

    /// Get the raw coordinates slice.
    pub fn as_slice(&self) -> &[Point2<f64>] {
        &self.coords
    }

    /// Compute the bounding box of the UV coordinates.
    ///
    /// Returns `None` if the UV map is empty.
    pub fn bounding_box(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let first = *self.coords.first()?;
        let mut min = first;
        let mut max = first;

        for uv in &self.coords {
            min.x = min.x.min(uv.x);
            min.y = min.y.min(uv.y);
            max.x = max.x.max(uv.x);
            max.y = max.y.max(uv.y);
        }

        Some((min, max))
    }

    /// Normalize UV coordinates to fit within [0, 1] range.
    ///
    /// Maintains aspect ratio by scaling uniformly based on the larger dimension.
    pub fn normalize(&mut self) {
        self.fit_into_margin(0.0);
    }

    /// Normalize UV coordinates into `[margin, 1 - margin]²`, keeping the aspect ratio.
    ///
    /// Margins of 0.5 or more leave no room; the map collapses to the center point.
    pub fn fit_into_margin(&mut self, margin: f64) {
        let Some((min, max)) = self.bounding_box() else {
            return;
        };

        let margin = margin.clamp(0.0, 0.5);
        let extent = (max.x - min.x).max(max.y - min.y);
        let available = 1.0 - 2.0 * margin;

        if extent > 1e-10 {
            let scale = available / extent;
            for uv in &mut self.coords {
                uv.x = margin + (uv.x - min.x) * scale;
                uv.y = margin + (uv.y - min.y) * scale;
            }
        }
    }
}

impl From<Vec<Point2<f64>>> for UVMap {
    fn from(coords: Vec<Point2<f64>>) -> Self {
        Self::new(coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uv_map_basic() {
        let coords = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 1.0),
        ];
        let mut uv_map = UVMap::new(coords);

        assert_eq!(uv_map.len(), 3);
        assert!(!uv_map.is_empty());
        assert_eq!(uv_map.get(2), Point2::new(0.5, 1.0));

        uv_map.set(2, Point2::new(0.25, 0.75));
        assert_eq!(uv_map.get(2), Point2::new(0.25, 0.75));
    }

    #[test]
    fn test_uv_map_bounding_box() {
        let coords = vec![
            Point2::new(-1.0, 0.5),
            Point2::new(2.0, -0.5),
            Point2::new(0.5, 3.0),
        ];
        let uv_map = UVMap::new(coords);

        let (min, max) = uv_map.bounding_box().unwrap();
        assert_eq!(min, Point2::new(-1.0, -0.5));
        assert_eq!(max, Point2::new(2.0, 3.0));

        assert!(UVMap::zeros(0).bounding_box().is_none());
    }

    #[test]
    fn test_uv_map_normalize() {
        let coords = vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(2.0, 2.0),
        ];
        let mut uv_map = UVMap::new(coords);
        uv_map.normalize();

        let (min, max) = uv_map.bounding_box().unwrap();
        assert!(min.x.abs() < 1e-10);
        assert!(min.y.abs() < 1e-10);
        // x range is larger, so it spans the full unit interval
        assert!((max.x - 1.0).abs() < 1e-10);
        assert!((max.y - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_uv_map_fit_into_margin() {
        let coords = vec![
            Point2::new(10.0, 10.0),
            Point2::new(12.0, 10.0),
            Point2::new(12.0, 12.0),
        ];
        let mut uv_map = UVMap::new(coords);
        uv_map.fit_into_margin(0.1);

        let (min, max) = uv_map.bounding_box().unwrap();
        assert!((min.x - 0.1).abs() < 1e-10);
        assert!((min.y - 0.1).abs() < 1e-10);
        assert!((max.x - 0.9).abs() < 1e-10);
        assert!((max.y - 0.9).abs() < 1e-10);
    }
}
