//! Meshes shared by the unit tests.

use nalgebra::{Point2, Point3};

use crate::mesh::{Mesh, UVMap};

/// Axis-aligned unit cube, 8 vertices and 12 triangles.
///
/// UVs take the `(x, y)` of each vertex, so the top and bottom faces map
/// onto the unit square and the side faces collapse to segments.
pub fn unit_cube() -> Mesh {
    let positions = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ];
    let triangles = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [1, 2, 6],
        [1, 6, 5],
        [2, 3, 7],
        [2, 7, 6],
        [3, 0, 4],
        [3, 4, 7],
    ];
    let uvs: Vec<_> = positions.iter().map(|p| Point2::new(p.x, p.y)).collect();

    Mesh::new(positions, triangles)
        .unwrap()
        .with_uvs(UVMap::new(uvs))
        .unwrap()
}

/// Two triangles tiling the unit square in the z = 0 plane, UVs equal to (x, y).
pub fn unit_square() -> Mesh {
    let positions = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    let uvs: Vec<_> = positions.iter().map(|p| Point2::new(p.x, p.y)).collect();

    Mesh::new(positions, vec![[0, 1, 2], [0, 2, 3]])
        .unwrap()
        .with_uvs(UVMap::new(uvs))
        .unwrap()
}

/// An `n` x `n` grid of unit cells in the z = 0 plane, without UVs.
pub fn grid(n: usize) -> Mesh {
    let mut positions = Vec::with_capacity((n + 1) * (n + 1));
    let mut triangles = Vec::with_capacity(n * n * 2);

    for j in 0..=n {
        for i in 0..=n {
            positions.push(Point3::new(i as f64, j as f64, 0.0));
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;

            triangles.push([v00, v10, v11]);
            triangles.push([v00, v11, v01]);
        }
    }

    Mesh::new(positions, triangles).unwrap()
}
