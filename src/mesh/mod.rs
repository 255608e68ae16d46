//! Core mesh data structures.
//!
//! The core only needs triangle connectivity, so meshes are stored as a
//! face-vertex list: an array of positions, an array of index triples, and
//! an optional [`UVMap`] holding one texture coordinate per vertex.
//!
//! # Construction
//!
//! ```
//! use uvwrap::mesh::{Mesh, UVMap};
//! use nalgebra::{Point2, Point3};
//!
//! let mesh = Mesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.5, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2]],
//! )
//! .unwrap()
//! .with_uvs(UVMap::new(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(0.5, 1.0),
//! ]))
//! .unwrap();
//!
//! assert!(mesh.has_uvs());
//! ```

mod trimesh;
mod uv;

pub use trimesh::Mesh;
pub use uv::UVMap;
