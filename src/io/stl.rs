//! STL (stereolithography) format support.
//!
//! STL stores independent triangles with no texture coordinates. Loading
//! welds coincident corners back into shared vertices; saving writes binary
//! STL and drops any UVs.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use nalgebra::Point3;

use crate::error::{Result, UvError};
use crate::mesh::Mesh;

/// Load a mesh from an STL file.
///
/// Automatically detects binary vs ASCII format.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    let mut file = File::open(path)?;

    let stl = stl_io::read_stl(&mut file).map_err(|e| UvError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut triangles: Vec<[usize; 3]> = Vec::with_capacity(stl.faces.len());
    // Exact-bit welding: corners written from the same float compare equal
    let mut index_of: HashMap<[u32; 3], usize> = HashMap::new();

    let mut weld = |v: &stl_io::Vertex| -> usize {
        let key = [v[0].to_bits(), v[1].to_bits(), v[2].to_bits()];
        *index_of.entry(key).or_insert_with(|| {
            positions.push(Point3::new(v[0] as f64, v[1] as f64, v[2] as f64));
            positions.len() - 1
        })
    };

    for tri in &stl.faces {
        let i0 = weld(&stl.vertices[tri.vertices[0]]);
        let i1 = weld(&stl.vertices[tri.vertices[1]]);
        let i2 = weld(&stl.vertices[tri.vertices[2]]);

        // Skip degenerate triangles
        if i0 != i1 && i1 != i2 && i0 != i2 {
            triangles.push([i0, i1, i2]);
        }
    }

    if triangles.is_empty() {
        return Err(UvError::LoadError {
            path: path.to_path_buf(),
            message: "STL file contains no valid triangles".to_string(),
        });
    }

    Mesh::new(positions, triangles)
}

/// Save a mesh to a binary STL file.
pub fn save<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let triangles: Vec<stl_io::Triangle> = (0..mesh.num_triangles())
        .map(|f| {
            let [p0, p1, p2] = mesh.triangle_positions(f);
            let n = (p1 - p0)
                .cross(&(p2 - p0))
                .try_normalize(1e-12)
                .unwrap_or_else(nalgebra::Vector3::zeros);

            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [
                    stl_io::Vertex::new([p0.x as f32, p0.y as f32, p0.z as f32]),
                    stl_io::Vertex::new([p1.x as f32, p1.y as f32, p1.z as f32]),
                    stl_io::Vertex::new([p2.x as f32, p2.y as f32, p2.z as f32]),
                ],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| UvError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(())
}
