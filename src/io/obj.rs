//! Wavefront OBJ format support.
//!
//! Loading goes through `tobj` with triangulation and single-index mode, so
//! vertices that carry different texture coordinates on different faces come
//! out as separate vertices. Saving writes one `vt` per vertex when the mesh
//! has UVs.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::{Point2, Point3};

use crate::error::{Result, UvError};
use crate::mesh::{Mesh, UVMap};

/// Load a mesh from an OBJ file.
///
/// All models in the file are merged into one mesh. UVs are attached only
/// when every model provides texture coordinates.
///
/// # Example
///
/// ```no_run
/// use uvwrap::io::obj;
///
/// let mesh = obj::load("model.obj").unwrap();
/// println!("has UVs: {}", mesh.has_uvs());
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| UvError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if models.is_empty() {
        return Err(UvError::LoadError {
            path: path.to_path_buf(),
            message: "OBJ file contains no models".to_string(),
        });
    }

    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut uvs: Vec<Point2<f64>> = Vec::new();
    let mut triangles: Vec<[usize; 3]> = Vec::new();
    let mut all_textured = true;

    for model in &models {
        let obj_mesh = &model.mesh;
        let offset = positions.len();

        positions.extend(
            obj_mesh
                .positions
                .chunks_exact(3)
                .map(|c| Point3::new(c[0] as f64, c[1] as f64, c[2] as f64)),
        );

        let vertex_count = obj_mesh.positions.len() / 3;
        if obj_mesh.texcoords.len() == vertex_count * 2 && vertex_count > 0 {
            uvs.extend(
                obj_mesh
                    .texcoords
                    .chunks_exact(2)
                    .map(|c| Point2::new(c[0] as f64, c[1] as f64)),
            );
        } else {
            all_textured = false;
        }

        triangles.extend(obj_mesh.indices.chunks_exact(3).map(|c| {
            [
                c[0] as usize + offset,
                c[1] as usize + offset,
                c[2] as usize + offset,
            ]
        }));
    }

    log::debug!(
        "OBJ {}: {} vertices, {} triangles from {} models",
        path.display(),
        positions.len(),
        triangles.len(),
        models.len()
    );

    let mesh = Mesh::new(positions, triangles)?;
    if all_textured {
        mesh.with_uvs(UVMap::new(uvs))
    } else {
        Ok(mesh)
    }
}

/// Save a mesh to an OBJ file.
///
/// # Example
///
/// ```no_run
/// use uvwrap::io::obj;
/// # let mesh: uvwrap::mesh::Mesh = unimplemented!();
/// obj::save(&mesh, "output.obj").unwrap();
/// ```
pub fn save<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "# Generated by uvwrap")?;
    writeln!(writer, "# Vertices: {}", mesh.num_vertices())?;
    writeln!(writer, "# Faces: {}", mesh.num_triangles())?;

    for p in mesh.positions() {
        writeln!(writer, "v {:.6} {:.6} {:.6}", p.x, p.y, p.z)?;
    }

    match mesh.uvs() {
        Some(uvs) => {
            for (_, uv) in uvs.iter() {
                writeln!(writer, "vt {:.6} {:.6}", uv.x, uv.y)?;
            }
            for t in mesh.triangles() {
                let (a, b, c) = (t[0] + 1, t[1] + 1, t[2] + 1);
                writeln!(writer, "f {a}/{a} {b}/{b} {c}/{c}")?;
            }
        }
        None => {
            for t in mesh.triangles() {
                writeln!(writer, "f {} {} {}", t[0] + 1, t[1] + 1, t[2] + 1)?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{unit_cube, unit_square};

    #[test]
    fn test_obj_keeps_uvs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.obj");
        let square = unit_square();

        save(&square, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.num_vertices(), 4);
        assert_eq!(loaded.num_triangles(), 2);
        let uvs = loaded.uvs().expect("UVs should survive OBJ");
        // Each vertex UV matches its (x, y) position in this fixture
        for (i, uv) in uvs.iter() {
            let p = loaded.positions()[i];
            assert!((uv.x - p.x).abs() < 1e-6);
            assert!((uv.y - p.y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_obj_without_uvs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.obj");

        save(&unit_cube().without_uvs(), &path).unwrap();
        let loaded = load(&path).unwrap();

        assert!(!loaded.has_uvs());
        assert_eq!(loaded.num_triangles(), 12);
    }

    #[test]
    fn test_obj_triangulates_quads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.obj");
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n").unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.num_triangles(), 2);
    }

    #[test]
    fn test_obj_missing_file() {
        let err = load("/nonexistent/uvwrap/missing.obj").unwrap_err();
        assert!(matches!(err, UvError::LoadError { .. }));
    }
}
