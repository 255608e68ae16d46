//! PLY (Stanford polygon) format support.
//!
//! Texture coordinates are read from per-vertex `s`/`t`, `u`/`v`, or
//! `texture_u`/`texture_v` properties and written as `s`/`t`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point2, Point3};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use crate::error::{Result, UvError};
use crate::mesh::{Mesh, UVMap};

const UV_PROPERTY_NAMES: [(&str, &str); 3] = [("s", "t"), ("u", "v"), ("texture_u", "texture_v")];

/// Load a mesh from a PLY file.
///
/// Polygons with more than three corners are fan-triangulated.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let ply = parser.read_ply(&mut reader).map_err(|e| UvError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let load_error = |message: &str| UvError::LoadError {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    let vertex_element = ply
        .payload
        .get("vertex")
        .ok_or_else(|| load_error("PLY file has no vertex element"))?;

    let mut positions: Vec<Point3<f64>> = Vec::with_capacity(vertex_element.len());
    let mut uvs: Vec<Point2<f64>> = Vec::with_capacity(vertex_element.len());
    let mut all_textured = true;

    for vertex in vertex_element {
        let x = get_float_property(vertex, "x").ok_or_else(|| load_error("vertex missing x"))?;
        let y = get_float_property(vertex, "y").ok_or_else(|| load_error("vertex missing y"))?;
        let z = get_float_property(vertex, "z").ok_or_else(|| load_error("vertex missing z"))?;
        positions.push(Point3::new(x, y, z));

        match get_uv(vertex) {
            Some(uv) => uvs.push(uv),
            None => all_textured = false,
        }
    }

    let face_element = ply
        .payload
        .get("face")
        .ok_or_else(|| load_error("PLY file has no face element"))?;

    let mut triangles: Vec<[usize; 3]> = Vec::with_capacity(face_element.len());
    for face in face_element {
        let indices = get_list_property(face, "vertex_indices")
            .or_else(|| get_list_property(face, "vertex_index"))
            .ok_or_else(|| load_error("face missing vertex_indices property"))?;

        if indices.len() >= 3 {
            for i in 1..indices.len() - 1 {
                triangles.push([indices[0], indices[i], indices[i + 1]]);
            }
        }
    }

    if triangles.is_empty() {
        return Err(load_error("PLY file contains no faces"));
    }

    let mesh = Mesh::new(positions, triangles)?;
    if all_textured && !uvs.is_empty() {
        mesh.with_uvs(UVMap::new(uvs))
    } else {
        Ok(mesh)
    }
}

fn get_uv(element: &DefaultElement) -> Option<Point2<f64>> {
    UV_PROPERTY_NAMES.iter().find_map(|(u, v)| {
        Some(Point2::new(
            get_float_property(element, u)?,
            get_float_property(element, v)?,
        ))
    })
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}

/// Save a mesh to a PLY file (ASCII format).
pub fn save<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by uvwrap")?;
    writeln!(writer, "element vertex {}", mesh.num_vertices())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    if mesh.has_uvs() {
        writeln!(writer, "property float s")?;
        writeln!(writer, "property float t")?;
    }
    writeln!(writer, "element face {}", mesh.num_triangles())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    match mesh.uvs() {
        Some(uvs) => {
            for (p, (_, uv)) in mesh.positions().iter().zip(uvs.iter()) {
                writeln!(writer, "{} {} {} {} {}", p.x, p.y, p.z, uv.x, uv.y)?;
            }
        }
        None => {
            for p in mesh.positions() {
                writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
            }
        }
    }

    for t in mesh.triangles() {
        writeln!(writer, "3 {} {} {}", t[0], t[1], t[2])?;
    }

    writer.flush()?;
    Ok(())
}
