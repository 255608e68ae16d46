//! Mesh file I/O.
//!
//! Loading and saving are collaborators of the core, not part of it: the
//! batch scheduler and the optimizer only see the [`MeshIo`] trait.
//! [`FileIo`] is the implementation backed by the format modules below.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | UVs |
//! |--------|-----------|------|------|-----|
//! | Wavefront OBJ | `.obj` | ✓ | ✓ | ✓ |
//! | STL | `.stl` | ✓ | ✓ | ✗ |
//! | PLY | `.ply` | ✓ | ✓ | ✓ |
//!
//! # Usage
//!
//! ```no_run
//! use uvwrap::io::{load, save};
//!
//! let mesh = load("model.obj").unwrap();
//! save(&mesh, "copy.ply").unwrap();
//! ```

pub mod obj;
pub mod ply;
pub mod stl;

use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, UvError};
use crate::mesh::Mesh;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Wavefront OBJ format.
    Obj,
    /// STL (stereolithography) format.
    Stl,
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "obj" => Some(Format::Obj),
            "stl" => Some(Format::Stl),
            "ply" => Some(Format::Ply),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }

    /// Whether the format can store texture coordinates.
    pub fn stores_uvs(self) -> bool {
        !matches!(self, Format::Stl)
    }
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| UvError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a mesh from a file with automatic format detection.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::load(path),
        Format::Stl => stl::load(path),
        Format::Ply => ply::load(path),
    }
}

/// Save a mesh to a file with automatic format detection.
pub fn save<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = detect(path)?;
    if mesh.has_uvs() && !format.stores_uvs() {
        log::warn!("{} cannot store UVs; writing geometry only", path.display());
    }
    match format {
        Format::Obj => obj::save(mesh, path),
        Format::Stl => stl::save(mesh, path),
        Format::Ply => ply::save(mesh, path),
    }
}

/// Mesh load/save as seen by the batch scheduler and optimizer.
pub trait MeshIo: Send + Sync {
    /// Load a mesh.
    fn load(&self, path: &Path) -> Result<Mesh>;

    /// Save a mesh, including its UVs when the format allows it.
    fn save(&self, mesh: &Mesh, path: &Path) -> Result<()>;
}

/// [`MeshIo`] backed by the file format modules of this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileIo;

impl MeshIo for FileIo {
    fn load(&self, path: &Path) -> Result<Mesh> {
        load(path)
    }

    fn save(&self, mesh: &Mesh, path: &Path) -> Result<()> {
        save(mesh, path)
    }
}

impl<T: MeshIo + ?Sized> MeshIo for &T {
    fn load(&self, path: &Path) -> Result<Mesh> {
        (**self).load(path)
    }

    fn save(&self, mesh: &Mesh, path: &Path) -> Result<()> {
        (**self).save(mesh, path)
    }
}

impl<T: MeshIo + ?Sized> MeshIo for Box<T> {
    fn load(&self, path: &Path) -> Result<Mesh> {
        (**self).load(path)
    }

    fn save(&self, mesh: &Mesh, path: &Path) -> Result<()> {
        (**self).save(mesh, path)
    }
}

impl<T: MeshIo + ?Sized> MeshIo for Arc<T> {
    fn load(&self, path: &Path) -> Result<Mesh> {
        (**self).load(path)
    }

    fn save(&self, mesh: &Mesh, path: &Path) -> Result<()> {
        (**self).save(mesh, path)
    }
}
