//! Asset loading (models, textures).
//!
//! Models come out as flat, non-indexed attribute arrays ready for upload,
//! with skeletal animation pre-baked into per-frame skinning matrices.

pub mod error;
pub mod gltf_import;
pub mod mesh;
pub mod model;
pub mod obj;
pub mod skeleton;
pub mod texture;

#[cfg(test)]
mod fixtures;

use std::path::Path;

pub use error::{LOAD_OK, LoadError, LoadResult, status_code};
pub use mesh::ObjectMesh;
pub use model::{BONES_PER_VERTEX, LoadOptions, Model};
pub use texture::TextureData;

/// File formats understood by [`load_model`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    Gltf,
    Obj,
}

impl ModelFormat {
    /// Pick a format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> LoadResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "gltf" | "glb" => Ok(Self::Gltf),
            "obj" => Ok(Self::Obj),
            _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Load one object of a model file with default [`LoadOptions`].
///
/// `object_name` selects a node/mesh (glTF) or an `o`/`g` group (OBJ); `None`
/// picks the first mesh (glTF) or the whole file (OBJ).
pub fn load_model(path: impl AsRef<Path>, object_name: Option<&str>) -> LoadResult<Model> {
    load_model_with(path, object_name, &LoadOptions::default())
}

pub fn load_model_with(
    path: impl AsRef<Path>,
    object_name: Option<&str>,
    options: &LoadOptions,
) -> LoadResult<Model> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LoadError::FileNotFound(path.to_path_buf()));
    }
    let model = match ModelFormat::from_path(path)? {
        ModelFormat::Gltf => gltf_import::load_gltf_model(path, object_name, options)?,
        ModelFormat::Obj => obj::load_obj_model(path, object_name)?,
    };
    model.validate()?;
    log::info!(
        "Loaded model {} (object={:?}): {} vertices, {} bones, {} frames",
        path.display(),
        object_name,
        model.vertex_count(),
        model.bone_count,
        model.frame_count()
    );
    Ok(model)
}

/// Import a `.gltf`/`.glb` held in memory.
pub fn load_model_from_slice(
    bytes: &[u8],
    object_name: Option<&str>,
    options: &LoadOptions,
) -> LoadResult<Model> {
    let model = gltf_import::load_gltf_model_from_slice(bytes, object_name, options)?;
    model.validate()?;
    Ok(model)
}

/// Load every sub-object of a file as separate vertex/normal arrays.
pub fn load_model_objects(path: impl AsRef<Path>) -> LoadResult<Vec<ObjectMesh>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LoadError::FileNotFound(path.to_path_buf()));
    }
    let objects = match ModelFormat::from_path(path)? {
        ModelFormat::Gltf => gltf_import::load_gltf_objects(path)?,
        ModelFormat::Obj => obj::load_obj_objects(path)?,
    };
    log::info!("Loaded {} objects from {}", objects.len(), path.display());
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn format_from_extension() {
        assert_eq!(ModelFormat::from_path(Path::new("a/b.GLB")).ok(), Some(ModelFormat::Gltf));
        assert_eq!(ModelFormat::from_path(Path::new("b.gltf")).ok(), Some(ModelFormat::Gltf));
        assert_eq!(ModelFormat::from_path(Path::new("b.obj")).ok(), Some(ModelFormat::Obj));
        let err = ModelFormat::from_path(Path::new("b.fbx")).unwrap_err();
        assert_eq!(err.code(), 5);
    }

    #[test]
    fn missing_file_reports_not_found() {
        let result = load_model("/definitely/not/here.glb", None);
        assert_eq!(status_code(&result), 1);
        let result = load_model_objects("/definitely/not/here.obj");
        assert!(matches!(result, Err(LoadError::FileNotFound(_))));
    }

    #[test]
    fn loads_glb_from_disk_by_extension() {
        let bytes = fixtures::skinned_glb();
        let mut file = tempfile::Builder::new().suffix(".glb").tempfile().unwrap();
        file.write_all(&bytes).unwrap();

        let model = load_model(file.path(), Some("Body")).expect("load glb");
        assert_eq!(model.vertex_count(), 6);
        assert_eq!(model.bone_count, 2);
        assert!(model.frame_count() > 1);

        let objects = load_model_objects(file.path()).expect("objects");
        assert_eq!(objects.len(), 3);
    }

    #[test]
    fn slice_import_validates() {
        let model =
            load_model_from_slice(&fixtures::skinned_glb(), None, &LoadOptions::default()).unwrap();
        assert_eq!(model.bone_count, 2);
    }

    #[test]
    fn loads_obj_from_disk_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        file.write_all(fixtures::TWO_OBJECT_OBJ.as_bytes()).unwrap();

        let model = load_model(file.path(), Some("Floor")).expect("load obj");
        assert_eq!(model.vertex_count(), 6);
        assert_eq!(status_code(&load_model(file.path(), Some("Nope"))), 3);
    }
}
