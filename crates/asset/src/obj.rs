//! Wavefront OBJ import for static meshes.
//!
//! `o` and `g` directives split the file into named sub-objects. Polygons are
//! fan-triangulated and expanded into non-indexed triangle lists.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::{
    error::{LoadError, LoadResult},
    mesh::{ObjectMesh, face_normal},
    model::Model,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct FaceVertex {
    pos: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

/// Faces under the latest `o` and `g` directives. A `g` keeps the enclosing
/// object name; an `o` clears the group name.
#[derive(Debug, Default)]
struct ObjGroup {
    object: Option<String>,
    group: Option<String>,
    triangles: Vec<[FaceVertex; 3]>,
}

impl ObjGroup {
    fn name(&self) -> Option<&str> {
        self.object.as_deref().or(self.group.as_deref())
    }

    fn is_named(&self, name: &str) -> bool {
        self.object.as_deref() == Some(name) || self.group.as_deref() == Some(name)
    }
}

#[derive(Debug, Default)]
struct ObjDocument {
    positions: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    groups: Vec<ObjGroup>,
}

/// A resolved triangle corner.
struct Corner {
    position: [f32; 3],
    texcoord: [f32; 2],
    normal: Option<[f32; 3]>,
}

impl ObjDocument {
    fn corner(&self, fv: FaceVertex) -> Corner {
        Corner {
            position: self.positions[fv.pos],
            texcoord: fv.uv.map_or([0.0, 0.0], |i| self.texcoords[i]),
            normal: fv.normal.map(|i| self.normals[i]),
        }
    }

    /// Corners of a triangle; a missing normal on any corner gives the whole
    /// triangle a flat face normal.
    fn triangle(&self, tri: &[FaceVertex; 3]) -> [([f32; 3], [f32; 2], [f32; 3]); 3] {
        let corners = tri.map(|fv| self.corner(fv));
        let flat = face_normal(corners[0].position, corners[1].position, corners[2].position);
        corners.map(|c| (c.position, c.texcoord, c.normal.unwrap_or(flat)))
    }

    fn selected<'a>(&'a self, object_name: Option<&str>) -> Vec<&'a ObjGroup> {
        self.groups
            .iter()
            .filter(|g| object_name.is_none_or(|name| g.is_named(name)))
            .collect()
    }
}

/// Load an OBJ file as a single [`Model`], optionally restricted to one
/// named object/group.
pub fn load_obj_model(path: impl AsRef<Path>, object_name: Option<&str>) -> LoadResult<Model> {
    let doc = parse_obj(open(path.as_ref())?)?;
    model_from_document(&doc, object_name)
}

/// Load every object/group of an OBJ file.
pub fn load_obj_objects(path: impl AsRef<Path>) -> LoadResult<Vec<ObjectMesh>> {
    let doc = parse_obj(open(path.as_ref())?)?;
    Ok(objects_from_document(&doc))
}

/// Parse an OBJ string into a [`Model`].
pub fn load_obj_model_from_str(contents: &str, object_name: Option<&str>) -> LoadResult<Model> {
    let doc = parse_obj(io::Cursor::new(contents))?;
    model_from_document(&doc, object_name)
}

/// Parse an OBJ string into per-object meshes.
pub fn load_obj_objects_from_str(contents: &str) -> LoadResult<Vec<ObjectMesh>> {
    let doc = parse_obj(io::Cursor::new(contents))?;
    Ok(objects_from_document(&doc))
}

fn open(path: &Path) -> LoadResult<BufReader<File>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::FileNotFound(path.to_path_buf()),
        _ => LoadError::Parse(format!("failed to open {}: {e}", path.display())),
    })?;
    Ok(BufReader::new(file))
}

fn model_from_document(doc: &ObjDocument, object_name: Option<&str>) -> LoadResult<Model> {
    let groups = doc.selected(object_name);
    if groups.is_empty() {
        return Err(match object_name {
            Some(name) => LoadError::ObjectNotFound(name.to_string()),
            None => LoadError::Parse("OBJ contained no triangles".into()),
        });
    }

    let mut model = Model::new();
    for tri in groups.iter().flat_map(|g| g.triangles.iter()) {
        for (position, texcoord, normal) in doc.triangle(tri) {
            model.push_vertex(position, texcoord, normal, [0; 4], [0.0; 4]);
        }
    }
    Ok(model)
}

fn objects_from_document(doc: &ObjDocument) -> Vec<ObjectMesh> {
    doc.groups
        .iter()
        .map(|group| {
            let mut mesh = ObjectMesh::new(group.name().map(str::to_owned));
            for tri in &group.triangles {
                for (position, _, normal) in doc.triangle(tri) {
                    mesh.push(position, normal);
                }
            }
            mesh
        })
        .collect()
}

fn parse_obj<R: BufRead>(reader: R) -> LoadResult<ObjDocument> {
    let mut doc = ObjDocument::default();
    let mut current = ObjGroup::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line
            .map_err(|e| LoadError::Parse(format!("failed to read line {}: {e}", line_no + 1)))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                doc.positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                let v = parse_f32(parts.next(), line_no, "v coordinate")?;
                doc.texcoords.push([u, v]);
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                doc.normals.push([nx, ny, nz]);
            }
            "o" | "g" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                let name = (!name.is_empty()).then_some(name);
                if !current.triangles.is_empty() {
                    let next = ObjGroup {
                        object: current.object.clone(),
                        group: current.group.clone(),
                        triangles: Vec::new(),
                    };
                    doc.groups.push(std::mem::replace(&mut current, next));
                }
                if tag == "o" {
                    current.object = name;
                    current.group = None;
                } else {
                    current.group = name;
                }
            }
            "f" => {
                let face = parts
                    .map(|part| {
                        parse_face_vertex(
                            part,
                            doc.positions.len(),
                            doc.texcoords.len(),
                            doc.normals.len(),
                            line_no,
                        )
                    })
                    .collect::<LoadResult<Vec<_>>>()?;

                if face.len() < 3 {
                    log::warn!("Skipping degenerate OBJ face on line {}", line_no + 1);
                    continue;
                }
                // Triangulate fan
                for i in 1..(face.len() - 1) {
                    current.triangles.push([face[0], face[i], face[i + 1]]);
                }
            }
            _ => {
                // Ignore other directives (s/usemtl/mtllib/etc.)
            }
        }
    }

    if !current.triangles.is_empty() {
        doc.groups.push(current);
    }
    doc.groups.retain(|g| !g.triangles.is_empty());
    if doc.groups.is_empty() {
        return Err(LoadError::Parse("OBJ contained no triangles".into()));
    }
    Ok(doc)
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> LoadResult<f32> {
    let token =
        value.ok_or_else(|| LoadError::Parse(format!("missing {what} on line {}", line_no + 1)))?;
    token.parse::<f32>().map_err(|e| {
        LoadError::Parse(format!("failed to parse {what} on line {}: {e}", line_no + 1))
    })
}

fn parse_face_vertex(
    token: &str,
    pos_count: usize,
    tex_count: usize,
    norm_count: usize,
    line_no: usize,
) -> LoadResult<FaceVertex> {
    let mut split = token.split('/');
    let pos = split.next().unwrap_or_default();
    let pos = resolve_index(pos, pos_count, line_no)?;

    let uv = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, tex_count, line_no)?),
        _ => None,
    };

    let normal = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, norm_count, line_no)?),
        _ => None,
    };

    Ok(FaceVertex { pos, uv, normal })
}

/// Resolve a 1-based (or negative, relative) OBJ index.
fn resolve_index(token: &str, len: usize, line_no: usize) -> LoadResult<usize> {
    let raw = token.parse::<i64>().map_err(|_| {
        LoadError::Parse(format!("invalid index '{token}' on line {}", line_no + 1))
    })?;
    if raw == 0 {
        return Err(LoadError::Parse(format!(
            "OBJ indices are 1-based; found 0 on line {}",
            line_no + 1
        )));
    }

    let idx = if raw > 0 { raw - 1 } else { len as i64 + raw };
    if idx < 0 || idx as usize >= len {
        return Err(LoadError::Parse(format!(
            "OBJ index {raw} resolved out of bounds (len={len}) on line {}",
            line_no + 1
        )));
    }

    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TWO_OBJECT_OBJ;

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let model = load_obj_model_from_str(src, None).expect("parse triangle");
        assert_eq!(model.vertex_count(), 3);
        assert_eq!(&model.texcoords[2..4], &[1.0, 0.0]);
        assert!(!model.is_skinned());
        assert!(model.validate().is_ok());
    }

    #[test]
    fn quads_are_fan_triangulated() {
        let model = load_obj_model_from_str(TWO_OBJECT_OBJ, Some("Floor")).unwrap();
        assert_eq!(model.vertex_count(), 6);
        // Floor has no normals in the file: flat normal of a CCW quad in XZ facing +Y.
        assert_eq!(&model.normals[..3], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn whole_file_without_filter() {
        let model = load_obj_model_from_str(TWO_OBJECT_OBJ, None).unwrap();
        assert_eq!(model.vertex_count(), 9);
    }

    #[test]
    fn unknown_object_is_not_found() {
        let err = load_obj_model_from_str(TWO_OBJECT_OBJ, Some("Roof")).unwrap_err();
        assert!(matches!(err, LoadError::ObjectNotFound(ref n) if n == "Roof"));
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn objects_are_split_by_name() {
        let objects = load_obj_objects_from_str(TWO_OBJECT_OBJ).unwrap();
        let names: Vec<_> = objects.iter().map(|o| o.name.as_deref()).collect();
        assert_eq!(names, vec![Some("Floor"), Some("Marker")]);
        assert_eq!(objects[0].vertex_count(), 6);
        assert_eq!(objects[1].vertex_count(), 3);
        assert!(objects.iter().all(ObjectMesh::is_valid));
    }

    #[test]
    fn group_under_object_keeps_both_names() {
        let src = "o Body\ng Body_mat\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n\
                   g Body_trim\nf 3 2 1\n\
                   o Lid\nf 1 3 2\n";
        for name in ["Body", "Body_mat", "Lid"] {
            assert!(load_obj_model_from_str(src, Some(name)).is_ok(), "{name}");
        }
        assert_eq!(load_obj_model_from_str(src, Some("Body")).unwrap().vertex_count(), 6);
        assert_eq!(load_obj_model_from_str(src, Some("Body_trim")).unwrap().vertex_count(), 3);

        let objects = load_obj_objects_from_str(src).unwrap();
        let names: Vec<_> = objects.iter().map(|o| o.name.as_deref()).collect();
        assert_eq!(names, vec![Some("Body"), Some("Body"), Some("Lid")]);
    }

    #[test]
    fn negative_indices_are_relative() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let model = load_obj_model_from_str(src, None).unwrap();
        assert_eq!(&model.vertices[3..6], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn zero_index_is_a_parse_error() {
        let err = load_obj_model_from_str("v 0 0 0\nf 0 1 1\n", None).unwrap_err();
        assert_eq!(err.code(), 2);
    }

    #[test]
    fn empty_file_is_a_parse_error() {
        assert!(matches!(
            load_obj_objects_from_str("# nothing\n"),
            Err(LoadError::Parse(_))
        ));
    }
}
