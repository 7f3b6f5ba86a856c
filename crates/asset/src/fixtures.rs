//! Test fixtures: a small binary glTF built in memory and an OBJ snippet.

use serde_json::{Value, json};

/// Two objects: a CCW quad "Floor" without normals (fan-split into two
/// triangles) and a triangle "Marker" with normals.
pub const TWO_OBJECT_OBJ: &str = "\
# two objects
o Floor
v -1 0 1
v 1 0 1
v 1 0 -1
v -1 0 -1
f 1 2 3 4
o Marker
v 0 0 0
v 1 0 0
v 0 1 0
vn 0 0 1
vt 0 0
f 5/1/1 6/1/1 7/1/1
";

const FLOAT: u32 = 5126;
const UNSIGNED_SHORT: u32 = 5123;

/// Accumulates a BIN chunk plus the buffer views/accessors describing it.
#[derive(Default)]
struct GlbBuilder {
    bin: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl GlbBuilder {
    fn push(&mut self, bytes: Vec<u8>, count: usize, component_type: u32, ty: &str) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let view = self.views.len();
        self.views.push(json!({
            "buffer": 0,
            "byteOffset": self.bin.len(),
            "byteLength": bytes.len(),
        }));
        self.bin.extend_from_slice(&bytes);
        self.accessors.push(json!({
            "bufferView": view,
            "componentType": component_type,
            "count": count,
            "type": ty,
        }));
        self.accessors.len() - 1
    }

    /// Float accessor with `components` floats per element; min/max are
    /// always written since POSITION and animation inputs require them.
    fn floats(&mut self, data: &[f32], components: usize, ty: &str) -> usize {
        let count = data.len() / components;
        let mut min = vec![f32::MAX; components];
        let mut max = vec![f32::MIN; components];
        for element in data.chunks_exact(components) {
            for (c, &v) in element.iter().enumerate() {
                min[c] = min[c].min(v);
                max[c] = max[c].max(v);
            }
        }
        let bytes = data.iter().flat_map(|f| f.to_le_bytes()).collect();
        let index = self.push(bytes, count, FLOAT, ty);
        if ty != "MAT4" {
            self.accessors[index]["min"] = json!(min);
            self.accessors[index]["max"] = json!(max);
        }
        index
    }

    fn shorts(&mut self, data: &[u16], components: usize, ty: &str) -> usize {
        let bytes = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.push(bytes, data.len() / components, UNSIGNED_SHORT, ty)
    }

    fn finish(mut self, mut doc: Value) -> Vec<u8> {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        doc["asset"] = json!({ "version": "2.0" });
        doc["buffers"] = json!([{ "byteLength": self.bin.len() }]);
        doc["bufferViews"] = Value::Array(self.views);
        doc["accessors"] = Value::Array(self.accessors);

        let mut json = serde_json::to_vec(&doc).unwrap();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let total = 12 + 8 + json.len() + 8 + self.bin.len();

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(self.bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&self.bin);
        out
    }
}

/// GLB with:
/// - joints "Root" (origin) and "Tip" (one unit up, child of Root);
/// - node "Body": skinned quad (4 vertices, 6 indices), bottom edge bound to
///   Root, top edge to Tip;
/// - node "Prop" (mesh "PropMesh"): unindexed triangle without normals or
///   texcoords plus a line primitive, translated by +5 on X;
/// - node "Ramp" (mesh "RampMesh"): triangle sloping up along +Z with
///   explicit normals, scaled by 2 on Y;
/// - clip "Wave": Tip rotates 90° about Z over one second (linear);
/// - clip "Idle": Root jumps to y=2 at 0.5s (step);
/// - clip "Bounce": Root rises to y=4 over one second (cubic spline with
///   large tangents).
pub fn skinned_glb() -> Vec<u8> {
    let mut b = GlbBuilder::default();

    let positions = b.floats(
        &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
        3,
        "VEC3",
    );
    let normals = b.floats(&[0.0f32, 0.0, 1.0].repeat(4), 3, "VEC3");
    let uvs = b.floats(&[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0], 2, "VEC2");
    let joints = b.shorts(&[0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0], 4, "VEC4");
    let weights = b.floats(&[1.0f32, 0.0, 0.0, 0.0].repeat(4), 4, "VEC4");
    let indices = b.shorts(&[0, 1, 2, 0, 2, 3], 1, "SCALAR");

    let prop_positions = b.floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 3, "VEC3");
    let line_positions = b.floats(&[0.0, 0.0, 0.0, 0.0, 0.0, 3.0], 3, "VEC3");

    let ramp_positions = b.floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0], 3, "VEC3");
    let slope = std::f32::consts::FRAC_1_SQRT_2;
    let ramp_normals = b.floats(&[0.0, -slope, slope].repeat(3), 3, "VEC3");

    let mut inverse_bind = Vec::new();
    inverse_bind.extend_from_slice(&glam::Mat4::IDENTITY.to_cols_array());
    inverse_bind.extend_from_slice(
        &glam::Mat4::from_translation(glam::Vec3::new(0.0, -1.0, 0.0)).to_cols_array(),
    );
    let ibm = b.floats(&inverse_bind, 16, "MAT4");

    let half = std::f32::consts::FRAC_1_SQRT_2;
    let wave_times = b.floats(&[0.0, 1.0], 1, "SCALAR");
    let wave_rot = b.floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, half, half], 4, "VEC4");
    let idle_times = b.floats(&[0.0, 0.5], 1, "SCALAR");
    let idle_pos = b.floats(&[0.0, 0.0, 0.0, 0.0, 2.0, 0.0], 3, "VEC3");
    let bounce_times = b.floats(&[0.0, 1.0], 1, "SCALAR");
    // (in-tangent, value, out-tangent) per key.
    let bounce_pos = b.floats(
        &[
            9.0, 9.0, 9.0, 0.0, 0.0, 0.0, 9.0, 9.0, 9.0, //
            -9.0, -9.0, -9.0, 0.0, 4.0, 0.0, -9.0, -9.0, -9.0,
        ],
        3,
        "VEC3",
    );

    let doc = json!({
        "scene": 0,
        "scenes": [{ "nodes": [0, 2, 3, 4] }],
        "nodes": [
            { "name": "Root", "children": [1] },
            { "name": "Tip", "translation": [0.0, 1.0, 0.0] },
            { "name": "Body", "mesh": 0, "skin": 0 },
            { "name": "Prop", "mesh": 1, "translation": [5.0, 0.0, 0.0] },
            { "name": "Ramp", "mesh": 2, "scale": [1.0, 2.0, 1.0] },
        ],
        "meshes": [
            {
                "name": "BodyMesh",
                "primitives": [{
                    "attributes": {
                        "POSITION": positions,
                        "NORMAL": normals,
                        "TEXCOORD_0": uvs,
                        "JOINTS_0": joints,
                        "WEIGHTS_0": weights,
                    },
                    "indices": indices,
                }],
            },
            {
                "name": "PropMesh",
                "primitives": [
                    { "attributes": { "POSITION": prop_positions } },
                    { "attributes": { "POSITION": line_positions }, "mode": 1 },
                ],
            },
            {
                "name": "RampMesh",
                "primitives": [{
                    "attributes": { "POSITION": ramp_positions, "NORMAL": ramp_normals },
                }],
            },
        ],
        "skins": [{ "joints": [0, 1], "inverseBindMatrices": ibm }],
        "animations": [
            {
                "name": "Wave",
                "samplers": [{ "input": wave_times, "output": wave_rot, "interpolation": "LINEAR" }],
                "channels": [{ "sampler": 0, "target": { "node": 1, "path": "rotation" } }],
            },
            {
                "name": "Idle",
                "samplers": [{ "input": idle_times, "output": idle_pos, "interpolation": "STEP" }],
                "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }],
            },
            {
                "name": "Bounce",
                "samplers": [{ "input": bounce_times, "output": bounce_pos, "interpolation": "CUBICSPLINE" }],
                "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }],
            },
        ],
    });
    b.finish(doc)
}
