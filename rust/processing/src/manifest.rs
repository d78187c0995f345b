// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output manifests
//!
//! The external viewer loads meshes by the exact key names in
//! [`MeshManifest`]; they are part of the wire contract and must not be
//! renamed. File lists are sorted so manifests diff cleanly.

use serde::{Deserialize, Serialize};

use cartomesh_geometry::{Mesh, MeshObject};

/// Manifest format version understood by the viewer
pub const MANIFEST_VERSION: &str = "1.0";

/// Manifest for one 3D export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshManifest {
    pub version: String,
    pub meshes: Vec<String>,
    pub meshes_private: Vec<String>,
    pub text_fnames: Vec<String>,
    pub text_fnames_private: Vec<String>,
}

impl MeshManifest {
    /// Build a manifest from mesh objects and text label files
    pub fn new(
        objects: &[MeshObject],
        text_fnames: Vec<String>,
        text_fnames_private: Vec<String>,
    ) -> Self {
        let mut meshes = Vec::new();
        let mut meshes_private = Vec::new();
        for object in objects {
            let fname = mesh_file_name(&object.name);
            if object.private {
                meshes_private.push(fname);
            } else {
                meshes.push(fname);
            }
        }
        meshes.sort();
        meshes_private.sort();
        let mut text_fnames = text_fnames;
        let mut text_fnames_private = text_fnames_private;
        text_fnames.sort();
        text_fnames_private.sort();

        Self {
            version: MANIFEST_VERSION.to_string(),
            meshes,
            meshes_private,
            text_fnames,
            text_fnames_private,
        }
    }
}

/// Manifest for one 2D export: the produced variant names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapManifest {
    pub version: String,
    pub maps: Vec<String>,
}

impl MapManifest {
    pub fn new(mut maps: Vec<String>) -> Self {
        maps.sort();
        Self {
            version: MANIFEST_VERSION.to_string(),
            maps,
        }
    }
}

/// Deterministic mesh file name from the object name
pub fn mesh_file_name(object_name: &str) -> String {
    format!("{}.json", sanitize(object_name))
}

/// Text label file name from the label object name
pub fn text_file_name(object_name: &str) -> String {
    format!("{}_text.json", sanitize(object_name))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Serialize a mesh to the viewer's JSON layout
pub fn mesh_to_json(mesh: &Mesh, material: Option<[f32; 4]>) -> serde_json::Value {
    let mut value = serde_json::json!({
        "positions": mesh.positions,
        "normals": mesh.normals,
        "indices": mesh.indices,
    });
    if let Some(material) = material {
        value["material"] = serde_json::json!({ "diffuse": material });
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_key_names() {
        let manifest = MeshManifest::new(&[], vec![], vec![]);
        let json = serde_json::to_value(&manifest).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec![
                "meshes",
                "meshes_private",
                "text_fnames",
                "text_fnames_private",
                "version"
            ]
        );
    }

    #[test]
    fn test_private_split_and_sorting() {
        let mut public = MeshObject::new("wall_b", Mesh::new());
        public.mesh.positions = vec![0.0; 9];
        let mut public2 = MeshObject::new("wall_a", Mesh::new());
        public2.mesh.positions = vec![0.0; 9];
        let mut secret = MeshObject::new("wall_hidden", Mesh::new());
        secret.mesh.positions = vec![0.0; 9];
        secret.private = true;

        let manifest = MeshManifest::new(&[public, public2, secret], vec![], vec![]);
        assert_eq!(manifest.meshes, vec!["wall_a.json", "wall_b.json"]);
        assert_eq!(manifest.meshes_private, vec!["wall_hidden.json"]);
    }

    #[test]
    fn test_file_name_sanitized() {
        assert_eq!(mesh_file_name("well_round_p3"), "well_round_p3.json");
        assert_eq!(mesh_file_name("a b/c"), "a_b_c.json");
    }

    #[test]
    fn test_mesh_json_shape() {
        let mut mesh = Mesh::new();
        mesh.positions = vec![0.0, 0.0, 0.0];
        mesh.normals = vec![0.0, 0.0, 1.0];
        mesh.indices = vec![0];
        let value = mesh_to_json(&mesh, Some([1.0, 0.0, 0.0, 1.0]));
        assert!(value["positions"].is_array());
        assert!(value["material"]["diffuse"].is_array());
    }
}
