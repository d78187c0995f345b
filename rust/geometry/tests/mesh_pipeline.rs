// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end pipeline tests: SVG text through flattening to meshes.

use cartomesh_core::{parse_document, Flattener};
use cartomesh_geometry::{AltitudeModel, BuildOptions, ElevationTile, MeshBuilder};

fn build_svg(svg: &str, builder: &MeshBuilder) -> cartomesh_geometry::BuildOutput {
    let parsed = parse_document(svg).expect("parse");
    assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    let flattened = Flattener::new().flatten(&parsed.document);
    builder.build(&flattened.shapes)
}

#[test]
fn test_floor_rect_meshes_flat() {
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg">
        <g id="layer1">
            <rect id="floor_room1" x="0" y="0" width="10" height="10"/>
        </g>
    </svg>"#;

    let output = build_svg(svg, &MeshBuilder::new(BuildOptions::default()));
    assert_eq!(output.objects.len(), 1);

    let object = &output.objects[0];
    assert_eq!(object.name, "floor_room1");
    assert_eq!(object.mesh.vertex_count(), 4);
    assert_eq!(object.mesh.triangle_count(), 2);
    for chunk in object.mesh.positions.chunks_exact(3) {
        assert_eq!(chunk[2], 0.0, "floor must sit at ground level");
    }
}

#[test]
fn test_wall_and_floor_share_footprint() {
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg">
        <g id="layer1">
            <rect id="floor_hall" x="0" y="0" width="20" height="8"/>
            <rect id="wall_hall" x="0" y="0" width="20" height="8"/>
        </g>
    </svg>"#;

    let output = build_svg(svg, &MeshBuilder::new(BuildOptions::default()));
    assert_eq!(output.objects.len(), 2);

    let wall = output.objects.iter().find(|o| o.name == "wall_hall").unwrap();
    let floor = output.objects.iter().find(|o| o.name == "floor_hall").unwrap();

    // the wall's XY outline stays on the floor outline
    let (wmin, wmax) = wall.mesh.bounds();
    let (fmin, fmax) = floor.mesh.bounds();
    assert_eq!((wmin.x, wmin.y), (fmin.x, fmin.y));
    assert_eq!((wmax.x, wmax.y), (fmax.x, fmax.y));
    assert_eq!(wmax.z - wmin.z, 2.0);
}

#[test]
fn test_group_transform_moves_meshes() {
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg">
        <g id="layer1" transform="translate(100,50)">
            <rect id="floor_a" x="0" y="0" width="4" height="4"/>
        </g>
    </svg>"#;

    let output = build_svg(svg, &MeshBuilder::new(BuildOptions::default()));
    let (min, _) = output.objects[0].mesh.bounds();
    assert_eq!(min.x, 100.0);
    assert_eq!(min.y, 50.0);
}

#[test]
fn test_walls_drape_over_terrain() {
    let tile = "\
ncols 2
nrows 2
xllcorner 0
yllcorner 0
cellsize 100
NODATA_value -99999
40 40
0 0
";
    let mut model = AltitudeModel::new();
    model.register_tile(ElevationTile::parse(tile).unwrap());
    let builder = MeshBuilder::new(BuildOptions {
        smooth_passes: 0,
        ..Default::default()
    })
    .with_altitude_model(model);

    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg">
        <g id="layer1">
            <path id="wall_slope" d="M 10 0 L 10 100"/>
        </g>
    </svg>"#;

    let output = build_svg(svg, &builder);
    let wall = &output.objects[0];
    let (min, max) = wall.mesh.bounds();
    // south end on the valley floor, north end 40m up, walls 2m tall
    assert_eq!(min.z, 0.0);
    assert_eq!(max.z, 42.0);
}

#[test]
fn test_well_connects_floor_to_surface() {
    let tile = "\
ncols 2
nrows 2
xllcorner 0
yllcorner 0
cellsize 100
NODATA_value -99999
30 30
30 30
";
    let mut model = AltitudeModel::new();
    model.register_tile(ElevationTile::parse(tile).unwrap());
    let builder = MeshBuilder::new(BuildOptions::default()).with_altitude_model(model);

    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg">
        <g id="layer1">
            <circle id="well:round_p3" cx="50" cy="50" r="1"/>
        </g>
    </svg>"#;

    let output = build_svg(svg, &builder);
    assert_eq!(output.objects.len(), 1);
    let (min, max) = output.objects[0].mesh.bounds();
    assert_eq!(min.z, 0.0);
    assert_eq!(max.z, 30.0);
}

#[test]
fn test_fill_color_becomes_material() {
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg">
        <g id="layer1">
            <rect id="floor_tinted" x="0" y="0" width="4" height="4" style="fill:#336699"/>
        </g>
    </svg>"#;

    let output = build_svg(svg, &MeshBuilder::new(BuildOptions::default()));
    let material = output.objects[0].material.expect("material from fill");
    assert!((material[0] - 0.2) < 1e-2);
    assert_eq!(material[3], 1.0);
}
