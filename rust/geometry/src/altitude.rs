// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Elevation model built from ASCII grid tiles
//!
//! Tiles are node-registered: the value at row/column (r, c) is the
//! ground elevation at `(xll + c*cell, yll + r*cell)` counting rows from
//! the south edge, while the file stores the northmost row first.
//! Queries between nodes interpolate bilinearly. No-data cells poison
//! the interpolation and the query reports `None`; substituting a
//! background elevation is the caller's call.

use cartomesh_core::BBox;

use crate::error::{Error, Result};

/// One parsed elevation grid tile
#[derive(Debug, Clone)]
pub struct ElevationTile {
    ncols: usize,
    nrows: usize,
    xll: f64,
    yll: f64,
    cellsize: f64,
    nodata: f64,
    /// Row-major, south row first
    values: Vec<f32>,
}

impl ElevationTile {
    /// Parse the ASCII grid format (ncols/nrows/xllcorner/yllcorner/
    /// cellsize/NODATA_value header, then north-first rows)
    pub fn parse(text: &str) -> Result<Self> {
        let mut ncols = None;
        let mut nrows = None;
        let mut xll = None;
        let mut yll = None;
        let mut cellsize = None;
        let mut nodata = -99999.0f64;

        let mut lines = text.lines().peekable();
        while let Some(line) = lines.peek() {
            let mut parts = line.split_whitespace();
            let key = match parts.next() {
                Some(k) if k.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) => k,
                _ => break,
            };
            let value: f64 = parts
                .next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| Error::BadElevationGrid(format!("bad header line '{line}'")))?;
            match key.to_ascii_lowercase().as_str() {
                "ncols" => ncols = Some(value as usize),
                "nrows" => nrows = Some(value as usize),
                "xllcorner" => xll = Some(value),
                "yllcorner" => yll = Some(value),
                "cellsize" => cellsize = Some(value),
                "nodata_value" => nodata = value,
                other => {
                    return Err(Error::BadElevationGrid(format!(
                        "unknown header key '{other}'"
                    )))
                }
            }
            lines.next();
        }

        let ncols = ncols.ok_or_else(|| Error::BadElevationGrid("missing ncols".into()))?;
        let nrows = nrows.ok_or_else(|| Error::BadElevationGrid("missing nrows".into()))?;
        let xll = xll.ok_or_else(|| Error::BadElevationGrid("missing xllcorner".into()))?;
        let yll = yll.ok_or_else(|| Error::BadElevationGrid("missing yllcorner".into()))?;
        let cellsize =
            cellsize.ok_or_else(|| Error::BadElevationGrid("missing cellsize".into()))?;
        if ncols < 2 || nrows < 2 || cellsize <= 0.0 {
            return Err(Error::BadElevationGrid(format!(
                "degenerate grid {ncols}x{nrows} cell {cellsize}"
            )));
        }

        let mut values = vec![0.0f32; ncols * nrows];
        let mut row = 0usize;
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            if row >= nrows {
                return Err(Error::BadElevationGrid("more rows than declared".into()));
            }
            // file rows run north to south; flip into south-first storage
            let out_row = nrows - 1 - row;
            let mut col = 0usize;
            for token in line.split_whitespace() {
                if col >= ncols {
                    return Err(Error::BadElevationGrid(format!(
                        "row {row} has more than {ncols} columns"
                    )));
                }
                let v: f32 = token.parse().map_err(|_| {
                    Error::BadElevationGrid(format!("bad value '{token}' in row {row}"))
                })?;
                values[out_row * ncols + col] = v;
                col += 1;
            }
            if col != ncols {
                return Err(Error::BadElevationGrid(format!(
                    "row {row} has {col} of {ncols} columns"
                )));
            }
            row += 1;
        }
        if row != nrows {
            return Err(Error::BadElevationGrid(format!(
                "got {row} of {nrows} rows"
            )));
        }

        Ok(Self {
            ncols,
            nrows,
            xll,
            yll,
            cellsize,
            nodata,
            values,
        })
    }

    /// Read and parse a tile from disk
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::BadElevationGrid(format!("{}: {e}", path.display())))?;
        Self::parse(&text)
    }

    /// Coverage rectangle in world coordinates
    pub fn extent(&self) -> BBox {
        BBox::new(
            cartomesh_core::Point2::new(self.xll, self.yll),
            cartomesh_core::Point2::new(
                self.xll + (self.ncols - 1) as f64 * self.cellsize,
                self.yll + (self.nrows - 1) as f64 * self.cellsize,
            ),
        )
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let e = self.extent();
        x >= e.min.x && x <= e.max.x && y >= e.min.y && y <= e.max.y
    }

    #[inline]
    fn node(&self, col: usize, row: usize) -> Option<f64> {
        let v = self.values[row * self.ncols + col] as f64;
        if (v - self.nodata).abs() < 1e-6 {
            None
        } else {
            Some(v)
        }
    }

    /// Bilinear sample; `None` outside the tile or near a no-data cell
    pub fn sample(&self, x: f64, y: f64) -> Option<f64> {
        if !self.contains(x, y) {
            return None;
        }
        let fx = (x - self.xll) / self.cellsize;
        let fy = (y - self.yll) / self.cellsize;
        let c0 = (fx.floor() as usize).min(self.ncols - 2);
        let r0 = (fy.floor() as usize).min(self.nrows - 2);
        let tx = fx - c0 as f64;
        let ty = fy - r0 as f64;

        let v00 = self.node(c0, r0)?;
        let v10 = self.node(c0 + 1, r0)?;
        let v01 = self.node(c0, r0 + 1)?;
        let v11 = self.node(c0 + 1, r0 + 1)?;

        let bottom = v00 + (v10 - v00) * tx;
        let top = v01 + (v11 - v01) * tx;
        Some(bottom + (top - bottom) * ty)
    }
}

/// Regular grid of elevations sampled over an area
///
/// Row-major, south row first, `None` where no tile answers.
#[derive(Debug, Clone)]
pub struct ElevationGrid {
    pub origin: cartomesh_core::Point2,
    pub step: f64,
    pub ncols: usize,
    pub nrows: usize,
    values: Vec<Option<f64>>,
}

impl ElevationGrid {
    #[inline]
    pub fn value_at(&self, col: usize, row: usize) -> Option<f64> {
        self.values[row * self.ncols + col]
    }
}

/// A set of tiles queried as one surface
///
/// Where tiles overlap, the most recently registered one wins.
#[derive(Debug, Clone, Default)]
pub struct AltitudeModel {
    tiles: Vec<ElevationTile>,
}

impl AltitudeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tile(&mut self, tile: ElevationTile) {
        self.tiles.push(tile);
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Ground elevation at a point, if any tile covers it with data
    ///
    /// Tiles are consulted newest first. A no-data hole in a newer tile
    /// falls through to any older overlapping tile that still has data
    /// there; `None` means no tile at all could answer.
    pub fn elevation_at(&self, x: f64, y: f64) -> Option<f64> {
        self.tiles.iter().rev().find_map(|t| t.sample(x, y))
    }

    /// Batch sample an area at `step` spacing
    ///
    /// Covers whole-region draping without per-point call overhead; the
    /// grid includes both boundary rows/columns.
    pub fn grid_for_area(&self, area: &BBox, step: f64) -> ElevationGrid {
        let step = step.max(1e-9);
        let ncols = (area.width() / step).floor() as usize + 1;
        let nrows = (area.height() / step).floor() as usize + 1;
        let mut values = Vec::with_capacity(ncols * nrows);
        for r in 0..nrows {
            let y = area.min.y + r as f64 * step;
            for c in 0..ncols {
                let x = area.min.x + c as f64 * step;
                values.push(self.elevation_at(x, y));
            }
        }
        ElevationGrid {
            origin: area.min,
            step,
            ncols,
            nrows,
            values,
        }
    }

    /// Representative ground elevation over an area
    ///
    /// Averages the center and corner samples that return data; `None`
    /// when the area is entirely off-grid.
    pub fn elevation_for_area(&self, area: &BBox) -> Option<f64> {
        let center = area.center();
        let samples = [
            (center.x, center.y),
            (area.min.x, area.min.y),
            (area.max.x, area.min.y),
            (area.max.x, area.max.y),
            (area.min.x, area.max.y),
        ];
        let mut sum = 0.0;
        let mut count = 0usize;
        for (x, y) in samples {
            if let Some(z) = self.elevation_at(x, y) {
                sum += z;
                count += 1;
            }
        }
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: &str = "\
ncols 3
nrows 3
xllcorner 100
yllcorner 200
cellsize 10
NODATA_value -99999
30 31 32
20 21 22
10 11 12
";

    #[test]
    fn test_exact_node_sample() {
        let tile = ElevationTile::parse(TILE).unwrap();
        // south-west node is the last row's first value
        assert_eq!(tile.sample(100.0, 200.0), Some(10.0));
        // north-east node is the first row's last value
        assert_eq!(tile.sample(120.0, 220.0), Some(32.0));
    }

    #[test]
    fn test_bilinear_between_nodes() {
        let tile = ElevationTile::parse(TILE).unwrap();
        let z = tile.sample(105.0, 205.0).unwrap();
        // midpoint of 10, 11, 20, 21
        assert!((z - 15.5).abs() < 1e-9);
    }

    #[test]
    fn test_outside_is_none() {
        let tile = ElevationTile::parse(TILE).unwrap();
        assert_eq!(tile.sample(99.0, 200.0), None);
        assert_eq!(tile.sample(100.0, 221.0), None);
    }

    #[test]
    fn test_nodata_poisons_sample() {
        let text = TILE.replace("21", "-99999");
        let tile = ElevationTile::parse(&text).unwrap();
        assert_eq!(tile.sample(105.0, 205.0), None);
        // nodes away from the hole still answer
        assert_eq!(tile.sample(100.0, 200.0), Some(10.0));
    }

    #[test]
    fn test_adjacent_tiles_are_continuous() {
        // east tile's west column repeats the west tile's east column
        let east = "\
ncols 3
nrows 3
xllcorner 120
yllcorner 200
cellsize 10
NODATA_value -99999
32 33 34
22 23 24
12 13 14
";

        let mut model = AltitudeModel::new();
        model.register_tile(ElevationTile::parse(TILE).unwrap());
        model.register_tile(ElevationTile::parse(east).unwrap());

        // the shared boundary answers identically from either tile
        let on_seam = model.elevation_at(120.0, 205.0).unwrap();
        let west_only = ElevationTile::parse(TILE).unwrap().sample(120.0, 205.0).unwrap();
        assert!((on_seam - west_only).abs() < 1e-9);
    }

    #[test]
    fn test_last_registered_tile_wins() {
        let mut model = AltitudeModel::new();
        model.register_tile(ElevationTile::parse(TILE).unwrap());
        let offset = TILE
            .replace("30 31 32", "130 131 132")
            .replace("20 21 22", "120 121 122")
            .replace("10 11 12", "110 111 112");
        model.register_tile(ElevationTile::parse(&offset).unwrap());
        assert_eq!(model.elevation_at(100.0, 200.0), Some(110.0));
    }

    #[test]
    fn test_nodata_hole_falls_through_to_older_tile() {
        let mut model = AltitudeModel::new();
        model.register_tile(ElevationTile::parse(TILE).unwrap());
        let holed = TILE.replace("21", "-99999");
        model.register_tile(ElevationTile::parse(&holed).unwrap());
        // the newer tile cannot interpolate near its hole; the older
        // tile underneath still answers
        assert_eq!(model.elevation_at(105.0, 205.0), Some(15.5));
    }

    #[test]
    fn test_area_average() {
        let mut model = AltitudeModel::new();
        model.register_tile(ElevationTile::parse(TILE).unwrap());
        let area = BBox::new(
            cartomesh_core::Point2::new(100.0, 200.0),
            cartomesh_core::Point2::new(120.0, 220.0),
        );
        let z = model.elevation_for_area(&area).unwrap();
        assert!((z - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_grid_for_area_matches_point_queries() {
        let mut model = AltitudeModel::new();
        model.register_tile(ElevationTile::parse(TILE).unwrap());
        let area = BBox::new(
            cartomesh_core::Point2::new(100.0, 200.0),
            cartomesh_core::Point2::new(120.0, 220.0),
        );
        let grid = model.grid_for_area(&area, 5.0);
        assert_eq!(grid.ncols, 5);
        assert_eq!(grid.nrows, 5);
        assert_eq!(grid.value_at(0, 0), model.elevation_at(100.0, 200.0));
        assert_eq!(grid.value_at(2, 1), model.elevation_at(110.0, 205.0));
    }

    #[test]
    fn test_malformed_grid_rejected() {
        assert!(ElevationTile::parse("ncols 2\nnrows 2\n1 2\n3 4\n").is_err());
        let short = TILE.replace("10 11 12\n", "");
        assert!(ElevationTile::parse(&short).is_err());
    }
}
