//! Sparse value grids for a single variable and month.

use crate::{CellKey, ClimateError, ClimateResult, GridExtent};
use std::collections::{BTreeMap, HashMap};

/// Wire shape written by the offline pipeline: X key -> (Y key -> value).
pub type NestedGrid = HashMap<String, HashMap<String, Option<f64>>>;

/// Values for the cells that carry data. An absent key means "no data",
/// never zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseGrid {
    cells: HashMap<CellKey, f32>,
}

impl SparseGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the pipeline's nested mapping, quantizing every key pair to
    /// its cell centre. Null or non-finite values are dropped.
    pub fn from_nested(nested: NestedGrid, extent: &GridExtent, source: &str) -> ClimateResult<Self> {
        let mut cells = HashMap::with_capacity(nested.values().map(HashMap::len).sum());

        for (x_key, column) in nested {
            let x: f64 = x_key
                .trim()
                .parse()
                .map_err(|_| ClimateError::malformed(source, format!("bad X key '{}'", x_key)))?;
            for (y_key, value) in column {
                let y: f64 = y_key
                    .trim()
                    .parse()
                    .map_err(|_| ClimateError::malformed(source, format!("bad Y key '{}'", y_key)))?;
                let Some(value) = value.filter(|v| v.is_finite()) else {
                    continue;
                };
                if let Some(key) = extent.cell_key(x, y) {
                    cells.insert(key, value as f32);
                }
            }
        }

        Ok(Self { cells })
    }

    /// Nested representation with integer string keys, as the pipeline writes it.
    pub fn to_nested(&self) -> BTreeMap<String, BTreeMap<String, f32>> {
        let mut out: BTreeMap<String, BTreeMap<String, f32>> = BTreeMap::new();
        for (key, value) in &self.cells {
            out.entry(key.x.to_string())
                .or_default()
                .insert(key.y.to_string(), *value);
        }
        out
    }

    pub fn insert(&mut self, key: CellKey, value: f32) {
        if value.is_finite() {
            self.cells.insert(key, value);
        }
    }

    pub fn get(&self, key: CellKey) -> Option<f32> {
        self.cells.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellKey, f32)> + '_ {
        self.cells.iter().map(|(k, v)| (*k, *v))
    }

    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.cells.values().copied()
    }

    /// Cells present in both grids, as (key, self value, other value).
    ///
    /// A cell present in only one grid is skipped without warning.
    pub fn paired<'a>(&'a self, other: &'a SparseGrid) -> impl Iterator<Item = (CellKey, f32, f32)> + 'a {
        self.cells
            .iter()
            .filter_map(move |(key, a)| other.get(*key).map(|b| (*key, *a, b)))
    }

    /// Per-cell mean across several grids; each cell is averaged over the
    /// grids in which it is present.
    pub fn mean_of<'a>(grids: impl IntoIterator<Item = &'a SparseGrid>) -> SparseGrid {
        let mut sums: HashMap<CellKey, (f64, u32)> = HashMap::new();
        for grid in grids {
            for (key, value) in grid.iter() {
                let entry = sums.entry(key).or_insert((0.0, 0));
                entry.0 += value as f64;
                entry.1 += 1;
            }
        }
        let cells = sums
            .into_iter()
            .map(|(key, (sum, n))| (key, (sum / n as f64) as f32))
            .collect();
        SparseGrid { cells }
    }
}

impl FromIterator<(CellKey, f32)> for SparseGrid {
    fn from_iter<T: IntoIterator<Item = (CellKey, f32)>>(iter: T) -> Self {
        let mut grid = SparseGrid::new();
        for (key, value) in iter {
            grid.insert(key, value);
        }
        grid
    }
}
