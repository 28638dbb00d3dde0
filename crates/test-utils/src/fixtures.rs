//! Fixture documents shaped like the offline pipeline's output.

use climate_common::{DatasetMetadata, GridExtent, NamedLocation};

/// Years covered by the fixture dataset.
pub const YEARS: [i32; 10] = [2014, 2015, 2016, 2017, 2018, 2019, 2020, 2021, 2022, 2023];

/// A small 20 km × 30 km extent of 1 km cells in southern England. Cell
/// centres sit on whole kilometres, so the edges are offset by half a cell.
pub fn small_extent() -> GridExtent {
    GridExtent {
        x_min: 449_500.0,
        x_max: 469_500.0,
        y_min: 159_500.0,
        y_max: 189_500.0,
        crs_identifier: "EPSG:27700".to_string(),
        cell_size: 1000.0,
    }
}

/// Metadata JSON as the pipeline writes it (`crs` / `resolution_meters`).
pub fn metadata_json(extent: &GridExtent, years: &[i32], image_size: (u32, u32)) -> String {
    serde_json::json!({
        "extent": {
            "x_min": extent.x_min,
            "x_max": extent.x_max,
            "y_min": extent.y_min,
            "y_max": extent.y_max,
            "crs": extent.crs_identifier,
            "resolution_meters": extent.cell_size,
        },
        "image_dimensions": {"width": image_size.0, "height": image_size.1},
        "years": years,
        "months": (1..=12).collect::<Vec<u32>>(),
        "colors": ["#f3f3f3", "#f3e6b3", "#f3b300",
                   "#b4d3e1", "#b3b3b3", "#b36600",
                   "#509dc2", "#376387", "#000000"],
        "temperature": {"scale_range": {"min": -10.0, "max": 32.0}},
        "data_source": "synthetic fixture",
    })
    .to_string()
}

pub fn metadata(extent: &GridExtent, years: &[i32]) -> DatasetMetadata {
    // the fixture JSON is always well formed
    DatasetMetadata::from_json(&metadata_json(extent, years, (20, 30)))
        .unwrap_or_else(|e| panic!("fixture metadata rejected: {}", e))
}

pub const LOCATIONS_JSON: &str = r#"[
    {"name": "Woolhampton", "x": 457000, "y": 166000, "category": "Village"},
    {"name": "Reading", "x": 471500, "y": 173500, "category": "Town"},
    {"name": "Newbury", "x": 447000, "y": 167000, "category": "Town"},
    {"name": "Edinburgh", "x": 325900, "y": 673600, "category": "City"}
]"#;

pub fn builtin_locations() -> Vec<NamedLocation> {
    serde_json::from_str(LOCATIONS_JSON).unwrap_or_default()
}
