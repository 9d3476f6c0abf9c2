//! # Path files
//!
//! Paths are recorded to and loaded from files in one of two formats, selected by the file's
//! extension:
//!
//! - JSON (`.json`): an object with an optional WGS84 `origin`, the list of `points_columns`
//!   (which must include `x` and `y`, and may include `speed`), the `points` as rows of numbers
//!   following the columns, and an optional list of `annotations`.
//! - CSV (`.csv`, `.cvs` or `.txt`): a header of `x,y` or `x,y,speed` followed by one waypoint per
//!   line. CSV files have neither an origin nor annotations.
//!
//! Waypoint coordinates are in meters, east and north of the origin if there is one.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    fs::read_to_string,
    io::Read,
    path::{Path, PathBuf},
};

use log::debug;
use serde::Deserialize;

use super::{full::AnnotationRecord, GeodeticCoordinates, WayPoint};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The content of a path file.
#[derive(Debug, Clone)]
pub struct PathFile {
    way_points: Vec<WayPoint>,

    annotations: Vec<AnnotationRecord>,

    /// Geodetic position of the frame the waypoints are expressed in
    origin: Option<GeodeticCoordinates>,

    /// The file the path was loaded from, if any
    file_path: Option<PathBuf>,
}

/// Layout of a JSON path file.
#[derive(Debug, Deserialize)]
struct JsonPathFile {
    #[serde(default)]
    origin: Option<GeodeticCoordinates>,

    points_columns: Vec<String>,

    points: Vec<Vec<f64>>,

    #[serde(default)]
    annotations: Vec<AnnotationRecord>,
}

/// A single line of a CSV path file.
#[derive(Debug, Deserialize)]
struct CsvPoint {
    x: f64,
    y: f64,
    #[serde(default)]
    speed: Option<f64>,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathFileError {
    #[error("Cannot read the path file {0:?}: {1}")]
    FileReadError(PathBuf, std::io::Error),

    #[error("Unsupported path file extension for {0:?}, expected json, csv, cvs or txt")]
    UnsupportedExtension(PathBuf),

    #[error("Invalid JSON path file: {0}")]
    JsonError(serde_json::Error),

    #[error("Invalid CSV path file: {0}")]
    CsvError(csv::Error),

    #[error("The path file doesn't have a \"{0}\" column")]
    MissingColumn(&'static str),

    #[error("Point {row} has {found} values but {expected} columns are declared")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Cannot anchor the path, the path file has no origin")]
    MissingOrigin,

    #[error("Invalid geodetic coordinates: {0:?}")]
    InvalidCoordinates(GeodeticCoordinates),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathFile {
    /// Load a path file, the format being selected from the file's extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PathFileError> {
        let path = path.as_ref();

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let mut file = match extension.as_deref() {
            Some("json") => {
                let content = read_to_string(path)
                    .map_err(|e| PathFileError::FileReadError(path.to_path_buf(), e))?;
                Self::from_json_str(&content)?
            }
            Some("csv") | Some("cvs") | Some("txt") => {
                let reader = std::fs::File::open(path)
                    .map_err(|e| PathFileError::FileReadError(path.to_path_buf(), e))?;
                Self::from_csv_reader(reader)?
            }
            _ => return Err(PathFileError::UnsupportedExtension(path.to_path_buf())),
        };

        debug!(
            "Loaded {} waypoints and {} annotations from {:?}",
            file.way_points.len(),
            file.annotations.len(),
            path
        );

        file.file_path = Some(path.to_path_buf());
        Ok(file)
    }

    /// Parse a path from the content of a JSON path file.
    pub fn from_json_str(json_str: &str) -> Result<Self, PathFileError> {
        let json: JsonPathFile = serde_json::from_str(json_str).map_err(PathFileError::JsonError)?;

        let column = |name: &'static str| {
            json.points_columns
                .iter()
                .position(|c| c.trim().eq_ignore_ascii_case(name))
        };
        let x_col = column("x").ok_or(PathFileError::MissingColumn("x"))?;
        let y_col = column("y").ok_or(PathFileError::MissingColumn("y"))?;
        let speed_col = column("speed");

        let num_columns = json.points_columns.len();
        let mut way_points = Vec::with_capacity(json.points.len());

        for (row, values) in json.points.iter().enumerate() {
            if values.len() != num_columns {
                return Err(PathFileError::RowLength {
                    row,
                    expected: num_columns,
                    found: values.len(),
                });
            }

            let mut wp = WayPoint::new(values[x_col], values[y_col]);
            wp.desired_speed_ms = speed_col.map(|c| values[c]);
            way_points.push(wp);
        }

        if let Some(origin) = json.origin {
            if !origin.is_valid() {
                return Err(PathFileError::InvalidCoordinates(origin));
            }
        }

        Ok(Self {
            way_points,
            annotations: json.annotations,
            origin: json.origin,
            file_path: None,
        })
    }

    /// Parse a path from a CSV source.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, PathFileError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut way_points = Vec::new();
        for record in csv_reader.deserialize() {
            let point: CsvPoint = record.map_err(PathFileError::CsvError)?;
            let mut wp = WayPoint::new(point.x, point.y);
            wp.desired_speed_ms = point.speed;
            way_points.push(wp);
        }

        Ok(Self {
            way_points,
            annotations: Vec::new(),
            origin: None,
            file_path: None,
        })
    }

    pub fn way_points(&self) -> &[WayPoint] {
        &self.way_points
    }

    pub fn annotations(&self) -> &[AnnotationRecord] {
        &self.annotations
    }

    pub fn origin(&self) -> Option<&GeodeticCoordinates> {
        self.origin.as_ref()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Express the waypoints in the local tangent plane at `local_anchor`.
    ///
    /// Every waypoint is shifted by the position of the file's origin relative to the anchor, the
    /// anchor then becoming the path's origin.
    pub fn reanchor(&mut self, local_anchor: &GeodeticCoordinates) -> Result<(), PathFileError> {
        if !local_anchor.is_valid() {
            return Err(PathFileError::InvalidCoordinates(*local_anchor));
        }

        let origin = self.origin.ok_or(PathFileError::MissingOrigin)?;
        let offset_m = origin.enu_offset_m(local_anchor);

        for wp in self.way_points.iter_mut() {
            wp.position_m += offset_m;
        }

        debug!(
            "Path re-anchored, shifted by ({:.3}, {:.3}) m",
            offset_m[0], offset_m[1]
        );

        self.origin = Some(*local_anchor);
        Ok(())
    }

    /// Split the file into its waypoints and annotations.
    pub fn into_parts(self) -> (Vec<WayPoint>, Vec<AnnotationRecord>) {
        (self.way_points, self.annotations)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    fn test_data(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join(name)
    }

    #[test]
    fn test_load_json() {
        let file = PathFile::load(test_data("test_path_matching.json")).unwrap();

        assert_eq!(file.way_points().len(), 41);
        assert_eq!(file.way_points()[0], WayPoint::new(0.0, 0.0).with_speed(1.0));
        assert_eq!(file.way_points()[40], WayPoint::new(20.0, 0.0).with_speed(1.0));
        assert_eq!(file.annotations().len(), 1);
        assert_eq!(file.annotations()[0].kind, "stop");
        assert_eq!(file.annotations()[0].point_index, 40);
        assert!(file.origin().is_some());
        assert_eq!(file.file_path(), Some(test_data("test_path_matching.json").as_path()));
    }

    #[test]
    fn test_load_csv() {
        let file = PathFile::load(test_data("test_path_matching.csv")).unwrap();

        assert_eq!(file.way_points().len(), 21);
        assert_eq!(file.way_points()[20].position_m, Vector2::new(20.0, 0.0));
        assert_eq!(file.way_points()[3].desired_speed_ms, Some(1.0));
        assert!(file.origin().is_none());
        assert!(file.annotations().is_empty());

        let file = PathFile::from_csv_reader("x, y\n0.0, 1.0\n2.0, 3.0\n".as_bytes()).unwrap();
        assert_eq!(file.way_points()[1], WayPoint::new(2.0, 3.0));
    }

    #[test]
    fn test_invalid_files() {
        assert!(matches!(
            PathFile::load(test_data("does_not_exist.json")),
            Err(PathFileError::FileReadError(..))
        ));
        assert!(matches!(
            PathFile::load(test_data("test_path_matching.yaml")),
            Err(PathFileError::UnsupportedExtension(_))
        ));
        assert!(matches!(
            PathFile::from_json_str("{\"points\": []}"),
            Err(PathFileError::JsonError(_))
        ));
        assert!(matches!(
            PathFile::from_json_str("{\"points_columns\": [\"x\"], \"points\": [[1.0]]}"),
            Err(PathFileError::MissingColumn("y"))
        ));
        assert!(matches!(
            PathFile::from_json_str(
                "{\"points_columns\": [\"x\", \"y\"], \"points\": [[1.0, 2.0], [1.0]]}"
            ),
            Err(PathFileError::RowLength {
                row: 1,
                expected: 2,
                found: 1
            })
        ));
        assert!(matches!(
            PathFile::from_csv_reader("x,y\n0.0,zero\n".as_bytes()),
            Err(PathFileError::CsvError(_))
        ));
    }

    #[test]
    fn test_reanchor() {
        let json = r#"{
            "origin": {"latitude_deg": 45.0, "longitude_deg": 3.0, "altitude_m": 300.0},
            "points_columns": ["x", "y"],
            "points": [[0.0, 0.0], [10.0, 0.0]]
        }"#;

        let mut file = PathFile::from_json_str(json).unwrap();

        // Anchor one thousandth of a degree south of the origin
        let anchor = GeodeticCoordinates::new(44.999, 3.0, 300.0);
        file.reanchor(&anchor).unwrap();

        assert_relative_eq!(file.way_points()[0].position_m[1], 111.3195, epsilon = 1e-3);
        assert_relative_eq!(file.way_points()[1].position_m[0], 10.0, epsilon = 1e-9);
        assert_eq!(file.origin(), Some(&anchor));

        let mut file = PathFile::from_csv_reader("x,y\n0.0,0.0\n".as_bytes()).unwrap();
        assert!(matches!(
            file.reanchor(&anchor),
            Err(PathFileError::MissingOrigin)
        ));
    }
}
