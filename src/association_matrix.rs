//! Association scores between query detections and reference detections.
//!
//! [`AssociationMatrix`] keeps the score grid together with the exact ordered
//! detections indexing its rows and columns. [`ScoreTable`] is the exported,
//! labelled form used for the per-frame diagnostics.

use crate::detection::{Detection, DetectionId};
use crate::error::{Result, TrackError};
use crate::global_tracker::TrackId;
use nalgebra::DMatrix;
use serde::Serialize;

/// How rows or columns are labelled when exporting a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// Ground-truth track id, `-1` when unknown.
    GroundTruth,
    /// Predicted track id, `-1` when not yet assigned.
    Predicted,
    /// Position in the query / reference list.
    Index,
}

/*------------------------------------------------------------------------------
AssociationMatrix
------------------------------------------------------------------------------*/

#[derive(Debug, Clone, PartialEq)]
pub struct AssociationMatrix {
    matrix: DMatrix<f32>,
    query_detections: Vec<Detection>,
    ref_detections: Vec<Detection>,
    // predicted ids at the time the matrix was produced, parallel to the detections
    query_track_ids: Vec<Option<TrackId>>,
    ref_track_ids: Vec<Option<TrackId>>,
}

impl AssociationMatrix {
    /// Fails if the row count differs from the number of query detections or
    /// the column count from the number of reference detections.
    pub fn new(
        matrix: DMatrix<f32>,
        query_detections: Vec<Detection>,
        ref_detections: Vec<Detection>,
    ) -> Result<Self> {
        if query_detections.len() != matrix.nrows() {
            return Err(TrackError::DimensionMismatch {
                what: "query detections vs association matrix rows",
                expected: matrix.nrows(),
                actual: query_detections.len(),
            });
        }
        if ref_detections.len() != matrix.ncols() {
            return Err(TrackError::DimensionMismatch {
                what: "reference detections vs association matrix columns",
                expected: matrix.ncols(),
                actual: ref_detections.len(),
            });
        }
        Ok(Self {
            query_track_ids: vec![None; query_detections.len()],
            ref_track_ids: vec![None; ref_detections.len()],
            matrix,
            query_detections,
            ref_detections,
        })
    }

    /// Attach the predicted track id of every query and reference detection,
    /// in row / column order.
    pub fn with_track_ids(
        self,
        query_track_ids: Vec<Option<TrackId>>,
        ref_track_ids: Vec<Option<TrackId>>,
    ) -> Result<Self> {
        if query_track_ids.len() != self.nrows() {
            return Err(TrackError::DimensionMismatch {
                what: "query track ids vs association matrix rows",
                expected: self.nrows(),
                actual: query_track_ids.len(),
            });
        }
        if ref_track_ids.len() != self.ncols() {
            return Err(TrackError::DimensionMismatch {
                what: "reference track ids vs association matrix columns",
                expected: self.ncols(),
                actual: ref_track_ids.len(),
            });
        }
        Ok(Self {
            query_track_ids,
            ref_track_ids,
            ..self
        })
    }

    pub fn matrix(&self) -> &DMatrix<f32> {
        &self.matrix
    }

    pub fn query_detections(&self) -> &[Detection] {
        &self.query_detections
    }

    pub fn ref_detections(&self) -> &[Detection] {
        &self.ref_detections
    }

    pub fn query_track_ids(&self) -> &[Option<TrackId>] {
        &self.query_track_ids
    }

    pub fn ref_track_ids(&self) -> &[Option<TrackId>] {
        &self.ref_track_ids
    }

    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn query_index(&self, id: DetectionId) -> Result<usize> {
        position(&self.query_detections, id, "query")
    }

    pub fn ref_index(&self, id: DetectionId) -> Result<usize> {
        position(&self.ref_detections, id, "reference")
    }

    pub fn get(&self, query: DetectionId, reference: DetectionId) -> Result<f32> {
        let row = self.query_index(query)?;
        let col = self.ref_index(reference)?;
        Ok(self.matrix[(row, col)])
    }

    pub fn get_by_index(&self, row: usize, col: usize) -> Result<f32> {
        self.matrix.get((row, col)).copied().ok_or_else(|| {
            TrackError::LookupError(format!(
                "index ({}, {}) out of range for a {}x{} association matrix",
                row,
                col,
                self.nrows(),
                self.ncols()
            ))
        })
    }

    /// Scores of one query detection against every reference, in column order.
    pub fn row(&self, query: DetectionId) -> Result<Vec<f32>> {
        let row = self.query_index(query)?;
        Ok(self.matrix.row(row).iter().copied().collect())
    }

    /// Sub-matrix for the given queries and references, in the requested order.
    /// `None` selects every row (or column).
    pub fn select(
        &self,
        queries: Option<&[DetectionId]>,
        references: Option<&[DetectionId]>,
    ) -> Result<DMatrix<f32>> {
        let rows = match queries {
            Some(ids) => ids
                .iter()
                .map(|id| self.query_index(*id))
                .collect::<Result<Vec<_>>>()?,
            None => (0..self.nrows()).collect(),
        };
        let cols = match references {
            Some(ids) => ids
                .iter()
                .map(|id| self.ref_index(*id))
                .collect::<Result<Vec<_>>>()?,
            None => (0..self.ncols()).collect(),
        };
        Ok(DMatrix::from_fn(rows.len(), cols.len(), |i, j| {
            self.matrix[(rows[i], cols[j])]
        }))
    }

    /// Labelled copy of the scores. Predicted labels come from the ids the
    /// matrix was built with, so the export stays valid after the tracker
    /// state moves on.
    pub fn to_table(&self, row_label: Label, col_label: Label) -> ScoreTable {
        ScoreTable {
            row_name: "Query Instances".to_string(),
            col_name: "Reference Instances".to_string(),
            row_labels: label_detections(&self.query_detections, &self.query_track_ids, row_label),
            col_labels: label_detections(&self.ref_detections, &self.ref_track_ids, col_label),
            values: self.matrix.clone(),
        }
    }
}

fn position(detections: &[Detection], id: DetectionId, side: &str) -> Result<usize> {
    detections
        .iter()
        .position(|det| det.id() == id)
        .ok_or_else(|| TrackError::LookupError(format!("{:?} is not a {} detection", id, side)))
}

fn label_detections(
    detections: &[Detection],
    track_ids: &[Option<TrackId>],
    label: Label,
) -> Vec<i64> {
    detections
        .iter()
        .zip(track_ids.iter())
        .enumerate()
        .map(|(i, (det, track_id))| match label {
            Label::GroundTruth => det.gt_track_id().unwrap_or(-1),
            Label::Predicted => track_id.map(|t| t as i64).unwrap_or(-1),
            Label::Index => i as i64,
        })
        .collect()
}

/*------------------------------------------------------------------------------
ScoreTable
------------------------------------------------------------------------------*/

/// Score grid with one integer label per row and per column.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    row_name: String,
    col_name: String,
    row_labels: Vec<i64>,
    col_labels: Vec<i64>,
    values: DMatrix<f32>,
}

#[derive(Debug, Serialize)]
struct ScoreTableRecord<'a> {
    row_name: &'a str,
    col_name: &'a str,
    rows: &'a [i64],
    columns: &'a [i64],
    values: Vec<Vec<f32>>,
}

impl ScoreTable {
    pub fn new(values: DMatrix<f32>, row_labels: Vec<i64>, col_labels: Vec<i64>) -> Result<Self> {
        if row_labels.len() != values.nrows() {
            return Err(TrackError::DimensionMismatch {
                what: "score table row labels",
                expected: values.nrows(),
                actual: row_labels.len(),
            });
        }
        if col_labels.len() != values.ncols() {
            return Err(TrackError::DimensionMismatch {
                what: "score table column labels",
                expected: values.ncols(),
                actual: col_labels.len(),
            });
        }
        Ok(Self {
            row_name: String::new(),
            col_name: String::new(),
            row_labels,
            col_labels,
            values,
        })
    }

    pub fn with_axis_names(self, row_name: &str, col_name: &str) -> Self {
        Self {
            row_name: row_name.to_string(),
            col_name: col_name.to_string(),
            ..self
        }
    }

    pub fn row_name(&self) -> &str {
        &self.row_name
    }

    pub fn col_name(&self) -> &str {
        &self.col_name
    }

    pub fn row_labels(&self) -> &[i64] {
        &self.row_labels
    }

    pub fn col_labels(&self) -> &[i64] {
        &self.col_labels
    }

    pub fn values(&self) -> &DMatrix<f32> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Value at the first row / column carrying the given labels.
    pub fn get(&self, row_label: i64, col_label: i64) -> Option<f32> {
        let row = self.row_labels.iter().position(|&l| l == row_label)?;
        let col = self.col_labels.iter().position(|&l| l == col_label)?;
        Some(self.values[(row, col)])
    }

    pub fn column(&self, col_label: i64) -> Option<Vec<f32>> {
        let col = self.col_labels.iter().position(|&l| l == col_label)?;
        Some(self.values.column(col).iter().copied().collect())
    }

    pub fn to_json(&self) -> Result<String> {
        let record = ScoreTableRecord {
            row_name: &self.row_name,
            col_name: &self.col_name,
            rows: &self.row_labels,
            columns: &self.col_labels,
            values: (0..self.nrows())
                .map(|i| self.values.row(i).iter().copied().collect())
                .collect(),
        };
        Ok(serde_json::to_string(&record)?)
    }
}
