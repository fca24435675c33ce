use super::error::AnalysisError;
use serde::Serialize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A dense `[frame][column]` table of derived scalars, where a column is a
/// node, segment or bend site depending on the quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameGrid {
    num_frames: usize,
    num_columns: usize,
    data: Vec<f64>,
}

impl FrameGrid {
    pub fn zeros(num_frames: usize, num_columns: usize) -> Self {
        Self {
            num_frames,
            num_columns,
            data: vec![0.0; num_frames * num_columns],
        }
    }

    /// Evaluates `row` once per frame. Frames are independent, so with the
    /// `parallel` feature they are evaluated concurrently.
    pub(crate) fn try_from_rows<F>(
        num_frames: usize,
        num_columns: usize,
        row: F,
    ) -> Result<Self, AnalysisError>
    where
        F: Fn(usize) -> Result<Vec<f64>, AnalysisError> + Sync + Send,
    {
        #[cfg(not(feature = "parallel"))]
        let frames = 0..num_frames;
        #[cfg(feature = "parallel")]
        let frames = (0..num_frames).into_par_iter();

        let rows: Vec<Vec<f64>> = frames.map(row).collect::<Result<_, _>>()?;

        let mut data = Vec::with_capacity(num_frames * num_columns);
        for values in rows {
            debug_assert_eq!(values.len(), num_columns);
            data.extend(values);
        }
        Ok(Self {
            num_frames,
            num_columns,
            data,
        })
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    #[inline]
    pub fn get(&self, frame: usize, column: usize) -> f64 {
        self.data[frame * self.num_columns + column]
    }

    #[inline]
    pub(crate) fn set(&mut self, frame: usize, column: usize, value: f64) {
        self.data[frame * self.num_columns + column] = value;
    }

    pub fn row(&self, frame: usize) -> &[f64] {
        let start = frame * self.num_columns;
        &self.data[start..start + self.num_columns]
    }

    pub fn column(&self, column: usize) -> Vec<f64> {
        (0..self.num_frames).map(|f| self.get(f, column)).collect()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mean over columns for every frame. This is the whole-rod average.
    pub fn frame_means(&self) -> Vec<f64> {
        (0..self.num_frames)
            .map(|f| mean(self.row(f)))
            .collect()
    }

    /// Mean over every entry.
    pub fn mean(&self) -> f64 {
        mean(&self.data)
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
