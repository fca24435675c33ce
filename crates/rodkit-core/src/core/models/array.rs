use nalgebra::Vector3;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("Data length {actual} does not match shape {frames}x{nodes}x{width}")]
    DataLength {
        frames: usize,
        nodes: usize,
        width: usize,
        actual: usize,
    },
    #[error("Frame holds {actual} values, expected {expected}")]
    FrameLength { expected: usize, actual: usize },
    #[error(
        "Channel '{channel}' has shape {actual_frames}x{actual_nodes}, expected {expected_frames}x{expected_nodes}"
    )]
    Mismatch {
        channel: &'static str,
        expected_frames: usize,
        expected_nodes: usize,
        actual_frames: usize,
        actual_nodes: usize,
    },
    #[error("Channel '{channel}' needs at least {required} values per node, found {actual}")]
    WidthTooSmall {
        channel: &'static str,
        required: usize,
        actual: usize,
    },
    #[error("A rod needs at least {required} nodes, found {actual}")]
    TooFewNodes { required: usize, actual: usize },
    #[error("A trajectory needs at least one frame")]
    NoFrames,
    #[error("Frame index {index} is out of range for {num_frames} frames")]
    FrameOutOfRange { index: usize, num_frames: usize },
    #[error("Node index {index} is out of range for {num_nodes} nodes")]
    NodeOutOfRange { index: usize, num_nodes: usize },
}

/// Dense `[frame][node][width]` array of `f64`, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeArray {
    num_frames: usize,
    num_nodes: usize,
    width: usize,
    data: Vec<f64>,
}

impl NodeArray {
    pub fn zeros(num_frames: usize, num_nodes: usize, width: usize) -> Self {
        Self {
            num_frames,
            num_nodes,
            width,
            data: vec![0.0; num_frames * num_nodes * width],
        }
    }

    pub fn from_data(
        num_frames: usize,
        num_nodes: usize,
        width: usize,
        data: Vec<f64>,
    ) -> Result<Self, ShapeError> {
        if data.len() != num_frames * num_nodes * width {
            return Err(ShapeError::DataLength {
                frames: num_frames,
                nodes: num_nodes,
                width,
                actual: data.len(),
            });
        }
        Ok(Self {
            num_frames,
            num_nodes,
            width,
            data,
        })
    }

    /// Empty array with room for `capacity_frames` frames.
    pub fn with_capacity(num_nodes: usize, width: usize, capacity_frames: usize) -> Self {
        Self {
            num_frames: 0,
            num_nodes,
            width,
            data: Vec::with_capacity(capacity_frames * num_nodes * width),
        }
    }

    /// Builds a width-3 array from per-frame lists of vectors.
    pub fn from_vectors(frames: &[Vec<Vector3<f64>>]) -> Result<Self, ShapeError> {
        let num_nodes = frames.first().map_or(0, Vec::len);
        let mut array = Self::with_capacity(num_nodes, 3, frames.len());
        for frame in frames {
            let flat: Vec<f64> = frame.iter().flat_map(|v| [v.x, v.y, v.z]).collect();
            array.push_frame(&flat)?;
        }
        Ok(array)
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn frame_len(&self) -> usize {
        self.num_nodes * self.width
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    #[inline]
    fn offset(&self, frame: usize, node: usize) -> usize {
        (frame * self.num_nodes + node) * self.width
    }

    pub fn frame(&self, frame: usize) -> &[f64] {
        let start = frame * self.frame_len();
        &self.data[start..start + self.frame_len()]
    }

    pub fn frame_mut(&mut self, frame: usize) -> &mut [f64] {
        let len = self.frame_len();
        let start = frame * len;
        &mut self.data[start..start + len]
    }

    pub fn node(&self, frame: usize, node: usize) -> &[f64] {
        let start = self.offset(frame, node);
        &self.data[start..start + self.width]
    }

    pub fn node_mut(&mut self, frame: usize, node: usize) -> &mut [f64] {
        let start = self.offset(frame, node);
        let width = self.width;
        &mut self.data[start..start + width]
    }

    #[inline]
    pub fn get(&self, frame: usize, node: usize, component: usize) -> f64 {
        self.data[self.offset(frame, node) + component]
    }

    #[inline]
    pub fn set(&mut self, frame: usize, node: usize, component: usize, value: f64) {
        let i = self.offset(frame, node) + component;
        self.data[i] = value;
    }

    /// The first three components of a node as a vector.
    #[inline]
    pub fn vec3(&self, frame: usize, node: usize) -> Vector3<f64> {
        let start = self.offset(frame, node);
        Vector3::new(self.data[start], self.data[start + 1], self.data[start + 2])
    }

    #[inline]
    pub fn set_vec3(&mut self, frame: usize, node: usize, v: &Vector3<f64>) {
        let start = self.offset(frame, node);
        self.data[start..start + 3].copy_from_slice(v.as_slice());
    }

    /// Every node of one frame as vectors.
    pub fn frame_vectors(&self, frame: usize) -> Vec<Vector3<f64>> {
        (0..self.num_nodes).map(|n| self.vec3(frame, n)).collect()
    }

    pub fn push_frame(&mut self, values: &[f64]) -> Result<(), ShapeError> {
        if values.len() != self.frame_len() {
            return Err(ShapeError::FrameLength {
                expected: self.frame_len(),
                actual: values.len(),
            });
        }
        self.data.extend_from_slice(values);
        self.num_frames += 1;
        Ok(())
    }

    /// New array holding only the listed frames, in the given order.
    pub fn select_frames(&self, frames: &[usize]) -> Result<Self, ShapeError> {
        let mut out = Self::with_capacity(self.num_nodes, self.width, frames.len());
        for &f in frames {
            if f >= self.num_frames {
                return Err(ShapeError::FrameOutOfRange {
                    index: f,
                    num_frames: self.num_frames,
                });
            }
            out.push_frame(self.frame(f))?;
        }
        Ok(out)
    }

    pub fn map_in_place(&mut self, mut f: impl FnMut(f64) -> f64) {
        for value in &mut self.data {
            *value = f(*value);
        }
    }
}
