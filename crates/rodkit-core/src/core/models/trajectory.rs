use super::array::{NodeArray, ShapeError};
use super::channel::Channel;
use nalgebra::{Matrix4, Point3, Rotation3, Vector3};

const MIN_NODES: usize = 2;

/// Selects which of the two recorded rod configurations an operation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Configuration {
    /// The simulated state at each frame (`current_r`, `current_m`).
    Current,
    /// The rest state the elastic energies are measured against (`equil_r`, `equil_m`).
    Equilibrium,
}

impl Configuration {
    pub const fn positions(self) -> Channel {
        match self {
            Configuration::Current => Channel::CurrentR,
            Configuration::Equilibrium => Channel::EquilR,
        }
    }

    pub const fn material_axes(self) -> Channel {
        match self {
            Configuration::Current => Channel::CurrentM,
            Configuration::Equilibrium => Channel::EquilM,
        }
    }
}

/// Frame-to-frame averages of the finite-difference energy samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbationAverages {
    /// Mean of the eight perturbation samples per component,
    /// `[frame][node][stretch, bend, twist]`.
    pub by_type: NodeArray,
    /// Per degree of freedom, `[frame][node][x, y, z, twist]`, each half the
    /// summed positive and negative samples.
    pub by_dof: NodeArray,
}

/// The complete recorded history of one rod.
///
/// Every channel shares the same `(num_frames, num_elements)` leading shape;
/// trailing widths may differ per channel. Shape is validated on every
/// construction path so the accessors below can index without checks.
#[derive(Debug, Clone, PartialEq)]
pub struct RodTrajectory {
    rod_id: usize,
    num_rods: usize,
    num_elements: usize,
    num_frames: usize,
    channels: [NodeArray; Channel::COUNT],
}

impl RodTrajectory {
    /// Creates a single-frame rod with every channel zeroed.
    ///
    /// # Arguments
    ///
    /// * `num_elements` - Number of nodes along the rod.
    /// * `num_rods` - Total rod count recorded in the header.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::TooFewNodes`] for fewer than two nodes.
    pub fn zeroed(num_elements: usize, num_rods: usize) -> Result<Self, ShapeError> {
        if num_elements < MIN_NODES {
            return Err(ShapeError::TooFewNodes {
                required: MIN_NODES,
                actual: num_elements,
            });
        }
        let channels = std::array::from_fn(|i| {
            NodeArray::zeros(1, num_elements, Channel::ALL[i].default_width())
        });
        Ok(Self {
            rod_id: 0,
            num_rods,
            num_elements,
            num_frames: 1,
            channels,
        })
    }

    /// Assembles a trajectory from fully populated channels in file row order.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if the channels disagree on frame or node
    /// count, if a channel is narrower than the analysis requires, if there
    /// are no frames, or if there are fewer than two nodes.
    pub fn from_channels(
        rod_id: usize,
        num_rods: usize,
        channels: [NodeArray; Channel::COUNT],
    ) -> Result<Self, ShapeError> {
        let (num_frames, num_elements) = validate_channels(&channels)?;
        Ok(Self {
            rod_id,
            num_rods,
            num_elements,
            num_frames,
            channels,
        })
    }

    pub fn rod_id(&self) -> usize {
        self.rod_id
    }

    pub fn set_rod_id(&mut self, rod_id: usize) {
        self.rod_id = rod_id;
    }

    pub fn num_rods(&self) -> usize {
        self.num_rods
    }

    /// Node count.
    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn num_segments(&self) -> usize {
        self.num_elements - 1
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// The header's `length` field, always three values per node.
    pub fn length(&self) -> usize {
        3 * self.num_elements
    }

    pub fn channel(&self, channel: Channel) -> &NodeArray {
        &self.channels[channel.index()]
    }

    pub(crate) fn channel_mut(&mut self, channel: Channel) -> &mut NodeArray {
        &mut self.channels[channel.index()]
    }

    pub fn channels(&self) -> &[NodeArray; Channel::COUNT] {
        &self.channels
    }

    pub fn positions(&self, configuration: Configuration) -> &NodeArray {
        self.channel(configuration.positions())
    }

    pub fn material_axes(&self, configuration: Configuration) -> &NodeArray {
        self.channel(configuration.material_axes())
    }

    pub fn equil_r(&self) -> &NodeArray {
        self.channel(Channel::EquilR)
    }

    pub fn current_r(&self) -> &NodeArray {
        self.channel(Channel::CurrentR)
    }

    pub fn equil_m(&self) -> &NodeArray {
        self.channel(Channel::EquilM)
    }

    pub fn current_m(&self) -> &NodeArray {
        self.channel(Channel::CurrentM)
    }

    pub fn material_params(&self) -> &NodeArray {
        self.channel(Channel::MaterialParams)
    }

    pub fn b_matrix(&self) -> &NodeArray {
        self.channel(Channel::BMatrix)
    }

    /// Overwrites one node of one channel.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::FrameLength`] if `values` is not exactly the
    /// channel width, [`ShapeError::FrameOutOfRange`] for a bad frame or
    /// [`ShapeError::NodeOutOfRange`] for a bad node.
    pub fn set_node(
        &mut self,
        channel: Channel,
        frame: usize,
        node: usize,
        values: &[f64],
    ) -> Result<(), ShapeError> {
        if frame >= self.num_frames {
            return Err(ShapeError::FrameOutOfRange {
                index: frame,
                num_frames: self.num_frames,
            });
        }
        if node >= self.num_elements {
            return Err(ShapeError::NodeOutOfRange {
                index: node,
                num_nodes: self.num_elements,
            });
        }
        let array = self.channel_mut(channel);
        if values.len() != array.width() {
            return Err(ShapeError::FrameLength {
                expected: array.width(),
                actual: values.len(),
            });
        }
        array.node_mut(frame, node).copy_from_slice(values);
        Ok(())
    }

    /// Segment vectors `p_i = r_{i+1} - r_i` for every frame, shape
    /// `[frame][segment][3]` with one fewer row than there are nodes.
    pub fn segments(&self, configuration: Configuration) -> NodeArray {
        let r = self.positions(configuration);
        let mut p = NodeArray::zeros(self.num_frames, self.num_segments(), 3);
        for frame in 0..self.num_frames {
            for i in 0..self.num_segments() {
                p.set_vec3(frame, i, &(r.vec3(frame, i + 1) - r.vec3(frame, i)));
            }
        }
        p
    }

    /// Averages the eight finite-difference energy channels.
    ///
    /// The by-type average uses the narrowest perturbation width so that
    /// mixed-width files still produce a well-formed array.
    pub fn averaged_perturbation_energies(&self) -> PerturbationAverages {
        let arrays: Vec<&NodeArray> = Channel::PERTURBATIONS
            .iter()
            .map(|&c| self.channel(c))
            .collect();
        let width = arrays.iter().map(|a| a.width()).min().unwrap_or(0);

        let mut by_type = NodeArray::zeros(self.num_frames, self.num_elements, width);
        let mut by_dof = NodeArray::zeros(self.num_frames, self.num_elements, 4);
        for frame in 0..self.num_frames {
            for node in 0..self.num_elements {
                for component in 0..width {
                    let sum: f64 = arrays.iter().map(|a| a.get(frame, node, component)).sum();
                    by_type.set(frame, node, component, sum / 8.0);
                }
                for dof in 0..4 {
                    let positive: f64 = arrays[dof].node(frame, node).iter().sum();
                    let negative: f64 = arrays[dof + 4].node(frame, node).iter().sum();
                    by_dof.set(frame, node, dof, (positive + negative) / 2.0);
                }
            }
        }
        PerturbationAverages { by_type, by_dof }
    }

    /// Multiplies positions and material axes of both configurations.
    pub fn scale(&mut self, factor: f64) {
        for channel in [
            Channel::CurrentM,
            Channel::CurrentR,
            Channel::EquilR,
            Channel::EquilM,
        ] {
            self.channel_mut(channel).map_in_place(|v| v * factor);
        }
    }

    /// Shifts node positions; material axes are directions and stay put.
    pub fn translate(&mut self, shift: &Vector3<f64>, current: bool, equil: bool) {
        let mut targets = Vec::with_capacity(2);
        if current {
            targets.push(Channel::CurrentR);
        }
        if equil {
            targets.push(Channel::EquilR);
        }
        for channel in targets {
            let array = self.channel_mut(channel);
            for frame in 0..array.num_frames() {
                for node in 0..array.num_nodes() {
                    let moved = array.vec3(frame, node) + shift;
                    array.set_vec3(frame, node, &moved);
                }
            }
        }
    }

    /// Mean node position of every frame.
    pub fn centroids(&self, configuration: Configuration) -> Vec<Vector3<f64>> {
        let r = self.positions(configuration);
        (0..self.num_frames)
            .map(|frame| {
                let sum: Vector3<f64> = (0..self.num_elements).map(|n| r.vec3(frame, n)).sum();
                sum / self.num_elements as f64
            })
            .collect()
    }

    /// Rotates every frame of both configurations by `Rz(z) · Ry(y) · Rx(x)`
    /// about that configuration's own centroid. Material axes rotate with
    /// the positions.
    pub fn rotate(&mut self, xyz: &Vector3<f64>) {
        let rotation = Rotation3::from_euler_angles(xyz.x, xyz.y, xyz.z);
        for configuration in [Configuration::Equilibrium, Configuration::Current] {
            let centroids = self.centroids(configuration);
            for (frame, centroid) in centroids.iter().enumerate() {
                let transform = rotation_about(&rotation, centroid);
                self.apply_transform(configuration, frame, &transform);
            }
        }
    }

    /// Applies a rigid homogeneous transform to one frame of one configuration.
    ///
    /// Positions are transformed as points and material axes by the linear
    /// part only.
    pub fn apply_transform(
        &mut self,
        configuration: Configuration,
        frame: usize,
        transform: &Matrix4<f64>,
    ) {
        let linear = transform.fixed_view::<3, 3>(0, 0).into_owned();
        let r = self.channel_mut(configuration.positions());
        for node in 0..r.num_nodes() {
            let p = Point3::from(r.vec3(frame, node));
            let moved = transform.transform_point(&p);
            r.set_vec3(frame, node, &moved.coords);
        }
        let m = self.channel_mut(configuration.material_axes());
        for node in 0..m.num_nodes() {
            let rotated = linear * m.vec3(frame, node);
            m.set_vec3(frame, node, &rotated);
        }
    }

    /// Swaps in a new set of channels, possibly with a different frame or
    /// node count, after validating them as a whole.
    pub(crate) fn replace_channels(
        &mut self,
        channels: [NodeArray; Channel::COUNT],
    ) -> Result<(), ShapeError> {
        let (num_frames, num_elements) = validate_channels(&channels)?;
        self.channels = channels;
        self.num_frames = num_frames;
        self.num_elements = num_elements;
        Ok(())
    }
}

fn rotation_about(rotation: &Rotation3<f64>, center: &Vector3<f64>) -> Matrix4<f64> {
    Matrix4::new_translation(center) * rotation.to_homogeneous() * Matrix4::new_translation(&-center)
}

fn validate_channels(channels: &[NodeArray; Channel::COUNT]) -> Result<(usize, usize), ShapeError> {
    let num_frames = channels[0].num_frames();
    let num_elements = channels[0].num_nodes();
    if num_frames == 0 {
        return Err(ShapeError::NoFrames);
    }
    if num_elements < MIN_NODES {
        return Err(ShapeError::TooFewNodes {
            required: MIN_NODES,
            actual: num_elements,
        });
    }
    for (channel, array) in Channel::ALL.iter().zip(channels) {
        if array.num_frames() != num_frames || array.num_nodes() != num_elements {
            return Err(ShapeError::Mismatch {
                channel: channel.name(),
                expected_frames: num_frames,
                expected_nodes: num_elements,
                actual_frames: array.num_frames(),
                actual_nodes: array.num_nodes(),
            });
        }
        if array.width() < channel.min_width() {
            return Err(ShapeError::WidthTooSmall {
                channel: channel.name(),
                required: channel.min_width(),
                actual: array.width(),
            });
        }
    }
    Ok((num_frames, num_elements))
}
