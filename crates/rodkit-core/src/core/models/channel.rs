use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the seventeen per-node quantities recorded for every frame.
///
/// The declaration order is the on-disk row order of a frame block and must
/// not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    EquilR,
    EquilM,
    CurrentR,
    CurrentM,
    PerturbedXEnergyPositive,
    PerturbedYEnergyPositive,
    PerturbedZEnergyPositive,
    TwistedEnergyPositive,
    PerturbedXEnergyNegative,
    PerturbedYEnergyNegative,
    PerturbedZEnergyNegative,
    TwistedEnergyNegative,
    MaterialParams,
    BMatrix,
    StericEnergy,
    StericForce,
    NumNeighbours,
}

#[rustfmt::skip]
static CHANNEL_NAMES: Map<&'static str, Channel> = phf_map! {
    "equil_r" => Channel::EquilR,
    "equil_m" => Channel::EquilM,
    "current_r" => Channel::CurrentR,
    "current_m" => Channel::CurrentM,
    "internal_perturbed_x_energy_positive" => Channel::PerturbedXEnergyPositive,
    "internal_perturbed_y_energy_positive" => Channel::PerturbedYEnergyPositive,
    "internal_perturbed_z_energy_positive" => Channel::PerturbedZEnergyPositive,
    "twisted_energy_positive" => Channel::TwistedEnergyPositive,
    "internal_perturbed_x_energy_negative" => Channel::PerturbedXEnergyNegative,
    "internal_perturbed_y_energy_negative" => Channel::PerturbedYEnergyNegative,
    "internal_perturbed_z_energy_negative" => Channel::PerturbedZEnergyNegative,
    "twisted_energy_negative" => Channel::TwistedEnergyNegative,
    "material_params" => Channel::MaterialParams,
    "B_matrix" => Channel::BMatrix,
    "steric_energy" => Channel::StericEnergy,
    "steric_force" => Channel::StericForce,
    "num_neighbours" => Channel::NumNeighbours,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown channel name: '{0}'")]
pub struct ParseChannelError(pub String);

impl Channel {
    pub const COUNT: usize = 17;

    /// Every channel in file row order.
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::EquilR,
        Channel::EquilM,
        Channel::CurrentR,
        Channel::CurrentM,
        Channel::PerturbedXEnergyPositive,
        Channel::PerturbedYEnergyPositive,
        Channel::PerturbedZEnergyPositive,
        Channel::TwistedEnergyPositive,
        Channel::PerturbedXEnergyNegative,
        Channel::PerturbedYEnergyNegative,
        Channel::PerturbedZEnergyNegative,
        Channel::TwistedEnergyNegative,
        Channel::MaterialParams,
        Channel::BMatrix,
        Channel::StericEnergy,
        Channel::StericForce,
        Channel::NumNeighbours,
    ];

    /// Positive then negative samples, each ordered x, y, z, twist.
    pub const PERTURBATIONS: [Channel; 8] = [
        Channel::PerturbedXEnergyPositive,
        Channel::PerturbedYEnergyPositive,
        Channel::PerturbedZEnergyPositive,
        Channel::TwistedEnergyPositive,
        Channel::PerturbedXEnergyNegative,
        Channel::PerturbedYEnergyNegative,
        Channel::PerturbedZEnergyNegative,
        Channel::TwistedEnergyNegative,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 1-based row number inside a frame block.
    #[inline]
    pub const fn row(self) -> usize {
        self as usize + 1
    }

    pub fn from_row(row: usize) -> Option<Self> {
        row.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    pub const fn name(self) -> &'static str {
        match self {
            Channel::EquilR => "equil_r",
            Channel::EquilM => "equil_m",
            Channel::CurrentR => "current_r",
            Channel::CurrentM => "current_m",
            Channel::PerturbedXEnergyPositive => "internal_perturbed_x_energy_positive",
            Channel::PerturbedYEnergyPositive => "internal_perturbed_y_energy_positive",
            Channel::PerturbedZEnergyPositive => "internal_perturbed_z_energy_positive",
            Channel::TwistedEnergyPositive => "twisted_energy_positive",
            Channel::PerturbedXEnergyNegative => "internal_perturbed_x_energy_negative",
            Channel::PerturbedYEnergyNegative => "internal_perturbed_y_energy_negative",
            Channel::PerturbedZEnergyNegative => "internal_perturbed_z_energy_negative",
            Channel::TwistedEnergyNegative => "twisted_energy_negative",
            Channel::MaterialParams => "material_params",
            Channel::BMatrix => "B_matrix",
            Channel::StericEnergy => "steric_energy",
            Channel::StericForce => "steric_force",
            Channel::NumNeighbours => "num_neighbours",
        }
    }

    /// Width of a freshly zeroed channel; files may declare other widths.
    pub const fn default_width(self) -> usize {
        match self {
            Channel::BMatrix => 4,
            Channel::NumNeighbours => 1,
            _ => 3,
        }
    }

    /// Smallest width the analysis code can work with.
    pub const fn min_width(self) -> usize {
        match self {
            Channel::EquilR | Channel::EquilM | Channel::CurrentR | Channel::CurrentM => 3,
            Channel::BMatrix => 4,
            Channel::MaterialParams => 2,
            _ => 1,
        }
    }

    pub const fn is_perturbation(self) -> bool {
        matches!(
            self,
            Channel::PerturbedXEnergyPositive
                | Channel::PerturbedYEnergyPositive
                | Channel::PerturbedZEnergyPositive
                | Channel::TwistedEnergyPositive
                | Channel::PerturbedXEnergyNegative
                | Channel::PerturbedYEnergyNegative
                | Channel::PerturbedZEnergyNegative
                | Channel::TwistedEnergyNegative
        )
    }

    /// Channels whose values are linearly interpolated when nodes are inserted.
    /// Everything else is a simulator output and is zero-filled instead.
    pub const fn interpolates_on_subdivide(self) -> bool {
        matches!(
            self,
            Channel::EquilR
                | Channel::EquilM
                | Channel::CurrentR
                | Channel::CurrentM
                | Channel::MaterialParams
                | Channel::BMatrix
        )
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = ParseChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CHANNEL_NAMES
            .get(s)
            .copied()
            .ok_or_else(|| ParseChannelError(s.to_string()))
    }
}
