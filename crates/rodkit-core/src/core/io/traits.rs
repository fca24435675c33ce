use crate::core::models::trajectory::RodTrajectory;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing rod trajectory formats.
///
/// Implementors handle format-specific parsing and serialization; the path
/// based helpers are provided on top of the reader/writer methods.
pub trait TrajectoryFile {
    /// Header information that has no home in [`RodTrajectory`] but must
    /// survive a read/write cycle.
    type Metadata: Default;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a trajectory and its metadata from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<(RodTrajectory, Self::Metadata), Self::Error>;

    /// Writes a trajectory and metadata to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(
        trajectory: &RodTrajectory,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Writes a trajectory with default metadata.
    fn write_trajectory_to(
        trajectory: &RodTrajectory,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        Self::write_to(trajectory, &Self::Metadata::default(), writer)
    }

    /// Reads a trajectory from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<(RodTrajectory, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes a trajectory and metadata to a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(
        trajectory: &RodTrajectory,
        metadata: &Self::Metadata,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(trajectory, metadata, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes a trajectory with default metadata to a file path.
    fn write_trajectory_to_path<P: AsRef<Path>>(
        trajectory: &RodTrajectory,
        path: P,
    ) -> Result<(), Self::Error> {
        Self::write_to_path(trajectory, &Self::Metadata::default(), path)
    }
}
