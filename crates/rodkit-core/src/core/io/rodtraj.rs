use crate::core::io::traits::TrajectoryFile;
use crate::core::models::array::NodeArray;
use crate::core::models::channel::Channel;
use crate::core::models::trajectory::RodTrajectory;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::debug;

const FORMAT_NAME: &str = "ffea_rod";
const FORMAT_VERSION: &str = "1.3";
const END_OF_HEADER: &str = "---END HEADER---";
const CONNECTIONS_MARKER: &str = "CONNECTIONS,ROD,0";
const DEFAULT_CONNECTIONS: &str = "[rodelement], [blobno], [blobelement]";

#[derive(Debug, Clone, PartialEq)]
pub struct RodTrajMetadata {
    pub format: String,
    pub version: String,
    /// Raw lines following the `CONNECTIONS` marker, kept verbatim.
    pub connections: Vec<String>,
}

impl Default for RodTrajMetadata {
    fn default() -> Self {
        Self {
            format: FORMAT_NAME.to_string(),
            version: FORMAT_VERSION.to_string(),
            connections: vec![DEFAULT_CONNECTIONS.to_string()],
        }
    }
}

#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Header error on line {line}: {kind}")]
    Header { line: usize, kind: ParseErrorKind },
    /// Row `0` denotes the `FRAME` marker line itself; data rows are `1..=17`.
    #[error("Parse error in frame {frame}, row {row}: {kind}")]
    Parse {
        frame: usize,
        row: usize,
        kind: ParseErrorKind,
    },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseErrorKind {
    #[error("Invalid integer for '{field}' (value: '{value}')")]
    InvalidInt { field: String, value: String },
    #[error("Invalid float in column {column} (value: '{value}')")]
    InvalidFloat { column: usize, value: String },
    #[error("{fields} values cannot be split evenly over {num_elements} nodes")]
    UnevenRow { fields: usize, num_elements: usize },
    #[error("Row width {found} differs from width {expected} seen in the first frame")]
    WidthMismatch { expected: usize, found: usize },
    #[error("Frame block ends before all 17 rows were read")]
    TruncatedFrame,
    #[error("Expected 'FRAME <index> ROD <id>', found '{line}'")]
    MalformedFrameMarker { line: String },
    #[error("Row {row} must be '{expected}', found '{found}'")]
    UnexpectedRowName {
        row: usize,
        expected: &'static str,
        found: String,
    },
}

struct Header {
    rod_id: usize,
    num_elements: usize,
    num_rods: usize,
    metadata: RodTrajMetadata,
    /// Index of the first line after the header terminator.
    body_start: usize,
}

fn parse_header_int(line_num: usize, field: &str, value: &str) -> Result<usize, TrajectoryError> {
    value.trim().parse().map_err(|_| TrajectoryError::Header {
        line: line_num,
        kind: ParseErrorKind::InvalidInt {
            field: field.to_string(),
            value: value.to_string(),
        },
    })
}

fn parse_header(lines: &[String]) -> Result<Header, TrajectoryError> {
    let mut metadata = RodTrajMetadata {
        connections: Vec::new(),
        ..RodTrajMetadata::default()
    };
    let mut rod_id = None;
    let mut num_elements = None;
    let mut num_rods = None;
    let mut declared_length = None;
    let mut in_connections = false;

    for (index, line) in lines.iter().enumerate() {
        let line_num = index + 1;
        let line = line.trim_end();
        if line == END_OF_HEADER {
            let num_elements =
                num_elements.ok_or_else(|| TrajectoryError::MissingRecord("num_elements".into()))?;
            if num_elements == 0 {
                return Err(TrajectoryError::Inconsistency(
                    "Header declares a rod with no elements".into(),
                ));
            }
            if let Some(length) = declared_length {
                if length != 3 * num_elements {
                    return Err(TrajectoryError::Inconsistency(format!(
                        "Header length {} is not 3 x num_elements ({})",
                        length, num_elements
                    )));
                }
            }
            return Ok(Header {
                rod_id: rod_id.unwrap_or(0),
                num_elements,
                num_rods: num_rods.unwrap_or(1),
                metadata,
                body_start: index + 1,
            });
        }
        if in_connections {
            metadata.connections.push(line.to_string());
            continue;
        }
        if line == CONNECTIONS_MARKER {
            in_connections = true;
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        match fields.as_slice() {
            ["format", value] => metadata.format = value.trim().to_string(),
            ["version", value] => metadata.version = value.trim().to_string(),
            ["HEADER", "ROD", id] => rod_id = Some(parse_header_int(line_num, "HEADER", id)?),
            ["num_elements", value] => {
                num_elements = Some(parse_header_int(line_num, "num_elements", value)?)
            }
            ["length", value] => declared_length = Some(parse_header_int(line_num, "length", value)?),
            ["num_rods", value] => num_rods = Some(parse_header_int(line_num, "num_rods", value)?),
            [key, name] if key.starts_with("row") => {
                let row = parse_header_int(line_num, key, &key[3..])?;
                let expected = Channel::from_row(row).ok_or_else(|| {
                    TrajectoryError::Inconsistency(format!("Header declares unknown row {}", row))
                })?;
                if name.trim() != expected.name() {
                    return Err(TrajectoryError::Header {
                        line: line_num,
                        kind: ParseErrorKind::UnexpectedRowName {
                            row,
                            expected: expected.name(),
                            found: name.trim().to_string(),
                        },
                    });
                }
            }
            _ => debug!(line = line_num, "Ignoring unrecognised header line"),
        }
    }

    Err(TrajectoryError::MissingRecord(END_OF_HEADER.into()))
}

fn is_frame_marker(line: &str) -> bool {
    let mut tokens = line.split(' ');
    tokens.next() == Some("FRAME") && tokens.nth(1) == Some("ROD")
}

fn check_frame_marker(line: &str, frame: usize) -> Result<(), TrajectoryError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let well_formed = matches!(tokens.as_slice(), ["FRAME", index, "ROD", id]
        if index.parse::<usize>().is_ok() && id.parse::<usize>().is_ok());
    if well_formed {
        Ok(())
    } else {
        Err(TrajectoryError::Parse {
            frame,
            row: 0,
            kind: ParseErrorKind::MalformedFrameMarker {
                line: line.to_string(),
            },
        })
    }
}

fn parse_row(line: &str, frame: usize, row: usize) -> Result<Vec<f64>, TrajectoryError> {
    line.trim()
        .split(',')
        .enumerate()
        .map(|(column, value)| {
            value.trim().parse::<f64>().map_err(|_| TrajectoryError::Parse {
                frame,
                row,
                kind: ParseErrorKind::InvalidFloat {
                    column: column + 1,
                    value: value.to_string(),
                },
            })
        })
        .collect()
}

pub struct RodTrajFile;

impl TrajectoryFile for RodTrajFile {
    type Metadata = RodTrajMetadata;
    type Error = TrajectoryError;

    fn read_from(reader: &mut impl BufRead) -> Result<(RodTrajectory, Self::Metadata), Self::Error> {
        let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
        let header = parse_header(&lines)?;
        let body = &lines[header.body_start..];
        let n = header.num_elements;

        let frame_count = body.iter().filter(|line| is_frame_marker(line)).count();
        if frame_count == 0 {
            return Err(TrajectoryError::MissingRecord("FRAME".into()));
        }
        debug!(
            rod_id = header.rod_id,
            num_elements = n,
            frames = frame_count,
            "Parsed trajectory header"
        );

        let mut arrays: Vec<Option<NodeArray>> = vec![None; Channel::COUNT];
        let mut frame = 0;
        let mut cursor = body.iter();
        while let Some(line) = cursor.next() {
            if line.trim().is_empty() {
                continue;
            }
            check_frame_marker(line, frame)?;

            for channel in Channel::ALL {
                let row = channel.row();
                let line = cursor.next().ok_or(TrajectoryError::Parse {
                    frame,
                    row,
                    kind: ParseErrorKind::TruncatedFrame,
                })?;
                if is_frame_marker(line) {
                    return Err(TrajectoryError::Parse {
                        frame,
                        row,
                        kind: ParseErrorKind::TruncatedFrame,
                    });
                }
                let values = parse_row(line, frame, row)?;
                if values.len() % n != 0 || values.is_empty() {
                    return Err(TrajectoryError::Parse {
                        frame,
                        row,
                        kind: ParseErrorKind::UnevenRow {
                            fields: values.len(),
                            num_elements: n,
                        },
                    });
                }
                let width = values.len() / n;
                let array = arrays[channel.index()]
                    .get_or_insert_with(|| NodeArray::with_capacity(n, width, frame_count));
                if array.width() != width {
                    return Err(TrajectoryError::Parse {
                        frame,
                        row,
                        kind: ParseErrorKind::WidthMismatch {
                            expected: array.width(),
                            found: width,
                        },
                    });
                }
                array
                    .push_frame(&values)
                    .map_err(|e| TrajectoryError::Inconsistency(e.to_string()))?;
            }
            frame += 1;
        }

        let mut channels = Vec::with_capacity(Channel::COUNT);
        for (channel, array) in Channel::ALL.iter().zip(arrays) {
            channels.push(array.ok_or_else(|| TrajectoryError::MissingRecord(channel.name().into()))?);
        }
        let channels: [NodeArray; Channel::COUNT] = channels
            .try_into()
            .map_err(|_| TrajectoryError::Inconsistency("Channel count mismatch".into()))?;
        let trajectory = RodTrajectory::from_channels(header.rod_id, header.num_rods, channels)
            .map_err(|e| TrajectoryError::Inconsistency(e.to_string()))?;

        Ok((trajectory, header.metadata))
    }

    fn write_to(
        trajectory: &RodTrajectory,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "format,{}", metadata.format)?;
        writeln!(writer, "version,{}", metadata.version)?;
        writeln!(writer, "HEADER,ROD,{}", trajectory.rod_id())?;
        writeln!(writer, "num_elements,{}", trajectory.num_elements())?;
        writeln!(writer, "length,{}", trajectory.length())?;
        writeln!(writer, "num_rods,{}", trajectory.num_rods())?;
        for channel in Channel::ALL {
            writeln!(writer, "row{},{}", channel.row(), channel.name())?;
        }
        writeln!(writer, "{}", CONNECTIONS_MARKER)?;
        for line in &metadata.connections {
            writeln!(writer, "{}", line)?;
        }
        writeln!(writer, "{}", END_OF_HEADER)?;

        for frame in 0..trajectory.num_frames() {
            writeln!(writer, "FRAME {} ROD {}", frame, trajectory.rod_id())?;
            for channel in Channel::ALL {
                let values = trajectory.channel(channel).frame(frame);
                let mut first = true;
                for value in values {
                    if !first {
                        write!(writer, ",")?;
                    }
                    write!(writer, "{:e}", value)?;
                    first = false;
                }
                writeln!(writer)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    fn header(num_elements: usize) -> String {
        let mut s = format!(
            "format,ffea_rod\nversion,1.3\nHEADER,ROD,7\nnum_elements,{}\nlength,{}\nnum_rods,2\n",
            num_elements,
            3 * num_elements
        );
        for channel in Channel::ALL {
            s.push_str(&format!("row{},{}\n", channel.row(), channel.name()));
        }
        s.push_str("CONNECTIONS,ROD,0\n[rodelement], [blobno], [blobelement]\n---END HEADER---\n");
        s
    }

    fn frame_block(index: usize, num_elements: usize, fill: f64) -> String {
        let mut s = format!("FRAME {} ROD 7\n", index);
        for channel in Channel::ALL {
            let width = channel.default_width();
            let row: Vec<String> = (0..num_elements * width)
                .map(|i| format!("{}", fill + i as f64 * 0.5))
                .collect();
            s.push_str(&row.join(","));
            s.push('\n');
        }
        s
    }

    fn sample_rod() -> RodTrajectory {
        let mut rod = RodTrajectory::zeroed(3, 1).unwrap();
        rod.set_rod_id(4);
        for (i, channel) in Channel::ALL.iter().enumerate() {
            for node in 0..3 {
                let width = rod.channel(*channel).width();
                let values: Vec<f64> = (0..width)
                    .map(|c| (i as f64 + 1.0) * 0.1 + node as f64 / 3.0 - c as f64 * 1e-7)
                    .collect();
                rod.set_node(*channel, 0, node, &values).unwrap();
            }
        }
        rod
    }

    #[test]
    fn reads_header_and_frames() {
        let text = header(2) + &frame_block(0, 2, 0.0) + &frame_block(1, 2, 10.0);
        let (rod, metadata) = RodTrajFile::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(rod.rod_id(), 7);
        assert_eq!(rod.num_rods(), 2);
        assert_eq!(rod.num_elements(), 2);
        assert_eq!(rod.num_frames(), 2);
        assert_eq!(rod.b_matrix().width(), 4);
        assert_eq!(rod.channel(Channel::NumNeighbours).width(), 1);
        assert_eq!(rod.current_r().node(1, 1), &[11.5, 12.0, 12.5]);
        assert_eq!(metadata.version, "1.3");
        assert_eq!(metadata.connections, vec![DEFAULT_CONNECTIONS.to_string()]);
    }

    #[test]
    fn infers_non_default_row_widths() {
        let mut text = header(2);
        text.push_str("FRAME 0 ROD 7\n");
        for channel in Channel::ALL {
            let width = if channel == Channel::StericEnergy { 1 } else { channel.default_width() };
            let row = vec!["1.0"; 2 * width].join(",");
            text.push_str(&row);
            text.push('\n');
        }
        let (rod, _) = RodTrajFile::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(rod.channel(Channel::StericEnergy).width(), 1);
    }

    #[test]
    fn round_trip_through_file_is_bit_identical() {
        let mut rod = sample_rod();
        rod.set_node(Channel::CurrentR, 0, 2, &[1.0 / 3.0, -0.0, 6.02214076e23]).unwrap();
        let file = NamedTempFile::new().unwrap();
        RodTrajFile::write_trajectory_to_path(&rod, file.path()).unwrap();
        let (read_back, metadata) = RodTrajFile::read_from_path(file.path()).unwrap();
        assert_eq!(read_back, rod);
        assert_eq!(metadata, RodTrajMetadata::default());
    }

    #[test]
    fn written_header_follows_fixed_layout() {
        let rod = sample_rod();
        let mut out = Vec::new();
        RodTrajFile::write_trajectory_to(&rod, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "format,ffea_rod");
        assert_eq!(lines[2], "HEADER,ROD,4");
        assert_eq!(lines[4], "length,9");
        assert_eq!(lines[6], "row1,equil_r");
        assert_eq!(lines[22], "row17,num_neighbours");
        assert_eq!(lines[23], "CONNECTIONS,ROD,0");
        assert_eq!(lines[25], "---END HEADER---");
        assert_eq!(lines[26], "FRAME 0 ROD 4");
        assert_eq!(lines.len(), 26 + 18);
    }

    #[test]
    fn invalid_float_names_frame_and_row() {
        let mut text = header(2) + &frame_block(0, 2, 0.0);
        let second = frame_block(1, 2, 0.0);
        let mut rows: Vec<String> = second.lines().map(str::to_string).collect();
        rows[14] = "1.0,2.0,abc,4.0,5.0,6.0,7.0,8.0".to_string();
        text.push_str(&(rows.join("\n") + "\n"));

        let err = RodTrajFile::read_from(&mut Cursor::new(text)).unwrap_err();
        match err {
            TrajectoryError::Parse { frame, row, kind } => {
                assert_eq!(frame, 1);
                assert_eq!(row, 14);
                assert!(matches!(kind, ParseErrorKind::InvalidFloat { column: 3, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn truncated_frame_is_reported() {
        let block = frame_block(0, 2, 0.0);
        let partial: Vec<&str> = block.lines().take(10).collect();
        let text = header(2) + &partial.join("\n") + "\n";
        let err = RodTrajFile::read_from(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::Parse {
                frame: 0,
                row: 10,
                kind: ParseErrorKind::TruncatedFrame
            }
        ));
    }

    #[test]
    fn width_change_between_frames_is_rejected() {
        let mut text = header(2) + &frame_block(0, 2, 0.0);
        let block = frame_block(1, 2, 0.0);
        let mut rows: Vec<String> = block.lines().map(str::to_string).collect();
        rows[1] = "0,0,0,0".to_string();
        text.push_str(&(rows.join("\n") + "\n"));
        let err = RodTrajFile::read_from(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::Parse {
                frame: 1,
                row: 1,
                kind: ParseErrorKind::WidthMismatch { expected: 3, found: 2 }
            }
        ));
    }

    #[test]
    fn uneven_row_is_rejected() {
        let block = frame_block(0, 2, 0.0);
        let mut rows: Vec<String> = block.lines().map(str::to_string).collect();
        rows[3] = "0,0,0,0,0".to_string();
        let text = header(2) + &rows.join("\n") + "\n";
        let err = RodTrajFile::read_from(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::Parse {
                row: 3,
                kind: ParseErrorKind::UnevenRow { fields: 5, num_elements: 2 },
                ..
            }
        ));
    }

    #[test]
    fn missing_header_terminator_is_a_missing_record() {
        let text = "format,ffea_rod\nnum_elements,2\n";
        let err = RodTrajFile::read_from(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(err, TrajectoryError::MissingRecord(ref r) if r == END_OF_HEADER));
    }

    #[test]
    fn file_without_frames_is_a_missing_record() {
        let err = RodTrajFile::read_from(&mut Cursor::new(header(2))).unwrap_err();
        assert!(matches!(err, TrajectoryError::MissingRecord(ref r) if r == "FRAME"));
    }

    #[test]
    fn inconsistent_length_is_rejected() {
        let text = header(2).replace("length,6", "length,9") + &frame_block(0, 2, 0.0);
        let err = RodTrajFile::read_from(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(err, TrajectoryError::Inconsistency(_)));
    }

    #[test]
    fn zero_element_header_is_rejected() {
        let mut frame = String::from("FRAME 0 ROD 7\n");
        for _ in Channel::ALL {
            frame.push_str("1.0,2.0,3.0\n");
        }
        let text = header(0) + &frame;
        let err = RodTrajFile::read_from(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(err, TrajectoryError::Inconsistency(_)));
    }

    #[test]
    fn misnamed_row_declaration_is_rejected() {
        let text = header(2).replace("row14,B_matrix", "row14,b_matrix") + &frame_block(0, 2, 0.0);
        let err = RodTrajFile::read_from(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::Header {
                kind: ParseErrorKind::UnexpectedRowName { row: 14, .. },
                ..
            }
        ));
    }

    #[test]
    fn malformed_frame_marker_is_rejected() {
        let text = header(2) + &frame_block(0, 2, 0.0).replace("FRAME 0 ROD 7", "FRAME zero ROD 7");
        let err = RodTrajFile::read_from(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::Parse {
                row: 0,
                kind: ParseErrorKind::MalformedFrameMarker { .. },
                ..
            }
        ));
    }
}
