//! Animation sequences and their expansion into a flat frame list.
//!
//! BVM files group frames into named sequences. Geometry is stored per
//! submesh, one block per frame in sequence order, so everything downstream
//! addresses frames by a single linear index produced by [`flatten`].

use crate::data::cursor::BinCursor;
use crate::error::ErrorKind;

/// Name of the single frame produced when a model has no sequences.
pub const STATIC_POSE: &str = "staticpose";

/// Playback rate of the synthesized static pose sequence.
const STATIC_POSE_RATE: i32 = 10;

/// Width of the sequence name field.
pub const SEQUENCE_NAME_LEN: usize = 64;

/// Upper bound on the frames reserved up front by [`flatten`].
const MAX_RESERVED_FRAMES: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub name: String,
    pub frames: usize,
    pub rate: i32,
    /// Multiplier applied on top of the model scale. Always > 0.
    pub scale: f32,
    synthesized: bool,
}

impl Sequence {
    pub fn new(name: impl Into<String>, frames: usize, rate: i32, scale: f32) -> Self {
        Self {
            name: name.into(),
            frames,
            rate,
            scale: normalize_scale(scale),
            synthesized: false,
        }
    }

    /// The implicit one-frame sequence used when a file declares none.
    pub fn static_pose() -> Self {
        Self {
            name: STATIC_POSE.to_string(),
            frames: 1,
            rate: STATIC_POSE_RATE,
            scale: 1.0,
            synthesized: true,
        }
    }

    pub fn is_static_pose(&self) -> bool {
        self.synthesized
    }

    /// Reads one 76-byte sequence record: name, frame count, rate, scale.
    pub(crate) fn read(cursor: &mut BinCursor<'_>) -> Result<Sequence, ErrorKind> {
        let name = cursor.read_fixed_string(SEQUENCE_NAME_LEN)?;
        let frames = cursor.read_size("sequence frame count")?;
        let rate = cursor.read_i32()?;
        let scale = cursor.read_f32()?;
        Ok(Sequence::new(name, frames, rate, scale))
    }
}

/// Non-positive (and NaN) scales mean "unscaled".
fn normalize_scale(scale: f32) -> f32 {
    if scale > 0.0 { scale } else { 1.0 }
}

/// Reads `count` sequence records, or synthesizes the static pose when `count` is zero.
pub(crate) fn read_sequences(
    cursor: &mut BinCursor<'_>,
    count: usize,
) -> Result<Vec<Sequence>, ErrorKind> {
    if count == 0 {
        return Ok(vec![Sequence::static_pose()]);
    }
    let mut sequences = Vec::with_capacity(count.min(cursor.remaining()));
    for _ in 0..count {
        sequences.push(Sequence::read(cursor)?);
    }
    Ok(sequences)
}

/// Number of flat frames `sequences` expand to.
pub fn frame_total(sequences: &[Sequence]) -> usize {
    sequences
        .iter()
        .fold(0usize, |total, s| total.saturating_add(s.frames))
}

/// One concrete frame, addressed linearly across all sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatFrame {
    /// Index of the owning sequence.
    pub sequence: usize,
    /// Index of the frame within its sequence.
    pub index: usize,
    pub name: String,
}

/// Expands sequences into the flat frame list, in storage order.
///
/// Frames are named `{sequence}_{index:03}`. An empty list, or the synthesized
/// static pose, yields a single frame named [`STATIC_POSE`].
pub fn flatten(sequences: &[Sequence]) -> Vec<FlatFrame> {
    if sequences.is_empty() {
        return vec![FlatFrame {
            sequence: 0,
            index: 0,
            name: STATIC_POSE.to_string(),
        }];
    }

    let mut frames = Vec::with_capacity(frame_total(sequences).min(MAX_RESERVED_FRAMES));
    for (s, sequence) in sequences.iter().enumerate() {
        if sequence.is_static_pose() {
            frames.push(FlatFrame {
                sequence: s,
                index: 0,
                name: STATIC_POSE.to_string(),
            });
            continue;
        }
        for f in 0..sequence.frames {
            frames.push(FlatFrame {
                sequence: s,
                index: f,
                name: format!("{}_{:03}", sequence.name, f),
            });
        }
    }
    frames
}

/// Scale multiplier for a flat frame's owning sequence.
pub(crate) fn frame_scale(sequences: &[Sequence], frame: &FlatFrame) -> f32 {
    sequences.get(frame.sequence).map_or(1.0, |s| s.scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_frames_per_sequence() {
        let sequences = vec![Sequence::new("idle", 2, 10, 1.0), Sequence::new("run", 3, 15, 1.0)];
        let frames = flatten(&sequences);
        let names: Vec<_> = frames.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["idle_000", "idle_001", "run_000", "run_001", "run_002"]);
        assert_eq!(frames[3].sequence, 1);
        assert_eq!(frames[3].index, 1);
    }

    #[test]
    fn total_matches_frame_sum() {
        let sequences = vec![
            Sequence::new("a", 4, 10, 1.0),
            Sequence::new("b", 0, 10, 1.0),
            Sequence::new("c", 7, 10, 1.0),
        ];
        assert_eq!(flatten(&sequences).len(), 11);
    }

    #[test]
    fn frame_total_saturates() {
        let sequences = vec![
            Sequence::new("a", usize::MAX, 10, 1.0),
            Sequence::new("b", 3, 10, 1.0),
        ];
        assert_eq!(frame_total(&sequences), usize::MAX);
        assert_eq!(frame_total(&[]), 0);
    }

    #[test]
    fn negative_frame_count_is_rejected() {
        let mut data = vec![0u8; SEQUENCE_NAME_LEN];
        data.extend_from_slice(&(-3i32).to_le_bytes());
        data.extend_from_slice(&10i32.to_le_bytes());
        data.extend_from_slice(&1.0f32.to_le_bytes());
        let err = read_sequences(&mut BinCursor::new(&data), 1).unwrap_err();
        assert_eq!(
            err,
            ErrorKind::NegativeValue {
                field: "sequence frame count",
                value: -3
            }
        );
    }

    #[test]
    fn index_is_zero_padded_to_three_digits() {
        let frames = flatten(&[Sequence::new("walk", 101, 10, 1.0)]);
        assert_eq!(frames[9].name, "walk_009");
        assert_eq!(frames[100].name, "walk_100");
    }

    #[test]
    fn no_sequences_is_static_pose() {
        let frames = flatten(&[]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].name, STATIC_POSE);

        let frames = flatten(&[Sequence::static_pose()]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].name, STATIC_POSE);
    }

    #[test]
    fn non_positive_scale_normalizes() {
        assert_eq!(Sequence::new("a", 1, 10, 0.0).scale, 1.0);
        assert_eq!(Sequence::new("a", 1, 10, -2.5).scale, 1.0);
        assert_eq!(Sequence::new("a", 1, 10, 0.5).scale, 0.5);
    }

    #[test]
    fn reads_sequence_record() {
        let mut data = Vec::new();
        let mut name = [0u8; SEQUENCE_NAME_LEN];
        name[..4].copy_from_slice(b"fire");
        data.extend_from_slice(&name);
        data.extend_from_slice(&6i32.to_le_bytes());
        data.extend_from_slice(&24i32.to_le_bytes());
        data.extend_from_slice(&(-1.0f32).to_le_bytes());

        let mut cursor = BinCursor::new(&data);
        let sequences = read_sequences(&mut cursor, 1).unwrap();
        assert_eq!(sequences, vec![Sequence::new("fire", 6, 24, 1.0)]);
        assert_eq!(cursor.remaining(), 0);
    }
}
