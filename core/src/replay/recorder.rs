//! `ReplayRecorder` (§4.H): accumulates per-frame snapshots while recording,
//! and drives frame-accurate, speed-controlled playback over a loaded
//! sequence of them.

use std::collections::HashMap;
use std::io::{Read, Write};

use super::container::{read_container, write_container};
use super::snapshot::FrameSnapshot;
use super::{DivergenceReport, FloatFieldRegistry, ReplayError};

/// §4.H "Controls": the four playback rates a host can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackSpeed {
    Paused,
    Quarter,
    Normal,
    Quadruple,
}

impl PlaybackSpeed {
    fn frames_per_advance(self) -> usize {
        match self {
            PlaybackSpeed::Paused => 0,
            PlaybackSpeed::Quarter => 1,
            PlaybackSpeed::Normal => 1,
            PlaybackSpeed::Quadruple => 4,
        }
    }
}

enum Mode {
    Recording { frames: Vec<FrameSnapshot> },
    Playback {
        frames: Vec<FrameSnapshot>,
        cursor: usize,
        speed: PlaybackSpeed,
        step_pending: bool,
        /// Quarter-speed advances one frame every four calls to `advance`.
        quarter_accum: u8,
    },
}

pub struct ReplayRecorder {
    mode: Mode,
}

impl ReplayRecorder {
    pub fn new_recording() -> Self {
        Self {
            mode: Mode::Recording { frames: Vec::new() },
        }
    }

    pub fn from_frames(frames: Vec<FrameSnapshot>) -> Self {
        Self {
            mode: Mode::Playback {
                frames,
                cursor: 0,
                speed: PlaybackSpeed::Normal,
                step_pending: false,
                quarter_accum: 0,
            },
        }
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, ReplayError> {
        Ok(Self::from_frames(read_container(reader)?))
    }

    /// Push a frame into the recording buffer. No-op in playback mode.
    pub fn record_frame(&mut self, snapshot: FrameSnapshot) {
        if let Mode::Recording { frames } = &mut self.mode {
            frames.push(snapshot);
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.mode, Mode::Recording { .. })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), ReplayError> {
        let frames = match &self.mode {
            Mode::Recording { frames } => frames,
            Mode::Playback { frames, .. } => frames,
        };
        write_container(writer, frames)
    }

    pub fn pause(&mut self) {
        if let Mode::Playback { speed, .. } = &mut self.mode {
            *speed = PlaybackSpeed::Paused;
        }
    }

    pub fn set_speed(&mut self, new_speed: PlaybackSpeed) {
        if let Mode::Playback { speed, quarter_accum, .. } = &mut self.mode {
            *speed = new_speed;
            *quarter_accum = 0;
        }
    }

    pub fn speed(&self) -> Option<PlaybackSpeed> {
        match &self.mode {
            Mode::Playback { speed, .. } => Some(*speed),
            Mode::Recording { .. } => None,
        }
    }

    /// Advance a single frame while paused, regardless of the current speed.
    pub fn step(&mut self) {
        if let Mode::Playback { step_pending, .. } = &mut self.mode {
            *step_pending = true;
        }
    }

    pub fn current_frame(&self) -> Option<&FrameSnapshot> {
        match &self.mode {
            Mode::Playback { frames, cursor, .. } => frames.get(*cursor),
            Mode::Recording { .. } => None,
        }
    }

    /// Advance playback by whatever the current speed dictates and return
    /// the snapshot landed on, or `None` if paused with no pending step or
    /// the sequence is exhausted.
    pub fn advance(&mut self) -> Option<&FrameSnapshot> {
        let Mode::Playback {
            frames,
            cursor,
            speed,
            step_pending,
            quarter_accum,
        } = &mut self.mode
        else {
            return None;
        };

        let step_count = match *speed {
            PlaybackSpeed::Paused => {
                if std::mem::take(step_pending) {
                    1
                } else {
                    0
                }
            }
            PlaybackSpeed::Quarter => {
                *quarter_accum = (*quarter_accum + 1) % 4;
                if *quarter_accum == 0 {
                    1
                } else {
                    0
                }
            }
            other => other.frames_per_advance(),
        };

        if step_count == 0 {
            return frames.get(*cursor);
        }

        *cursor = (*cursor + step_count).min(frames.len().saturating_sub(1));
        frames.get(*cursor)
    }

    /// Restore the nearest snapshot at or before `frame_number`. The caller
    /// re-plays forward from there (re-injecting recorded inputs) to reach
    /// the exact target frame.
    pub fn seek(&mut self, frame_number: u64) -> Option<&FrameSnapshot> {
        let Mode::Playback { frames, cursor, .. } = &mut self.mode else {
            return None;
        };
        let idx = frames.partition_point(|f| f.frame_number <= frame_number);
        if idx == 0 {
            return None;
        }
        *cursor = idx - 1;
        frames.get(*cursor)
    }

    /// Diff a re-simulated frame's components against the corresponding
    /// recorded frame (§4.H.1). Entities or components absent from either
    /// side are skipped rather than reported.
    pub fn compare_frame(
        floats: &dyn FloatFieldRegistry,
        recorded: &FrameSnapshot,
        resimulated: &FrameSnapshot,
    ) -> Vec<DivergenceReport> {
        let mut recorded_components: HashMap<(u64, u32), &[u8]> = HashMap::new();
        for entity in &recorded.entities {
            for component in &entity.components {
                recorded_components.insert((entity.id, component.type_tag), &component.bytes);
            }
        }

        let mut reports = Vec::new();
        for entity in &resimulated.entities {
            for component in &entity.components {
                let Some(reference) = recorded_components.get(&(entity.id, component.type_tag)) else {
                    continue;
                };
                let ranges = floats.float_ranges(component.type_tag);
                if let Some(offset) = first_mismatch(reference, &component.bytes, ranges) {
                    reports.push(DivergenceReport {
                        id: entity.id,
                        type_tag: component.type_tag,
                        byte_offset: offset,
                    });
                }
            }
        }
        reports
    }
}

fn first_mismatch(expected: &[u8], actual: &[u8], float_ranges: &[(usize, usize)]) -> Option<usize> {
    if expected.len() != actual.len() {
        return Some(expected.len().min(actual.len()));
    }

    let mut index = 0;
    while index < expected.len() {
        if let Some(&(start, end)) = float_ranges.iter().find(|(s, _)| *s == index) {
            let end = end.min(expected.len());
            if !floats_within_tolerance(&expected[start..end], &actual[start..end]) {
                return Some(start);
            }
            index = end;
            continue;
        }
        if expected[index] != actual[index] {
            return Some(index);
        }
        index += 1;
    }
    None
}

fn floats_within_tolerance(expected: &[u8], actual: &[u8]) -> bool {
    const RELATIVE_TOLERANCE: f64 = 1e-3;
    let (a, b) = match expected.len() {
        4 => (
            f32::from_le_bytes(expected.try_into().unwrap()) as f64,
            f32::from_le_bytes(actual.try_into().unwrap()) as f64,
        ),
        8 => (
            f64::from_le_bytes(expected.try_into().unwrap()),
            f64::from_le_bytes(actual.try_into().unwrap()),
        ),
        _ => return expected == actual,
    };
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= RELATIVE_TOLERANCE * scale
}
