//! # spl_message
//!
//! SPL standard message (version 7 layout) as received from robot teams, and the
//! validation pipeline that turns one untrusted datagram into a [`WhistleReport`].
//!
//! The tester repurposes two fields of the gameplay message:
//! - `fallen` carries the "whistle on same field" decision (nonzero = same field)
//! - `pose[0..2]` carries the whistle location in millimeters
//!
//! Messages meant for the tester use the reserved version number 255 so that regular
//! gameplay consumers ignore them, and the tester ignores everything else.
//!
//! The layout is bit-exact with the C struct and uses the native byte order of the host.

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::{Vector2D, WhistleReport};

// ── Layout Constants ──────────────────────────────────────────────────────────

pub const SPL_STANDARD_MESSAGE_STRUCT_HEADER: [u8; 4] = *b"SPL ";
/// Version used by regular gameplay messages
pub const SPL_STANDARD_MESSAGE_STRUCT_VERSION: u8 = 7;
/// Reserved version marking messages addressed to the whistle tester
pub const TESTER_MESSAGE_VERSION: u8 = 255;
pub const SPL_STANDARD_MESSAGE_DATA_SIZE: usize = 474;

pub const SPL_STANDARD_MESSAGE_DATA_OFFSET: usize = offset_of!(SplStandardMessage, data);
pub const SPL_STANDARD_MESSAGE_SIZE: usize = size_of::<SplStandardMessage>();

pub const MIN_PLAYER_NUMBER: u8 = 1;
pub const MAX_PLAYER_NUMBER: u8 = 5;

const _: () = assert!(SPL_STANDARD_MESSAGE_DATA_OFFSET == 34);
const _: () = assert!(SPL_STANDARD_MESSAGE_SIZE == 508);

// ── Wire Struct ───────────────────────────────────────────────────────────────

/// 508 bytes on wire. Matches `SPLStandardMessage` from the GameController headers.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct SplStandardMessage {
    /// Always "SPL "
    pub header: [u8; 4],
    pub version: u8,
    /// 1..=5
    pub player_num: u8,
    pub team_num: u8,
    /// Tester: 1 = whistle on same field, 0 = other field
    pub fallen: u8,
    /// Tester: whistle x, y in millimeters; third component unused
    pub pose: [f32; 3],
    pub ball_age: f32,
    pub ball: [f32; 2],
    /// Number of bytes actually used in `data`
    pub num_of_data_bytes: u16,
    pub data: [u8; SPL_STANDARD_MESSAGE_DATA_SIZE],
}

impl SplStandardMessage {
    /// Builds a message addressed to the tester carrying `report`.
    pub fn whistle_report(player_num: u8, team_num: u8, report: &WhistleReport) -> Self {
        Self {
            header: SPL_STANDARD_MESSAGE_STRUCT_HEADER,
            version: TESTER_MESSAGE_VERSION,
            player_num,
            team_num,
            fallen: u8::from(report.on_same_field),
            pose: [report.location.x * 1000.0, report.location.y * 1000.0, 0.0],
            ball_age: -1.0,
            ..Self::zeroed()
        }
    }

    /// The bytes a robot puts on the wire: the fixed part plus the used data bytes.
    pub fn datagram(&self) -> &[u8] {
        let used = SPL_STANDARD_MESSAGE_DATA_OFFSET
            + usize::from(self.num_of_data_bytes).min(SPL_STANDARD_MESSAGE_DATA_SIZE);
        &bytemuck::bytes_of(self)[..used]
    }

    /// Copies a received datagram into a zeroed message. Bytes past the end of a
    /// short datagram stay zero.
    fn from_datagram(datagram: &[u8]) -> Self {
        let mut message = Self::zeroed();
        let len = datagram.len().min(SPL_STANDARD_MESSAGE_SIZE);
        bytemuck::bytes_of_mut(&mut message)[..len].copy_from_slice(&datagram[..len]);
        message
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

/// Why a datagram did not produce a whistle report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MessageRejection {
    #[error("datagram too short ({len} bytes, need at least 34)")]
    TooShort { len: usize },

    #[error("datagram too long ({len} bytes, at most 508)")]
    TooLong { len: usize },

    #[error("header mismatch ({0:?})")]
    HeaderMismatch([u8; 4]),

    /// Regular gameplay traffic; not an error.
    #[error("message version {0} is not meant for the tester")]
    ForeignVersion(u8),

    #[error("player number must be in [1, 5] (is {0})")]
    InvalidPlayerNumber(u8),

    #[error("team number must be the correct one for this port (should be {expected}, is {actual})")]
    WrongTeam { expected: u8, actual: u8 },

    #[error("illegal number of data bytes (is {declared}, datagram has {len} bytes)")]
    IllegalDataLength { declared: u16, len: usize },

    #[error("whistle location is not a finite number ({x} mm, {y} mm)")]
    NonFiniteLocation { x: f32, y: f32 },
}

impl MessageRejection {
    /// Silent rejections are dropped without logging.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::ForeignVersion(_))
    }
}

/// Runs one datagram through the validation pipeline. Checks short-circuit in order:
/// size, header, version, player number, team number, declared data length, and
/// finally the reported location itself.
pub fn decode_whistle_report(
    datagram: &[u8],
    expected_team: u8,
) -> Result<WhistleReport, MessageRejection> {
    let len = datagram.len();
    if len < SPL_STANDARD_MESSAGE_DATA_OFFSET {
        return Err(MessageRejection::TooShort { len });
    }
    if len > SPL_STANDARD_MESSAGE_SIZE {
        return Err(MessageRejection::TooLong { len });
    }

    let message = SplStandardMessage::from_datagram(datagram);

    if message.header != SPL_STANDARD_MESSAGE_STRUCT_HEADER {
        return Err(MessageRejection::HeaderMismatch(message.header));
    }
    if message.version != TESTER_MESSAGE_VERSION {
        return Err(MessageRejection::ForeignVersion(message.version));
    }
    if !(MIN_PLAYER_NUMBER..=MAX_PLAYER_NUMBER).contains(&message.player_num) {
        return Err(MessageRejection::InvalidPlayerNumber(message.player_num));
    }
    if message.team_num != expected_team {
        return Err(MessageRejection::WrongTeam {
            expected: expected_team,
            actual: message.team_num,
        });
    }
    let declared = message.num_of_data_bytes;
    if usize::from(declared) > SPL_STANDARD_MESSAGE_DATA_SIZE
        || SPL_STANDARD_MESSAGE_DATA_OFFSET + usize::from(declared) > len
    {
        return Err(MessageRejection::IllegalDataLength { declared, len });
    }

    let [x, y, _] = message.pose;
    if !x.is_finite() || !y.is_finite() {
        return Err(MessageRejection::NonFiniteLocation { x, y });
    }

    Ok(WhistleReport {
        on_same_field: message.fallen != 0,
        location: Vector2D::new(message.pose[0] / 1000.0, message.pose[1] / 1000.0),
    })
}
