//! whistle_gen.rs: produces the whistle reports a team's robots would send
//!
//! A report is the true whistle location (fixed or drawn per message) plus Gaussian
//! localization noise on both axes. The same-field decision is taken from the true
//! location unless it is forced to "other field".

use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError};
use whistle_types::spl_message::SPL_STANDARD_MESSAGE_STRUCT_VERSION;
use whistle_types::{is_on_field, SplStandardMessage, Vector2D, WhistleReport};

/// Random whistles are drawn from this area, which reaches onto the neighboring field
const DRAW_HALF_LENGTH: f32 = 8.0;
const DRAW_HALF_WIDTH: f32 = 5.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WhistleSource {
    Fixed(Vector2D),
    Random,
}

pub struct WhistleGenerator {
    source: WhistleSource,
    force_other_field: bool,
    noise: Normal<f32>,
}

impl WhistleGenerator {
    pub fn new(
        source: WhistleSource,
        force_other_field: bool,
        noise_sigma_m: f32,
    ) -> Result<Self, NormalError> {
        if noise_sigma_m.is_nan() || noise_sigma_m < 0.0 {
            return Err(NormalError::BadVariance);
        }
        Ok(Self {
            source,
            force_other_field,
            noise: Normal::new(0.0, noise_sigma_m)?,
        })
    }

    /// Returns the true whistle location and the noisy report for it.
    pub fn next_report<R: Rng + ?Sized>(&self, rng: &mut R) -> (Vector2D, WhistleReport) {
        let actual = match self.source {
            WhistleSource::Fixed(location) => location,
            WhistleSource::Random => Vector2D::new(
                rng.gen_range(-DRAW_HALF_LENGTH..=DRAW_HALF_LENGTH),
                rng.gen_range(-DRAW_HALF_WIDTH..=DRAW_HALF_WIDTH),
            ),
        };
        let report = WhistleReport {
            on_same_field: is_on_field(actual) && !self.force_other_field,
            location: actual + Vector2D::new(self.noise.sample(rng), self.noise.sample(rng)),
        };
        (actual, report)
    }
}

/// Every `foreign_every`-th message (1-based) goes out as regular gameplay traffic.
pub fn is_foreign(sequence: u64, foreign_every: u64) -> bool {
    foreign_every > 0 && sequence % foreign_every == 0
}

pub fn build_message(
    player_num: u8,
    team_num: u8,
    report: &WhistleReport,
    foreign: bool,
) -> SplStandardMessage {
    let mut message = SplStandardMessage::whistle_report(player_num, team_num, report);
    if foreign {
        message.version = SPL_STANDARD_MESSAGE_STRUCT_VERSION;
    }
    message
}
