//! # metric
//!
//! Scoring of a single attempt. Pure functions, no state.
//!
//! The score is the sum of three components, each in [0, 1]:
//!   1. same-field decision: was the whistle on the robots' own field or not
//!   2. direction: bearing error seen from the reference robot
//!   3. distance: relative range error seen from the reference robot
//!
//! The reference robot is the one standing closest to the actual whistle location.
//! Direction and distance errors earn full credit up to 5 (degrees / percent) and
//! nothing from 30 on, linearly in between.

use std::f32::consts::PI;

use whistle_types::{is_on_field, normalize_angle, Pose2D, Vector2D, WhistleReport};

/// Deviation up to which a component earns full credit
const MIN_DEVIATION: f32 = 5.0;
/// Deviation from which a component earns nothing
const MAX_DEVIATION: f32 = 30.0;

/// The three score components of one attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub field_decision: f32,
    pub direction: f32,
    pub distance: f32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f32 {
        self.field_decision + self.direction + self.distance
    }
}

/// Overall score for a single attempt, in [0, 3].
///
/// # Panics
/// If `robot_setup` is empty.
pub fn calculate_score(
    robot_setup: &[Pose2D],
    actual_location: Vector2D,
    whistle: &WhistleReport,
) -> f32 {
    score_breakdown(robot_setup, actual_location, whistle).total()
}

pub fn score_breakdown(
    robot_setup: &[Pose2D],
    actual_location: Vector2D,
    whistle: &WhistleReport,
) -> ScoreBreakdown {
    let reference = reference_pose(robot_setup, actual_location);
    ScoreBreakdown {
        field_decision: field_decision_score(actual_location, whistle),
        direction: direction_score(reference, actual_location, whistle),
        distance: distance_score(reference, actual_location, whistle),
    }
}

/// The pose closest to the whistle. Ties go to the earlier robot.
fn reference_pose(robot_setup: &[Pose2D], actual_location: Vector2D) -> &Pose2D {
    robot_setup
        .iter()
        .min_by(|a, b| {
            let da = (a.translation - actual_location).squared_norm();
            let db = (b.translation - actual_location).squared_norm();
            da.total_cmp(&db)
        })
        .expect("robot setup must contain at least one pose")
}

fn field_decision_score(actual_location: Vector2D, whistle: &WhistleReport) -> f32 {
    if is_on_field(actual_location) == whistle.on_same_field {
        1.0
    } else {
        0.0
    }
}

fn direction_score(reference: &Pose2D, actual_location: Vector2D, whistle: &WhistleReport) -> f32 {
    let actual_angle = (actual_location - reference.translation).angle();
    let reported_angle = (whistle.location - reference.translation).angle();
    let deviation_deg = normalize_angle(actual_angle - reported_angle).abs() * 180.0 / PI;
    deviation_score(deviation_deg)
}

/// A whistle blown exactly at the reference robot has no meaningful relative error:
/// only an equally degenerate report earns the point.
fn distance_score(reference: &Pose2D, actual_location: Vector2D, whistle: &WhistleReport) -> f32 {
    let actual_distance = (actual_location - reference.translation).norm();
    let reported_distance = (whistle.location - reference.translation).norm();
    if actual_distance <= 0.0 {
        return if reported_distance <= 0.0 { 1.0 } else { 0.0 };
    }
    let deviation_pct = (reported_distance - actual_distance).abs() / actual_distance * 100.0;
    deviation_score(deviation_pct)
}

/// Non-finite deviations earn nothing.
fn deviation_score(deviation: f32) -> f32 {
    if !deviation.is_finite() {
        return 0.0;
    }
    1.0 - ((deviation - MIN_DEVIATION) / (MAX_DEVIATION - MIN_DEVIATION)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn origin_setup() -> Vec<Pose2D> {
        vec![Pose2D::new(0.0, 0.0, 0.0)]
    }

    fn report_at(x: f32, y: f32, on_same_field: bool) -> WhistleReport {
        WhistleReport {
            on_same_field,
            location: Vector2D::new(x, y),
        }
    }

    fn report_at_bearing(distance: f32, bearing_deg: f32) -> WhistleReport {
        WhistleReport {
            on_same_field: false,
            location: Vector2D::polar(distance, bearing_deg.to_radians()),
        }
    }

    #[test]
    fn field_decision_boundary() {
        let setup = origin_setup();
        let inside = score_breakdown(&setup, Vector2D::new(5.19, 0.0), &report_at(5.19, 0.0, true));
        assert_eq!(inside.field_decision, 1.0);

        let outside = score_breakdown(&setup, Vector2D::new(5.21, 0.0), &report_at(5.21, 0.0, true));
        assert_eq!(outside.field_decision, 0.0);

        let outside_other =
            score_breakdown(&setup, Vector2D::new(0.0, 3.7), &report_at(0.0, 3.7, false));
        assert_eq!(outside_other.field_decision, 1.0);
    }

    #[test]
    fn direction_score_endpoints() {
        let setup = origin_setup();
        let actual = Vector2D::new(10.0, 0.0);

        let exact = score_breakdown(&setup, actual, &report_at(10.0, 0.0, false));
        assert_abs_diff_eq!(exact.direction, 1.0, epsilon = 1e-6);

        let within_band = score_breakdown(&setup, actual, &report_at_bearing(10.0, 4.0));
        assert_abs_diff_eq!(within_band.direction, 1.0, epsilon = 1e-6);

        let off_30 = score_breakdown(&setup, actual, &report_at_bearing(10.0, 30.0));
        assert_abs_diff_eq!(off_30.direction, 0.0, epsilon = 1e-4);

        let midpoint = score_breakdown(&setup, actual, &report_at_bearing(10.0, 17.5));
        assert_abs_diff_eq!(midpoint.direction, 0.5, epsilon = 1e-4);

        let opposite = score_breakdown(&setup, actual, &report_at_bearing(10.0, -150.0));
        assert_eq!(opposite.direction, 0.0);
    }

    #[test]
    fn direction_deviation_wraps_around_pi() {
        let setup = origin_setup();
        // 178° vs -178° are 4° apart
        let actual = Vector2D::polar(10.0, 178f32.to_radians());
        let score = score_breakdown(&setup, actual, &report_at_bearing(10.0, -178.0));
        assert_abs_diff_eq!(score.direction, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn distance_score_endpoints() {
        let setup = origin_setup();
        let actual = Vector2D::new(10.0, 0.0);

        let close = score_breakdown(&setup, actual, &report_at(10.4, 0.0, false));
        assert_abs_diff_eq!(close.distance, 1.0, epsilon = 1e-6);

        let short = score_breakdown(&setup, actual, &report_at(9.6, 0.0, false));
        assert_abs_diff_eq!(short.distance, 1.0, epsilon = 1e-6);

        let off_30 = score_breakdown(&setup, actual, &report_at(13.0, 0.0, false));
        assert_abs_diff_eq!(off_30.distance, 0.0, epsilon = 1e-4);

        let off_40 = score_breakdown(&setup, actual, &report_at(6.0, 0.0, false));
        assert_eq!(off_40.distance, 0.0);

        let midpoint = score_breakdown(&setup, actual, &report_at(11.75, 0.0, false));
        assert_abs_diff_eq!(midpoint.distance, 0.5, epsilon = 1e-4);
    }

    #[test]
    fn reference_pose_is_closest_robot() {
        let setup = vec![
            Pose2D::new(0.0, -4.0, 0.0),
            Pose2D::new(0.0, 4.0, 0.0),
        ];
        let score = score_breakdown(&setup, Vector2D::new(6.0, 0.0), &report_at(6.0, 0.0, false));
        assert_abs_diff_eq!(score.distance, 1.0, epsilon = 1e-6);

        // 100% too far from (4, 0), only 20% from (-4, 0)
        let score = score_breakdown(&setup, Vector2D::new(6.0, 0.0), &report_at(8.0, 0.0, false));
        assert_eq!(score.distance, 0.0);
    }

    #[test]
    fn reference_pose_ties_go_to_first_robot() {
        let setup = vec![
            Pose2D::new(0.0, 0.0, 2.0),
            Pose2D::new(0.0, 0.0, -2.0),
        ];
        let actual = Vector2D::new(2.0, 0.0);
        // Same bearing as seen from the first robot, 45° off as seen from the second
        let score = score_breakdown(&setup, actual, &report_at(4.0, -2.0, false));
        assert_abs_diff_eq!(score.direction, 1.0, epsilon = 1e-6);
        assert_eq!(score.distance, 0.0);
    }

    #[test]
    fn whistle_at_reference_robot_has_defined_distance_score() {
        let setup = vec![Pose2D::new(0.0, 1.0, 1.0)];
        let actual = Vector2D::new(1.0, 1.0);

        let exact = score_breakdown(&setup, actual, &report_at(1.0, 1.0, true));
        assert_eq!(exact.distance, 1.0);

        let off = score_breakdown(&setup, actual, &report_at(2.0, 1.0, true));
        assert_eq!(off.distance, 0.0);
        assert!(calculate_score(&setup, actual, &report_at(2.0, 1.0, true)).is_finite());
    }

    #[test]
    fn perfect_report_scores_three() {
        let setup = vec![Pose2D::new(0.0, -3.0, 1.0), Pose2D::new(0.5, 2.0, -2.0)];
        let actual = Vector2D::new(-1.0, 2.5);
        let score = calculate_score(&setup, actual, &report_at(-1.0, 2.5, true));
        assert_abs_diff_eq!(score, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn score_stays_within_bounds() {
        let setup = vec![
            Pose2D::new(0.0, -4.5, 0.0),
            Pose2D::new(1.0, 0.0, 2.0),
            Pose2D::new(-2.0, 3.0, -1.5),
        ];
        let locations = [
            Vector2D::new(0.0, 0.0),
            Vector2D::new(6.0, 4.0),
            Vector2D::new(-7.5, -1.0),
            Vector2D::new(3.0, 2.0),
        ];
        let reports = [
            report_at(0.0, 0.0, true),
            report_at(-100.0, 50.0, false),
            report_at(3.0, 2.0, true),
            report_at(1e6, -1e6, false),
        ];
        for actual in locations {
            for report in &reports {
                let score = calculate_score(&setup, actual, report);
                assert!((0.0..=3.0).contains(&score), "score {score} out of bounds");
            }
        }
    }

    #[test]
    fn non_finite_report_scores_within_bounds() {
        let setup = origin_setup();
        let actual = Vector2D::new(3.0, 1.0);
        for location in [
            Vector2D::new(f32::NAN, 0.0),
            Vector2D::new(1.0, f32::INFINITY),
            Vector2D::new(f32::NEG_INFINITY, f32::NAN),
        ] {
            let report = WhistleReport {
                on_same_field: true,
                location,
            };
            let breakdown = score_breakdown(&setup, actual, &report);
            assert_eq!(breakdown.direction, 0.0);
            assert_eq!(breakdown.distance, 0.0);
            assert_eq!(breakdown.total(), 1.0);
        }
        assert_eq!(deviation_score(f32::NAN), 0.0);
        assert_eq!(deviation_score(f32::INFINITY), 0.0);
    }

    #[test]
    #[should_panic(expected = "at least one pose")]
    fn empty_robot_setup_is_a_precondition_violation() {
        calculate_score(&[], Vector2D::ZERO, &report_at(0.0, 0.0, true));
    }
}
