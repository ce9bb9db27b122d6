//! Waypoint animation of the flying rig.
//!
//! The flight is planned up front: the frame range is cut into fixed-length
//! segments, each segment flies in a straight line toward a freshly drawn
//! random waypoint, and every substep becomes a keyframe. A final pass turns
//! all keys into smooth (auto tangent) keys.
//!
//! ```ignore
//! use bevy_nlos::flight::{plan_flight, FlightConfig};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let track = plan_flight(Vec3::new(0.0, 0.0, 6.0), 1..=1000, &FlightConfig::default(), &mut rng);
//! let pose = track.pose_at(42.0).unwrap();
//! ```

use crate::{DatasetError, Orientation, Pose};
use bevy::prelude::Vec3;
use rand::Rng;
use std::f32::consts::FRAC_PI_2;
use std::ops::RangeInclusive;

/// Axis-aligned box waypoints are drawn from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaypointBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for WaypointBounds {
    fn default() -> Self {
        Self {
            min: Vec3::new(-8.0, -8.0, 3.0),
            max: Vec3::new(8.0, 8.0, 5.0),
        }
    }
}

impl WaypointBounds {
    /// Draw a point uniformly inside the box
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        Vec3::new(
            rng.gen_range(self.min.x..=self.max.x),
            rng.gen_range(self.min.y..=self.max.y),
            rng.gen_range(self.min.z..=self.max.z),
        )
    }

    /// Whether `point` lies inside the box, bounds included
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Flight planning parameters.
#[derive(Clone, Debug)]
pub struct FlightConfig {
    /// Box the waypoints are drawn from
    pub bounds: WaypointBounds,
    /// Frames between consecutive waypoints (default: 20)
    pub waypoint_interval: u32,
    /// Keyframes per segment (default: 20)
    pub substeps: u32,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            bounds: WaypointBounds::default(),
            waypoint_interval: 20,
            substeps: 20,
        }
    }
}

impl FlightConfig {
    /// Reject configurations the planner cannot step through
    pub fn validate(&self) -> Result<(), DatasetError> {
        if self.waypoint_interval == 0 {
            return Err(DatasetError::InvalidConfig(
                "waypoint_interval must be at least 1".to_string(),
            ));
        }
        if self.substeps == 0 {
            return Err(DatasetError::InvalidConfig(
                "substeps must be at least 1".to_string(),
            ));
        }
        if !self.bounds.min.cmple(self.bounds.max).all() {
            return Err(DatasetError::InvalidConfig(format!(
                "waypoint bounds are inverted: min {} max {}",
                self.bounds.min, self.bounds.max
            )));
        }
        Ok(())
    }
}

/// Endless stream of random waypoints, each drawn when it is pulled.
pub struct Waypoints<'a, R: Rng + ?Sized> {
    bounds: WaypointBounds,
    rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> Waypoints<'a, R> {
    pub fn new(bounds: WaypointBounds, rng: &'a mut R) -> Self {
        Self { bounds, rng }
    }
}

impl<R: Rng + ?Sized> Iterator for Waypoints<'_, R> {
    type Item = Vec3;

    fn next(&mut self) -> Option<Vec3> {
        Some(self.bounds.sample(&mut *self.rng))
    }
}

/// `n` evenly spaced points from `start` toward `end`.
///
/// Point `i` sits at `t = i / n`, so the first point is `start` and the last
/// one stops a step short of `end`. The next segment starts there.
pub fn interpolate_segment(start: Vec3, end: Vec3, n: u32) -> Vec<Vec3> {
    (0..n)
        .map(|i| start.lerp(end, i as f32 / n as f32))
        .collect()
}

/// Orientation of a rig flying from `from` to `to`.
///
/// The rig is rolled a quarter turn so its camera looks down, then turned to
/// face the horizontal travel direction. Vertical displacement never changes
/// the result; a purely vertical or zero move faces +X.
pub fn heading(from: Vec3, to: Vec3) -> Orientation {
    let direction = (to - from).normalize_or_zero();
    Orientation::new(FRAC_PI_2, 0.0, direction.y.atan2(direction.x))
}

// ============================================================================
// Keyframe channels
// ============================================================================

/// How a key blends into the next one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Straight line to the next key
    #[default]
    Linear,
    /// Cubic Hermite with automatic tangents
    Smooth,
}

/// One key of a scalar channel
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    pub frame: f32,
    pub value: f32,
    pub interpolation: Interpolation,
}

/// A single animated scalar, keys sorted by frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Channel {
    keys: Vec<Keyframe>,
}

impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in frame order
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert a key. A key already at the same frame is replaced.
    pub fn insert(&mut self, key: Keyframe) {
        match self
            .keys
            .binary_search_by(|k| k.frame.total_cmp(&key.frame))
        {
            Ok(i) => self.keys[i] = key,
            Err(i) => self.keys.insert(i, key),
        }
    }

    /// Switch every key to smooth interpolation
    pub fn smooth(&mut self) {
        for key in &mut self.keys {
            key.interpolation = Interpolation::Smooth;
        }
    }

    /// Evaluate the channel. Holds the first and last value outside the keyed
    /// range; `None` if the channel has no keys.
    pub fn sample(&self, frame: f32) -> Option<f32> {
        let first = self.keys.first()?;
        let last = self.keys.last()?;
        if frame <= first.frame {
            return Some(first.value);
        }
        if frame >= last.frame {
            return Some(last.value);
        }

        // First key strictly after `frame`; both neighbours exist here
        let next = self.keys.partition_point(|k| k.frame <= frame);
        let i = next - 1;
        let (k0, k1) = (self.keys[i], self.keys[next]);
        let span = k1.frame - k0.frame;
        let t = (frame - k0.frame) / span;

        Some(match k0.interpolation {
            Interpolation::Linear => k0.value + (k1.value - k0.value) * t,
            Interpolation::Smooth => hermite(
                k0.value,
                self.tangent(i) * span,
                k1.value,
                self.tangent(next) * span,
                t,
            ),
        })
    }

    /// Slope at key `i` in value per frame. End keys are flat.
    fn tangent(&self, i: usize) -> f32 {
        if i == 0 || i + 1 >= self.keys.len() {
            return 0.0;
        }
        let (prev, next) = (self.keys[i - 1], self.keys[i + 1]);
        (next.value - prev.value) / (next.frame - prev.frame)
    }
}

/// Cubic Hermite between `p0` and `p1` with segment-scaled tangents.
fn hermite(p0: f32, m0: f32, p1: f32, m1: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    (2.0 * t3 - 3.0 * t2 + 1.0) * p0
        + (t3 - 2.0 * t2 + t) * m0
        + (-2.0 * t3 + 3.0 * t2) * p1
        + (t3 - t2) * m1
}

/// Location and rotation channels of one animated object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlightTrack {
    /// X, Y, Z location
    pub location: [Channel; 3],
    /// Roll, pitch, yaw in radians
    pub rotation: [Channel; 3],
}

impl FlightTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key location and rotation at `frame`
    pub fn insert_pose(&mut self, frame: u32, pose: &Pose, interpolation: Interpolation) {
        let position = pose.position.to_array();
        let angles = pose.orientation.to_array();
        for axis in 0..3 {
            self.location[axis].insert(Keyframe {
                frame: frame as f32,
                value: position[axis],
                interpolation,
            });
            self.rotation[axis].insert(Keyframe {
                frame: frame as f32,
                value: angles[axis],
                interpolation,
            });
        }
    }

    /// Evaluated pose at `frame`, `None` for an empty track
    pub fn pose_at(&self, frame: f32) -> Option<Pose> {
        let [x, y, z] = &self.location;
        let [roll, pitch, yaw] = &self.rotation;
        Some(Pose::new(
            Vec3::new(x.sample(frame)?, y.sample(frame)?, z.sample(frame)?),
            Orientation::new(
                roll.sample(frame)?,
                pitch.sample(frame)?,
                yaw.sample(frame)?,
            ),
        ))
    }

    /// Switch every key of every channel to smooth interpolation
    pub fn smooth(&mut self) {
        for channel in self.location.iter_mut().chain(self.rotation.iter_mut()) {
            channel.smooth();
        }
    }

    /// Number of keyed frames
    pub fn keyframe_count(&self) -> usize {
        self.location[0].len()
    }

    /// First and last keyed frame
    pub fn frame_range(&self) -> Option<(f32, f32)> {
        let keys = self.location[0].keys();
        Some((keys.first()?.frame, keys.last()?.frame))
    }
}

/// Plan the flight over `frames`, starting at `start`.
///
/// Every `waypoint_interval` frames a new waypoint is drawn and `substeps`
/// keys are laid along the straight line to it, one per frame from the
/// segment start. The last segment may key past the end of the range; keys
/// that would lie beyond `u32::MAX` are dropped.
pub fn plan_flight<R: Rng + ?Sized>(
    start: Vec3,
    frames: RangeInclusive<u32>,
    config: &FlightConfig,
    rng: &mut R,
) -> FlightTrack {
    let mut track = FlightTrack::new();
    let mut current = start;
    let segment_starts = frames.step_by(config.waypoint_interval.max(1) as usize);

    for (segment_start, next) in segment_starts.zip(Waypoints::new(config.bounds, rng)) {
        let orientation = heading(current, next);
        for (i, point) in interpolate_segment(current, next, config.substeps)
            .into_iter()
            .enumerate()
        {
            let Some(frame) = u32::try_from(i)
                .ok()
                .and_then(|i| segment_start.checked_add(i))
            else {
                break;
            };
            track.insert_pose(frame, &Pose::new(point, orientation), Interpolation::Linear);
        }
        current = next;
    }

    track.smooth();
    track
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn key(frame: f32, value: f32, interpolation: Interpolation) -> Keyframe {
        Keyframe {
            frame,
            value,
            interpolation,
        }
    }

    #[test]
    fn test_segment_example() {
        let a = Vec3::new(0.0, 0.0, 4.0);
        let b = Vec3::new(8.0, 0.0, 4.0);
        let points = interpolate_segment(a, b, 20);

        assert_eq!(points.len(), 20);
        assert_eq!(points[0], a);
        assert!((points[10] - Vec3::new(4.0, 0.0, 4.0)).length() < 1e-5);
        assert!((points[19] - Vec3::new(7.6, 0.0, 4.0)).length() < 1e-5);
        assert_eq!(heading(a, b).yaw, 0.0);
    }

    #[test]
    fn test_segment_collinear_and_monotonic() {
        let a = Vec3::new(-3.0, 2.0, 3.5);
        let b = Vec3::new(5.0, -6.0, 4.5);
        let dir = (b - a).normalize();
        let points = interpolate_segment(a, b, 13);

        let mut last_distance = -1.0;
        for p in &points {
            let offset = *p - a;
            assert!(offset.cross(dir).length() < 1e-4);
            let distance = offset.dot(dir);
            assert!(distance > last_distance);
            assert!(distance < (b - a).length());
            last_distance = distance;
        }
    }

    #[test]
    fn test_segment_zero_substeps_is_empty() {
        assert!(interpolate_segment(Vec3::ZERO, Vec3::ONE, 0).is_empty());
    }

    #[test]
    fn test_heading_ignores_height() {
        let from = Vec3::new(1.0, 1.0, 3.0);
        let flat = heading(from, Vec3::new(4.0, 5.0, 3.0));
        let climbing = heading(from, Vec3::new(4.0, 5.0, 5.0));
        assert!((flat.yaw - climbing.yaw).abs() < 1e-6);
        assert_eq!(flat.roll, FRAC_PI_2);
        assert_eq!(flat.pitch, 0.0);
    }

    #[test]
    fn test_heading_directions() {
        let o = Vec3::ZERO;
        assert!((heading(o, Vec3::Y).yaw - FRAC_PI_2).abs() < 1e-6);
        assert!((heading(o, -Vec3::X).yaw.abs() - std::f32::consts::PI).abs() < 1e-6);
        assert_eq!(heading(o, o).yaw, 0.0);
        assert_eq!(heading(o, Vec3::Z).yaw, 0.0);
    }

    #[test]
    fn test_bounds_sample_inside() {
        let bounds = WaypointBounds::default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            assert!(bounds.contains(bounds.sample(&mut rng)));
        }
    }

    #[test]
    fn test_waypoints_are_lazy() {
        let mut rng = StdRng::seed_from_u64(3);
        let first_two: Vec<Vec3> = Waypoints::new(WaypointBounds::default(), &mut rng)
            .take(2)
            .collect();

        let mut replay = StdRng::seed_from_u64(3);
        let bounds = WaypointBounds::default();
        assert_eq!(first_two[0], bounds.sample(&mut replay));
        assert_eq!(first_two[1], bounds.sample(&mut replay));
    }

    #[test]
    fn test_config_validation() {
        assert!(FlightConfig::default().validate().is_ok());
        let zero_interval = FlightConfig {
            waypoint_interval: 0,
            ..FlightConfig::default()
        };
        assert!(zero_interval.validate().is_err());
        let zero_substeps = FlightConfig {
            substeps: 0,
            ..FlightConfig::default()
        };
        assert!(zero_substeps.validate().is_err());
        let inverted = FlightConfig {
            bounds: WaypointBounds {
                min: Vec3::new(0.0, 0.0, 5.0),
                max: Vec3::new(1.0, 1.0, 3.0),
            },
            ..FlightConfig::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_channel_insert_replaces_same_frame() {
        let mut channel = Channel::new();
        channel.insert(key(5.0, 1.0, Interpolation::Linear));
        channel.insert(key(1.0, 0.0, Interpolation::Linear));
        channel.insert(key(5.0, 2.0, Interpolation::Linear));

        assert_eq!(channel.len(), 2);
        assert_eq!(channel.keys()[0].frame, 1.0);
        assert_eq!(channel.keys()[1].value, 2.0);
    }

    #[test]
    fn test_channel_sample_linear_and_hold() {
        let mut channel = Channel::new();
        assert_eq!(channel.sample(1.0), None);

        channel.insert(key(10.0, 0.0, Interpolation::Linear));
        channel.insert(key(20.0, 10.0, Interpolation::Linear));

        assert_eq!(channel.sample(0.0), Some(0.0));
        assert_eq!(channel.sample(15.0), Some(5.0));
        assert_eq!(channel.sample(99.0), Some(10.0));
    }

    #[test]
    fn test_channel_smooth_passes_through_keys() {
        let mut channel = Channel::new();
        for (frame, value) in [(1.0, 0.0), (2.0, 3.0), (3.0, 1.0), (4.0, 4.0)] {
            channel.insert(key(frame, value, Interpolation::Linear));
        }
        channel.smooth();

        for k in channel.keys().to_vec() {
            assert_eq!(k.interpolation, Interpolation::Smooth);
            assert!((channel.sample(k.frame).unwrap() - k.value).abs() < 1e-6);
        }
        // Flat end tangents ease out of the first key
        let early = channel.sample(1.1).unwrap();
        assert!(early > 0.0 && early < 0.3);
    }

    #[test]
    fn test_channel_smooth_keeps_straight_lines() {
        let mut channel = Channel::new();
        for i in 0..6 {
            channel.insert(key(i as f32, i as f32 * 2.0, Interpolation::Smooth));
        }
        // Interior segments of evenly spaced collinear keys stay linear
        assert!((channel.sample(2.5).unwrap() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_plan_flight_key_layout() {
        let mut rng = StdRng::seed_from_u64(42);
        let start = Vec3::new(0.0, 0.0, 6.0);
        let config = FlightConfig::default();
        let track = plan_flight(start, 1..=100, &config, &mut rng);

        // Segments start at 1, 21, 41, 61, 81
        assert_eq!(track.keyframe_count(), 100);
        assert_eq!(track.frame_range(), Some((1.0, 100.0)));
        let first = track.pose_at(1.0).unwrap();
        assert_eq!(first.position, start);

        for channel in track.location.iter().chain(track.rotation.iter()) {
            assert!(channel
                .keys()
                .iter()
                .all(|k| k.interpolation == Interpolation::Smooth));
        }
    }

    #[test]
    fn test_plan_flight_waypoints_reached() {
        let mut rng = StdRng::seed_from_u64(9);
        let config = FlightConfig::default();
        let track = plan_flight(Vec3::new(0.0, 0.0, 6.0), 1..=200, &config, &mut rng);

        // Each segment after the first starts exactly on a drawn waypoint
        for segment_start in (21..=181).step_by(20) {
            let pose = track.pose_at(segment_start as f32).unwrap();
            assert!(config.bounds.contains(pose.position));
        }
        for frame in 1..=200 {
            let pose = track.pose_at(frame as f32).unwrap();
            assert!((pose.orientation.roll - FRAC_PI_2).abs() < 1e-6);
            assert_eq!(pose.orientation.pitch, 0.0);
        }
    }

    #[test]
    fn test_plan_flight_is_deterministic_per_seed() {
        let config = FlightConfig::default();
        let a = plan_flight(Vec3::ZERO, 1..=60, &config, &mut StdRng::seed_from_u64(5));
        let b = plan_flight(Vec3::ZERO, 1..=60, &config, &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_plan_flight_stops_at_last_frame_number() {
        let config = FlightConfig::default();
        let track = plan_flight(
            Vec3::ZERO,
            u32::MAX - 4..=u32::MAX,
            &config,
            &mut StdRng::seed_from_u64(2),
        );
        // Frames this large share one f32 key; only termination matters
        assert!(track.keyframe_count() >= 1);
        let (_, last) = track.frame_range().unwrap();
        assert_eq!(last, u32::MAX as f32);
    }

    #[test]
    fn test_plan_flight_keys_past_range_end() {
        let config = FlightConfig {
            waypoint_interval: 10,
            substeps: 15,
            ..FlightConfig::default()
        };
        let track = plan_flight(
            Vec3::ZERO,
            1..=25,
            &config,
            &mut StdRng::seed_from_u64(11),
        );
        // Segments at 1, 11, 21; later segments overwrite overlapping keys
        assert_eq!(track.frame_range(), Some((1.0, 35.0)));
        assert_eq!(track.keyframe_count(), 35);
    }
}
