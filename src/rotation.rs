//! Globe rotation toward a region's focus coordinate.
//!
//! Orientation is modeled as a quaternion composed from a polar (latitude)
//! and an azimuthal (longitude) component. A rotation runs for a fixed
//! duration, interpolated with spherical linear interpolation, and signals
//! completion through a watch channel exactly once when the interpolation
//! fraction reaches 1. The animation step is frame-driven; callers feed
//! elapsed time into [`ActiveRotation::advance`].

use crate::geometry::LngLat;
use nalgebra::{UnitQuaternion, Vector3};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Wrap an azimuth delta onto the shortest path in [-180, 180].
pub fn shortest_azimuth_delta(delta_deg: f64) -> f64 {
    let wrapped = (delta_deg + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid maps +180 to -180; keep the positive representative.
    if wrapped == -180.0 && delta_deg > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Globe orientation that brings `coord` to face the viewer: yaw about the
/// polar axis by the longitude, then pitch about the screen-horizontal axis
/// by the latitude.
fn orientation_for(lat_deg: f64, lng_deg: f64) -> UnitQuaternion<f64> {
    let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -lng_deg.to_radians());
    let pitch = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), lat_deg.to_radians());
    pitch * yaw
}

/// Factory for rotations with a configured duration.
#[derive(Debug, Clone)]
pub struct RotationController {
    duration: Duration,
}

impl RotationController {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Begin a rotation from the currently focused coordinate to a target.
    pub fn begin(&self, current: LngLat, target: LngLat) -> ActiveRotation {
        ActiveRotation::new(current, target, self.duration)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// One in-progress rotation.
#[derive(Debug)]
pub struct ActiveRotation {
    start: UnitQuaternion<f64>,
    end: UnitQuaternion<f64>,
    target: LngLat,
    duration: Duration,
    elapsed: Duration,
    completion_tx: watch::Sender<bool>,
    completion_rx: watch::Receiver<bool>,
    completed: bool,
}

impl ActiveRotation {
    pub fn new(current: LngLat, target: LngLat, duration: Duration) -> Self {
        // The azimuthal component moves by the shortest wrapped delta, the
        // polar component by the plain difference; composing the end
        // orientation from `current + delta` keeps slerp from taking the
        // long way around the globe.
        let d_lng = shortest_azimuth_delta(target.lng - current.lng);
        let d_lat = target.lat - current.lat;

        let start = orientation_for(current.lat, current.lng);
        let end = orientation_for(current.lat + d_lat, current.lng + d_lng);

        debug!(
            from = ?(current.lat, current.lng),
            to = ?(target.lat, target.lng),
            d_lat,
            d_lng,
            "rotation started"
        );

        let (completion_tx, completion_rx) = watch::channel(false);
        Self {
            start,
            end,
            target,
            duration,
            elapsed: Duration::ZERO,
            completion_tx,
            completion_rx,
            completed: false,
        }
    }

    /// Advance the animation by a frame delta and return the interpolated
    /// orientation. Fires the completion signal on the first call where the
    /// interpolation fraction reaches 1.
    pub fn advance(&mut self, dt: Duration) -> UnitQuaternion<f64> {
        self.elapsed += dt;
        let fraction = self.fraction();
        let orientation = self.start.slerp(&self.end, fraction);

        if fraction >= 1.0 && !self.completed {
            self.completed = true;
            // Receivers may all be gone.
            let _ = self.completion_tx.send(true);
            debug!(target = ?(self.target.lat, self.target.lng), "rotation complete");
        }

        orientation
    }

    /// Interpolation fraction in [0, 1].
    pub fn fraction(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn target(&self) -> LngLat {
        self.target
    }

    /// Channel resolving to `true` once the rotation completes. Await this
    /// to gate work on rotation completion.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.completion_rx.clone()
    }

    /// Final orientation, independent of animation progress.
    pub fn end_orientation(&self) -> UnitQuaternion<f64> {
        self.end
    }
}
