//! Player spatial state: world poses of the head and hands.
//!
//! Resolving poses is amortised across the two eye passes of a frame: the
//! state is recomputed on every other render call only.

use cgmath::{Quaternion, Vector3};

use crate::input::{Pose, StageParameters, TrackedDevice};

/// A pose resolved into world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPose {
    pub position: Vector3<f32>,
    pub orientation: Quaternion<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSpatialState {
    pub head: Option<WorldPose>,
    /// One entry per tracked device; `None` until a complete pose arrives
    pub hands: Vec<Option<WorldPose>>,
    needs_update: bool,
}

impl Default for PlayerSpatialState {
    fn default() -> Self {
        Self {
            head: None,
            hands: Vec::new(),
            needs_update: true,
        }
    }
}

impl PlayerSpatialState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Flips the update toggle, returning whether this call is due to update
    pub fn take_turn(&mut self) -> bool {
        let due = self.needs_update;
        self.needs_update = !due;
        due
    }

    /// Resolves device and head poses into world space.
    ///
    /// Incomplete poses leave the previous value in place.
    pub fn refresh(
        &mut self,
        devices: &[TrackedDevice],
        head: Option<&Pose>,
        stage: &StageParameters,
        player_location: Vector3<f32>,
    ) {
        if self.hands.len() < devices.len() {
            self.hands.resize(devices.len(), None);
        }
        for (slot, device) in self.hands.iter_mut().zip(devices) {
            if let Some(resolved) = resolve(&device.pose, stage, player_location) {
                *slot = Some(resolved);
            }
        }
        if let Some(resolved) = head.and_then(|pose| resolve(pose, stage, player_location)) {
            self.head = Some(resolved);
        }
    }
}

fn resolve(pose: &Pose, stage: &StageParameters, player_location: Vector3<f32>) -> Option<WorldPose> {
    let orientation = pose.orientation?;
    let placed = stage.place(&pose.matrix()?, player_location);
    Some(WorldPose {
        position: placed.w.truncate(),
        orientation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Matrix4, One};

    #[test]
    fn test_turns_alternate() {
        let mut state = PlayerSpatialState::new();
        assert!(state.take_turn());
        assert!(!state.take_turn());
        assert!(state.take_turn());
    }

    #[test]
    fn test_refresh_places_hands_and_keeps_stale() {
        let stage = StageParameters::new(3.0, 3.0, Matrix4::from_translation(Vector3::new(0.0, 1.0, 0.0)));
        let mut device = TrackedDevice {
            pose: Pose::new(Vector3::new(0.5, 0.0, 0.0), Quaternion::one()),
            ..Default::default()
        };
        let mut state = PlayerSpatialState::new();
        state.refresh(&[device.clone()], None, &stage, Vector3::new(0.0, 0.0, -2.0));
        let hand = state.hands[0].map(|h| h.position);
        assert_eq!(hand, Some(Vector3::new(0.5, 1.0, -2.0)));

        device.pose.position = None;
        state.refresh(&[device], None, &stage, Vector3::new(9.0, 9.0, 9.0));
        assert_eq!(state.hands[0].map(|h| h.position), hand);
        assert!(state.head.is_none());
    }
}
