//! # Tracked Input Devices
//!
//! The host supplies raw device poses and button states through a
//! [`DeviceSource`]. The scene polls it once per simulation tick and hands the
//! snapshot to behaviours through
//! [`BehaviourContext`](crate::gfx::scene::BehaviourContext).
//!
//! [`make_gamepad_tracker`] is the stock behaviour that makes a drawable
//! follow a hand controller and reports button transitions.

use std::cell::RefCell;
use std::rc::Rc;

use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3};

use crate::gfx::math::{euler_quaternion, rotation_translation};
use crate::gfx::scene::{Behaviour, Drawable, ScratchValue};

/// Raw device pose. Either part may be missing while tracking is lost.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Option<Vector3<f32>>,
    pub orientation: Option<Quaternion<f32>>,
}

impl Pose {
    pub fn new(position: Vector3<f32>, orientation: Quaternion<f32>) -> Self {
        Self {
            position: Some(position),
            orientation: Some(orientation),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.position.is_some() && self.orientation.is_some()
    }

    /// `T * R` of the pose, or `None` if either part is missing
    pub fn matrix(&self) -> Option<Matrix4<f32>> {
        match (self.position, self.orientation) {
            (Some(position), Some(orientation)) => Some(rotation_translation(orientation, position)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ButtonState {
    pub pressed: bool,
    pub touched: bool,
    pub value: f32,
}

impl ButtonState {
    pub fn pressed() -> Self {
        Self {
            pressed: true,
            touched: true,
            value: 1.0,
        }
    }

    pub fn released() -> Self {
        Self::default()
    }
}

/// A tracked controller as reported by the host
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackedDevice {
    pub pose: Pose,
    pub buttons: Vec<ButtonState>,
    pub axes: Vec<f32>,
}

/// Host-side provider of device state
pub trait DeviceSource {
    fn tracked_devices(&self) -> Vec<TrackedDevice>;

    /// Head pose of the display, when the host tracks one
    fn head_pose(&self) -> Option<Pose> {
        None
    }
}

/// Device state set by hand. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct SharedDevices {
    devices: Rc<RefCell<Vec<TrackedDevice>>>,
    head: Rc<RefCell<Option<Pose>>>,
}

impl SharedDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_devices(&self, devices: Vec<TrackedDevice>) {
        *self.devices.borrow_mut() = devices;
    }

    pub fn set_head_pose(&self, pose: Option<Pose>) {
        *self.head.borrow_mut() = pose;
    }
}

impl DeviceSource for SharedDevices {
    fn tracked_devices(&self) -> Vec<TrackedDevice> {
        self.devices.borrow().clone()
    }

    fn head_pose(&self) -> Option<Pose> {
        *self.head.borrow()
    }
}

/// Play area description supplied by the display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageParameters {
    pub size_x: f32,
    pub size_z: f32,
    /// Maps seated-space poses into standing space
    pub sitting_to_standing: Matrix4<f32>,
}

impl Default for StageParameters {
    fn default() -> Self {
        Self {
            size_x: 0.0,
            size_z: 0.0,
            sitting_to_standing: Matrix4::identity(),
        }
    }
}

impl StageParameters {
    pub fn new(size_x: f32, size_z: f32, sitting_to_standing: Matrix4<f32>) -> Self {
        Self {
            size_x,
            size_z,
            sitting_to_standing,
        }
    }

    /// Stand-in for displays without stage data: raise poses to eye height
    pub fn seated(player_height: f32) -> Self {
        Self {
            sitting_to_standing: Matrix4::from_translation(Vector3::new(0.0, player_height, 0.0)),
            ..Default::default()
        }
    }

    /// `T(player_location) * sitting_to_standing * pose`
    pub fn place(&self, pose: &Matrix4<f32>, player_location: Vector3<f32>) -> Matrix4<f32> {
        Matrix4::from_translation(player_location) * self.sitting_to_standing * pose
    }
}

/// Button transition since the previous tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStatus {
    Pressed,
    Released,
    Held,
    Up,
}

/// Reported to gamepad button handlers once per button per tick
#[derive(Debug, Clone)]
pub struct ButtonEvent<'a> {
    pub gamepad_index: usize,
    pub button_index: usize,
    pub status: ButtonStatus,
    pub button: ButtonState,
    pub axes: &'a [f32],
}

/// Scratch pad key holding a button's last seen pressed state
pub fn button_key(button_index: usize) -> String {
    format!("Button{}Down", button_index)
}

/// Scratch pad key holding the latest trackpad axes
pub const TRACKPAD_AXES_KEY: &str = "trackpadAxes";

/// Behaviour making a drawable follow gamepad `gamepad_index`.
///
/// Each tick it reports every button to `handler`, records the trackpad axes
/// and writes the drawable's `matrix` as the placed device pose followed by
/// the drawable's own orientation and translation. A device without a
/// complete pose keeps its previous matrix.
pub fn make_gamepad_tracker<F>(gamepad_index: usize, mut handler: F) -> Behaviour
where
    F: FnMut(&mut Drawable, &ButtonEvent) + 'static,
{
    Box::new(move |drawable, _now, context| {
        let Some(device) = context.devices.get(gamepad_index) else {
            return;
        };

        drawable
            .scratch_pad
            .set(TRACKPAD_AXES_KEY, ScratchValue::Values(device.axes.clone()));

        for (button_index, button) in device.buttons.iter().enumerate() {
            let key = button_key(button_index);
            let was_pressed = drawable.scratch_pad.flag(&key);
            let status = if button.pressed != was_pressed {
                drawable.scratch_pad.set(&key, ScratchValue::Flag(button.pressed));
                if button.pressed {
                    ButtonStatus::Pressed
                } else {
                    ButtonStatus::Released
                }
            } else if button.pressed {
                ButtonStatus::Held
            } else {
                ButtonStatus::Up
            };

            let event = ButtonEvent {
                gamepad_index,
                button_index,
                status,
                button: *button,
                axes: &device.axes,
            };
            handler(drawable, &event);
        }

        match device.pose.matrix() {
            Some(pose) => {
                let placed = context.stage.place(&pose, context.player_location);
                let o = drawable.orientation;
                let local = rotation_translation(euler_quaternion(o.x, o.y, o.z), drawable.translation);
                drawable.matrix = Some(placed * local);
            }
            None => log::debug!(
                "Gamepad {} has no complete pose, keeping previous matrix",
                gamepad_index
            ),
        }
    })
}
