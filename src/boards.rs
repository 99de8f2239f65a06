//! Content boards: images mounted on thin cuboids.

use std::rc::Rc;

use cgmath::{Vector3, Zero};

use crate::gfx::geometry::BoardCuboid;
use crate::gfx::resources::{TextureImage, BOARD_TEXTURE_SIZE};
use crate::gfx::scene::{Drawable, FaceSpec, Metadata};

/// Board height used when none is given
pub const DEFAULT_BOARD_HEIGHT: f32 = 3.0;

pub const BOARD_DEPTH: f32 = 0.2;

pub const DEFAULT_BOARD_GROUP: &str = "contentboards";

/// Builds a board sized to an image's aspect ratio.
///
/// The image is not uploaded here. The front face carries a loader that
/// resamples it to a square texture the first time the render throttle
/// allows; until then the board shows its `silver` base texture.
#[derive(Debug, Clone)]
pub struct ImageBoard {
    image: TextureImage,
    label: String,
    pos: Vector3<f32>,
    orientation: Vector3<f32>,
    height: f32,
    group_label: String,
    metadata: Metadata,
}

impl ImageBoard {
    pub fn new(image: TextureImage, label: &str) -> Self {
        Self {
            image,
            label: label.to_string(),
            pos: Vector3::zero(),
            orientation: Vector3::zero(),
            height: DEFAULT_BOARD_HEIGHT,
            group_label: DEFAULT_BOARD_GROUP.to_string(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_position(mut self, pos: Vector3<f32>) -> Self {
        self.pos = pos;
        self
    }

    pub fn with_orientation(mut self, orientation: Vector3<f32>) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn with_group_label(mut self, label: &str) -> Self {
        self.group_label = label.to_string();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn build(self) -> Drawable {
        let scale = self.height / self.image.height.max(1) as f32;
        let width = self.image.width as f32 * scale;
        let height = self.image.height as f32 * scale;
        log::debug!("Image board '{}' is {:.2} x {:.2}", self.label, width, height);

        let image = self.image;
        let front = FaceSpec::new()
            .with_texture_loader(Rc::new(move || image.resampled(BOARD_TEXTURE_SIZE)));

        let mut board = Drawable::new(BoardCuboid::new(width, height, BOARD_DEPTH), self.pos)
            .with_orientation(self.orientation)
            .with_texture_label("silver")
            .with_shader_label("basic")
            .with_group_label(&self.group_label)
            .with_label(&self.label)
            .with_face("front", front);
        board.metadata = self.metadata;
        board
    }
}

/// Shorthand for [`ImageBoard`] with the default group and no metadata
pub fn make_image_board(
    image: TextureImage,
    label: &str,
    pos: Vector3<f32>,
    orientation: Vector3<f32>,
    height: Option<f32>,
) -> Drawable {
    ImageBoard::new(image, label)
        .with_position(pos)
        .with_orientation(orientation)
        .with_height(height.unwrap_or(DEFAULT_BOARD_HEIGHT))
        .build()
}
