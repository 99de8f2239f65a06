//! Matrix helpers shared by transform composition, mesh tools and input.

use cgmath::{Matrix, Matrix4, Quaternion, Rad, Rotation3, SquareMatrix, Vector3};

/// Quaternion rotating about X, then Y, then Z (each in radians).
///
/// Each axis rotation post-multiplies the previous one.
pub fn euler_quaternion(x: f32, y: f32, z: f32) -> Quaternion<f32> {
    Quaternion::from_angle_x(Rad(x)) * Quaternion::from_angle_y(Rad(y)) * Quaternion::from_angle_z(Rad(z))
}

/// `T * R * S`
pub fn rotation_translation_scale(
    rotation: Quaternion<f32>,
    translation: Vector3<f32>,
    scale: Vector3<f32>,
) -> Matrix4<f32> {
    Matrix4::from_translation(translation)
        * Matrix4::from(rotation)
        * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z)
}

/// `T * R`
pub fn rotation_translation(rotation: Quaternion<f32>, translation: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_translation(translation) * Matrix4::from(rotation)
}

/// Inverse-transpose of `model` with a uniform scale factor undone first.
///
/// Falls back to identity when the matrix cannot be inverted.
pub fn normal_matrix(model: &Matrix4<f32>, scale_factor: Option<f32>) -> Matrix4<f32> {
    let unscaled = match scale_factor {
        Some(s) if s != 0.0 && s != 1.0 => model * Matrix4::from_scale(1.0 / s),
        _ => *model,
    };
    match unscaled.invert() {
        Some(inverse) => inverse.transpose(),
        None => {
            log::debug!("Model matrix is singular, using identity normal matrix");
            Matrix4::identity()
        }
    }
}

/// Element-wise comparison within `epsilon`
pub fn matrices_close(a: &Matrix4<f32>, b: &Matrix4<f32>, epsilon: f32) -> bool {
    let a: &[[f32; 4]; 4] = a.as_ref();
    let b: &[[f32; 4]; 4] = b.as_ref();
    a.iter()
        .flatten()
        .zip(b.iter().flatten())
        .all(|(x, y)| (x - y).abs() <= epsilon)
}
