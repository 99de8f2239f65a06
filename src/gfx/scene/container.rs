//! Top-level scene entries: bare drawables and components wrapping one.

use cgmath::{Matrix4, Vector3};

use super::drawable::{Drawable, Metadata};

/// Handle to a top-level scene entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// Non-rendering wrapper that carries a drawable plus its own identity.
///
/// A component's `matrix` (or else `injected_matrix`) becomes the inherited
/// matrix of its drawable.
#[derive(Debug)]
pub struct Component {
    pub label: Option<String>,
    pub group_label: Option<String>,
    pub metadata: Metadata,
    pub matrix: Option<Matrix4<f32>>,
    pub injected_matrix: Option<Matrix4<f32>>,
    pub drawable: Drawable,
}

impl Component {
    pub fn new(drawable: Drawable) -> Self {
        Self {
            label: None,
            group_label: None,
            metadata: Metadata::new(),
            matrix: None,
            injected_matrix: None,
            drawable,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_group_label(mut self, label: &str) -> Self {
        self.group_label = Some(label.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub(crate) fn parent_matrix(&self) -> Option<Matrix4<f32>> {
        self.matrix.or(self.injected_matrix)
    }
}

/// Anything that can sit in the scene's object list
#[derive(Debug)]
pub enum SceneObject {
    Drawable(Drawable),
    Component(Component),
}

impl SceneObject {
    pub fn label(&self) -> Option<&str> {
        match self {
            SceneObject::Drawable(d) => d.label.as_deref(),
            SceneObject::Component(c) => c.label.as_deref(),
        }
    }

    pub fn group_label(&self) -> Option<&str> {
        match self {
            SceneObject::Drawable(d) => d.group_label.as_deref(),
            SceneObject::Component(c) => c.group_label.as_deref(),
        }
    }

    /// The renderable part: the drawable itself, or the component's drawable
    pub fn drawable(&self) -> &Drawable {
        match self {
            SceneObject::Drawable(d) => d,
            SceneObject::Component(c) => &c.drawable,
        }
    }

    pub fn drawable_mut(&mut self) -> &mut Drawable {
        match self {
            SceneObject::Drawable(d) => d,
            SceneObject::Component(c) => &mut c.drawable,
        }
    }

    pub fn is_component(&self) -> bool {
        matches!(self, SceneObject::Component(_))
    }

    pub fn pos(&self) -> Vector3<f32> {
        self.drawable().pos
    }
}

impl From<Drawable> for SceneObject {
    fn from(drawable: Drawable) -> Self {
        SceneObject::Drawable(drawable)
    }
}

impl From<Component> for SceneObject {
    fn from(component: Component) -> Self {
        SceneObject::Component(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::SimpleCuboid;
    use cgmath::Zero;

    #[test]
    fn test_component_exposes_drawable() {
        let drawable = Drawable::new(SimpleCuboid::new(1.0, 1.0, 1.0), Vector3::new(1.0, 2.0, 3.0))
            .with_label("inner");
        let object: SceneObject = Component::new(drawable).with_label("outer").with_group_label("items").into();
        assert_eq!(object.label(), Some("outer"));
        assert_eq!(object.group_label(), Some("items"));
        assert_eq!(object.drawable().label.as_deref(), Some("inner"));
        assert_eq!(object.pos(), Vector3::new(1.0, 2.0, 3.0));
        assert!(object.is_component());
    }

    #[test]
    fn test_parent_matrix_prefers_matrix() {
        let mut component = Component::new(Drawable::container(Vector3::zero()));
        assert_eq!(component.parent_matrix(), None);
        component.injected_matrix = Some(Matrix4::from_scale(2.0));
        assert_eq!(component.parent_matrix(), Some(Matrix4::from_scale(2.0)));
        component.matrix = Some(Matrix4::from_scale(3.0));
        assert_eq!(component.parent_matrix(), Some(Matrix4::from_scale(3.0)));
    }
}
