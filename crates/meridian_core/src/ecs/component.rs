//! # Component System
//!
//! Components are pure data containers with no behavior.
//! They must be plain old data so their dense arrays can be handed to a
//! device mirror as raw bytes.

use bytemuck::{Pod, Zeroable};

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Copy`: No heap allocations, bitwise copyable
/// - `Pod`: Plain old data, safe to view as bytes
/// - `Zeroable`: Can be safely zeroed
///
/// Type tags are not part of the type: they are handed out by
/// [`Coordinator::register_component`](crate::Coordinator::register_component)
/// in registration order.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Pod, Zeroable)]
/// #[repr(C)]
/// struct DeviceTransform {
///     model: [[f32; 4]; 4],
///     inverse_model: [[f32; 4]; 4],
/// }
///
/// impl Component for DeviceTransform {}
/// ```
pub trait Component: Copy + Pod + Zeroable + Send + Sync + 'static {
    /// Human-readable name used in errors and logs.
    #[must_use]
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Light {
        color: [f32; 3],
        intensity: f32,
    }

    impl Component for Light {}

    #[test]
    fn test_default_name_is_type_path() {
        assert!(Light::name().ends_with("Light"));
    }

    #[test]
    fn test_component_is_byte_viewable() {
        let light = Light {
            color: [1.0, 0.5, 0.25],
            intensity: 2.0,
        };
        let bytes = bytemuck::bytes_of(&light);
        assert_eq!(bytes.len(), 16);
        assert_eq!(*bytemuck::from_bytes::<Light>(bytes), light);
    }
}
