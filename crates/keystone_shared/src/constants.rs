//! # Engine Limits
//!
//! Fixed sizes baked into uniform layouts and entity records.
//!
//! **CRITICAL:** The light limits are mirrored by the shaders.
//! Changing them requires a shader rebuild.

/// Directional lights in the common uniform block.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 1;

/// Point lights in the common uniform block.
///
/// More point lights than this in a level is a capacity violation.
pub const MAX_POINT_LIGHTS: usize = 4;

/// Spot lights in the common uniform block (reserved, always zero today).
pub const MAX_SPOT_LIGHTS: usize = 4;

/// Bytes in an entity name record, including the NUL terminator.
pub const ENTITY_NAME_CAPACITY: usize = 32;
