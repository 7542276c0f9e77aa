//! # Render Backend Seam
//!
//! The level never talks to a GPU API directly. Everything it needs from one
//! goes through [`RenderBackend`]:
//! - transfers into the level vertex buffer
//! - image creation (model textures, skybox cubemaps)
//! - material descriptor writes
//! - the mapped frame uniform buffer and its offset alignment
//!
//! [`HeadlessBackend`] implements it over plain memory for tools and tests.

use bytemuck::Pod;

use crate::error::{BackendError, LevelError, LevelResult};

/// Opaque image created by a backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub struct ImageHandle(pub u32);

/// Opaque descriptor set written by a backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub struct DescriptorHandle(pub u32);

/// Shape of an image to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageDesc {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Mip levels.
    pub mip_count: u32,
    /// Array layers (6 for a cubemap).
    pub layer_count: u32,
    /// Backend-specific pixel format code.
    pub format: u32,
    /// Sampled as a cubemap.
    pub cubemap: bool,
}

/// The five texture bindings of a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterialTextures {
    /// Base color.
    pub albedo: ImageHandle,
    /// Metalness.
    pub metallic: ImageHandle,
    /// Roughness.
    pub roughness: ImageHandle,
    /// Tangent-space normals.
    pub normal: ImageHandle,
    /// Height map.
    pub height: ImageHandle,
}

/// What the level needs from a GPU backend.
pub trait RenderBackend {
    /// Copies `bytes` into the level vertex buffer at `offset`.
    ///
    /// # Errors
    ///
    /// Backend-specific, for example a transfer past the buffer end.
    fn transfer_buffer(&mut self, offset: usize, bytes: &[u8]) -> Result<(), BackendError>;

    /// Creates an image and uploads `data` into it.
    ///
    /// # Errors
    ///
    /// Backend-specific.
    fn create_image(&mut self, desc: &ImageDesc, data: &[u8]) -> Result<ImageHandle, BackendError>;

    /// Texture bound in place of a missing material image.
    fn default_texture(&self) -> ImageHandle;

    /// Writes a descriptor set binding a material's textures.
    ///
    /// # Errors
    ///
    /// Backend-specific.
    fn write_material_descriptors(
        &mut self,
        textures: &MaterialTextures,
    ) -> Result<DescriptorHandle, BackendError>;

    /// Minimum offset alignment of uniform blocks. Always a power of two.
    fn uniform_alignment(&self) -> usize;

    /// The mapped uniform memory of the current frame.
    fn frame_uniforms(&mut self) -> &mut [u8];
}

/// Rounds `value` up to a power-of-two `alignment`.
#[inline]
#[must_use]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

// ============================================================================
// FRAME UNIFORM BUFFER
// ============================================================================

/// Write cursor over a frame's mapped uniform memory.
///
/// Every record starts at a multiple of the backend's uniform alignment.
#[derive(Debug)]
pub struct FrameUniformBuffer<'a> {
    bytes: &'a mut [u8],
    alignment: usize,
    offset: usize,
}

impl<'a> FrameUniformBuffer<'a> {
    /// Starts writing at offset zero.
    #[must_use]
    pub fn new(bytes: &'a mut [u8], alignment: usize) -> Self {
        debug_assert!(
            alignment.is_power_of_two(),
            "uniform alignment {alignment} is not a power of two"
        );
        Self {
            bytes,
            alignment,
            offset: 0,
        }
    }

    /// Bytes written so far, including alignment padding.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Uniform offset alignment.
    #[inline]
    #[must_use]
    pub const fn alignment(&self) -> usize {
        self.alignment
    }

    /// Aligns the cursor, writes `value` and returns the offset it landed at.
    ///
    /// # Errors
    ///
    /// [`LevelError::UniformBufferFull`] when the record does not fit.
    pub fn push<T: Pod>(&mut self, value: &T) -> LevelResult<u32> {
        let record = bytemuck::bytes_of(value);
        let offset = align_up(self.offset, self.alignment);
        let end = offset + record.len();
        if end > self.bytes.len() {
            return Err(LevelError::UniformBufferFull {
                requested: record.len(),
                offset,
                capacity: self.bytes.len(),
            });
        }
        let Ok(offset32) = u32::try_from(offset) else {
            return Err(LevelError::UniformBufferFull {
                requested: record.len(),
                offset,
                capacity: self.bytes.len(),
            });
        };
        self.bytes[offset..end].copy_from_slice(record);
        self.offset = end;
        Ok(offset32)
    }
}

// ============================================================================
// HEADLESS BACKEND
// ============================================================================

/// A backend over plain memory: no GPU, everything inspectable.
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    vertex_buffer: Vec<u8>,
    uniforms: Vec<u8>,
    uniform_alignment: usize,
    images: Vec<(ImageDesc, usize)>,
    materials: Vec<MaterialTextures>,
}

impl HeadlessBackend {
    /// Handle of the built-in default texture.
    pub const DEFAULT_TEXTURE: ImageHandle = ImageHandle(0);

    /// Creates a backend with fixed vertex and uniform buffer sizes.
    #[must_use]
    pub fn new(vertex_buffer_bytes: usize, uniform_bytes: usize, uniform_alignment: usize) -> Self {
        Self {
            vertex_buffer: vec![0; vertex_buffer_bytes],
            uniforms: vec![0; uniform_bytes],
            uniform_alignment,
            images: Vec::new(),
            materials: Vec::new(),
        }
    }

    /// Level vertex buffer contents.
    #[must_use]
    pub fn vertex_buffer(&self) -> &[u8] {
        &self.vertex_buffer
    }

    /// Created images and the byte size uploaded to each, by handle minus one.
    #[must_use]
    pub fn images(&self) -> &[(ImageDesc, usize)] {
        &self.images
    }

    /// Written material descriptor sets, by handle.
    #[must_use]
    pub fn materials(&self) -> &[MaterialTextures] {
        &self.materials
    }

    /// Frame uniform buffer contents.
    #[must_use]
    pub fn uniforms(&self) -> &[u8] {
        &self.uniforms
    }

    /// Reads a uniform record written at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the record extends past the buffer.
    #[must_use]
    pub fn read_uniform<T: Pod>(&self, offset: u32) -> T {
        let start = offset as usize;
        bytemuck::pod_read_unaligned(&self.uniforms[start..start + std::mem::size_of::<T>()])
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(16 * 1024 * 1024, 1024 * 1024, 256)
    }
}

impl RenderBackend for HeadlessBackend {
    fn transfer_buffer(&mut self, offset: usize, bytes: &[u8]) -> Result<(), BackendError> {
        let end = offset + bytes.len();
        let Some(target) = self.vertex_buffer.get_mut(offset..end) else {
            return Err(BackendError(format!(
                "transfer of {} bytes at {offset} past vertex buffer end {}",
                bytes.len(),
                self.vertex_buffer.len()
            )));
        };
        target.copy_from_slice(bytes);
        Ok(())
    }

    fn create_image(&mut self, desc: &ImageDesc, data: &[u8]) -> Result<ImageHandle, BackendError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError(format!(
                "image extent {}x{} is empty",
                desc.width, desc.height
            )));
        }
        self.images.push((*desc, data.len()));
        let handle = u32::try_from(self.images.len())
            .map_err(|_| BackendError("image handles exhausted".to_owned()))?;
        Ok(ImageHandle(handle))
    }

    fn default_texture(&self) -> ImageHandle {
        Self::DEFAULT_TEXTURE
    }

    fn write_material_descriptors(
        &mut self,
        textures: &MaterialTextures,
    ) -> Result<DescriptorHandle, BackendError> {
        let handle = u32::try_from(self.materials.len())
            .map_err(|_| BackendError("descriptor sets exhausted".to_owned()))?;
        self.materials.push(*textures);
        Ok(DescriptorHandle(handle))
    }

    fn uniform_alignment(&self) -> usize {
        self.uniform_alignment
    }

    fn frame_uniforms(&mut self) -> &mut [u8] {
        &mut self.uniforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 2), 258);
    }

    #[test]
    fn test_uniform_push_aligns_each_record() {
        let mut memory = vec![0u8; 1024];
        let mut buffer = FrameUniformBuffer::new(&mut memory, 256);
        assert_eq!(buffer.push(&[1.0f32; 5]).unwrap(), 0);
        assert_eq!(buffer.offset(), 20);
        assert_eq!(buffer.push(&7u32).unwrap(), 256);
        assert_eq!(buffer.push(&[0u8; 256]).unwrap(), 512);
        assert_eq!(buffer.offset(), 768);
    }

    #[test]
    fn test_uniform_push_overflow() {
        let mut memory = vec![0u8; 300];
        let mut buffer = FrameUniformBuffer::new(&mut memory, 256);
        buffer.push(&1u32).unwrap();
        let err = buffer.push(&[0u8; 64]).unwrap_err();
        assert!(matches!(
            err,
            LevelError::UniformBufferFull { offset: 256, requested: 64, capacity: 300 }
        ));
    }

    #[test]
    fn test_headless_transfer_bounds() {
        let mut backend = HeadlessBackend::new(8, 0, 16);
        backend.transfer_buffer(4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(backend.vertex_buffer(), &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(backend.transfer_buffer(6, &[0; 4]).is_err());
    }

    #[test]
    fn test_headless_images_never_use_default_handle() {
        let mut backend = HeadlessBackend::default();
        let desc = ImageDesc {
            width: 2,
            height: 2,
            mip_count: 1,
            layer_count: 1,
            format: 0,
            cubemap: false,
        };
        let first = backend.create_image(&desc, &[0; 16]).unwrap();
        assert_ne!(first, backend.default_texture());
        assert_eq!(backend.images()[0].1, 16);
    }
}
