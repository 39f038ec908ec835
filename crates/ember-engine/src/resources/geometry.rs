use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use bytemuck::Pod;

use crate::container::Container;
use crate::device::{BufferUsage, DrawCall, Frame, IndexFormat};
use crate::resource::{GpuResource, ResourceCore, ResourceError};

use super::{Buffer, Program, Texture};

struct Indices {
    buffer: Arc<Buffer>,
    format: IndexFormat,
    count: AtomicU32,
}

/// Vertex buffer plus an optional index buffer, attached together.
pub struct Geometry {
    container: Container,
    vertices: Arc<Buffer>,
    vertex_count: AtomicU32,
    indices: Option<Indices>,
}

impl Geometry {
    pub fn new<V: Pod>(label: impl Into<String>, vertices: &[V]) -> Self {
        let label = label.into();
        let container = Container::new(label.clone());
        let buffer = Arc::new(Buffer::from_slice(
            format!("{label}.vertices"),
            BufferUsage::Vertex,
            vertices,
        ));
        container.register_object(&buffer);
        Self {
            container,
            vertices: buffer,
            vertex_count: AtomicU32::new(count(vertices.len())),
            indices: None,
        }
    }

    pub fn with_indices_u16(self, indices: &[u16]) -> Self {
        self.with_indices(indices, IndexFormat::U16)
    }

    pub fn with_indices_u32(self, indices: &[u32]) -> Self {
        self.with_indices(indices, IndexFormat::U32)
    }

    fn with_indices<I: Pod>(mut self, indices: &[I], format: IndexFormat) -> Self {
        let buffer = Arc::new(Buffer::from_slice(
            format!("{}.indices", self.container.label()),
            BufferUsage::Index,
            indices,
        ));
        self.container.register_object(&buffer);
        self.indices = Some(Indices {
            buffer,
            format,
            count: AtomicU32::new(count(indices.len())),
        });
        self
    }

    pub fn vertices(&self) -> &Arc<Buffer> {
        &self.vertices
    }

    pub fn index_buffer(&self) -> Option<&Arc<Buffer>> {
        self.indices.as_ref().map(|indices| &indices.buffer)
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count.load(Ordering::Acquire)
    }

    pub fn index_count(&self) -> Option<u32> {
        self.indices
            .as_ref()
            .map(|indices| indices.count.load(Ordering::Acquire))
    }

    pub fn set_vertices<V: Pod>(&self, vertices: &[V]) {
        self.vertices.set_typed(vertices);
        self.vertex_count
            .store(count(vertices.len()), Ordering::Release);
    }

    /// Replaces the index data. Ignored (with a warning) on non-indexed
    /// geometry or when `I` does not match the index format.
    pub fn set_indices<I: Pod>(&self, indices: &[I]) {
        let Some(current) = &self.indices else {
            log::warn!("`{}`: set_indices on non-indexed geometry", self.label());
            return;
        };
        let width = match current.format {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        };
        if size_of::<I>() != width {
            log::warn!(
                "`{}`: {}-byte indices given for {:?} geometry",
                self.label(),
                size_of::<I>(),
                current.format
            );
            return;
        }
        current.buffer.set_typed(indices);
        current.count.store(count(indices.len()), Ordering::Release);
    }

    /// Draw call for `program`, building any handle that is missing.
    pub fn draw_call(
        &self,
        program: &Program,
        uniforms: Option<&Buffer>,
        texture: Option<&Texture>,
    ) -> Result<DrawCall, ResourceError> {
        let label = self.label();
        let program = program.handle()?;
        let vertex_buffer = self
            .vertices
            .non_empty_handle()
            .map_err(|err| ResourceError::dependency(label, err))?;

        let mut call = DrawCall::new(program, vertex_buffer, 0..self.vertex_count());
        if let Some(indices) = &self.indices {
            let handle = indices
                .buffer
                .non_empty_handle()
                .map_err(|err| ResourceError::dependency(label, err))?;
            call.index_buffer = Some((handle, indices.format));
            call.elements = 0..indices.count.load(Ordering::Acquire);
        }
        if let Some(uniforms) = uniforms {
            call.uniforms = Some(uniforms.handle()?);
        }
        if let Some(texture) = texture {
            call.texture = Some(texture.handle()?);
        }
        Ok(call)
    }

    /// Draws into `frame`. An unavailable resource skips the draw and is
    /// logged at debug level; returns whether the device accepted it.
    pub fn draw_with(
        &self,
        frame: &mut Frame<'_>,
        program: &Program,
        uniforms: Option<&Buffer>,
        texture: Option<&Texture>,
    ) -> bool {
        match self.draw_call(program, uniforms, texture) {
            Ok(call) => frame.draw(&call),
            Err(err) => {
                log::debug!("`{}`: draw skipped: {err}", self.label());
                frame.skip();
                false
            }
        }
    }
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl GpuResource for Geometry {
    fn core(&self) -> &ResourceCore {
        self.container.core()
    }

    fn as_container(&self) -> Option<&Container> {
        Some(&self.container)
    }
}

impl std::fmt::Debug for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geometry")
            .field("container", &self.container)
            .field("vertex_count", &self.vertex_count())
            .field("index_count", &self.index_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HandleKind;
    use crate::device::headless::headless_context;

    #[test]
    fn indexed_geometry_attaches_both_buffers() {
        let (ctx, device) = headless_context();
        let quad = Arc::new(
            Geometry::new("quad", &[[0.0f32, 0.0]; 4]).with_indices_u16(&[0, 1, 2, 2, 3, 0]),
        );
        quad.init_context(&ctx);

        assert_eq!(quad.vertex_count(), 4);
        assert_eq!(quad.index_count(), Some(6));
        quad.vertices().handle().unwrap();
        quad.index_buffer().unwrap().handle().unwrap();
        assert_eq!(device.live_count_of(HandleKind::Buffer), 2);

        quad.deinit_context(&ctx);
        assert_eq!(device.live_count(), 0);
    }

    #[test]
    fn mismatched_index_width_is_ignored() {
        let quad = Geometry::new("quad", &[[0.0f32, 0.0]; 4]).with_indices_u16(&[0, 1, 2]);
        quad.set_indices(&[0u32, 1, 2, 3]);
        assert_eq!(quad.index_count(), Some(3));
    }
}
