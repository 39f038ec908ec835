use std::ops::Range;

use super::DeviceHandle;

/// How a buffer is bound when drawing.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Clone, Copy)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub usage: BufferUsage,
    pub contents: &'a [u8],
}

/// RGBA8 texture upload.
#[derive(Debug, Clone, Copy)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows, `width * height * 4` bytes.
    pub pixels: &'a [u8],
    /// Allow the texture to be used as an offscreen `RenderTarget`.
    pub render_target: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Entry point name the backend looks up in the shader source.
    pub const fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ShaderDesc<'a> {
    pub label: &'a str,
    pub stage: ShaderStage,
    pub source: &'a str,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
    Unorm8x4,
}

impl VertexFormat {
    pub const fn size(self) -> u64 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
            VertexFormat::Unorm8x4 => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u64,
}

/// Layout of the single interleaved vertex stream a program consumes.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Builds a tightly packed layout, assigning locations in order.
    pub fn packed(formats: &[VertexFormat]) -> Self {
        let mut offset = 0;
        let attributes = formats
            .iter()
            .enumerate()
            .map(|(i, &format)| {
                let attr = VertexAttribute {
                    location: i as u32,
                    format,
                    offset,
                };
                offset += format.size();
                attr
            })
            .collect();

        Self {
            stride: offset,
            attributes,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    pub vertex: DeviceHandle,
    pub fragment: DeviceHandle,
    pub layout: &'a VertexLayout,
    /// Binding 0 of group 0 is a uniform buffer.
    pub uniforms: bool,
    /// Bindings 1 (texture) and 2 (sampler) of group 0 are used.
    pub textured: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

/// Where a frame draws.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RenderTarget {
    /// The drawable the context was created for.
    Surface,
    /// An offscreen texture created with `render_target: true`.
    Texture(DeviceHandle),
}

/// One draw, expressed purely in device handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub program: DeviceHandle,
    pub vertex_buffer: DeviceHandle,
    pub index_buffer: Option<(DeviceHandle, IndexFormat)>,
    pub uniforms: Option<DeviceHandle>,
    pub texture: Option<DeviceHandle>,
    /// Vertex range, or index range when `index_buffer` is set.
    pub elements: Range<u32>,
}

impl DrawCall {
    pub fn new(program: DeviceHandle, vertex_buffer: DeviceHandle, elements: Range<u32>) -> Self {
        Self {
            program,
            vertex_buffer,
            index_buffer: None,
            uniforms: None,
            texture: None,
            elements,
        }
    }

    pub(crate) fn handles(&self) -> impl Iterator<Item = DeviceHandle> + '_ {
        [Some(self.program), Some(self.vertex_buffer)]
            .into_iter()
            .chain([self.index_buffer.map(|(h, _)| h), self.uniforms, self.texture])
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_layout_accumulates_offsets() {
        let layout = VertexLayout::packed(&[
            VertexFormat::Float32x3,
            VertexFormat::Float32x2,
            VertexFormat::Unorm8x4,
        ]);

        assert_eq!(layout.stride, 24);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 20]);
        let locations: Vec<u32> = layout.attributes.iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![0, 1, 2]);
    }
}
