use std::sync::Arc;

use parking_lot::Mutex;

use crate::container::Container;
use crate::device::{Context, DeviceHandle, ProgramDesc, VertexLayout};
use crate::resource::{DeviceSlot, GpuResource, ResourceCore, ResourceError};

use super::Shader;

/// Linked vertex + fragment pipeline.
///
/// The program is a container over its two shaders, so attaching it attaches
/// them. The pipeline is rebuilt whenever either shader handle changes (for
/// example after `Shader::set_code`).
pub struct Program {
    container: Container,
    vertex: Arc<Shader>,
    fragment: Arc<Shader>,
    layout: VertexLayout,
    uniforms: bool,
    textured: bool,
    // Shader handles the pipeline was last built from.
    linked: Mutex<Option<(DeviceHandle, DeviceHandle)>>,
    slot: DeviceSlot,
}

impl Program {
    pub fn new(
        label: impl Into<String>,
        vertex: Arc<Shader>,
        fragment: Arc<Shader>,
        layout: VertexLayout,
    ) -> Self {
        let container = Container::new(label);
        container.register_object(&vertex);
        container.register_object(&fragment);
        Self {
            container,
            vertex,
            fragment,
            layout,
            uniforms: false,
            textured: false,
            linked: Mutex::new(None),
            slot: DeviceSlot::new(),
        }
    }

    /// Binds a uniform buffer at group 0, binding 0.
    pub fn with_uniforms(mut self) -> Self {
        self.uniforms = true;
        self
    }

    /// Samples a texture at group 0, bindings 1 (texture) and 2 (sampler).
    pub fn with_texture(mut self) -> Self {
        self.textured = true;
        self
    }

    pub fn vertex_shader(&self) -> &Arc<Shader> {
        &self.vertex
    }

    pub fn fragment_shader(&self) -> &Arc<Shader> {
        &self.fragment
    }

    #[inline]
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    #[inline]
    pub fn uses_uniforms(&self) -> bool {
        self.uniforms
    }

    #[inline]
    pub fn is_textured(&self) -> bool {
        self.textured
    }

    pub fn handle(&self) -> Result<DeviceHandle, ResourceError> {
        let label = self.container.label();
        let vertex = self
            .vertex
            .handle()
            .map_err(|err| ResourceError::dependency(label, err))?;
        let fragment = self
            .fragment
            .handle()
            .map_err(|err| ResourceError::dependency(label, err))?;

        {
            let mut linked = self.linked.lock();
            if *linked != Some((vertex, fragment)) {
                if linked.is_some() {
                    log::debug!("`{label}`: shaders changed; relinking");
                }
                *linked = Some((vertex, fragment));
                self.core().invalidate();
            }
        }

        self.slot.ensure(self.core(), |ctx, _| {
            ctx.create_program(&ProgramDesc {
                label,
                vertex,
                fragment,
                layout: &self.layout,
                uniforms: self.uniforms,
                textured: self.textured,
            })
        })
    }
}

impl GpuResource for Program {
    fn core(&self) -> &ResourceCore {
        self.container.core()
    }

    fn as_container(&self) -> Option<&Container> {
        Some(&self.container)
    }

    fn on_context_deinit(&self, _ctx: &Context) {
        self.slot.release();
        *self.linked.lock() = None;
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("container", &self.container)
            .field("vertex", &self.vertex.id())
            .field("fragment", &self.fragment.id())
            .field("slot", &self.slot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::headless::headless_context;
    use crate::device::{HandleKind, VertexFormat};

    const VS: &str = "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(); }";
    const FS: &str = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";

    fn program() -> Arc<Program> {
        Arc::new(Program::new(
            "flat",
            Arc::new(Shader::vertex("flat.vs", VS)),
            Arc::new(Shader::fragment("flat.fs", FS)),
            VertexLayout::packed(&[VertexFormat::Float32x2]),
        ))
    }

    #[test]
    fn attaching_program_attaches_shaders() {
        let (ctx, device) = headless_context();
        let program = program();
        program.init_context(&ctx);

        assert!(program.vertex_shader().initialized());
        assert!(program.fragment_shader().initialized());
        program.handle().unwrap();
        assert_eq!(device.live_count_of(HandleKind::Shader), 2);
        assert_eq!(device.live_count_of(HandleKind::Program), 1);

        program.deinit_context(&ctx);
        assert!(!program.vertex_shader().initialized());
        assert_eq!(device.live_count(), 0);
    }

    #[test]
    fn shader_edit_relinks() {
        let (ctx, device) = headless_context();
        let program = program();
        program.init_context(&ctx);

        let first = program.handle().unwrap();
        assert_eq!(program.handle().unwrap(), first);

        program.fragment_shader().set_code(FS.replace("1.0", "0.5"));
        let second = program.handle().unwrap();

        assert_ne!(first, second);
        assert_eq!(device.live_count_of(HandleKind::Program), 1);
        assert_eq!(device.live_count_of(HandleKind::Shader), 2);
    }

    #[test]
    fn broken_shader_is_a_dependency_error() {
        let (ctx, device) = headless_context();
        let program = program();
        program.fragment_shader().set_code("");
        program.init_context(&ctx);

        let err = program.handle().unwrap_err();
        assert!(matches!(err, ResourceError::Dependency { ref dependency, .. } if dependency == "flat.fs"));
        assert_eq!(device.live_count_of(HandleKind::Program), 0);
    }
}
