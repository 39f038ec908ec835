mod common;

use std::sync::Arc;

use common::{FS, VS, setup};
use ember_engine::device::wgpu_backend::{WgpuFactory, WgpuInit};
use ember_engine::device::{Context, ContextFactory, ContextFormat};
use ember_engine::resource::{GpuResource, ResourceError};
use ember_engine::resources::{Program, Shader, VertexFormat, VertexLayout};

/// Offscreen wgpu context, or `None` on machines without a usable adapter.
fn offscreen_context() -> Option<Context> {
    setup();
    match WgpuFactory::new(WgpuInit::default()).create(&ContextFormat::default()) {
        Ok(ctx) => Some(ctx),
        Err(err) => {
            eprintln!("skipping: no wgpu adapter ({err:#})");
            None
        }
    }
}

#[test]
fn pipeline_rejected_by_device_is_a_build_error() {
    let Some(ctx) = offscreen_context() else {
        return;
    };

    // The vertex shader reads location 0, but the layout provides nothing.
    let program = Arc::new(Program::new(
        "unfed",
        Arc::new(Shader::vertex("unfed.vs", VS)),
        Arc::new(Shader::fragment("unfed.fs", FS)),
        VertexLayout::default(),
    ));
    program.init_context(&ctx);

    let err = program.handle().unwrap_err();
    assert!(matches!(err, ResourceError::Build { .. }), "{err}");
    assert!(!program.valid());

    // Cached failure: a second access reports without rebuilding.
    assert!(program.handle().is_err());
    program.deinit_context(&ctx);
}

#[test]
fn well_formed_program_builds() {
    let Some(ctx) = offscreen_context() else {
        return;
    };

    let program = Arc::new(Program::new(
        "fed",
        Arc::new(Shader::vertex("fed.vs", VS)),
        Arc::new(Shader::fragment("fed.fs", FS)),
        VertexLayout::packed(&[VertexFormat::Float32x2]),
    ));
    program.init_context(&ctx);

    assert!(program.handle().is_ok());
    assert!(program.valid());
    program.deinit_context(&ctx);
}
