mod common;

use std::sync::Arc;

use common::{EventLog, QuadRenderer, setup};
use ember_engine::coords::{Color, Viewport};
use ember_engine::device::headless::{DeviceOp, HeadlessFactory, headless_context};
use ember_engine::device::{
    BufferUsage, ContextFactory, ContextFormat, HandleKind, RenderTarget,
};
use ember_engine::render::{Canvas, CanvasState, Renderer};
use ember_engine::resource::GpuResource;
use ember_engine::resources::{Buffer, Texture};

const V: Viewport = Viewport::from_size(640, 480);

fn last_draw_program(ops: &[DeviceOp]) -> Option<u64> {
    ops.iter().rev().find_map(|op| match op {
        DeviceOp::Draw { program, .. } => Some(program.0),
        _ => None,
    })
}

// ── readiness ────────────────────────────────────────────────────────────

#[test]
fn frames_wait_for_context_and_viewport() {
    setup();
    let (ctx, device) = headless_context();
    let log = EventLog::default();
    let canvas = Canvas::new();
    canvas.set_renderer(Some(QuadRenderer::new("r", &log)));

    assert_eq!(canvas.state(), CanvasState::Unbound);
    assert!(!canvas.render(RenderTarget::Surface));

    canvas.set_context(Some(ctx.clone()));
    assert_eq!(canvas.state(), CanvasState::BoundUninitialized);
    assert!(!canvas.render(RenderTarget::Surface));
    assert_eq!(device.frames_completed(), 0);
    assert_eq!(log.count("render:r"), 0);

    canvas.set_viewport(V);
    assert_eq!(canvas.state(), CanvasState::Ready);
    assert!(canvas.render(RenderTarget::Surface));
    assert_eq!(device.frames_completed(), 1);
    assert_eq!(device.draw_count(), 1);
    assert_eq!(log.count("render:r"), 1);
}

#[test]
fn viewport_set_before_attach_reaches_the_renderer() {
    setup();
    let (ctx, _device) = headless_context();
    let log = EventLog::default();
    let renderer = QuadRenderer::new("r", &log);
    let canvas = Canvas::new();
    canvas.set_renderer(Some(renderer.clone()));
    canvas.render(RenderTarget::Surface);

    canvas.set_viewport(V);
    assert_eq!(canvas.state(), CanvasState::Unbound);
    assert_eq!(renderer.viewport(), None);

    canvas.init_context(&ctx);
    assert_eq!(canvas.state(), CanvasState::Ready);
    assert_eq!(renderer.viewport(), Some(V));
}

#[test]
fn detach_clears_viewport_and_releases_handles() {
    setup();
    let (ctx, device) = headless_context();
    let log = EventLog::default();
    let renderer = QuadRenderer::new("r", &log);
    let canvas = Canvas::new();
    canvas.set_renderer(Some(renderer.clone()));
    canvas.set_context(Some(ctx.clone()));
    canvas.set_viewport(V);
    assert!(canvas.render(RenderTarget::Surface));
    assert!(device.live_count() > 0);

    assert!(canvas.deinit_context(&ctx));
    assert!(!canvas.deinit_context(&ctx));
    assert_eq!(canvas.state(), CanvasState::Unbound);
    assert_eq!(canvas.viewport(), None);
    assert!(!renderer.initialized());
    assert_eq!(device.live_count(), 0);
}

#[test]
fn second_context_is_refused_until_detached() {
    setup();
    let (k1, _d1) = headless_context();
    let (k2, _d2) = headless_context();
    let canvas = Canvas::new();

    assert!(canvas.init_context(&k1));
    assert!(!canvas.init_context(&k2));
    assert!(!canvas.deinit_context(&k2));
    assert_eq!(canvas.context(), Some(k1));
}

// ── renderer swap ────────────────────────────────────────────────────────

#[test]
fn hot_swap_detaches_old_before_attaching_new() {
    setup();
    let (ctx, device) = headless_context();
    let log = EventLog::default();
    let a = QuadRenderer::new("a", &log);
    let b = QuadRenderer::new("b", &log);
    let canvas = Canvas::new();
    canvas.set_context(Some(ctx.clone()));
    canvas.set_viewport(V);
    canvas.set_renderer(Some(a.clone()));
    assert!(canvas.render(RenderTarget::Surface));

    log.clear();
    canvas.set_renderer(Some(b.clone()));
    assert!(canvas.needs_redraw());
    // Still the old renderer until the next frame.
    assert_eq!(canvas.renderer().map(|r| r.id()), Some(a.id()));

    assert!(canvas.render(RenderTarget::Surface));
    assert_eq!(
        log.events(),
        ["deinit:a", "init:b", "viewport:b:640x480", "render:b"]
    );
    assert!(!a.initialized());
    assert_eq!(canvas.renderer().map(|r| r.id()), Some(b.id()));

    let b_program = b.program().handle().unwrap();
    assert_eq!(last_draw_program(&device.ops()), Some(b_program.raw().0));
    // Only b's resources remain.
    assert_eq!(device.live_count(), 5);
}

#[test]
fn removing_the_renderer_detaches_it() {
    setup();
    let (ctx, device) = headless_context();
    let log = EventLog::default();
    let a = QuadRenderer::new("a", &log);
    let canvas = Canvas::new();
    canvas.set_context(Some(ctx));
    canvas.set_viewport(V);
    canvas.set_renderer(Some(a.clone()));
    canvas.render(RenderTarget::Surface);

    canvas.set_renderer(None);
    assert!(!canvas.render(RenderTarget::Surface));
    assert!(!a.initialized());
    assert!(canvas.renderer().is_none());
    assert_eq!(device.live_count(), 0);
}

#[test]
fn switching_contexts_rebuilds_under_the_new_one() {
    setup();
    let factory = HeadlessFactory::new();
    let k1 = factory.create(&ContextFormat::default()).unwrap();
    let k2 = factory.create(&ContextFormat::default()).unwrap();
    let devices = factory.devices();
    let log = EventLog::default();
    let renderer = QuadRenderer::new("r", &log);
    let canvas = Canvas::new();
    canvas.set_renderer(Some(renderer.clone()));
    canvas.set_context(Some(k1.clone()));
    canvas.set_viewport(V);
    assert!(canvas.render(RenderTarget::Surface));

    canvas.set_context(Some(k2.clone()));
    assert_eq!(devices[0].live_count(), 0);
    assert_eq!(canvas.state(), CanvasState::BoundUninitialized);

    canvas.set_viewport(V);
    assert!(canvas.render(RenderTarget::Surface));
    assert_eq!(renderer.program().handle().unwrap().context(), k2.id());
    assert_eq!(devices[1].draw_count(), 1);
    assert_eq!(log.count("init:r"), 2);
    assert_eq!(log.count("deinit:r"), 1);
}

#[test]
fn dropping_the_canvas_detaches_its_renderer() {
    setup();
    let (ctx, device) = headless_context();
    let log = EventLog::default();
    let renderer = QuadRenderer::new("r", &log);
    let canvas = Canvas::new();
    canvas.set_renderer(Some(renderer.clone()));
    canvas.set_context(Some(ctx));
    canvas.set_viewport(V);
    canvas.render(RenderTarget::Surface);

    drop(canvas);
    assert!(!renderer.initialized());
    assert_eq!(device.live_count(), 0);
}

// ── frames ───────────────────────────────────────────────────────────────

#[test]
fn rejected_descriptor_skips_the_draw() {
    setup();
    let (ctx, device) = headless_context();
    device.reject(HandleKind::Program, true);
    let log = EventLog::default();
    let renderer = QuadRenderer::new("r", &log);
    let canvas = Canvas::new();
    canvas.set_renderer(Some(renderer.clone()));
    canvas.set_context(Some(ctx));
    canvas.set_viewport(V);

    assert!(canvas.render(RenderTarget::Surface));
    assert_eq!(device.draw_count(), 0);
    assert_eq!(device.frames_completed(), 1);
    assert!(!renderer.program().valid());
    assert_eq!(device.live_count_of(HandleKind::Program), 0);
}

#[test]
fn resources_registered_while_attached_are_initialized_next_frame() {
    setup();
    let (ctx, _device) = headless_context();
    let log = EventLog::default();
    let renderer = QuadRenderer::new("r", &log);
    let canvas = Canvas::new();
    canvas.set_renderer(Some(renderer.clone()));
    canvas.set_context(Some(ctx));
    canvas.set_viewport(V);
    canvas.render(RenderTarget::Surface);

    let late = Arc::new(Buffer::from_slice("late", BufferUsage::Uniform, &[0.0f32; 4]));
    renderer.container().register_object(&late);
    assert!(!late.initialized());

    canvas.render(RenderTarget::Surface);
    assert!(late.initialized());
    assert!(late.handle().is_ok());
}

#[test]
fn clear_color_and_offscreen_target_reach_the_device() {
    setup();
    let (ctx, device) = headless_context();
    let log = EventLog::default();
    let renderer = QuadRenderer::new("r", &log);
    let target = Arc::new(Texture::render_target("offscreen", 64, 64));
    renderer.container().register_object(&target);

    let canvas = Canvas::new();
    canvas.set_renderer(Some(renderer));
    canvas.set_context(Some(ctx));
    canvas.set_viewport(Viewport::from_size(64, 64));
    canvas.set_clear_color(Color::white());
    canvas.render(RenderTarget::Surface);

    let handle = target.handle().unwrap();
    assert!(canvas.render(RenderTarget::Texture(handle)));
    let begin = device.ops().into_iter().rev().find_map(|op| match op {
        DeviceOp::BeginFrame { target, clear, .. } => Some((target, clear)),
        _ => None,
    });
    assert_eq!(
        begin,
        Some((RenderTarget::Texture(handle), Some(Color::white())))
    );
}

#[test]
fn update_consumes_accumulated_time() {
    setup();
    let log = EventLog::default();
    let renderer = QuadRenderer::new("r", &log);
    let canvas = Canvas::new();
    assert!(!canvas.update());

    canvas.set_renderer(Some(renderer.clone()));
    canvas.render(RenderTarget::Surface);
    renderer.schedule_update();
    assert!(canvas.needs_update());

    canvas.update_time();
    canvas.update_time();
    assert!(canvas.accumulated_time() > 0.0);

    assert!(canvas.update());
    assert_eq!(canvas.accumulated_time(), 0.0);
    assert!(!canvas.needs_update());
    assert_eq!(log.count("update:r"), 1);
}
