//! D3D Sandbox - Direct3D 11 / 12 教学沙盒
//!
//! 用固定的着色器、数据集和位图组合出若干绘制集，按课程级别（L0 ~ L5）
//! 演示非索引绘制、索引绘制、MVP、纹理、实例化和多绘制项场景。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件
//! cargo run
//!
//! # 使用 Direct3D 11 和 L3 预设（命令行覆盖）
//! cargo run -- --d3d11 --scene l3
//! ```
//!
//! # 交互
//!
//! - 左键拖动：绕世界坐标轴旋转相机
//! - 滚轮：推拉相机
//! - Space：切换连续渲染（标题栏显示 FPS）
//! - 1 ~ 4：切换所有绘制项的渲染模式
//! - Escape：退出

use std::time::Instant;

use anyhow::Context;
use d3d_sandbox::component::OrbitCamera;
use d3d_sandbox::core::{log, Config, InputAction, OrbitInput, SandboxError, SceneConfig};
use d3d_sandbox::renderer::sync::FrameStats;
use d3d_sandbox::renderer::Renderer;
use d3d_sandbox::{app_error, app_info, frame_stats};
use tracing::{debug, error, info};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

/// 应用程序入口点
///
/// # 初始化流程
///
/// 1. 加载配置文件（config.toml）
/// 2. 应用命令行参数覆盖
/// 3. 验证配置
/// 4. 初始化日志系统
/// 5. 加载场景、创建窗口和渲染器
/// 6. 启动主循环
fn main() {
    // 1. 加载配置（在初始化日志之前）
    let mut config = Config::from_file_or_default("config.toml");

    // 2. 应用命令行参数
    config.apply_args(std::env::args().skip(1));

    // 3. 验证配置
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    // 4. 初始化日志系统
    let log_file = if config.logging.file_output {
        Some(config.logging.log_file.as_str())
    } else {
        None
    };
    if let Err(e) = log::init_logger(config.logging.level, config.logging.file_output, log_file) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    app_info!(version = env!("CARGO_PKG_VERSION"), "D3D Sandbox starting...");

    if let Err(e) = run(config) {
        app_error!("{:#}", e);
        eprintln!("{:#}", e);
        std::process::exit(1);
    }

    app_info!("D3D Sandbox exited");
}

fn run(config: Config) -> anyhow::Result<()> {
    // 5. 加载场景
    let scene = SceneConfig::load(&config.scene)
        .with_context(|| format!("Failed to load scene '{}'", config.scene))?;
    let draw_sets = scene
        .into_draw_sets()
        .with_context(|| format!("Scene '{}' is invalid", config.scene))?;

    info!(
        backend = ?config.graphics.backend,
        width = config.window.width,
        height = config.window.height,
        scene = %config.scene,
        draw_sets = draw_sets.len(),
        "Graphics configuration"
    );

    // 6. 创建事件循环和窗口
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let window = WindowBuilder::new()
        .with_title(config.window.title.as_str())
        .with_inner_size(PhysicalSize::new(config.window.width, config.window.height))
        .with_resizable(config.window.resizable)
        .build(&event_loop)
        .context("Failed to create window")?;

    let size = window.inner_size();
    let mut camera = OrbitCamera::new(&config.camera, size.width, size.height);
    camera
        .setup_initial(scene.camera.target(), scene.camera.position())
        .context("Invalid scene camera")?;

    // 7. 创建渲染器
    let renderer = Renderer::new(&window, &config, draw_sets).context("Failed to initialize renderer")?;
    let title = format!("{} - {}", config.window.title, renderer.backend_name());
    window.set_title(&title);
    info!(backend = renderer.backend_name(), "Renderer initialized successfully");

    let mut app = App {
        window: &window,
        renderer: Some(renderer),
        camera,
        input: OrbitInput::new(),
        continuous: config.graphics.continuous_render,
        stats: FrameStats::new(Instant::now()),
        title,
        failure: None,
    };
    app.render();

    // 8. 启动事件循环
    info!("Entering main loop...");
    event_loop
        .run(|event, elwt| {
            match event {
                Event::WindowEvent { event, .. } => app.on_window_event(event),
                Event::AboutToWait => {
                    if app.continuous {
                        app.window.request_redraw();
                    }
                }
                _ => (),
            }

            if app.renderer.is_none() {
                elwt.exit();
            } else if app.continuous {
                elwt.set_control_flow(ControlFlow::Poll);
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        })
        .context("Event loop terminated abnormally")?;

    match app.failure {
        Some(e) => Err(e).context("Rendering failed"),
        None => Ok(()),
    }
}

/// 主循环状态
///
/// `renderer` 为 `None` 表示已经关闭，事件循环随即退出。
struct App<'w> {
    window: &'w Window,
    renderer: Option<Renderer>,
    camera: OrbitCamera,
    input: OrbitInput,
    continuous: bool,
    stats: FrameStats,
    title: String,
    failure: Option<SandboxError>,
}

impl App<'_> {
    fn on_window_event(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                app_info!("Close requested, shutting down...");
                self.shutdown();
            }
            WindowEvent::Resized(new_size) => {
                debug!(width = new_size.width, height = new_size.height, "Window resized");
                self.resize(new_size);
            }
            WindowEvent::RedrawRequested => self.render(),
            other => {
                let action = self.input.handle_window_event(&mut self.camera, &other);
                self.on_action(action);
            }
        }
    }

    fn on_action(&mut self, action: InputAction) {
        match action {
            InputAction::None => (),
            InputAction::Redraw => self.redraw(),
            InputAction::ToggleContinuous => {
                self.continuous = !self.continuous;
                info!(continuous = self.continuous, "Continuous rendering toggled");
                self.stats = FrameStats::new(Instant::now());
                self.window.set_title(&format!("{} ...", self.title));
                self.redraw();
            }
            InputAction::SetRenderMode(mode) => {
                let result = match self.renderer.as_mut() {
                    Some(renderer) => renderer.set_render_mode_all(mode),
                    None => Ok(()),
                };
                match result {
                    Ok(()) => self.redraw(),
                    Err(e) => self.fail(e),
                }
            }
            InputAction::Exit => {
                app_info!("Escape pressed, shutting down...");
                self.shutdown();
            }
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }

        self.camera.set_viewport(size.width, size.height);
        self.camera.update_projection();
        self.camera.update_view();

        let result = match self.renderer.as_mut() {
            Some(renderer) => renderer.resize(size.width, size.height),
            None => Ok(()),
        };
        match result {
            Ok(()) => self.redraw(),
            Err(e) => self.fail(e),
        }
    }

    /// 非连续模式下立即渲染，连续模式交给下一次 `RedrawRequested`
    fn redraw(&mut self) {
        if self.continuous {
            self.window.request_redraw();
        } else {
            self.render();
        }
    }

    fn render(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        if let Err(e) = renderer.render(&self.camera) {
            self.fail(e);
            return;
        }

        if self.continuous {
            if let Some(report) = self.stats.frame(Instant::now(), renderer.wait_count()) {
                frame_stats!(fps = report.fps, frame_us = report.frame_us, waits = report.waits, "Frame stats");
                self.window
                    .set_title(&format!("{} {}", self.title, report.title_suffix()));
            }
        }
    }

    fn fail(&mut self, e: SandboxError) {
        error!("Render loop failed: {}", e);
        self.failure = Some(e);
        self.shutdown();
    }

    /// 等待 GPU 空闲后释放渲染器
    fn shutdown(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            if let Err(e) = renderer.wait_for_gpu() {
                error!("Failed to wait for GPU before shutdown: {}", e);
            }
        }
    }
}
