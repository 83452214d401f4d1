//! 渲染器模块
//!
//! 本模块提供了统一的渲染接口，封装了两个 Direct3D 后端。
//! 应用程序只通过 `Renderer` 驱动帧循环，而不需要关心底层是 D3D11 还是 D3D12。
//!
//! # 架构设计
//!
//! - `Renderer`：统一的渲染器接口，对外提供一致的 API
//! - `Backend`：内部枚举，封装不同的图形后端实现
//! - `draw_set` / `shaders`：平台无关的绘制集描述和着色器源码
//! - `sync`：帧节奏控制，只依赖 `GpuFence` trait
//! - 底层实现在 `gfx` 模块中，按 API 分类组织

pub mod draw_set;
pub mod shaders;
pub mod sync;

use tracing::info;
use winit::window::Window;

use crate::component::OrbitCamera;
use crate::core::error::{DataError, Result};
use crate::core::Config;
use crate::geometry::RenderMode;
use crate::math::Vector3;
use draw_set::DrawSetDesc;

#[cfg(target_os = "windows")]
use crate::gfx::{Dx11Backend, Dx12Backend, RenderBackend};

/// 图形后端枚举
///
/// 通过枚举分发到 `RenderBackend` 的两个实现。
#[cfg(target_os = "windows")]
enum Backend {
    D3D11(Dx11Backend),
    D3D12(Dx12Backend),
}

#[cfg(target_os = "windows")]
impl Backend {
    fn as_dyn(&self) -> &dyn RenderBackend {
        match self {
            Backend::D3D11(b) => b,
            Backend::D3D12(b) => b,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn RenderBackend {
        match self {
            Backend::D3D11(b) => b,
            Backend::D3D12(b) => b,
        }
    }
}

/// 统一渲染器
///
/// 同时保留一份绘制集描述，记录每个绘制项当前的渲染模式和平移。
pub struct Renderer {
    #[cfg(target_os = "windows")]
    backend: Backend,
    draw_sets: Vec<DrawSetDesc>,
}

impl Renderer {
    #[cfg(target_os = "windows")]
    pub fn new(window: &Window, config: &Config, draw_sets: Vec<DrawSetDesc>) -> Result<Self> {
        use crate::core::config::GraphicsBackend;
        use crate::core::log::ENGINE_TARGET;

        // 关闭时按 FmtSpan::CLOSE 输出后端初始化的耗时
        let span = tracing::info_span!(target: ENGINE_TARGET, "backend", api = config.graphics.backend.name());
        let _enter = span.enter();

        let backend = match config.graphics.backend {
            GraphicsBackend::D3d11 => {
                crate::engine_info!("Initializing DX11 Backend");
                Backend::D3D11(Dx11Backend::new(window, &config.graphics, &draw_sets)?)
            }
            GraphicsBackend::D3d12 => {
                crate::engine_info!("Initializing DX12 Backend");
                Backend::D3D12(Dx12Backend::new(window, &config.graphics, &draw_sets)?)
            }
        };

        Ok(Self { backend, draw_sets })
    }

    #[cfg(not(target_os = "windows"))]
    pub fn new(_window: &Window, config: &Config, _draw_sets: Vec<DrawSetDesc>) -> Result<Self> {
        Err(crate::core::error::SandboxError::Initialization(format!(
            "{} backend is only available on Windows",
            config.graphics.backend.name()
        )))
    }

    /// 后端名称
    pub fn backend_name(&self) -> &'static str {
        #[cfg(target_os = "windows")]
        {
            self.backend.as_dyn().backend_name()
        }
        #[cfg(not(target_os = "windows"))]
        {
            "none"
        }
    }

    /// 当前的绘制集描述
    pub fn draw_sets(&self) -> &[DrawSetDesc] {
        &self.draw_sets
    }

    fn draw_set_mut(&mut self, set: usize) -> Result<&mut DrawSetDesc> {
        let len = self.draw_sets.len();
        self.draw_sets
            .get_mut(set)
            .ok_or_else(|| DataError::IndexOutOfRange { index: set, len }.into())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        #[cfg(target_os = "windows")]
        {
            self.backend.as_dyn_mut().resize(width, height)
        }
        #[cfg(not(target_os = "windows"))]
        {
            let _ = (width, height);
            Ok(())
        }
    }

    /// 绘制一帧
    pub fn render(&mut self, camera: &OrbitCamera) -> Result<()> {
        #[cfg(target_os = "windows")]
        {
            self.backend.as_dyn_mut().render(camera)
        }
        #[cfg(not(target_os = "windows"))]
        {
            let _ = camera;
            Ok(())
        }
    }

    /// 修改一个绘制项的渲染模式
    pub fn set_render_mode(&mut self, set: usize, item: usize, mode: RenderMode) -> Result<()> {
        self.draw_set_mut(set)?.set_render_mode(item, mode)?;

        #[cfg(target_os = "windows")]
        self.backend.as_dyn_mut().set_render_mode(set, item, mode)?;

        Ok(())
    }

    /// 把所有绘制项切换到同一个渲染模式
    pub fn set_render_mode_all(&mut self, mode: RenderMode) -> Result<()> {
        let sizes: Vec<usize> = self.draw_sets.iter().map(|set| set.len()).collect();
        for (set, len) in sizes.into_iter().enumerate() {
            for item in 0..len {
                self.set_render_mode(set, item, mode)?;
            }
        }

        info!(?mode, "Render mode applied to all items");
        Ok(())
    }

    /// 修改一个绘制项的模型平移
    pub fn set_translation(&mut self, set: usize, item: usize, translation: Vector3) -> Result<()> {
        self.draw_set_mut(set)?.set_translation(item, translation)?;

        #[cfg(target_os = "windows")]
        self.backend.as_dyn_mut().set_translation(set, item, translation)?;

        Ok(())
    }

    /// CPU 等待 GPU 的累计次数
    pub fn wait_count(&self) -> u64 {
        #[cfg(target_os = "windows")]
        {
            self.backend.as_dyn().wait_count()
        }
        #[cfg(not(target_os = "windows"))]
        {
            0
        }
    }

    pub fn wait_for_gpu(&mut self) -> Result<()> {
        #[cfg(target_os = "windows")]
        {
            self.backend.as_dyn_mut().wait_for_gpu()
        }
        #[cfg(not(target_os = "windows"))]
        {
            Ok(())
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.wait_for_gpu() {
            crate::engine_error!("Failed to wait for GPU on shutdown: {}", e);
        }
        crate::engine_info!(backend = self.backend_name(), "Renderer released");
    }
}
