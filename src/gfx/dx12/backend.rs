//! DirectX 12 图形后端实现
//!
//! `Dx12Backend` 组合了 `Dx12Context` 和由 `DrawSetDesc` 创建的绘制集。
//!
//! # 帧流程
//!
//! 1. `begin_frame`：重置命令列表、转换后台缓冲、清屏
//! 2. 按顺序录制每个绘制集
//! 3. `end_frame`：提交、Present、按帧节奏等待 Fence

use tracing::info;
use winit::window::Window;

use super::context::Dx12Context;
use super::draw_set::Dx12DrawSet;
use crate::component::OrbitCamera;
use crate::core::config::GraphicsConfig;
use crate::core::error::{DataError, Result};
use crate::geometry::RenderMode;
use crate::gfx::backend::RenderBackend;
use crate::math::Vector3;
use crate::renderer::draw_set::DrawSetDesc;

/// DirectX 12 图形后端
pub struct Dx12Backend {
    // 绘制集先于上下文释放，上下文 drop 时会等待 GPU
    draw_sets: Vec<Dx12DrawSet>,
    context: Dx12Context,
}

impl Dx12Backend {
    pub fn new(window: &Window, config: &GraphicsConfig, draw_sets: &[DrawSetDesc]) -> Result<Self> {
        let mut context = Dx12Context::new(window, config)?;

        let draw_sets = draw_sets
            .iter()
            .map(|desc| Dx12DrawSet::new(&mut context, desc))
            .collect::<Result<Vec<_>>>()?;

        let items: Vec<usize> = draw_sets.iter().map(Dx12DrawSet::len).collect();
        info!(draw_sets = draw_sets.len(), ?items, "DX12 backend ready");
        Ok(Self { draw_sets, context })
    }

    fn draw_set_mut(&mut self, set: usize) -> Result<&mut Dx12DrawSet> {
        let len = self.draw_sets.len();
        self.draw_sets
            .get_mut(set)
            .ok_or_else(|| DataError::IndexOutOfRange { index: set, len }.into())
    }
}

impl RenderBackend for Dx12Backend {
    fn backend_name(&self) -> &'static str {
        "DirectX 12"
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.context.resize(width, height)
    }

    fn render(&mut self, camera: &OrbitCamera) -> Result<()> {
        self.context.begin_frame()?;

        let command_list = self.context.command_list();
        for draw_set in &self.draw_sets {
            draw_set.draw(command_list, camera);
        }

        self.context.end_frame()
    }

    fn set_render_mode(&mut self, set: usize, item: usize, mode: RenderMode) -> Result<()> {
        let len = self.draw_sets.len();
        let draw_set = self
            .draw_sets
            .get_mut(set)
            .ok_or_else(|| DataError::IndexOutOfRange { index: set, len })?;
        draw_set.set_render_mode(&mut self.context, item, mode)
    }

    fn set_translation(&mut self, set: usize, item: usize, translation: Vector3) -> Result<()> {
        self.draw_set_mut(set)?.set_translation(item, translation)
    }

    fn wait_count(&self) -> u64 {
        self.context.wait_count()
    }

    fn wait_for_gpu(&mut self) -> Result<()> {
        self.context.wait_for_gpu()
    }
}
