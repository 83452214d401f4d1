//! DirectX 11 图形后端实现

use tracing::info;
use winit::window::Window;

use super::context::Dx11Context;
use super::draw_set::Dx11DrawSet;
use crate::component::OrbitCamera;
use crate::core::config::GraphicsConfig;
use crate::core::error::{DataError, Result};
use crate::geometry::RenderMode;
use crate::gfx::backend::RenderBackend;
use crate::math::Vector3;
use crate::renderer::draw_set::DrawSetDesc;

/// DirectX 11 图形后端
pub struct Dx11Backend {
    draw_sets: Vec<Dx11DrawSet>,
    context: Dx11Context,
}

impl Dx11Backend {
    pub fn new(window: &Window, config: &GraphicsConfig, draw_sets: &[DrawSetDesc]) -> Result<Self> {
        let context = Dx11Context::new(window, config)?;

        let draw_sets = draw_sets
            .iter()
            .map(|desc| Dx11DrawSet::new(&context, desc))
            .collect::<Result<Vec<_>>>()?;

        let items: Vec<usize> = draw_sets.iter().map(Dx11DrawSet::len).collect();
        info!(draw_sets = draw_sets.len(), ?items, "DX11 backend ready");
        Ok(Self { draw_sets, context })
    }

    fn draw_set_mut(&mut self, set: usize) -> Result<&mut Dx11DrawSet> {
        let len = self.draw_sets.len();
        self.draw_sets
            .get_mut(set)
            .ok_or_else(|| DataError::IndexOutOfRange { index: set, len }.into())
    }
}

impl RenderBackend for Dx11Backend {
    fn backend_name(&self) -> &'static str {
        "DirectX 11"
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.context.resize(width, height)
    }

    fn render(&mut self, camera: &OrbitCamera) -> Result<()> {
        self.context.begin_frame()?;

        for draw_set in &self.draw_sets {
            draw_set.draw(&self.context, camera)?;
        }

        self.context.end_frame()
    }

    fn set_render_mode(&mut self, set: usize, item: usize, mode: RenderMode) -> Result<()> {
        self.draw_set_mut(set)?.set_render_mode(item, mode)
    }

    fn set_translation(&mut self, set: usize, item: usize, translation: Vector3) -> Result<()> {
        self.draw_set_mut(set)?.set_translation(item, translation)
    }

    fn wait_for_gpu(&mut self) -> Result<()> {
        self.context.wait_for_gpu()
    }
}
