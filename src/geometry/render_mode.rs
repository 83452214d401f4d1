//! 渲染模式
//!
//! 每个绘制项可以独立切换实心、线框以及只画正面或背面。

use serde::{Deserialize, Serialize};

/// 填充模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    Solid,
    Wireframe,
}

/// 剔除模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// 光栅化状态描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterizerSpec {
    pub fill: FillMode,
    pub cull: CullMode,
    pub depth_clip: bool,
}

/// 渲染模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Solid,
    Wireframe,
    /// 只画背面（剔除正面）
    SolidBackOnly,
    /// 只画正面（剔除背面）
    SolidFrontOnly,
}

impl RenderMode {
    /// 按快捷键 1..4 的顺序排列
    pub const ALL: [RenderMode; 4] = [
        RenderMode::Solid,
        RenderMode::Wireframe,
        RenderMode::SolidBackOnly,
        RenderMode::SolidFrontOnly,
    ];

    pub fn rasterizer(&self) -> RasterizerSpec {
        let (fill, cull) = match self {
            RenderMode::Solid => (FillMode::Solid, CullMode::None),
            RenderMode::Wireframe => (FillMode::Wireframe, CullMode::None),
            RenderMode::SolidBackOnly => (FillMode::Solid, CullMode::Front),
            RenderMode::SolidFrontOnly => (FillMode::Solid, CullMode::Back),
        };

        RasterizerSpec { fill, cull, depth_clip: true }
    }

    /// 在 `ALL` 中的下标，D3D11 后端用它选择预先创建的光栅化状态
    pub fn index(&self) -> usize {
        match self {
            RenderMode::Solid => 0,
            RenderMode::Wireframe => 1,
            RenderMode::SolidBackOnly => 2,
            RenderMode::SolidFrontOnly => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rasterizer_mapping() {
        let wire = RenderMode::Wireframe.rasterizer();
        assert_eq!(wire.fill, FillMode::Wireframe);
        assert_eq!(wire.cull, CullMode::None);

        assert_eq!(RenderMode::Solid.rasterizer().cull, CullMode::None);
        assert_eq!(RenderMode::SolidBackOnly.rasterizer().cull, CullMode::Front);
        assert_eq!(RenderMode::SolidFrontOnly.rasterizer().cull, CullMode::Back);
        assert!(RenderMode::ALL.iter().all(|m| m.rasterizer().depth_clip));
    }

    #[test]
    fn test_index_matches_all() {
        for (i, mode) in RenderMode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), i);
        }
    }
}
