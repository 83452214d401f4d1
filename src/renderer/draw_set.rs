//! 绘制集描述
//!
//! 平台无关的绘制集：每个绘制项包含着色器、网格、可选纹理、渲染模式和模型平移。
//! 后端根据 `DrawSetDesc` 创建各自的 GPU 对象。
//!
//! # 课程级别
//!
//! - L0：非索引绘制，无 MVP
//! - L1：索引绘制，无 MVP
//! - L2：索引 + MVP
//! - L3：索引 + MVP + 纹理（交错缓冲 `A1B1` 或分离缓冲 `A1B2`）
//! - L4：L3 + 实例化（`A1B1I2` / `A1B2I3`）
//! - L5：多个子绘制集，每个都有自己的几何、纹理、模型矩阵和渲染模式

use crate::core::error::{DataError, Result};
use crate::geometry::{Bitmap, InputLayoutKind, MeshData, RenderMode};
use crate::math::{matrix, Matrix4, Vector3};

use super::shaders::ShaderKind;

/// 课程级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DrawSetLevel {
    L0,
    L1,
    L2,
    L3,
    L4,
    L5,
}

/// 根签名种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootSignatureKind {
    /// 只允许输入装配布局
    Empty = 0,
    /// b0 上 16 个 32 位根常量（MVP）
    MvpConstants = 1,
    /// MVP + t0 上的 SRV 描述符表 + s0 静态采样器
    MvpTexture = 2,
}

/// 一个绘制项
#[derive(Debug, Clone)]
pub struct DrawItem {
    pub shader: ShaderKind,
    pub mesh: MeshData,
    pub texture: Option<Bitmap>,
    pub render_mode: RenderMode,
    pub translation: Vector3,
}

impl DrawItem {
    pub fn new(shader: ShaderKind, mesh: MeshData) -> Self {
        Self {
            shader,
            mesh,
            texture: None,
            render_mode: RenderMode::Solid,
            translation: Vector3::zeros(),
        }
    }

    pub fn with_texture(mut self, texture: Bitmap) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    pub fn with_translation(mut self, translation: Vector3) -> Self {
        self.translation = translation;
        self
    }

    /// 由网格携带的数据流推导输入布局
    pub fn layout(&self) -> Result<InputLayoutKind> {
        self.mesh.layout()
    }

    pub fn root_signature_kind(&self) -> RootSignatureKind {
        let bindings = self.shader.required_bindings();
        match (bindings.mvp, bindings.texture) {
            (_, true) => RootSignatureKind::MvpTexture,
            (true, false) => RootSignatureKind::MvpConstants,
            (false, false) => RootSignatureKind::Empty,
        }
    }

    /// 模型矩阵
    pub fn model(&self) -> Matrix4 {
        matrix::translation(&self.translation)
    }

    /// 这个绘制项单独构成绘制集时的级别
    pub fn level(&self) -> DrawSetLevel {
        let bindings = self.shader.required_bindings();
        if !bindings.mvp {
            if self.mesh.is_indexed() {
                DrawSetLevel::L1
            } else {
                DrawSetLevel::L0
            }
        } else if self.shader.uses_instances() {
            DrawSetLevel::L4
        } else if bindings.texture {
            DrawSetLevel::L3
        } else {
            DrawSetLevel::L2
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.mesh.validate()?;
        self.mesh.topology.pipeline_type()?;

        let layout = self.mesh.layout()?;
        if !self.shader.accepted_layouts().contains(&layout) {
            return Err(DataError::LayoutMismatch {
                shader: self.shader.name().to_string(),
                layout: format!("{:?}", layout),
            }
            .into());
        }

        let bindings = self.shader.required_bindings();
        if bindings.texture != self.texture.is_some() {
            return Err(DataError::InvalidDrawSet(format!(
                "shader {} {} a texture",
                self.shader.name(),
                if bindings.texture { "requires" } else { "does not take" }
            ))
            .into());
        }

        Ok(())
    }
}

/// 绘制集描述
#[derive(Debug, Clone, Default)]
pub struct DrawSetDesc {
    pub items: Vec<DrawItem>,
}

impl DrawSetDesc {
    pub fn new(items: Vec<DrawItem>) -> Self {
        Self { items }
    }

    pub fn single(item: DrawItem) -> Self {
        Self { items: vec![item] }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 多于一项时为 L5
    pub fn level(&self) -> Option<DrawSetLevel> {
        match self.items.as_slice() {
            [] => None,
            [item] => Some(item.level()),
            _ => Some(DrawSetLevel::L5),
        }
    }

    pub fn item(&self, index: usize) -> Result<&DrawItem> {
        let len = self.items.len();
        self.items
            .get(index)
            .ok_or_else(|| DataError::IndexOutOfRange { index, len }.into())
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut DrawItem> {
        let len = self.items.len();
        self.items
            .get_mut(index)
            .ok_or_else(|| DataError::IndexOutOfRange { index, len }.into())
    }

    pub fn set_render_mode(&mut self, index: usize, mode: RenderMode) -> Result<()> {
        self.item_mut(index)?.render_mode = mode;
        Ok(())
    }

    pub fn set_translation(&mut self, index: usize, translation: Vector3) -> Result<()> {
        self.item_mut(index)?.translation = translation;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(DataError::InvalidDrawSet("draw set has no items".to_string()).into());
        }

        for (i, item) in self.items.iter().enumerate() {
            item.validate().map_err(|e| {
                DataError::InvalidDrawSet(format!("item {}: {}", i, e))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SandboxError;
    use crate::geometry::{bitmap, datasets};

    fn textured(z: f32) -> DrawItem {
        DrawItem::new(ShaderKind::Float3B, datasets::triang1(z))
            .with_texture(bitmap::hard_coded_bitmap(2).unwrap())
    }

    #[test]
    fn test_levels() {
        assert_eq!(DrawItem::new(ShaderKind::Float2NoMvs3, datasets::line1_direct(0.0)).level(), DrawSetLevel::L0);
        assert_eq!(DrawItem::new(ShaderKind::Float2NoMvs3, datasets::line1(0.0)).level(), DrawSetLevel::L1);
        assert_eq!(DrawItem::new(ShaderKind::Float2, datasets::line1(0.0)).level(), DrawSetLevel::L2);
        assert_eq!(textured(0.5).level(), DrawSetLevel::L3);

        let instanced = DrawItem::new(
            ShaderKind::Float3Instance,
            datasets::triang1(0.3).with_instances(datasets::instance1()),
        );
        assert_eq!(instanced.level(), DrawSetLevel::L4);

        let multi = DrawSetDesc::new(vec![textured(0.3), textured(0.6)]);
        assert_eq!(multi.level(), Some(DrawSetLevel::L5));
    }

    #[test]
    fn test_root_signature_kind() {
        let l0 = DrawItem::new(ShaderKind::Float2NoMvs1, datasets::line1_direct(0.0));
        assert_eq!(l0.root_signature_kind(), RootSignatureKind::Empty);

        let l2 = DrawItem::new(ShaderKind::Float2, datasets::line1(0.0));
        assert_eq!(l2.root_signature_kind(), RootSignatureKind::MvpConstants);

        assert_eq!(textured(0.0).root_signature_kind(), RootSignatureKind::MvpTexture);
    }

    #[test]
    fn test_validate_texture_requirement() {
        let missing = DrawItem::new(ShaderKind::Float3B, datasets::triang1(0.0));
        assert!(missing.validate().is_err());

        let extra = DrawItem::new(ShaderKind::Float2, datasets::line1(0.0))
            .with_texture(bitmap::hard_coded_bitmap(1).unwrap());
        assert!(extra.validate().is_err());

        assert!(textured(0.0).validate().is_ok());
    }

    #[test]
    fn test_validate_layout_mismatch() {
        let item = DrawItem::new(ShaderKind::Float3B, datasets::line1(0.0))
            .with_texture(bitmap::hard_coded_bitmap(1).unwrap());
        let err = item.validate().unwrap_err();
        assert!(matches!(err, SandboxError::Data(DataError::LayoutMismatch { .. })), "{}", err);
        assert!(err.to_string().contains("float3B"));

        let axes = DrawItem::new(ShaderKind::Float3, datasets::axes_xyz());
        assert!(axes.validate().is_err());
        assert!(DrawItem::new(ShaderKind::Float3D, datasets::axes_xyz()).validate().is_ok());

        // 分离缓冲的三角形同样满足 float3B
        let separate = DrawItem::new(ShaderKind::Float3B, datasets::triang2(0.0))
            .with_texture(bitmap::hard_coded_bitmap(2).unwrap());
        assert!(separate.validate().is_ok());
    }

    #[test]
    fn test_validate_instances() {
        let item = DrawItem::new(ShaderKind::Float3Instance, datasets::triang1(0.3))
            .with_texture(bitmap::hard_coded_bitmap(2).unwrap());
        assert!(item.validate().is_err());

        let desc = DrawSetDesc::single(item);
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_set_render_mode_and_translation() {
        let mut desc = DrawSetDesc::new(vec![textured(0.3), textured(0.6)]);

        desc.set_render_mode(1, RenderMode::Wireframe).unwrap();
        desc.set_translation(0, Vector3::new(1.0, 0.0, 0.0)).unwrap();

        assert_eq!(desc.item(1).unwrap().render_mode, RenderMode::Wireframe);
        assert_eq!(desc.item(0).unwrap().model()[(0, 3)], 1.0);
        assert!(desc.set_render_mode(2, RenderMode::Solid).is_err());
        assert!(desc.item(5).is_err());
    }

    #[test]
    fn test_empty_draw_set_invalid() {
        assert!(DrawSetDesc::default().validate().is_err());
        assert_eq!(DrawSetDesc::default().level(), None);
    }
}
