//! 着色器定义
//!
//! 本模块包含了课程使用的全部 HLSL 着色器源码。
//! 每个源码都有 `VSMain` / `PSMain` 两个入口，运行时由 `D3DCompile`
//! 编译为 `vs_5_0` / `ps_5_0`，两个后端共用同一份源码。
//!
//! # 寄存器约定
//!
//! | 资源 | 寄存器 |
//! |------|--------|
//! | MVP 常量 | b0 |
//! | 纹理 | t0 |
//! | 采样器 | s0 |

use serde::{Deserialize, Serialize};

use crate::geometry::{InputLayoutKind, VertexFormat};

/// MVP 常量缓冲所在的 b 寄存器
pub const MVP_REGISTER_B: u32 = 0;
/// 纹理所在的 t 寄存器
pub const TEXTURE_REGISTER_T: u32 = 0;
/// 采样器所在的 s 寄存器
pub const SAMPLER_REGISTER_S: u32 = 0;
/// 额外常量缓冲的寄存器
pub const CB_1_REGISTER_B: u32 = 4;
pub const CB_2_REGISTER_B: u32 = 5;

/// 顶点着色器入口
pub const VS_ENTRY: &str = "VSMain";
/// 像素着色器入口
pub const PS_ENTRY: &str = "PSMain";
/// 顶点着色器目标
pub const VS_TARGET: &str = "vs_5_0";
/// 像素着色器目标
pub const PS_TARGET: &str = "ps_5_0";

/// 课程中使用的着色器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderKind {
    #[serde(rename = "float2_NoMVS1")]
    Float2NoMvs1,
    #[serde(rename = "float2_NoMVS2")]
    Float2NoMvs2,
    #[serde(rename = "float2_NoMVS3")]
    Float2NoMvs3,
    #[serde(rename = "float2")]
    Float2,
    #[serde(rename = "float3B")]
    Float3B,
    #[serde(rename = "float3C")]
    Float3C,
    #[serde(rename = "float3_Instance")]
    Float3Instance,
    #[serde(rename = "float2_InstanceC")]
    Float2InstanceC,
    #[serde(rename = "float2A_Instance")]
    Float2AInstance,
    #[serde(rename = "float3")]
    Float3,
    #[serde(rename = "float2D")]
    Float2D,
    #[serde(rename = "float3D")]
    Float3D,
    #[serde(rename = "float3_VsInput")]
    Float3VsInput,
}

/// 着色器需要绑定的资源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderBindings {
    /// b0 上的 MVP
    pub mvp: bool,
    /// t0 上的纹理（以及 s0 上的采样器）
    pub texture: bool,
}

impl ShaderKind {
    /// HLSL 源码
    pub fn source(&self) -> &'static str {
        match self {
            ShaderKind::Float2NoMvs1 => include_str!("shaders/float2_no_mvp1.hlsl"),
            ShaderKind::Float2NoMvs2 => include_str!("shaders/float2_no_mvp2.hlsl"),
            ShaderKind::Float2NoMvs3 => include_str!("shaders/float2_no_mvp3.hlsl"),
            ShaderKind::Float2 => include_str!("shaders/float2.hlsl"),
            ShaderKind::Float3B => include_str!("shaders/float3_b.hlsl"),
            ShaderKind::Float3C => include_str!("shaders/float3_c.hlsl"),
            ShaderKind::Float3Instance => include_str!("shaders/float3_instance.hlsl"),
            ShaderKind::Float2InstanceC => include_str!("shaders/float2_instance_c.hlsl"),
            ShaderKind::Float2AInstance => include_str!("shaders/float2a_instance.hlsl"),
            ShaderKind::Float3 => include_str!("shaders/float3.hlsl"),
            ShaderKind::Float2D => include_str!("shaders/float2_d.hlsl"),
            ShaderKind::Float3D => include_str!("shaders/float3_d.hlsl"),
            ShaderKind::Float3VsInput => include_str!("shaders/float3_vs_input.hlsl"),
        }
    }

    /// 名称，用于日志和错误信息
    pub fn name(&self) -> &'static str {
        match self {
            ShaderKind::Float2NoMvs1 => "float2_NoMVS1",
            ShaderKind::Float2NoMvs2 => "float2_NoMVS2",
            ShaderKind::Float2NoMvs3 => "float2_NoMVS3",
            ShaderKind::Float2 => "float2",
            ShaderKind::Float3B => "float3B",
            ShaderKind::Float3C => "float3C",
            ShaderKind::Float3Instance => "float3_Instance",
            ShaderKind::Float2InstanceC => "float2_InstanceC",
            ShaderKind::Float2AInstance => "float2A_Instance",
            ShaderKind::Float3 => "float3",
            ShaderKind::Float2D => "float2D",
            ShaderKind::Float3D => "float3D",
            ShaderKind::Float3VsInput => "float3_VsInput",
        }
    }

    pub fn required_bindings(&self) -> ShaderBindings {
        let (mvp, texture) = match self {
            ShaderKind::Float2NoMvs1 | ShaderKind::Float2NoMvs2 | ShaderKind::Float2NoMvs3 => (false, false),
            ShaderKind::Float3B | ShaderKind::Float3Instance | ShaderKind::Float3VsInput => (true, true),
            _ => (true, false),
        };

        ShaderBindings { mvp, texture }
    }

    /// 是否读取 `entryInstance` 逐实例数据
    pub fn uses_instances(&self) -> bool {
        matches!(
            self,
            ShaderKind::Float3Instance | ShaderKind::Float2InstanceC | ShaderKind::Float2AInstance
        )
    }

    /// 顶点着色器输入签名能接受的输入布局
    ///
    /// `entryA` / `entryB` 交错存放还是分两个缓冲，对着色器来说是同一个签名。
    pub fn accepted_layouts(&self) -> Vec<InputLayoutKind> {
        use InputLayoutKind::*;
        use VertexFormat::{Float1, Float2, Float3};

        let pair = |a, b| vec![A1B1(a, b), A1B2(a, b)];

        match self {
            ShaderKind::Float2NoMvs1 | ShaderKind::Float2NoMvs2 | ShaderKind::Float2NoMvs3 | ShaderKind::Float2 => {
                vec![A1(Float2)]
            }
            ShaderKind::Float3 => vec![A1(Float3)],
            ShaderKind::Float3B | ShaderKind::Float3C => pair(Float3, Float2),
            ShaderKind::Float2D => pair(Float2, Float3),
            ShaderKind::Float3D => pair(Float3, Float3),
            ShaderKind::Float3Instance => vec![A1B1I2(Float3, Float2, Float1), A1B2I3(Float3, Float2, Float1)],
            ShaderKind::Float2InstanceC => vec![A1I2(Float2, Float1)],
            ShaderKind::Float2AInstance => vec![A1I2(Float2, Float3)],
            ShaderKind::Float3VsInput => vec![VsInput],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ShaderKind; 13] = [
        ShaderKind::Float2NoMvs1,
        ShaderKind::Float2NoMvs2,
        ShaderKind::Float2NoMvs3,
        ShaderKind::Float2,
        ShaderKind::Float3B,
        ShaderKind::Float3C,
        ShaderKind::Float3Instance,
        ShaderKind::Float2InstanceC,
        ShaderKind::Float2AInstance,
        ShaderKind::Float3,
        ShaderKind::Float2D,
        ShaderKind::Float3D,
        ShaderKind::Float3VsInput,
    ];

    #[test]
    fn test_sources_have_entry_points() {
        for kind in ALL {
            let src = kind.source();
            assert!(src.contains(VS_ENTRY), "{} lacks VSMain", kind.name());
            assert!(src.contains(PS_ENTRY), "{} lacks PSMain", kind.name());
            assert_eq!(src.contains("register(b0)"), kind.required_bindings().mvp, "{}", kind.name());
            assert_eq!(src.contains("register(t0)"), kind.required_bindings().texture, "{}", kind.name());
            assert_eq!(src.contains("entryInstance"), kind.uses_instances(), "{}", kind.name());
        }
    }

    #[test]
    fn test_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            shader: ShaderKind,
        }

        for kind in ALL {
            let w: Wrapper = toml::from_str(&format!("shader = \"{}\"", kind.name())).unwrap();
            assert_eq!(w.shader, kind);
        }
    }

    #[test]
    fn test_accepted_layouts_match_instancing() {
        for kind in ALL {
            let layouts = kind.accepted_layouts();
            assert!(!layouts.is_empty(), "{}", kind.name());
            for layout in layouts {
                assert_eq!(layout.has_instances(), kind.uses_instances(), "{} {:?}", kind.name(), layout);
            }
        }
    }

    #[test]
    fn test_accepted_layouts_cover_both_buffer_arrangements() {
        let layouts = ShaderKind::Float3B.accepted_layouts();
        assert!(layouts.contains(&InputLayoutKind::A1B1(VertexFormat::Float3, VertexFormat::Float2)));
        assert!(layouts.contains(&InputLayoutKind::A1B2(VertexFormat::Float3, VertexFormat::Float2)));
        assert!(!layouts.contains(&InputLayoutKind::A1(VertexFormat::Float2)));
    }

    #[test]
    fn test_float2d_passes_color_semantic() {
        assert!(ShaderKind::Float2D.source().contains("float3 cor : COLOR;"));
    }
}
