//! 顶点格式与输入布局模块
//!
//! 定义平台无关的顶点格式、输入元素描述以及课程中用到的几种输入布局。
//! 各个后端把 `InputElement` 转换为自己的 `*_INPUT_ELEMENT_DESC`。
//!
//! # 槽位约定
//!
//! 第一个顶点缓冲总是绑定在 `VERTEX_SLOT`（3），后续缓冲依次递增。

use bytemuck::{Pod, Zeroable};
use std::ffi::CStr;

/// 第一个顶点缓冲所在的输入槽
pub const VERTEX_SLOT: u32 = 3;

/// 紧接上一个元素排列（对应 `D3D*_APPEND_ALIGNED_ELEMENT`）
pub const APPEND_ALIGNED: u32 = u32::MAX;

/// 顶点属性格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float1,
    Float2,
    Float3,
    Float4,
    Half2,
    Half4,
}

impl VertexFormat {
    /// 每个元素占用的字节数
    pub fn size(&self) -> u32 {
        match self {
            VertexFormat::Float1 => 4,
            VertexFormat::Float2 => 8,
            VertexFormat::Float3 => 12,
            VertexFormat::Float4 => 16,
            VertexFormat::Half2 => 4,
            VertexFormat::Half4 => 8,
        }
    }
}

/// 输入元素的语义
///
/// 着色器中的输入参数通过这些语义与顶点缓冲对应。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    EntryA,
    EntryB,
    EntryInstance,
    Position,
    Normal,
    TexCoord,
}

impl Semantic {
    /// HLSL 中的语义名
    pub fn name(&self) -> &'static str {
        self.c_name().to_str().unwrap_or_default()
    }

    /// 以 NUL 结尾的语义名，直接交给原生 API
    pub fn c_name(&self) -> &'static CStr {
        match self {
            Semantic::EntryA => c"entryA",
            Semantic::EntryB => c"entryB",
            Semantic::EntryInstance => c"entryInstance",
            Semantic::Position => c"POSITION",
            Semantic::Normal => c"NORMAL",
            Semantic::TexCoord => c"TEXCOORD",
        }
    }
}

/// 输入数据的步进方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputClass {
    PerVertex,
    PerInstance,
}

/// 平台无关的输入元素描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputElement {
    pub semantic: Semantic,
    pub semantic_index: u32,
    pub format: VertexFormat,
    pub slot: u32,
    /// 槽内字节偏移，`APPEND_ALIGNED` 表示紧跟上一个元素
    pub aligned_offset: u32,
    pub class: InputClass,
    /// 实例数据的步进频率，逐顶点数据为 0
    pub step_rate: u32,
}

impl InputElement {
    fn per_vertex(semantic: Semantic, format: VertexFormat, slot: u32, aligned_offset: u32) -> Self {
        Self {
            semantic,
            semantic_index: 0,
            format,
            slot,
            aligned_offset,
            class: InputClass::PerVertex,
            step_rate: 0,
        }
    }

    fn per_instance(semantic: Semantic, format: VertexFormat, slot: u32) -> Self {
        Self {
            semantic,
            semantic_index: 0,
            format,
            slot,
            aligned_offset: 0,
            class: InputClass::PerInstance,
            step_rate: 1,
        }
    }
}

/// 课程中使用的输入布局
///
/// 命名规则：A/B 是逐顶点属性，I 是逐实例属性，数字表示所在的缓冲（1 = 槽 3）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLayoutKind {
    /// 单个属性
    A1(VertexFormat),
    /// 两个属性交错存放在同一个缓冲
    A1B1(VertexFormat, VertexFormat),
    /// 两个属性分别存放在两个缓冲
    A1B2(VertexFormat, VertexFormat),
    /// 一个逐顶点属性 + 一个逐实例属性
    A1I2(VertexFormat, VertexFormat),
    /// 交错的两个属性 + 逐实例属性
    A1B1I2(VertexFormat, VertexFormat, VertexFormat),
    /// 三个缓冲：两个逐顶点属性 + 逐实例属性
    A1B2I3(VertexFormat, VertexFormat, VertexFormat),
    /// POSITION / NORMAL / TEXCOORD 交错
    VsInput,
}

impl InputLayoutKind {
    /// 输入元素列表
    pub fn elements(&self) -> Vec<InputElement> {
        use InputElement as E;
        use Semantic::*;
        let s = VERTEX_SLOT;

        match *self {
            InputLayoutKind::A1(f) => vec![E::per_vertex(EntryA, f, s, 0)],
            InputLayoutKind::A1B1(f1, f2) => vec![
                E::per_vertex(EntryA, f1, s, 0),
                E::per_vertex(EntryB, f2, s, APPEND_ALIGNED),
            ],
            InputLayoutKind::A1B2(f1, f2) => vec![
                E::per_vertex(EntryA, f1, s, 0),
                E::per_vertex(EntryB, f2, s + 1, 0),
            ],
            InputLayoutKind::A1I2(f1, fi) => vec![
                E::per_vertex(EntryA, f1, s, 0),
                E::per_instance(EntryInstance, fi, s + 1),
            ],
            InputLayoutKind::A1B1I2(f1, f2, fi) => vec![
                E::per_vertex(EntryA, f1, s, 0),
                E::per_vertex(EntryB, f2, s, APPEND_ALIGNED),
                E::per_instance(EntryInstance, fi, s + 1),
            ],
            InputLayoutKind::A1B2I3(f1, f2, fi) => vec![
                E::per_vertex(EntryA, f1, s, 0),
                E::per_vertex(EntryB, f2, s + 1, 0),
                E::per_instance(EntryInstance, fi, s + 2),
            ],
            InputLayoutKind::VsInput => vec![
                E::per_vertex(Position, VertexFormat::Float3, s, 0),
                E::per_vertex(Normal, VertexFormat::Float3, s, 12),
                E::per_vertex(TexCoord, VertexFormat::Float2, s, 24),
            ],
        }
    }

    /// 把 `APPEND_ALIGNED` 换算成每个槽内的显式字节偏移
    pub fn resolve_offsets(&self) -> Vec<InputElement> {
        let mut cursor: Vec<(u32, u32)> = Vec::new();

        self.elements()
            .into_iter()
            .map(|mut e| {
                let idx = match cursor.iter().position(|(slot, _)| *slot == e.slot) {
                    Some(i) => i,
                    None => {
                        cursor.push((e.slot, 0));
                        cursor.len() - 1
                    }
                };
                if e.aligned_offset == APPEND_ALIGNED {
                    e.aligned_offset = cursor[idx].1;
                }
                cursor[idx].1 = cursor[idx].1.max(e.aligned_offset + e.format.size());
                e
            })
            .collect()
    }

    /// 按槽位排序的 (槽位, 步长)
    pub fn slot_strides(&self) -> Vec<(u32, u32)> {
        let mut strides: Vec<(u32, u32)> = Vec::new();
        for e in self.resolve_offsets() {
            let end = e.aligned_offset + e.format.size();
            match strides.iter_mut().find(|(slot, _)| *slot == e.slot) {
                Some((_, stride)) => *stride = (*stride).max(end),
                None => strides.push((e.slot, end)),
            }
        }
        strides.sort_by_key(|(slot, _)| *slot);
        strides
    }

    /// 是否包含逐实例数据
    pub fn has_instances(&self) -> bool {
        matches!(
            self,
            InputLayoutKind::A1I2(..) | InputLayoutKind::A1B1I2(..) | InputLayoutKind::A1B2I3(..)
        )
    }
}

// ========== 顶点结构 ==========

/// 2D 位置
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Pos2 {
    pub pos: [f32; 2],
}

/// 3D 位置
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Pos3 {
    pub pos: [f32; 3],
}

/// 纹理坐标
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Uv {
    pub uv: [f32; 2],
}

/// 3D 位置 + 纹理坐标（20 字节）
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Pos3Uv {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

/// 3D 位置 + RGB 颜色（24 字节）
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Pos3Color {
    pub pos: [f32; 3],
    pub color: [f32; 3],
}

/// 3D 位置 + 法线 + 纹理坐标（32 字节），对应 `VsInput` 布局
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Pos3NormalUv {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;
    use VertexFormat::*;

    #[test]
    fn test_format_sizes() {
        assert_eq!(Float1.size(), 4);
        assert_eq!(Float3.size(), 12);
        assert_eq!(Half4.size(), 8);
        assert_eq!(std::mem::size_of::<Pos3Uv>(), 20);
        assert_eq!(std::mem::size_of::<Pos3NormalUv>(), 32);
    }

    #[test]
    fn test_a1b1_resolves_append_aligned() {
        let elements = InputLayoutKind::A1B1(Float3, Float2).resolve_offsets();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].slot, VERTEX_SLOT);
        assert_eq!(elements[1].slot, VERTEX_SLOT);
        assert_eq!(elements[1].aligned_offset, 12);
        assert_eq!(elements[1].semantic.name(), "entryB");
    }

    #[test]
    fn test_a1b2i3_slots() {
        let layout = InputLayoutKind::A1B2I3(Float3, Float2, Float1);
        let elements = layout.elements();

        assert_eq!(elements.iter().map(|e| e.slot).collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(elements[2].class, InputClass::PerInstance);
        assert_eq!(elements[2].step_rate, 1);
        assert_eq!(elements[2].semantic, Semantic::EntryInstance);
        assert_eq!(layout.slot_strides(), vec![(3, 12), (4, 8), (5, 4)]);
        assert!(layout.has_instances());
    }

    #[test]
    fn test_a1b1i2_strides() {
        let layout = InputLayoutKind::A1B1I2(Float3, Float2, Float1);
        assert_eq!(layout.slot_strides(), vec![(3, 20), (4, 4)]);
    }

    #[test]
    fn test_vs_input_layout() {
        let layout = InputLayoutKind::VsInput;
        let offsets: Vec<u32> = layout.resolve_offsets().iter().map(|e| e.aligned_offset).collect();

        assert_eq!(offsets, vec![0, 12, 24]);
        assert_eq!(layout.slot_strides(), vec![(VERTEX_SLOT, 32)]);
        assert!(!layout.has_instances());
        assert_eq!(Semantic::TexCoord.c_name().to_bytes(), b"TEXCOORD");
    }
}
