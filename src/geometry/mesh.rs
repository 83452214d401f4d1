//! 网格数据结构模块
//!
//! CPU 侧的网格容器：顶点流（按槽位排列的字节缓冲）、可选索引和可选实例流。
//! 后端只关心字节和步长，具体的顶点结构由数据集决定。

use bytemuck::Pod;

use super::topology::Topology;
use super::vertex::{InputLayoutKind, VertexFormat};
use crate::core::error::{DataError, Result};

/// 一个顶点缓冲的内容
#[derive(Debug, Clone, PartialEq)]
pub struct VertexStream {
    data: Vec<u8>,
    stride: u32,
}

impl VertexStream {
    /// 从顶点结构切片创建
    pub fn from_slice<T: Pod>(items: &[T]) -> Self {
        Self {
            data: bytemuck::cast_slice(items).to_vec(),
            stride: std::mem::size_of::<T>() as u32,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// 元素个数
    pub fn count(&self) -> u32 {
        if self.stride == 0 {
            0
        } else {
            self.data.len() as u32 / self.stride
        }
    }
}

/// 逐顶点属性在缓冲中的排列方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexAttributes {
    /// 只有位置
    Position(VertexFormat),
    /// 位置和第二个属性交错在同一个缓冲
    Interleaved(VertexFormat, VertexFormat),
    /// 位置和第二个属性分别在两个缓冲
    Separate(VertexFormat, VertexFormat),
    /// 位置 + 法线 + 纹理坐标
    PositionNormalUv,
}

/// 逐实例数据
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceData {
    pub stream: VertexStream,
    pub format: VertexFormat,
}

impl InstanceData {
    pub fn new<T: Pod>(items: &[T], format: VertexFormat) -> Self {
        Self {
            stream: VertexStream::from_slice(items),
            format,
        }
    }

    /// 实例个数
    pub fn count(&self) -> u32 {
        self.stream.count()
    }
}

/// CPU 侧网格数据
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub topology: Topology,
    pub attributes: VertexAttributes,
    /// 槽 3 的顶点数据
    pub vertices: VertexStream,
    /// `Separate` 布局时槽 4 的数据
    pub secondary: Option<VertexStream>,
    pub indices: Option<Vec<u16>>,
    pub instances: Option<InstanceData>,
}

impl MeshData {
    /// 只有一个顶点流的网格
    pub fn new(topology: Topology, attributes: VertexAttributes, vertices: VertexStream) -> Self {
        Self {
            topology,
            attributes,
            vertices,
            secondary: None,
            indices: None,
            instances: None,
        }
    }

    pub fn with_indices(mut self, indices: Vec<u16>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn with_secondary(mut self, stream: VertexStream) -> Self {
        self.secondary = Some(stream);
        self
    }

    pub fn with_instances(mut self, instances: InstanceData) -> Self {
        self.instances = Some(instances);
        self
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.count()
    }

    pub fn index_count(&self) -> u32 {
        self.indices.as_ref().map_or(0, |i| i.len() as u32)
    }

    /// 实例个数，没有实例流时为 1
    pub fn instance_count(&self) -> u32 {
        self.instances.as_ref().map_or(1, |i| i.count())
    }

    pub fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    /// 由携带的数据流推导输入布局
    pub fn layout(&self) -> Result<InputLayoutKind> {
        let instance = self.instances.as_ref().map(|i| i.format);

        let layout = match (self.attributes, instance) {
            (VertexAttributes::Position(f), None) => InputLayoutKind::A1(f),
            (VertexAttributes::Position(f), Some(fi)) => InputLayoutKind::A1I2(f, fi),
            (VertexAttributes::Interleaved(f1, f2), None) => InputLayoutKind::A1B1(f1, f2),
            (VertexAttributes::Interleaved(f1, f2), Some(fi)) => InputLayoutKind::A1B1I2(f1, f2, fi),
            (VertexAttributes::Separate(f1, f2), None) => InputLayoutKind::A1B2(f1, f2),
            (VertexAttributes::Separate(f1, f2), Some(fi)) => InputLayoutKind::A1B2I3(f1, f2, fi),
            (VertexAttributes::PositionNormalUv, None) => InputLayoutKind::VsInput,
            (VertexAttributes::PositionNormalUv, Some(_)) => {
                return Err(DataError::InvalidDrawSet(
                    "POSITION/NORMAL/TEXCOORD meshes do not take instance data".to_string(),
                )
                .into())
            }
        };

        Ok(layout)
    }

    /// 按槽位顺序排列的所有缓冲（包括实例流）
    pub fn streams(&self) -> Vec<&VertexStream> {
        let mut streams = vec![&self.vertices];
        if let Some(secondary) = &self.secondary {
            streams.push(secondary);
        }
        if let Some(instances) = &self.instances {
            streams.push(&instances.stream);
        }
        streams
    }

    /// 检查数据流与布局是否一致
    pub fn validate(&self) -> Result<()> {
        let layout = self.layout()?;

        let has_secondary = matches!(self.attributes, VertexAttributes::Separate(..));
        if has_secondary != self.secondary.is_some() {
            return Err(DataError::InvalidDrawSet(format!(
                "{:?} mesh secondary stream mismatch",
                self.attributes
            ))
            .into());
        }

        let strides = layout.slot_strides();
        let streams = self.streams();
        if strides.len() != streams.len() {
            return Err(DataError::InvalidDrawSet(format!(
                "layout {:?} expects {} buffers, mesh has {}",
                layout,
                strides.len(),
                streams.len()
            ))
            .into());
        }

        for ((slot, stride), stream) in strides.iter().zip(streams) {
            if *stride != stream.stride() {
                return Err(DataError::InvalidDrawSet(format!(
                    "slot {} stride {} does not match buffer stride {}",
                    slot,
                    stride,
                    stream.stride()
                ))
                .into());
            }
        }

        if let Some(secondary) = &self.secondary {
            if secondary.count() != self.vertex_count() {
                return Err(DataError::InvalidDrawSet(
                    "secondary stream vertex count differs from positions".to_string(),
                )
                .into());
            }
        }

        if let Some(indices) = &self.indices {
            let count = self.vertex_count();
            if let Some(&bad) = indices.iter().find(|&&i| u32::from(i) >= count) {
                return Err(DataError::IndexOutOfRange { index: bad as usize, len: count as usize }.into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::vertex::{Pos2, Pos3, Uv};

    fn line() -> MeshData {
        let points = [Pos2 { pos: [-0.95, 0.95] }, Pos2 { pos: [0.95, 0.0] }];
        MeshData::new(
            Topology::LineList,
            VertexAttributes::Position(VertexFormat::Float2),
            VertexStream::from_slice(&points),
        )
    }

    #[test]
    fn test_stream_count() {
        let mesh = line();
        assert_eq!(mesh.vertices.stride(), 8);
        assert_eq!(mesh.vertex_count(), 2);
        assert_eq!(mesh.instance_count(), 1);
        assert!(!mesh.is_indexed());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_layout_with_instances() {
        let mesh = line().with_instances(InstanceData::new(&[0.0f32, 1.0, 2.0], VertexFormat::Float1));
        assert_eq!(mesh.layout().unwrap(), InputLayoutKind::A1I2(VertexFormat::Float2, VertexFormat::Float1));
        assert_eq!(mesh.instance_count(), 3);
        assert_eq!(mesh.streams().len(), 2);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_index_out_of_range() {
        let mesh = line().with_indices(vec![0, 2]);
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_separate_requires_secondary() {
        let positions = [Pos3 { pos: [0.0; 3] }; 3];
        let mesh = MeshData::new(
            Topology::TriangleList,
            VertexAttributes::Separate(VertexFormat::Float3, VertexFormat::Float2),
            VertexStream::from_slice(&positions),
        );
        assert!(mesh.validate().is_err());

        let uvs = [Uv { uv: [0.0; 2] }; 3];
        let mesh = mesh.with_secondary(VertexStream::from_slice(&uvs));
        assert!(mesh.validate().is_ok());
    }
}
