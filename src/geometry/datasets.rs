//! 内置数据集
//!
//! 课程中使用的硬编码几何数据。每个函数返回一个 `MeshData`，
//! 场景文件通过名称和一个浮点参数引用它们（见 `Dataset`）。

use serde::{Deserialize, Serialize};

use super::mesh::{InstanceData, MeshData, VertexAttributes, VertexStream};
use super::topology::Topology;
use super::vertex::{Pos2, Pos3, Pos3Color, Pos3NormalUv, Pos3Uv, Uv, VertexFormat};
use crate::math::{Color, Vector2, Vector3};

/// 非索引线段：(-0.95, 0.95) 到 (0.95, v)
pub fn line1_direct(v: f32) -> MeshData {
    MeshData::new(
        Topology::LineList,
        VertexAttributes::Position(VertexFormat::Float2),
        VertexStream::from_slice(&line1_points(v)),
    )
}

/// 与 `line1_direct` 相同的两个点，带索引 [0, 1]
pub fn line1(v: f32) -> MeshData {
    line1_direct(v).with_indices(vec![0, 1])
}

fn line1_points(v: f32) -> [Pos2; 2] {
    [Pos2 { pos: [-0.95, 0.95] }, Pos2 { pos: [0.95, v] }]
}

/// 位置与纹理坐标交错存放的三角形
pub fn triang1(z: f32) -> MeshData {
    let vertices = [
        Pos3Uv { pos: [0.0, 0.0, z], uv: [0.0, 1.0] },
        Pos3Uv { pos: [0.0, 1.0, z], uv: [0.0, 0.0] },
        Pos3Uv { pos: [2.0, 0.0, z], uv: [1.0, 1.0] },
    ];

    MeshData::new(
        Topology::TriangleList,
        VertexAttributes::Interleaved(VertexFormat::Float3, VertexFormat::Float2),
        VertexStream::from_slice(&vertices),
    )
    .with_indices(vec![0, 1, 2])
}

/// 位置和纹理坐标分别放在两个缓冲的三角形
pub fn triang2(z: f32) -> MeshData {
    let positions = [
        Pos3 { pos: [0.0, 0.5, z] },
        Pos3 { pos: [0.0, 1.5, z] },
        Pos3 { pos: [2.0, 0.5, z] },
    ];
    let uvs = [Uv { uv: [0.0, 1.0] }, Uv { uv: [0.0, 0.0] }, Uv { uv: [1.0, 1.0] }];

    MeshData::new(
        Topology::TriangleList,
        VertexAttributes::Separate(VertexFormat::Float3, VertexFormat::Float2),
        VertexStream::from_slice(&positions),
    )
    .with_secondary(VertexStream::from_slice(&uvs))
    .with_indices(vec![0, 1, 2])
}

/// 只有位置的三角形
pub fn triang_l3a(z: f32) -> MeshData {
    let positions = [
        Pos3 { pos: [0.0, 0.0, z] },
        Pos3 { pos: [0.0, 1.0, z] },
        Pos3 { pos: [2.0, 0.0, z] },
    ];

    MeshData::new(
        Topology::TriangleList,
        VertexAttributes::Position(VertexFormat::Float3),
        VertexStream::from_slice(&positions),
    )
    .with_indices(vec![0, 1, 2])
}

/// 2D 三角形，纹理坐标在第二个缓冲
pub fn triang4a() -> MeshData {
    let positions = [Pos2 { pos: [1.0, 0.0] }, Pos2 { pos: [2.0, 0.0] }, Pos2 { pos: [0.0, 1.0] }];
    let uvs = [Uv { uv: [0.5, 1.0] }, Uv { uv: [1.0, 1.0] }, Uv { uv: [0.0, 0.0] }];

    MeshData::new(
        Topology::TriangleList,
        VertexAttributes::Separate(VertexFormat::Float2, VertexFormat::Float2),
        VertexStream::from_slice(&positions),
    )
    .with_secondary(VertexStream::from_slice(&uvs))
    .with_indices(vec![0, 1, 2])
}

/// 10 个实例，每个实例一个 float（0..=9）
pub fn instance1() -> InstanceData {
    let values: Vec<f32> = (0..10).map(|i| i as f32).collect();
    InstanceData::new(&values, VertexFormat::Float1)
}

/// 4 个实例，每个实例一个 float3 偏移
pub fn instance2() -> InstanceData {
    let values = [
        Pos3 { pos: [0.0, -0.1, 0.0] },
        Pos3 { pos: [0.0, -0.2, 0.1] },
        Pos3 { pos: [0.0, -0.3, 0.2] },
        Pos3 { pos: [0.0, -0.4, 0.3] },
    ];
    InstanceData::new(&values, VertexFormat::Float3)
}

/// XYZ 坐标轴：X 红色，Y 绿色，Z 蓝色
pub fn axes_xyz() -> MeshData {
    let axis = |end: [f32; 3], color: Color| {
        let c = [color.r, color.g, color.b];
        [Pos3Color { pos: [0.0; 3], color: c }, Pos3Color { pos: end, color: c }]
    };

    let vertices: Vec<Pos3Color> = [
        axis([1.0, 0.0, 0.0], Color::RED),
        axis([0.0, 1.0, 0.0], Color::LIME),
        axis([0.0, 0.0, 1.0], Color::BLUE),
    ]
    .concat();

    MeshData::new(
        Topology::LineList,
        VertexAttributes::Interleaved(VertexFormat::Float3, VertexFormat::Float3),
        VertexStream::from_slice(&vertices),
    )
}

/// 以原点为中心、边长为 `size` 的立方体
///
/// 每个面 4 个顶点、6 个索引，共 24 个顶点和 36 个索引。
pub fn create_box(size: Vector3) -> MeshData {
    let face_normals = [
        Vector3::z(),
        -Vector3::z(),
        Vector3::x(),
        -Vector3::x(),
        Vector3::y(),
        -Vector3::y(),
    ];
    let tex_coords = [
        Vector2::new(1.0, 0.0),
        Vector2::new(1.0, 1.0),
        Vector2::new(0.0, 1.0),
        Vector2::new(0.0, 0.0),
    ];
    let half = size / 2.0;

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (i, normal) in face_normals.iter().enumerate() {
        // 与法线以及彼此都垂直的两个方向
        let basis = if i >= 4 { Vector3::z() } else { Vector3::y() };
        let side1 = normal.cross(&basis);
        let side2 = normal.cross(&side1);

        let vbase = vertices.len() as u16;
        indices.extend_from_slice(&[vbase, vbase + 1, vbase + 2, vbase, vbase + 2, vbase + 3]);

        let corners = [
            normal - side1 - side2,
            normal - side1 + side2,
            normal + side1 + side2,
            normal + side1 - side2,
        ];

        for (corner, uv) in corners.iter().zip(tex_coords.iter()) {
            let pos = corner.component_mul(&half);
            vertices.push(Pos3NormalUv {
                pos: [pos.x, pos.y, pos.z],
                normal: [normal.x, normal.y, normal.z],
                uv: [uv.x, uv.y],
            });
        }
    }

    MeshData::new(
        Topology::TriangleList,
        VertexAttributes::PositionNormalUv,
        VertexStream::from_slice(&vertices),
    )
    .with_indices(indices)
}

/// 场景文件中引用数据集的方式
///
/// ```toml
/// dataset = { name = "triang1", param = 0.3 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Dataset {
    Line1Direct { #[serde(default)] param: f32 },
    Line1 { #[serde(default)] param: f32 },
    Triang1 { #[serde(default)] param: f32 },
    Triang2 { #[serde(default)] param: f32 },
    TriangL3a { #[serde(default)] param: f32 },
    Triang4a,
    AxesXyz,
    #[serde(rename = "box")]
    Cube { #[serde(default = "default_box_size")] param: f32 },
}

fn default_box_size() -> f32 {
    1.0
}

impl Dataset {
    /// 生成网格数据
    pub fn build(&self) -> MeshData {
        match *self {
            Dataset::Line1Direct { param } => line1_direct(param),
            Dataset::Line1 { param } => line1(param),
            Dataset::Triang1 { param } => triang1(param),
            Dataset::Triang2 { param } => triang2(param),
            Dataset::TriangL3a { param } => triang_l3a(param),
            Dataset::Triang4a => triang4a(),
            Dataset::AxesXyz => axes_xyz(),
            Dataset::Cube { param } => create_box(Vector3::new(param, param, param)),
        }
    }
}

/// 场景文件中引用实例数据的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instances {
    Instance1,
    Instance2,
}

impl Instances {
    pub fn build(&self) -> InstanceData {
        match self {
            Instances::Instance1 => instance1(),
            Instances::Instance2 => instance2(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::vertex::InputLayoutKind;

    #[test]
    fn test_line1_variants() {
        let direct = line1_direct(0.5);
        assert!(!direct.is_indexed());
        assert_eq!(direct.vertex_count(), 2);

        let bytes: &[f32] = bytemuck::cast_slice(direct.vertices.bytes());
        assert_eq!(bytes, &[-0.95, 0.95, 0.95, 0.5]);

        let indexed = line1(0.5);
        assert_eq!(indexed.indices, Some(vec![0, 1]));
        assert!(indexed.validate().is_ok());
    }

    #[test]
    fn test_triang1_interleaved() {
        let mesh = triang1(0.3);
        assert_eq!(mesh.vertices.stride(), 20);
        assert_eq!(mesh.layout().unwrap(), InputLayoutKind::A1B1(VertexFormat::Float3, VertexFormat::Float2));

        let floats: &[f32] = bytemuck::cast_slice(mesh.vertices.bytes());
        assert_eq!(&floats[5..10], &[0.0, 1.0, 0.3, 0.0, 0.0]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_triang2_separate() {
        let mesh = triang2(1.2).with_instances(instance1());
        assert_eq!(
            mesh.layout().unwrap(),
            InputLayoutKind::A1B2I3(VertexFormat::Float3, VertexFormat::Float2, VertexFormat::Float1)
        );
        assert_eq!(mesh.instance_count(), 10);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_instances() {
        let i1 = instance1();
        let values: &[f32] = bytemuck::cast_slice(i1.stream.bytes());
        assert_eq!(values.first(), Some(&0.0));
        assert_eq!(values.last(), Some(&9.0));

        let i2 = instance2();
        assert_eq!(i2.count(), 4);
        assert_eq!(i2.stream.stride(), 12);
    }

    #[test]
    fn test_axes_colors() {
        let mesh = axes_xyz();
        assert_eq!(mesh.vertex_count(), 6);

        let vertices: &[Pos3Color] = bytemuck::cast_slice(mesh.vertices.bytes());
        assert_eq!(vertices[1].pos, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[1].color, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[3].color, [0.0, 1.0, 0.0]);
        assert_eq!(vertices[5].color, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_box() {
        let mesh = create_box(Vector3::new(2.0, 2.0, 2.0));
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);
        assert_eq!(mesh.layout().unwrap(), InputLayoutKind::VsInput);
        assert!(mesh.validate().is_ok());

        let vertices: &[Pos3NormalUv] = bytemuck::cast_slice(mesh.vertices.bytes());
        // +Z 面：side1 = Z x Y = -X，side2 = Z x -X = -Y
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(vertices[0].pos, [1.0, 1.0, 1.0]);
        assert_eq!(vertices[2].pos, [-1.0, -1.0, 1.0]);
        assert_eq!(vertices[1].uv, [1.0, 1.0]);

        // 所有顶点都在立方体表面上
        assert!(vertices.iter().all(|v| v.pos.iter().any(|c| c.abs() == 1.0)));
        assert_eq!(mesh.indices.as_ref().map(|i| &i[6..12]), Some(&[4u16, 5, 6, 4, 6, 7][..]));
    }

    #[test]
    fn test_dataset_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            dataset: Dataset,
        }

        let w: Wrapper = toml::from_str(r#"dataset = { name = "triang2", param = 1.5 }"#).unwrap();
        assert_eq!(w.dataset, Dataset::Triang2 { param: 1.5 });

        let w: Wrapper = toml::from_str(r#"dataset = { name = "axes_xyz" }"#).unwrap();
        assert_eq!(w.dataset.build().topology, Topology::LineList);
    }
}
