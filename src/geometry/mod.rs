//! 几何数据模块
//!
//! 平台无关的顶点格式、输入布局、拓扑、渲染模式，以及课程使用的内置数据集和位图。
//!
//! # 数据流
//!
//! ```text
//! Dataset / BitmapSource (scene.toml)
//!     ↓
//! MeshData / Bitmap (CPU 侧数据)
//!     ↓
//! DrawSetDesc (renderer::draw_set)
//!     ↓
//! 后端上传到 GPU
//! ```

pub mod vertex;
pub mod mesh;
pub mod topology;
pub mod render_mode;
pub mod datasets;
pub mod bitmap;

// 重新导出常用类型
pub use vertex::{InputElement, InputLayoutKind, VertexFormat, VERTEX_SLOT};
pub use mesh::{InstanceData, MeshData, VertexAttributes, VertexStream};
pub use topology::{PrimitiveTopologyType, Topology};
pub use render_mode::{RasterizerSpec, RenderMode};
pub use bitmap::{Bitmap, BitmapSource};
pub use datasets::{Dataset, Instances};
