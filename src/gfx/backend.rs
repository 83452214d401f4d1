//! 图形后端的统一抽象接口
//!
//! 本模块定义了 D3D11 与 D3D12 后端都必须实现的接口。
//! 上层的 `Renderer` 只通过这个 trait 驱动帧循环，不关心底层是 immediate context
//! 还是 command list。

use crate::component::OrbitCamera;
use crate::core::error::Result;
use crate::geometry::RenderMode;
use crate::math::Vector3;

/// 图形后端的统一接口
///
/// 一个后端拥有设备、交换链以及由 `DrawSetDesc` 创建出的全部绘制集。
pub trait RenderBackend {
    /// 后端名称，用于日志和窗口标题
    fn backend_name(&self) -> &'static str;

    /// 窗口大小改变后重建交换链相关的资源
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// 绘制一帧：开始帧、依次绘制所有绘制集、结束帧
    fn render(&mut self, camera: &OrbitCamera) -> Result<()>;

    /// 修改绘制集 `set` 中第 `item` 项的渲染模式
    fn set_render_mode(&mut self, set: usize, item: usize, mode: RenderMode) -> Result<()>;

    /// 修改绘制集 `set` 中第 `item` 项的模型平移
    fn set_translation(&mut self, set: usize, item: usize, translation: Vector3) -> Result<()>;

    /// CPU 因 GPU 落后而等待的次数
    ///
    /// 没有显式帧节奏控制的后端返回 0。
    fn wait_count(&self) -> u64 {
        0
    }

    /// 等待 GPU 完成目前提交的全部工作
    fn wait_for_gpu(&mut self) -> Result<()>;
}
