//! 图形后端模块
//!
//! 本模块封装了两个 Direct3D 后端的底层实现：
//! - Direct3D 11：immediate context，状态直接绑定到设备上下文
//! - Direct3D 12：command list + descriptor heap，显式的资源状态和 Fence 同步
//!
//! 两个后端都实现了统一的 `RenderBackend` trait，由 `renderer::Renderer` 按配置选择。
//! 具体实现只在 Windows 上编译，`RenderBackend` 本身与平台无关。

pub mod backend;
#[cfg(target_os = "windows")]
pub mod dxgi;
#[cfg(target_os = "windows")]
pub mod dx12;
#[cfg(target_os = "windows")]
pub mod dx11;

pub use backend::RenderBackend;
#[cfg(target_os = "windows")]
pub use dx11::Dx11Backend;
#[cfg(target_os = "windows")]
pub use dx12::Dx12Backend;
