//! DirectX 12 图形 API 实现模块
//!
//! 本模块包含了所有 DirectX 12 相关的代码，包括：
//! - Context：设备、命令队列、交换链、Fence 帧节奏
//! - Upload：默认堆缓冲与纹理的上传
//! - RootSignature / Shader / Pipeline：绘制集使用的管线对象
//! - DrawSet：由 `DrawSetDesc` 创建的 GPU 绘制集
//! - Backend：把以上部分组合成 `RenderBackend`

pub mod backend;
pub mod context;
pub mod debug;
pub mod descriptor;
pub mod draw_set;
pub mod pipeline;
pub mod root_signature;
pub mod shader;
pub mod upload;

use std::mem::{self, ManuallyDrop};

use windows::core::Interface;
use windows::Win32::Graphics::Direct3D12::*;

// 重新导出常用类型
pub use backend::Dx12Backend;
pub use context::{Dx12Context, Dx12Fence};
pub use draw_set::Dx12DrawSet;

/// 不增加引用计数地把 COM 指针放进描述结构体
///
/// 结构体存活期间 `resource` 必须保持有效。
pub(crate) unsafe fn borrow_com<T: Interface>(resource: &T) -> ManuallyDrop<Option<T>> {
    mem::transmute_copy(resource)
}

/// 资源状态转换屏障
pub(crate) fn transition_barrier(
    resource: &ID3D12Resource,
    before: D3D12_RESOURCE_STATES,
    after: D3D12_RESOURCE_STATES,
) -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                pResource: unsafe { borrow_com(resource) },
                Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                StateBefore: before,
                StateAfter: after,
            }),
        },
    }
}
