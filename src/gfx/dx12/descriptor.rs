//! DirectX 12 描述符堆
//!
//! 封装 `ID3D12DescriptorHeap`：记录增量大小和句柄基址，按下标给出 CPU / GPU 句柄。

use windows::Win32::Graphics::Direct3D12::*;

use crate::core::error::{GraphicsError, Result, SandboxError};

/// 描述符堆种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    /// 渲染目标视图
    RenderTarget,
    /// 深度模板视图
    DepthStencil,
    /// 着色器可见的 SRV
    ShaderResource,
}

impl DescriptorKind {
    fn heap_type(&self) -> D3D12_DESCRIPTOR_HEAP_TYPE {
        match self {
            DescriptorKind::RenderTarget => D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
            DescriptorKind::DepthStencil => D3D12_DESCRIPTOR_HEAP_TYPE_DSV,
            DescriptorKind::ShaderResource => D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
        }
    }

    fn shader_visible(&self) -> bool {
        matches!(self, DescriptorKind::ShaderResource)
    }

    fn name(&self) -> &'static str {
        match self {
            DescriptorKind::RenderTarget => "RTV",
            DescriptorKind::DepthStencil => "DSV",
            DescriptorKind::ShaderResource => "SRV",
        }
    }
}

/// DX12 描述符堆
pub struct Dx12DescriptorHeap {
    heap: ID3D12DescriptorHeap,
    kind: DescriptorKind,
    increment_size: usize,
    num_descriptors: u32,
}

impl Dx12DescriptorHeap {
    pub fn new(device: &ID3D12Device, kind: DescriptorKind, num_descriptors: u32) -> Result<Self> {
        let flags = if kind.shader_visible() {
            D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE
        } else {
            D3D12_DESCRIPTOR_HEAP_FLAG_NONE
        };

        let heap_desc = D3D12_DESCRIPTOR_HEAP_DESC {
            Type: kind.heap_type(),
            NumDescriptors: num_descriptors,
            Flags: flags,
            NodeMask: 0,
        };

        unsafe {
            let heap: ID3D12DescriptorHeap = device.CreateDescriptorHeap(&heap_desc).map_err(|e| {
                SandboxError::Graphics(GraphicsError::ResourceCreation(format!(
                    "Failed to create {} descriptor heap: {:?}",
                    kind.name(),
                    e
                )))
            })?;

            let increment_size = device.GetDescriptorHandleIncrementSize(kind.heap_type()) as usize;

            Ok(Self {
                heap,
                kind,
                increment_size,
                num_descriptors,
            })
        }
    }

    /// 获取底层 DX12 描述符堆
    pub fn heap(&self) -> &ID3D12DescriptorHeap {
        &self.heap
    }

    /// 第 `index` 个描述符的 CPU 句柄
    pub fn cpu_handle(&self, index: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        debug_assert!(index < self.num_descriptors, "{} descriptor {} out of range", self.kind.name(), index);
        let start = unsafe { self.heap.GetCPUDescriptorHandleForHeapStart() };
        D3D12_CPU_DESCRIPTOR_HANDLE {
            ptr: start.ptr + index as usize * self.increment_size,
        }
    }

    /// 第 `index` 个描述符的 GPU 句柄，只有着色器可见的堆才有
    pub fn gpu_handle(&self, index: u32) -> Option<D3D12_GPU_DESCRIPTOR_HANDLE> {
        if !self.kind.shader_visible() || index >= self.num_descriptors {
            return None;
        }

        let start = unsafe { self.heap.GetGPUDescriptorHandleForHeapStart() };
        Some(D3D12_GPU_DESCRIPTOR_HANDLE {
            ptr: start.ptr + (index as usize * self.increment_size) as u64,
        })
    }
}
