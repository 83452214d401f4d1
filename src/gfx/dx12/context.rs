//! DirectX 12 上下文
//!
//! 设备、直接命令队列、交换链、每个后台缓冲一个命令分配器，以及基于 Fence 的帧节奏。
//!
//! # 初始化流程
//!
//! 1. 启用调试层（按配置）
//! 2. 创建 DXGI 工厂并选择高性能硬件适配器
//! 3. 创建 D3D12 设备（Feature Level 12_0）
//! 4. 创建命令队列
//! 5. 创建交换链
//! 6. 创建命令分配器和命令列表
//! 7. 创建 RTV / DSV 描述符堆、渲染目标视图和深度缓冲
//! 8. 创建 Fence 和 `FramePacer`

use tracing::{debug, info, trace, warn};
use windows::Win32::Foundation::{CloseHandle, HANDLE, RECT, WAIT_EVENT, WAIT_OBJECT_0};
use windows::Win32::Graphics::Direct3D::D3D_FEATURE_LEVEL_12_0;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::Win32::System::Threading::{CreateEventA, WaitForSingleObject, INFINITE};
use winit::window::Window;

use super::debug::{enable_debug_layer, report_live_objects, InfoQueue};
use super::descriptor::{DescriptorKind, Dx12DescriptorHeap};
use super::transition_barrier;
use crate::core::config::GraphicsConfig;
use crate::core::error::{GraphicsError, Result, SandboxError};
use crate::gfx::dxgi::{self, SwapChainSpec, DSV_FORMAT};
use crate::renderer::sync::{FenceValue, FramePacer, GpuFence};

/// `ID3D12Fence` + 事件
pub struct Dx12Fence {
    fence: ID3D12Fence,
    event: HANDLE,
    queue: ID3D12CommandQueue,
}

impl Dx12Fence {
    pub fn new(device: &ID3D12Device, queue: &ID3D12CommandQueue) -> Result<Self> {
        unsafe {
            let fence: ID3D12Fence = device.CreateFence(0, D3D12_FENCE_FLAG_NONE).map_err(|e| {
                SandboxError::Graphics(GraphicsError::ResourceCreation(format!(
                    "Failed to create fence: {:?}",
                    e
                )))
            })?;

            let event = CreateEventA(None, false, false, None).map_err(|e| {
                SandboxError::Graphics(GraphicsError::ResourceCreation(format!(
                    "Failed to create fence event: {:?}",
                    e
                )))
            })?;

            Ok(Self {
                fence,
                event,
                queue: queue.clone(),
            })
        }
    }
}

impl GpuFence for Dx12Fence {
    fn signal(&mut self, value: FenceValue) -> Result<()> {
        unsafe { self.queue.Signal(&self.fence, value.value()) }.map_err(|e| {
            SandboxError::Graphics(GraphicsError::CommandExecution(format!(
                "Failed to signal fence: {:?}",
                e
            )))
        })
    }

    fn completed_value(&self) -> FenceValue {
        FenceValue::new(unsafe { self.fence.GetCompletedValue() })
    }

    fn wait_for(&mut self, value: FenceValue) -> Result<()> {
        unsafe {
            if self.fence.GetCompletedValue() < value.value() {
                self.fence
                    .SetEventOnCompletion(value.value(), self.event)
                    .map_err(|e| {
                        SandboxError::Graphics(GraphicsError::CommandExecution(format!(
                            "Failed to set fence event: {:?}",
                            e
                        )))
                    })?;
                check_wait(WaitForSingleObject(self.event, INFINITE), value)?;
            }
        }

        trace!(value = value.value(), "Fence reached");
        Ok(())
    }
}

/// 等待结果不是 `WAIT_OBJECT_0`（例如 `WAIT_FAILED`）时 Fence 并未到达
fn check_wait(result: WAIT_EVENT, value: FenceValue) -> Result<()> {
    if result == WAIT_OBJECT_0 {
        Ok(())
    } else {
        Err(SandboxError::Graphics(GraphicsError::CommandExecution(format!(
            "Failed to wait for fence value {}: wait returned {:#x}",
            value.value(),
            result.0
        ))))
    }
}

impl Drop for Dx12Fence {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.event);
        }
    }
}

/// DirectX 12 上下文
pub struct Dx12Context {
    pub(super) device: ID3D12Device,
    pub(super) queue: ID3D12CommandQueue,
    swap_chain: IDXGISwapChain3,
    swap_chain_spec: SwapChainSpec,
    pub(super) allocators: Vec<ID3D12CommandAllocator>,
    pub(super) command_list: ID3D12GraphicsCommandList,
    rtv_heap: Dx12DescriptorHeap,
    render_targets: Vec<ID3D12Resource>,
    dsv_heap: Dx12DescriptorHeap,
    depth_buffer: Option<ID3D12Resource>,
    pub(super) pacer: FramePacer<Dx12Fence>,
    viewport: D3D12_VIEWPORT,
    scissor: RECT,
    clear_color: [f32; 4],
    sync_interval: u32,
    info_queue: Option<InfoQueue>,
    stop_on_error: bool,
}

impl Dx12Context {
    pub fn new(window: &Window, config: &GraphicsConfig) -> Result<Self> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        // 1. 调试层
        if config.debug_layer {
            if let Err(e) = enable_debug_layer(config.gpu_validation) {
                warn!("Failed to enable DX12 Debug Layer: {}", e);
            }
        }

        // 2. 工厂和适配器
        let factory = dxgi::create_factory(config.debug_layer)?;
        let adapter = dxgi::select_hardware_adapter(&factory)?;

        // 3. 设备
        let device = unsafe {
            let mut device: Option<ID3D12Device> = None;
            D3D12CreateDevice(&adapter, D3D_FEATURE_LEVEL_12_0, &mut device).map_err(|e| {
                SandboxError::Graphics(GraphicsError::DeviceCreation(format!(
                    "Failed to create D3D12 device: {:?}",
                    e
                )))
            })?;
            device.ok_or_else(|| {
                SandboxError::Graphics(GraphicsError::DeviceCreation(
                    "D3D12CreateDevice returned no device".to_string(),
                ))
            })?
        };
        debug!("D3D12 Device created successfully");

        let info_queue = if config.debug_layer { InfoQueue::new() } else { None };

        // 4. 命令队列
        let queue_desc = D3D12_COMMAND_QUEUE_DESC {
            Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
            Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
            ..Default::default()
        };
        let queue: ID3D12CommandQueue = unsafe { device.CreateCommandQueue(&queue_desc) }.map_err(|e| {
            SandboxError::Graphics(GraphicsError::DeviceCreation(format!(
                "Failed to create command queue: {:?}",
                e
            )))
        })?;

        // 5. 交换链
        let swap_chain_spec = SwapChainSpec {
            width,
            height,
            buffer_count: config.back_buffer_count,
            allow_tearing: config.allow_tearing && dxgi::tearing_supported(&factory),
            background: config.clear_color,
        };
        let hwnd = dxgi::window_hwnd(window)?;
        let swap_chain = dxgi::create_swap_chain(&factory, &queue, hwnd, &swap_chain_spec)?;
        let swap_chain: IDXGISwapChain3 = dxgi::cast_swap_chain(&swap_chain)?;

        // 6. 命令分配器和命令列表
        let allocators = (0..config.back_buffer_count)
            .map(|i| {
                unsafe { device.CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT) }.map_err(|e| {
                    SandboxError::Graphics(GraphicsError::ResourceCreation(format!(
                        "Failed to create command allocator {}: {:?}",
                        i, e
                    )))
                })
            })
            .collect::<Result<Vec<ID3D12CommandAllocator>>>()?;

        let command_list: ID3D12GraphicsCommandList = unsafe {
            device.CreateCommandList(0, D3D12_COMMAND_LIST_TYPE_DIRECT, &allocators[0], None)
        }
        .map_err(|e| {
            SandboxError::Graphics(GraphicsError::ResourceCreation(format!(
                "Failed to create command list: {:?}",
                e
            )))
        })?;
        unsafe { command_list.Close() }.map_err(|e| {
            SandboxError::Graphics(GraphicsError::CommandExecution(format!(
                "Failed to close initial command list: {:?}",
                e
            )))
        })?;

        // 7. 描述符堆
        let rtv_heap = Dx12DescriptorHeap::new(&device, DescriptorKind::RenderTarget, config.back_buffer_count)?;
        let dsv_heap = Dx12DescriptorHeap::new(&device, DescriptorKind::DepthStencil, 1)?;

        // 8. Fence
        let fence = Dx12Fence::new(&device, &queue)?;
        let pacer = FramePacer::new(fence, config.back_buffer_count as usize);

        let mut context = Self {
            device,
            queue,
            swap_chain,
            swap_chain_spec,
            allocators,
            command_list,
            rtv_heap,
            render_targets: Vec::new(),
            dsv_heap,
            depth_buffer: None,
            pacer,
            viewport: D3D12_VIEWPORT::default(),
            scissor: RECT::default(),
            clear_color: config.clear_color,
            sync_interval: config.sync_interval,
            info_queue,
            stop_on_error: config.debug_layer,
        };

        context.create_render_targets()?;
        context.create_depth_buffer(width, height)?;
        context.update_viewport(width, height);
        context.check_debug_messages("Dx12Context::new")?;

        info!(width, height, "DX12 Backend initialization complete");
        Ok(context)
    }

    pub fn device(&self) -> &ID3D12Device {
        &self.device
    }

    pub fn command_list(&self) -> &ID3D12GraphicsCommandList {
        &self.command_list
    }

    /// CPU 因 GPU 落后而等待的次数
    pub fn wait_count(&self) -> u64 {
        self.pacer.wait_count()
    }

    fn back_buffer_index(&self) -> usize {
        self.pacer.back_buffer_index()
    }

    fn create_render_targets(&mut self) -> Result<()> {
        self.render_targets.clear();

        for i in 0..self.swap_chain_spec.buffer_count {
            let surface: ID3D12Resource = unsafe { self.swap_chain.GetBuffer(i) }.map_err(|e| {
                SandboxError::Graphics(GraphicsError::SwapchainError(format!(
                    "Failed to get swap chain buffer {}: {:?}",
                    i, e
                )))
            })?;

            unsafe {
                self.device
                    .CreateRenderTargetView(&surface, None, self.rtv_heap.cpu_handle(i));
            }
            self.render_targets.push(surface);
        }

        debug!(count = self.render_targets.len(), "Render target views created");
        Ok(())
    }

    fn create_depth_buffer(&mut self, width: u32, height: u32) -> Result<()> {
        let heap_props = D3D12_HEAP_PROPERTIES {
            Type: D3D12_HEAP_TYPE_DEFAULT,
            ..Default::default()
        };
        let desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
            Width: width as u64,
            Height: height,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: DSV_FORMAT,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
            Flags: D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL,
            ..Default::default()
        };
        let clear_value = D3D12_CLEAR_VALUE {
            Format: DSV_FORMAT,
            Anonymous: D3D12_CLEAR_VALUE_0 {
                DepthStencil: D3D12_DEPTH_STENCIL_VALUE { Depth: 1.0, Stencil: 0 },
            },
        };

        let depth_buffer = unsafe {
            let mut resource: Option<ID3D12Resource> = None;
            self.device
                .CreateCommittedResource(
                    &heap_props,
                    D3D12_HEAP_FLAG_NONE,
                    &desc,
                    D3D12_RESOURCE_STATE_DEPTH_WRITE,
                    Some(&clear_value),
                    &mut resource,
                )
                .map_err(|e| {
                    SandboxError::Graphics(GraphicsError::ResourceCreation(format!(
                        "Failed to create depth stencil buffer: {:?}",
                        e
                    )))
                })?;
            resource.ok_or_else(|| {
                SandboxError::Graphics(GraphicsError::ResourceCreation(
                    "Depth stencil buffer is null".to_string(),
                ))
            })?
        };

        let dsv_desc = D3D12_DEPTH_STENCIL_VIEW_DESC {
            Format: DSV_FORMAT,
            ViewDimension: D3D12_DSV_DIMENSION_TEXTURE2D,
            Flags: D3D12_DSV_FLAG_NONE,
            ..Default::default()
        };
        unsafe {
            self.device
                .CreateDepthStencilView(&depth_buffer, Some(&dsv_desc), self.dsv_heap.cpu_handle(0));
        }

        self.depth_buffer = Some(depth_buffer);
        debug!(width, height, "Depth stencil buffer created");
        Ok(())
    }

    fn update_viewport(&mut self, width: u32, height: u32) {
        self.viewport = D3D12_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: width as f32,
            Height: height as f32,
            MinDepth: D3D12_MIN_DEPTH,
            MaxDepth: D3D12_MAX_DEPTH,
        };
        self.scissor = RECT {
            left: 0,
            top: 0,
            right: width as i32,
            bottom: height as i32,
        };
    }

    /// 重置当前后台缓冲的命令分配器和命令列表
    pub(super) fn reset_command_list(&mut self) -> Result<()> {
        let allocator = &self.allocators[self.back_buffer_index()];

        unsafe {
            allocator.Reset().map_err(|e| {
                SandboxError::Graphics(GraphicsError::CommandExecution(format!(
                    "Failed to reset command allocator: {:?}",
                    e
                )))
            })?;
            self.command_list.Reset(allocator, None).map_err(|e| {
                SandboxError::Graphics(GraphicsError::CommandExecution(format!(
                    "Failed to reset command list: {:?}",
                    e
                )))
            })
        }
    }

    /// 关闭命令列表并提交到队列
    pub(super) fn execute_command_list(&mut self) -> Result<()> {
        unsafe {
            self.command_list.Close().map_err(|e| {
                SandboxError::Graphics(GraphicsError::CommandExecution(format!(
                    "Failed to close command list: {:?}",
                    e
                )))
            })?;

            let command_lists = [Some(self.command_list.clone().into())];
            self.queue.ExecuteCommandLists(&command_lists);
        }

        Ok(())
    }

    /// 开始一帧
    ///
    /// 重置命令列表、把后台缓冲转换到 RENDER_TARGET、绑定目标并清除颜色和深度。
    pub fn begin_frame(&mut self) -> Result<()> {
        self.reset_command_list()?;

        let index = self.back_buffer_index();
        let render_target = &self.render_targets[index];
        let rtv = self.rtv_heap.cpu_handle(index as u32);
        let dsv = self.dsv_heap.cpu_handle(0);

        unsafe {
            self.command_list.ResourceBarrier(&[transition_barrier(
                render_target,
                D3D12_RESOURCE_STATE_PRESENT,
                D3D12_RESOURCE_STATE_RENDER_TARGET,
            )]);

            self.command_list.OMSetRenderTargets(1, Some(&rtv), false, Some(&dsv));
            self.command_list.RSSetViewports(&[self.viewport]);
            self.command_list.RSSetScissorRects(&[self.scissor]);

            self.command_list.ClearRenderTargetView(rtv, &self.clear_color, None);
            self.command_list
                .ClearDepthStencilView(dsv, D3D12_CLEAR_FLAG_DEPTH, 1.0, 0, None);
        }

        trace!(index, "Frame begun");
        Ok(())
    }

    /// 结束一帧
    ///
    /// 转换回 PRESENT、提交、Present，然后切换到交换链的下一个后台缓冲。
    pub fn end_frame(&mut self) -> Result<()> {
        let index = self.back_buffer_index();

        unsafe {
            self.command_list.ResourceBarrier(&[transition_barrier(
                &self.render_targets[index],
                D3D12_RESOURCE_STATE_RENDER_TARGET,
                D3D12_RESOURCE_STATE_PRESENT,
            )]);
        }

        self.execute_command_list()?;
        dxgi::present(
            &self.swap_chain,
            self.sync_interval,
            self.swap_chain_spec.allow_tearing,
        )?;
        self.check_debug_messages("Dx12Context::end_frame")?;

        let next = unsafe { self.swap_chain.GetCurrentBackBufferIndex() } as usize;
        self.pacer.move_to_next_frame(next)?;

        trace!(index, next, "Frame presented");
        Ok(())
    }

    /// 窗口大小改变
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            debug!("Window minimized, skipping resize");
            return Ok(());
        }

        debug!("Resizing swapchain...");
        self.pacer.wait_for_gpu()?;

        // 交换链的缓冲必须全部释放后才能 ResizeBuffers
        self.render_targets.clear();
        self.depth_buffer = None;

        dxgi::resize_buffers(&self.swap_chain, &self.swap_chain_spec)?;
        self.swap_chain_spec.width = width;
        self.swap_chain_spec.height = height;

        self.create_render_targets()?;
        self.create_depth_buffer(width, height)?;
        self.pacer.reset();
        self.update_viewport(width, height);

        debug!(width, height, "Resize completed");
        Ok(())
    }

    /// 等待 GPU 完成目前提交的全部工作
    pub fn wait_for_gpu(&mut self) -> Result<()> {
        self.pacer.wait_for_gpu()
    }

    /// 输出调试层消息
    pub fn check_debug_messages(&self, location: &str) -> Result<()> {
        match &self.info_queue {
            Some(queue) => queue.drain(location, self.stop_on_error),
            None => Ok(()),
        }
    }
}

impl Drop for Dx12Context {
    fn drop(&mut self) {
        if let Some(queue) = &self.info_queue {
            let _ = queue.drain("Dx12Context::drop", false);
        }

        if let Err(e) = self.pacer.wait_for_gpu() {
            warn!("Failed to wait for GPU before release: {}", e);
        }

        if self.info_queue.is_some() {
            report_live_objects("Dx12Context::drop");
        }

        debug!("DX12 context dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windows::Win32::Foundation::WAIT_FAILED;

    #[test]
    fn test_check_wait_signaled() {
        assert!(check_wait(WAIT_OBJECT_0, FenceValue::new(3)).is_ok());
    }

    #[test]
    fn test_check_wait_failures() {
        // 0x102 = WAIT_TIMEOUT
        for result in [WAIT_FAILED, WAIT_EVENT(0x102)] {
            let err = check_wait(result, FenceValue::new(7)).unwrap_err();
            assert!(matches!(err, SandboxError::Graphics(GraphicsError::CommandExecution(_))));
            assert!(err.to_string().contains("fence value 7"));
        }
    }
}
