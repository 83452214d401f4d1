//! 资源上传
//!
//! 顶点 / 索引缓冲和纹理都放在默认堆上。数据先写入上传堆，
//! 再由命令列表拷贝到默认堆，等待 GPU 完成后释放上传缓冲。

use std::ffi::c_void;

use tracing::debug;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use super::context::Dx12Context;
use super::{borrow_com, transition_barrier};
use crate::core::error::{GraphicsError, Result, SandboxError};
use crate::geometry::Bitmap;
use crate::gfx::dxgi::RTV_FORMAT;

fn buffer_desc(size: u64) -> D3D12_RESOURCE_DESC {
    D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
        Alignment: 0,
        Width: size,
        Height: 1,
        DepthOrArraySize: 1,
        MipLevels: 1,
        Format: DXGI_FORMAT_UNKNOWN,
        SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
        Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
        Flags: D3D12_RESOURCE_FLAG_NONE,
    }
}

fn committed_resource(
    device: &ID3D12Device,
    heap_type: D3D12_HEAP_TYPE,
    desc: &D3D12_RESOURCE_DESC,
    state: D3D12_RESOURCE_STATES,
    what: &str,
) -> Result<ID3D12Resource> {
    let heap_props = D3D12_HEAP_PROPERTIES {
        Type: heap_type,
        ..Default::default()
    };

    unsafe {
        let mut resource: Option<ID3D12Resource> = None;
        device
            .CreateCommittedResource(&heap_props, D3D12_HEAP_FLAG_NONE, desc, state, None, &mut resource)
            .map_err(|e| {
                SandboxError::Graphics(GraphicsError::ResourceCreation(format!(
                    "Failed to create {}: {:?}",
                    what, e
                )))
            })?;

        resource.ok_or_else(|| {
            SandboxError::Graphics(GraphicsError::ResourceCreation(format!("{} is null", what)))
        })
    }
}

fn map_resource(resource: &ID3D12Resource, what: &str) -> Result<*mut u8> {
    let mut data: *mut c_void = std::ptr::null_mut();
    unsafe { resource.Map(0, None, Some(&mut data)) }.map_err(|e| {
        SandboxError::Graphics(GraphicsError::ResourceCreation(format!(
            "Failed to map {}: {:?}",
            what, e
        )))
    })?;
    Ok(data as *mut u8)
}

impl Dx12Context {
    /// 创建默认堆缓冲并上传数据
    ///
    /// 返回时缓冲处于 GENERIC_READ 状态，上传缓冲已经释放。
    pub fn create_buffer_and_upload(&mut self, bytes: &[u8]) -> Result<ID3D12Resource> {
        let size = bytes.len() as u64;
        let desc = buffer_desc(size);

        let buffer = committed_resource(
            &self.device,
            D3D12_HEAP_TYPE_DEFAULT,
            &desc,
            D3D12_RESOURCE_STATE_COPY_DEST,
            "default buffer",
        )?;
        let upload = committed_resource(
            &self.device,
            D3D12_HEAP_TYPE_UPLOAD,
            &desc,
            D3D12_RESOURCE_STATE_GENERIC_READ,
            "upload buffer",
        )?;

        let data = map_resource(&upload, "upload buffer")?;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), data, bytes.len());
            upload.Unmap(0, None);
        }

        self.reset_command_list()?;
        unsafe {
            self.command_list.CopyResource(&buffer, &upload);
            self.command_list.ResourceBarrier(&[transition_barrier(
                &buffer,
                D3D12_RESOURCE_STATE_COPY_DEST,
                D3D12_RESOURCE_STATE_GENERIC_READ,
            )]);
        }
        self.execute_command_list()?;
        self.pacer.wait_for_gpu()?;

        drop(upload);
        debug!(bytes = size, "Buffer uploaded");
        Ok(buffer)
    }

    /// 创建 B8G8R8A8 纹理并上传位图
    ///
    /// 按 `GetCopyableFootprints` 给出的 RowPitch 逐行拷贝，
    /// 返回时纹理处于 PIXEL_SHADER_RESOURCE 状态。
    pub fn create_texture_and_upload(&mut self, bitmap: &Bitmap) -> Result<ID3D12Resource> {
        let texture_desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
            Alignment: 0,
            Width: bitmap.width as u64,
            Height: bitmap.height,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: RTV_FORMAT,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
            Flags: D3D12_RESOURCE_FLAG_NONE,
        };

        let mut footprint = D3D12_PLACED_SUBRESOURCE_FOOTPRINT::default();
        let mut num_rows = 0u32;
        let mut row_size = 0u64;
        let mut total_bytes = 0u64;
        unsafe {
            self.device.GetCopyableFootprints(
                &texture_desc,
                0,
                1,
                0,
                Some(&mut footprint),
                Some(&mut num_rows),
                Some(&mut row_size),
                Some(&mut total_bytes),
            );
        }

        let texture = committed_resource(
            &self.device,
            D3D12_HEAP_TYPE_DEFAULT,
            &texture_desc,
            D3D12_RESOURCE_STATE_COPY_DEST,
            "texture",
        )?;
        let upload = committed_resource(
            &self.device,
            D3D12_HEAP_TYPE_UPLOAD,
            &buffer_desc(total_bytes),
            D3D12_RESOURCE_STATE_GENERIC_READ,
            "texture upload buffer",
        )?;

        let data = map_resource(&upload, "texture upload buffer")?;
        let row_pitch = footprint.Footprint.RowPitch as usize;
        let copy_size = (row_size as usize).min(bitmap.row_pitch() as usize);
        unsafe {
            for row in 0..num_rows {
                let Some(src) = bitmap.row(row) else { break };
                let dst = data.add(footprint.Offset as usize + row as usize * row_pitch);
                std::ptr::copy_nonoverlapping(src.as_ptr(), dst, copy_size);
            }
            upload.Unmap(0, None);
        }

        let dst = D3D12_TEXTURE_COPY_LOCATION {
            pResource: unsafe { borrow_com(&texture) },
            Type: D3D12_TEXTURE_COPY_TYPE_SUBRESOURCE_INDEX,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 { SubresourceIndex: 0 },
        };
        let src = D3D12_TEXTURE_COPY_LOCATION {
            pResource: unsafe { borrow_com(&upload) },
            Type: D3D12_TEXTURE_COPY_TYPE_PLACED_FOOTPRINT,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 { PlacedFootprint: footprint },
        };

        self.reset_command_list()?;
        unsafe {
            self.command_list.CopyTextureRegion(&dst, 0, 0, 0, &src, None);
            self.command_list.ResourceBarrier(&[transition_barrier(
                &texture,
                D3D12_RESOURCE_STATE_COPY_DEST,
                D3D12_RESOURCE_STATE_PIXEL_SHADER_RESOURCE,
            )]);
        }
        self.execute_command_list()?;
        self.pacer.wait_for_gpu()?;

        drop(upload);
        debug!(
            width = bitmap.width,
            height = bitmap.height,
            row_pitch,
            "Texture uploaded"
        );
        Ok(texture)
    }
}
