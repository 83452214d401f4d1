//! 根签名
//!
//! 三种根签名，对应绘制项需要绑定的资源：
//!
//! | 种类 | 参数 |
//! |------|------|
//! | 0 | 无参数，只允许输入装配布局 |
//! | 1 | b0 上 16 个 32 位常量（MVP），顶点着色器可见 |
//! | 2 | 1 + t0 上的 SRV 描述符表（像素着色器可见）+ s0 静态采样器 |

use tracing::debug;
use windows::Win32::Graphics::Direct3D::ID3DBlob;
use windows::Win32::Graphics::Direct3D12::*;

use crate::core::error::{GraphicsError, Result, SandboxError};
use crate::renderer::draw_set::RootSignatureKind;
use crate::renderer::shaders::{MVP_REGISTER_B, SAMPLER_REGISTER_S, TEXTURE_REGISTER_T};

/// MVP 根参数的下标
pub const MVP_PARAMETER: u32 = 0;
/// SRV 描述符表根参数的下标
pub const TEXTURE_PARAMETER: u32 = 1;
/// MVP 占用的 32 位常量个数
pub const MVP_CONSTANTS: u32 = 16;

fn mvp_parameter() -> D3D12_ROOT_PARAMETER {
    D3D12_ROOT_PARAMETER {
        ParameterType: D3D12_ROOT_PARAMETER_TYPE_32BIT_CONSTANTS,
        Anonymous: D3D12_ROOT_PARAMETER_0 {
            Constants: D3D12_ROOT_CONSTANTS {
                ShaderRegister: MVP_REGISTER_B,
                RegisterSpace: 0,
                Num32BitValues: MVP_CONSTANTS,
            },
        },
        ShaderVisibility: D3D12_SHADER_VISIBILITY_VERTEX,
    }
}

fn point_sampler() -> D3D12_STATIC_SAMPLER_DESC {
    D3D12_STATIC_SAMPLER_DESC {
        Filter: D3D12_FILTER_MIN_MAG_MIP_POINT,
        AddressU: D3D12_TEXTURE_ADDRESS_MODE_BORDER,
        AddressV: D3D12_TEXTURE_ADDRESS_MODE_BORDER,
        AddressW: D3D12_TEXTURE_ADDRESS_MODE_BORDER,
        MipLODBias: 0.0,
        MaxAnisotropy: 0,
        ComparisonFunc: D3D12_COMPARISON_FUNC_NEVER,
        BorderColor: D3D12_STATIC_BORDER_COLOR_TRANSPARENT_BLACK,
        MinLOD: 0.0,
        MaxLOD: D3D12_FLOAT32_MAX,
        ShaderRegister: SAMPLER_REGISTER_S,
        RegisterSpace: 0,
        ShaderVisibility: D3D12_SHADER_VISIBILITY_PIXEL,
    }
}

/// 创建根签名
pub fn create_root_signature(device: &ID3D12Device, kind: RootSignatureKind) -> Result<ID3D12RootSignature> {
    let srv_range = D3D12_DESCRIPTOR_RANGE {
        RangeType: D3D12_DESCRIPTOR_RANGE_TYPE_SRV,
        NumDescriptors: 1,
        BaseShaderRegister: TEXTURE_REGISTER_T,
        RegisterSpace: 0,
        OffsetInDescriptorsFromTableStart: D3D12_DESCRIPTOR_RANGE_OFFSET_APPEND,
    };

    let mut parameters = Vec::new();
    let mut samplers = Vec::new();

    if matches!(kind, RootSignatureKind::MvpConstants | RootSignatureKind::MvpTexture) {
        parameters.push(mvp_parameter());
    }

    if kind == RootSignatureKind::MvpTexture {
        parameters.push(D3D12_ROOT_PARAMETER {
            ParameterType: D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE,
            Anonymous: D3D12_ROOT_PARAMETER_0 {
                DescriptorTable: D3D12_ROOT_DESCRIPTOR_TABLE {
                    NumDescriptorRanges: 1,
                    pDescriptorRanges: &srv_range,
                },
            },
            ShaderVisibility: D3D12_SHADER_VISIBILITY_PIXEL,
        });
        samplers.push(point_sampler());
    }

    let desc = D3D12_ROOT_SIGNATURE_DESC {
        NumParameters: parameters.len() as u32,
        pParameters: if parameters.is_empty() { std::ptr::null() } else { parameters.as_ptr() },
        NumStaticSamplers: samplers.len() as u32,
        pStaticSamplers: if samplers.is_empty() { std::ptr::null() } else { samplers.as_ptr() },
        Flags: D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT,
    };

    unsafe {
        let mut signature: Option<ID3DBlob> = None;
        let mut error: Option<ID3DBlob> = None;
        D3D12SerializeRootSignature(&desc, D3D_ROOT_SIGNATURE_VERSION_1, &mut signature, Some(&mut error))
            .map_err(|e| {
                let details = error
                    .as_ref()
                    .map(|blob| super::shader::blob_text(blob))
                    .unwrap_or_default();
                SandboxError::Graphics(GraphicsError::ResourceCreation(format!(
                    "Failed to serialize root signature {:?}: {:?} {}",
                    kind, e, details
                )))
            })?;

        let signature = signature.ok_or_else(|| {
            SandboxError::Graphics(GraphicsError::ResourceCreation(
                "Serialized root signature is empty".to_string(),
            ))
        })?;

        let root_signature: ID3D12RootSignature = device
            .CreateRootSignature(
                0,
                std::slice::from_raw_parts(
                    signature.GetBufferPointer() as *const u8,
                    signature.GetBufferSize(),
                ),
            )
            .map_err(|e| {
                SandboxError::Graphics(GraphicsError::ResourceCreation(format!(
                    "Failed to create root signature {:?}: {:?}",
                    kind, e
                )))
            })?;

        debug!(?kind, parameters = parameters.len(), "Root signature created");
        Ok(root_signature)
    }
}
