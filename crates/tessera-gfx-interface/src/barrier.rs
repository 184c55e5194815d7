//! Barrier 数据结构
//!
//! RenderGraph 计算出的资源状态转换，以这些 POD 结构交给后端。
//! 一个 Pass 边界上的所有 barrier 合并为一次
//! [`crate::GfxCommandEncoder::pipeline_barrier`] 调用。

use ash::vk;

use crate::handles::{GfxAccelStructHandle, GfxBufferHandle, GfxImageHandle};

/// 图像子资源范围
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxImageSubresourceRange {
    /// Aspect（COLOR / DEPTH / STENCIL）
    pub aspect: vk::ImageAspectFlags,
    /// 起始 mip 级别
    pub base_mip_level: u32,
    /// mip 级别数
    pub level_count: u32,
    /// 起始数组层
    pub base_array_layer: u32,
    /// 数组层数
    pub layer_count: u32,
}

impl GfxImageSubresourceRange {
    /// 覆盖整个图像的范围
    #[inline]
    pub const fn whole(aspect: vk::ImageAspectFlags) -> Self {
        Self {
            aspect,
            base_mip_level: 0,
            level_count: vk::REMAINING_MIP_LEVELS,
            base_array_layer: 0,
            layer_count: vk::REMAINING_ARRAY_LAYERS,
        }
    }

    /// 单个 mip + 单个数组层
    #[inline]
    pub const fn single(aspect: vk::ImageAspectFlags, mip_level: u32, array_layer: u32) -> Self {
        Self {
            aspect,
            base_mip_level: mip_level,
            level_count: 1,
            base_array_layer: array_layer,
            layer_count: 1,
        }
    }
}

/// 图像 barrier
#[derive(Clone, Copy, Debug)]
pub struct GfxImageBarrier {
    /// 目标图像
    pub image: GfxImageHandle,
    /// 源 stage
    pub src_stage: vk::PipelineStageFlags2,
    /// 源 access
    pub src_access: vk::AccessFlags2,
    /// 目标 stage
    pub dst_stage: vk::PipelineStageFlags2,
    /// 目标 access
    pub dst_access: vk::AccessFlags2,
    /// 旧 layout
    pub old_layout: vk::ImageLayout,
    /// 新 layout
    pub new_layout: vk::ImageLayout,
    /// 子资源范围
    pub subresource: GfxImageSubresourceRange,
}

/// 缓冲区 barrier
#[derive(Clone, Copy, Debug)]
pub struct GfxBufferBarrier {
    /// 目标缓冲区
    pub buffer: GfxBufferHandle,
    /// 源 stage
    pub src_stage: vk::PipelineStageFlags2,
    /// 源 access
    pub src_access: vk::AccessFlags2,
    /// 目标 stage
    pub dst_stage: vk::PipelineStageFlags2,
    /// 目标 access
    pub dst_access: vk::AccessFlags2,
    /// 缓冲区偏移
    pub offset: vk::DeviceSize,
    /// 范围大小（WHOLE_SIZE 表示整个缓冲区）
    pub size: vk::DeviceSize,
}

/// 加速结构 barrier
///
/// 加速结构没有 layout 概念，只需要 stage/access 同步。
#[derive(Clone, Copy, Debug)]
pub struct GfxAccelStructBarrier {
    /// 目标加速结构
    pub accel_struct: GfxAccelStructHandle,
    /// 源 stage
    pub src_stage: vk::PipelineStageFlags2,
    /// 源 access
    pub src_access: vk::AccessFlags2,
    /// 目标 stage
    pub dst_stage: vk::PipelineStageFlags2,
    /// 目标 access
    pub dst_access: vk::AccessFlags2,
}
