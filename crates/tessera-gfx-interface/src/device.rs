//! 设备与命令录制的 trait 边界
//!
//! 具体后端（Vulkan / 测试 mock）实现这些 trait，
//! RenderGraph 核心以构造参数的形式接收它们，不持有任何全局单例。

use std::time::Duration;

use ash::vk;

use crate::barrier::{GfxAccelStructBarrier, GfxBufferBarrier, GfxImageBarrier};
use crate::caps::DeviceCapabilities;
use crate::desc::{GfxBufferDesc, GfxImageDesc};
use crate::handles::{GfxBufferHandle, GfxFenceHandle, GfxImageHandle};

/// 图形后端错误
#[derive(Debug, thiserror::Error)]
pub enum GfxError {
    /// 资源创建失败
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// 显存耗尽
    #[error("out of device memory (requested {requested} bytes)")]
    OutOfDeviceMemory {
        /// 请求的字节数
        requested: u64,
    },

    /// fence 等待超时，设备视为丢失
    #[error("fence wait timed out after {waited:?}, device considered lost")]
    FenceTimeout {
        /// 实际等待的时长
        waited: Duration,
    },

    /// 设备丢失
    #[error("device lost")]
    DeviceLost,
}

/// rendering attachment 的 load 操作
///
/// 不直接使用 `vk::ClearValue`（union，无 Debug），改用普通值表示。
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GfxLoadOp {
    /// 保留原有内容
    Load,
    /// 清空为指定颜色
    ClearColor([f32; 4]),
    /// 清空深度/模板
    ClearDepthStencil {
        /// 深度清空值
        depth: f32,
        /// 模板清空值
        stencil: u32,
    },
    /// 内容不关心（可以 discard）
    DontCare,
}

/// rendering 的单个 attachment
#[derive(Clone, Copy, Debug)]
pub struct GfxRenderingAttachment {
    /// 目标图像
    pub image: GfxImageHandle,
    /// load 操作
    pub load_op: GfxLoadOp,
    /// 目标数组层
    pub array_layer: u32,
}

/// begin_rendering 所需的全部信息
#[derive(Clone, Debug, Default)]
pub struct GfxRenderingInfo {
    /// 颜色 attachment 列表
    pub color_attachments: Vec<GfxRenderingAttachment>,
    /// 可选的深度 attachment
    pub depth_attachment: Option<GfxRenderingAttachment>,
    /// 渲染区域（宽、高）
    pub render_area: (u32, u32),
}

/// 命令录制接口
///
/// 一个实例对应一个 command buffer（primary 或 secondary）。
/// RenderGraph 只通过此 trait 录制命令，不关心底层编码细节。
pub trait GfxCommandEncoder: Send {
    /// 批量提交一个 Pass 边界上的所有 barrier
    ///
    /// 固定开销较大的后端依赖这里的批量性，RenderGraph 保证
    /// 每个 Pass 至多调用一次。
    fn pipeline_barrier(
        &mut self,
        image_barriers: &[GfxImageBarrier],
        buffer_barriers: &[GfxBufferBarrier],
        accel_struct_barriers: &[GfxAccelStructBarrier],
    );

    /// 开始 dynamic rendering（图形 Pass）
    fn begin_rendering(&mut self, info: &GfxRenderingInfo);

    /// 结束 dynamic rendering
    fn end_rendering(&mut self);

    /// 开始 debug label 区间
    fn begin_label(&mut self, name: &str);

    /// 结束 debug label 区间
    fn end_label(&mut self);

    /// 将一个 secondary command buffer 合并进当前（primary）命令流
    ///
    /// 合并顺序即调用顺序，由 RenderGraph 保证为拓扑顺序。
    fn execute_secondary(&mut self, secondary: Box<dyn GfxCommandEncoder>);
}

/// secondary command buffer 的获取接口
///
/// 并行录制时每个 worker 各取一个 encoder；pool 需要允许跨线程取用。
pub trait GfxCommandPool: Sync {
    /// 创建一个新的 secondary command buffer
    fn new_secondary(&self, flags: vk::CommandBufferUsageFlags) -> Box<dyn GfxCommandEncoder>;
}

/// 设备接口
///
/// 资源创建失败返回错误，绝不返回静默接受的空句柄。
pub trait GfxDevice {
    /// 创建图像
    fn create_image(&self, desc: &GfxImageDesc, debug_name: &str) -> Result<GfxImageHandle, GfxError>;

    /// 创建缓冲区
    ///
    /// `desc.zero_init` 为 true 时，后端负责发起一次清零写入，
    /// 并通过 [`GfxDevice::buffer_init_fence`] 暴露对应的 fence。
    fn create_buffer(&self, desc: &GfxBufferDesc, debug_name: &str) -> Result<GfxBufferHandle, GfxError>;

    /// 销毁图像（归还到后端的池，不要求立即释放给 OS）
    fn destroy_image(&self, image: GfxImageHandle);

    /// 销毁缓冲区
    fn destroy_buffer(&self, buffer: GfxBufferHandle);

    /// 查询 zero_init 缓冲区的初始化 fence
    ///
    /// 返回 None 表示初始化已经完成（或该缓冲区不需要初始化）。
    fn buffer_init_fence(&self, buffer: GfxBufferHandle) -> Option<GfxFenceHandle>;

    /// 同步等待 fence
    ///
    /// 超时返回 [`GfxError::FenceTimeout`]，调用方应视设备为丢失。
    fn wait_fence(&self, fence: GfxFenceHandle, timeout: Duration) -> Result<(), GfxError>;

    /// 查询设备能力，bake 阶段调用一次
    fn capabilities(&self) -> DeviceCapabilities;
}
