//! 图形后端的窄接口层
//!
//! RenderGraph 核心不直接依赖具体的图形 API 实现，
//! 只通过这里定义的 trait 与后端交互：
//!
//! - [`GfxDevice`]: 资源创建、能力查询、fence 等待、提交
//! - [`GfxCommandEncoder`]: barrier 批量提交、rendering、debug label
//! - [`GfxCommandPool`]: secondary command buffer 的获取
//!
//! 所有类型都以 `ash::vk` 的枚举/位掩码作为词汇表，
//! 但本 crate 自身不调用任何驱动函数，具体后端由调用方注入。

mod barrier;
mod caps;
mod desc;
mod device;
mod handles;

pub use barrier::{GfxAccelStructBarrier, GfxBufferBarrier, GfxImageBarrier, GfxImageSubresourceRange};
pub use caps::DeviceCapabilities;
pub use desc::{GfxBufferDesc, GfxImageDesc};
pub use device::{
    GfxCommandEncoder, GfxCommandPool, GfxDevice, GfxError, GfxLoadOp, GfxRenderingAttachment, GfxRenderingInfo,
};
pub use handles::{GfxAccelStructHandle, GfxBufferHandle, GfxFenceHandle, GfxImageHandle};
