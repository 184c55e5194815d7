//! RenderGraph 错误类型
//!
//! 错误分类：
//! - 配置错误 / 循环依赖：调用方 bug，bake 阶段立即报告，附带定位信息
//! - 分配失败：可恢复，调用方应降级（例如跳过该效果）
//! - 设备超时：不可恢复，整帧废弃

use tessera_gfx_interface::GfxError;

/// RenderGraph 的统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum RenderGraphError {
    /// 配置错误（调用方 bug）：非法子资源范围、引用未声明的句柄、
    /// framebuffer 指向非 render target 等
    #[error("configuration error in pass \"{pass}\" on resource \"{resource}\": {reason}")]
    Configuration {
        /// 出错的 Pass 名称
        pass: String,
        /// 涉及的资源名称
        resource: String,
        /// 具体原因
        reason: String,
    },

    /// 依赖图中存在循环
    #[error("dependency cycle involving passes {passes:?} (via resource \"{resource}\")")]
    GraphCycle {
        /// 参与循环的 Pass 名称
        passes: Vec<String>,
        /// 循环中涉及的一个资源名称（用于定位）
        resource: String,
    },

    /// 临时资源分配失败（可恢复，调用方降级处理）
    #[error("transient allocation failed for \"{resource}\"")]
    AllocationFailed {
        /// 资源名称
        resource: String,
        /// 后端错误
        #[source]
        source: GfxError,
    },

    /// 同步等待超时，设备视为丢失（不可恢复）
    #[error("device timeout while initializing \"{resource}\"")]
    DeviceTimeout {
        /// 正在初始化的资源名称
        resource: String,
        /// 后端错误
        #[source]
        source: GfxError,
    },
}

impl RenderGraphError {
    /// 该错误是否允许调用方降级后继续（而不是终止整帧/进程）
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RenderGraphError::AllocationFailed { .. })
    }
}
