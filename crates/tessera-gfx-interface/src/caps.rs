//! 设备能力查询
//!
//! bake 阶段查询一次，Pass 回调可以据此选择代码路径
//! （例如是否可用 min/max filter 或 64 位原子操作）。

/// 设备能力集合
#[derive(Clone, Copy, Debug)]
pub struct DeviceCapabilities {
    /// Uniform buffer 的 offset 对齐要求
    pub uniform_buffer_offset_alignment: u64,
    /// Storage buffer 的 offset 对齐要求
    pub storage_buffer_offset_alignment: u64,
    /// 2D 图像的最大边长
    pub max_image_dimension_2d: u32,
    /// 单个 storage buffer 的最大字节数
    pub max_storage_buffer_range: u64,
    /// 是否支持 min/max sampler reduction（HZB 生成等会用到）
    pub supports_min_max_sampler: bool,
    /// 是否支持 64 位原子操作
    pub supports_64bit_atomics: bool,
    /// 是否支持 ray tracing pipeline
    pub supports_ray_tracing: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        // 保守的基线能力，任何 Vulkan 1.2 设备都满足
        Self {
            uniform_buffer_offset_alignment: 256,
            storage_buffer_offset_alignment: 64,
            max_image_dimension_2d: 4096,
            max_storage_buffer_range: 1 << 27,
            supports_min_max_sampler: false,
            supports_64bit_atomics: false,
            supports_ray_tracing: false,
        }
    }
}
