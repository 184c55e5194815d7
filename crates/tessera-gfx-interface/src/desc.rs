//! 资源创建描述
//!
//! 创建 Image/Buffer 所需的全部信息，RenderGraph 在声明阶段填写，
//! bake 阶段交给 [`crate::GfxDevice`] 创建物理资源。创建之后不可变。

use ash::vk;

/// 图像创建描述
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GfxImageDesc {
    /// 图像宽度
    pub width: u32,
    /// 图像高度
    pub height: u32,
    /// 图像深度（3D 纹理）
    pub depth: u32,
    /// Mip 级别数
    pub mip_levels: u32,
    /// 数组层数
    pub array_layers: u32,
    /// 图像格式
    pub format: vk::Format,
    /// 图像用途
    pub usage: vk::ImageUsageFlags,
    /// 采样数
    pub samples: vk::SampleCountFlags,
}

impl Default for GfxImageDesc {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth: 1,
            mip_levels: 1,
            array_layers: 1,
            format: vk::Format::R8G8B8A8_UNORM,
            usage: vk::ImageUsageFlags::SAMPLED,
            samples: vk::SampleCountFlags::TYPE_1,
        }
    }
}

impl GfxImageDesc {
    /// 创建 2D 图像描述
    #[inline]
    pub fn new_2d(width: u32, height: u32, format: vk::Format, usage: vk::ImageUsageFlags) -> Self {
        Self { width, height, format, usage, ..Default::default() }
    }

    /// 设置 mip 级别数
    #[inline]
    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    /// 设置数组层数
    #[inline]
    pub fn with_array_layers(mut self, array_layers: u32) -> Self {
        self.array_layers = array_layers;
        self
    }

    /// 从格式推断 aspect
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        match self.format {
            vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => {
                vk::ImageAspectFlags::DEPTH
            }
            vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
            vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            }
            _ => vk::ImageAspectFlags::COLOR,
        }
    }

    /// 估算图像占用的显存字节数
    ///
    /// 只用于临时资源的 size-class 归类，不要求精确到对齐。
    pub fn estimated_byte_size(&self) -> u64 {
        let texel_size = Self::format_byte_size(self.format) as u64;
        let mut total = 0u64;
        for mip in 0..self.mip_levels {
            let w = (self.width >> mip).max(1) as u64;
            let h = (self.height >> mip).max(1) as u64;
            let d = (self.depth >> mip).max(1) as u64;
            total += w * h * d * texel_size;
        }
        total * self.array_layers as u64 * self.samples.as_raw().count_ones() as u64
    }

    /// 常见格式的单 texel 字节数（保守估计，未知格式按 16 字节算）
    fn format_byte_size(format: vk::Format) -> u32 {
        match format {
            vk::Format::R8_UNORM | vk::Format::R8_UINT | vk::Format::S8_UINT => 1,
            vk::Format::R8G8_UNORM | vk::Format::R16_SFLOAT | vk::Format::R16_UINT | vk::Format::D16_UNORM => 2,
            vk::Format::R8G8B8A8_UNORM
            | vk::Format::R8G8B8A8_SRGB
            | vk::Format::B8G8R8A8_UNORM
            | vk::Format::B10G11R11_UFLOAT_PACK32
            | vk::Format::A2B10G10R10_UNORM_PACK32
            | vk::Format::R16G16_SFLOAT
            | vk::Format::R32_SFLOAT
            | vk::Format::R32_UINT
            | vk::Format::D32_SFLOAT
            | vk::Format::D24_UNORM_S8_UINT => 4,
            vk::Format::R16G16B16A16_SFLOAT | vk::Format::R32G32_SFLOAT | vk::Format::D32_SFLOAT_S8_UINT => 8,
            _ => 16,
        }
    }
}

/// 缓冲区创建描述
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GfxBufferDesc {
    /// 缓冲区大小（字节）
    pub size: vk::DeviceSize,
    /// 缓冲区用途
    pub usage: vk::BufferUsageFlags,
    /// 是否需要在首次使用前清零（例如 counter buffer）
    ///
    /// 清零通过一次 GPU 写入完成，分配器会在 fence 上同步等待。
    pub zero_init: bool,
}

impl Default for GfxBufferDesc {
    fn default() -> Self {
        Self {
            size: 0,
            usage: vk::BufferUsageFlags::STORAGE_BUFFER,
            zero_init: false,
        }
    }
}

impl GfxBufferDesc {
    /// 创建新描述
    #[inline]
    pub fn new(size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self { size, usage, zero_init: false }
    }

    /// 要求首次使用前清零
    #[inline]
    pub fn with_zero_init(mut self) -> Self {
        self.zero_init = true;
        self
    }
}
