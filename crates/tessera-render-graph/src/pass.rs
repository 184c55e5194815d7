//! Pass 定义和构建器
//!
//! 提供 [`RgPass`] trait 用于声明式定义渲染 Pass，
//! 以及 [`RgPassBuilder`] 用于在 setup 阶段声明资源依赖。

use slotmap::SecondaryMap;
use tessera_gfx_interface::{
    DeviceCapabilities, GfxAccelStructHandle, GfxBufferDesc, GfxBufferHandle, GfxCommandEncoder, GfxImageDesc,
    GfxImageHandle, GfxImageSubresourceRange, GfxLoadOp,
};

use crate::handle::{RgAccelStructHandle, RgBufferHandle, RgImageHandle};
use crate::resource::RgResourceRegistry;
use crate::state::{RgBufferState, RgImageState};

/// Pass 的类型
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgPassKind {
    /// 图形 Pass：必须声明 framebuffer，执行时自动包裹 begin/end_rendering
    Graphics,
    /// 计算 Pass：不允许声明 framebuffer
    Compute,
}

/// Pass 对图像的一次访问声明
#[derive(Clone, Debug)]
pub struct RgImageAccess {
    /// 目标图像
    pub handle: RgImageHandle,
    /// 访问状态
    pub state: RgImageState,
    /// 子资源范围；None 表示整个图像
    pub subresource: Option<GfxImageSubresourceRange>,
}

/// Pass 对缓冲区的一次访问声明
#[derive(Clone, Debug)]
pub struct RgBufferAccess {
    /// 目标缓冲区
    pub handle: RgBufferHandle,
    /// 访问状态
    pub state: RgBufferState,
}

/// Pass 对加速结构的一次访问声明
#[derive(Clone, Debug)]
pub struct RgAccelStructAccess {
    /// 目标加速结构
    pub handle: RgAccelStructHandle,
    /// 访问状态
    pub state: RgBufferState,
}

/// 图形 Pass 的颜色 attachment
#[derive(Clone, Copy, Debug)]
pub struct RgColorTarget {
    /// 目标图像
    pub image: RgImageHandle,
    /// load 操作
    pub load_op: GfxLoadOp,
    /// 目标数组层
    pub array_layer: u32,
}

impl RgColorTarget {
    /// 创建指向第 0 层的颜色 attachment
    #[inline]
    pub fn new(image: RgImageHandle, load_op: GfxLoadOp) -> Self {
        Self { image, load_op, array_layer: 0 }
    }
}

/// 图形 Pass 的深度 attachment
#[derive(Clone, Copy, Debug)]
pub struct RgDepthTarget {
    /// 目标图像
    pub image: RgImageHandle,
    /// load 操作
    pub load_op: GfxLoadOp,
    /// 目标数组层
    pub array_layer: u32,
    /// 是否只读（shadow map 采样 Pass 等）
    pub read_only: bool,
}

impl RgDepthTarget {
    /// 创建可写的深度 attachment
    #[inline]
    pub fn new(image: RgImageHandle, load_op: GfxLoadOp) -> Self {
        Self { image, load_op, array_layer: 0, read_only: false }
    }

    /// 创建只读的深度 attachment
    #[inline]
    pub fn read_only(image: RgImageHandle) -> Self {
        Self { image, load_op: GfxLoadOp::Load, array_layer: 0, read_only: true }
    }
}

/// 图形 Pass 的 framebuffer 声明
#[derive(Clone, Debug, Default)]
pub struct RgFramebufferInfo {
    /// 颜色 attachment 列表
    pub color_targets: Vec<RgColorTarget>,
    /// 可选的深度 attachment
    pub depth_target: Option<RgDepthTarget>,
    /// 渲染区域（宽、高）
    pub render_area: (u32, u32),
}

/// Pass 构建器
///
/// 在 [`RgPass::setup`] 中使用，声明 Pass 的资源依赖。
/// 声明 framebuffer attachment 会自动产生对应的读/写访问，
/// 不需要再额外调用 read/write_image。
pub struct RgPassBuilder<'reg> {
    pub(crate) name: String,
    pub(crate) kind: RgPassKind,

    /// 图像读取列表
    pub(crate) image_reads: Vec<RgImageAccess>,
    /// 图像写入列表
    pub(crate) image_writes: Vec<RgImageAccess>,
    /// 缓冲区读取列表
    pub(crate) buffer_reads: Vec<RgBufferAccess>,
    /// 缓冲区写入列表
    pub(crate) buffer_writes: Vec<RgBufferAccess>,
    /// 加速结构读取列表
    pub(crate) accel_struct_reads: Vec<RgAccelStructAccess>,
    /// 加速结构写入列表
    pub(crate) accel_struct_writes: Vec<RgAccelStructAccess>,

    /// 图形 Pass 的 framebuffer
    pub(crate) framebuffer: Option<RgFramebufferInfo>,

    /// 资源注册表引用（用于创建临时资源）
    pub(crate) resources: &'reg mut RgResourceRegistry,
}

impl<'reg> RgPassBuilder<'reg> {
    pub(crate) fn new(name: String, kind: RgPassKind, resources: &'reg mut RgResourceRegistry) -> Self {
        Self {
            name,
            kind,
            image_reads: Vec::new(),
            image_writes: Vec::new(),
            buffer_reads: Vec::new(),
            buffer_writes: Vec::new(),
            accel_struct_reads: Vec::new(),
            accel_struct_writes: Vec::new(),
            framebuffer: None,
            resources,
        }
    }

    /// 声明读取图像（整个图像）
    #[inline]
    pub fn read_image(&mut self, handle: RgImageHandle, state: RgImageState) -> RgImageHandle {
        self.image_reads.push(RgImageAccess { handle, state, subresource: None });
        handle
    }

    /// 声明读取图像的某个子资源范围
    pub fn read_image_range(
        &mut self,
        handle: RgImageHandle,
        state: RgImageState,
        subresource: GfxImageSubresourceRange,
    ) -> RgImageHandle {
        self.image_reads.push(RgImageAccess { handle, state, subresource: Some(subresource) });
        handle
    }

    /// 声明写入图像（整个图像）
    pub fn write_image(&mut self, handle: RgImageHandle, state: RgImageState) -> RgImageHandle {
        self.image_writes.push(RgImageAccess { handle, state, subresource: None });
        handle
    }

    /// 声明写入图像的某个子资源范围
    ///
    /// 典型场景：mip 链逐级降采样，每级一个 Pass 写一个 mip。
    pub fn write_image_range(
        &mut self,
        handle: RgImageHandle,
        state: RgImageState,
        subresource: GfxImageSubresourceRange,
    ) -> RgImageHandle {
        self.image_writes.push(RgImageAccess { handle, state, subresource: Some(subresource) });
        handle
    }

    /// 声明读写图像（累积类操作）
    pub fn read_write_image(&mut self, handle: RgImageHandle, state: RgImageState) -> RgImageHandle {
        self.read_image(handle, state);
        self.write_image(handle, state)
    }

    /// 创建临时图像
    ///
    /// 物理图像在 bake 阶段分配，finish 后归还到池中供后续帧复用。
    pub fn create_image(&mut self, name: &str, desc: GfxImageDesc) -> RgImageHandle {
        self.resources.create_image(name, desc)
    }

    /// 声明读取缓冲区
    #[inline]
    pub fn read_buffer(&mut self, handle: RgBufferHandle, state: RgBufferState) -> RgBufferHandle {
        self.buffer_reads.push(RgBufferAccess { handle, state });
        handle
    }

    /// 声明写入缓冲区
    pub fn write_buffer(&mut self, handle: RgBufferHandle, state: RgBufferState) -> RgBufferHandle {
        self.buffer_writes.push(RgBufferAccess { handle, state });
        handle
    }

    /// 声明读写缓冲区
    pub fn read_write_buffer(&mut self, handle: RgBufferHandle, state: RgBufferState) -> RgBufferHandle {
        self.read_buffer(handle, state);
        self.write_buffer(handle, state)
    }

    /// 创建临时缓冲区
    pub fn create_buffer(&mut self, name: &str, desc: GfxBufferDesc) -> RgBufferHandle {
        self.resources.create_buffer(name, desc)
    }

    /// 声明读取加速结构
    #[inline]
    pub fn read_accel_struct(&mut self, handle: RgAccelStructHandle, state: RgBufferState) -> RgAccelStructHandle {
        self.accel_struct_reads.push(RgAccelStructAccess { handle, state });
        handle
    }

    /// 声明写入加速结构（refit 等）
    pub fn write_accel_struct(&mut self, handle: RgAccelStructHandle, state: RgBufferState) -> RgAccelStructHandle {
        self.accel_struct_writes.push(RgAccelStructAccess { handle, state });
        handle
    }

    /// 声明图形 Pass 的 framebuffer
    ///
    /// attachment 自动注册为写访问（只读深度注册为读访问），
    /// bake 阶段校验 attachment 的 usage flags 和 array layer 范围。
    pub fn set_framebuffer(&mut self, framebuffer: RgFramebufferInfo) {
        for color in &framebuffer.color_targets {
            self.image_writes.push(RgImageAccess {
                handle: color.image,
                state: RgImageState::COLOR_ATTACHMENT_WRITE,
                subresource: None,
            });
        }
        if let Some(depth) = &framebuffer.depth_target {
            if depth.read_only {
                self.image_reads.push(RgImageAccess {
                    handle: depth.image,
                    state: RgImageState::DEPTH_ATTACHMENT_READ,
                    subresource: None,
                });
            } else {
                self.image_writes.push(RgImageAccess {
                    handle: depth.image,
                    state: RgImageState::DEPTH_ATTACHMENT_READ_WRITE,
                    subresource: None,
                });
            }
        }
        self.framebuffer = Some(framebuffer);
    }
}

/// Pass 节点数据（bake 后使用）
pub struct RgPassNode<'exec> {
    /// Pass 名称
    pub name: String,
    /// Pass 类型
    pub kind: RgPassKind,

    /// 图像读取
    pub image_reads: Vec<RgImageAccess>,
    /// 图像写入
    pub image_writes: Vec<RgImageAccess>,
    /// 缓冲区读取
    pub buffer_reads: Vec<RgBufferAccess>,
    /// 缓冲区写入
    pub buffer_writes: Vec<RgBufferAccess>,
    /// 加速结构读取
    pub accel_struct_reads: Vec<RgAccelStructAccess>,
    /// 加速结构写入
    pub accel_struct_writes: Vec<RgAccelStructAccess>,

    /// 图形 Pass 的 framebuffer
    pub framebuffer: Option<RgFramebufferInfo>,

    /// 类型擦除的 Pass 实现
    pub(crate) pass: Box<dyn RgPass + 'exec>,
}

/// Pass 执行时的上下文
///
/// 提供 Pass 执行所需的物理资源查询和命令录制接口。
pub struct RgPassContext<'a> {
    /// 命令录制接口（并行模式下是各 worker 自己的 secondary）
    pub cmd: &'a mut dyn GfxCommandEncoder,

    /// 物理资源查询表（bake 后填充）
    pub(crate) image_handles: &'a SecondaryMap<RgImageHandle, GfxImageHandle>,
    pub(crate) buffer_handles: &'a SecondaryMap<RgBufferHandle, GfxBufferHandle>,
    pub(crate) accel_struct_handles: &'a SecondaryMap<RgAccelStructHandle, GfxAccelStructHandle>,

    /// bake 时的设备能力快照
    pub(crate) caps: &'a DeviceCapabilities,
}

impl<'a> RgPassContext<'a> {
    /// 获取图像的物理句柄
    #[inline]
    pub fn get_image(&self, handle: RgImageHandle) -> Option<GfxImageHandle> {
        self.image_handles.get(handle).copied()
    }

    /// 获取缓冲区的物理句柄
    #[inline]
    pub fn get_buffer(&self, handle: RgBufferHandle) -> Option<GfxBufferHandle> {
        self.buffer_handles.get(handle).copied()
    }

    /// 获取加速结构的物理句柄
    #[inline]
    pub fn get_accel_struct(&self, handle: RgAccelStructHandle) -> Option<GfxAccelStructHandle> {
        self.accel_struct_handles.get(handle).copied()
    }

    /// 设备能力快照
    #[inline]
    pub fn caps(&self) -> &DeviceCapabilities {
        self.caps
    }
}

/// 渲染图中的一个 Pass
///
/// # 示例
///
/// ```ignore
/// struct BlurPass {
///     input: RgImageHandle,
///     output: RgImageHandle,
/// }
///
/// impl RgPass for BlurPass {
///     fn setup(&mut self, builder: &mut RgPassBuilder) {
///         builder.read_image(self.input, RgImageState::SHADER_READ_COMPUTE);
///         self.output = builder.write_image(self.output, RgImageState::STORAGE_WRITE_COMPUTE);
///     }
///
///     fn execute(&self, ctx: &mut RgPassContext) {
///         let input = ctx.get_image(self.input);
///         let output = ctx.get_image(self.output);
///         // 绑定 pipeline, dispatch...
///     }
/// }
/// ```
///
/// # 线程安全
///
/// 并行录制模式下多个 Pass 的 execute 会在 rayon worker 上同时运行，
/// 因此要求 Send + Sync。Pass 可以借用外部资源，
/// 生命周期由 RenderGraphBuilder 的生命周期参数约束。
pub trait RgPass: Send + Sync {
    /// 声明 Pass 的资源依赖
    fn setup(&mut self, builder: &mut RgPassBuilder);

    /// 录制 Pass 的命令
    ///
    /// barrier 已由调度器提前录制；图形 Pass 的 begin/end_rendering
    /// 也由调度器包裹，这里只录制 draw/dispatch 本身。
    fn execute(&self, ctx: &mut RgPassContext<'_>);
}
