//! RenderGraph 虚拟资源句柄
//!
//! 句柄是帧作用域的：registry 每帧重建，上一帧的句柄在新一帧的
//! SlotMap 中查不到（代际 key 保证），访问会得到配置错误而不是 UB。

slotmap::new_key_type! {
    /// Graph 内部的 Image 句柄
    pub struct RgImageHandle;

    /// Graph 内部的 Buffer 句柄
    pub struct RgBufferHandle;

    /// Graph 内部的加速结构句柄
    pub struct RgAccelStructHandle;
}

/// 统一引用任意一种资源（依赖图的边、错误信息中使用）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgResourceHandle {
    /// 图像
    Image(RgImageHandle),
    /// 缓冲区
    Buffer(RgBufferHandle),
    /// 加速结构
    AccelStruct(RgAccelStructHandle),
}

impl From<RgImageHandle> for RgResourceHandle {
    fn from(h: RgImageHandle) -> Self {
        RgResourceHandle::Image(h)
    }
}

impl From<RgBufferHandle> for RgResourceHandle {
    fn from(h: RgBufferHandle) -> Self {
        RgResourceHandle::Buffer(h)
    }
}

impl From<RgAccelStructHandle> for RgResourceHandle {
    fn from(h: RgAccelStructHandle) -> Self {
        RgResourceHandle::AccelStruct(h)
    }
}
