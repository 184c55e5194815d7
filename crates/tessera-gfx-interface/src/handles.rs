//! 物理资源句柄定义
//!
//! 使用 SlotMap 的代际 key 作为句柄：轻量、可拷贝、
//! 悬垂访问只会得到 None 而不是 UB。

slotmap::new_key_type! {
    /// 物理 Image 句柄，由具体后端的资源管理器发放
    pub struct GfxImageHandle;

    /// 物理 Buffer 句柄
    pub struct GfxBufferHandle;

    /// 物理加速结构句柄（ray tracing BLAS/TLAS）
    pub struct GfxAccelStructHandle;

    /// Fence 句柄，用于同步等待
    pub struct GfxFenceHandle;
}
