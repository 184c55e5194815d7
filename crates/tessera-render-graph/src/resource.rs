//! 虚拟资源与注册表
//!
//! Graph 中的资源分两类：
//! - Imported：外部拥有的物理资源（swapchain image、持久化 G-Buffer 等），
//!   导入时需要声明其当前状态，graph 结束后物理资源仍归外部所有
//! - Transient：graph 自己声明、bake 时由 [`crate::transient`] 分配的帧内资源
//!
//! 注册表每帧重建，通过 SlotMap 的代际 key 隔离跨帧句柄误用。

use slotmap::SlotMap;
use tessera_gfx_interface::{GfxAccelStructHandle, GfxBufferDesc, GfxBufferHandle, GfxImageDesc, GfxImageHandle};

use crate::handle::{RgAccelStructHandle, RgBufferHandle, RgImageHandle, RgResourceHandle};
use crate::state::{RgBufferState, RgImageState};

/// 图像资源的来源
#[derive(Clone, Debug)]
pub enum RgImageSource {
    /// 外部导入，graph 不负责其生命周期
    Imported {
        /// 物理图像句柄
        physical: GfxImageHandle,
        /// 导入时刻的状态（第一个使用者从这里转换）
        initial_state: RgImageState,
    },
    /// 帧内临时资源，bake 时分配，finish 时归还
    Transient,
}

/// Graph 中的一个虚拟图像
#[derive(Clone, Debug)]
pub struct RgImageResource {
    /// 调试名称（错误信息、debug label 中使用）
    pub name: String,
    /// 创建描述（导入资源也携带，用于子资源范围校验和 aspect 推断）
    pub desc: GfxImageDesc,
    /// 来源
    pub source: RgImageSource,
}

impl RgImageResource {
    /// 是否为临时资源
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self.source, RgImageSource::Transient)
    }

    /// 首个使用者看到的状态
    #[inline]
    pub fn initial_state(&self) -> RgImageState {
        match &self.source {
            RgImageSource::Imported { initial_state, .. } => *initial_state,
            RgImageSource::Transient => RgImageState::UNDEFINED,
        }
    }
}

/// 缓冲区资源的来源
#[derive(Clone, Debug)]
pub enum RgBufferSource {
    /// 外部导入
    Imported {
        /// 物理缓冲区句柄
        physical: GfxBufferHandle,
        /// 导入时刻的状态
        initial_state: RgBufferState,
    },
    /// 帧内临时资源
    Transient,
}

/// Graph 中的一个虚拟缓冲区
#[derive(Clone, Debug)]
pub struct RgBufferResource {
    /// 调试名称
    pub name: String,
    /// 创建描述
    pub desc: GfxBufferDesc,
    /// 来源
    pub source: RgBufferSource,
}

impl RgBufferResource {
    /// 是否为临时资源
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self.source, RgBufferSource::Transient)
    }

    /// 首个使用者看到的状态
    #[inline]
    pub fn initial_state(&self) -> RgBufferState {
        match &self.source {
            RgBufferSource::Imported { initial_state, .. } => *initial_state,
            RgBufferSource::Transient => RgBufferState::UNDEFINED,
        }
    }
}

/// Graph 中的一个加速结构
///
/// 加速结构只支持导入：构建/压缩由外部系统负责，
/// graph 只对它做依赖排序和 barrier 同步。状态复用
/// [`RgBufferState`]（无 layout 概念）。
#[derive(Clone, Debug)]
pub struct RgAccelStructResource {
    /// 调试名称
    pub name: String,
    /// 物理加速结构句柄
    pub physical: GfxAccelStructHandle,
    /// 导入时刻的状态
    pub initial_state: RgBufferState,
}

/// 帧作用域的资源注册表
///
/// 声明阶段填充，bake 阶段只读。
#[derive(Default)]
pub struct RgResourceRegistry {
    pub(crate) images: SlotMap<RgImageHandle, RgImageResource>,
    pub(crate) buffers: SlotMap<RgBufferHandle, RgBufferResource>,
    pub(crate) accel_structs: SlotMap<RgAccelStructHandle, RgAccelStructResource>,
}

impl RgResourceRegistry {
    /// 导入外部图像
    pub fn import_image(
        &mut self,
        name: &str,
        physical: GfxImageHandle,
        desc: GfxImageDesc,
        initial_state: RgImageState,
    ) -> RgImageHandle {
        self.images.insert(RgImageResource {
            name: name.to_string(),
            desc,
            source: RgImageSource::Imported { physical, initial_state },
        })
    }

    /// 声明临时图像
    pub fn create_image(&mut self, name: &str, desc: GfxImageDesc) -> RgImageHandle {
        self.images.insert(RgImageResource {
            name: name.to_string(),
            desc,
            source: RgImageSource::Transient,
        })
    }

    /// 导入外部缓冲区
    pub fn import_buffer(
        &mut self,
        name: &str,
        physical: GfxBufferHandle,
        desc: GfxBufferDesc,
        initial_state: RgBufferState,
    ) -> RgBufferHandle {
        self.buffers.insert(RgBufferResource {
            name: name.to_string(),
            desc,
            source: RgBufferSource::Imported { physical, initial_state },
        })
    }

    /// 声明临时缓冲区
    pub fn create_buffer(&mut self, name: &str, desc: GfxBufferDesc) -> RgBufferHandle {
        self.buffers.insert(RgBufferResource {
            name: name.to_string(),
            desc,
            source: RgBufferSource::Transient,
        })
    }

    /// 导入外部加速结构
    pub fn import_accel_struct(
        &mut self,
        name: &str,
        physical: GfxAccelStructHandle,
        initial_state: RgBufferState,
    ) -> RgAccelStructHandle {
        self.accel_structs.insert(RgAccelStructResource {
            name: name.to_string(),
            physical,
            initial_state,
        })
    }

    /// 查询图像
    #[inline]
    pub fn image(&self, handle: RgImageHandle) -> Option<&RgImageResource> {
        self.images.get(handle)
    }

    /// 查询缓冲区
    #[inline]
    pub fn buffer(&self, handle: RgBufferHandle) -> Option<&RgBufferResource> {
        self.buffers.get(handle)
    }

    /// 查询加速结构
    #[inline]
    pub fn accel_struct(&self, handle: RgAccelStructHandle) -> Option<&RgAccelStructResource> {
        self.accel_structs.get(handle)
    }

    /// 任意资源的调试名称（句柄失效时返回占位符）
    pub fn name_of(&self, handle: RgResourceHandle) -> &str {
        match handle {
            RgResourceHandle::Image(h) => self.images.get(h).map(|r| r.name.as_str()),
            RgResourceHandle::Buffer(h) => self.buffers.get(h).map(|r| r.name.as_str()),
            RgResourceHandle::AccelStruct(h) => self.accel_structs.get(h).map(|r| r.name.as_str()),
        }
        .unwrap_or("<invalid handle>")
    }
}
