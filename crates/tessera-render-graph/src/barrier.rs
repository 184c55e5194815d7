//! 资源状态追踪与 barrier 合成
//!
//! bake 阶段按最终执行顺序遍历所有 Pass，对每个 Pass 的每条资源访问
//! 与追踪器中的当前状态比较，决定是否需要 barrier：
//!
//! - 首次访问（无任何在途访问）：buffer 直接放行；image 仅在需要
//!   layout 转换时生成 barrier
//! - 任意一侧是写：必须生成 barrier（执行顺序 hazard，与内存可见性无关）
//! - 两侧都是读：当前状态已覆盖新访问则跳过；否则生成一次 barrier
//!   并把状态放宽为并集，后续被并集覆盖的读不再同步
//!
//! 同一个 Pass 涉及的所有 barrier 合并为一个 [`PassBarriers`]，
//! 执行时对应一次批量的 pipeline_barrier 调用。

use ash::vk;
use slotmap::SecondaryMap;
use tessera_gfx_interface::GfxImageSubresourceRange;

use crate::handle::{RgAccelStructHandle, RgBufferHandle, RgImageHandle};
use crate::pass::RgPassNode;
use crate::resource::RgResourceRegistry;
use crate::state::{RgBufferState, RgImageState};
use crate::transient::ResourceAliases;

/// 图像 barrier（虚拟句柄形式，执行前映射到物理句柄）
#[derive(Clone, Copy, Debug)]
pub struct RgImageBarrierDesc {
    /// 目标图像
    pub image: RgImageHandle,
    /// 旧状态
    pub src: RgImageState,
    /// 新状态
    pub dst: RgImageState,
    /// 子资源范围
    pub subresource: GfxImageSubresourceRange,
}

/// 缓冲区 barrier
#[derive(Clone, Copy, Debug)]
pub struct RgBufferBarrierDesc {
    /// 目标缓冲区
    pub buffer: RgBufferHandle,
    /// 旧状态
    pub src: RgBufferState,
    /// 新状态
    pub dst: RgBufferState,
}

/// 加速结构 barrier
#[derive(Clone, Copy, Debug)]
pub struct RgAccelStructBarrierDesc {
    /// 目标加速结构
    pub accel_struct: RgAccelStructHandle,
    /// 旧状态
    pub src: RgBufferState,
    /// 新状态
    pub dst: RgBufferState,
}

/// 单个 Pass 边界上的全部 barrier
#[derive(Clone, Debug, Default)]
pub struct PassBarriers {
    /// 图像 barrier
    pub image_barriers: Vec<RgImageBarrierDesc>,
    /// 缓冲区 barrier
    pub buffer_barriers: Vec<RgBufferBarrierDesc>,
    /// 加速结构 barrier
    pub accel_struct_barriers: Vec<RgAccelStructBarrierDesc>,
}

impl PassBarriers {
    /// 该 Pass 是否不需要任何 barrier
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.image_barriers.is_empty() && self.buffer_barriers.is_empty() && self.accel_struct_barriers.is_empty()
    }
}

/// 资源当前状态的追踪器
///
/// 纯簿记：barrier 合成器按执行顺序推进它，不产生其他副作用。
/// 合成结束后保留的状态即各资源在帧末的状态，调用方可以据此
/// 把导入资源（swapchain image 等）衔接到后续操作。
pub struct UsageTracker {
    image_states: SecondaryMap<RgImageHandle, RgImageState>,
    buffer_states: SecondaryMap<RgBufferHandle, RgBufferState>,
    accel_struct_states: SecondaryMap<RgAccelStructHandle, RgBufferState>,
}

impl UsageTracker {
    /// 用注册表中各资源的初始状态初始化追踪器
    pub fn from_registry(registry: &RgResourceRegistry) -> Self {
        let mut image_states = SecondaryMap::new();
        for (handle, res) in &registry.images {
            image_states.insert(handle, res.initial_state());
        }
        let mut buffer_states = SecondaryMap::new();
        for (handle, res) in &registry.buffers {
            buffer_states.insert(handle, res.initial_state());
        }
        let mut accel_struct_states = SecondaryMap::new();
        for (handle, res) in &registry.accel_structs {
            accel_struct_states.insert(handle, res.initial_state);
        }
        Self { image_states, buffer_states, accel_struct_states }
    }

    /// 查询图像当前状态
    #[inline]
    pub fn image_usage(&self, handle: RgImageHandle) -> RgImageState {
        self.image_states.get(handle).copied().unwrap_or_default()
    }

    /// 更新图像当前状态
    #[inline]
    pub fn set_image_usage(&mut self, handle: RgImageHandle, state: RgImageState) {
        self.image_states.insert(handle, state);
    }

    /// 查询缓冲区当前状态
    #[inline]
    pub fn buffer_usage(&self, handle: RgBufferHandle) -> RgBufferState {
        self.buffer_states.get(handle).copied().unwrap_or_default()
    }

    /// 更新缓冲区当前状态
    #[inline]
    pub fn set_buffer_usage(&mut self, handle: RgBufferHandle, state: RgBufferState) {
        self.buffer_states.insert(handle, state);
    }

    /// 查询加速结构当前状态
    #[inline]
    pub fn accel_struct_usage(&self, handle: RgAccelStructHandle) -> RgBufferState {
        self.accel_struct_states.get(handle).copied().unwrap_or_default()
    }

    /// 更新加速结构当前状态
    #[inline]
    pub fn set_accel_struct_usage(&mut self, handle: RgAccelStructHandle, state: RgBufferState) {
        self.accel_struct_states.insert(handle, state);
    }
}

/// 按执行顺序合成每个 Pass 的 barrier
///
/// 返回与 `topo_order` 等长的数组：第 i 项是执行顺序中第 i 个 Pass
/// 开始前需要提交的 barrier。追踪器随合成推进，结束时携带帧末状态。
///
/// 帧内别名的资源首次访问时，源状态取同一物理块上一个占用者的
/// 末状态而不是自己的初始状态：别名双方之间可能没有依赖边，
/// 这次交接 barrier 是它们在 GPU 上唯一的顺序保证。
pub fn synthesize_barriers(
    registry: &RgResourceRegistry,
    passes: &[RgPassNode],
    topo_order: &[usize],
    aliases: &ResourceAliases,
) -> (Vec<PassBarriers>, UsageTracker) {
    let mut tracker = UsageTracker::from_registry(registry);
    let mut all_barriers = Vec::with_capacity(topo_order.len());
    // 待交接的别名；首次访问时消耗
    let mut pending_image_aliases = aliases.images.clone();
    let mut pending_buffer_aliases = aliases.buffers.clone();

    for &pass_idx in topo_order {
        let pass = &passes[pass_idx];
        let mut barriers = PassBarriers::default();

        for (handle, requested, subresource) in merge_image_accesses(registry, pass) {
            let current = match pending_image_aliases.remove(handle) {
                Some(prev) => tracker.image_usage(prev),
                None => tracker.image_usage(handle),
            };
            match image_transition(&current, &requested) {
                Transition::Skip => {}
                Transition::Widen(widened) => {
                    barriers.image_barriers.push(RgImageBarrierDesc {
                        image: handle,
                        src: current,
                        dst: widened,
                        subresource,
                    });
                    tracker.set_image_usage(handle, widened);
                    continue;
                }
                Transition::Emit => {
                    barriers.image_barriers.push(RgImageBarrierDesc {
                        image: handle,
                        src: current,
                        dst: requested,
                        subresource,
                    });
                }
            }
            tracker.set_image_usage(handle, requested);
        }

        for (handle, requested) in merge_buffer_accesses(pass) {
            let current = match pending_buffer_aliases.remove(handle) {
                Some(prev) => tracker.buffer_usage(prev),
                None => tracker.buffer_usage(handle),
            };
            match buffer_transition(&current, &requested) {
                Transition::Skip => {
                    tracker.set_buffer_usage(handle, requested);
                }
                Transition::Widen(widened) => {
                    barriers.buffer_barriers.push(RgBufferBarrierDesc { buffer: handle, src: current, dst: widened });
                    tracker.set_buffer_usage(handle, widened);
                }
                Transition::Emit => {
                    barriers.buffer_barriers.push(RgBufferBarrierDesc { buffer: handle, src: current, dst: requested });
                    tracker.set_buffer_usage(handle, requested);
                }
            }
        }

        for (handle, requested) in merge_accel_struct_accesses(pass) {
            let current = tracker.accel_struct_usage(handle);
            match buffer_transition(&current, &requested) {
                Transition::Skip => {
                    tracker.set_accel_struct_usage(handle, requested);
                }
                Transition::Widen(widened) => {
                    barriers.accel_struct_barriers.push(RgAccelStructBarrierDesc {
                        accel_struct: handle,
                        src: current,
                        dst: widened,
                    });
                    tracker.set_accel_struct_usage(handle, widened);
                }
                Transition::Emit => {
                    barriers.accel_struct_barriers.push(RgAccelStructBarrierDesc {
                        accel_struct: handle,
                        src: current,
                        dst: requested,
                    });
                    tracker.set_accel_struct_usage(handle, requested);
                }
            }
        }

        all_barriers.push(barriers);
    }

    (all_barriers, tracker)
}

/// 状态转换决策
enum Transition<S> {
    /// 不需要 barrier
    Skip,
    /// 读-读放宽：barrier 到并集状态
    Widen(S),
    /// 常规 barrier 到请求状态
    Emit,
}

/// 图像的状态转换决策
fn image_transition(current: &RgImageState, requested: &RgImageState) -> Transition<RgImageState> {
    if current.layout != requested.layout {
        // layout 转换总是需要 barrier，包括 UNDEFINED → 首次使用
        return Transition::Emit;
    }
    if current.access == vk::AccessFlags2::NONE {
        // 没有在途访问（导入时已处于目标 layout）
        return Transition::Skip;
    }
    if current.is_write() || requested.is_write() {
        return Transition::Emit;
    }
    if current.covers(requested) {
        return Transition::Skip;
    }
    Transition::Widen(current.union_read(requested))
}

/// 缓冲区/加速结构的状态转换决策
fn buffer_transition(current: &RgBufferState, requested: &RgBufferState) -> Transition<RgBufferState> {
    if current.access == vk::AccessFlags2::NONE {
        // 首次访问，新分配或外部已同步
        return Transition::Skip;
    }
    if current.is_write() || requested.is_write() {
        return Transition::Emit;
    }
    if current.covers(requested) {
        return Transition::Skip;
    }
    Transition::Widen(current.union_read(requested))
}

/// 合并一个 Pass 对同一图像的多次访问
///
/// 读写同一图像（read_write_image）的 Pass 只产生一次状态转换。
/// 各访问的 layout 必须一致，bake 校验阶段已经保证。
/// 子资源范围不一致时退化为整图范围。
fn merge_image_accesses(
    registry: &RgResourceRegistry,
    pass: &RgPassNode,
) -> Vec<(RgImageHandle, RgImageState, GfxImageSubresourceRange)> {
    let mut order: Vec<RgImageHandle> = Vec::new();
    let mut merged: SecondaryMap<RgImageHandle, (RgImageState, Option<GfxImageSubresourceRange>, bool)> =
        SecondaryMap::new();

    for access in pass.image_reads.iter().chain(pass.image_writes.iter()) {
        match merged.get_mut(access.handle) {
            None => {
                order.push(access.handle);
                merged.insert(access.handle, (access.state, access.subresource, false));
            }
            Some((state, subresource, range_conflict)) => {
                *state =
                    RgImageState::new(state.stage | access.state.stage, state.access | access.state.access, state.layout);
                if *subresource != access.subresource {
                    *range_conflict = true;
                }
            }
        }
    }

    order
        .into_iter()
        .map(|handle| {
            let aspect = registry.image(handle).map(|r| r.desc.aspect()).unwrap_or(vk::ImageAspectFlags::COLOR);
            let (state, subresource, range_conflict) = merged[handle];
            let range = if range_conflict {
                GfxImageSubresourceRange::whole(aspect)
            } else {
                subresource.unwrap_or_else(|| GfxImageSubresourceRange::whole(aspect))
            };
            (handle, state, range)
        })
        .collect()
}

/// 合并一个 Pass 对同一缓冲区的多次访问
fn merge_buffer_accesses(pass: &RgPassNode) -> Vec<(RgBufferHandle, RgBufferState)> {
    let mut order: Vec<RgBufferHandle> = Vec::new();
    let mut merged: SecondaryMap<RgBufferHandle, RgBufferState> = SecondaryMap::new();
    for access in pass.buffer_reads.iter().chain(pass.buffer_writes.iter()) {
        match merged.get_mut(access.handle) {
            None => {
                order.push(access.handle);
                merged.insert(access.handle, access.state);
            }
            Some(state) => *state = RgBufferState::new(state.stage | access.state.stage, state.access | access.state.access),
        }
    }
    order.into_iter().map(|h| (h, merged[h])).collect()
}

/// 合并一个 Pass 对同一加速结构的多次访问
fn merge_accel_struct_accesses(pass: &RgPassNode) -> Vec<(RgAccelStructHandle, RgBufferState)> {
    let mut order: Vec<RgAccelStructHandle> = Vec::new();
    let mut merged: SecondaryMap<RgAccelStructHandle, RgBufferState> = SecondaryMap::new();
    for access in pass.accel_struct_reads.iter().chain(pass.accel_struct_writes.iter()) {
        match merged.get_mut(access.handle) {
            None => {
                order.push(access.handle);
                merged.insert(access.handle, access.state);
            }
            Some(state) => *state = RgBufferState::new(state.stage | access.state.stage, state.access | access.state.access),
        }
    }
    order.into_iter().map(|h| (h, merged[h])).collect()
}
