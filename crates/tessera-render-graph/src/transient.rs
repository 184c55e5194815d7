//! 临时资源分配与别名复用
//!
//! bake 阶段为每个临时资源计算访问区间（拓扑顺序中首次/末次使用的
//! Pass 下标），区间不重叠的资源可以复用同一块物理资源：
//!
//! - 图像按 desc 精确匹配复用（Vulkan 的 image 不能换格式/尺寸）
//! - 缓冲区按 usage 分桶，桶内按大小 best-fit，取最小的足够大的空闲块
//!
//! 物理资源挂在 [`TransientResourcePool`] 上跨帧存活，帧末全部归还
//! 池中而不是释放给 OS。需要清零初始化的缓冲区永远新建，
//! 并在初始化 fence 上同步等待。

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use ash::vk;
use slotmap::SecondaryMap;
use tessera_gfx_interface::{GfxBufferDesc, GfxBufferHandle, GfxDevice, GfxError, GfxImageDesc, GfxImageHandle};

use crate::error::RenderGraphError;
use crate::handle::{RgBufferHandle, RgImageHandle};
use crate::pass::RgPassNode;
use crate::resource::RgResourceRegistry;

/// 资源的访问区间（闭区间，下标为执行顺序中的位置）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceInterval {
    /// 首次使用的 Pass 位置
    pub first: usize,
    /// 末次使用的 Pass 位置
    pub last: usize,
}

impl ResourceInterval {
    /// 两个区间是否重叠
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.first <= other.last && other.first <= self.last
    }
}

/// 全部临时资源的区间
#[derive(Default)]
pub struct ResourceIntervals {
    /// 图像区间
    pub images: SecondaryMap<RgImageHandle, ResourceInterval>,
    /// 缓冲区区间
    pub buffers: SecondaryMap<RgBufferHandle, ResourceInterval>,
}

/// 按执行顺序计算每个资源的访问区间
///
/// 从未被任何 Pass 访问的资源没有区间，不会分配物理资源。
pub fn compute_intervals(passes: &[RgPassNode], topo_order: &[usize]) -> ResourceIntervals {
    let mut intervals = ResourceIntervals::default();

    for (position, &pass_idx) in topo_order.iter().enumerate() {
        let pass = &passes[pass_idx];

        for access in pass.image_reads.iter().chain(pass.image_writes.iter()) {
            match intervals.images.get_mut(access.handle) {
                None => {
                    intervals.images.insert(access.handle, ResourceInterval { first: position, last: position });
                }
                Some(interval) => interval.last = interval.last.max(position),
            }
        }
        for access in pass.buffer_reads.iter().chain(pass.buffer_writes.iter()) {
            match intervals.buffers.get_mut(access.handle) {
                None => {
                    intervals.buffers.insert(access.handle, ResourceInterval { first: position, last: position });
                }
                Some(interval) => interval.last = interval.last.max(position),
            }
        }
    }

    intervals
}

/// 跨帧存活的物理资源池
///
/// 只在单线程的 bake 阶段被访问，不需要内部加锁。
#[derive(Default)]
pub struct TransientResourcePool {
    /// 空闲图像，按 desc 精确分桶
    free_images: HashMap<GfxImageDesc, Vec<GfxImageHandle>>,
    /// 空闲缓冲区，按 usage 分桶后按块大小排序
    free_buffers: HashMap<vk::BufferUsageFlags, BTreeMap<vk::DeviceSize, Vec<GfxBufferHandle>>>,
}

impl TransientResourcePool {
    /// 创建空池
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出一个 desc 完全匹配的空闲图像
    fn acquire_image(&mut self, desc: &GfxImageDesc) -> Option<GfxImageHandle> {
        self.free_images.get_mut(desc).and_then(|v| v.pop())
    }

    /// best-fit 取出一个不小于 `min_size` 的空闲缓冲区，返回 (句柄, 块大小)
    fn acquire_buffer(
        &mut self,
        min_size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> Option<(GfxBufferHandle, vk::DeviceSize)> {
        let by_size = self.free_buffers.get_mut(&usage)?;
        let block_size = by_size.range(min_size..).find(|(_, v)| !v.is_empty()).map(|(&size, _)| size)?;
        let handle = by_size.get_mut(&block_size).and_then(|v| v.pop())?;
        Some((handle, block_size))
    }

    /// 归还图像
    pub fn release_image(&mut self, desc: GfxImageDesc, handle: GfxImageHandle) {
        self.free_images.entry(desc).or_default().push(handle);
    }

    /// 归还缓冲区
    pub fn release_buffer(&mut self, usage: vk::BufferUsageFlags, block_size: vk::DeviceSize, handle: GfxBufferHandle) {
        self.free_buffers.entry(usage).or_default().entry(block_size).or_default().push(handle);
    }

    /// 释放池中所有物理资源（应用退出或显存压力时调用）
    pub fn clear(&mut self, device: &dyn GfxDevice) {
        for (_, handles) in self.free_images.drain() {
            for handle in handles {
                device.destroy_image(handle);
            }
        }
        for (_, by_size) in self.free_buffers.drain() {
            for (_, handles) in by_size {
                for handle in handles {
                    device.destroy_buffer(handle);
                }
            }
        }
    }

    /// 池中空闲块数量（图像 + 缓冲区）
    pub fn free_count(&self) -> usize {
        let images: usize = self.free_images.values().map(Vec::len).sum();
        let buffers: usize = self.free_buffers.values().flat_map(BTreeMap::values).map(Vec::len).sum();
        images + buffers
    }
}

/// 一次放置过程的统计
#[derive(Clone, Copy, Debug, Default)]
pub struct PlacementStats {
    /// 新建的物理资源数
    pub created: usize,
    /// 从跨帧池复用的数量
    pub pooled: usize,
    /// 帧内别名复用的数量
    pub aliased: usize,
    /// 并发存活资源集的峰值估算字节数
    pub peak_bytes: u64,
}

/// 帧内已退役、可被后续区间别名复用的块
#[derive(Default)]
struct FrameFreeList {
    images: HashMap<GfxImageDesc, Vec<GfxImageHandle>>,
    buffers: HashMap<vk::BufferUsageFlags, BTreeMap<vk::DeviceSize, Vec<GfxBufferHandle>>>,
}

impl FrameFreeList {
    fn acquire_image(&mut self, desc: &GfxImageDesc) -> Option<GfxImageHandle> {
        self.images.get_mut(desc).and_then(|v| v.pop())
    }

    fn acquire_buffer(
        &mut self,
        min_size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> Option<(GfxBufferHandle, vk::DeviceSize)> {
        let by_size = self.buffers.get_mut(&usage)?;
        let block_size = by_size.range(min_size..).find(|(_, v)| !v.is_empty()).map(|(&size, _)| size)?;
        let handle = by_size.get_mut(&block_size).and_then(|v| v.pop())?;
        Some((handle, block_size))
    }
}

/// 帧内别名链：资源 → 同一物理块的上一个占用者
///
/// barrier 合成据此把上一个占用者的末状态作为新资源首次访问的源状态。
/// 两个别名资源之间不一定有依赖边（它们访问的是不同的虚拟资源），
/// 没有这次交接 barrier 的话，GPU 可以并发执行两个写同一块内存的 Pass。
#[derive(Default)]
pub struct ResourceAliases {
    /// 图像别名
    pub images: SecondaryMap<RgImageHandle, RgImageHandle>,
    /// 缓冲区别名
    pub buffers: SecondaryMap<RgBufferHandle, RgBufferHandle>,
}

impl ResourceAliases {
    /// 是否没有任何别名
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.buffers.is_empty()
    }
}

/// 放置结果：虚拟句柄到物理句柄的映射 + 帧末归还池所需的登记
pub struct PlacementResult {
    /// 图像映射（导入资源也在内）
    pub images: SecondaryMap<RgImageHandle, GfxImageHandle>,
    /// 缓冲区映射
    pub buffers: SecondaryMap<RgBufferHandle, GfxBufferHandle>,
    /// 帧内别名链
    pub aliases: ResourceAliases,
    /// 统计
    pub stats: PlacementStats,

    /// 本帧占用的物理图像（帧末整体归还）
    pub(crate) checked_out_images: Vec<(GfxImageDesc, GfxImageHandle)>,
    /// 本帧占用的物理缓冲区（usage、块大小）
    pub(crate) checked_out_buffers: Vec<(vk::BufferUsageFlags, vk::DeviceSize, GfxBufferHandle)>,
}

/// 等待 zero_init 缓冲区初始化完成的超时时长
const BUFFER_INIT_TIMEOUT: Duration = Duration::from_secs(10);

/// 为所有临时资源分配物理资源
///
/// 按区间起点排序处理；处理每个资源前，先把区间已结束的资源退役到
/// 帧内空闲表，使不重叠的区间共享同一块物理资源。取用顺序：
/// 帧内空闲表 → 跨帧池 → 新建。
pub fn place_transients(
    device: &dyn GfxDevice,
    pool: &mut TransientResourcePool,
    registry: &RgResourceRegistry,
    intervals: &ResourceIntervals,
) -> Result<PlacementResult, RenderGraphError> {
    let mut result = PlacementResult {
        images: SecondaryMap::new(),
        buffers: SecondaryMap::new(),
        aliases: ResourceAliases::default(),
        stats: PlacementStats::default(),
        checked_out_images: Vec::new(),
        checked_out_buffers: Vec::new(),
    };

    // 导入资源直接登记物理句柄
    for (handle, res) in &registry.images {
        if let crate::resource::RgImageSource::Imported { physical, .. } = &res.source {
            result.images.insert(handle, *physical);
        }
    }
    for (handle, res) in &registry.buffers {
        if let crate::resource::RgBufferSource::Imported { physical, .. } = &res.source {
            result.buffers.insert(handle, *physical);
        }
    }

    // 待放置的临时资源，按区间起点排序；起点相同按终点排序保证确定性
    enum Pending {
        Image(RgImageHandle),
        Buffer(RgBufferHandle),
    }
    let mut pending: Vec<(ResourceInterval, u64, Pending)> = Vec::new();
    for (handle, res) in &registry.images {
        if res.is_transient() {
            if let Some(&interval) = intervals.images.get(handle) {
                pending.push((interval, res.desc.estimated_byte_size(), Pending::Image(handle)));
            }
        }
    }
    for (handle, res) in &registry.buffers {
        if res.is_transient() {
            if let Some(&interval) = intervals.buffers.get(handle) {
                pending.push((interval, res.desc.size, Pending::Buffer(handle)));
            }
        }
    }
    pending.sort_by_key(|(interval, _, _)| (interval.first, interval.last));

    // 时间线扫描：active 按区间终点排序退役
    let mut frame_free = FrameFreeList::default();
    // 物理块的最近占用者，别名交接 barrier 的源
    let mut last_image_user: HashMap<GfxImageHandle, RgImageHandle> = HashMap::new();
    let mut last_buffer_user: HashMap<GfxBufferHandle, RgBufferHandle> = HashMap::new();
    enum Active {
        Image(GfxImageDesc, GfxImageHandle),
        Buffer(vk::BufferUsageFlags, vk::DeviceSize, GfxBufferHandle),
    }
    let mut active: Vec<(usize, u64, Active)> = Vec::new();
    let mut alive_bytes = 0u64;

    for (interval, bytes, item) in pending {
        // 退役所有在当前区间开始前结束的资源
        active.retain(|(last, retired_bytes, block)| {
            if *last < interval.first {
                match block {
                    Active::Image(desc, handle) => {
                        frame_free.images.entry(desc.clone()).or_default().push(*handle);
                    }
                    Active::Buffer(usage, size, handle) => {
                        frame_free.buffers.entry(*usage).or_default().entry(*size).or_default().push(*handle);
                    }
                }
                alive_bytes -= retired_bytes;
                false
            } else {
                true
            }
        });

        match item {
            Pending::Image(handle) => {
                let res = &registry.images[handle];
                let physical = if let Some(reused) = frame_free.acquire_image(&res.desc) {
                    result.stats.aliased += 1;
                    if let Some(&prev) = last_image_user.get(&reused) {
                        result.aliases.images.insert(handle, prev);
                    }
                    reused
                } else if let Some(pooled) = pool.acquire_image(&res.desc) {
                    result.stats.pooled += 1;
                    pooled
                } else {
                    result.stats.created += 1;
                    device.create_image(&res.desc, &res.name).map_err(|source| {
                        RenderGraphError::AllocationFailed { resource: res.name.clone(), source }
                    })?
                };
                result.images.insert(handle, physical);
                last_image_user.insert(physical, handle);
                result.checked_out_images.push((res.desc.clone(), physical));
                active.push((interval.last, bytes, Active::Image(res.desc.clone(), physical)));
            }
            Pending::Buffer(handle) => {
                let res = &registry.buffers[handle];
                let (physical, block_size, reused_in_frame) =
                    allocate_buffer(device, pool, &mut frame_free, res, &mut result.stats)?;
                if reused_in_frame {
                    if let Some(&prev) = last_buffer_user.get(&physical) {
                        result.aliases.buffers.insert(handle, prev);
                    }
                }
                result.buffers.insert(handle, physical);
                last_buffer_user.insert(physical, handle);
                result.checked_out_buffers.push((res.desc.usage, block_size, physical));
                active.push((interval.last, bytes, Active::Buffer(res.desc.usage, block_size, physical)));
            }
        }

        alive_bytes += bytes;
        result.stats.peak_bytes = result.stats.peak_bytes.max(alive_bytes);
    }

    Ok(result)
}

/// 分配单个缓冲区，返回 (句柄, 块大小, 是否帧内复用)
///
/// zero_init 的缓冲区不走任何复用路径：池中的块内容是脏的，
/// 必须新建并等待初始化写入完成。
fn allocate_buffer(
    device: &dyn GfxDevice,
    pool: &mut TransientResourcePool,
    frame_free: &mut FrameFreeList,
    res: &crate::resource::RgBufferResource,
    stats: &mut PlacementStats,
) -> Result<(GfxBufferHandle, vk::DeviceSize, bool), RenderGraphError> {
    if res.desc.zero_init {
        stats.created += 1;
        let physical = device
            .create_buffer(&res.desc, &res.name)
            .map_err(|source| RenderGraphError::AllocationFailed { resource: res.name.clone(), source })?;
        if let Some(fence) = device.buffer_init_fence(physical) {
            device.wait_fence(fence, BUFFER_INIT_TIMEOUT).map_err(|source| match source {
                GfxError::FenceTimeout { .. } | GfxError::DeviceLost => {
                    RenderGraphError::DeviceTimeout { resource: res.name.clone(), source }
                }
                other => RenderGraphError::AllocationFailed { resource: res.name.clone(), source: other },
            })?;
        }
        return Ok((physical, res.desc.size, false));
    }

    if let Some((reused, block_size)) = frame_free.acquire_buffer(res.desc.size, res.desc.usage) {
        stats.aliased += 1;
        return Ok((reused, block_size, true));
    }
    if let Some((pooled, block_size)) = pool.acquire_buffer(res.desc.size, res.desc.usage) {
        stats.pooled += 1;
        return Ok((pooled, block_size, false));
    }
    stats.created += 1;
    let physical = device
        .create_buffer(&GfxBufferDesc::new(res.desc.size, res.desc.usage), &res.name)
        .map_err(|source| RenderGraphError::AllocationFailed { resource: res.name.clone(), source })?;
    Ok((physical, res.desc.size, false))
}

/// 帧末把本帧占用的物理资源全部归还池中
pub fn release_to_pool(pool: &mut TransientResourcePool, placement: PlacementResult) {
    // 同一块物理资源可能因帧内别名被登记多次，去重后归还
    let mut seen_images = std::collections::HashSet::new();
    for (desc, handle) in placement.checked_out_images {
        if seen_images.insert(handle) {
            pool.release_image(desc, handle);
        }
    }
    let mut seen_buffers = std::collections::HashSet::new();
    for (usage, block_size, handle) in placement.checked_out_buffers {
        if seen_buffers.insert(handle) {
            pool.release_buffer(usage, block_size, handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tessera_gfx_interface::{DeviceCapabilities, GfxFenceHandle};

    /// 只计数的测试设备
    #[derive(Default)]
    struct CountingDevice {
        images: RefCell<slotmap::SlotMap<GfxImageHandle, ()>>,
        buffers: RefCell<slotmap::SlotMap<GfxBufferHandle, ()>>,
    }

    impl GfxDevice for CountingDevice {
        fn create_image(&self, _desc: &GfxImageDesc, _debug_name: &str) -> Result<GfxImageHandle, GfxError> {
            Ok(self.images.borrow_mut().insert(()))
        }
        fn create_buffer(&self, _desc: &GfxBufferDesc, _debug_name: &str) -> Result<GfxBufferHandle, GfxError> {
            Ok(self.buffers.borrow_mut().insert(()))
        }
        fn destroy_image(&self, image: GfxImageHandle) {
            self.images.borrow_mut().remove(image);
        }
        fn destroy_buffer(&self, buffer: GfxBufferHandle) {
            self.buffers.borrow_mut().remove(buffer);
        }
        fn buffer_init_fence(&self, _buffer: GfxBufferHandle) -> Option<GfxFenceHandle> {
            None
        }
        fn wait_fence(&self, _fence: GfxFenceHandle, _timeout: Duration) -> Result<(), GfxError> {
            Ok(())
        }
        fn capabilities(&self) -> DeviceCapabilities {
            DeviceCapabilities::default()
        }
    }

    fn storage_buffer(size: u64) -> GfxBufferDesc {
        GfxBufferDesc::new(size, vk::BufferUsageFlags::STORAGE_BUFFER)
    }

    fn interval(first: usize, last: usize) -> ResourceInterval {
        ResourceInterval { first, last }
    }

    #[test]
    fn test_interval_overlap() {
        assert!(interval(0, 2).overlaps(&interval(2, 4)));
        assert!(interval(0, 5).overlaps(&interval(1, 2)));
        assert!(!interval(0, 1).overlaps(&interval(2, 3)));
    }

    #[test]
    fn test_disjoint_intervals_share_backing() {
        let device = CountingDevice::default();
        let mut pool = TransientResourcePool::new();
        let mut registry = RgResourceRegistry::default();

        let a = registry.create_buffer("a", storage_buffer(1024));
        let b = registry.create_buffer("b", storage_buffer(1024));

        let mut intervals = ResourceIntervals::default();
        intervals.buffers.insert(a, interval(0, 1));
        intervals.buffers.insert(b, interval(2, 3));

        let placement = place_transients(&device, &mut pool, &registry, &intervals).unwrap();
        assert_eq!(placement.buffers[a], placement.buffers[b]);
        assert_eq!(placement.stats.created, 1);
        assert_eq!(placement.stats.aliased, 1);
    }

    #[test]
    fn test_frame_reuse_records_alias_chain() {
        // 三个前后相接的区间共用一个物理块，
        // 别名表按占用顺序成链：b → a，c → b
        let device = CountingDevice::default();
        let mut pool = TransientResourcePool::new();
        let mut registry = RgResourceRegistry::default();

        let a = registry.create_buffer("a", storage_buffer(1024));
        let b = registry.create_buffer("b", storage_buffer(1024));
        let c = registry.create_buffer("c", storage_buffer(1024));

        let mut intervals = ResourceIntervals::default();
        intervals.buffers.insert(a, interval(0, 0));
        intervals.buffers.insert(b, interval(1, 1));
        intervals.buffers.insert(c, interval(2, 2));

        let placement = place_transients(&device, &mut pool, &registry, &intervals).unwrap();
        assert_eq!(placement.aliases.buffers.get(b).copied(), Some(a));
        assert_eq!(placement.aliases.buffers.get(c).copied(), Some(b));
        assert!(placement.aliases.buffers.get(a).is_none());
    }

    #[test]
    fn test_fresh_allocations_have_no_aliases() {
        let device = CountingDevice::default();
        let mut pool = TransientResourcePool::new();
        let mut registry = RgResourceRegistry::default();

        let a = registry.create_buffer("a", storage_buffer(1024));
        let b = registry.create_buffer("b", storage_buffer(1024));

        let mut intervals = ResourceIntervals::default();
        intervals.buffers.insert(a, interval(0, 2));
        intervals.buffers.insert(b, interval(1, 3));

        let placement = place_transients(&device, &mut pool, &registry, &intervals).unwrap();
        assert!(placement.aliases.is_empty());
    }

    #[test]
    fn test_overlapping_intervals_never_share() {
        let device = CountingDevice::default();
        let mut pool = TransientResourcePool::new();
        let mut registry = RgResourceRegistry::default();

        let a = registry.create_buffer("a", storage_buffer(1024));
        let b = registry.create_buffer("b", storage_buffer(1024));

        let mut intervals = ResourceIntervals::default();
        intervals.buffers.insert(a, interval(0, 2));
        intervals.buffers.insert(b, interval(1, 3));

        let placement = place_transients(&device, &mut pool, &registry, &intervals).unwrap();
        assert_ne!(placement.buffers[a], placement.buffers[b]);
        assert_eq!(placement.stats.created, 2);
    }

    #[test]
    fn test_buffer_best_fit_picks_smallest_sufficient() {
        let device = CountingDevice::default();
        let mut pool = TransientResourcePool::new();

        let big = device.create_buffer(&storage_buffer(4096), "big").unwrap();
        let small = device.create_buffer(&storage_buffer(1024), "small").unwrap();
        pool.release_buffer(vk::BufferUsageFlags::STORAGE_BUFFER, 4096, big);
        pool.release_buffer(vk::BufferUsageFlags::STORAGE_BUFFER, 1024, small);

        let (picked, block_size) = pool.acquire_buffer(512, vk::BufferUsageFlags::STORAGE_BUFFER).unwrap();
        assert_eq!(picked, small);
        assert_eq!(block_size, 1024);
    }

    #[test]
    fn test_different_usage_never_aliases() {
        let device = CountingDevice::default();
        let mut pool = TransientResourcePool::new();
        let mut registry = RgResourceRegistry::default();

        let a = registry.create_buffer("a", storage_buffer(1024));
        let b = registry.create_buffer("b", GfxBufferDesc::new(1024, vk::BufferUsageFlags::INDEX_BUFFER));

        let mut intervals = ResourceIntervals::default();
        intervals.buffers.insert(a, interval(0, 0));
        intervals.buffers.insert(b, interval(1, 1));

        let placement = place_transients(&device, &mut pool, &registry, &intervals).unwrap();
        assert_ne!(placement.buffers[a], placement.buffers[b]);
    }

    #[test]
    fn test_image_reuse_requires_exact_desc() {
        let device = CountingDevice::default();
        let mut pool = TransientResourcePool::new();
        let mut registry = RgResourceRegistry::default();

        let desc_a = GfxImageDesc::new_2d(64, 64, vk::Format::R8G8B8A8_UNORM, vk::ImageUsageFlags::SAMPLED);
        let desc_b = GfxImageDesc::new_2d(64, 64, vk::Format::R16G16B16A16_SFLOAT, vk::ImageUsageFlags::SAMPLED);
        let a = registry.create_image("a", desc_a.clone());
        let b = registry.create_image("b", desc_b);
        let c = registry.create_image("c", desc_a);

        let mut intervals = ResourceIntervals::default();
        intervals.images.insert(a, interval(0, 0));
        intervals.images.insert(b, interval(1, 1));
        intervals.images.insert(c, interval(2, 2));

        let placement = place_transients(&device, &mut pool, &registry, &intervals).unwrap();
        // 格式不同的 b 不能复用 a 的块；desc 相同的 c 可以
        assert_ne!(placement.images[a], placement.images[b]);
        assert_eq!(placement.images[a], placement.images[c]);
    }

    #[test]
    fn test_pool_reuse_across_frames() {
        let device = CountingDevice::default();
        let mut pool = TransientResourcePool::new();

        for frame in 0..3 {
            let mut registry = RgResourceRegistry::default();
            let a = registry.create_buffer("a", storage_buffer(1024));
            let mut intervals = ResourceIntervals::default();
            intervals.buffers.insert(a, interval(0, 0));

            let placement = place_transients(&device, &mut pool, &registry, &intervals).unwrap();
            if frame == 0 {
                assert_eq!(placement.stats.created, 1);
            } else {
                assert_eq!(placement.stats.created, 0);
                assert_eq!(placement.stats.pooled, 1);
            }
            release_to_pool(&mut pool, placement);
        }
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn test_zero_init_buffer_never_reused() {
        let device = CountingDevice::default();
        let mut pool = TransientResourcePool::new();
        let mut registry = RgResourceRegistry::default();

        let dirty = registry.create_buffer("dirty", storage_buffer(1024));
        let counter = registry.create_buffer("counter", storage_buffer(1024).with_zero_init());

        let mut intervals = ResourceIntervals::default();
        intervals.buffers.insert(dirty, interval(0, 0));
        intervals.buffers.insert(counter, interval(1, 1));

        let placement = place_transients(&device, &mut pool, &registry, &intervals).unwrap();
        // 区间不重叠但 counter 要求干净内容，不能别名 dirty 的块
        assert_ne!(placement.buffers[dirty], placement.buffers[counter]);
        assert_eq!(placement.stats.created, 2);
    }

    #[test]
    fn test_peak_bytes_tracks_concurrent_set() {
        let device = CountingDevice::default();
        let mut pool = TransientResourcePool::new();
        let mut registry = RgResourceRegistry::default();

        // a 和 b 并发存活，c 在两者之后
        let a = registry.create_buffer("a", storage_buffer(1000));
        let b = registry.create_buffer("b", storage_buffer(2000));
        let c = registry.create_buffer("c", storage_buffer(500));

        let mut intervals = ResourceIntervals::default();
        intervals.buffers.insert(a, interval(0, 2));
        intervals.buffers.insert(b, interval(1, 2));
        intervals.buffers.insert(c, interval(3, 3));

        let placement = place_transients(&device, &mut pool, &registry, &intervals).unwrap();
        assert_eq!(placement.stats.peak_bytes, 3000);
    }
}
