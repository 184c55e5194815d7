//! RenderGraph 构建器和执行器
//!
//! [`RenderGraphBuilder`] 收集资源声明和 Pass 声明，`bake()` 在单线程
//! 上完成全部调度决策：校验、依赖分析、拓扑排序、临时资源放置、
//! barrier 合成。[`BakedGraph`] 持有只读的调度结果，录制阶段
//! （串行或并行）只读取它，不再修改任何共享状态。
//!
//! 一帧的完整流程：
//!
//! 1. `RenderGraphBuilder::new()` 声明资源与 Pass
//! 2. `bake(device, &mut pool)` 得到 [`BakedGraph`]
//! 3. `execute(primary)` 或 `execute_parallel(primary, cmd_pool, ...)`
//! 4. `finish(&mut pool)` 归还临时资源

use ash::vk;
use itertools::Itertools;
use slotmap::SecondaryMap;
use tessera_gfx_interface::{
    DeviceCapabilities, GfxAccelStructHandle, GfxBufferBarrier, GfxBufferDesc, GfxBufferHandle, GfxCommandEncoder,
    GfxCommandPool, GfxDevice, GfxImageBarrier, GfxImageDesc, GfxImageHandle, GfxRenderingAttachment, GfxRenderingInfo,
};

use crate::barrier::{synthesize_barriers, PassBarriers, UsageTracker};
use crate::error::RenderGraphError;
use crate::graph::DependencyGraph;
use crate::handle::{RgAccelStructHandle, RgBufferHandle, RgImageHandle};
use crate::pass::{RgImageAccess, RgPass, RgPassBuilder, RgPassContext, RgPassKind, RgPassNode};
use crate::resource::RgResourceRegistry;
use crate::state::{RgBufferState, RgImageState};
use crate::transient::{compute_intervals, place_transients, release_to_pool, PlacementResult, PlacementStats, TransientResourcePool};

/// RenderGraph 构建器
///
/// # 生命周期
///
/// `'exec` 是 Pass 可以借用的外部资源的生命周期，
/// 允许 Pass 直接引用外部的 pipeline、geometry 等，
/// 而不需要 Rc/Arc 包装。
pub struct RenderGraphBuilder<'exec> {
    resources: RgResourceRegistry,
    passes: Vec<RgPassNode<'exec>>,
}

impl Default for RenderGraphBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'exec> RenderGraphBuilder<'exec> {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self { resources: RgResourceRegistry::default(), passes: Vec::new() }
    }

    /// 导入外部图像
    ///
    /// `initial_state` 是该图像在进入本帧之前的状态，
    /// 第一个使用它的 Pass 从这个状态转换。
    pub fn import_image(
        &mut self,
        name: &str,
        physical: GfxImageHandle,
        desc: GfxImageDesc,
        initial_state: RgImageState,
    ) -> RgImageHandle {
        self.resources.import_image(name, physical, desc, initial_state)
    }

    /// 导入外部缓冲区
    pub fn import_buffer(
        &mut self,
        name: &str,
        physical: GfxBufferHandle,
        desc: GfxBufferDesc,
        initial_state: RgBufferState,
    ) -> RgBufferHandle {
        self.resources.import_buffer(name, physical, desc, initial_state)
    }

    /// 导入外部加速结构
    pub fn import_accel_struct(
        &mut self,
        name: &str,
        physical: GfxAccelStructHandle,
        initial_state: RgBufferState,
    ) -> RgAccelStructHandle {
        self.resources.import_accel_struct(name, physical, initial_state)
    }

    /// 声明临时图像（也可以在 Pass 的 setup 中创建）
    pub fn create_image(&mut self, name: &str, desc: GfxImageDesc) -> RgImageHandle {
        self.resources.create_image(name, desc)
    }

    /// 声明临时缓冲区
    pub fn create_buffer(&mut self, name: &str, desc: GfxBufferDesc) -> RgBufferHandle {
        self.resources.create_buffer(name, desc)
    }

    /// 添加图形 Pass
    ///
    /// 图形 Pass 必须在 setup 中声明 framebuffer。
    pub fn add_graphics_pass<P: RgPass + 'exec>(&mut self, name: &str, pass: P) -> &mut Self {
        self.add_pass(name, RgPassKind::Graphics, pass)
    }

    /// 添加计算 Pass
    pub fn add_compute_pass<P: RgPass + 'exec>(&mut self, name: &str, pass: P) -> &mut Self {
        self.add_pass(name, RgPassKind::Compute, pass)
    }

    fn add_pass<P: RgPass + 'exec>(&mut self, name: &str, kind: RgPassKind, mut pass: P) -> &mut Self {
        let mut builder = RgPassBuilder::new(name.to_string(), kind, &mut self.resources);
        pass.setup(&mut builder);

        self.passes.push(RgPassNode {
            name: builder.name,
            kind: builder.kind,
            image_reads: builder.image_reads,
            image_writes: builder.image_writes,
            buffer_reads: builder.buffer_reads,
            buffer_writes: builder.buffer_writes,
            accel_struct_reads: builder.accel_struct_reads,
            accel_struct_writes: builder.accel_struct_writes,
            framebuffer: builder.framebuffer,
            pass: Box::new(pass),
        });
        self
    }

    /// bake：完成全部调度决策
    ///
    /// 校验 → 依赖分析 → 拓扑排序 → 临时资源放置 → barrier 合成。
    /// 配置错误和循环依赖在这里立即报告，带有 Pass/资源名称。
    pub fn bake(
        mut self,
        device: &dyn GfxDevice,
        pool: &mut TransientResourcePool,
    ) -> Result<BakedGraph<'exec>, RenderGraphError> {
        self.validate()?;

        let dep_graph = DependencyGraph::build(&self.passes);
        let execution_order = dep_graph.topological_order().map_err(|cycle| RenderGraphError::GraphCycle {
            passes: cycle.passes.iter().map(|&i| self.passes[i].name.clone()).collect(),
            resource: cycle
                .resource
                .map(|r| self.resources.name_of(r).to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
        })?;
        let batches = dep_graph.parallel_batches(&execution_order);

        let intervals = compute_intervals(&self.passes, &execution_order);
        let placement = place_transients(device, pool, &self.resources, &intervals)?;

        let (barriers, tracker) =
            synthesize_barriers(&self.resources, &self.passes, &execution_order, &placement.aliases);

        let stats = BakeStats {
            pass_count: self.passes.len(),
            barrier_count: barriers
                .iter()
                .map(|b| b.image_barriers.len() + b.buffer_barriers.len() + b.accel_struct_barriers.len())
                .sum(),
            placement: placement.stats,
        };
        log::debug!(
            "render graph baked: {} passes, {} barriers, {} transient resources created",
            stats.pass_count,
            stats.barrier_count,
            stats.placement.created,
        );

        // 加速结构的物理映射（导入专用，放置阶段不涉及）
        let mut accel_structs = SecondaryMap::new();
        for (handle, res) in &self.resources.accel_structs {
            accel_structs.insert(handle, res.physical);
        }

        Ok(BakedGraph {
            resources: self.resources,
            passes: self.passes,
            execution_order,
            batches,
            barriers,
            placement,
            accel_structs,
            tracker,
            caps: device.capabilities(),
            stats,
        })
    }

    /// bake 前的声明校验，发现调用方 bug 立即失败
    fn validate(&mut self) -> Result<(), RenderGraphError> {
        let config_err = |pass: &str, resource: &str, reason: String| RenderGraphError::Configuration {
            pass: pass.to_string(),
            resource: resource.to_string(),
            reason,
        };

        for pass in &mut self.passes {
            // 图像访问：句柄有效、子资源范围合法、同 Pass 内 layout 一致
            let mut seen_layouts: SecondaryMap<RgImageHandle, vk::ImageLayout> = SecondaryMap::new();
            for access in pass.image_reads.iter().chain(pass.image_writes.iter()) {
                let res = self.resources.images.get(access.handle).ok_or_else(|| {
                    config_err(&pass.name, "<unknown>", "references an image handle that was never declared".into())
                })?;
                validate_subresource(&pass.name, &res.name, &res.desc, access)?;
                match seen_layouts.get(access.handle) {
                    None => {
                        seen_layouts.insert(access.handle, access.state.layout);
                    }
                    Some(&layout) if layout != access.state.layout => {
                        return Err(config_err(
                            &pass.name,
                            &res.name,
                            format!("conflicting layouts within one pass: {:?} vs {:?}", layout, access.state.layout),
                        ));
                    }
                    Some(_) => {}
                }
            }

            for access in pass.buffer_reads.iter().chain(pass.buffer_writes.iter()) {
                if self.resources.buffers.get(access.handle).is_none() {
                    return Err(config_err(
                        &pass.name,
                        "<unknown>",
                        "references a buffer handle that was never declared".into(),
                    ));
                }
            }
            for access in pass.accel_struct_reads.iter().chain(pass.accel_struct_writes.iter()) {
                if self.resources.accel_structs.get(access.handle).is_none() {
                    return Err(config_err(
                        &pass.name,
                        "<unknown>",
                        "references an acceleration structure handle that was never declared".into(),
                    ));
                }
            }

            // framebuffer 校验
            match (pass.kind, pass.framebuffer.as_mut()) {
                (RgPassKind::Graphics, None) => {
                    return Err(config_err(&pass.name, "<none>", "graphics pass declared no framebuffer".into()));
                }
                (RgPassKind::Compute, Some(_)) => {
                    return Err(config_err(&pass.name, "<none>", "compute pass declared a framebuffer".into()));
                }
                (RgPassKind::Compute, None) => {}
                (RgPassKind::Graphics, Some(framebuffer)) => {
                    let mut extent = None;
                    for target in &framebuffer.color_targets {
                        let res = self.resources.images.get(target.image).ok_or_else(|| {
                            config_err(&pass.name, "<unknown>", "framebuffer references an undeclared image".into())
                        })?;
                        if !res.desc.usage.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT) {
                            return Err(config_err(
                                &pass.name,
                                &res.name,
                                "framebuffer color target was not declared with COLOR_ATTACHMENT usage".into(),
                            ));
                        }
                        if target.array_layer >= res.desc.array_layers {
                            return Err(config_err(
                                &pass.name,
                                &res.name,
                                format!(
                                    "color target layer {} out of bounds ({} layers)",
                                    target.array_layer, res.desc.array_layers
                                ),
                            ));
                        }
                        extent.get_or_insert((res.desc.width, res.desc.height));
                    }
                    if let Some(target) = &framebuffer.depth_target {
                        let res = self.resources.images.get(target.image).ok_or_else(|| {
                            config_err(&pass.name, "<unknown>", "framebuffer references an undeclared image".into())
                        })?;
                        if !res.desc.usage.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT) {
                            return Err(config_err(
                                &pass.name,
                                &res.name,
                                "framebuffer depth target was not declared with DEPTH_STENCIL_ATTACHMENT usage".into(),
                            ));
                        }
                        if target.array_layer >= res.desc.array_layers {
                            return Err(config_err(
                                &pass.name,
                                &res.name,
                                format!(
                                    "depth target layer {} out of bounds ({} layers)",
                                    target.array_layer, res.desc.array_layers
                                ),
                            ));
                        }
                        extent.get_or_insert((res.desc.width, res.desc.height));
                    }
                    if framebuffer.color_targets.is_empty() && framebuffer.depth_target.is_none() {
                        return Err(config_err(&pass.name, "<none>", "framebuffer has no attachments".into()));
                    }
                    // 未指定渲染区域时取第一个 attachment 的尺寸
                    if framebuffer.render_area == (0, 0) {
                        if let Some(extent) = extent {
                            framebuffer.render_area = extent;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// 子资源范围越界是调用方 bug，绝不静默 clamp
fn validate_subresource(
    pass_name: &str,
    resource_name: &str,
    desc: &GfxImageDesc,
    access: &RgImageAccess,
) -> Result<(), RenderGraphError> {
    let Some(range) = &access.subresource else {
        return Ok(());
    };
    let err = |reason: String| RenderGraphError::Configuration {
        pass: pass_name.to_string(),
        resource: resource_name.to_string(),
        reason,
    };

    if range.level_count == 0 || range.layer_count == 0 {
        return Err(err("subresource range with zero mip levels or array layers".into()));
    }
    if range.base_mip_level >= desc.mip_levels {
        return Err(err(format!(
            "base mip level {} out of bounds ({} levels)",
            range.base_mip_level, desc.mip_levels
        )));
    }
    if range.level_count != vk::REMAINING_MIP_LEVELS && range.base_mip_level + range.level_count > desc.mip_levels {
        return Err(err(format!(
            "mip range [{}, {}) out of bounds ({} levels)",
            range.base_mip_level,
            range.base_mip_level + range.level_count,
            desc.mip_levels
        )));
    }
    if range.base_array_layer >= desc.array_layers {
        return Err(err(format!(
            "base array layer {} out of bounds ({} layers)",
            range.base_array_layer, desc.array_layers
        )));
    }
    if range.layer_count != vk::REMAINING_ARRAY_LAYERS && range.base_array_layer + range.layer_count > desc.array_layers
    {
        return Err(err(format!(
            "layer range [{}, {}) out of bounds ({} layers)",
            range.base_array_layer,
            range.base_array_layer + range.layer_count,
            desc.array_layers
        )));
    }
    Ok(())
}

/// bake 的统计结果
#[derive(Clone, Copy, Debug)]
pub struct BakeStats {
    /// Pass 数量
    pub pass_count: usize,
    /// barrier 总数
    pub barrier_count: usize,
    /// 临时资源放置统计
    pub placement: PlacementStats,
}

/// bake 后的渲染图
///
/// 全部调度决策已经完成且只读；录制线程只读取它。
pub struct BakedGraph<'exec> {
    resources: RgResourceRegistry,
    passes: Vec<RgPassNode<'exec>>,
    /// 执行顺序（拓扑排序，声明顺序打破平局）
    execution_order: Vec<usize>,
    /// 并行录制批次：同批次 Pass 互相无依赖
    batches: Vec<Vec<usize>>,
    /// 按执行顺序位置索引的 barrier
    barriers: Vec<PassBarriers>,
    /// 虚拟到物理的资源映射
    placement: PlacementResult,
    accel_structs: SecondaryMap<RgAccelStructHandle, GfxAccelStructHandle>,
    /// 合成结束后的资源状态（帧末状态查询）
    tracker: UsageTracker,
    caps: DeviceCapabilities,
    stats: BakeStats,
}

impl std::fmt::Debug for BakedGraph<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BakedGraph")
            .field("execution_order", &self.execution_order)
            .field("batches", &self.batches)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

// 查询
impl BakedGraph<'_> {
    /// 执行顺序（Pass 下标）
    pub fn execution_order(&self) -> &[usize] {
        &self.execution_order
    }

    /// 并行录制批次
    pub fn parallel_batches(&self) -> &[Vec<usize>] {
        &self.batches
    }

    /// Pass 数量
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Pass 名称
    pub fn pass_name(&self, index: usize) -> &str {
        &self.passes[index].name
    }

    /// bake 统计
    pub fn stats(&self) -> &BakeStats {
        &self.stats
    }

    /// 图像在帧末的状态（把 swapchain image 衔接到 present 等场景）
    pub fn final_image_state(&self, handle: RgImageHandle) -> RgImageState {
        self.tracker.image_usage(handle)
    }

    /// 缓冲区在帧末的状态
    pub fn final_buffer_state(&self, handle: RgBufferHandle) -> RgBufferState {
        self.tracker.buffer_usage(handle)
    }

    /// 图像的物理句柄
    pub fn physical_image(&self, handle: RgImageHandle) -> Option<GfxImageHandle> {
        self.placement.images.get(handle).copied()
    }

    /// 缓冲区的物理句柄
    pub fn physical_buffer(&self, handle: RgBufferHandle) -> Option<GfxBufferHandle> {
        self.placement.buffers.get(handle).copied()
    }
}

// 执行
impl BakedGraph<'_> {
    /// 单线程执行：按拓扑顺序依次录制 barrier 和 Pass 命令
    pub fn execute(&self, primary: &mut dyn GfxCommandEncoder) {
        for (position, &pass_idx) in self.execution_order.iter().enumerate() {
            self.record_barriers(position, primary);
            self.record_pass(pass_idx, primary);
        }
    }

    /// 并行录制执行
    ///
    /// 同一批次内的 Pass 分发到 rayon worker，各自录制到独立的
    /// secondary command buffer；随后按拓扑顺序把 barrier 和
    /// secondary 合并进 primary。最终命令流与单线程执行完全一致，
    /// 与 worker 完成顺序无关。
    ///
    /// `thread_pool` 为 None 时使用 rayon 的全局线程池。
    pub fn execute_parallel(
        &self,
        primary: &mut dyn GfxCommandEncoder,
        cmd_pool: &dyn GfxCommandPool,
        thread_pool: Option<&rayon::ThreadPool>,
    ) {
        use rayon::prelude::*;

        let record_batch = |batch: &[usize]| -> Vec<(usize, Box<dyn GfxCommandEncoder>)> {
            batch
                .par_iter()
                .map(|&pass_idx| {
                    let mut secondary = cmd_pool.new_secondary(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                    self.record_pass(pass_idx, secondary.as_mut());
                    (pass_idx, secondary)
                })
                .collect()
        };

        let mut recorded: Vec<Option<Box<dyn GfxCommandEncoder>>> = (0..self.passes.len()).map(|_| None).collect();
        for batch in &self.batches {
            let results = match thread_pool {
                Some(pool) => pool.install(|| record_batch(batch)),
                None => record_batch(batch),
            };
            for (pass_idx, secondary) in results {
                recorded[pass_idx] = Some(secondary);
            }
        }

        // 合并顺序是拓扑顺序，不是完成顺序
        for (position, &pass_idx) in self.execution_order.iter().enumerate() {
            self.record_barriers(position, primary);
            if let Some(secondary) = recorded[pass_idx].take() {
                primary.execute_secondary(secondary);
            }
        }
    }

    /// 帧末归还临时资源到池
    pub fn finish(self, pool: &mut TransientResourcePool) {
        release_to_pool(pool, self.placement);
    }

    /// 把一个 Pass 边界上的 barrier 批量提交（至多一次调用）
    fn record_barriers(&self, position: usize, encoder: &mut dyn GfxCommandEncoder) {
        let barriers = &self.barriers[position];
        if barriers.is_empty() {
            return;
        }

        let image_barriers = barriers
            .image_barriers
            .iter()
            .filter_map(|desc| {
                let physical = self.placement.images.get(desc.image)?;
                Some(GfxImageBarrier {
                    image: *physical,
                    src_stage: desc.src.stage,
                    src_access: desc.src.src_access(),
                    dst_stage: desc.dst.stage,
                    dst_access: desc.dst.access,
                    old_layout: desc.src.layout,
                    new_layout: desc.dst.layout,
                    subresource: desc.subresource,
                })
            })
            .collect_vec();

        let buffer_barriers = barriers
            .buffer_barriers
            .iter()
            .filter_map(|desc| {
                let physical = self.placement.buffers.get(desc.buffer)?;
                Some(GfxBufferBarrier {
                    buffer: *physical,
                    src_stage: desc.src.stage,
                    src_access: desc.src.src_access(),
                    dst_stage: desc.dst.stage,
                    dst_access: desc.dst.access,
                    offset: 0,
                    size: vk::WHOLE_SIZE,
                })
            })
            .collect_vec();

        let accel_struct_barriers = barriers
            .accel_struct_barriers
            .iter()
            .filter_map(|desc| {
                let physical = self.accel_structs.get(desc.accel_struct)?;
                Some(tessera_gfx_interface::GfxAccelStructBarrier {
                    accel_struct: *physical,
                    src_stage: desc.src.stage,
                    src_access: desc.src.src_access(),
                    dst_stage: desc.dst.stage,
                    dst_access: desc.dst.access,
                })
            })
            .collect_vec();

        encoder.pipeline_barrier(&image_barriers, &buffer_barriers, &accel_struct_barriers);
    }

    /// 录制单个 Pass 的命令（不含 barrier）
    fn record_pass(&self, pass_idx: usize, encoder: &mut dyn GfxCommandEncoder) {
        let pass = &self.passes[pass_idx];

        encoder.begin_label(&pass.name);

        let rendering_info = pass.framebuffer.as_ref().map(|fb| GfxRenderingInfo {
            color_attachments: fb
                .color_targets
                .iter()
                .filter_map(|t| {
                    Some(GfxRenderingAttachment {
                        image: *self.placement.images.get(t.image)?,
                        load_op: t.load_op,
                        array_layer: t.array_layer,
                    })
                })
                .collect(),
            depth_attachment: fb.depth_target.as_ref().and_then(|t| {
                Some(GfxRenderingAttachment {
                    image: *self.placement.images.get(t.image)?,
                    load_op: t.load_op,
                    array_layer: t.array_layer,
                })
            }),
            render_area: fb.render_area,
        });

        if let Some(info) = &rendering_info {
            encoder.begin_rendering(info);
        }

        let mut ctx = RgPassContext {
            cmd: encoder,
            image_handles: &self.placement.images,
            buffer_handles: &self.placement.buffers,
            accel_struct_handles: &self.accel_structs,
            caps: &self.caps,
        };
        pass.pass.execute(&mut ctx);
        let encoder = ctx.cmd;

        if rendering_info.is_some() {
            encoder.end_rendering();
        }
        encoder.end_label();
    }
}

// 调试方法
impl BakedGraph<'_> {
    /// 打印执行计划
    ///
    /// 输出每个 Pass 的执行顺序、资源读写和 barrier 详情。
    pub fn log_execution_plan(&self) {
        log::info!("╔══════════════════════════════════════════════════════════════════╗");
        log::info!("║              RenderGraph Execution Plan                          ║");
        log::info!("╚══════════════════════════════════════════════════════════════════╝");
        log::info!(
            "Total Passes: {}  |  Execution Order: [{}]",
            self.passes.len(),
            self.execution_order.iter().map(|i| self.passes[*i].name.as_str()).join(" → ")
        );
        log::info!(
            "Parallel Batches: [{}]",
            self.batches
                .iter()
                .map(|b| format!("{{{}}}", b.iter().map(|i| self.passes[*i].name.as_str()).join(", ")))
                .join(" → ")
        );

        for (position, &pass_idx) in self.execution_order.iter().enumerate() {
            let pass = &self.passes[pass_idx];
            let barriers = &self.barriers[position];

            log::info!("");
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            log::info!("│ [{}/{}] {:?} Pass: \"{}\"", position + 1, self.execution_order.len(), pass.kind, pass.name);

            for access in &pass.image_reads {
                let name = self.resources.image(access.handle).map(|r| r.name.as_str()).unwrap_or("<unknown>");
                log::info!(
                    "│   read  image  \"{}\" @ {:?} ({})",
                    name,
                    access.state.layout,
                    format_access_flags(access.state.access)
                );
            }
            for access in &pass.image_writes {
                let name = self.resources.image(access.handle).map(|r| r.name.as_str()).unwrap_or("<unknown>");
                log::info!(
                    "│   write image  \"{}\" @ {:?} ({})",
                    name,
                    access.state.layout,
                    format_access_flags(access.state.access)
                );
            }
            for access in &pass.buffer_reads {
                let name = self.resources.buffer(access.handle).map(|r| r.name.as_str()).unwrap_or("<unknown>");
                log::info!("│   read  buffer \"{}\" ({})", name, format_access_flags(access.state.access));
            }
            for access in &pass.buffer_writes {
                let name = self.resources.buffer(access.handle).map(|r| r.name.as_str()).unwrap_or("<unknown>");
                log::info!("│   write buffer \"{}\" ({})", name, format_access_flags(access.state.access));
            }

            if barriers.is_empty() {
                log::info!("│   no barriers");
            } else {
                for barrier in &barriers.image_barriers {
                    let name = self.resources.image(barrier.image).map(|r| r.name.as_str()).unwrap_or("<unknown>");
                    log::info!(
                        "│   barrier image  \"{}\": {:?} → {:?}, stage {} → {}",
                        name,
                        barrier.src.layout,
                        barrier.dst.layout,
                        format_pipeline_stage(barrier.src.stage),
                        format_pipeline_stage(barrier.dst.stage),
                    );
                }
                for barrier in &barriers.buffer_barriers {
                    let name = self.resources.buffer(barrier.buffer).map(|r| r.name.as_str()).unwrap_or("<unknown>");
                    log::info!(
                        "│   barrier buffer \"{}\": {} → {}",
                        name,
                        format_access_flags(barrier.src.access),
                        format_access_flags(barrier.dst.access),
                    );
                }
                for barrier in &barriers.accel_struct_barriers {
                    let name =
                        self.resources.accel_struct(barrier.accel_struct).map(|r| r.name.as_str()).unwrap_or("<unknown>");
                    log::info!(
                        "│   barrier accel  \"{}\": {} → {}",
                        name,
                        format_access_flags(barrier.src.access),
                        format_access_flags(barrier.dst.access),
                    );
                }
            }
            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }
    }
}

/// 格式化 PipelineStageFlags2 为可读字符串
fn format_pipeline_stage(stage: vk::PipelineStageFlags2) -> String {
    let mut stages = Vec::new();
    if stage.contains(vk::PipelineStageFlags2::TOP_OF_PIPE) {
        stages.push("TOP_OF_PIPE");
    }
    if stage.contains(vk::PipelineStageFlags2::BOTTOM_OF_PIPE) {
        stages.push("BOTTOM_OF_PIPE");
    }
    if stage.contains(vk::PipelineStageFlags2::VERTEX_INPUT) {
        stages.push("VERTEX_INPUT");
    }
    if stage.contains(vk::PipelineStageFlags2::VERTEX_SHADER) {
        stages.push("VERTEX_SHADER");
    }
    if stage.contains(vk::PipelineStageFlags2::FRAGMENT_SHADER) {
        stages.push("FRAGMENT_SHADER");
    }
    if stage.contains(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT) {
        stages.push("COLOR_ATTACHMENT_OUTPUT");
    }
    if stage.contains(vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS) {
        stages.push("EARLY_FRAGMENT_TESTS");
    }
    if stage.contains(vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS) {
        stages.push("LATE_FRAGMENT_TESTS");
    }
    if stage.contains(vk::PipelineStageFlags2::COMPUTE_SHADER) {
        stages.push("COMPUTE_SHADER");
    }
    if stage.contains(vk::PipelineStageFlags2::TRANSFER) {
        stages.push("TRANSFER");
    }
    if stage.contains(vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR) {
        stages.push("RAY_TRACING_SHADER");
    }
    if stage.contains(vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR) {
        stages.push("ACCEL_STRUCT_BUILD");
    }
    if stage.contains(vk::PipelineStageFlags2::ALL_COMMANDS) {
        stages.push("ALL_COMMANDS");
    }
    if stages.is_empty() {
        format!("{stage:?}")
    } else {
        stages.join(" | ")
    }
}

/// 格式化 AccessFlags2 为可读字符串
fn format_access_flags(access: vk::AccessFlags2) -> String {
    if access == vk::AccessFlags2::NONE {
        return "NONE".to_string();
    }
    let mut flags = Vec::new();
    if access.contains(vk::AccessFlags2::INDIRECT_COMMAND_READ) {
        flags.push("INDIRECT_CMD_READ");
    }
    if access.contains(vk::AccessFlags2::INDEX_READ) {
        flags.push("INDEX_READ");
    }
    if access.contains(vk::AccessFlags2::VERTEX_ATTRIBUTE_READ) {
        flags.push("VERTEX_ATTR_READ");
    }
    if access.contains(vk::AccessFlags2::UNIFORM_READ) {
        flags.push("UNIFORM_READ");
    }
    if access.contains(vk::AccessFlags2::SHADER_SAMPLED_READ) {
        flags.push("SHADER_SAMPLED_READ");
    }
    if access.contains(vk::AccessFlags2::SHADER_STORAGE_READ) {
        flags.push("STORAGE_READ");
    }
    if access.contains(vk::AccessFlags2::SHADER_STORAGE_WRITE) {
        flags.push("STORAGE_WRITE");
    }
    if access.contains(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE) {
        flags.push("COLOR_ATTACH_WRITE");
    }
    if access.contains(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ) {
        flags.push("DEPTH_ATTACH_READ");
    }
    if access.contains(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE) {
        flags.push("DEPTH_ATTACH_WRITE");
    }
    if access.contains(vk::AccessFlags2::TRANSFER_READ) {
        flags.push("TRANSFER_READ");
    }
    if access.contains(vk::AccessFlags2::TRANSFER_WRITE) {
        flags.push("TRANSFER_WRITE");
    }
    if access.contains(vk::AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR) {
        flags.push("ACCEL_STRUCT_READ");
    }
    if access.contains(vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR) {
        flags.push("ACCEL_STRUCT_WRITE");
    }
    if flags.is_empty() {
        format!("{access:?}")
    } else {
        flags.join(" | ")
    }
}
