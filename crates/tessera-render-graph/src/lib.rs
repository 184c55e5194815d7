//! 帧调度核心：声明式 RenderGraph
//!
//! 每帧从零构建：声明资源（导入或临时）与 Pass 的读写关系，
//! bake 阶段自动完成依赖排序、barrier 合成和临时资源的别名复用，
//! 然后串行或并行录制命令。
//!
//! # 使用流程
//!
//! ```ignore
//! let mut builder = RenderGraphBuilder::new();
//! let gbuffer = builder.create_image("gbuffer", gbuffer_desc);
//! builder.add_graphics_pass("geometry", GeometryPass { target: gbuffer, .. });
//! builder.add_compute_pass("lighting", LightingPass { gbuffer, .. });
//!
//! let baked = builder.bake(&device, &mut pool)?;
//! baked.execute(&mut primary);
//! baked.finish(&mut pool);
//! ```
//!
//! 与图形后端的耦合仅限于 `tessera-gfx-interface` 中的 trait，
//! 本 crate 不调用任何驱动函数。

mod barrier;
mod error;
mod executor;
mod graph;
mod handle;
mod pass;
mod resource;
mod state;
mod transient;

pub use barrier::{
    synthesize_barriers, PassBarriers, RgAccelStructBarrierDesc, RgBufferBarrierDesc, RgImageBarrierDesc, UsageTracker,
};
pub use error::RenderGraphError;
pub use executor::{BakeStats, BakedGraph, RenderGraphBuilder};
pub use graph::{DependencyGraph, DependencyEdge, GraphCycleInfo};
pub use handle::{RgAccelStructHandle, RgBufferHandle, RgImageHandle, RgResourceHandle};
pub use pass::{
    RgAccelStructAccess, RgBufferAccess, RgColorTarget, RgDepthTarget, RgFramebufferInfo, RgImageAccess, RgPass,
    RgPassBuilder, RgPassContext, RgPassKind, RgPassNode,
};
pub use resource::{
    RgAccelStructResource, RgBufferResource, RgBufferSource, RgImageResource, RgImageSource, RgResourceRegistry,
};
pub use state::{RgBufferState, RgImageState};
pub use transient::{
    compute_intervals, place_transients, release_to_pool, PlacementResult, PlacementStats, ResourceAliases, ResourceInterval,
    ResourceIntervals, TransientResourcePool,
};
