//! RenderGraph 端到端测试
//!
//! 通过 mock 后端录制命令流，断言 bake 产出的执行顺序、
//! barrier 位置和并行录制的确定性。

mod common;

use std::sync::{Arc, Mutex};

use ash::vk;
use common::{color_target_desc, settled_color_attachment, Event, MockDevice, MockEncoder, MockPool};
use rand::{Rng, SeedableRng};
use tessera_gfx_interface::{GfxBufferDesc, GfxImageDesc, GfxLoadOp};
use tessera_render_graph::{
    place_transients, RenderGraphBuilder, RenderGraphError, RgBufferHandle, RgBufferState, RgColorTarget,
    RgFramebufferInfo, RgImageHandle, RgImageState, RgPass, RgPassBuilder, RgPassContext, RgResourceRegistry,
    ResourceInterval, ResourceIntervals, TransientResourcePool,
};

/// 只声明缓冲区读写的计算 Pass
#[derive(Default)]
struct ComputePass {
    reads: Vec<RgBufferHandle>,
    writes: Vec<RgBufferHandle>,
    image_reads: Vec<RgImageHandle>,
    image_writes: Vec<RgImageHandle>,
}

impl RgPass for ComputePass {
    fn setup(&mut self, builder: &mut RgPassBuilder) {
        for &handle in &self.reads {
            builder.read_buffer(handle, RgBufferState::STORAGE_READ_COMPUTE);
        }
        for &handle in &self.writes {
            builder.write_buffer(handle, RgBufferState::STORAGE_WRITE_COMPUTE);
        }
        for &handle in &self.image_reads {
            builder.read_image(handle, RgImageState::SHADER_READ_COMPUTE);
        }
        for &handle in &self.image_writes {
            builder.write_image(handle, RgImageState::STORAGE_WRITE_COMPUTE);
        }
    }

    fn execute(&self, _ctx: &mut RgPassContext<'_>) {}
}

/// 带 framebuffer 的图形 Pass
struct DrawPass {
    target: RgImageHandle,
}

impl RgPass for DrawPass {
    fn setup(&mut self, builder: &mut RgPassBuilder) {
        builder.set_framebuffer(RgFramebufferInfo {
            color_targets: vec![RgColorTarget::new(self.target, GfxLoadOp::ClearColor([0.0; 4]))],
            depth_target: None,
            render_area: (0, 0),
        });
    }

    fn execute(&self, _ctx: &mut RgPassContext<'_>) {}
}

fn storage_buffer(size: u64) -> GfxBufferDesc {
    GfxBufferDesc::new(size, vk::BufferUsageFlags::STORAGE_BUFFER)
}

#[test]
fn test_scenario_write_read_write() {
    tessera_crate_tools::init_log::init_log();
    let device = MockDevice::new();
    let mut pool = TransientResourcePool::new();

    let mut builder = RenderGraphBuilder::new();
    let r = builder.create_buffer("r", storage_buffer(1024));
    builder.add_compute_pass("p0", ComputePass { writes: vec![r], ..Default::default() });
    builder.add_compute_pass("p1", ComputePass { reads: vec![r], ..Default::default() });
    builder.add_compute_pass("p2", ComputePass { writes: vec![r], ..Default::default() });

    let baked = builder.bake(&device, &mut pool).unwrap();
    assert_eq!(baked.execution_order(), &[0, 1, 2]);

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut primary = MockEncoder::new(log.clone());
    baked.execute(&mut primary);

    // barrier 只出现在 P1（写→读）和 P2（读→写）之前
    let events = log.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            Event::BeginLabel("p0".into()),
            Event::EndLabel,
            Event::Barrier { images: 0, buffers: 1, accel_structs: 0 },
            Event::BeginLabel("p1".into()),
            Event::EndLabel,
            Event::Barrier { images: 0, buffers: 1, accel_structs: 0 },
            Event::BeginLabel("p2".into()),
            Event::EndLabel,
        ]
    );
}

#[test]
fn test_independent_passes_keep_declaration_order() {
    let device = MockDevice::new();
    let mut pool = TransientResourcePool::new();

    let mut builder = RenderGraphBuilder::new();
    let a = builder.create_buffer("a", storage_buffer(64));
    let b = builder.create_buffer("b", storage_buffer(64));
    let c = builder.create_buffer("c", storage_buffer(64));
    builder.add_compute_pass("p0", ComputePass { writes: vec![a], ..Default::default() });
    builder.add_compute_pass("p1", ComputePass { writes: vec![b], ..Default::default() });
    builder.add_compute_pass("p2", ComputePass { writes: vec![c], ..Default::default() });

    let baked = builder.bake(&device, &mut pool).unwrap();
    assert_eq!(baked.execution_order(), &[0, 1, 2]);
    // 互相独立，同一个并行批次
    assert_eq!(baked.parallel_batches(), &[vec![0, 1, 2]]);
}

#[test]
fn test_parallel_stream_matches_serial() {
    //      p0
    //    /    \
    //   p1    p2
    //    \    /
    //      p3
    let bake = || {
        let device = MockDevice::new();
        let mut pool = TransientResourcePool::new();
        let mut builder = RenderGraphBuilder::new();
        let src = builder.create_buffer("src", storage_buffer(256));
        let left = builder.create_buffer("left", storage_buffer(256));
        let right = builder.create_buffer("right", storage_buffer(256));
        builder.add_compute_pass("p0", ComputePass { writes: vec![src], ..Default::default() });
        builder.add_compute_pass("p1", ComputePass { reads: vec![src], writes: vec![left], ..Default::default() });
        builder.add_compute_pass("p2", ComputePass { reads: vec![src], writes: vec![right], ..Default::default() });
        builder.add_compute_pass("p3", ComputePass { reads: vec![left, right], ..Default::default() });
        builder.bake(&device, &mut pool).unwrap()
    };

    let serial_log = Arc::new(Mutex::new(Vec::new()));
    bake().execute(&mut MockEncoder::new(serial_log.clone()));

    let parallel_log = Arc::new(Mutex::new(Vec::new()));
    let cmd_pool = MockPool::new(parallel_log.clone());
    bake().execute_parallel(&mut MockEncoder::new(parallel_log.clone()), &cmd_pool, None);

    // 合并顺序是拓扑顺序而不是 worker 完成顺序，两种路径命令流一致
    assert_eq!(*serial_log.lock().unwrap(), *parallel_log.lock().unwrap());
}

#[test]
fn test_graphics_pass_wraps_rendering() {
    let device = MockDevice::new();
    let mut pool = TransientResourcePool::new();

    let mut builder = RenderGraphBuilder::new();
    let target = builder.create_image("target", color_target_desc(64, 32));
    builder.add_graphics_pass("draw", DrawPass { target });

    let baked = builder.bake(&device, &mut pool).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    baked.execute(&mut MockEncoder::new(log.clone()));

    let events = log.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            // 临时图像首次使用的 layout 转换
            Event::Barrier { images: 1, buffers: 0, accel_structs: 0 },
            Event::BeginLabel("draw".into()),
            // 渲染区域未指定时取 attachment 尺寸
            Event::BeginRendering { color_attachments: 1, render_area: (64, 32) },
            Event::EndRendering,
            Event::EndLabel,
        ]
    );
}

#[test]
fn test_unknown_handle_is_configuration_error() {
    let device = MockDevice::new();
    let mut pool = TransientResourcePool::new();

    // 另一个 builder 的句柄在当前注册表中查不到
    let mut other = RenderGraphBuilder::new();
    let _ = other.create_buffer("x", storage_buffer(64));
    let stray = other.create_buffer("y", storage_buffer(64));

    let mut builder = RenderGraphBuilder::new();
    builder.add_compute_pass("p0", ComputePass { reads: vec![stray], ..Default::default() });

    let err = builder.bake(&device, &mut pool).unwrap_err();
    assert!(matches!(err, RenderGraphError::Configuration { .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn test_graphics_pass_requires_framebuffer() {
    struct BareGraphicsPass;
    impl RgPass for BareGraphicsPass {
        fn setup(&mut self, _builder: &mut RgPassBuilder) {}
        fn execute(&self, _ctx: &mut RgPassContext<'_>) {}
    }

    let device = MockDevice::new();
    let mut pool = TransientResourcePool::new();
    let mut builder = RenderGraphBuilder::new();
    builder.add_graphics_pass("draw", BareGraphicsPass);

    let err = builder.bake(&device, &mut pool).unwrap_err();
    assert!(matches!(err, RenderGraphError::Configuration { ref pass, .. } if pass == "draw"));
}

#[test]
fn test_out_of_bounds_subresource_fails_fast() {
    struct MipPass {
        image: RgImageHandle,
    }
    impl RgPass for MipPass {
        fn setup(&mut self, builder: &mut RgPassBuilder) {
            // 图像只有 1 个 mip，范围从 2 开始越界
            builder.write_image_range(
                self.image,
                RgImageState::STORAGE_WRITE_COMPUTE,
                tessera_gfx_interface::GfxImageSubresourceRange::single(vk::ImageAspectFlags::COLOR, 2, 0),
            );
        }
        fn execute(&self, _ctx: &mut RgPassContext<'_>) {}
    }

    let device = MockDevice::new();
    let mut pool = TransientResourcePool::new();
    let mut builder = RenderGraphBuilder::new();
    let image = builder.create_image(
        "mips",
        GfxImageDesc::new_2d(64, 64, vk::Format::R8G8B8A8_UNORM, vk::ImageUsageFlags::STORAGE),
    );
    builder.add_compute_pass("downsample", MipPass { image });

    let err = builder.bake(&device, &mut pool).unwrap_err();
    assert!(matches!(err, RenderGraphError::Configuration { .. }));
}

#[test]
fn test_allocation_failure_is_recoverable() {
    let mut device = MockDevice::new();
    device.fail_creates = true;
    let mut pool = TransientResourcePool::new();

    let mut builder = RenderGraphBuilder::new();
    let r = builder.create_buffer("r", storage_buffer(1 << 30));
    builder.add_compute_pass("p0", ComputePass { writes: vec![r], ..Default::default() });

    let err = builder.bake(&device, &mut pool).unwrap_err();
    assert!(matches!(err, RenderGraphError::AllocationFailed { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn test_zero_init_timeout_is_fatal() {
    let mut device = MockDevice::new();
    device.hang_fences = true;
    let mut pool = TransientResourcePool::new();

    let mut builder = RenderGraphBuilder::new();
    let counter = builder.create_buffer("counter", storage_buffer(16).with_zero_init());
    builder.add_compute_pass("p0", ComputePass { writes: vec![counter], ..Default::default() });

    let err = builder.bake(&device, &mut pool).unwrap_err();
    assert!(matches!(err, RenderGraphError::DeviceTimeout { .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn test_imported_image_final_state() {
    let device = MockDevice::new();
    let mut pool = TransientResourcePool::new();

    let desc = color_target_desc(64, 64);
    let physical = tessera_gfx_interface::GfxDevice::create_image(&device, &desc, "swapchain").unwrap();

    let mut builder = RenderGraphBuilder::new();
    let image = builder.import_image("swapchain", physical, desc, settled_color_attachment());
    builder.add_compute_pass("read", ComputePass { image_reads: vec![image], ..Default::default() });

    let baked = builder.bake(&device, &mut pool).unwrap();
    // 调用方据此把 swapchain image 衔接到 present
    assert_eq!(baked.final_image_state(image), RgImageState::SHADER_READ_COMPUTE);
    assert_eq!(baked.physical_image(image), Some(physical));
}

#[test]
fn test_transients_return_to_pool_after_finish() {
    let device = MockDevice::new();
    let mut pool = TransientResourcePool::new();

    for frame in 0..3 {
        let mut builder = RenderGraphBuilder::new();
        let r = builder.create_buffer("scratch", storage_buffer(4096));
        builder.add_compute_pass("p0", ComputePass { writes: vec![r], ..Default::default() });

        let baked = builder.bake(&device, &mut pool).unwrap();
        if frame > 0 {
            assert_eq!(baked.stats().placement.created, 0);
            assert_eq!(baked.stats().placement.pooled, 1);
        }
        baked.finish(&mut pool);
    }
    // 物理缓冲区只建了一个
    assert_eq!(device.buffer_count(), 1);
}

#[test]
fn test_aliasing_disjointness_randomized() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);

    for _ in 0..50 {
        let device = MockDevice::new();
        let mut pool = TransientResourcePool::new();
        let mut registry = RgResourceRegistry::default();
        let mut intervals = ResourceIntervals::default();

        let resource_count = rng.gen_range(2..40);
        let mut declared = Vec::new();
        for i in 0..resource_count {
            let first = rng.gen_range(0..20);
            let last = rng.gen_range(first..20);
            let size = 256u64 << rng.gen_range(0..4);
            let handle = registry.create_buffer(&format!("r{i}"), storage_buffer(size));
            intervals.buffers.insert(handle, ResourceInterval { first, last });
            declared.push((handle, ResourceInterval { first, last }));
        }

        let placement = place_transients(&device, &mut pool, &registry, &intervals).unwrap();

        // 区间重叠的资源永远不共享物理块
        for (i, (handle_a, interval_a)) in declared.iter().enumerate() {
            for (handle_b, interval_b) in &declared[i + 1..] {
                if interval_a.overlaps(interval_b) {
                    assert_ne!(
                        placement.buffers[*handle_a], placement.buffers[*handle_b],
                        "overlapping intervals {interval_a:?} and {interval_b:?} share backing"
                    );
                }
            }
        }
    }
}

#[test]
fn test_intervals_follow_execution_positions() {
    let device = MockDevice::new();
    let mut pool = TransientResourcePool::new();

    let mut builder = RenderGraphBuilder::new();
    let a = builder.create_buffer("a", storage_buffer(64));
    let b = builder.create_buffer("b", storage_buffer(64));
    builder.add_compute_pass("p0", ComputePass { writes: vec![a], ..Default::default() });
    builder.add_compute_pass("p1", ComputePass { reads: vec![a], writes: vec![b], ..Default::default() });
    builder.add_compute_pass("p2", ComputePass { reads: vec![b], ..Default::default() });

    let baked = builder.bake(&device, &mut pool).unwrap();
    // a 活在 [0,1]，b 活在 [1,2]，重叠于 p1，不能别名
    assert_ne!(baked.physical_buffer(a), baked.physical_buffer(b));
}

#[test]
fn test_aliased_buffers_are_barrier_separated() {
    let device = MockDevice::new();
    let mut pool = TransientResourcePool::new();

    // p0 和 p1 没有依赖边，a 和 b 别名同一个物理缓冲区：
    // p1 之前必须出现交接 barrier，否则两个写可以在 GPU 上并发
    let mut builder = RenderGraphBuilder::new();
    let a = builder.create_buffer("a", storage_buffer(1024));
    let b = builder.create_buffer("b", storage_buffer(1024));
    builder.add_compute_pass("p0", ComputePass { writes: vec![a], ..Default::default() });
    builder.add_compute_pass("p1", ComputePass { writes: vec![b], ..Default::default() });

    let baked = builder.bake(&device, &mut pool).unwrap();
    assert_eq!(baked.physical_buffer(a), baked.physical_buffer(b));
    assert_eq!(baked.stats().placement.aliased, 1);
    assert_eq!(baked.parallel_batches(), &[vec![0, 1]]);

    let log = Arc::new(Mutex::new(Vec::new()));
    baked.execute(&mut MockEncoder::new(log.clone()));

    let events = log.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            Event::BeginLabel("p0".into()),
            Event::EndLabel,
            Event::Barrier { images: 0, buffers: 1, accel_structs: 0 },
            Event::BeginLabel("p1".into()),
            Event::EndLabel,
        ]
    );
}

#[test]
fn test_aliased_images_are_barrier_separated() {
    let device = MockDevice::new();
    let mut pool = TransientResourcePool::new();

    let desc = GfxImageDesc::new_2d(64, 64, vk::Format::R8G8B8A8_UNORM, vk::ImageUsageFlags::STORAGE);
    let mut builder = RenderGraphBuilder::new();
    let a = builder.create_image("a", desc.clone());
    let b = builder.create_image("b", desc);
    builder.add_compute_pass("p0", ComputePass { image_writes: vec![a], ..Default::default() });
    builder.add_compute_pass("p1", ComputePass { image_writes: vec![b], ..Default::default() });

    let baked = builder.bake(&device, &mut pool).unwrap();
    assert_eq!(baked.physical_image(a), baked.physical_image(b));
    assert_eq!(device.image_count(), 1);

    let log = Arc::new(Mutex::new(Vec::new()));
    baked.execute(&mut MockEncoder::new(log.clone()));

    // p0 之前是 UNDEFINED 的首次 layout 转换；
    // p1 之前的 barrier 从 p0 的写状态交接，而不是再次从 UNDEFINED 放行
    let events = log.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            Event::Barrier { images: 1, buffers: 0, accel_structs: 0 },
            Event::BeginLabel("p0".into()),
            Event::EndLabel,
            Event::Barrier { images: 1, buffers: 0, accel_structs: 0 },
            Event::BeginLabel("p1".into()),
            Event::EndLabel,
        ]
    );
}
