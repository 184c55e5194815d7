//! 测试用的图形后端 mock
//!
//! 记录所有命令录制事件，测试据此断言最终命令流的形状与顺序。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tessera_render_graph::RgImageState;
use tessera_gfx_interface::{
    DeviceCapabilities, GfxAccelStructBarrier, GfxBufferBarrier, GfxBufferDesc, GfxBufferHandle, GfxCommandEncoder,
    GfxCommandPool, GfxDevice, GfxError, GfxFenceHandle, GfxImageBarrier, GfxImageDesc, GfxImageHandle,
    GfxRenderingInfo,
};

/// 一次命令录制事件
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Barrier { images: usize, buffers: usize, accel_structs: usize },
    BeginRendering { color_attachments: usize, render_area: (u32, u32) },
    EndRendering,
    BeginLabel(String),
    EndLabel,
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// primary encoder：事件直接写入共享日志
pub struct MockEncoder {
    log: EventLog,
}

impl MockEncoder {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }

    fn push(&self, event: Event) {
        self.log.lock().unwrap().push(event);
    }
}

impl GfxCommandEncoder for MockEncoder {
    fn pipeline_barrier(
        &mut self,
        image_barriers: &[GfxImageBarrier],
        buffer_barriers: &[GfxBufferBarrier],
        accel_struct_barriers: &[GfxAccelStructBarrier],
    ) {
        self.push(Event::Barrier {
            images: image_barriers.len(),
            buffers: buffer_barriers.len(),
            accel_structs: accel_struct_barriers.len(),
        });
    }

    fn begin_rendering(&mut self, info: &GfxRenderingInfo) {
        self.push(Event::BeginRendering {
            color_attachments: info.color_attachments.len(),
            render_area: info.render_area,
        });
    }

    fn end_rendering(&mut self) {
        self.push(Event::EndRendering);
    }

    fn begin_label(&mut self, name: &str) {
        self.push(Event::BeginLabel(name.to_string()));
    }

    fn end_label(&mut self) {
        self.push(Event::EndLabel);
    }

    fn execute_secondary(&mut self, secondary: Box<dyn GfxCommandEncoder>) {
        // secondary 的缓冲事件在 drop 时刷入共享日志，
        // 刷入点即合并点，顺序与真实后端一致
        drop(secondary);
    }
}

/// secondary encoder：本地缓冲，合并（drop）时刷入共享日志
pub struct MockSecondary {
    buffered: Vec<Event>,
    log: EventLog,
}

impl GfxCommandEncoder for MockSecondary {
    fn pipeline_barrier(
        &mut self,
        image_barriers: &[GfxImageBarrier],
        buffer_barriers: &[GfxBufferBarrier],
        accel_struct_barriers: &[GfxAccelStructBarrier],
    ) {
        self.buffered.push(Event::Barrier {
            images: image_barriers.len(),
            buffers: buffer_barriers.len(),
            accel_structs: accel_struct_barriers.len(),
        });
    }

    fn begin_rendering(&mut self, info: &GfxRenderingInfo) {
        self.buffered.push(Event::BeginRendering {
            color_attachments: info.color_attachments.len(),
            render_area: info.render_area,
        });
    }

    fn end_rendering(&mut self) {
        self.buffered.push(Event::EndRendering);
    }

    fn begin_label(&mut self, name: &str) {
        self.buffered.push(Event::BeginLabel(name.to_string()));
    }

    fn end_label(&mut self) {
        self.buffered.push(Event::EndLabel);
    }

    fn execute_secondary(&mut self, secondary: Box<dyn GfxCommandEncoder>) {
        drop(secondary);
    }
}

impl Drop for MockSecondary {
    fn drop(&mut self) {
        self.log.lock().unwrap().append(&mut self.buffered);
    }
}

/// secondary command buffer 池
pub struct MockPool {
    log: EventLog,
}

impl MockPool {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl GfxCommandPool for MockPool {
    fn new_secondary(&self, _flags: ash::vk::CommandBufferUsageFlags) -> Box<dyn GfxCommandEncoder> {
        Box::new(MockSecondary { buffered: Vec::new(), log: self.log.clone() })
    }
}

/// 可注入故障的测试设备
#[derive(Default)]
pub struct MockDevice {
    images: Mutex<slotmap::SlotMap<GfxImageHandle, GfxImageDesc>>,
    buffers: Mutex<slotmap::SlotMap<GfxBufferHandle, GfxBufferDesc>>,
    fences: Mutex<slotmap::SlotMap<GfxFenceHandle, ()>>,
    /// 为 true 时所有创建请求返回显存耗尽
    pub fail_creates: bool,
    /// 为 true 时 fence 等待超时
    pub hang_fences: bool,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_count(&self) -> usize {
        self.images.lock().unwrap().len()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.lock().unwrap().len()
    }
}

impl GfxDevice for MockDevice {
    fn create_image(&self, desc: &GfxImageDesc, _debug_name: &str) -> Result<GfxImageHandle, GfxError> {
        if self.fail_creates {
            return Err(GfxError::OutOfDeviceMemory { requested: desc.estimated_byte_size() });
        }
        Ok(self.images.lock().unwrap().insert(desc.clone()))
    }

    fn create_buffer(&self, desc: &GfxBufferDesc, _debug_name: &str) -> Result<GfxBufferHandle, GfxError> {
        if self.fail_creates {
            return Err(GfxError::OutOfDeviceMemory { requested: desc.size });
        }
        Ok(self.buffers.lock().unwrap().insert(desc.clone()))
    }

    fn destroy_image(&self, image: GfxImageHandle) {
        self.images.lock().unwrap().remove(image);
    }

    fn destroy_buffer(&self, buffer: GfxBufferHandle) {
        self.buffers.lock().unwrap().remove(buffer);
    }

    fn buffer_init_fence(&self, buffer: GfxBufferHandle) -> Option<GfxFenceHandle> {
        let needs_init = self.buffers.lock().unwrap().get(buffer).map(|d| d.zero_init).unwrap_or(false);
        needs_init.then(|| self.fences.lock().unwrap().insert(()))
    }

    fn wait_fence(&self, _fence: GfxFenceHandle, timeout: Duration) -> Result<(), GfxError> {
        if self.hang_fences {
            Err(GfxError::FenceTimeout { waited: timeout })
        } else {
            Ok(())
        }
    }

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities::default()
    }
}

/// 颜色附件用的标准 2D 图像描述
pub fn color_target_desc(width: u32, height: u32) -> GfxImageDesc {
    GfxImageDesc::new_2d(
        width,
        height,
        ash::vk::Format::R8G8B8A8_UNORM,
        ash::vk::ImageUsageFlags::COLOR_ATTACHMENT | ash::vk::ImageUsageFlags::SAMPLED,
    )
}

/// 导入图像时常用的“已处于 attachment layout、无在途访问”状态
pub fn settled_color_attachment() -> RgImageState {
    RgImageState::new(
        ash::vk::PipelineStageFlags2::TOP_OF_PIPE,
        ash::vk::AccessFlags2::NONE,
        ash::vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    )
}
