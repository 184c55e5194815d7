//! 阴影图集的空间 tile 分配
//!
//! 为大量光源的阴影贴图在一张共享图集上分配区域：
//! 多级四叉 tile 层级提供不同精度，(light_uuid, face) 缓存
//! 让静止光源跨帧复用已渲染的内容，超订时按 LRU 淘汰。
//!
//! 分配器状态跨帧存活于内存中，不做任何序列化。

mod allocator;

pub use allocator::{TileAllocation, TileAllocator, TileRequest};
