//! 图集 tile 分配器
//!
//! 把一张阴影图集划分为多级 tile 层级：level 0 最细，每往上一级
//! tile 数量减半、面积翻倍，上级 tile 恰好由 4 个下级 tile 组成
//! （四叉划分）。每个光源的面按需要的精度在对应层级申请一个 tile，
//! 并可选地按 (light_uuid, face) 缓存，避免静止光源每帧重渲染。
//!
//! 淘汰策略：优先使用空 tile，否则踢掉 last_used_timestamp 最小且
//! 本帧未被占用的 tile；时间戳相同时先遇到的胜出，遍历顺序固定，
//! 结果可复现。

use std::collections::HashMap;

use glam::UVec4;

const INVALID_TILE: u32 = u32::MAX;

/// 一次 tile 申请的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileAllocation {
    /// 分配到 tile（新分配或内容已过期），调用方必须渲染进该 viewport
    Succeeded(UVec4),
    /// 缓存命中且内容仍然有效，不需要重渲染
    Cached(UVec4),
    /// 图集本帧超订，调用方应降级（例如跳过该光源的阴影）
    Failed,
}

impl TileAllocation {
    /// 分配到的 viewport（tile 单位；乘以 tile 像素尺寸得到像素区域）
    pub fn viewport(&self) -> Option<UVec4> {
        match self {
            TileAllocation::Succeeded(v) | TileAllocation::Cached(v) => Some(*v),
            TileAllocation::Failed => None,
        }
    }

    /// 是否需要（重新）渲染
    pub fn needs_rendering(&self) -> bool {
        matches!(self, TileAllocation::Succeeded(_))
    }
}

/// 一次 tile 申请的全部参数
#[derive(Clone, Copy, Debug)]
pub struct TileRequest {
    /// 当前帧时间戳，必须 > 0 且单调递增
    pub current_timestamp: u64,
    /// 光源最后一次变化的时间戳
    pub light_timestamp: u64,
    /// 光源唯一标识，0 保留表示无主
    pub light_uuid: u64,
    /// 光源的面（点光源 0..6，其他 0）
    pub light_face: u32,
    /// 本次渲染的 drawcall 数量，变化时缓存失效
    pub drawcall_count: u32,
    /// 申请的层级，0 最细
    pub hierarchy: u32,
}

/// 单个 tile 的状态
#[derive(Clone, Debug)]
struct Tile {
    /// 光源最后一次变化的时间戳
    light_timestamp: u64,
    /// 该 tile 最后一次被占用的时间戳，0 表示从未使用
    last_used_timestamp: u64,
    /// 拥有者光源，0 表示无主
    light_uuid: u64,
    light_drawcall_count: u32,
    light_hierarchy: u32,
    light_face: u32,
    /// tile 单位的 viewport：(x, y, w, h)
    viewport: UVec4,
    /// 四个子 tile 的下标，level 0 为 INVALID_TILE
    sub_tiles: [u32; 4],
    /// 父 tile 下标，最粗层级为 INVALID_TILE
    super_tile: u32,
}

/// 图集 tile 分配器
///
/// 状态跨帧存活。单写者契约：同一时刻至多一个线程访问，
/// 由调用方（阴影 pass 的单线程预处理阶段）保证。
pub struct TileAllocator {
    /// 所有层级的 tile 平铺在一个数组里，层级内按行主序
    tiles: Vec<Tile>,
    /// 各层级在 tiles 中的起始下标，最后一项是总数
    first_tile_of_hierarchy: Vec<usize>,
    tile_count_x: u32,
    tile_count_y: u32,
    hierarchy_count: u32,
    caching_enabled: bool,
    /// (light_uuid, face) → tile 下标
    cache: HashMap<(u64, u32), u32>,
}

impl TileAllocator {
    /// 创建分配器
    ///
    /// # Panics
    /// `tile_count_x`/`tile_count_y` 必须能被 `2^(hierarchy_count-1)`
    /// 整除，否则上级 tile 无法精确四叉划分。
    pub fn new(tile_count_x: u32, tile_count_y: u32, hierarchy_count: u32, enable_caching: bool) -> Self {
        assert!(tile_count_x > 0 && tile_count_y > 0);
        assert!(hierarchy_count > 0);

        // 层级索引范围
        let mut first_tile_of_hierarchy = Vec::with_capacity(hierarchy_count as usize + 1);
        let mut tile_count = 0usize;
        for hierarchy in 0..hierarchy_count {
            let count_x = tile_count_x >> hierarchy;
            let count_y = tile_count_y >> hierarchy;
            assert!(
                count_x << hierarchy == tile_count_x && count_y << hierarchy == tile_count_y,
                "tile count must be divisible by 2^(hierarchy_count-1)"
            );
            first_tile_of_hierarchy.push(tile_count);
            tile_count += (count_x * count_y) as usize;
        }
        first_tile_of_hierarchy.push(tile_count);

        let mut allocator = Self {
            tiles: vec![
                Tile {
                    light_timestamp: 0,
                    last_used_timestamp: 0,
                    light_uuid: 0,
                    light_drawcall_count: 0,
                    light_hierarchy: 0,
                    light_face: 0,
                    viewport: UVec4::ZERO,
                    sub_tiles: [INVALID_TILE; 4],
                    super_tile: INVALID_TILE,
                };
                tile_count
            ],
            first_tile_of_hierarchy,
            tile_count_x,
            tile_count_y,
            hierarchy_count,
            caching_enabled: enable_caching,
            cache: HashMap::new(),
        };

        // viewport 与四叉树链接
        for hierarchy in 0..hierarchy_count {
            let count_x = tile_count_x >> hierarchy;
            let count_y = tile_count_y >> hierarchy;
            for y in 0..count_y {
                for x in 0..count_x {
                    let tile_idx = allocator.translate_tile_idx(x, y, hierarchy);
                    allocator.tiles[tile_idx].viewport =
                        UVec4::new(x << hierarchy, y << hierarchy, 1 << hierarchy, 1 << hierarchy);

                    if hierarchy > 0 {
                        for j in 0..2u32 {
                            for i in 0..2u32 {
                                let sub_idx = allocator.translate_tile_idx((x << 1) + i, (y << 1) + j, hierarchy - 1);
                                allocator.tiles[sub_idx].super_tile = tile_idx as u32;
                                allocator.tiles[tile_idx].sub_tiles[(j * 2 + i) as usize] = sub_idx as u32;
                            }
                        }
                    }
                }
            }
        }

        allocator
    }

    /// 最细层级的 tile 网格尺寸
    pub fn tile_counts(&self) -> (u32, u32) {
        (self.tile_count_x, self.tile_count_y)
    }

    /// 层级数
    pub fn hierarchy_count(&self) -> u32 {
        self.hierarchy_count
    }

    /// 某层级在 tile 数组中的范围
    fn hierarchy_range(&self, hierarchy: u32) -> std::ops::Range<usize> {
        self.first_tile_of_hierarchy[hierarchy as usize]..self.first_tile_of_hierarchy[hierarchy as usize + 1]
    }

    /// (x, y, hierarchy) → 平铺数组下标
    fn translate_tile_idx(&self, x: u32, y: u32, hierarchy: u32) -> usize {
        let count_x = self.tile_count_x >> hierarchy;
        self.first_tile_of_hierarchy[hierarchy as usize] + (y * count_x + x) as usize
    }

    /// 申请一个 tile
    ///
    /// 流程：缓存命中判定 → 层级化搜索（空 tile 优先，否则 LRU 淘汰）
    /// → 元数据写入与上下层级传播。
    ///
    /// # Panics
    /// 时间戳为 0、`light_uuid` 为 0 或 `hierarchy` 越界是调用方 bug。
    pub fn allocate(&mut self, req: &TileRequest) -> TileAllocation {
        assert!(req.current_timestamp > 0);
        assert!(req.light_timestamp > 0 && req.light_timestamp <= req.current_timestamp);
        assert!(req.light_uuid != 0);
        assert!(req.light_face < 6);
        assert!(req.hierarchy < self.hierarchy_count);

        // 1) 缓存查找
        let cache_key = (req.light_uuid, req.light_face);
        if self.caching_enabled {
            if let Some(&tile_idx) = self.cache.get(&cache_key) {
                let tile = &self.tiles[tile_idx as usize];
                if tile.light_uuid != req.light_uuid
                    || tile.light_hierarchy != req.hierarchy
                    || tile.light_face != req.light_face
                {
                    // 条目已过期（tile 被别人踢占或层级变化），移除后走完整搜索
                    self.cache.remove(&cache_key);
                } else {
                    assert!(
                        tile.last_used_timestamp != req.current_timestamp,
                        "same light/face allocated twice in one timestamp"
                    );

                    let needs_rerendering = tile.light_drawcall_count != req.drawcall_count
                        || tile.light_timestamp < req.light_timestamp;

                    let tile = &mut self.tiles[tile_idx as usize];
                    tile.light_timestamp = req.light_timestamp;
                    tile.last_used_timestamp = req.current_timestamp;
                    tile.light_drawcall_count = req.drawcall_count;
                    let viewport = tile.viewport;

                    self.update_sub_tiles(tile_idx as usize);
                    self.update_super_tiles(tile_idx as usize);

                    return if needs_rerendering {
                        TileAllocation::Succeeded(viewport)
                    } else {
                        TileAllocation::Cached(viewport)
                    };
                }
            }
        }

        // 2) 层级化搜索：从最粗层级开始下钻，让同一光源的 tile 尽量
        //    聚在一起（局部性优于图集利用率）
        let mut empty_tile = None;
        let mut kick_tile: Option<(u32, u64)> = None;
        let max_hierarchy = self.hierarchy_count - 1;
        for tile_idx in self.hierarchy_range(max_hierarchy) {
            let done = if req.hierarchy == max_hierarchy {
                self.evaluate_candidate(tile_idx, req.current_timestamp, &mut empty_tile, &mut kick_tile)
            } else {
                self.search_tile_recursively(
                    tile_idx,
                    max_hierarchy,
                    req.hierarchy,
                    req.current_timestamp,
                    &mut empty_tile,
                    &mut kick_tile,
                )
            };
            if done {
                break;
            }
        }

        let allocated_idx = match (empty_tile, kick_tile) {
            (Some(idx), _) => idx,
            (None, Some((idx, _))) => {
                log::trace!("tile atlas evicting tile {idx} for light {:#x}", req.light_uuid);
                idx
            }
            (None, None) => return TileAllocation::Failed,
        };

        // 3) 写入新主人的元数据并传播
        let tile = &mut self.tiles[allocated_idx as usize];
        tile.light_timestamp = req.light_timestamp;
        tile.last_used_timestamp = req.current_timestamp;
        tile.light_uuid = req.light_uuid;
        tile.light_drawcall_count = req.drawcall_count;
        tile.light_hierarchy = req.hierarchy;
        tile.light_face = req.light_face;
        let viewport = tile.viewport;

        self.update_sub_tiles(allocated_idx as usize);
        self.update_super_tiles(allocated_idx as usize);

        if self.caching_enabled {
            self.cache.insert(cache_key, allocated_idx);
        }

        TileAllocation::Succeeded(viewport)
    }

    /// 强制移除缓存条目，使该光源的下一次申请必定重新渲染
    pub fn invalidate_cache(&mut self, light_uuid: u64, light_face: u32) {
        assert!(self.caching_enabled);
        assert!(light_uuid != 0);
        self.cache.remove(&(light_uuid, light_face));
    }

    /// 在请求层级上评估一个候选 tile
    ///
    /// 空 tile 立即胜出；否则在本帧未被占用的 tile 中维护
    /// last_used_timestamp 的运行最小值作为淘汰候选，
    /// 时间戳并列时先遇到的保留。
    fn evaluate_candidate(
        &self,
        tile_idx: usize,
        current_timestamp: u64,
        empty_tile: &mut Option<u32>,
        kick_tile: &mut Option<(u32, u64)>,
    ) -> bool {
        let tile = &self.tiles[tile_idx];

        if self.caching_enabled {
            if tile.last_used_timestamp == 0 {
                *empty_tile = Some(tile_idx as u32);
                return true;
            }
            if tile.last_used_timestamp != current_timestamp
                && kick_tile.map_or(true, |(_, min)| tile.last_used_timestamp < min)
            {
                *kick_tile = Some((tile_idx as u32, tile.last_used_timestamp));
            }
        } else {
            // 不缓存时没有跨帧内容可保护，本帧未占用就能直接用
            if tile.last_used_timestamp != current_timestamp {
                *empty_tile = Some(tile_idx as u32);
                return true;
            }
        }

        false
    }

    /// 从 `tile_hierarchy` 层的 tile 下钻到请求层级并评估候选
    fn search_tile_recursively(
        &self,
        tile_idx: usize,
        tile_hierarchy: u32,
        allocation_hierarchy: u32,
        current_timestamp: u64,
        empty_tile: &mut Option<u32>,
        kick_tile: &mut Option<(u32, u64)>,
    ) -> bool {
        if tile_hierarchy == allocation_hierarchy {
            return self.evaluate_candidate(tile_idx, current_timestamp, empty_tile, kick_tile);
        }

        let sub_tiles = self.tiles[tile_idx].sub_tiles;
        if sub_tiles[0] == INVALID_TILE {
            return false;
        }
        for sub_idx in sub_tiles {
            let done = self.search_tile_recursively(
                sub_idx as usize,
                tile_hierarchy - 1,
                allocation_hierarchy,
                current_timestamp,
                empty_tile,
                kick_tile,
            );
            if done {
                return true;
            }
        }
        false
    }

    /// 把主人的元数据向下传播到所有后代 tile，
    /// 使更细粒度的读者看到一致的归属
    fn update_sub_tiles(&mut self, tile_idx: usize) {
        let from = self.tiles[tile_idx].clone();
        if from.sub_tiles[0] == INVALID_TILE {
            return;
        }
        for sub_idx in from.sub_tiles {
            let sub = &mut self.tiles[sub_idx as usize];
            sub.light_timestamp = from.light_timestamp;
            sub.last_used_timestamp = from.last_used_timestamp;
            sub.light_uuid = from.light_uuid;
            sub.light_drawcall_count = from.light_drawcall_count;
            sub.light_hierarchy = from.light_hierarchy;
            sub.light_face = from.light_face;
            self.update_sub_tiles(sub_idx as usize);
        }
    }

    /// 清除所有祖先 tile 的归属：子 tile 被占用后，
    /// 父 tile 的聚合不再代表单一光源
    fn update_super_tiles(&mut self, tile_idx: usize) {
        let super_idx = self.tiles[tile_idx].super_tile;
        if super_idx == INVALID_TILE {
            return;
        }
        let last_used = self.tiles[tile_idx].last_used_timestamp;
        let parent = &mut self.tiles[super_idx as usize];
        parent.light_uuid = 0;
        parent.last_used_timestamp = last_used;
        self.update_super_tiles(super_idx as usize);
    }
}

// 测试用内部查询
#[cfg(test)]
impl TileAllocator {
    fn tile_owner(&self, x: u32, y: u32, hierarchy: u32) -> (u64, u32, u32) {
        let tile = &self.tiles[self.translate_tile_idx(x, y, hierarchy)];
        (tile.light_uuid, tile.light_hierarchy, tile.light_face)
    }
}
