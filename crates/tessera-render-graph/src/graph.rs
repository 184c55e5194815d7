//! Pass 依赖图
//!
//! 根据各 Pass 对资源的读写声明构建 DAG：
//! - 写 → 后续读（RAW）
//! - 读 → 下一个写（WAR）
//! - 写 → 下一个写（WAW）
//! - 读 → 读 不产生边，允许多个只读 Pass 并行
//!
//! 拓扑排序使用 Kahn 算法，入度相同时按声明顺序出队，
//! 保证同一份声明在任何平台上得到相同的执行顺序。

use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::handle::RgResourceHandle;
use crate::pass::RgPassNode;

/// 依赖图中的一条边
#[derive(Clone, Copy, Debug)]
pub struct DependencyEdge {
    /// 前驱 Pass 下标
    pub from: usize,
    /// 后继 Pass 下标
    pub to: usize,
    /// 产生该依赖的资源
    pub resource: RgResourceHandle,
}

/// 循环检测结果（下标形式，调用方负责转换为名称）
#[derive(Clone, Debug)]
pub struct GraphCycleInfo {
    /// 参与循环的 Pass 下标
    pub passes: Vec<usize>,
    /// 循环中涉及的一个资源，定位失败时为 None
    pub resource: Option<RgResourceHandle>,
}

/// 单个资源的访问链（构建期间使用）
#[derive(Default)]
struct ResourceChain {
    last_writer: Option<usize>,
    readers_since_write: Vec<usize>,
}

/// Pass 依赖图
pub struct DependencyGraph {
    /// 邻接表：adjacency[i] 是 Pass i 的所有后继
    adjacency: Vec<Vec<usize>>,
    /// 入度表
    in_degrees: Vec<usize>,
    /// 全部边（循环定位、执行计划打印使用）
    edges: Vec<DependencyEdge>,
    /// 去重：同一对 Pass 之间只保留第一条边
    edge_set: HashSet<(usize, usize)>,
    /// 每个资源的访问链
    chains: HashMap<RgResourceHandle, ResourceChain>,
}

// 构建
impl DependencyGraph {
    /// 创建空图
    pub fn new(pass_count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); pass_count],
            in_degrees: vec![0; pass_count],
            edges: Vec::new(),
            edge_set: HashSet::new(),
            chains: HashMap::new(),
        }
    }

    /// 从 Pass 声明构建依赖图
    ///
    /// 必须按声明顺序传入，依赖方向由声明顺序决定。
    pub fn build(passes: &[RgPassNode]) -> Self {
        let mut graph = Self::new(passes.len());
        for (pass_idx, pass) in passes.iter().enumerate() {
            // 同一个 Pass 对同一资源的多次声明合并为一次（读写取并集），
            // 合并顺序保持首次声明顺序，确保边的生成是确定性的
            let mut order: Vec<RgResourceHandle> = Vec::new();
            let mut merged: HashMap<RgResourceHandle, (bool, bool)> = HashMap::new();
            let mut note = |resource: RgResourceHandle, reads: bool, writes: bool| {
                let entry = merged.entry(resource).or_insert_with(|| {
                    order.push(resource);
                    (false, false)
                });
                entry.0 |= reads;
                entry.1 |= writes;
            };

            for access in &pass.image_reads {
                note(access.handle.into(), true, false);
            }
            for access in &pass.image_writes {
                note(access.handle.into(), false, true);
            }
            for access in &pass.buffer_reads {
                note(access.handle.into(), true, false);
            }
            for access in &pass.buffer_writes {
                note(access.handle.into(), false, true);
            }
            for access in &pass.accel_struct_reads {
                note(access.handle.into(), true, false);
            }
            for access in &pass.accel_struct_writes {
                note(access.handle.into(), false, true);
            }

            for resource in order {
                let (reads, writes) = merged[&resource];
                graph.add_access(pass_idx, resource, reads, writes);
            }
        }
        graph
    }

    /// 记录一次访问并生成相应的边
    ///
    /// 每个 (pass, resource) 只应调用一次；读写同一资源的 Pass
    /// 以 `reads && writes` 的形式一次性记录。
    pub fn add_access(&mut self, pass_idx: usize, resource: RgResourceHandle, reads: bool, writes: bool) {
        let chain = self.chains.entry(resource).or_default();
        let last_writer = chain.last_writer;
        let readers = std::mem::take(&mut chain.readers_since_write);

        if writes {
            if let Some(writer) = last_writer {
                self.add_edge(writer, pass_idx, resource);
            }
            for reader in &readers {
                self.add_edge(*reader, pass_idx, resource);
            }
            let chain = self.chains.entry(resource).or_default();
            chain.last_writer = Some(pass_idx);
            // readers_since_write 保持清空状态
        } else if reads {
            if let Some(writer) = last_writer {
                self.add_edge(writer, pass_idx, resource);
            }
            let chain = self.chains.entry(resource).or_default();
            chain.readers_since_write = readers;
            chain.readers_since_write.push(pass_idx);
        }
    }

    fn add_edge(&mut self, from: usize, to: usize, resource: RgResourceHandle) {
        if from == to {
            return;
        }
        if !self.edge_set.insert((from, to)) {
            return;
        }
        self.adjacency[from].push(to);
        self.in_degrees[to] += 1;
        self.edges.push(DependencyEdge { from, to, resource });
    }
}

// 查询
impl DependencyGraph {
    /// Pass 数量
    #[inline]
    pub fn pass_count(&self) -> usize {
        self.adjacency.len()
    }

    /// 全部边
    #[inline]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// 拓扑排序
    ///
    /// Kahn 算法，就绪集合用最小堆维护，保证入度同时归零的 Pass
    /// 按声明顺序出队。存在循环时返回参与循环的 Pass 集合。
    pub fn topological_order(&self) -> Result<Vec<usize>, GraphCycleInfo> {
        let n = self.pass_count();
        let mut in_degrees = self.in_degrees.clone();
        let mut ready = BinaryHeap::new();
        for (idx, &deg) in in_degrees.iter().enumerate() {
            if deg == 0 {
                ready.push(std::cmp::Reverse(idx));
            }
        }

        let mut order = Vec::with_capacity(n);
        while let Some(std::cmp::Reverse(idx)) = ready.pop() {
            order.push(idx);
            for &succ in &self.adjacency[idx] {
                in_degrees[succ] -= 1;
                if in_degrees[succ] == 0 {
                    ready.push(std::cmp::Reverse(succ));
                }
            }
        }

        if order.len() == n {
            Ok(order)
        } else {
            // 未能出队的 Pass 都在某个循环上（或依赖循环上的 Pass）
            let stuck: Vec<usize> = (0..n).filter(|&i| in_degrees[i] > 0).collect();
            let stuck_set: HashSet<usize> = stuck.iter().copied().collect();
            let resource = self
                .edges
                .iter()
                .find(|e| stuck_set.contains(&e.from) && stuck_set.contains(&e.to))
                .map(|e| e.resource);
            Err(GraphCycleInfo { passes: stuck, resource })
        }
    }

    /// 计算并行录制批次
    ///
    /// 按层级分组：每个 Pass 的层级 = 所有前驱层级的最大值 + 1，
    /// 同层 Pass 互相无依赖，可以同时录制。批次内按声明顺序排列。
    pub fn parallel_batches(&self, topo_order: &[usize]) -> Vec<Vec<usize>> {
        let n = self.pass_count();
        let mut level = vec![0usize; n];
        let mut max_level = 0;
        for &idx in topo_order {
            for &succ in &self.adjacency[idx] {
                level[succ] = level[succ].max(level[idx] + 1);
                max_level = max_level.max(level[succ]);
            }
        }

        let mut batches = vec![Vec::new(); max_level + 1];
        for idx in 0..n {
            batches[level[idx]].push(idx);
        }
        batches.retain(|b| !b.is_empty());
        batches
    }
}
