//! GPU 同步机制模块
//!
//! 基于 Fence 的帧节奏控制：每个后台缓冲记录一个 Fence 值，
//! CPU 只有在即将复用的后台缓冲仍在 GPU 上执行时才会等待。
//!
//! # 设计原则
//!
//! - **Fence同步**：CPU 通过 `GpuFence` 等待 GPU 完成工作
//! - **与 API 解耦**：`FramePacer` 只依赖 `GpuFence` trait，测试中使用模拟 Fence
//!
//! # 使用场景
//!
//! 1. **帧同步**：CPU 最多领先 GPU N-1 帧
//! 2. **资源上传**：释放上传缓冲之前等待 GPU 完成拷贝
//! 3. **窗口调整**：ResizeBuffers 之前排空 GPU

use std::time::{Duration, Instant};

use crate::core::error::Result;

/// Fence 值
///
/// 用于CPU-GPU同步的单调递增值。
/// CPU可以等待GPU完成特定Fence值对应的工作。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct FenceValue(u64);

impl FenceValue {
    /// 创建新的Fence值
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// 获取内部值
    pub fn value(&self) -> u64 {
        self.0
    }

    /// 递增Fence值
    pub fn increment(&mut self) {
        self.0 += 1;
    }

    /// 下一个Fence值
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// GPU Fence 抽象
///
/// D3D12 后端用 `ID3D12Fence` + 事件实现，测试中用模拟实现。
pub trait GpuFence {
    /// 在命令队列上 signal 指定值
    fn signal(&mut self, value: FenceValue) -> Result<()>;

    /// GPU 已经完成的值
    fn completed_value(&self) -> FenceValue;

    /// 阻塞直到 GPU 完成指定值
    fn wait_for(&mut self, value: FenceValue) -> Result<()>;
}

/// 帧节奏控制器
///
/// 每个后台缓冲一个 Fence 值。创建时 `values[0] = 1`。
pub struct FramePacer<F: GpuFence> {
    fence: F,
    values: Vec<FenceValue>,
    back_buffer_index: usize,
    wait_count: u64,
}

impl<F: GpuFence> FramePacer<F> {
    pub fn new(fence: F, back_buffer_count: usize) -> Self {
        let mut values = vec![FenceValue::default(); back_buffer_count.max(1)];
        values[0] = FenceValue::new(1);

        Self {
            fence,
            values,
            back_buffer_index: 0,
            wait_count: 0,
        }
    }

    /// 当前后台缓冲下标
    pub fn back_buffer_index(&self) -> usize {
        self.back_buffer_index
    }

    /// 因 GPU 落后而阻塞的次数
    pub fn wait_count(&self) -> u64 {
        self.wait_count
    }

    pub fn values(&self) -> &[FenceValue] {
        &self.values
    }

    pub fn fence(&self) -> &F {
        &self.fence
    }

    /// Present 之后切换到下一帧
    ///
    /// `next_index` 是交换链当前的后台缓冲下标。
    pub fn move_to_next_frame(&mut self, next_index: usize) -> Result<()> {
        let current = self.values[self.back_buffer_index];
        self.fence.signal(current)?;

        self.back_buffer_index = next_index % self.values.len();

        let pending = self.values[self.back_buffer_index];
        if self.fence.completed_value() < pending {
            self.fence.wait_for(pending)?;
            self.wait_count += 1;
        }

        self.values[self.back_buffer_index] = current.next();
        Ok(())
    }

    /// 等待 GPU 完成目前提交的全部工作
    pub fn wait_for_gpu(&mut self) -> Result<()> {
        let value = self.values[self.back_buffer_index];
        self.fence.signal(value)?;
        self.fence.wait_for(value)?;
        self.values[self.back_buffer_index].increment();
        Ok(())
    }

    /// 交换链重建后重置
    ///
    /// 新的起始值接在 GPU 已完成的值之后，保持 Fence 单调递增。
    pub fn reset(&mut self) {
        let start = self.fence.completed_value().next();
        self.values.iter_mut().for_each(|v| *v = FenceValue::default());
        self.values[0] = start;
        self.back_buffer_index = 0;
    }
}

/// 一秒内的帧统计结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub fps: f64,
    pub frame_us: f64,
    pub waits: u64,
}

impl FrameReport {
    /// 追加在窗口标题后的文本
    pub fn title_suffix(&self) -> String {
        format!("{:.2} fps {:.2} µs {}", self.fps, self.frame_us, self.waits)
    }
}

/// 帧计时
///
/// 每满一秒产生一次 `FrameReport`。
#[derive(Debug)]
pub struct FrameStats {
    window_start: Instant,
    frames: u32,
    interval: Duration,
    last: Option<FrameReport>,
}

impl FrameStats {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            interval: Duration::from_secs(1),
            last: None,
        }
    }

    /// 记录一帧，满一秒时返回统计结果
    pub fn frame(&mut self, now: Instant, wait_count: u64) -> Option<FrameReport> {
        self.frames += 1;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        let report = FrameReport {
            fps: self.frames as f64 / secs,
            frame_us: secs * 1_000_000.0 / self.frames as f64,
            waits: wait_count,
        };

        self.frames = 0;
        self.window_start = now;
        self.last = Some(report);
        Some(report)
    }

    /// 最近一次的统计结果
    pub fn last(&self) -> Option<FrameReport> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 模拟 Fence：signal 之后 GPU 不会自动完成，只有等待时才推进
    #[derive(Default)]
    struct MockFence {
        signaled: Vec<u64>,
        waited: Vec<u64>,
        completed: u64,
    }

    impl GpuFence for MockFence {
        fn signal(&mut self, value: FenceValue) -> Result<()> {
            self.signaled.push(value.value());
            Ok(())
        }

        fn completed_value(&self) -> FenceValue {
            FenceValue::new(self.completed)
        }

        fn wait_for(&mut self, value: FenceValue) -> Result<()> {
            self.waited.push(value.value());
            self.completed = self.completed.max(value.value());
            Ok(())
        }
    }

    #[test]
    fn test_fence_value() {
        let mut fence = FenceValue::new(0);
        assert_eq!(fence.value(), 0);

        fence.increment();
        assert_eq!(fence.value(), 1);

        let next = fence.next();
        assert_eq!(next.value(), 2);
        assert_eq!(fence.value(), 1); // 原值不变
    }

    #[test]
    fn test_fence_ordering() {
        let f1 = FenceValue::new(1);
        let f2 = FenceValue::new(2);

        assert!(f1 < f2);
        assert_eq!(f1, FenceValue::new(1));
    }

    #[test]
    fn test_pacer_initial_state() {
        let pacer = FramePacer::new(MockFence::default(), 4);
        let values: Vec<u64> = pacer.values().iter().map(|v| v.value()).collect();
        assert_eq!(values, vec![1, 0, 0, 0]);
        assert_eq!(pacer.back_buffer_index(), 0);
    }

    #[test]
    fn test_pacer_waits_only_on_reuse() {
        let mut pacer = FramePacer::new(MockFence::default(), 3);

        pacer.move_to_next_frame(1).unwrap();
        pacer.move_to_next_frame(2).unwrap();
        assert_eq!(pacer.wait_count(), 0);

        // 回到缓冲 0，GPU 还没完成值 1
        pacer.move_to_next_frame(0).unwrap();
        assert_eq!(pacer.wait_count(), 1);
        assert_eq!(pacer.fence().signaled, vec![1, 2, 3]);
        assert_eq!(pacer.fence().waited, vec![1]);

        let values: Vec<u64> = pacer.values().iter().map(|v| v.value()).collect();
        assert_eq!(values, vec![4, 2, 3]);
    }

    #[test]
    fn test_pacer_no_wait_when_gpu_caught_up() {
        let mut pacer = FramePacer::new(MockFence::default(), 2);
        pacer.move_to_next_frame(1).unwrap();

        pacer.fence.completed = 10;
        pacer.move_to_next_frame(0).unwrap();
        pacer.move_to_next_frame(1).unwrap();
        assert_eq!(pacer.wait_count(), 0);
    }

    #[test]
    fn test_wait_for_gpu() {
        let mut pacer = FramePacer::new(MockFence::default(), 2);
        pacer.wait_for_gpu().unwrap();

        assert_eq!(pacer.fence().signaled, vec![1]);
        assert_eq!(pacer.fence().completed_value().value(), 1);
        assert_eq!(pacer.values()[0].value(), 2);
    }

    #[test]
    fn test_pacer_reset() {
        let mut pacer = FramePacer::new(MockFence::default(), 3);
        pacer.move_to_next_frame(1).unwrap();
        pacer.move_to_next_frame(2).unwrap();
        pacer.wait_for_gpu().unwrap();

        pacer.reset();
        let completed = pacer.fence().completed_value().value();
        let values: Vec<u64> = pacer.values().iter().map(|v| v.value()).collect();

        assert_eq!(pacer.back_buffer_index(), 0);
        assert_eq!(values, vec![completed + 1, 0, 0]);
    }

    #[test]
    fn test_frame_stats() {
        let start = Instant::now();
        let mut stats = FrameStats::new(start);

        for i in 1..100 {
            assert!(stats.frame(start + Duration::from_millis(i * 10), 0).is_none());
        }

        let report = stats.frame(start + Duration::from_secs(1), 3).unwrap();
        assert!((report.fps - 100.0).abs() < 1e-9);
        assert!((report.frame_us - 10_000.0).abs() < 1e-6);
        assert_eq!(report.title_suffix(), "100.00 fps 10000.00 µs 3");
        assert_eq!(stats.last(), Some(report));
    }
}
