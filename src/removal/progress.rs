//! # 进度上报
//!
//! 进度是同步回调，在扫描循环内联调用。`ProgressTracker` 保证上报值单调不减、
//! 不超过 100，并把局部阶段的 0~100 映射到全局区间。

/// 编排层的进度检查点。
pub mod checkpoints {
    pub const DECODED: u8 = 10;
    pub const DIMENSIONS_CHECKED: u8 = 20;
    pub const BUFFER_READY: u8 = 25;
    pub const SAMPLED: u8 = 30;
    pub const MATCHED: u8 = 90;
    pub const ENCODED: u8 = 95;
    pub const DONE: u8 = 100;
}

/// 单调进度上报器。
pub struct ProgressTracker<F>
where
    F: FnMut(u8),
{
    sink: F,
    last: Option<u8>,
}

impl<F> ProgressTracker<F>
where
    F: FnMut(u8),
{
    pub fn new(sink: F) -> Self {
        Self { sink, last: None }
    }

    /// 上报进度；回退或重复的值会被丢弃。
    pub fn report(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.last.is_some_and(|last| percent <= last) {
            return;
        }
        self.last = Some(percent);
        (self.sink)(percent);
    }

    /// 把局部百分比映射到 `[start, end]` 后上报。
    pub fn report_within(&mut self, start: u8, end: u8, local_percent: u8) {
        let span = end.saturating_sub(start) as u32;
        let mapped = start as u32 + span * local_percent.min(100) as u32 / 100;
        self.report(mapped as u8);
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }
}

/// 扫描进度的局部百分比（`scanned / total`，向下取整）。
pub(crate) fn fraction_percent(scanned: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (scanned.saturating_mul(100) / total).min(100) as u8
}
