//! # 颜色匹配与透明化
//!
//! ## 设计思路
//!
//! 对每个像素计算与参考背景色的 RGB 欧氏距离，严格小于容差即把 alpha 置 0，
//! RGB 通道保持不变。
//!
//! ## 实现思路
//!
//! - 直接比较开方后的距离：平方后的浮点容差会向上舍入，
//!   恰好落在容差上的像素会被误清除
//! - 扫描前检查像素数是否超过安全上限（`max_total_pixels * 1.5`），
//!   兜住绕过解码门限直接构造缓冲的路径
//! - 逐行轮询取消标志，逐行上报局部进度（0~100）

use super::progress::{ProgressTracker, fraction_percent};
use super::{Color, PixelBuffer, ProcessingOptions, RemovalError};

/// 匹配统计。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchReport {
    pub scanned: u64,
    pub cleared: u64,
}

/// 背景匹配器。
#[derive(Debug, Clone, Copy)]
pub struct AlphaMatcher {
    tolerance: f64,
    pixel_ceiling: u64,
}

impl AlphaMatcher {
    pub fn new(tolerance: f64, pixel_ceiling: u64) -> Self {
        Self {
            tolerance,
            pixel_ceiling,
        }
    }

    pub fn from_options(options: &ProcessingOptions) -> Self {
        Self::new(options.color_tolerance, options.pixel_ceiling())
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// 该像素是否被判定为背景。
    pub fn is_background(&self, pixel: Color, target: &Color) -> bool {
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return false;
        }
        pixel.distance(target) < self.tolerance
    }

    pub fn match_and_clear<P>(
        &self,
        buffer: &mut PixelBuffer,
        target: Color,
        on_progress: P,
    ) -> Result<MatchReport, RemovalError>
    where
        P: FnMut(u8),
    {
        self.match_and_clear_with_hooks(buffer, target, on_progress, || false)
    }

    /// 原地清除背景像素的 alpha。
    ///
    /// 失败（超过安全上限 / 被取消）时调用方应丢弃该缓冲。
    pub fn match_and_clear_with_hooks<P, C>(
        &self,
        buffer: &mut PixelBuffer,
        target: Color,
        on_progress: P,
        is_cancelled: C,
    ) -> Result<MatchReport, RemovalError>
    where
        P: FnMut(u8),
        C: Fn() -> bool,
    {
        let total = buffer.pixel_count();
        if total > self.pixel_ceiling {
            log::warn!(
                "⛔ 像素数 {} 超过安全上限 {}，中止匹配",
                total,
                self.pixel_ceiling
            );
            return Err(RemovalError::ProcessingTimeout {
                pixels: total,
                ceiling: self.pixel_ceiling,
            });
        }

        let mut tracker = ProgressTracker::new(on_progress);
        let mut report = MatchReport::default();
        let row_len = buffer.width() as usize * PixelBuffer::CHANNELS;

        tracker.report(0);

        if row_len > 0 {
            for row in buffer.data_mut().chunks_exact_mut(row_len) {
                if is_cancelled() {
                    log::info!("🛑 匹配已取消（已扫描 {} / {} 像素）", report.scanned, total);
                    return Err(RemovalError::Cancelled);
                }

                for px in row.chunks_exact_mut(PixelBuffer::CHANNELS) {
                    if self.is_background(Color::rgba(px[0], px[1], px[2], px[3]), &target) {
                        px[3] = 0;
                        report.cleared += 1;
                    }
                }

                report.scanned += (row.len() / PixelBuffer::CHANNELS) as u64;
                tracker.report(fraction_percent(report.scanned, total));
            }
        }

        tracker.report(100);

        log::debug!(
            "匹配完成：target={} tolerance={} cleared={}/{}",
            target.to_hex(),
            self.tolerance,
            report.cleared,
            report.scanned
        );

        Ok(report)
    }
}

/// 使用默认安全上限执行匹配。
pub fn match_and_clear<P>(
    buffer: &mut PixelBuffer,
    target: Color,
    tolerance: f64,
    on_progress: P,
) -> Result<MatchReport, RemovalError>
where
    P: FnMut(u8),
{
    AlphaMatcher::new(tolerance, ProcessingOptions::default().pixel_ceiling())
        .match_and_clear(buffer, target, on_progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_gray_is_fully_cleared() {
        let mut buffer = PixelBuffer::filled(4, 4, Color::rgb(128, 128, 128));
        let report = match_and_clear(&mut buffer, Color::rgb(128, 128, 128), 45.0, |_| {})
            .expect("match failed");

        assert_eq!(report, MatchReport { scanned: 16, cleared: 16 });
        assert!(buffer.data().chunks_exact(4).all(|px| px == [128, 128, 128, 0]));
    }

    #[test]
    fn boundary_distance_is_not_cleared() {
        let mut buffer = PixelBuffer::from_fn(3, 1, |x, _| match x {
            0 => Color::rgb(45, 0, 0),
            1 => Color::rgb(44, 0, 0),
            _ => Color::rgb(27, 36, 0),
        });

        match_and_clear(&mut buffer, Color::rgb(0, 0, 0), 45.0, |_| {}).expect("match failed");

        assert_eq!(buffer.pixel(0, 0).map(|c| c.a), Some(255));
        assert_eq!(buffer.pixel(1, 0).map(|c| c.a), Some(0));
        // 27² + 36² = 45²
        assert_eq!(buffer.pixel(2, 0).map(|c| c.a), Some(255));
    }

    #[test]
    fn irrational_tolerance_keeps_pixel_on_the_boundary() {
        let mut buffer = PixelBuffer::filled(1, 1, Color::rgb(1, 1, 0));
        let report = match_and_clear(&mut buffer, Color::rgb(0, 0, 0), 2f64.sqrt(), |_| {})
            .expect("match failed");

        assert_eq!(report.cleared, 0);
        assert_eq!(buffer.pixel(0, 0).map(|c| c.a), Some(255));
    }

    #[test]
    fn zero_tolerance_clears_nothing() {
        let mut buffer = PixelBuffer::filled(2, 2, Color::rgb(5, 5, 5));
        let report = match_and_clear(&mut buffer, Color::rgb(5, 5, 5), 0.0, |_| {})
            .expect("match failed");
        assert_eq!(report.cleared, 0);
    }

    #[test]
    fn ceiling_trips_before_touching_pixels() {
        let mut buffer = PixelBuffer::filled(10, 10, Color::rgb(1, 1, 1));
        let matcher = AlphaMatcher::new(45.0, 99);

        let result = matcher.match_and_clear(&mut buffer, Color::rgb(1, 1, 1), |_| {});

        assert!(matches!(
            result,
            Err(RemovalError::ProcessingTimeout { pixels: 100, ceiling: 99 })
        ));
        assert!(buffer.data().chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_100() {
        let mut buffer = PixelBuffer::filled(7, 13, Color::rgb(0, 0, 0));
        let mut seen = Vec::new();
        match_and_clear(&mut buffer, Color::rgb(255, 255, 255), 10.0, |p| seen.push(p))
            .expect("match failed");

        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn cancellation_stops_the_scan() {
        let mut buffer = PixelBuffer::filled(4, 4, Color::rgb(0, 0, 0));
        let matcher = AlphaMatcher::new(45.0, 1_000);

        let result = matcher.match_and_clear_with_hooks(&mut buffer, Color::BLACK, |_| {}, || true);
        assert!(matches!(result, Err(RemovalError::Cancelled)));
    }

    #[test]
    fn empty_buffer_reports_completion() {
        let mut buffer = PixelBuffer::new(0, 0, Vec::new()).expect("empty layout is valid");
        let mut seen = Vec::new();
        let report = match_and_clear(&mut buffer, Color::BLACK, 45.0, |p| seen.push(p))
            .expect("match failed");
        assert_eq!(report.scanned, 0);
        assert_eq!(seen, vec![0, 100]);
    }
}
