//! # 背景色估计
//!
//! ## 设计思路
//!
//! 假设背景是近似均匀的单一颜色，并且出现在图片边框上。
//! 从四个角与四条边的中点取样，对 RGB 求算术平均作为参考色。
//!
//! ## 实现思路
//!
//! - 坐标先夹到 `[0, w-1] × [0, h-1]`，绝不越界读取
//! - 重复坐标按列表出现次数计入（例如窄图中点与角重合）
//! - 无可用样本时回退到第一个像素，空缓冲回退到黑色

use super::{Color, PixelBuffer};

/// 采样坐标列表（允许越界或负值，查找时夹取）。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SampleSet {
    points: Vec<(i64, i64)>,
}

impl SampleSet {
    pub fn new(points: Vec<(i64, i64)>) -> Self {
        Self { points }
    }

    /// 默认 8 点：四角 + 四边中点（整数向下取整）。
    pub fn border(width: u32, height: u32) -> Self {
        let w = width as i64;
        let h = height as i64;
        Self::new(vec![
            (0, 0),
            (w - 1, 0),
            (0, h - 1),
            (w - 1, h - 1),
            (w / 2, 0),
            (w / 2, h - 1),
            (0, h / 2),
            (w - 1, h / 2),
        ])
    }

    pub fn points(&self) -> &[(i64, i64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// 估计背景色，返回的 alpha 恒为 255。
pub fn estimate(buffer: &PixelBuffer, samples: &SampleSet) -> Color {
    let (width, height) = buffer.dimensions();

    let mut sum = [0u64; 3];
    let mut count = 0u64;

    if width > 0 && height > 0 {
        for &(x, y) in samples.points() {
            let cx = x.clamp(0, width as i64 - 1) as u32;
            let cy = y.clamp(0, height as i64 - 1) as u32;

            if let Some(px) = buffer.pixel(cx, cy) {
                sum[0] += px.r as u64;
                sum[1] += px.g as u64;
                sum[2] += px.b as u64;
                count += 1;
            }
        }
    }

    if count == 0 {
        log::debug!("采样点为空，回退到首像素颜色");
        return buffer
            .pixel(0, 0)
            .map(|px| Color::rgb(px.r, px.g, px.b))
            .unwrap_or(Color::BLACK);
    }

    let mean = |total: u64| ((total + count / 2) / count) as u8;
    Color::rgb(mean(sum[0]), mean(sum[1]), mean(sum[2]))
}
