//! # 辅助滤镜：灰度与 Sobel 边缘
//!
//! 与主流程共享同一缓冲约定。灰度原地修改；Sobel 输出新缓冲，源缓冲不变。
//! 边缘检测目前不接入去背景主路径，只作为独立工具操作暴露。

use super::{Color, PixelBuffer};

const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const SOBEL_Y: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// 亮度加权灰度值：`round(0.299r + 0.587g + 0.114b)`。
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64)
        .round()
        .clamp(0.0, 255.0) as u8
}

/// 原地灰度化，alpha 不变。
pub fn to_grayscale(buffer: &mut PixelBuffer) {
    for px in buffer.data_mut().chunks_exact_mut(PixelBuffer::CHANNELS) {
        let gray = luminance(px[0], px[1], px[2]);
        px[0] = gray;
        px[1] = gray;
        px[2] = gray;
    }
}

/// Sobel 边缘强度图。
///
/// 边界按复制（clamp）处理；输出 RGB 为强度，alpha 恒为 255。
pub fn sobel(source: &PixelBuffer) -> PixelBuffer {
    let (width, height) = source.dimensions();
    if source.is_empty() {
        return PixelBuffer::filled(width, height, Color::BLACK);
    }

    let mut gray = source.clone();
    to_grayscale(&mut gray);

    let plane: Vec<i32> = gray
        .data()
        .chunks_exact(PixelBuffer::CHANNELS)
        .map(|px| px[0] as i32)
        .collect();

    let w = width as i64;
    let h = height as i64;
    let at = |x: i64, y: i64| -> i32 {
        let cx = x.clamp(0, w - 1) as usize;
        let cy = y.clamp(0, h - 1) as usize;
        plane[cy * width as usize + cx]
    };

    PixelBuffer::from_fn(width, height, |x, y| {
        let (x, y) = (x as i64, y as i64);
        let mut gx = 0i32;
        let mut gy = 0i32;

        for (ky, dy) in (-1..=1i64).enumerate() {
            for (kx, dx) in (-1..=1i64).enumerate() {
                let v = at(x + dx, y + dy);
                gx += SOBEL_X[ky][kx] * v;
                gy += SOBEL_Y[ky][kx] * v;
            }
        }

        let magnitude = ((gx * gx + gy * gy) as f64).sqrt().round().min(255.0) as u8;
        Color::rgb(magnitude, magnitude, magnitude)
    })
}
