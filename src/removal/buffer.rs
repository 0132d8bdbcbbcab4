//! # 像素缓冲模块
//!
//! ## 设计思路
//!
//! `PixelBuffer` 是整条流水线共享的栅格表示：宽、高与一段连续的 RGBA 字节。
//! 构造时即校验 `data.len() == width * height * 4`，后续阶段无需重复检查长度，
//! 只需按所有权在阶段之间移动。
//!
//! `Color` 是纯值类型，采样器输出它，匹配器以它作为参考色。

use image::{ImageBuffer, Rgba, RgbaImage};

use super::RemovalError;

/// 单个像素颜色（RGBA，8 位通道）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// 构造不透明颜色。
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// RGB 空间欧氏距离的平方（忽略 alpha）。
    pub fn distance_squared(&self, other: &Color) -> f64 {
        let dr = self.r as f64 - other.r as f64;
        let dg = self.g as f64 - other.g as f64;
        let db = self.b as f64 - other.b as f64;
        dr * dr + dg * dg + db * db
    }

    /// RGB 空间欧氏距离（忽略 alpha）。
    ///
    /// # 示例
    /// ```rust
    /// use background_remover::removal::Color;
    ///
    /// let d = Color::rgb(0, 0, 0).distance(&Color::rgb(3, 4, 0));
    /// assert_eq!(d, 5.0);
    /// ```
    pub fn distance(&self, other: &Color) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// 十六进制表示（`#rrggbb`），用于日志与 CLI 输出。
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// RGBA 像素缓冲。
///
/// 通道顺序固定为 R、G、B、A，行优先存储。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// 每个像素的通道数。
    pub const CHANNELS: usize = 4;

    /// 由原始 RGBA 字节构造缓冲，长度不匹配时返回 `InvalidBuffer`。
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RemovalError> {
        let expected = Self::expected_len(width, height).ok_or(RemovalError::InvalidBuffer {
            expected: usize::MAX,
            actual: data.len(),
        })?;

        if data.len() != expected {
            return Err(RemovalError::InvalidBuffer {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self { width, height, data })
    }

    /// 以单一颜色填充的缓冲。
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * Self::CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&[color.r, color.g, color.b, color.a]);
        }
        Self { width, height, data }
    }

    /// 按坐标生成像素。
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> Color,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize * Self::CHANNELS);
        for y in 0..height {
            for x in 0..width {
                let c = f(x, y);
                data.extend_from_slice(&[c.r, c.g, c.b, c.a]);
            }
        }
        Self { width, height, data }
    }

    fn expected_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(Self::CHANNELS))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 可变像素切片；长度固定，因此不变量不会被破坏。
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// 坐标对应的字节偏移；越界返回 `None`。
    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * Self::CHANNELS)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let i = self.index_of(x, y)?;
        let px = &self.data[i..i + Self::CHANNELS];
        Some(Color::rgba(px[0], px[1], px[2], px[3]))
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) -> bool {
        match self.index_of(x, y) {
            Some(i) => {
                self.data[i..i + Self::CHANNELS]
                    .copy_from_slice(&[color.r, color.g, color.b, color.a]);
                true
            }
            None => false,
        }
    }

    /// 转为 `image` crate 的 RGBA 图像，供具体渲染后端使用。
    pub fn into_rgba_image(self) -> Result<RgbaImage, RemovalError> {
        let expected = self.data.len();
        ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(self.width, self.height, self.data)
            .ok_or(RemovalError::InvalidBuffer { expected, actual: expected })
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}
