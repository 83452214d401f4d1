//! 位图数据
//!
//! 纹理上传使用 B8G8R8A8 字节序。内置位图由 ARGB 整数写成小端字节得到，
//! 文件位图通过 `image` 解码后转换为同样的字节序。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::{DataError, Result};
use crate::math::Color;

/// 内置位图的宽度
const HARD_CODED_WIDTH: u32 = 8;

/// CPU 侧的 BGRA8 位图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// 每像素 4 字节，B G R A
    pub bytes: Vec<u8>,
}

impl Bitmap {
    /// 由 0xAARRGGBB 像素创建，高度由像素数推出
    pub fn from_argb(pixels: &[u32], width: u32) -> Result<Self> {
        if width == 0 || pixels.is_empty() || pixels.len() % width as usize != 0 {
            return Err(DataError::InvalidBitmap(format!(
                "{} pixels cannot form rows of width {}",
                pixels.len(),
                width
            ))
            .into());
        }

        let bytes = pixels.iter().flat_map(|p| p.to_le_bytes()).collect();

        Ok(Self {
            width,
            height: pixels.len() as u32 / width,
            bytes,
        })
    }

    /// 每行字节数
    pub fn row_pitch(&self) -> u32 {
        self.width * 4
    }

    /// 第 `row` 行的字节，越界时为 `None`
    pub fn row(&self, row: u32) -> Option<&[u8]> {
        let pitch = self.row_pitch() as usize;
        let start = row as usize * pitch;
        self.bytes.get(start..start + pitch)
    }
}

/// 内置位图
///
/// - 1：红、灰、浅灰、黑、白、紫、棕、军蓝
/// - 2：红、绿、蓝，三个 alpha 为 0 的红绿蓝，棕、军蓝
pub fn hard_coded_bitmap(kind: u32) -> Result<Bitmap> {
    let argb = |c: Color| c.to_argb();

    let pixels: Vec<u32> = match kind {
        1 => vec![
            argb(Color::RED),
            argb(Color::GRAY),
            argb(Color::LIGHT_GRAY),
            argb(Color::BLACK),
            argb(Color::WHITE),
            argb(Color::PURPLE),
            argb(Color::BROWN),
            argb(Color::CADET_BLUE),
        ],
        2 => vec![
            argb(Color::RED),
            argb(Color::LIME),
            argb(Color::BLUE),
            0x00FF0000,
            0x0000FF00,
            0x000000FF,
            argb(Color::BROWN),
            argb(Color::CADET_BLUE),
        ],
        other => return Err(DataError::UnknownBitmap(other).into()),
    };

    Bitmap::from_argb(&pixels, HARD_CODED_WIDTH)
}

/// 从图片文件加载
///
/// 只接受带 alpha 通道的 8 位 RGBA 图片。
pub fn bitmap_from_file<P: AsRef<Path>>(path: P) -> Result<Bitmap> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DataError::InvalidBitmap(format!("File not found: {}", path.display())).into());
    }

    let image = image::open(path)
        .map_err(|e| DataError::InvalidBitmap(format!("Failed to decode {}: {}", path.display(), e)))?;

    let rgba = match image {
        image::DynamicImage::ImageRgba8(rgba) => rgba,
        other => {
            return Err(DataError::UnsupportedPixelFormat(format!(
                "{:?} in {} (expected 8-bit RGBA)",
                other.color(),
                path.display()
            ))
            .into())
        }
    };

    let (width, height) = rgba.dimensions();
    let mut bytes = rgba.into_raw();
    for px in bytes.chunks_exact_mut(4) {
        px.swap(0, 2);
    }

    tracing::debug!(width, height, path = %path.display(), "Bitmap loaded");

    Ok(Bitmap { width, height, bytes })
}

/// 场景文件中引用位图的方式
///
/// `{ kind = 2 }` 表示内置位图，`{ file = "texture.png" }` 表示图片文件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BitmapSource {
    HardCoded { kind: u32 },
    File { file: PathBuf },
}

impl BitmapSource {
    pub fn load(&self) -> Result<Bitmap> {
        match self {
            BitmapSource::HardCoded { kind } => hard_coded_bitmap(*kind),
            BitmapSource::File { file } => bitmap_from_file(file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_coded_bitmap_bgra() {
        let bmp = hard_coded_bitmap(2).unwrap();
        assert_eq!((bmp.width, bmp.height), (8, 1));
        assert_eq!(bmp.bytes.len(), 32);

        // 红色 0xFFFF0000 -> B G R A
        assert_eq!(&bmp.bytes[0..4], &[0x00, 0x00, 0xFF, 0xFF]);
        // 0x0000FF00 -> 绿色且 alpha 为 0
        assert_eq!(&bmp.bytes[16..20], &[0x00, 0xFF, 0x00, 0x00]);
        assert_eq!(bmp.row(0).map(<[u8]>::len), Some(32));
        assert_eq!(bmp.row(1), None);
    }

    #[test]
    fn test_hard_coded_bitmap_1() {
        let bmp = hard_coded_bitmap(1).unwrap();
        // 棕色 0xFFA52A2A
        assert_eq!(&bmp.bytes[24..28], &[0x2A, 0x2A, 0xA5, 0xFF]);
        // 军蓝 0xFF5F9EA0
        assert_eq!(&bmp.bytes[28..32], &[0xA0, 0x9E, 0x5F, 0xFF]);
    }

    #[test]
    fn test_unknown_bitmap() {
        assert!(matches!(
            hard_coded_bitmap(7),
            Err(crate::core::SandboxError::Data(DataError::UnknownBitmap(7)))
        ));
    }

    #[test]
    fn test_invalid_width() {
        assert!(Bitmap::from_argb(&[0; 7], 8).is_err());
        assert!(Bitmap::from_argb(&[0; 16], 8).is_ok());
    }

    #[test]
    fn test_bitmap_from_file() {
        let dir = std::env::temp_dir();

        let rgba_path = dir.join("d3d_sandbox_test_rgba.png");
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([10, 20, 30, 255]));
        img.save(&rgba_path).unwrap();

        let bmp = bitmap_from_file(&rgba_path).unwrap();
        assert_eq!((bmp.width, bmp.height), (2, 1));
        assert_eq!(&bmp.bytes[0..4], &[30, 20, 10, 255]);

        let rgb_path = dir.join("d3d_sandbox_test_rgb.png");
        image::RgbImage::new(2, 1).save(&rgb_path).unwrap();
        assert!(matches!(
            bitmap_from_file(&rgb_path),
            Err(crate::core::SandboxError::Data(DataError::UnsupportedPixelFormat(_)))
        ));

        assert!(bitmap_from_file(dir.join("d3d_sandbox_missing.png")).is_err());

        let _ = std::fs::remove_file(rgba_path);
        let _ = std::fs::remove_file(rgb_path);
    }

    #[test]
    fn test_bitmap_source_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            bitmap: BitmapSource,
        }

        let w: Wrapper = toml::from_str("bitmap = { kind = 2 }").unwrap();
        assert_eq!(w.bitmap, BitmapSource::HardCoded { kind: 2 });

        let w: Wrapper = toml::from_str(r#"bitmap = { file = "a.png" }"#).unwrap();
        assert_eq!(w.bitmap, BitmapSource::File { file: PathBuf::from("a.png") });
    }
}
