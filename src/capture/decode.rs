//! Conversion of raw driver buffers into RGB frames.

use super::CameraError;
use image::{ImageFormat, Rgb, RgbImage};

/// Pixel layouts the capture path can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// YUV 4:2:2 packed as `Y0 U Y1 V`.
    Yuyv,
    /// Motion JPEG, one JPEG image per buffer.
    Mjpeg,
    /// Packed 24-bit RGB.
    Rgb3,
}

impl PixelLayout {
    /// Maps a V4L2 FourCC code to a layout.
    pub fn from_fourcc(code: &[u8; 4]) -> Result<Self, CameraError> {
        match code {
            b"YUYV" => Ok(Self::Yuyv),
            b"MJPG" => Ok(Self::Mjpeg),
            b"RGB3" => Ok(Self::Rgb3),
            other => Err(CameraError::UnsupportedFormat(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

/// Decodes `buf` into an RGB image of `width` x `height`.
///
/// `stride` is the number of bytes per line reported by the driver; zero
/// means tightly packed.
pub fn decode(
    layout: PixelLayout,
    buf: &[u8],
    width: u32,
    height: u32,
    stride: u32,
) -> Result<RgbImage, CameraError> {
    match layout {
        PixelLayout::Yuyv => decode_yuyv(buf, width, height, stride),
        PixelLayout::Mjpeg => image::load_from_memory_with_format(buf, ImageFormat::Jpeg)
            .map(|img| img.to_rgb8())
            .map_err(|e| CameraError::CaptureFailed(format!("bad MJPG frame: {e}"))),
        PixelLayout::Rgb3 => decode_rgb3(buf, width, height, stride),
    }
}

fn short_buffer(len: usize, width: u32, height: u32) -> CameraError {
    CameraError::CaptureFailed(format!("{len} byte buffer is too short for {width}x{height}"))
}

fn decode_yuyv(buf: &[u8], width: u32, height: u32, stride: u32) -> Result<RgbImage, CameraError> {
    let stride = (if stride == 0 { width * 2 } else { stride }) as usize;
    if width % 2 != 0 || buf.len() < stride * height as usize || stride < width as usize * 2 {
        return Err(short_buffer(buf.len(), width, height));
    }

    Ok(RgbImage::from_fn(width, height, |x, y| {
        let pair = y as usize * stride + (x as usize & !1) * 2;
        let luma = if x % 2 == 0 { buf[pair] } else { buf[pair + 2] };
        let (r, g, b) = yuv_to_rgb(luma, buf[pair + 1], buf[pair + 3]);
        Rgb([r, g, b])
    }))
}

fn decode_rgb3(buf: &[u8], width: u32, height: u32, stride: u32) -> Result<RgbImage, CameraError> {
    let row = width as usize * 3;
    let stride = if stride == 0 { row } else { stride as usize };
    if buf.len() < stride * height as usize || stride < row {
        return Err(short_buffer(buf.len(), width, height));
    }

    let mut pixels = Vec::with_capacity(row * height as usize);
    for line in buf.chunks(stride).take(height as usize) {
        pixels.extend_from_slice(&line[..row]);
    }
    RgbImage::from_raw(width, height, pixels).ok_or_else(|| short_buffer(buf.len(), width, height))
}

/// ITU-R BT.601 YUV to RGB.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = f32::from(y);
    let u = f32::from(u) - 128.0;
    let v = f32::from(v) - 128.0;

    let r = 1.402f32.mul_add(v, y);
    let g = 0.714_14f32.mul_add(-v, 0.344_14f32.mul_add(-u, y));
    let b = 1.772f32.mul_add(u, y);

    let clamp = |val: f32| val.clamp(0.0, 255.0) as u8;
    (clamp(r), clamp(g), clamp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_mapping() {
        assert_eq!(PixelLayout::from_fourcc(b"YUYV").unwrap(), PixelLayout::Yuyv);
        assert_eq!(PixelLayout::from_fourcc(b"MJPG").unwrap(), PixelLayout::Mjpeg);
        assert!(matches!(
            PixelLayout::from_fourcc(b"NV12"),
            Err(CameraError::UnsupportedFormat(f)) if f == "NV12"
        ));
    }

    #[test]
    fn test_neutral_yuyv_is_gray() {
        // Y=100, U=V=128 -> gray 100
        let buf: Vec<u8> = [100u8, 128, 100, 128].repeat(4);
        let image = decode(PixelLayout::Yuyv, &buf, 4, 2, 0).unwrap();
        assert!(image.pixels().all(|p| *p == Rgb([100, 100, 100])));
    }

    #[test]
    fn test_yuyv_respects_stride() {
        // 2x2 image with 2 bytes of padding per line
        let buf = vec![
            10, 128, 20, 128, 0, 0, //
            30, 128, 40, 128, 0, 0,
        ];
        let image = decode(PixelLayout::Yuyv, &buf, 2, 2, 6).unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgb([10, 10, 10]));
        assert_eq!(image.get_pixel(1, 0), &Rgb([20, 20, 20]));
        assert_eq!(image.get_pixel(0, 1), &Rgb([30, 30, 30]));
        assert_eq!(image.get_pixel(1, 1), &Rgb([40, 40, 40]));
    }

    #[test]
    fn test_short_buffer_rejected() {
        assert!(matches!(
            decode(PixelLayout::Yuyv, &[0u8; 10], 4, 4, 0),
            Err(CameraError::CaptureFailed(_))
        ));
        assert!(matches!(
            decode(PixelLayout::Rgb3, &[0u8; 10], 4, 4, 0),
            Err(CameraError::CaptureFailed(_))
        ));
    }

    #[test]
    fn test_rgb3_drops_padding() {
        let buf = vec![1, 2, 3, 4, 5, 6, 9, 9, 7, 8, 9, 10, 11, 12, 9, 9];
        let image = decode(PixelLayout::Rgb3, &buf, 2, 2, 8).unwrap();
        assert_eq!(image.get_pixel(1, 0), &Rgb([4, 5, 6]));
        assert_eq!(image.get_pixel(0, 1), &Rgb([7, 8, 9]));
    }

    #[test]
    fn test_garbage_mjpeg_fails() {
        assert!(matches!(
            decode(PixelLayout::Mjpeg, b"not a jpeg", 2, 2, 0),
            Err(CameraError::CaptureFailed(_))
        ));
    }
}
