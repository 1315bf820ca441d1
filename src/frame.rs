// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/frame.rs - 源图像与输入张量定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{DynamicImage, RgbaImage, imageops::FilterType};
use tracing::debug;

use crate::ClassifyError;

const RGB_CHANNELS: usize = 3;

/// 源图像，像素以 ARGB 打包为 32 位整数，按行优先存储
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
  width: u32,
  height: u32,
  pixels: Box<[u32]>,
}

pub fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
  ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

pub fn unpack_rgb(argb: u32) -> [u8; 3] {
  [
    ((argb >> 16) & 0xFF) as u8,
    ((argb >> 8) & 0xFF) as u8,
    (argb & 0xFF) as u8,
  ]
}

impl SourceImage {
  pub fn from_argb(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self, ClassifyError> {
    if pixels.len() != width as usize * height as usize {
      return Err(ClassifyError::InvalidImage(format!(
        "数据长度不匹配: 期望长度 {}, 实际长度 {}",
        width as usize * height as usize,
        pixels.len()
      )));
    }

    Ok(Self {
      width,
      height,
      pixels: pixels.into_boxed_slice(),
    })
  }

  /// 单色图像，主要用于测试与占位
  pub fn filled(width: u32, height: u32, argb: u32) -> Self {
    let pixels = vec![argb; width as usize * height as usize].into_boxed_slice();
    Self {
      width,
      height,
      pixels,
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn pixels(&self) -> &[u32] {
    &self.pixels
  }

  pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
    if x >= self.width || y >= self.height {
      return None;
    }
    self
      .pixels
      .get(y as usize * self.width as usize + x as usize)
      .copied()
  }

  pub fn to_rgba_image(&self) -> RgbaImage {
    RgbaImage::from_fn(self.width, self.height, |x, y| {
      let argb = self.pixels[y as usize * self.width as usize + x as usize];
      let [r, g, b] = unpack_rgb(argb);
      image::Rgba([r, g, b, (argb >> 24) as u8])
    })
  }

  /// 居中裁剪为正方形（边长取宽高较小者），再以最近邻缩放到 `side x side`
  pub fn square_thumbnail(&self, side: u32) -> Result<Self, ClassifyError> {
    if self.width == 0 || self.height == 0 || side == 0 {
      return Err(ClassifyError::InvalidImage(format!(
        "无法从 {}x{} 图像生成 {}x{} 缩略图",
        self.width, self.height, side, side
      )));
    }

    let dimension = self.width.min(self.height);
    let x = (self.width - dimension) / 2;
    let y = (self.height - dimension) / 2;
    debug!(
      "裁剪 {}x{} -> {}x{} (偏移 {}, {}), 缩放到 {}x{}",
      self.width, self.height, dimension, dimension, x, y, side, side
    );

    let rgba = self.to_rgba_image();
    let cropped = image::imageops::crop_imm(&rgba, x, y, dimension, dimension).to_image();
    let scaled = if dimension == side {
      cropped
    } else {
      image::imageops::resize(&cropped, side, side, FilterType::Nearest)
    };

    Ok(SourceImage::from(scaled))
  }
}

impl From<RgbaImage> for SourceImage {
  fn from(image: RgbaImage) -> Self {
    let (width, height) = image.dimensions();
    let pixels = image
      .pixels()
      .map(|p| pack_argb(p[3], p[0], p[1], p[2]))
      .collect::<Vec<_>>()
      .into_boxed_slice();
    Self {
      width,
      height,
      pixels,
    }
  }
}

impl From<DynamicImage> for SourceImage {
  fn from(image: DynamicImage) -> Self {
    SourceImage::from(image.into_rgba8())
  }
}

/// 模型输入的数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputDType {
  /// 归一化到 [0.0, 1.0] 的 32 位浮点
  #[default]
  Float32,
  /// 量化模型使用的原始 8 位通道值
  UInt8,
}

impl InputDType {
  pub fn bytes_per_value(&self) -> usize {
    match self {
      InputDType::Float32 => std::mem::size_of::<f32>(),
      InputDType::UInt8 => std::mem::size_of::<u8>(),
    }
  }
}

impl std::str::FromStr for InputDType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "f32" | "float32" => Ok(InputDType::Float32),
      "u8" | "uint8" => Ok(InputDType::UInt8),
      other => Err(format!("未知的输入数据类型: {}", other)),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
  Float32(Box<[f32]>),
  UInt8(Box<[u8]>),
}

/// NHWC 排列（批大小为 1）的 RGB 输入张量，长度恒为 `side * side * 3`
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
  side: u32,
  data: TensorData,
}

impl InputTensor {
  pub fn side(&self) -> u32 {
    self.side
  }

  pub fn dtype(&self) -> InputDType {
    match self.data {
      TensorData::Float32(_) => InputDType::Float32,
      TensorData::UInt8(_) => InputDType::UInt8,
    }
  }

  pub fn data(&self) -> &TensorData {
    &self.data
  }

  pub fn len(&self) -> usize {
    match &self.data {
      TensorData::Float32(v) => v.len(),
      TensorData::UInt8(v) => v.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn as_f32(&self) -> Option<&[f32]> {
    match &self.data {
      TensorData::Float32(v) => Some(&v[..]),
      TensorData::UInt8(_) => None,
    }
  }

  pub fn as_u8(&self) -> Option<&[u8]> {
    match &self.data {
      TensorData::UInt8(v) => Some(&v[..]),
      TensorData::Float32(_) => None,
    }
  }

  /// 按本机字节序序列化，供跨 FFI 边界传给推理库
  pub fn to_ne_bytes(&self) -> Vec<u8> {
    match &self.data {
      TensorData::Float32(v) => v.iter().flat_map(|f| f.to_ne_bytes()).collect(),
      TensorData::UInt8(v) => v.to_vec(),
    }
  }
}

/// 将 `side x side` 的源图像转换为模型输入张量
pub fn preprocess(
  image: &SourceImage,
  side: u32,
  dtype: InputDType,
) -> Result<InputTensor, ClassifyError> {
  if image.width() != side || image.height() != side {
    return Err(ClassifyError::ImageSize {
      side,
      width: image.width(),
      height: image.height(),
    });
  }

  let len = side as usize * side as usize * RGB_CHANNELS;
  let data = match dtype {
    InputDType::Float32 => {
      let mut values = Vec::with_capacity(len);
      for &argb in image.pixels() {
        for channel in unpack_rgb(argb) {
          values.push(channel as f32 / 255.0);
        }
      }
      TensorData::Float32(values.into_boxed_slice())
    }
    InputDType::UInt8 => {
      let mut values = Vec::with_capacity(len);
      for &argb in image.pixels() {
        values.extend_from_slice(&unpack_rgb(argb));
      }
      TensorData::UInt8(values.into_boxed_slice())
    }
  };

  Ok(InputTensor { side, data })
}
