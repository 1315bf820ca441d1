// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use clap::Parser;
use url::Url;

/// Jianbie 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// TFLite 模型路径
  /// 例如: tflite:///path/model.tflite?side=224&dtype=f32&labels=/path/labels.txt
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源
  /// 支持格式:
  /// - 单张图片: image:///path/photo.jpg
  /// - 图片目录: folder:///path/photos
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出方式
  /// 支持格式:
  /// - 控制台: console:
  /// - JSON 记录目录: json:///path/records
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,

  /// 逐张处理全部输入图像，而不是只处理第一张
  #[arg(long)]
  pub continuous: bool,

  /// 最大处理图像数（仅在 --continuous 时有效，0 表示无限制）
  #[arg(long, default_value = "0", value_name = "COUNT")]
  pub max_frames: usize,
}
