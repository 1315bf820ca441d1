// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/error.rs - 分类流程错误定义
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

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
  #[error("classifier is not initialized")]
  UninitializedClassifier,
  #[error("no input image provided")]
  MissingInput,
  #[error("image must be {side}x{side}, got {width}x{height}")]
  ImageSize { side: u32, width: u32, height: u32 },
  #[error("invalid image: {0}")]
  InvalidImage(String),
  #[error("no class labels configured")]
  EmptyLabels,
  #[error("model output has {actual} scores but {expected} labels are configured")]
  ContractMismatch { expected: usize, actual: usize },
  #[error("inference failed: {0}")]
  Inference(String),
}
