// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/model/tflite.rs - TensorFlow Lite 分类模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::Cursor;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use tract_tflite::prelude::*;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{InputDType, InputTensor, TensorData},
  model::{ClassLabels, Classifier, DEFAULT_INPUT_SIDE, OutputVector},
  url_file_path,
};

const TFLITE_IDENTIFIER: &[u8; 4] = b"TFL3";

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

#[derive(Error, Debug)]
pub enum TfliteClassifierError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("推理错误: {0}")]
  InferenceError(String),
  #[error("输入张量不匹配: {0}")]
  InputMismatch(String),
  #[error("模型已释放")]
  Released,
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl TfliteClassifierError {
  fn invalid(msg: &str, e: impl std::fmt::Display) -> Self {
    TfliteClassifierError::ModelInvalid(format!("{}: {}", msg, e))
  }
}

/// 已加载的 TFLite 分类模型句柄
///
/// 句柄只能通过 [`TfliteClassifier::open`] 创建，通过 [`Classifier::close`]
/// 或 drop 释放，释放后无法再使用。
pub struct TfliteClassifier {
  plan: Option<Plan>,
  side: u32,
  dtype: InputDType,
  labels: ClassLabels,
}

/// 将预处理后的输入转换为 `[1, side, side, 3]` 张量，边长与数据类型必须与模型一致
fn input_to_tensor(
  input: &InputTensor,
  side: u32,
  dtype: InputDType,
) -> Result<Tensor, TfliteClassifierError> {
  if input.side() != side {
    return Err(TfliteClassifierError::InputMismatch(format!(
      "期望边长 {}, 实际边长 {}",
      side,
      input.side()
    )));
  }

  let shape = [1, side as usize, side as usize, 3];
  let tensor = match (input.data(), dtype) {
    (TensorData::Float32(values), InputDType::Float32) => Tensor::from_shape(&shape, &values[..]),
    (TensorData::UInt8(values), InputDType::UInt8) => Tensor::from_shape(&shape, &values[..]),
    (_, expected) => {
      return Err(TfliteClassifierError::InputMismatch(format!(
        "期望 {:?}, 实际 {:?}",
        expected,
        input.dtype()
      )));
    }
  };

  tensor.map_err(|e| TfliteClassifierError::InputMismatch(e.to_string()))
}

/// 量化输出在转换为 f32 时反量化
fn output_to_scores(output: &Tensor) -> Result<Vec<f32>, TfliteClassifierError> {
  output
    .cast_to::<f32>()
    .and_then(|t| t.as_slice::<f32>().map(|s| s.to_vec()))
    .map_err(|e| TfliteClassifierError::InferenceError(e.to_string()))
}

/// TFLite 模型可能带有前缀（例如 Teachable Machine 导出），以 `TFL3` 标识定位模型起点
fn find_tflite_slice(buf: &[u8]) -> Option<&[u8]> {
  if buf.len() < 8 {
    return None;
  }
  (0..=buf.len() - 8)
    .find(|&i| &buf[i + 4..i + 8] == TFLITE_IDENTIFIER)
    .map(|i| &buf[i..])
}

impl TfliteClassifier {
  /// 从字节数据加载模型；`dtype` 为 `None` 时根据模型输入类型推断
  pub fn open(
    model_data: &[u8],
    side: u32,
    dtype: Option<InputDType>,
    labels: ClassLabels,
  ) -> Result<Self, TfliteClassifierError> {
    if model_data.is_empty() {
      return Err(TfliteClassifierError::ModelInvalid("模型数据为空".to_string()));
    }
    if side == 0 {
      return Err(TfliteClassifierError::ModelInvalid("输入边长不能为 0".to_string()));
    }
    if labels.is_empty() {
      return Err(TfliteClassifierError::ModelInvalid("类别标签为空".to_string()));
    }

    let model_bytes = find_tflite_slice(model_data)
      .ok_or_else(|| TfliteClassifierError::ModelInvalid("找不到 TFL3 标识".to_string()))?;
    debug!(
      "模型数据大小: {:.2} MB",
      model_bytes.len() as f64 / (1024.0 * 1024.0)
    );

    let mut cursor = Cursor::new(model_bytes);
    let model = tract_tflite::tflite()
      .model_for_read(&mut cursor)
      .map_err(|e| TfliteClassifierError::invalid("TFLite 解析失败", e))?;

    let inlet = model
      .input_outlets()
      .map_err(|e| TfliteClassifierError::invalid("无法获取模型输入", e))?[0];
    let declared = model
      .outlet_fact(inlet)
      .map_err(|e| TfliteClassifierError::invalid("无法获取输入类型", e))?
      .datum_type;
    debug!("模型输入类型: {:?}", declared);

    let dtype = match dtype {
      Some(dtype) => dtype,
      None if declared.unquantized() == DatumType::U8 => InputDType::UInt8,
      None => InputDType::Float32,
    };

    let datum_type = match dtype {
      InputDType::Float32 => f32::datum_type(),
      InputDType::UInt8 => u8::datum_type(),
    };
    let fact = TypedFact::dt_shape(datum_type, tvec!(1, side as usize, side as usize, 3));

    let plan = model
      .with_input_fact(0, fact)
      .and_then(|m| m.into_optimized())
      .and_then(|m| m.into_runnable())
      .map_err(|e| TfliteClassifierError::invalid("无法构建推理计划", e))?;

    info!(
      "模型加载完成: 输入 {}x{}x3 {:?}, 类别数 {}",
      side,
      side,
      dtype,
      labels.len()
    );

    Ok(TfliteClassifier {
      plan: Some(plan),
      side,
      dtype,
      labels,
    })
  }

  fn release(&mut self) {
    if self.plan.take().is_some() {
      info!("TFLite 模型已释放");
    }
  }
}

impl Drop for TfliteClassifier {
  fn drop(&mut self) {
    self.release();
  }
}

impl Classifier for TfliteClassifier {
  type Error = TfliteClassifierError;

  fn input_side(&self) -> u32 {
    self.side
  }

  fn input_dtype(&self) -> InputDType {
    self.dtype
  }

  fn labels(&self) -> &ClassLabels {
    &self.labels
  }

  fn run(&self, input: &InputTensor) -> Result<OutputVector, Self::Error> {
    let plan = self.plan.as_ref().ok_or(TfliteClassifierError::Released)?;

    debug!("设置模型输入");
    let tensor = input_to_tensor(input, self.side, self.dtype)?;

    debug!("执行模型推理");
    let outputs = plan
      .run(tvec!(tensor.into()))
      .map_err(|e| TfliteClassifierError::InferenceError(e.to_string()))?;

    let first = outputs.first().ok_or_else(|| {
      error!("模型没有输出");
      TfliteClassifierError::InferenceError("模型没有输出".to_string())
    })?;

    let scores = output_to_scores(first)?;
    debug!("模型原始输出: {:?}", scores);

    Ok(OutputVector::from(scores))
  }

  fn close(mut self) {
    self.release();
  }
}

pub struct TfliteClassifierBuilder {
  model_path: String,
  side: u32,
  dtype: Option<InputDType>,
  labels_path: Option<String>,
}

impl FromUrlWithScheme for TfliteClassifierBuilder {
  const SCHEME: &'static str = "tflite";
}

impl FromUrl for TfliteClassifierBuilder {
  type Error = TfliteClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(TfliteClassifierError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut builder = TfliteClassifierBuilder {
      model_path: url_file_path(url),
      side: DEFAULT_INPUT_SIDE,
      dtype: None,
      labels_path: None,
    };

    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "side" => {
          builder.side = value.parse().map_err(|_| {
            TfliteClassifierError::ModelPathError(format!("无效的输入边长: {}", value))
          })?;
        }
        "dtype" => {
          builder.dtype = Some(value.parse().map_err(TfliteClassifierError::ModelPathError)?);
        }
        "labels" => builder.labels_path = Some(value.into_owned()),
        other => warn!("忽略未知的模型参数: {}", other),
      }
    }

    Ok(builder)
  }
}

impl TfliteClassifierBuilder {
  pub fn side(mut self, side: u32) -> Self {
    self.side = side;
    self
  }

  pub fn dtype(mut self, dtype: InputDType) -> Self {
    self.dtype = Some(dtype);
    self
  }

  pub fn labels_path(mut self, path: impl Into<String>) -> Self {
    self.labels_path = Some(path.into());
    self
  }

  pub fn build(self) -> Result<TfliteClassifier, TfliteClassifierError> {
    let labels = match &self.labels_path {
      Some(path) => {
        info!("加载标签文件: {}", path);
        ClassLabels::parse(&std::fs::read_to_string(path)?)
          .map_err(|e| TfliteClassifierError::invalid(path, e))?
      }
      None => ClassLabels::default(),
    };

    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    TfliteClassifier::open(&model_data, self.side, self.dtype, labels)
  }
}
