// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/model.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use serde::Serialize;
use tracing::debug;

use crate::{
  ClassifyError,
  frame::{InputDType, InputTensor},
};

/// 默认类别，顺序必须与模型训练时的输出顺序一致
pub const DEFAULT_LABELS: [&str; 3] = ["Audi", "Rolls Royce", "Toyota Inova"];

/// 默认输入边长
pub const DEFAULT_INPUT_SIDE: u32 = 224;

pub trait Classifier {
  type Error: std::error::Error + Send + Sync + 'static;

  fn input_side(&self) -> u32;
  fn input_dtype(&self) -> InputDType;
  fn labels(&self) -> &ClassLabels;
  fn run(&self, input: &InputTensor) -> Result<OutputVector, Self::Error>;

  /// 释放模型持有的资源，默认直接 drop
  fn close(self)
  where
    Self: Sized,
  {
    drop(self);
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabels {
  names: Box<[String]>,
}

impl Default for ClassLabels {
  fn default() -> Self {
    Self {
      names: DEFAULT_LABELS.iter().map(|name| name.to_string()).collect(),
    }
  }
}

impl ClassLabels {
  /// 标签列表不能为空
  pub fn new<I, S>(names: I) -> Result<Self, ClassifyError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let names: Box<[String]> = names.into_iter().map(Into::into).collect();
    if names.is_empty() {
      return Err(ClassifyError::EmptyLabels);
    }
    Ok(Self { names })
  }

  /// 解析标签文件：每行一个标签，忽略空行；
  /// 兼容 Teachable Machine 导出的 `0 Audi` 形式，去掉行首序号
  pub fn parse(text: &str) -> Result<Self, ClassifyError> {
    let names = text
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(|line| match line.split_once(char::is_whitespace) {
        Some((index, rest)) if index.chars().all(|c| c.is_ascii_digit()) && !rest.trim().is_empty() => {
          rest.trim().to_string()
        }
        _ => line.to_string(),
      });
    Self::new(names)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&str> {
    self.names.get(index).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }
}

/// 模型原始输出，每个类别一个置信度
#[derive(Debug, Clone, PartialEq)]
pub struct OutputVector(Box<[f32]>);

impl From<Vec<f32>> for OutputVector {
  fn from(scores: Vec<f32>) -> Self {
    Self(scores.into_boxed_slice())
  }
}

impl OutputVector {
  pub fn as_slice(&self) -> &[f32] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
  pub label: String,
  pub confidence: f32,
}

impl ClassScore {
  pub fn percentage(&self) -> f32 {
    self.confidence * 100.0
  }
}

impl std::fmt::Display for ClassScore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    // `{:.1}` 对恰好一半的值取偶，这里按四舍五入（远离零）显示
    let rounded = (f64::from(self.percentage()) * 10.0).round() / 10.0;
    write!(f, "{}: {:.1}%", self.label, rounded)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
  index: usize,
  label: String,
  scores: Box<[ClassScore]>,
}

impl ClassificationResult {
  pub fn index(&self) -> usize {
    self.index
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn confidence(&self) -> f32 {
    self.scores[self.index].confidence
  }

  /// 按标签原始顺序排列（不按置信度排序）
  pub fn scores(&self) -> &[ClassScore] {
    &self.scores
  }

  pub fn confidence_text(&self) -> String {
    self
      .scores
      .iter()
      .map(ClassScore::to_string)
      .collect::<Vec<_>>()
      .join("\n")
  }
}

/// 稳定的 argmax：相同最大值取最靠前的下标，NaN 不参与比较
fn argmax(values: &[f32]) -> Option<usize> {
  let mut best: Option<(usize, f32)> = None;
  for (i, &v) in values.iter().enumerate() {
    if v.is_nan() {
      continue;
    }
    match best {
      Some((_, max)) if v <= max => {}
      _ => best = Some((i, v)),
    }
  }
  best.map(|(i, _)| i)
}

pub fn interpret(
  output: &OutputVector,
  labels: &ClassLabels,
) -> Result<ClassificationResult, ClassifyError> {
  if output.len() != labels.len() || output.is_empty() {
    return Err(ClassifyError::ContractMismatch {
      expected: labels.len(),
      actual: output.len(),
    });
  }

  let index = argmax(output.as_slice()).ok_or_else(|| {
    ClassifyError::Inference("模型输出全部为 NaN".to_string())
  })?;

  let scores: Box<[ClassScore]> = labels
    .iter()
    .zip(output.as_slice())
    .map(|(label, &confidence)| ClassScore {
      label: label.to_string(),
      confidence,
    })
    .collect();

  for score in scores.iter() {
    debug!("{} 置信度: {}", score.label, score.confidence);
  }

  Ok(ClassificationResult {
    index,
    label: scores[index].label.clone(),
    scores,
  })
}

#[cfg(feature = "model_tflite")]
mod tflite;
#[cfg(feature = "model_tflite")]
pub use self::tflite::{TfliteClassifier, TfliteClassifierBuilder, TfliteClassifierError};

#[cfg(test)]
mod tests {
  use super::*;

  fn labels() -> ClassLabels {
    ClassLabels::default()
  }

  fn out(scores: &[f32]) -> OutputVector {
    OutputVector::from(scores.to_vec())
  }

  #[test]
  fn picks_maximum() {
    let result = interpret(&out(&[0.1, 0.7, 0.2]), &labels()).unwrap();
    assert_eq!(result.index(), 1);
    assert_eq!(result.label(), "Rolls Royce");
    assert_eq!(result.confidence(), 0.7);
  }

  #[test]
  fn tie_goes_to_first() {
    let result = interpret(&out(&[0.5, 0.5, 0.2]), &labels()).unwrap();
    assert_eq!(result.index(), 0);
    assert_eq!(result.label(), "Audi");
  }

  #[test]
  fn nan_never_wins() {
    let result = interpret(&out(&[f32::NAN, 0.1, 0.3]), &labels()).unwrap();
    assert_eq!(result.index(), 2);

    let all_nan = interpret(&out(&[f32::NAN; 3]), &labels());
    assert!(matches!(all_nan, Err(ClassifyError::Inference(_))));
  }

  #[test]
  fn length_mismatch_fails() {
    let err = interpret(&out(&[0.1, 0.9]), &labels()).unwrap_err();
    assert_eq!(
      err,
      ClassifyError::ContractMismatch {
        expected: 3,
        actual: 2
      }
    );

    let empty = interpret(&out(&[]), &labels());
    assert!(matches!(empty, Err(ClassifyError::ContractMismatch { .. })));
  }

  #[test]
  fn interpret_is_idempotent() {
    let output = out(&[0.3, 0.3, 0.4]);
    assert_eq!(
      interpret(&output, &labels()).unwrap(),
      interpret(&output, &labels()).unwrap()
    );
  }

  #[test]
  fn percentage_has_one_decimal() {
    let score = ClassScore {
      label: "Audi".to_string(),
      confidence: 0.8567,
    };
    assert_eq!(score.to_string(), "Audi: 85.7%");
  }

  #[test]
  fn percentage_rounds_half_up() {
    let result = interpret(&out(&[0.1225, 0.0025, 0.875]), &labels()).unwrap();
    assert_eq!(
      result.confidence_text(),
      "Audi: 12.3%\nRolls Royce: 0.3%\nToyota Inova: 87.5%"
    );
  }

  #[test]
  fn scores_keep_label_order() {
    let result = interpret(&out(&[0.1, 0.7, 0.2]), &labels()).unwrap();
    assert_eq!(
      result.confidence_text(),
      "Audi: 10.0%\nRolls Royce: 70.0%\nToyota Inova: 20.0%"
    );
  }

  #[test]
  fn parse_label_file() {
    let labels = ClassLabels::parse("0 Audi\n1 Rolls Royce\n\n  Toyota Inova  \n42\n").unwrap();
    assert_eq!(
      labels.iter().collect::<Vec<_>>(),
      vec!["Audi", "Rolls Royce", "Toyota Inova", "42"]
    );
  }

  #[test]
  fn empty_labels_are_rejected() {
    assert_eq!(ClassLabels::parse("\n\n  \n"), Err(ClassifyError::EmptyLabels));
    assert_eq!(
      ClassLabels::new(Vec::<String>::new()),
      Err(ClassifyError::EmptyLabels)
    );
    assert_eq!(ClassLabels::new(["Audi"]).unwrap().len(), 1);
  }
}
