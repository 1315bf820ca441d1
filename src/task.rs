// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/task.rs - 分类任务
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

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
  ClassifyError,
  frame::{SourceImage, preprocess},
  model::{ClassificationResult, Classifier, interpret},
  output::Render,
};

pub const ERROR_TITLE: &str = "Error";

/// 一次分类的最终结果，失败时携带诊断信息
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassificationOutcome {
  Classified(ClassificationResult),
  Failed { message: String },
}

impl ClassificationOutcome {
  pub fn is_classified(&self) -> bool {
    matches!(self, ClassificationOutcome::Classified(_))
  }

  pub fn result(&self) -> Option<&ClassificationResult> {
    match self {
      ClassificationOutcome::Classified(result) => Some(result),
      ClassificationOutcome::Failed { .. } => None,
    }
  }

  /// 结果标签区域显示的内容
  pub fn title(&self) -> &str {
    match self {
      ClassificationOutcome::Classified(result) => result.label(),
      ClassificationOutcome::Failed { .. } => ERROR_TITLE,
    }
  }

  /// 置信度区域显示的内容
  pub fn detail(&self) -> String {
    match self {
      ClassificationOutcome::Classified(result) => result.confidence_text(),
      ClassificationOutcome::Failed { message } => format!("Classification failed: {}", message),
    }
  }
}

impl From<Result<ClassificationResult, ClassifyError>> for ClassificationOutcome {
  fn from(result: Result<ClassificationResult, ClassifyError>) -> Self {
    match result {
      Ok(result) => ClassificationOutcome::Classified(result),
      Err(e) => ClassificationOutcome::Failed {
        message: e.to_string(),
      },
    }
  }
}

/// 持有分类器句柄的会话，负责句柄生命周期与分类入口
pub struct ClassifySession<C: Classifier> {
  classifier: Option<C>,
}

impl<C: Classifier> ClassifySession<C> {
  pub fn new(classifier: C) -> Self {
    Self {
      classifier: Some(classifier),
    }
  }

  /// 没有可用分类器的会话，分类时返回 `UninitializedClassifier`
  pub fn uninitialized() -> Self {
    Self { classifier: None }
  }

  /// 模型加载失败时记录错误并得到未初始化的会话
  pub fn from_load<E: std::fmt::Display>(loaded: Result<C, E>) -> Self {
    match loaded {
      Ok(classifier) => Self::new(classifier),
      Err(e) => {
        error!("模型加载失败: {}", e);
        Self::uninitialized()
      }
    }
  }

  pub fn is_ready(&self) -> bool {
    self.classifier.is_some()
  }

  pub fn classifier(&self) -> Option<&C> {
    self.classifier.as_ref()
  }

  pub fn try_classify(
    &self,
    image: Option<&SourceImage>,
  ) -> Result<ClassificationResult, ClassifyError> {
    let classifier = self
      .classifier
      .as_ref()
      .ok_or(ClassifyError::UninitializedClassifier)?;
    let image = image.ok_or(ClassifyError::MissingInput)?;

    debug!(
      "接收分类图像: {}x{}",
      image.width(),
      image.height()
    );
    let tensor = preprocess(image, classifier.input_side(), classifier.input_dtype())?;
    let output = classifier
      .run(&tensor)
      .map_err(|e| ClassifyError::Inference(e.to_string()))?;
    debug!("模型原始输出: {:?}", output.as_slice());

    interpret(&output, classifier.labels())
  }

  /// 分类入口：所有错误在此处转换为失败结果，不重试
  pub fn classify(&self, image: Option<&SourceImage>) -> ClassificationOutcome {
    let outcome = ClassificationOutcome::from(self.try_classify(image));
    match &outcome {
      ClassificationOutcome::Classified(result) => {
        info!("分类结果: {} ({:.1}%)", result.label(), result.confidence() * 100.0)
      }
      ClassificationOutcome::Failed { message } => error!("分类失败: {}", message),
    }
    outcome
  }

  /// 释放分类器，返回本次调用是否真正释放了句柄
  pub fn close(&mut self) -> bool {
    match self.classifier.take() {
      Some(classifier) => {
        classifier.close();
        info!("分类器已关闭");
        true
      }
      None => false,
    }
  }
}

impl<C: Classifier> Drop for ClassifySession<C> {
  fn drop(&mut self) {
    self.close();
  }
}

pub trait Task<I, C: Classifier, O>: Sized {
  type Error;
  fn run_task(self, input: I, session: ClassifySession<C>, output: O) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<I, C, O> Task<I, C, O> for OneShotTask
where
  I: Iterator<Item = SourceImage>,
  C: Classifier,
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut session: ClassifySession<C>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let image = input.next();
    if image.is_none() {
      warn!("没有输入图像");
    }

    let now = std::time::Instant::now();
    let outcome = session.classify(image.as_ref());
    info!("分类完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&outcome)?;

    session.close();
    Ok(())
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  interrupt: bool,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 安装 Ctrl-C 处理器，收到信号后结束循环（每个进程只能安装一次）
  pub fn with_interrupt(mut self, interrupt: bool) -> Self {
    self.interrupt = interrupt;
    self
  }
}

impl<I, C, O> Task<I, C, O> for ContinuousTask
where
  I: Iterator<Item = SourceImage>,
  C: Classifier,
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, mut session: ClassifySession<C>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let stop = Arc::new(AtomicBool::new(false));
    if self.interrupt {
      let stop = stop.clone();
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        stop.store(true, Ordering::SeqCst);
      })?;
    }

    let mut frame_index = 0usize;
    let mut classified = 0usize;
    for image in input {
      frame_index += 1;
      info!("处理第 {} 张图像", frame_index);
      let now = std::time::Instant::now();
      let outcome = session.classify(Some(&image));
      if outcome.is_classified() {
        classified += 1;
      }
      output.render_result(&outcome)?;
      info!("分类完成，耗时: {:.2?}", now.elapsed());

      if self.frame_number.map(|n| frame_index >= n).unwrap_or(false) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if stop.load(Ordering::SeqCst) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    session.close();
    info!("任务完成: 共 {} 张, 成功 {} 张", frame_index, classified);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    frame::{InputDType, InputTensor},
    model::{ClassLabels, OutputVector},
  };

  struct FixedClassifier {
    scores: Vec<f32>,
    labels: ClassLabels,
  }

  impl Classifier for FixedClassifier {
    type Error = ClassifyError;

    fn input_side(&self) -> u32 {
      2
    }

    fn input_dtype(&self) -> InputDType {
      InputDType::Float32
    }

    fn labels(&self) -> &ClassLabels {
      &self.labels
    }

    fn run(&self, input: &InputTensor) -> Result<OutputVector, Self::Error> {
      assert_eq!(input.len(), 12);
      Ok(OutputVector::from(self.scores.clone()))
    }
  }

  fn session(scores: Vec<f32>) -> ClassifySession<FixedClassifier> {
    ClassifySession::new(FixedClassifier {
      scores,
      labels: ClassLabels::default(),
    })
  }

  #[test]
  fn uninitialized_is_reported() {
    let session = ClassifySession::<FixedClassifier>::uninitialized();
    let image = SourceImage::filled(2, 2, 0);
    assert_eq!(
      session.try_classify(Some(&image)),
      Err(ClassifyError::UninitializedClassifier)
    );
  }

  #[test]
  fn missing_image_is_reported() {
    let outcome = session(vec![0.1, 0.7, 0.2]).classify(None);
    assert_eq!(outcome.title(), ERROR_TITLE);
    assert_eq!(
      outcome.detail(),
      format!("Classification failed: {}", ClassifyError::MissingInput)
    );
  }

  #[test]
  fn mismatch_becomes_failure() {
    let image = SourceImage::filled(2, 2, 0);
    let outcome = session(vec![0.1, 0.9]).classify(Some(&image));
    assert!(!outcome.is_classified());
    assert!(outcome.detail().contains("2 scores but 3 labels"));
  }

  #[test]
  fn wrong_image_size_becomes_failure() {
    let image = SourceImage::filled(3, 3, 0);
    let outcome = session(vec![0.1, 0.7, 0.2]).classify(Some(&image));
    assert_eq!(outcome.title(), ERROR_TITLE);
  }

  #[test]
  fn close_releases_once() {
    let mut session = session(vec![0.1, 0.7, 0.2]);
    assert!(session.is_ready());
    assert!(session.close());
    assert!(!session.close());

    let image = SourceImage::filled(2, 2, 0);
    assert_eq!(
      session.try_classify(Some(&image)),
      Err(ClassifyError::UninitializedClassifier)
    );
  }

  #[test]
  fn load_failure_leaves_session_uninitialized() {
    let session =
      ClassifySession::<FixedClassifier>::from_load(Err(ClassifyError::Inference("boom".into())));
    assert!(!session.is_ready());
  }

  #[test]
  fn outcome_serializes_with_status() {
    let image = SourceImage::filled(2, 2, 0);
    let outcome = session(vec![0.1, 0.7, 0.2]).classify(Some(&image));
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "classified");
    assert_eq!(json["label"], "Rolls Royce");

    let failed = ClassificationOutcome::Failed {
      message: "boom".to_string(),
    };
    let json = serde_json::to_value(&failed).unwrap();
    assert_eq!(json["status"], "failed");
    assert_eq!(json["message"], "boom");
  }
}
