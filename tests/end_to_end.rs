// 该文件是 Jianbie （鉴别） 项目的一部分。
// tests/end_to_end.rs - 端到端分类测试
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

use std::{cell::Cell, rc::Rc};

use jianbie::{
  ClassifyError,
  frame::{InputDType, InputTensor, SourceImage, pack_argb},
  input::{ImageFileInput, IntoThumbnails},
  model::{ClassLabels, Classifier, OutputVector},
  output::ChannelOutput,
  task::{ClassificationOutcome, ClassifySession, ContinuousTask, OneShotTask, Task},
};

/// 固定返回结果的分类器，记录收到的输入与释放次数
struct StubClassifier {
  side: u32,
  scores: Vec<f32>,
  labels: ClassLabels,
  seen: Rc<Cell<usize>>,
  closed: Rc<Cell<usize>>,
  fail: bool,
}

impl StubClassifier {
  fn new(side: u32, scores: Vec<f32>) -> Self {
    Self {
      side,
      scores,
      labels: ClassLabels::new(["Audi", "Rolls Royce", "Toyota Inova"]).unwrap(),
      seen: Rc::new(Cell::new(0)),
      closed: Rc::new(Cell::new(0)),
      fail: false,
    }
  }
}

impl Classifier for StubClassifier {
  type Error = ClassifyError;

  fn input_side(&self) -> u32 {
    self.side
  }

  fn input_dtype(&self) -> InputDType {
    InputDType::Float32
  }

  fn labels(&self) -> &ClassLabels {
    &self.labels
  }

  fn run(&self, input: &InputTensor) -> Result<OutputVector, Self::Error> {
    assert_eq!(input.len(), (self.side * self.side * 3) as usize);
    self.seen.set(self.seen.get() + 1);
    if self.fail {
      return Err(ClassifyError::Inference("native failure".to_string()));
    }
    Ok(OutputVector::from(self.scores.clone()))
  }

  fn close(self) {
    self.closed.set(self.closed.get() + 1);
  }
}

#[test]
fn black_image_is_rolls_royce() {
  let stub = StubClassifier::new(2, vec![0.1, 0.7, 0.2]);
  let session = ClassifySession::new(stub);
  let image = SourceImage::filled(2, 2, pack_argb(0xFF, 0, 0, 0));

  let outcome = session.classify(Some(&image));
  let result = outcome.result().unwrap();

  assert_eq!(result.label(), "Rolls Royce");
  let lines: Vec<String> = result.scores().iter().map(ToString::to_string).collect();
  assert_eq!(
    lines,
    vec!["Audi: 10.0%", "Rolls Royce: 70.0%", "Toyota Inova: 20.0%"]
  );
  assert_eq!(outcome.title(), "Rolls Royce");
}

#[test]
fn inference_failure_is_caught() {
  let mut stub = StubClassifier::new(2, vec![0.1, 0.7, 0.2]);
  stub.fail = true;
  let session = ClassifySession::new(stub);
  let image = SourceImage::filled(2, 2, 0);

  let outcome = session.classify(Some(&image));
  assert_eq!(outcome.title(), "Error");
  assert_eq!(
    outcome.detail(),
    "Classification failed: inference failed: native failure"
  );
}

#[test]
fn oneshot_classifies_thumbnail_and_closes_once() {
  let stub = StubClassifier::new(4, vec![0.6, 0.3, 0.1]);
  let closed = stub.closed.clone();
  let seen = stub.seen.clone();
  let session = ClassifySession::new(stub);

  // 非正方形图像经裁剪缩放后送入分类器
  let input = ImageFileInput::from(SourceImage::filled(10, 6, pack_argb(0xFF, 9, 9, 9))).thumbnails(4);
  let (output, receiver) = ChannelOutput::new();

  OneShotTask.run_task(input, session, output).unwrap();

  let outcome = receiver.recv().unwrap();
  assert_eq!(outcome.title(), "Audi");
  assert_eq!(seen.get(), 1);
  assert_eq!(closed.get(), 1);
}

#[test]
fn oneshot_without_image_reports_missing_input() {
  let stub = StubClassifier::new(2, vec![0.6, 0.3, 0.1]);
  let session = ClassifySession::new(stub);
  let (output, receiver) = ChannelOutput::new();

  OneShotTask
    .run_task(std::iter::empty::<SourceImage>(), session, output)
    .unwrap();

  let outcome = receiver.recv().unwrap();
  assert_eq!(
    outcome,
    ClassificationOutcome::Failed {
      message: ClassifyError::MissingInput.to_string()
    }
  );
}

#[test]
fn continuous_respects_frame_limit() {
  let stub = StubClassifier::new(2, vec![0.1, 0.2, 0.7]);
  let seen = stub.seen.clone();
  let closed = stub.closed.clone();
  let session = ClassifySession::new(stub);
  let images = (0..5).map(|_| SourceImage::filled(2, 2, 0));
  let (output, receiver) = ChannelOutput::new();

  ContinuousTask::default()
    .with_frame_number(Some(3))
    .run_task(images, session, output)
    .unwrap();

  let outcomes: Vec<_> = receiver.try_iter().collect();
  assert_eq!(outcomes.len(), 3);
  assert!(outcomes.iter().all(|o| o.title() == "Toyota Inova"));
  assert_eq!(seen.get(), 3);
  assert_eq!(closed.get(), 1);
}

#[test]
fn uninitialized_session_fails_every_image() {
  let session = ClassifySession::<StubClassifier>::uninitialized();
  let images = (0..2).map(|_| SourceImage::filled(2, 2, 0));
  let (output, receiver) = ChannelOutput::new();

  ContinuousTask::default()
    .run_task(images, session, output)
    .unwrap();

  let outcomes: Vec<_> = receiver.try_iter().collect();
  assert_eq!(outcomes.len(), 2);
  assert!(outcomes.iter().all(|o| o.detail().contains("not initialized")));
}
