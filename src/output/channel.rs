// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/output/channel.rs - 通道输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::mpsc::{Receiver, Sender, channel};

use thiserror::Error;

use crate::{output::Render, task::ClassificationOutcome};

#[derive(Error, Debug)]
pub enum ChannelOutputError {
  #[error("接收端已关闭")]
  Disconnected,
}

/// 将结果投递给持有接收端的线程（例如负责界面渲染的线程）
#[derive(Debug, Clone)]
pub struct ChannelOutput {
  sender: Sender<ClassificationOutcome>,
}

impl ChannelOutput {
  pub fn new() -> (Self, Receiver<ClassificationOutcome>) {
    let (sender, receiver) = channel();
    (Self { sender }, receiver)
  }
}

impl From<Sender<ClassificationOutcome>> for ChannelOutput {
  fn from(sender: Sender<ClassificationOutcome>) -> Self {
    Self { sender }
  }
}

impl Render for ChannelOutput {
  type Error = ChannelOutputError;

  fn render_result(&self, outcome: &ClassificationOutcome) -> Result<(), Self::Error> {
    self
      .sender
      .send(outcome.clone())
      .map_err(|_| ChannelOutputError::Disconnected)
  }
}
