// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use jianbie::{
  FromUrl,
  input::{InputWrapper, IntoThumbnails},
  model::{Classifier, TfliteClassifierBuilder},
  output::OutputWrapper,
  task::{ClassifySession, ContinuousTask, OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出方式: {}", args.output);

  info!("正在加载模型...");
  let session = ClassifySession::from_load(TfliteClassifierBuilder::from_url(&args.model)?.build());
  let side = session
    .classifier()
    .map(Classifier::input_side)
    .unwrap_or(jianbie::model::DEFAULT_INPUT_SIDE);

  let input = InputWrapper::from_url(&args.input)?.thumbnails(side);
  let output = OutputWrapper::from_url(&args.output)?;

  if args.continuous {
    let frame_number = (args.max_frames > 0).then_some(args.max_frames);
    ContinuousTask::default()
      .with_frame_number(frame_number)
      .with_interrupt(true)
      .run_task(input, session, output)?;
  } else {
    OneShotTask.run_task(input, session, output)?;
  }

  Ok(())
}
