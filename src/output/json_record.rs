// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/output/json_record.rs - JSON 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};
use thiserror::Error;
use tracing::info;

use crate::{
  FromUrl, FromUrlWithScheme, output::Render, task::ClassificationOutcome, url_file_path,
};

#[derive(Error, Debug)]
pub enum JsonRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

#[derive(Serialize)]
struct Record<'a> {
  timestamp: DateTime<Utc>,
  #[serde(flatten)]
  outcome: &'a ClassificationOutcome,
}

/// 按日期分目录，每次分类写一个 JSON 文件
pub struct JsonRecordOutput {
  directory: PathBuf,
  counter: AtomicU16,
  only_classified: bool,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonRecordOutputError::SchemeMismatch);
    }

    let only_classified = uri.query_pairs().any(|(k, _)| k == "classified");

    Ok(JsonRecordOutput {
      directory: PathBuf::from(url_file_path(uri)),
      counter: AtomicU16::new(0),
      only_classified,
    })
  }
}

impl JsonRecordOutput {
  fn record_id(&self) -> u16 {
    self.counter.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
  }

  fn record_path(&self, now: &DateTime<Utc>) -> Result<PathBuf, JsonRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.json",
      now.format("%H-%M-%S"),
      self.record_id()
    )))
  }
}

impl Render for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn render_result(&self, outcome: &ClassificationOutcome) -> Result<(), Self::Error> {
    if self.only_classified && !outcome.is_classified() {
      return Ok(());
    }

    let timestamp = Utc::now();
    let path = self.record_path(&timestamp)?;
    let record = Record { timestamp, outcome };
    std::fs::write(&path, serde_json::to_vec_pretty(&record)?)?;
    info!("保存分类记录到文件: {}", path.display());
    Ok(())
  }
}
