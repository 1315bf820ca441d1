// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/output/console.rs - 控制台输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::Write;

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::Render, task::ClassificationOutcome};

#[derive(Error, Debug)]
pub enum ConsoleOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 将结果标签与置信度打印到标准输出
#[derive(Debug, Default)]
pub struct ConsoleOutput;

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(ConsoleOutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }
    Ok(ConsoleOutput)
  }
}

impl ConsoleOutput {
  pub fn write_outcome<W: Write>(
    &self,
    writer: &mut W,
    outcome: &ClassificationOutcome,
  ) -> Result<(), ConsoleOutputError> {
    writeln!(writer, "{}", outcome.title())?;
    writeln!(writer, "{}", outcome.detail())?;
    Ok(())
  }
}

impl Render for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn render_result(&self, outcome: &ClassificationOutcome) -> Result<(), Self::Error> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    self.write_outcome(&mut lock, outcome)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn writes_title_then_detail() {
    let outcome = ClassificationOutcome::Failed {
      message: "classifier is not initialized".to_string(),
    };
    let mut buffer = Vec::new();
    ConsoleOutput.write_outcome(&mut buffer, &outcome).unwrap();

    assert_eq!(
      String::from_utf8(buffer).unwrap(),
      "Error\nClassification failed: classifier is not initialized\n"
    );
  }

  #[test]
  fn parses_console_url() {
    assert!(ConsoleOutput::from_url(&Url::parse("console:").unwrap()).is_ok());
    assert!(ConsoleOutput::from_url(&Url::parse("json:///tmp").unwrap()).is_err());
  }
}
