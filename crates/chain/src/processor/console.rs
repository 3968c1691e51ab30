//! 콘솔 프로세서
//!
//! 파서 필드와 processParams를 JSON 한 줄로 stdout에 출력합니다.
//! 설정 디버깅과 파이프라인 연결 용도입니다.

use std::io::Write;
use std::sync::OnceLock;

use serde_json::json;

use logyard_core::error::{ConfigError, ProcessError};
use logyard_core::module::{
    ConfigOption, ConfigSchema, FieldMap, Module, OptionKind, Params, Processor,
};

/// 콘솔 프로세서 — 디스패치 한 건당 JSON 한 줄을 stdout에 씁니다.
#[derive(Debug, Default)]
pub struct ConsoleProcessor {
    prefix: OnceLock<String>,
}

impl ConsoleProcessor {
    /// 새 프로세서를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 한 건의 디스패치를 출력 라인으로 직렬화합니다.
    fn render(&self, fields: &FieldMap, params: &Params) -> String {
        let prefix = self.prefix.get().map(String::as_str).unwrap_or("");
        let body = json!({ "fields": fields, "params": params });
        format!("{prefix}{body}")
    }
}

impl Module for ConsoleProcessor {
    fn schema(&self) -> ConfigSchema {
        ConfigSchema::new().with(ConfigOption::optional(
            "prefix",
            OptionKind::String,
            json!(""),
            "string prepended to every output line",
        ))
    }

    fn set_up(&self, params: &Params, _debug: bool) -> Result<(), ConfigError> {
        let prefix = params
            .get("prefix")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_owned();
        self.prefix.set(prefix).map_err(|_| ConfigError::DoubleSetup {
            module: "console".to_owned(),
        })
    }

    fn description(&self) -> &'static str {
        "prints parsed fields and process params to stdout as one JSON line"
    }
}

impl Processor for ConsoleProcessor {
    fn process(&self, fields: &FieldMap, params: &Params) -> Result<(), ProcessError> {
        let line = self.render(fields, params);
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{line}")?;
        Ok(())
    }

    fn stop(&self) {}

    fn validate_processor_params(
        &self,
        _output_keys: &[String],
        _params: &Params,
    ) -> Result<(), ConfigError> {
        // 어떤 processParams든 그대로 출력하므로 제약이 없습니다.
        Ok(())
    }
}
