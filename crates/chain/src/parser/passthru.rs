//! 패스스루 파서
//!
//! 모든 라인에 매치하며, 라인 전체를 `"line"` 키 하나로 전달합니다.
//! 라인 수 카운팅이나 원문 그대로의 전달에 사용합니다.

use std::sync::OnceLock;

use serde_json::json;

use logyard_core::error::ConfigError;
use logyard_core::module::{
    ConfigOption, ConfigSchema, FieldMap, Module, OptionKind, Params, Parser,
};

/// 패스스루 파서 — 라인 전체를 `"line"` 필드로 통과시킵니다.
#[derive(Debug, Default)]
pub struct PassThruParser {
    run_always: OnceLock<bool>,
}

impl PassThruParser {
    /// 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Module for PassThruParser {
    fn schema(&self) -> ConfigSchema {
        ConfigSchema::new().with(ConfigOption::optional(
            "runAlways",
            OptionKind::Bool,
            json!(false),
            "run on every line regardless of earlier matches",
        ))
    }

    fn set_up(&self, params: &Params, _debug: bool) -> Result<(), ConfigError> {
        let run_always = params
            .get("runAlways")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        self.run_always
            .set(run_always)
            .map_err(|_| ConfigError::DoubleSetup {
                module: "passthru".to_owned(),
            })
    }

    fn description(&self) -> &'static str {
        "passes the whole line through under the key 'line'"
    }
}

impl Parser for PassThruParser {
    fn parse(&self, line: &str) -> Option<FieldMap> {
        let mut fields = FieldMap::new();
        fields.insert("line".to_owned(), line.to_owned());
        Some(fields)
    }

    fn run_always(&self) -> bool {
        self.run_always.get().copied().unwrap_or(false)
    }

    fn output_keys(&self) -> Vec<String> {
        vec!["line".to_owned()]
    }
}
