//! 정규식 파서
//!
//! 명명 캡처 그룹(named capture group)을 필드로 추출합니다.
//! 패턴은 setUp 시점에 한 번 컴파일되어 고정됩니다.
//!
//! # 사용 예시
//! ```ignore
//! // 설정 조각:
//! // { "class": "regex", "regex": "(?P<verb>GET|POST) (?P<path>\\S+)" }
//! let fields = parser.parse("GET /index.html").unwrap();
//! assert_eq!(fields["verb"], "GET");
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use logyard_core::error::ConfigError;
use logyard_core::module::{
    ConfigOption, ConfigSchema, FieldMap, Module, OptionKind, Params, Parser,
};

/// setUp에서 고정되는 파서 상태
#[derive(Debug)]
struct RegexState {
    /// 컴파일된 패턴
    pattern: Regex,
    /// run-always 여부
    run_always: bool,
    /// 명명 캡처 그룹 이름 (패턴 선언 순서)
    output_keys: Vec<String>,
}

/// 정규식 파서 — 명명 캡처 그룹을 필드 맵으로 추출합니다.
///
/// 매치 시 모든 명명 그룹이 키로 채워집니다. 선택적(optional) 그룹이
/// 매치에 참여하지 않은 경우 값은 빈 문자열입니다. 이로써
/// `output_keys()`의 보장이 항상 성립합니다.
#[derive(Debug, Default)]
pub struct RegexParser {
    state: OnceLock<RegexState>,
}

impl RegexParser {
    /// 새 파서를 생성합니다. 패턴은 setUp에서 컴파일됩니다.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Module for RegexParser {
    fn schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .with(ConfigOption::required(
                "regex",
                OptionKind::String,
                "pattern with named capture groups",
            ))
            .with(ConfigOption::optional(
                "runAlways",
                OptionKind::Bool,
                json!(false),
                "run on every line regardless of earlier matches",
            ))
    }

    fn set_up(&self, params: &Params, _debug: bool) -> Result<(), ConfigError> {
        let raw = params
            .get("regex")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ConfigError::MissingOption {
                module: "regex".to_owned(),
                option: "regex".to_owned(),
            })?;

        let pattern = Regex::new(raw).map_err(|e| ConfigError::InvalidOption {
            module: "regex".to_owned(),
            option: "regex".to_owned(),
            reason: e.to_string(),
        })?;

        let output_keys = pattern
            .capture_names()
            .flatten()
            .map(str::to_owned)
            .collect();

        let run_always = params
            .get("runAlways")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let state = RegexState {
            pattern,
            run_always,
            output_keys,
        };
        self.state.set(state).map_err(|_| ConfigError::DoubleSetup {
            module: "regex".to_owned(),
        })
    }

    fn description(&self) -> &'static str {
        "extracts fields from named capture groups of a regular expression"
    }
}

impl Parser for RegexParser {
    fn parse(&self, line: &str) -> Option<FieldMap> {
        let state = self.state.get()?;
        let captures = state.pattern.captures(line)?;

        let mut fields = FieldMap::new();
        for key in &state.output_keys {
            let value = captures
                .name(key)
                .map(|m| m.as_str().to_owned())
                .unwrap_or_default();
            fields.insert(key.clone(), value);
        }
        Some(fields)
    }

    fn run_always(&self) -> bool {
        self.state.get().is_some_and(|s| s.run_always)
    }

    fn output_keys(&self) -> Vec<String> {
        self.state
            .get()
            .map(|s| s.output_keys.clone())
            .unwrap_or_default()
    }
}
