//! 설정 문서 모델 — 체인이 소비하는 JSON 설정
//!
//! [`ChainConfig`]는 `update_config`에 전달되는 설정 문서의 최상위
//! 구조입니다. 두 개의 선택 섹션 `processors`와 `parsers`를 가지며,
//! 그 외의 최상위 키는 거부됩니다.
//!
//! 섹션 내부는 모듈 이름 -> 설정 조각의 맵입니다. 조각의 해석은
//! 팩토리와 각 모듈 스키마의 몫이므로 여기서는 자유 형식 JSON으로
//! 보존합니다. `serde_json`의 preserve_order 피처로 선언 순서가
//! 유지되며, 파서 섹션의 선언 순서가 곧 디스패치 순서입니다.
//!
//! # 사용 예시
//! ```
//! use logyard_core::config::ChainConfig;
//!
//! let config = ChainConfig::parse(r#"{
//!     "processors": { "pr1": { "class": "console" } },
//!     "parsers": { "pa1": { "class": "passthru", "processor": "pr1" } }
//! }"#).unwrap();
//! assert_eq!(config.processors.len(), 1);
//! assert_eq!(config.parsers.len(), 1);
//! ```

use serde_json::Value;

use crate::error::ConfigError;
use crate::module::Params;

/// 체인 설정 문서
///
/// 누락된 섹션은 빈 맵으로 취급합니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainConfig {
    /// 프로세서 선언 (이름 -> 설정 조각)
    pub processors: Params,
    /// 파서 선언 (이름 -> 설정 조각), 선언 순서 = 디스패치 순서
    pub parsers: Params,
}

impl ChainConfig {
    /// JSON 문자열에서 설정을 파싱합니다.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(raw).map_err(|e| ConfigError::ParseFailed {
            reason: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    /// JSON 값에서 설정을 구성합니다.
    ///
    /// 최상위가 객체가 아니거나 알 수 없는 키가 있으면 에러를 반환합니다.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let root = value.as_object().ok_or_else(|| ConfigError::ParseFailed {
            reason: "top level must be a JSON object".to_owned(),
        })?;

        let mut config = Self::default();

        for (key, section) in root {
            let target = match key.as_str() {
                "processors" => &mut config.processors,
                "parsers" => &mut config.parsers,
                other => {
                    return Err(ConfigError::UnknownSection {
                        section: other.to_owned(),
                    });
                }
            };
            *target = section
                .as_object()
                .ok_or_else(|| ConfigError::ParseFailed {
                    reason: format!("section '{key}' must be a JSON object"),
                })?
                .clone();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_yields_empty_sections() {
        let config = ChainConfig::parse("{}").unwrap();
        assert!(config.processors.is_empty());
        assert!(config.parsers.is_empty());
    }

    #[test]
    fn missing_section_is_treated_as_empty() {
        let config = ChainConfig::parse(r#"{"processors": {"pr1": {"class": "console"}}}"#).unwrap();
        assert_eq!(config.processors.len(), 1);
        assert!(config.parsers.is_empty());
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let err = ChainConfig::parse(r#"{"parser": {}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSection { .. }));
        assert!(err.to_string().contains("parser"));
    }

    #[test]
    fn non_object_top_level_is_rejected() {
        let err = ChainConfig::parse("[1, 2]").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
    }

    #[test]
    fn non_object_section_is_rejected() {
        let err = ChainConfig::parse(r#"{"parsers": []}"#).unwrap_err();
        assert!(err.to_string().contains("parsers"));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let err = ChainConfig::parse("not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
    }

    #[test]
    fn parser_declaration_order_is_preserved() {
        let config = ChainConfig::parse(
            r#"{"parsers": {"zz": {}, "aa": {}, "mm": {}}}"#,
        )
        .unwrap();
        let names: Vec<&str> = config.parsers.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zz", "aa", "mm"]);
    }

    #[test]
    fn from_value_matches_parse() {
        let value = json!({
            "processors": {"pr1": {"class": "console"}},
            "parsers": {"pa1": {"class": "passthru", "processor": "pr1"}}
        });
        let a = ChainConfig::from_value(&value).unwrap();
        let b = ChainConfig::parse(&value.to_string()).unwrap();
        assert_eq!(a, b);
    }
}
