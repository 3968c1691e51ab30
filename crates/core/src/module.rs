//! 모듈 시스템 — 파서/프로세서 계약과 설정 스키마
//!
//! [`Parser`]와 [`Processor`]는 체인에 등록되는 두 가지 모듈 유형입니다.
//! 공통 상위 추상화인 [`Module`]은 설정 스키마와 setUp 단계를 제공합니다.
//!
//! # 생명주기
//! ```text
//! Factory::create -> (검증 통과 후) set_up() -> process()/parse() ... -> stop()
//! ```
//!
//! set_up은 인스턴스당 정확히 한 번 호출됩니다. 모든 메서드는 `&self`를
//! 받으며, 상태가 필요한 모듈은 `OnceLock` 등 내부 가변성으로 setUp 시점에
//! 상태를 고정합니다. 프로세서는 `Arc<dyn Processor>`로 공유되어 composite가
//! setUp 이전에 참조를 캡처할 수 있어야 하기 때문입니다.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use crate::error::{ConfigError, ProcessError};

// ─── 공통 타입 ───────────────────────────────────────────────────────

/// 파서가 라인에서 추출한 필드 집합
pub type FieldMap = HashMap<String, String>;

/// 해석된 모듈 옵션 / 파서 바인딩의 processParams
///
/// `serde_json::Map`은 preserve_order 피처로 삽입 순서를 유지합니다.
pub type Params = serde_json::Map<String, Value>;

// ─── ConfigSchema ────────────────────────────────────────────────────

/// 옵션 값의 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// 불리언
    Bool,
    /// 정수
    Integer,
    /// 실수
    Float,
    /// 문자열
    String,
    /// 문자열 목록
    StringList,
    /// 객체 (자유 형식 맵)
    Map,
}

impl OptionKind {
    /// 값이 이 종류에 부합하는지 검사합니다.
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Bool => value.is_boolean(),
            Self::Integer => value.as_i64().is_some(),
            Self::Float => value.as_f64().is_some(),
            Self::String => value.is_string(),
            Self::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Self::Map => value.is_object(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::StringList => "string list",
            Self::Map => "map",
        }
    }
}

/// 모듈이 인식하는 단일 설정 옵션
#[derive(Debug, Clone)]
pub struct ConfigOption {
    /// 옵션 이름
    pub name: &'static str,
    /// 값 종류
    pub kind: OptionKind,
    /// 필수 여부
    pub required: bool,
    /// 생략 시 기본값 (필수 옵션은 None)
    pub default: Option<Value>,
    /// 사람용 설명
    pub description: &'static str,
}

impl ConfigOption {
    /// 필수 옵션을 선언합니다.
    pub fn required(name: &'static str, kind: OptionKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    /// 기본값이 있는 선택 옵션을 선언합니다.
    pub fn optional(
        name: &'static str,
        kind: OptionKind,
        default: Value,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: Some(default),
            description,
        }
    }
}

/// 모듈의 설정 스키마 — 인식하는 옵션의 열거
///
/// [`ConfigSchema::validate`]는 설정 조각을 검증하고 기본값을 채워
/// setUp에 전달될 해석된 옵션 맵을 만듭니다.
#[derive(Debug, Clone, Default)]
pub struct ConfigSchema {
    /// 선언된 옵션 목록
    pub options: Vec<ConfigOption>,
}

impl ConfigSchema {
    /// 빈 스키마를 생성합니다 (옵션이 없는 모듈용).
    pub fn new() -> Self {
        Self::default()
    }

    /// 옵션을 추가합니다.
    pub fn with(mut self, option: ConfigOption) -> Self {
        self.options.push(option);
        self
    }

    /// 설정 조각을 스키마에 대해 검증합니다.
    ///
    /// - 필수 옵션 누락 -> [`ConfigError::MissingOption`]
    /// - 타입 불일치 -> [`ConfigError::InvalidOption`]
    /// - 선언되지 않은 옵션은 경고 후 무시
    ///
    /// 성공 시 기본값이 채워진 해석 옵션 맵을 반환합니다.
    pub fn validate(&self, module: &str, fragment: &Params) -> Result<Params, ConfigError> {
        let mut resolved = Params::new();

        for option in &self.options {
            match fragment.get(option.name) {
                Some(value) => {
                    if !option.kind.accepts(value) {
                        return Err(ConfigError::InvalidOption {
                            module: module.to_owned(),
                            option: option.name.to_owned(),
                            reason: format!("expected {}", option.kind.name()),
                        });
                    }
                    resolved.insert(option.name.to_owned(), value.clone());
                }
                None if option.required => {
                    return Err(ConfigError::MissingOption {
                        module: module.to_owned(),
                        option: option.name.to_owned(),
                    });
                }
                None => {
                    if let Some(default) = &option.default {
                        resolved.insert(option.name.to_owned(), default.clone());
                    }
                }
            }
        }

        for key in fragment.keys() {
            if !self.options.iter().any(|o| o.name == key) {
                warn!(module, option = key.as_str(), "unrecognized option, ignoring");
            }
        }

        Ok(resolved)
    }
}

// ─── Module Trait ────────────────────────────────────────────────────

/// 모든 모듈이 구현하는 공통 trait
///
/// 설정 스키마 조회와 setUp 단계를 제공합니다. 팩토리는 모듈을 생성만
/// 하고 setUp을 호출하지 않습니다. setUp은 체인이 검증을 끝낸 뒤
/// 커밋 시점에 호출하며, debug 플래그가 함께 전달됩니다.
pub trait Module: std::fmt::Debug + Send + Sync {
    /// 이 모듈이 인식하는 설정 옵션을 반환합니다.
    fn schema(&self) -> ConfigSchema;

    /// 해석된 옵션으로 모듈을 초기화합니다.
    ///
    /// 인스턴스당 정확히 한 번 호출됩니다. 두 번째 호출은
    /// [`ConfigError::DoubleSetup`]을 반환해야 합니다.
    fn set_up(&self, params: &Params, debug: bool) -> Result<(), ConfigError>;

    /// 모듈 설명을 반환합니다.
    fn description(&self) -> &'static str;
}

// ─── Parser Trait ────────────────────────────────────────────────────

/// 라인에서 필드를 추출하는 모듈
pub trait Parser: Module {
    /// 라인 매칭을 시도합니다.
    ///
    /// 매치되면 추출된 필드 맵을, 아니면 `None`을 반환합니다.
    /// `None`은 에러가 아니라 정상적인 불일치 신호입니다.
    fn parse(&self, line: &str) -> Option<FieldMap>;

    /// 앞선 파서가 매치했더라도 모든 라인에 대해 실행할지 여부
    ///
    /// run-always 파서는 first-match 탐색을 중단시키지도, 그것에 의해
    /// 억제되지도 않습니다.
    fn run_always(&self) -> bool {
        false
    }

    /// 매치 시 채워지는 것이 보장되는 키 목록 (순서 보존)
    ///
    /// 프로세서가 바인딩 검증 시점에 참조합니다.
    fn output_keys(&self) -> Vec<String>;
}

// ─── Processor Trait ─────────────────────────────────────────────────

/// 추출된 필드를 소비하여 부수 효과를 내는 모듈
pub trait Processor: Module {
    /// 파서 필드와 바인딩의 processParams를 처리합니다.
    ///
    /// 에러는 체인이 잡지 않고 호스트까지 전파됩니다.
    fn process(&self, fields: &FieldMap, params: &Params) -> Result<(), ProcessError>;

    /// 모듈이 퇴역하거나 셧다운될 때 자원을 해제합니다.
    ///
    /// 인스턴스당 정확히 한 번 호출됩니다.
    fn stop(&self);

    /// 파서 바인딩을 설정 시점에 검증합니다.
    ///
    /// `output_keys`는 바인딩된 파서가 보장하는 키 목록입니다. 참조된
    /// 플레이스홀더 키가 그 목록에 없으면 에러를 반환해 바인딩을
    /// 거부할 수 있습니다.
    fn validate_processor_params(
        &self,
        output_keys: &[String],
        params: &Params,
    ) -> Result<(), ConfigError>;
}

// ─── Tests ───────────────────────────────────────────────────────────
