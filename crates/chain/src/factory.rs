//! 모듈 팩토리 — 설정 조각으로부터 파서/프로세서 인스턴스 생성
//!
//! 조각의 `class` 키를 알려진 구현 레지스트리에서 해석하고, 모듈
//! 스키마로 나머지 옵션을 검증한 뒤, **setUp을 호출하지 않은** 모듈과
//! 해석된 옵션을 반환합니다. setUp은 체인이 커밋 시점에 수행합니다.
//!
//! class 별칭은 짧은 이름(`"regex"`)과 구현 타입 이름(`"RegexParser"`)
//! 둘 다 등록됩니다. 테스트는 [`ModuleFactory::register_parser`] /
//! [`ModuleFactory::register_processor`]로 자체 클래스를 등록할 수
//! 있습니다.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use logyard_core::error::ConfigError;
use logyard_core::module::{Params, Parser, Processor};

use crate::parser::{PassThruParser, RegexParser};
use crate::processor::{CompositeProcessor, ConsoleProcessor, StatsdProcessor};

/// 파서 생성자
pub type ParserCtor = Arc<dyn Fn() -> Box<dyn Parser> + Send + Sync>;

/// 프로세서 생성자
pub type ProcessorCtor = Arc<dyn Fn() -> Arc<dyn Processor> + Send + Sync>;

/// composite의 class 별칭 — 자식 해석이 체인의 2차 패스로 미뤄지므로
/// 일반 생성자 테이블과 별도로 취급합니다.
const COMPOSITE_ALIASES: &[&str] = &["composite", "CompositeProcessor"];

/// 팩토리가 생성한 프로세서 명세
#[derive(Debug)]
pub enum ProcessorSpec {
    /// 즉시 사용 가능한 인스턴스
    Leaf {
        module: Arc<dyn Processor>,
        params: Params,
    },
    /// 자식 이름이 해석되기 전의 composite
    Composite { children: Vec<String> },
}

/// 파서 조각에서 팩토리/체인이 소비하는 예약 키
const PARSER_RESERVED: &[&str] = &["class", "enabled", "processor", "processParams"];

/// 프로세서 조각의 예약 키
const PROCESSOR_RESERVED: &[&str] = &["class", "enabled"];

/// 모듈 팩토리
pub struct ModuleFactory {
    parsers: HashMap<String, ParserCtor>,
    processors: HashMap<String, ProcessorCtor>,
}

impl ModuleFactory {
    /// 빈 팩토리를 생성합니다 (내장 클래스 없음).
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
            processors: HashMap::new(),
        }
    }

    /// 내장 클래스가 모두 등록된 팩토리를 생성합니다.
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register_parser(&["regex", "RegexParser"], || Box::new(RegexParser::new()));
        factory.register_parser(&["passthru", "PassThruParser"], || {
            Box::new(PassThruParser::new())
        });
        factory.register_processor(&["console", "ConsoleProcessor"], || {
            Arc::new(ConsoleProcessor::new())
        });
        factory.register_processor(&["statsd", "StatsdProcessor"], || {
            Arc::new(StatsdProcessor::new())
        });
        factory
    }

    /// 파서 클래스를 별칭 목록과 함께 등록합니다.
    pub fn register_parser<F>(&mut self, aliases: &[&str], ctor: F)
    where
        F: Fn() -> Box<dyn Parser> + Send + Sync + 'static,
    {
        let ctor: ParserCtor = Arc::new(ctor);
        for alias in aliases {
            self.parsers.insert((*alias).to_owned(), Arc::clone(&ctor));
        }
    }

    /// 프로세서 클래스를 별칭 목록과 함께 등록합니다.
    pub fn register_processor<F>(&mut self, aliases: &[&str], ctor: F)
    where
        F: Fn() -> Arc<dyn Processor> + Send + Sync + 'static,
    {
        let ctor: ProcessorCtor = Arc::new(ctor);
        for alias in aliases {
            self.processors
                .insert((*alias).to_owned(), Arc::clone(&ctor));
        }
    }

    /// 설정 조각에서 파서를 생성합니다.
    ///
    /// 비활성(`enabled: false`) 모듈은 `Ok(None)`을 반환합니다.
    /// 반환된 파서는 아직 setUp되지 않았습니다.
    pub fn create_parser(
        &self,
        name: &str,
        fragment: &Value,
    ) -> Result<Option<(Box<dyn Parser>, Params)>, ConfigError> {
        let obj = Self::fragment_object(name, fragment)?;
        let class = Self::class_of(name, obj)?;

        let ctor = self
            .parsers
            .get(class)
            .ok_or_else(|| ConfigError::UnknownClass {
                module: name.to_owned(),
                class: class.to_owned(),
            })?;

        if !Self::enabled(name, obj)? {
            return Ok(None);
        }

        let parser = ctor();
        let params = parser
            .schema()
            .validate(name, &Self::strip_reserved(obj, PARSER_RESERVED))?;
        Ok(Some((parser, params)))
    }

    /// 설정 조각에서 프로세서 명세를 생성합니다.
    ///
    /// composite class는 자식 이름만 담은 [`ProcessorSpec::Composite`]로
    /// 반환되고, 해석은 체인의 2차 패스에서 일어납니다.
    pub fn create_processor(
        &self,
        name: &str,
        fragment: &Value,
    ) -> Result<Option<ProcessorSpec>, ConfigError> {
        let obj = Self::fragment_object(name, fragment)?;
        let class = Self::class_of(name, obj)?;

        if COMPOSITE_ALIASES.contains(&class) {
            if !Self::enabled(name, obj)? {
                return Ok(None);
            }
            let params = CompositeProcessor::config_schema()
                .validate(name, &Self::strip_reserved(obj, PROCESSOR_RESERVED))?;
            let children = CompositeProcessor::child_names_from(&params);
            return Ok(Some(ProcessorSpec::Composite { children }));
        }

        let ctor = self
            .processors
            .get(class)
            .ok_or_else(|| ConfigError::UnknownClass {
                module: name.to_owned(),
                class: class.to_owned(),
            })?;

        if !Self::enabled(name, obj)? {
            return Ok(None);
        }

        let module = ctor();
        let params = module
            .schema()
            .validate(name, &Self::strip_reserved(obj, PROCESSOR_RESERVED))?;
        Ok(Some(ProcessorSpec::Leaf { module, params }))
    }

    fn fragment_object<'a>(name: &str, fragment: &'a Value) -> Result<&'a Params, ConfigError> {
        fragment
            .as_object()
            .ok_or_else(|| ConfigError::InvalidFragment {
                module: name.to_owned(),
            })
    }

    fn class_of<'a>(name: &str, obj: &'a Params) -> Result<&'a str, ConfigError> {
        obj.get("class")
            .and_then(Value::as_str)
            .ok_or_else(|| ConfigError::MissingOption {
                module: name.to_owned(),
                option: "class".to_owned(),
            })
    }

    fn enabled(name: &str, obj: &Params) -> Result<bool, ConfigError> {
        match obj.get("enabled") {
            None => Ok(true),
            Some(Value::Bool(flag)) => Ok(*flag),
            Some(_) => Err(ConfigError::InvalidOption {
                module: name.to_owned(),
                option: "enabled".to_owned(),
                reason: "expected bool".to_owned(),
            }),
        }
    }

    fn strip_reserved(obj: &Params, reserved: &[&str]) -> Params {
        obj.iter()
            .filter(|(key, _)| !reserved.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl Default for ModuleFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_short_and_type_name_aliases() {
        let factory = ModuleFactory::with_defaults();
        for class in ["regex", "RegexParser"] {
            let created = factory
                .create_parser("pa1", &json!({"class": class, "regex": "x"}))
                .unwrap();
            assert!(created.is_some());
        }
    }

    #[test]
    fn unknown_class_is_rejected() {
        let factory = ModuleFactory::with_defaults();
        let err = factory
            .create_parser("pa1", &json!({"class": "mystery"}))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownClass { .. }));
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn missing_class_is_rejected() {
        let factory = ModuleFactory::with_defaults();
        let err = factory.create_parser("pa1", &json!({})).unwrap_err();
        assert!(err.to_string().contains("class"));
    }

    #[test]
    fn non_object_fragment_is_rejected() {
        let factory = ModuleFactory::with_defaults();
        let err = factory.create_parser("pa1", &json!("nope")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFragment { .. }));
    }

    #[test]
    fn disabled_module_returns_none() {
        let factory = ModuleFactory::with_defaults();
        let created = factory
            .create_parser(
                "pa1",
                &json!({"class": "passthru", "enabled": false}),
            )
            .unwrap();
        assert!(created.is_none());
    }

    #[test]
    fn disabled_check_still_requires_known_class() {
        let factory = ModuleFactory::with_defaults();
        let err = factory
            .create_parser("pa1", &json!({"class": "mystery", "enabled": false}))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownClass { .. }));
    }

    #[test]
    fn non_bool_enabled_is_rejected() {
        let factory = ModuleFactory::with_defaults();
        let err = factory
            .create_parser("pa1", &json!({"class": "passthru", "enabled": "yes"}))
            .unwrap_err();
        assert!(err.to_string().contains("enabled"));
    }

    #[test]
    fn schema_violation_propagates() {
        let factory = ModuleFactory::with_defaults();
        // regex 파서의 필수 옵션 누락
        let err = factory
            .create_parser("pa1", &json!({"class": "regex"}))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingOption { .. }));
        assert!(err.to_string().contains("regex"));
    }

    #[test]
    fn reserved_keys_are_not_schema_options() {
        let factory = ModuleFactory::with_defaults();
        // processor/processParams는 바인딩 키이므로 스키마 검증 대상이 아님
        let (_, params) = factory
            .create_parser(
                "pa1",
                &json!({
                    "class": "passthru",
                    "processor": "pr1",
                    "processParams": {"k": "v"}
                }),
            )
            .unwrap()
            .unwrap();
        assert!(!params.contains_key("processor"));
        assert!(!params.contains_key("processParams"));
    }

    #[test]
    fn leaf_processor_is_created_with_params() {
        let factory = ModuleFactory::with_defaults();
        let spec = factory
            .create_processor("pr1", &json!({"class": "console", "prefix": "x: "}))
            .unwrap()
            .unwrap();
        match spec {
            ProcessorSpec::Leaf { params, .. } => {
                assert_eq!(params["prefix"], json!("x: "));
            }
            ProcessorSpec::Composite { .. } => panic!("expected leaf"),
        }
    }

    #[test]
    fn composite_class_yields_child_names() {
        let factory = ModuleFactory::with_defaults();
        let spec = factory
            .create_processor(
                "pr3",
                &json!({"class": "composite", "processors": ["pr1", "pr2"]}),
            )
            .unwrap()
            .unwrap();
        match spec {
            ProcessorSpec::Composite { children } => {
                assert_eq!(children, vec!["pr1", "pr2"]);
            }
            ProcessorSpec::Leaf { .. } => panic!("expected composite"),
        }
    }

    #[test]
    fn composite_requires_processors_option() {
        let factory = ModuleFactory::with_defaults();
        let err = factory
            .create_processor("pr3", &json!({"class": "composite"}))
            .unwrap_err();
        assert!(err.to_string().contains("processors"));
    }

    #[test]
    fn custom_class_can_be_registered() {
        let mut factory = ModuleFactory::new();
        factory.register_parser(&["custom"], || Box::new(PassThruParser::new()));
        let created = factory
            .create_parser("pa1", &json!({"class": "custom"}))
            .unwrap();
        assert!(created.is_some());
    }

    #[test]
    fn empty_factory_knows_no_classes() {
        let factory = ModuleFactory::new();
        let err = factory
            .create_parser("pa1", &json!({"class": "passthru"}))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownClass { .. }));
    }
}
