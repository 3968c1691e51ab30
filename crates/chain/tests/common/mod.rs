//! 체인 통합 테스트 공용 모듈
//!
//! 원본 테스트 더블: 호출을 공유 로그에 기록하는 파서/프로세서
//! 클래스를 팩토리에 등록하여, 디스패치 순서와 생명주기 호출을
//! 관찰합니다.

// 각 테스트 바이너리가 필요한 헬퍼만 사용합니다
#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};

use serde_json::{Value, json};

use logyard_chain::factory::ModuleFactory;
use logyard_core::error::{ConfigError, ProcessError};
use logyard_core::module::{
    ConfigOption, ConfigSchema, FieldMap, Module, OptionKind, Params, Parser, Processor,
};

/// 기록된 생명주기/디스패치 이벤트
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SetUp {
        tag: String,
    },
    Process {
        tag: String,
        fields: FieldMap,
        params: Params,
    },
    Stop {
        tag: String,
    },
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<Event> {
    log.lock().unwrap().clone()
}

/// Process 이벤트의 태그를 발생 순서대로 반환합니다.
pub fn process_tags(log: &EventLog) -> Vec<String> {
    events(log)
        .into_iter()
        .filter_map(|e| match e {
            Event::Process { tag, .. } => Some(tag),
            _ => None,
        })
        .collect()
}

pub fn count_process(log: &EventLog, tag: &str) -> usize {
    process_tags(log).iter().filter(|t| t == &tag).count()
}

pub fn count_setups(log: &EventLog, tag: &str) -> usize {
    events(log)
        .iter()
        .filter(|e| matches!(e, Event::SetUp { tag: t } if t == tag))
        .count()
}

pub fn count_stops(log: &EventLog, tag: &str) -> usize {
    events(log)
        .iter()
        .filter(|e| matches!(e, Event::Stop { tag: t } if t == tag))
        .count()
}

pub fn total_stops(log: &EventLog) -> usize {
    events(log)
        .iter()
        .filter(|e| matches!(e, Event::Stop { .. }))
        .count()
}

// ─── RecordingProcessor ──────────────────────────────────────────────

/// 호출을 기록하는 프로세서
///
/// 옵션: `tag` (필수), `failSetup` (기본 false, true면 setUp이 실패)
#[derive(Debug)]
pub struct RecordingProcessor {
    log: EventLog,
    tag: OnceLock<String>,
}

impl RecordingProcessor {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            tag: OnceLock::new(),
        }
    }

    fn tag(&self) -> String {
        self.tag.get().cloned().unwrap_or_else(|| "unset".to_owned())
    }
}

impl Module for RecordingProcessor {
    fn schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .with(ConfigOption::required(
                "tag",
                OptionKind::String,
                "label recorded with every event",
            ))
            .with(ConfigOption::optional(
                "failSetup",
                OptionKind::Bool,
                json!(false),
                "fail set_up to exercise rollback",
            ))
    }

    fn set_up(&self, params: &Params, _debug: bool) -> Result<(), ConfigError> {
        let tag = params
            .get("tag")
            .and_then(Value::as_str)
            .ok_or_else(|| ConfigError::MissingOption {
                module: "recorder".to_owned(),
                option: "tag".to_owned(),
            })?
            .to_owned();

        if params.get("failSetup").and_then(Value::as_bool) == Some(true) {
            return Err(ConfigError::SetupFailed {
                module: tag,
                reason: "failSetup requested".to_owned(),
            });
        }

        self.tag
            .set(tag.clone())
            .map_err(|_| ConfigError::DoubleSetup { module: tag })?;
        self.log.lock().unwrap().push(Event::SetUp { tag: self.tag() });
        Ok(())
    }

    fn description(&self) -> &'static str {
        "records every call into a shared event log"
    }
}

impl Processor for RecordingProcessor {
    fn process(&self, fields: &FieldMap, params: &Params) -> Result<(), ProcessError> {
        self.log.lock().unwrap().push(Event::Process {
            tag: self.tag(),
            fields: fields.clone(),
            params: params.clone(),
        });
        Ok(())
    }

    fn stop(&self) {
        self.log.lock().unwrap().push(Event::Stop { tag: self.tag() });
    }

    fn validate_processor_params(
        &self,
        _output_keys: &[String],
        _params: &Params,
    ) -> Result<(), ConfigError> {
        Ok(())
    }
}

// ─── StubParser ──────────────────────────────────────────────────────

#[derive(Debug)]
struct StubState {
    /// 빈 문자열이면 모든 라인에 매치, 아니면 정확히 일치할 때만 매치
    accept: String,
    /// 매치 시 반환할 필드 (선언 순서 보존)
    fields: Vec<(String, String)>,
    run_always: bool,
}

/// 설정으로 매치 동작을 지정하는 테스트 파서
///
/// 옵션: `accept` (기본 "" = 전부 매치), `fields` (기본 {}),
/// `runAlways` (기본 false)
#[derive(Debug)]
pub struct StubParser {
    state: OnceLock<StubState>,
}

impl StubParser {
    pub fn new() -> Self {
        Self {
            state: OnceLock::new(),
        }
    }
}

impl Module for StubParser {
    fn schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .with(ConfigOption::optional(
                "accept",
                OptionKind::String,
                json!(""),
                "line that matches; empty matches everything",
            ))
            .with(ConfigOption::optional(
                "fields",
                OptionKind::Map,
                json!({}),
                "fields returned on a match",
            ))
            .with(ConfigOption::optional(
                "runAlways",
                OptionKind::Bool,
                json!(false),
                "run on every line",
            ))
    }

    fn set_up(&self, params: &Params, _debug: bool) -> Result<(), ConfigError> {
        let accept = params
            .get("accept")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_owned();
        let fields = params
            .get("fields")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| {
                        let value = v.as_str().map(str::to_owned).unwrap_or_else(|| v.to_string());
                        (k.clone(), value)
                    })
                    .collect()
            })
            .unwrap_or_default();
        let run_always = params
            .get("runAlways")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        self.state
            .set(StubState {
                accept,
                fields,
                run_always,
            })
            .map_err(|_| ConfigError::DoubleSetup {
                module: "stub".to_owned(),
            })
    }

    fn description(&self) -> &'static str {
        "matches lines by equality and returns configured fields"
    }
}

impl Parser for StubParser {
    fn parse(&self, line: &str) -> Option<FieldMap> {
        let state = self.state.get()?;
        if state.accept.is_empty() || state.accept == line {
            Some(state.fields.iter().cloned().collect())
        } else {
            None
        }
    }

    fn run_always(&self) -> bool {
        self.state.get().is_some_and(|s| s.run_always)
    }

    fn output_keys(&self) -> Vec<String> {
        self.state
            .get()
            .map(|s| s.fields.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }
}

/// 기록 클래스가 등록된 팩토리를 만듭니다.
pub fn test_factory(log: &EventLog) -> ModuleFactory {
    let mut factory = ModuleFactory::with_defaults();
    let log = Arc::clone(log);
    factory.register_processor(&["recorder", "RecordingProcessor"], move || {
        Arc::new(RecordingProcessor::new(Arc::clone(&log)))
    });
    factory.register_parser(&["stub", "StubParser"], || Box::new(StubParser::new()));
    factory
}
