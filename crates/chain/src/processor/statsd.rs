//! StatsD 프로세서
//!
//! 파서 필드로 메트릭 키의 `#field#` 플레이스홀더를 치환하여
//! StatsD 데이그램(UDP)을 전송합니다.
//!
//! # processParams 계약
//! ```json
//! {
//!     "metrics": [
//!         { "type": "count",  "key": "hits.#status#", "value": 1 },
//!         { "type": "timing", "key": "latency",       "value": "#elapsed#" }
//!     ]
//! }
//! ```
//!
//! 참조된 모든 필드는 바인딩된 파서의 output keys에 있어야 하며,
//! 이는 설정 시점에 검증됩니다.

use std::net::UdpSocket;
use std::sync::{Mutex, PoisonError};

use serde_json::{Value, json};
use tracing::{debug, warn};

use logyard_core::error::{ConfigError, ProcessError};
use logyard_core::module::{
    ConfigOption, ConfigSchema, FieldMap, Module, OptionKind, Params, Processor,
};

/// 메트릭 종류와 StatsD 타입 접미사
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricKind {
    Count,
    Gauge,
    Timing,
}

impl MetricKind {
    fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "count" => Some(Self::Count),
            "gauge" => Some(Self::Gauge),
            "timing" => Some(Self::Timing),
            _ => None,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Count => "c",
            Self::Gauge => "g",
            Self::Timing => "ms",
        }
    }
}

/// 메트릭 값 — 리터럴 숫자이거나 파서 필드 참조
#[derive(Debug, Clone)]
enum MetricValue {
    Literal(f64),
    FieldRef(String),
}

/// processParams에서 해석된 단일 메트릭 명세
#[derive(Debug, Clone)]
struct MetricSpec {
    kind: MetricKind,
    key: String,
    value: MetricValue,
}

/// setUp에서 획득하고 stop에서 해제하는 상태
#[derive(Debug)]
struct StatsdState {
    socket: UdpSocket,
    prefix: String,
    debug: bool,
}

/// StatsD 프로세서 — 추출된 필드를 UDP 메트릭으로 변환합니다.
#[derive(Debug, Default)]
pub struct StatsdProcessor {
    state: Mutex<Option<StatsdState>>,
}

impl StatsdProcessor {
    /// 새 프로세서를 생성합니다. 소켓은 setUp에서 연결됩니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// `#field#` 플레이스홀더 이름을 추출합니다.
    ///
    /// '#' 개수가 홀수이거나 빈 플레이스홀더가 있으면 에러입니다.
    fn placeholders(template: &str) -> Result<Vec<String>, String> {
        let segments: Vec<&str> = template.split('#').collect();
        if segments.len() % 2 == 0 {
            return Err(format!("unbalanced '#' in metric key '{template}'"));
        }

        let mut names = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            if i % 2 == 1 {
                if segment.is_empty() {
                    return Err(format!("empty placeholder in metric key '{template}'"));
                }
                names.push((*segment).to_owned());
            }
        }
        Ok(names)
    }

    /// 플레이스홀더를 필드 값으로 치환합니다.
    fn substitute(template: &str, fields: &FieldMap) -> String {
        let mut out = String::with_capacity(template.len());
        for (i, segment) in template.split('#').enumerate() {
            if i % 2 == 1 {
                match fields.get(segment) {
                    Some(value) => out.push_str(value),
                    None => warn!(field = segment, "placeholder field missing at dispatch"),
                }
            } else {
                out.push_str(segment);
            }
        }
        out
    }

    /// processParams의 `metrics` 목록을 해석합니다.
    fn parse_metrics(params: &Params) -> Result<Vec<MetricSpec>, String> {
        let entries = params
            .get("metrics")
            .and_then(Value::as_array)
            .ok_or_else(|| "option 'metrics' must be a non-empty list".to_owned())?;
        if entries.is_empty() {
            return Err("option 'metrics' must be a non-empty list".to_owned());
        }

        let mut specs = Vec::with_capacity(entries.len());
        for entry in entries {
            let obj = entry
                .as_object()
                .ok_or_else(|| "each metric must be an object".to_owned())?;

            let kind_raw = obj
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| "metric is missing 'type'".to_owned())?;
            let kind = MetricKind::from_str(kind_raw).ok_or_else(|| {
                format!("unknown metric type '{kind_raw}' (expected count, gauge or timing)")
            })?;

            let key = obj
                .get("key")
                .and_then(Value::as_str)
                .ok_or_else(|| "metric is missing 'key'".to_owned())?
                .to_owned();

            let value = match obj.get("value") {
                Some(Value::Number(n)) => MetricValue::Literal(n.as_f64().unwrap_or(0.0)),
                Some(Value::String(s)) => {
                    let name = s
                        .strip_prefix('#')
                        .and_then(|rest| rest.strip_suffix('#'))
                        .filter(|name| !name.is_empty() && !name.contains('#'))
                        .ok_or_else(|| {
                            format!("metric value '{s}' must be a number or a '#field#' reference")
                        })?;
                    MetricValue::FieldRef(name.to_owned())
                }
                _ => return Err(format!("metric '{key}' is missing a numeric or field value")),
            };

            specs.push(MetricSpec { kind, key, value });
        }
        Ok(specs)
    }

    /// 숫자를 StatsD 표기로 포매팅합니다 (정수는 소수점 없이).
    fn format_value(value: f64) -> String {
        if value.fract() == 0.0 {
            format!("{}", value as i64)
        } else {
            format!("{value}")
        }
    }
}

impl Module for StatsdProcessor {
    fn schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .with(ConfigOption::optional(
                "host",
                OptionKind::String,
                json!("127.0.0.1"),
                "statsd server host",
            ))
            .with(ConfigOption::optional(
                "port",
                OptionKind::Integer,
                json!(8125),
                "statsd server port",
            ))
            .with(ConfigOption::optional(
                "prefix",
                OptionKind::String,
                json!(""),
                "prefix prepended to every metric key",
            ))
    }

    fn set_up(&self, params: &Params, debug: bool) -> Result<(), ConfigError> {
        let host = params
            .get("host")
            .and_then(Value::as_str)
            .unwrap_or("127.0.0.1");
        let port = params.get("port").and_then(Value::as_i64).unwrap_or(8125) as u16;
        let prefix = params
            .get("prefix")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_owned();

        let socket = UdpSocket::bind("0.0.0.0:0")
            .and_then(|s| s.connect((host, port)).map(|()| s))
            .map_err(|e| ConfigError::SetupFailed {
                module: "statsd".to_owned(),
                reason: format!("udp socket to {host}:{port}: {e}"),
            })?;

        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return Err(ConfigError::DoubleSetup {
                module: "statsd".to_owned(),
            });
        }
        *guard = Some(StatsdState {
            socket,
            prefix,
            debug,
        });
        Ok(())
    }

    fn description(&self) -> &'static str {
        "sends counters, gauges and timers to a statsd server over UDP"
    }
}

impl Processor for StatsdProcessor {
    fn process(&self, fields: &FieldMap, params: &Params) -> Result<(), ProcessError> {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = guard.as_ref().ok_or_else(|| ProcessError::NotReady {
            processor: "statsd".to_owned(),
        })?;

        let specs = match Self::parse_metrics(params) {
            Ok(specs) => specs,
            Err(reason) => {
                // 설정 시점에 검증된 바인딩이므로 정상 경로에서는 도달하지 않습니다
                warn!(reason = reason.as_str(), "malformed processParams at dispatch, skipping");
                return Ok(());
            }
        };

        let mut lines = Vec::with_capacity(specs.len());
        for spec in &specs {
            let value = match &spec.value {
                MetricValue::Literal(v) => *v,
                MetricValue::FieldRef(field) => {
                    let Some(raw) = fields.get(field) else {
                        warn!(field = field.as_str(), "value field missing at dispatch, skipping metric");
                        continue;
                    };
                    match raw.parse::<f64>() {
                        Ok(v) => v,
                        Err(_) => {
                            warn!(
                                field = field.as_str(),
                                value = raw.as_str(),
                                "non-numeric metric value, skipping"
                            );
                            continue;
                        }
                    }
                }
            };

            let key = Self::substitute(&spec.key, fields);
            let full_key = if state.prefix.is_empty() {
                key
            } else if state.prefix.ends_with('.') {
                format!("{}{key}", state.prefix)
            } else {
                format!("{}.{key}", state.prefix)
            };

            lines.push(format!(
                "{full_key}:{}|{}",
                Self::format_value(value),
                spec.kind.suffix()
            ));
        }

        if lines.is_empty() {
            return Ok(());
        }

        let datagram = lines.join("\n");
        if state.debug {
            debug!(datagram = datagram.as_str(), "sending statsd datagram");
        }
        state.socket.send(datagram.as_bytes())?;
        Ok(())
    }

    fn stop(&self) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            debug!("statsd processor stopped, socket released");
        }
    }

    fn validate_processor_params(
        &self,
        output_keys: &[String],
        params: &Params,
    ) -> Result<(), ConfigError> {
        let specs = Self::parse_metrics(params)
            .map_err(|reason| ConfigError::InvalidProcessParams { reason })?;

        for spec in &specs {
            let names = Self::placeholders(&spec.key)
                .map_err(|reason| ConfigError::InvalidProcessParams { reason })?;
            for name in names {
                if !output_keys.contains(&name) {
                    return Err(ConfigError::InvalidProcessParams {
                        reason: format!(
                            "metric key '{}' references '{name}', which the parser does not produce",
                            spec.key
                        ),
                    });
                }
            }

            if let MetricValue::FieldRef(field) = &spec.value {
                if !output_keys.contains(field) {
                    return Err(ConfigError::InvalidProcessParams {
                        reason: format!(
                            "metric value references '{field}', which the parser does not produce"
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}
