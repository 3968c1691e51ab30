//! Composite 프로세서
//!
//! 자식 프로세서의 순서 있는 목록을 보유하며, process 호출을 같은
//! 인자로 각 자식에게 순서대로 팬아웃합니다.
//!
//! 자식은 구성 시점에 이름으로 조회되어 직접 참조로 고정됩니다.
//! 이후 `update_config`로 자식이 교체되어도 기존 composite는 다시
//! 배선되지 않습니다 (composite 자체가 매 업데이트마다 재구성됩니다).

use std::sync::Arc;

use serde_json::Value;

use logyard_core::error::{ConfigError, ProcessError};
use logyard_core::module::{
    ConfigOption, ConfigSchema, FieldMap, Module, OptionKind, Params, Processor,
};

use crate::registry::ProcessorSlot;

/// Composite 프로세서 — 자식 목록에 순서대로 팬아웃합니다.
#[derive(Debug)]
pub struct CompositeProcessor {
    /// (이름, 해석된 참조) 쌍, 선언 순서
    children: Vec<(String, Arc<dyn Processor>)>,
}

impl CompositeProcessor {
    /// 자식 이름을 현재 빌드 중인 프로세서 세트에서 해석하여
    /// composite를 구성합니다.
    ///
    /// 등록되지 않은 자식 -> [`ConfigError::UnknownProcessor`].
    /// 자식 참조는 이 시점에 고정되며, 순환은 표현 자체가 불가능합니다
    /// (자식은 이미 완성된 인스턴스여야 하므로). 순환 선언은 체인의
    /// composite 해석 패스가 정체되는 것으로 감지됩니다.
    pub fn resolve(
        name: &str,
        child_names: &[String],
        available: &[ProcessorSlot],
    ) -> Result<Self, ConfigError> {
        let mut children = Vec::with_capacity(child_names.len());
        for child in child_names {
            let slot = available
                .iter()
                .find(|s| &s.name == child)
                .ok_or_else(|| ConfigError::UnknownProcessor {
                    module: name.to_owned(),
                    processor: child.clone(),
                })?;
            children.push((child.clone(), Arc::clone(&slot.module)));
        }
        Ok(Self { children })
    }

    /// 설정 스키마 (팩토리가 인스턴스 없이 조각을 검증할 때 사용)
    pub fn config_schema() -> ConfigSchema {
        ConfigSchema::new().with(ConfigOption::required(
            "processors",
            OptionKind::StringList,
            "ordered child processor names",
        ))
    }

    /// 설정 조각에서 자식 이름 목록을 읽습니다.
    pub fn child_names_from(params: &Params) -> Vec<String> {
        params
            .get("processors")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 해석된 자식 이름 목록을 반환합니다.
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl Module for CompositeProcessor {
    fn schema(&self) -> ConfigSchema {
        Self::config_schema()
    }

    fn set_up(&self, _params: &Params, _debug: bool) -> Result<(), ConfigError> {
        // 자식은 레지스트리가 소유하고 개별적으로 setUp됩니다
        Ok(())
    }

    fn description(&self) -> &'static str {
        "fans each process call out to an ordered list of child processors"
    }
}

impl Processor for CompositeProcessor {
    fn process(&self, fields: &FieldMap, params: &Params) -> Result<(), ProcessError> {
        // 자식 에러는 잡지 않습니다. 첫 에러가 팬아웃을 중단하고 전파됩니다.
        for (_, child) in &self.children {
            child.process(fields, params)?;
        }
        Ok(())
    }

    fn stop(&self) {
        // 자식은 레지스트리가 소유하고 개별적으로 stop됩니다
    }

    fn validate_processor_params(
        &self,
        output_keys: &[String],
        params: &Params,
    ) -> Result<(), ConfigError> {
        // 자식 계약의 논리곱: 먼저 거부하는 자식이 이깁니다
        for (_, child) in &self.children {
            child.validate_processor_params(output_keys, params)?;
        }
        Ok(())
    }
}
