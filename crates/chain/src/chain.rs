//! 모듈 체인 — 라인 디스패치와 핫 설정 업데이트의 최상위 오케스트레이터
//!
//! [`ModuleChain`]은 레지스트리를 소유하며 세 가지 연산을 제공합니다:
//!
//! - [`update_config`](ModuleChain::update_config): 다음 모듈 세트를
//!   완전히 빌드/검증한 뒤 원자적으로 커밋. 새 모듈 setUp, 퇴역 모듈
//!   stop. 어떤 실패에서든 이전 레지스트리는 보존됩니다.
//! - [`handle`](ModuleChain::handle): first-match + run-always 규칙으로
//!   라인 한 줄을 디스패치.
//! - [`stop`](ModuleChain::stop): 셧다운 시 전체 프로세서 정지.
//!
//! # 동시성
//! 체인은 단일 스레드 협조 모델입니다. `handle`과 `update_config`는
//! 같은 소유자 위에서 직렬화되어야 하며, 데몬은 하나의 select 루프가
//! 체인을 소유하는 것으로 이를 보장합니다.

use std::sync::Arc;

use metrics::counter;
use serde_json::Value;
use tracing::{debug, info, trace};

use logyard_core::config::ChainConfig;
use logyard_core::error::{ConfigError, ProcessError};
use logyard_core::module::{Params, Processor};

use crate::factory::{ModuleFactory, ProcessorSpec};
use crate::processor::CompositeProcessor;
use crate::registry::{ModuleRegistry, ParserEntry, ProcessorBinding, ProcessorSlot};

/// 커밋 대기 중인 프로세서
struct PendingProcessor {
    slot: ProcessorSlot,
    /// setUp에 전달할 해석된 옵션
    params: Params,
    /// 이전 레지스트리의 인스턴스를 재사용하는 경우 (setUp 생략)
    reused: bool,
}

/// 2차 패스에서 해석을 기다리는 composite
struct PendingComposite {
    name: String,
    children: Vec<String>,
    /// 선언 순서상의 위치 (레지스트리 테이블 순서 복원용)
    position: usize,
}

/// 모듈 체인
pub struct ModuleChain {
    factory: ModuleFactory,
    registry: ModuleRegistry,
}

impl ModuleChain {
    /// 주어진 팩토리로 빈 체인을 생성합니다.
    pub fn new(factory: ModuleFactory) -> Self {
        Self {
            factory,
            registry: ModuleRegistry::new(),
        }
    }

    /// 내장 클래스 팩토리로 빈 체인을 생성합니다.
    pub fn with_defaults() -> Self {
        Self::new(ModuleFactory::with_defaults())
    }

    /// 현재 레지스트리에 대한 불변 참조를 반환합니다.
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// 설정을 적용합니다.
    ///
    /// 다음 세트를 완전히 빌드/검증한 뒤에만 커밋합니다. 에러 반환 시
    /// 이전 레지스트리는 그대로 유지됩니다. debug 플래그는 모든 setUp에
    /// 전달됩니다.
    pub fn update_config(
        &mut self,
        config: &ChainConfig,
        debug: bool,
    ) -> Result<(), ConfigError> {
        // ── 2. 다음 프로세서 세트 빌드 (1차: leaf, 2차: composite) ──
        let mut pending: Vec<Option<PendingProcessor>> = Vec::new();
        let mut composites: Vec<PendingComposite> = Vec::new();
        let mut declared: Vec<String> = Vec::new();

        for (name, fragment) in &config.processors {
            match self.factory.create_processor(name, fragment)? {
                None => {
                    debug!(processor = name.as_str(), "processor disabled, skipping");
                }
                Some(ProcessorSpec::Leaf { module, params }) => {
                    declared.push(name.clone());
                    // 같은 이름의 leaf가 살아있으면 그 인스턴스를 유지합니다.
                    // 이름이 모듈의 정체성이며, 생존 모듈은 재setUp되지 않습니다.
                    let (module, reused) = match self.registry.get_processor(name) {
                        Some(prev) if !prev.composite => (Arc::clone(&prev.module), true),
                        _ => (module, false),
                    };
                    pending.push(Some(PendingProcessor {
                        slot: ProcessorSlot {
                            name: name.clone(),
                            module,
                            composite: false,
                        },
                        params,
                        reused,
                    }));
                }
                Some(ProcessorSpec::Composite { children }) => {
                    declared.push(name.clone());
                    composites.push(PendingComposite {
                        name: name.clone(),
                        children,
                        position: pending.len(),
                    });
                    // 자리 표시: 해석 후 채워집니다
                    pending.push(None);
                }
            }
        }

        self.resolve_composites(&mut pending, composites, &declared)?;

        let pending: Vec<PendingProcessor> = pending.into_iter().flatten().collect();
        let next_slots: Vec<ProcessorSlot> = pending.iter().map(|p| p.slot.clone()).collect();

        // ── 3. 다음 파서 세트 빌드 + 바인딩 검증 ──
        let next_parsers = self.build_parsers(config, &next_slots, debug)?;

        // ── 5. 커밋: 새 인스턴스 setUp (실패 시 롤백), 퇴역 인스턴스 stop ──
        let mut set_up_done: Vec<&PendingProcessor> = Vec::new();
        for entry in &pending {
            if entry.reused {
                continue;
            }
            if let Err(e) = entry.slot.module.set_up(&entry.params, debug) {
                for done in set_up_done {
                    done.slot.module.stop();
                }
                return Err(ConfigError::SetupFailed {
                    module: entry.slot.name.clone(),
                    reason: e.to_string(),
                });
            }
            set_up_done.push(entry);
        }

        // ── 4. 퇴역 세트: 다음 세트에 인스턴스가 살아남지 못한 프로세서 ──
        for slot in self.registry.retired(&next_slots) {
            debug!(processor = slot.name.as_str(), "retiring processor");
            slot.module.stop();
        }

        self.registry = ModuleRegistry::from_parts(next_parsers, next_slots);
        counter!("logyard_config_updates_total").increment(1);
        info!(
            parsers = self.registry.parser_count(),
            processors = self.registry.processor_count(),
            "configuration applied"
        );
        Ok(())
    }

    /// composite들을 고정점 방식으로 해석합니다.
    ///
    /// 매 회전마다 자식이 모두 준비된 composite를 해석하고, 회전이
    /// 진전 없이 끝나면 남은 composite를 미지 참조 또는 순환으로
    /// 분류해 에러를 반환합니다.
    fn resolve_composites(
        &self,
        pending: &mut [Option<PendingProcessor>],
        mut waiting: Vec<PendingComposite>,
        declared: &[String],
    ) -> Result<(), ConfigError> {
        let mut ready: Vec<ProcessorSlot> = pending
            .iter()
            .flatten()
            .map(|p| p.slot.clone())
            .collect();

        while !waiting.is_empty() {
            let mut still_waiting = Vec::new();
            let mut progress = false;

            for composite in waiting {
                let resolvable = composite
                    .children
                    .iter()
                    .all(|child| ready.iter().any(|slot| &slot.name == child));
                if !resolvable {
                    still_waiting.push(composite);
                    continue;
                }

                let module: Arc<dyn Processor> = Arc::new(CompositeProcessor::resolve(
                    &composite.name,
                    &composite.children,
                    &ready,
                )?);
                let slot = ProcessorSlot {
                    name: composite.name,
                    module,
                    composite: true,
                };
                ready.push(slot.clone());
                pending[composite.position] = Some(PendingProcessor {
                    slot,
                    params: Params::new(),
                    reused: false,
                });
                progress = true;
            }

            if !progress {
                // 정체: 첫 번째 미해석 composite 기준으로 원인을 분류합니다
                let stuck = &still_waiting[0];
                for child in &stuck.children {
                    if !declared.contains(child) {
                        return Err(ConfigError::UnknownProcessor {
                            module: stuck.name.clone(),
                            processor: child.clone(),
                        });
                    }
                }
                return Err(ConfigError::CompositeCycle {
                    module: stuck.name.clone(),
                });
            }
            waiting = still_waiting;
        }

        Ok(())
    }

    /// 파서 세트를 빌드합니다. 파서는 매 업데이트마다 새 인스턴스로
    /// 재구성되며, 바인딩 검증에 `output_keys()`가 필요하므로 setUp을
    /// 이 단계에서 수행합니다 (파서는 stop 훅이 없어 중단 시에도
    /// 해제할 자원이 없습니다).
    fn build_parsers(
        &self,
        config: &ChainConfig,
        next_slots: &[ProcessorSlot],
        debug: bool,
    ) -> Result<Vec<ParserEntry>, ConfigError> {
        let mut entries = Vec::new();

        for (name, fragment) in &config.parsers {
            let Some((parser, params)) = self.factory.create_parser(name, fragment)? else {
                debug!(parser = name.as_str(), "parser disabled, skipping");
                continue;
            };

            parser
                .set_up(&params, debug)
                .map_err(|e| ConfigError::SetupFailed {
                    module: name.clone(),
                    reason: e.to_string(),
                })?;

            let (processor_name, process_params) = Self::binding_of(name, fragment)?;

            let slot = next_slots
                .iter()
                .find(|s| s.name == processor_name)
                .ok_or_else(|| ConfigError::UnknownProcessor {
                    module: name.clone(),
                    processor: processor_name.clone(),
                })?;

            slot.module
                .validate_processor_params(&parser.output_keys(), &process_params)
                .map_err(|e| ConfigError::InvalidBinding {
                    parser: name.clone(),
                    processor: processor_name.clone(),
                    reason: e.to_string(),
                })?;

            entries.push(ParserEntry {
                name: name.clone(),
                parser,
                binding: ProcessorBinding {
                    processor_name,
                    processor: Arc::clone(&slot.module),
                    process_params,
                },
            });
        }

        Ok(entries)
    }

    /// 파서 조각에서 바인딩 키를 읽습니다.
    fn binding_of(name: &str, fragment: &Value) -> Result<(String, Params), ConfigError> {
        let obj = fragment
            .as_object()
            .ok_or_else(|| ConfigError::InvalidFragment {
                module: name.to_owned(),
            })?;

        let processor = obj
            .get("processor")
            .and_then(Value::as_str)
            .ok_or_else(|| ConfigError::MissingOption {
                module: name.to_owned(),
                option: "processor".to_owned(),
            })?
            .to_owned();

        let process_params = match obj.get("processParams") {
            None => Params::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(ConfigError::InvalidOption {
                    module: name.to_owned(),
                    option: "processParams".to_owned(),
                    reason: "expected map".to_owned(),
                });
            }
        };

        Ok((processor, process_params))
    }

    /// 라인 한 줄을 디스패치합니다.
    ///
    /// 삽입 순서대로 파서를 순회하며 첫 매치에서 디스패치합니다.
    /// run-always 파서는 앞선 매치와 무관하게 실행되고, first-match
    /// 탐색을 중단시키지 않습니다. 프로세서 에러는 즉시 전파됩니다.
    pub fn handle(&mut self, line: &str) -> Result<(), ProcessError> {
        counter!("logyard_lines_total").increment(1);
        let mut matched = false;

        for entry in self.registry.iter_parsers() {
            let run_always = entry.parser.run_always();
            if matched && !run_always {
                continue;
            }

            let Some(fields) = entry.parser.parse(line) else {
                continue;
            };

            trace!(
                parser = entry.name.as_str(),
                processor = entry.binding.processor_name.as_str(),
                "dispatching line"
            );
            entry
                .binding
                .processor
                .process(&fields, &entry.binding.process_params)?;
            counter!("logyard_dispatches_total").increment(1);

            if !run_always {
                matched = true;
            }
        }

        Ok(())
    }

    /// 모든 프로세서를 삽입 순서대로 정지하고 테이블을 비웁니다.
    pub fn stop(&mut self) {
        info!("stopping module chain");
        self.registry.stop_all();
    }
}
