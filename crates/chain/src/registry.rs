//! 모듈 레지스트리 — 살아있는 파서/프로세서의 이름 기반 테이블
//!
//! 두 테이블 모두 삽입 순서를 보존합니다. 파서 테이블의 삽입 순서가
//! 곧 디스패치 순서입니다.
//!
//! 퇴역(retire) 판정은 이름이 아니라 인스턴스 동일성(`Arc::ptr_eq`)으로
//! 수행합니다. 이름이 유지되어 인스턴스가 재사용된 프로세서는 퇴역하지
//! 않고, 같은 이름이라도 인스턴스가 교체되면 (예: leaf가 composite로
//! 바뀐 경우) 이전 인스턴스는 퇴역합니다.

use std::sync::Arc;

use tracing::debug;

use logyard_core::module::{Params, Parser, Processor};

/// 레지스트리에 등록된 프로세서 슬롯
#[derive(Clone)]
pub struct ProcessorSlot {
    /// 사용자 지정 고유 이름
    pub name: String,
    /// 프로세서 인스턴스 (composite가 참조를 공유할 수 있음)
    pub module: Arc<dyn Processor>,
    /// composite 여부 — leaf만 업데이트를 가로질러 인스턴스를 재사용할
    /// 수 있으므로 체인이 이 플래그로 형태 변화를 감지합니다
    pub composite: bool,
}

/// 파서에 부착된 바인딩 — 디스패치 대상 프로세서와 processParams
pub struct ProcessorBinding {
    /// 설정에 선언된 프로세서 이름 (진단용)
    pub processor_name: String,
    /// 커밋 시점에 해석된 직접 참조 (라인마다 이름 조회를 하지 않음)
    pub processor: Arc<dyn Processor>,
    /// 디스패치 시 프로세서에 전달되는 파라미터
    pub process_params: Params,
}

/// 레지스트리에 등록된 파서 항목
pub struct ParserEntry {
    /// 사용자 지정 고유 이름
    pub name: String,
    /// 파서 인스턴스
    pub parser: Box<dyn Parser>,
    /// 바인딩된 프로세서
    pub binding: ProcessorBinding,
}

/// 모듈 레지스트리
///
/// 체인이 소유하며, `update_config`가 테이블 전체를 원자적으로
/// 교체합니다.
#[derive(Default)]
pub struct ModuleRegistry {
    parsers: Vec<ParserEntry>,
    processors: Vec<ProcessorSlot>,
}

impl ModuleRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 빌드가 끝난 테이블로 레지스트리를 구성합니다.
    pub fn from_parts(parsers: Vec<ParserEntry>, processors: Vec<ProcessorSlot>) -> Self {
        Self {
            parsers,
            processors,
        }
    }

    /// 이름으로 파서를 조회합니다.
    pub fn get_parser(&self, name: &str) -> Option<&ParserEntry> {
        self.parsers.iter().find(|e| e.name == name)
    }

    /// 이름으로 프로세서를 조회합니다.
    pub fn get_processor(&self, name: &str) -> Option<&ProcessorSlot> {
        self.processors.iter().find(|s| s.name == name)
    }

    /// 프로세서 등록 여부를 반환합니다.
    pub fn has_processor(&self, name: &str) -> bool {
        self.get_processor(name).is_some()
    }

    /// 파서를 삽입 순서대로 순회합니다.
    pub fn iter_parsers(&self) -> impl Iterator<Item = &ParserEntry> {
        self.parsers.iter()
    }

    /// 프로세서를 삽입 순서대로 순회합니다.
    pub fn iter_processors(&self) -> impl Iterator<Item = &ProcessorSlot> {
        self.processors.iter()
    }

    /// 등록된 파서 수를 반환합니다.
    pub fn parser_count(&self) -> usize {
        self.parsers.len()
    }

    /// 등록된 프로세서 수를 반환합니다.
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    /// 다음 프로세서 세트에 살아남지 못한 슬롯을 반환합니다.
    ///
    /// 인스턴스 동일성 기준입니다. 반환 순서는 삽입 순서이며,
    /// 이것이 곧 stop 호출 순서입니다.
    pub fn retired(&self, next: &[ProcessorSlot]) -> Vec<&ProcessorSlot> {
        self.processors
            .iter()
            .filter(|old| !next.iter().any(|n| Arc::ptr_eq(&n.module, &old.module)))
            .collect()
    }

    /// 모든 프로세서를 삽입 순서대로 정지하고 테이블을 비웁니다.
    ///
    /// 개별 stop 실패 여부와 무관하게 끝까지 진행합니다 (stop은
    /// 실패를 내부에서 로그로 처리합니다).
    pub fn stop_all(&mut self) {
        for slot in &self.processors {
            debug!(processor = slot.name.as_str(), "stopping processor");
            slot.module.stop();
        }
        self.processors.clear();
        self.parsers.clear();
    }
}
