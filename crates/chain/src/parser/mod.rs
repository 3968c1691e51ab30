//! 내장 파서 — 라인에서 필드를 추출하는 모듈 구현
//!
//! 각 파서는 core의 [`Parser`](logyard_core::module::Parser) trait을
//! 구현합니다. 매치 결과는 예외가 아니라 `Option`입니다.
//!
//! # 내장 구현
//! - [`RegexParser`]: 명명 캡처 그룹을 필드로 추출
//! - [`PassThruParser`]: 라인 전체를 `"line"` 키로 통과

pub mod passthru;
pub mod regex;

pub use passthru::PassThruParser;
pub use regex::RegexParser;
