//! 내장 프로세서 — 추출된 필드를 소비하는 모듈 구현
//!
//! 각 프로세서는 core의 [`Processor`](logyard_core::module::Processor)
//! trait을 구현합니다. 체인 안에서는 `Arc<dyn Processor>`로 공유되며,
//! composite가 자식 참조를 캡처합니다.
//!
//! # 내장 구현
//! - [`ConsoleProcessor`]: 필드/파라미터를 JSON 한 줄로 stdout에 출력
//! - [`StatsdProcessor`]: UDP StatsD 카운터/게이지/타이머 전송
//! - [`CompositeProcessor`]: 자식 프로세서 목록에 순서대로 팬아웃

pub mod composite;
pub mod console;
pub mod statsd;

pub use composite::CompositeProcessor;
pub use console::ConsoleProcessor;
pub use statsd::StatsdProcessor;
