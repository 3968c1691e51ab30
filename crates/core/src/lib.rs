//! Logyard 공통 크레이트 — 모듈 계약, 설정 문서 모델, 에러
//!
//! # 모듈 구성
//!
//! - [`module`]: [`Parser`]/[`Processor`] trait과 설정 스키마
//! - [`config`]: 체인 설정 문서 ([`ChainConfig`])
//! - [`error`]: 도메인 에러 타입
//!
//! 체인 구현과 내장 모듈은 `logyard-chain` 크레이트에 있습니다.

pub mod config;
pub mod error;
pub mod module;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, LogyardError, ProcessError};

// 설정
pub use config::ChainConfig;

// 모듈 계약
pub use module::{ConfigOption, ConfigSchema, FieldMap, Module, OptionKind, Params, Parser, Processor};
