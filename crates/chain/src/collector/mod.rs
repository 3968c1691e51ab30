//! 라인 수집 모듈 — 입력 소스에서 라인을 읽어 체인에 공급합니다.
//!
//! 수집기는 자체 tokio 태스크에서 실행되며, 읽어낸 라인을
//! `tokio::mpsc::Sender<String>` 채널로 전달합니다. 체인 쪽에서는
//! 데몬의 select 루프가 채널을 소비하여 `handle`을 호출합니다.
//!
//! 현재 입력 소스는 파일 테일링([`FileTailer`]) 하나입니다.

pub mod file;

pub use file::{FileTailer, FileTailerConfig};
