#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`powershell`]: `Get-WinEvent` 프로세스 실행 및 타임아웃 처리
//! - [`record`]: JSON 출력 -> [`EventRecord`](logward_core::types::EventRecord) 디코딩

pub mod powershell;
pub mod record;

// --- 주요 타입 re-export ---

pub use powershell::PowerShellSource;
pub use record::{WinEventDto, decode_events};
