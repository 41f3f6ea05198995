//! 인시던트 패턴 데이터 타입
//!
//! 패턴 테이블은 순서 있는 불변 slice입니다. 레코드가 여러 패턴에
//! 매칭될 수 있을 때 선언 순서가 tie-break이므로, 순서 없는 맵으로
//! 바꾸면 분류가 비결정적이 됩니다.

use std::fmt;

use serde::{Deserialize, Serialize};

use logward_core::types::IncidentSeverity;

/// 인시던트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    /// 시스템 크래시 (bugcheck, 비정상 재부팅)
    SystemCrash,
    /// 하드웨어 오류 (WHEA)
    HardwareError,
    /// 디스크 장애
    DiskFailure,
    /// 애플리케이션 크래시
    AppCrash,
    /// 서비스 장애
    ServiceFailure,
    /// 런타임 오류 (.NET 등)
    RuntimeFault,
    /// 애플리케이션 행(hang)
    AppHang,
}

impl IncidentKind {
    /// 패턴 이름을 반환합니다.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SystemCrash => "system_crash",
            Self::HardwareError => "hardware_error",
            Self::DiskFailure => "disk_failure",
            Self::AppCrash => "app_crash",
            Self::ServiceFailure => "service_failure",
            Self::RuntimeFault => "runtime_fault",
            Self::AppHang => "app_hang",
        }
    }

    /// 종류에서 심각도를 파생합니다.
    ///
    /// 전체 함수(total function)입니다 -- 새 종류를 추가하면
    /// 심각도를 정하기 전까지 컴파일되지 않습니다.
    pub fn severity(&self) -> IncidentSeverity {
        match self {
            Self::SystemCrash | Self::HardwareError | Self::DiskFailure => {
                IncidentSeverity::Critical
            }
            Self::AppCrash | Self::ServiceFailure | Self::RuntimeFault => IncidentSeverity::High,
            Self::AppHang => IncidentSeverity::Medium,
        }
    }
}

impl fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 인시던트 패턴 -- provider 부분 문자열 목록 + 이벤트 코드 목록
///
/// 둘 중 한쪽 절만 매칭되어도 해당 패턴으로 분류됩니다.
#[derive(Debug, Clone, Copy)]
pub struct IncidentPattern {
    /// 패턴 종류
    pub kind: IncidentKind,
    /// provider 이름 부분 문자열 (대소문자 무시)
    pub providers: &'static [&'static str],
    /// 이벤트 코드 (정확히 일치)
    pub event_codes: &'static [u32],
}

/// 기본 패턴 테이블 (선언 순서 = 분류 우선순위)
pub const PATTERN_TABLE: &[IncidentPattern] = &[
    IncidentPattern {
        kind: IncidentKind::SystemCrash,
        providers: &["Microsoft-Windows-Kernel-Power", "BugCheck"],
        event_codes: &[41, 1001],
    },
    IncidentPattern {
        kind: IncidentKind::HardwareError,
        providers: &["Microsoft-Windows-WHEA-Logger"],
        event_codes: &[17, 18, 19, 20, 47],
    },
    IncidentPattern {
        kind: IncidentKind::DiskFailure,
        providers: &["disk", "Microsoft-Windows-Ntfs"],
        event_codes: &[7, 51, 98, 153],
    },
    IncidentPattern {
        kind: IncidentKind::AppCrash,
        providers: &["Application Error", "Windows Error Reporting"],
        event_codes: &[1000],
    },
    IncidentPattern {
        kind: IncidentKind::ServiceFailure,
        providers: &["Service Control Manager"],
        event_codes: &[7000, 7001, 7023, 7031, 7034],
    },
    IncidentPattern {
        kind: IncidentKind::RuntimeFault,
        providers: &[".NET Runtime"],
        event_codes: &[1026],
    },
    IncidentPattern {
        kind: IncidentKind::AppHang,
        providers: &["Application Hang"],
        event_codes: &[1002],
    },
];
