//! 인시던트 분류 로직 -- 첫 매칭 패턴 선택 및 메시지 필드 추출
//!
//! 레코드는 패턴 테이블을 선언 순서대로 순회하며 분류됩니다.
//! 첫 번째로 매칭된 패턴만 사용되므로, 여러 패턴에 걸치는 레코드도
//! 항상 하나의 인시던트로만 분류됩니다.

use std::sync::LazyLock;

use regex::Regex;

use logward_core::types::{EventRecord, IncidentSignal};

use super::types::IncidentPattern;

/// "Faulting application name: notepad.exe, ..." 형태의 캡처
static FAULTING_APP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)faulting application name:\s*([^,\r\n]+)").expect("extraction regex")
});

/// "Faulting module name: ntdll.dll, ..." 형태의 캡처
static FAULTING_MODULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)faulting module name:\s*([^,\r\n]+)").expect("extraction regex")
});

/// 레코드를 패턴 테이블에 대해 분류합니다.
///
/// provider 부분 문자열(대소문자 무시) 또는 이벤트 코드(정확히 일치)
/// 중 한쪽이라도 매칭되면 해당 패턴입니다. 매칭되는 패턴이 없으면
/// 인시던트가 아니며 `None`을 반환합니다.
pub fn classify(record: &EventRecord, table: &[IncidentPattern]) -> Option<IncidentSignal> {
    let provider_lower = record.provider.to_lowercase();

    let matched = table.iter().find(|pattern| {
        pattern
            .providers
            .iter()
            .any(|p| provider_lower.contains(&p.to_lowercase()))
            || pattern.event_codes.contains(&record.event_id)
    })?;

    Some(IncidentSignal {
        record: record.clone(),
        pattern: matched.kind.name().to_owned(),
        severity: matched.kind.severity(),
        faulting_application: extract_field(&FAULTING_APP, &record.message),
        faulting_module: extract_field(&FAULTING_MODULE, &record.message),
    })
}

/// 메시지에서 캡처 그룹 1을 추출합니다. 매칭 없음은 에러가 아닙니다.
fn extract_field(pattern: &Regex, message: &str) -> Option<String> {
    pattern
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
}
