//! 필터 표현식 검증 -- 안전 서브셋 강제
//!
//! [`FilterValidator`]는 호출자가 제공한 XPath 필터를 안전한 문법
//! 서브셋으로 제한합니다. 검사는 선언된 순서대로 수행됩니다:
//!
//! 1. 부재/공백 입력 -> "필터 없음" (에러 아님)
//! 2. 길이 한도
//! 3. 차단 구문 blocklist (대소문자 무시, 위반 전부 수집)
//! 4. 문자 whitelist (blocklist와 독립적으로 검사)
//! 5. 괄호 균형 및 중첩 깊이
//! 6. 술어 개수
//!
//! 검증은 입력을 고치지 않습니다 -- trim 외에는 수정 없이
//! 수락하거나 거부할 뿐입니다. blocklist 정규식은 최초 사용 시
//! 한 번만 컴파일됩니다.

use std::sync::LazyLock;

use regex::Regex;

use logward_core::config::QueryLimits;
use logward_core::types::FilterExpression;

use crate::error::QueryGuardError;

/// 차단 구문 규칙 -- 패턴과 위반 설명
struct BlockedConstruct {
    pattern: Regex,
    description: &'static str,
}

/// 차단 구문 테이블 (선언 순서대로 검사)
///
/// denylist이므로 여기에 없는 구문은 암묵적으로 허용됩니다.
/// 문자 whitelist가 두 번째 방어선입니다.
static BLOCKLIST: LazyLock<Vec<BlockedConstruct>> = LazyLock::new(|| {
    let rule = |pattern: &str, description: &'static str| BlockedConstruct {
        pattern: Regex::new(pattern).expect("blocklist pattern must compile"),
        description,
    };
    vec![
        rule(r"(?i)document\s*\(", "external document access (document())"),
        rule(
            r"(?i)\b(substring|concat|contains|starts-with|string-length|string|normalize-space|translate)\s*\(",
            "string function call",
        ),
        rule(
            r"(?i)\b(true|false|not|boolean|lang)\s*\(",
            "boolean function call",
        ),
        rule(
            r"(?i)\b(count|sum|floor|ceiling|round|number)\s*\(",
            "numeric function call",
        ),
        rule(
            r"(?i)\b(id|name|local-name|namespace-uri|position|last)\s*\(",
            "node-set function call",
        ),
        rule(
            r"(?i)\b(comment|processing-instruction|text|node)\s*\(",
            "node test",
        ),
        rule(r"\$\s*[A-Za-z_]", "variable reference"),
        rule(
            r"(?i)\b(namespace|preceding-sibling|following-sibling|preceding|following|ancestor-or-self|descendant-or-self|ancestor|descendant)\s*::",
            "restricted axis",
        ),
        rule(r"\.\.", "parent traversal (..)"),
        rule(r#"['"]\s*\]\s*\["#, "quote followed by predicate break"),
        rule(r"--", "comment marker (--)"),
        rule(r"/\*", "comment opener (/*)"),
    ]
});

/// whitelist에 포함된 문자인지 검사합니다.
///
/// ASCII 문자/숫자, 대괄호, 소괄호, `@ * / - . = < > !`, 따옴표 두 종류,
/// `:`, `,`, 공백류만 허용됩니다.
fn is_whitelisted(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '[' | ']'
                | '('
                | ')'
                | '@'
                | '*'
                | '/'
                | '-'
                | '.'
                | '='
                | '<'
                | '>'
                | '!'
                | '\''
                | '"'
                | ':'
                | ','
                | ' '
                | '\t'
                | '\r'
                | '\n'
        )
}

/// 필터 표현식 검증기
pub struct FilterValidator;

impl FilterValidator {
    /// 필터 입력을 검증하여 [`FilterExpression`]을 반환합니다.
    ///
    /// 부재하거나 trim 후 비어 있는 입력은 "필터 없음"(`Ok(None)`)입니다.
    /// 유효한 입력은 trim된 상태 그대로, 수정 없이 반환됩니다.
    pub fn validate(
        input: Option<&str>,
        limits: &QueryLimits,
    ) -> Result<Option<FilterExpression>, QueryGuardError> {
        let Some(raw) = input else {
            return Ok(None);
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        // 길이 한도
        if trimmed.chars().count() > limits.max_filter_length {
            return Err(QueryGuardError::FilterTooComplex {
                reason: format!(
                    "filter length {} exceeds limit {}",
                    trimmed.chars().count(),
                    limits.max_filter_length
                ),
            });
        }

        // blocklist 검사: 위반을 전부 수집합니다
        let reasons: Vec<String> = BLOCKLIST
            .iter()
            .filter(|construct| construct.pattern.is_match(trimmed))
            .map(|construct| construct.description.to_owned())
            .collect();
        if !reasons.is_empty() {
            return Err(QueryGuardError::FilterRejected { reasons });
        }

        // 문자 whitelist 검사 (blocklist와 독립)
        if let Some(bad) = trimmed.chars().find(|c| !is_whitelisted(*c)) {
            return Err(QueryGuardError::FilterRejected {
                reasons: vec![format!("disallowed character {bad:?}")],
            });
        }

        // 괄호 균형 및 중첩 깊이
        let mut depth: u32 = 0;
        let mut max_depth: u32 = 0;
        for c in trimmed.chars() {
            match c {
                '[' => {
                    depth += 1;
                    max_depth = max_depth.max(depth);
                }
                ']' => {
                    if depth == 0 {
                        return Err(QueryGuardError::FilterRejected {
                            reasons: vec!["unbalanced brackets: ']' without '['".to_owned()],
                        });
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(QueryGuardError::FilterRejected {
                reasons: vec!["unbalanced brackets: unclosed '['".to_owned()],
            });
        }
        if max_depth > limits.max_filter_depth {
            return Err(QueryGuardError::FilterTooComplex {
                reason: format!(
                    "nesting depth {max_depth} exceeds limit {}",
                    limits.max_filter_depth
                ),
            });
        }

        // 술어 개수
        let predicates = trimmed.chars().filter(|c| *c == '[').count() as u32;
        if predicates > limits.max_filter_predicates {
            return Err(QueryGuardError::FilterTooComplex {
                reason: format!(
                    "predicate count {predicates} exceeds limit {}",
                    limits.max_filter_predicates
                ),
            });
        }

        Ok(Some(FilterExpression::from_validated(trimmed.to_owned())))
    }
}
