//! 송신 페이로드 모델과 와이어 포맷.
//!
//! 와이어 본문은 UTF-8 JSON 텍스트:
//! - `{"type":"exercise_data","features":[...]}`
//! - `{"type":"session_end"}`
//! - 임의 JSON 값 (사용자 정의, 봉투 없음)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// 운동 데이터 특징 벡터의 기대 길이
pub const EXPECTED_FEATURE_COUNT: usize = 15;

/// 송신 페이로드
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundPayload {
    /// 운동 특징 벡터
    ExerciseData { features: Vec<f64> },
    /// 세션 종료 신호
    SessionEnd,
    /// 사용자 정의 JSON
    Custom(Value),
}

/// `type` 태그가 붙은 표준 봉투
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
enum Envelope {
    ExerciseData { features: Vec<f64> },
    SessionEnd,
}

impl OutboundPayload {
    /// 사용자 정의 페이로드 텍스트 파싱
    ///
    /// 빈 텍스트와 JSON 파싱 실패를 구분해서 보고한다.
    pub fn custom_from_text(text: &str) -> Result<Self, CoreError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(CoreError::EmptyCustomPayload);
        }
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| CoreError::MalformedCustomPayload(e.to_string()))?;
        Ok(OutboundPayload::Custom(value))
    }

    /// 로그용 짧은 분류명
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundPayload::ExerciseData { .. } => "exercise_data",
            OutboundPayload::SessionEnd => "session_end",
            OutboundPayload::Custom(_) => "custom",
        }
    }

    /// JSON 값으로 변환
    pub fn to_value(&self) -> Result<Value, CoreError> {
        let value = match self {
            OutboundPayload::ExerciseData { features } => {
                serde_json::to_value(Envelope::ExerciseData {
                    features: features.clone(),
                })?
            }
            OutboundPayload::SessionEnd => serde_json::to_value(Envelope::SessionEnd)?,
            OutboundPayload::Custom(value) => value.clone(),
        };
        Ok(value)
    }

    /// 와이어 본문 (압축 JSON)
    pub fn to_wire(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(&self.to_value()?)?)
    }

    /// 디버그 출력용 들여쓰기 JSON
    pub fn to_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }

    /// 와이어 본문 해석
    ///
    /// 표준 봉투와 정확히 일치하면 해당 변형, 아니면 `Custom`.
    pub fn from_wire(body: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(body)?;
        match serde_json::from_value::<Envelope>(value.clone()) {
            Ok(Envelope::ExerciseData { features }) => {
                Ok(OutboundPayload::ExerciseData { features })
            }
            Ok(Envelope::SessionEnd) => Ok(OutboundPayload::SessionEnd),
            Err(_) => Ok(OutboundPayload::Custom(value)),
        }
    }
}

/// 쉼표로 구분된 특징 텍스트 파싱
///
/// 각 토큰의 앞쪽 숫자 부분만 읽는다 (`"0.5kg"` → 0.5).
/// 숫자로 시작하지 않거나 유한하지 않은 토큰은 조용히 버린다.
pub fn parse_features(text: &str) -> Vec<f64> {
    text.split(',')
        .filter_map(leading_number)
        .filter(|v| v.is_finite())
        .collect()
}

/// 토큰 앞부분의 십진 실수 리터럴 (`[+-]digits[.digits][e[+-]digits]`)
fn leading_number(token: &str) -> Option<f64> {
    let s = token.trim_start().as_bytes();
    let digits_from = |mut i: usize| {
        while i < s.len() && s[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(s.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if s.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - end - 1;
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return None;
    }

    if matches!(s.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(s.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    std::str::from_utf8(&s[..end]).ok()?.parse().ok()
}
