use serde::{Deserialize, Serialize};

/// Issuance instructions for one document category; serialized as-is into
/// the capability result payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureGuide {
    pub document: String,
    pub procedure: String,
}

// Matched in order; the first category contained in the request wins.
const CATEGORY_PROCEDURES: [(&str, &str); 4] = [
    (
        "주민등록등본",
        "신분증을 스캔하고, 수수료를 결제한 뒤 발급 버튼을 눌러주세요.",
    ),
    (
        "가족관계증명서",
        "신분증을 제출하고, 본인 확인 후 발급이 진행됩니다.",
    ),
    (
        "인감증명서",
        "인감도장 및 신분증을 지참 후, 본인 확인 절차를 거쳐 발급받으세요.",
    ),
    (
        "출입국사실증명서",
        "여권 또는 신분증을 스캔하고, 화면 안내에 따라 진행하세요.",
    ),
];

const FALLBACK_PROCEDURE: &str = "해당 민원서류는 센터에서 직접 문의해 주세요.";

pub fn resolve_procedure(document_type: &str) -> ProcedureGuide {
    for (category, procedure) in CATEGORY_PROCEDURES {
        if document_type.contains(category) {
            return ProcedureGuide {
                document: category.to_string(),
                procedure: procedure.to_string(),
            };
        }
    }
    ProcedureGuide {
        document: document_type.to_string(),
        procedure: FALLBACK_PROCEDURE.to_string(),
    }
}
