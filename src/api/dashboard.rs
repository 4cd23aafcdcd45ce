use axum::Json;
use serde::Serialize;

/// 参照用の調査結果。アップロードとは無関係な固定値。
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct SurveySnapshot {
    name: &'static str,
    positive: u32,
    neutral: u32,
    negative: u32,
    total: u32,
}

impl SurveySnapshot {
    const fn new(name: &'static str, positive: u32, neutral: u32, negative: u32) -> Self {
        Self {
            name,
            positive,
            neutral,
            negative,
            total: positive + neutral + negative,
        }
    }
}

static SURVEYS: [SurveySnapshot; 2] = [
    SurveySnapshot::new("IKN", 633, 387, 452),
    SurveySnapshot::new("Whoosh", 1122, 4270, 2108),
];

#[derive(Debug, Serialize)]
pub(crate) struct DashboardResponse {
    surveys: &'static [SurveySnapshot],
}

pub(crate) async fn snapshot() -> Json<DashboardResponse> {
    Json(DashboardResponse { surveys: &SURVEYS })
}
