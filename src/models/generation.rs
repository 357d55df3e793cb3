use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Clothing theme selector exposed to clients.
///
/// Closed enum: any other value is rejected at deserialization time rather
/// than silently falling through to a default category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Theme {
    #[serde(rename = "Top Wear")]
    TopWear,
    #[serde(rename = "Bottom Wear")]
    BottomWear,
}

/// The upstream prediction API's clothing vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ClothingCategory {
    Topwear,
    Bottomwear,
}

impl Theme {
    /// Total mapping from the client-facing theme to the upstream category.
    pub fn clothing(self) -> ClothingCategory {
        match self {
            Theme::TopWear => ClothingCategory::Topwear,
            Theme::BottomWear => ClothingCategory::Bottomwear,
        }
    }
}

/// POST /generate request body. Consumed at submission time, never persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub image_url: String,
    pub theme: Theme,
    pub prompt: String,
}

/// POST /generate response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub job_id: Uuid,
}
