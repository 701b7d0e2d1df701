use serde::{Deserialize, Serialize};

/// Payload of `video/getVideoInfo`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMedia {
    #[serde(default)]
    pub video_src: Option<String>,
    /// Cover image of the video
    #[serde(default)]
    pub image_src: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image_atlas: Option<Vec<String>>,
}

/// Platform badge shown under the banner
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformIcon {
    pub name: String,
    #[serde(default)]
    pub img_path: Option<String>,
}

/// Payload of `wx/initConfig`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitConfig {
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub top_mini_title: Option<String>,
    #[serde(default)]
    pub top_mini_img: Option<String>,
    #[serde(default)]
    pub top_mini_app_id: Option<String>,
    #[serde(default)]
    pub top_mini_path: Option<String>,
    #[serde(default)]
    pub video_icon: Vec<PlatformIcon>,
}

/// Payload of a successful `wx/signIn`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInData {
    #[serde(default, alias = "signInSum")]
    pub sign_count: Option<i64>,
    #[serde(default)]
    pub continuous_sign_days: Option<i64>,
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub today_signin: Option<bool>,
    #[serde(default)]
    pub reward_points: Option<i64>,
}

/// One past resolution, as the backend stores it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub video_title: Option<String>,
    #[serde(default)]
    pub parsed_video_url: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    /// JSON-encoded list of image URLs
    #[serde(default)]
    pub image_atlas: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    /// 0 in progress, 1 resolved, 2 failed
    #[serde(default)]
    pub parse_status: Option<i32>,
    #[serde(default)]
    pub fail_reason: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
}

/// Payload of `video/getParsingInfo`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    #[serde(default)]
    pub records: Vec<HistoryRecord>,
    #[serde(default)]
    pub retention_minutes: Option<i64>,
    #[serde(default)]
    pub total_count: Option<i64>,
}

/// Payload of `video/getSupportedPlatforms`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformList {
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}
