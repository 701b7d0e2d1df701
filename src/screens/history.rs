use crate::api::{ApiClient, HistoryRecord};
use crate::media::{BatchReport, DownloadState};
use crate::screens::format::{format_datetime, format_relative, parse_backend_time};
use crate::screens::resolver::ensure_https;
use crate::screens::{MediaSaver, Notifier};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{info, warn};

/// Backend progress of a history record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    Pending,
    Resolved,
    Failed,
}

impl ParseStatus {
    #[must_use]
    pub const fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(1) => Self::Resolved,
            Some(2) => Self::Failed,
            _ => Self::Pending,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "解析中",
            Self::Resolved => "解析成功",
            Self::Failed => "解析失败",
        }
    }
}

/// A history record prepared for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: i64,
    pub original_url: String,
    pub title: String,
    pub video_url: Option<String>,
    pub cover: Option<String>,
    pub images: Vec<String>,
    pub platform: Option<String>,
    pub status: ParseStatus,
    pub fail_reason: Option<String>,
    /// `YYYY-MM-DD HH:MM`, or a placeholder when the backend time is missing
    pub created_at: String,
    created: Option<NaiveDateTime>,
}

impl HistoryEntry {
    #[must_use]
    pub fn has_video(&self) -> bool {
        self.video_url.is_some()
    }

    #[must_use]
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// "刚刚" / "N分钟前" / `MM-DD HH:MM` relative to `now`
    #[must_use]
    pub fn relative_time(&self, now: NaiveDateTime) -> Option<String> {
        self.created.map(|at| format_relative(at, now))
    }
}

impl From<HistoryRecord> for HistoryEntry {
    fn from(record: HistoryRecord) -> Self {
        let images = decode_atlas(record.image_atlas.as_deref());
        Self {
            id: record.id.unwrap_or_default(),
            original_url: record.original_url.unwrap_or_default(),
            title: record
                .video_title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "未命名作品".to_string()),
            video_url: record.parsed_video_url.filter(|u| !u.trim().is_empty()),
            cover: record.cover_image_url.filter(|c| !c.is_empty()),
            images,
            platform: record.platform,
            status: ParseStatus::from_code(record.parse_status),
            fail_reason: record.fail_reason,
            created_at: format_datetime(record.create_time.as_deref()),
            created: record.create_time.as_deref().and_then(parse_backend_time),
        }
    }
}

/// Decode the JSON-encoded image list stored with a record; garbage decodes to nothing
#[must_use]
pub fn decode_atlas(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(urls) => urls.into_iter().filter(|u| !u.is_empty()).collect(),
        Err(e) => {
            warn!("Unreadable image list on history record: {}", e);
            Vec::new()
        }
    }
}

/// Past resolutions and re-saving their media
pub struct HistoryScreen {
    api: Arc<ApiClient>,
    saver: Arc<MediaSaver>,
    notifier: Arc<dyn Notifier>,
    entries: Vec<HistoryEntry>,
    retention_minutes: Option<i64>,
}

impl HistoryScreen {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, saver: Arc<MediaSaver>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            saver,
            notifier,
            entries: Vec::new(),
            retention_minutes: None,
        }
    }

    /// Fetch the records. On failure the previous list is kept.
    pub async fn load(&mut self) -> bool {
        match self.api.history().await {
            Ok(page) => {
                self.retention_minutes = page.retention_minutes;
                self.entries = page.records.into_iter().map(HistoryEntry::from).collect();
                info!("Loaded {} history records", self.entries.len());
                true
            }
            Err(e) => {
                warn!("History unavailable: {}", e);
                self.notifier.toast("获取解析记录失败，请稍后重试");
                false
            }
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// How long the backend keeps records, in minutes
    #[must_use]
    pub const fn retention_minutes(&self) -> Option<i64> {
        self.retention_minutes
    }

    #[must_use]
    pub fn entry(&self, id: i64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Download the video of record `id`
    pub async fn save_video(&self, id: i64) -> Option<DownloadState> {
        let Some(url) = self.entry(id).and_then(|e| e.video_url.as_deref()) else {
            self.notifier.toast("没有视频可下载");
            return None;
        };
        self.saver.save_video(&ensure_https(url)).await
    }

    /// Save every image of record `id`
    pub async fn save_images(&self, id: i64) -> Option<BatchReport> {
        let images = self.entry(id).map(|e| e.images.as_slice()).unwrap_or_default();
        self.saver.save_all_images(images, "没有图片可下载").await
    }

    pub fn cancel_download(&self) -> bool {
        self.saver.cancel_download()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_atlas() {
        assert_eq!(
            decode_atlas(Some(r#"["https://a/1.jpg","","https://a/2.jpg"]"#)),
            vec!["https://a/1.jpg".to_string(), "https://a/2.jpg".to_string()]
        );
        assert!(decode_atlas(Some("not json")).is_empty());
        assert!(decode_atlas(Some("")).is_empty());
        assert!(decode_atlas(None).is_empty());
    }

    #[test]
    fn test_entry_from_record() {
        let record = HistoryRecord {
            id: Some(7),
            original_url: Some("https://v.douyin.com/x/".to_string()),
            video_title: Some("  ".to_string()),
            parsed_video_url: Some(String::new()),
            image_atlas: Some(r#"["https://a/1.jpg"]"#.to_string()),
            parse_status: Some(1),
            create_time: Some("2024-03-05T08:09:10".to_string()),
            ..Default::default()
        };

        let entry = HistoryEntry::from(record);
        assert_eq!(entry.id, 7);
        assert_eq!(entry.title, "未命名作品");
        assert!(!entry.has_video());
        assert!(entry.has_images());
        assert_eq!(entry.status, ParseStatus::Resolved);
        assert_eq!(entry.created_at, "2024-03-05 08:09");

        let now = NaiveDateTime::parse_from_str("2024-03-05 08:12:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(entry.relative_time(now).as_deref(), Some("2分钟前"));
    }

    #[test]
    fn test_parse_status_codes() {
        assert_eq!(ParseStatus::from_code(Some(0)), ParseStatus::Pending);
        assert_eq!(ParseStatus::from_code(Some(2)).label(), "解析失败");
        assert_eq!(ParseStatus::from_code(None), ParseStatus::Pending);
    }
}
