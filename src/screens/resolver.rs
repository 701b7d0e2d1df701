use crate::api::{ApiClient, ApiError, InitConfig, ResolvedMedia};
use crate::media::{BatchReport, DownloadState};
use crate::screens::{MediaSaver, Notifier};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use url::Url;

/// A share link somewhere inside pasted text. Word characters are ASCII
/// only, so CJK text glued to the end of a link stays out of the match.
static SHARE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(http|ftp|https)://[A-Za-z0-9_\-]+(\.[A-Za-z0-9_\-]+)+([A-Za-z0-9_\-.,@?^=%&:/~+#]*[A-Za-z0-9_\-@?^=%&/~+#])?",
    )
    .expect("Invalid share link regex")
});

/// Characters of the video URL kept in its shortened display form
const SHORT_URL_CHARS: usize = 15;

const NOT_A_LINK: &str = "请复制短视频平台分享链接后再来";
const RESOLVE_FAILED: &str = "解析失败请检查链接正确性,或重试一次";
const NOTHING_FOUND: &str = "解析失败，未获取到有效内容";

/// First share link found in `text`
#[must_use]
pub fn extract_link(text: &str) -> Option<&str> {
    SHARE_LINK.find(text).map(|m| m.as_str())
}

#[must_use]
pub fn is_share_link(text: &str) -> bool {
    SHARE_LINK.is_match(text)
}

/// Rewrite a plain-http URL to https, leaving everything else as it was
#[must_use]
pub fn ensure_https(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) if url.scheme() == "http" => match raw.split_once(':') {
            Some((_, rest)) => format!("https:{rest}"),
            None => raw.to_string(),
        },
        Ok(_) => raw.to_string(),
        // Unparseable: swap the first occurrence, as long as it is not https already
        Err(_) if raw.contains("http") && !raw.contains("https") => raw.replacen("http", "https", 1),
        Err(_) => raw.to_string(),
    }
}

/// `https://v26-web.d...` style display form of a long URL
#[must_use]
pub fn shorten_url(url: &str) -> String {
    if url.chars().count() <= SHORT_URL_CHARS {
        return url.to_string();
    }
    let head: String = url.chars().take(SHORT_URL_CHARS).collect();
    format!("{head}...")
}

/// What a resolved link turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Video {
        url: String,
        cover: Option<String>,
        title: Option<String>,
    },
    Images(Vec<String>),
}

impl Resolution {
    /// Video wins over images; `None` when the payload carries neither
    #[must_use]
    pub fn classify(media: ResolvedMedia) -> Option<Self> {
        if let Some(url) = media.video_src.filter(|v| !v.trim().is_empty()) {
            return Some(Self::Video {
                url: ensure_https(&url),
                cover: media.image_src.filter(|c| !c.is_empty()),
                title: media.title.filter(|t| !t.is_empty()),
            });
        }

        media
            .image_atlas
            .map(|urls| {
                urls.into_iter()
                    .filter(|u| !u.trim().is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|urls| !urls.is_empty())
            .map(Self::Images)
    }
}

/// Which result panel is shown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Hidden,
    Video {
        url: String,
        short_url: String,
        cover: Option<String>,
        title: Option<String>,
    },
    Images(Vec<String>),
}

impl From<Resolution> for DisplayMode {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Video { url, cover, title } => Self::Video {
                short_url: shorten_url(&url),
                url,
                cover,
                title,
            },
            Resolution::Images(urls) => Self::Images(urls),
        }
    }
}

/// Paste a share link, resolve it, save what it points at
pub struct ResolverScreen {
    api: Arc<ApiClient>,
    saver: Arc<MediaSaver>,
    notifier: Arc<dyn Notifier>,
    input: String,
    submitting: bool,
    mode: DisplayMode,
    banner: Option<InitConfig>,
}

impl ResolverScreen {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, saver: Arc<MediaSaver>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            saver,
            notifier,
            input: String::new(),
            submitting: false,
            mode: DisplayMode::Hidden,
            banner: None,
        }
    }

    /// Fetch the banner and warm up the identity. Failures only get logged.
    pub async fn load(&mut self) {
        match self.api.init_config().await {
            Ok(config) => self.banner = Some(config),
            Err(e) => debug!("Banner config unavailable: {}", e),
        }

        if !self.api.session().is_established()
            && let Err(e) = self.api.login_summary().await
        {
            warn!("Session warm-up failed: {}", e);
        }
    }

    pub fn set_input(&mut self, text: &str) {
        self.input = text.trim().to_string();
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Whether the submit control is enabled
    #[must_use]
    pub const fn can_submit(&self) -> bool {
        !self.submitting
    }

    #[must_use]
    pub const fn mode(&self) -> &DisplayMode {
        &self.mode
    }

    #[must_use]
    pub const fn banner(&self) -> Option<&InitConfig> {
        self.banner.as_ref()
    }

    /// Resolve the link inside the current input.
    ///
    /// Input without a share link is rejected locally. Any backend failure
    /// gets the same message regardless of payload.
    pub async fn submit(&mut self) -> Option<Resolution> {
        if self.submitting {
            return None;
        }

        let Some(link) = extract_link(&self.input).map(str::to_string) else {
            self.notifier.toast(NOT_A_LINK);
            return None;
        };

        self.submitting = true;
        self.mode = DisplayMode::Hidden;
        info!("Resolving {}", link);

        let resolution = match self.api.resolve_link(&link).await {
            Ok(media) => {
                let resolution = Resolution::classify(media);
                if resolution.is_none() {
                    self.notifier.toast(NOTHING_FOUND);
                }
                resolution
            }
            Err(e) => {
                warn!("Resolve failed: {}", e);
                self.notifier.toast(resolve_failure_message(&e));
                None
            }
        };

        if let Some(resolution) = &resolution {
            self.mode = resolution.clone().into();
        }
        self.submitting = false;
        resolution
    }

    /// Close the result panel
    pub fn hide(&mut self) {
        self.mode = DisplayMode::Hidden;
    }

    /// Save the displayed video
    pub async fn save_video(&self) -> Option<DownloadState> {
        let DisplayMode::Video { url, .. } = &self.mode else {
            self.notifier.toast(NOTHING_FOUND);
            return None;
        };
        self.saver.save_video(url).await
    }

    pub fn cancel_download(&self) -> bool {
        self.saver.cancel_download()
    }

    /// Save image `index` of the displayed set
    pub async fn save_image(&self, index: usize) -> bool {
        let DisplayMode::Images(urls) = &self.mode else {
            return false;
        };
        match urls.get(index) {
            Some(url) => self.saver.save_image(url).await,
            None => false,
        }
    }

    pub async fn save_all_images(&self) -> Option<BatchReport> {
        let urls: &[String] = match &self.mode {
            DisplayMode::Images(urls) => urls.as_slice(),
            _ => &[],
        };
        self.saver.save_all_images(urls, "没有图片可保存").await
    }
}

fn resolve_failure_message(err: &ApiError) -> &'static str {
    match err {
        ApiError::LoginFailed(_) => "登录失败，请重试",
        e if e.is_transport() => "网络请求失败，请检查网络后重试",
        _ => RESOLVE_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_link_from_share_text() {
        let text = "7.43 复制打开抖音，看看【作品】 https://v.douyin.com/iRNBho6u/ 复制此链接";
        assert_eq!(extract_link(text), Some("https://v.douyin.com/iRNBho6u/"));
        assert!(is_share_link(text));
    }

    #[test]
    fn test_extract_link_stops_at_cjk_text() {
        assert_eq!(
            extract_link("【作品】https://v.kuaishou.com/abc123/复制此链接，打开快手"),
            Some("https://v.kuaishou.com/abc123/")
        );
        assert_eq!(
            extract_link("看看https://v.douyin.com/iRNBho6u复制"),
            Some("https://v.douyin.com/iRNBho6u")
        );
    }

    #[test]
    fn test_extract_link_rejects_plain_text() {
        assert_eq!(extract_link("hello world"), None);
        assert_eq!(extract_link("www.example.com"), None);
        assert!(!is_share_link("mailto:someone@example.com"));
    }

    #[test]
    fn test_ensure_https() {
        assert_eq!(ensure_https("http://cdn.example.com/v.mp4"), "https://cdn.example.com/v.mp4");
        assert_eq!(ensure_https("https://cdn.example.com/v.mp4"), "https://cdn.example.com/v.mp4");
        assert_eq!(ensure_https("HTTP://cdn.example.com/a"), "https://cdn.example.com/a");
        // Query content is not touched
        assert_eq!(
            ensure_https("http://cdn.example.com/v?src=http://x"),
            "https://cdn.example.com/v?src=http://x"
        );
    }

    #[test]
    fn test_shorten_url() {
        assert_eq!(shorten_url("https://a.b/c"), "https://a.b/c");
        assert_eq!(
            shorten_url("https://v26.example.com/video.mp4"),
            "https://v26.exa..."
        );
    }

    #[test]
    fn test_classify_prefers_video() {
        let media = ResolvedMedia {
            video_src: Some("http://v.example.com/1.mp4".to_string()),
            image_atlas: Some(vec!["https://i.example.com/1.jpg".to_string()]),
            ..Default::default()
        };
        assert!(matches!(
            Resolution::classify(media),
            Some(Resolution::Video { url, .. }) if url == "https://v.example.com/1.mp4"
        ));
    }

    #[test]
    fn test_classify_images_and_nothing() {
        let media = ResolvedMedia {
            video_src: Some(String::new()),
            image_atlas: Some(vec!["a".to_string(), String::new(), "b".to_string()]),
            ..Default::default()
        };
        assert_eq!(
            Resolution::classify(media),
            Some(Resolution::Images(vec!["a".to_string(), "b".to_string()]))
        );

        let empty = ResolvedMedia {
            image_atlas: Some(Vec::new()),
            ..Default::default()
        };
        assert_eq!(Resolution::classify(empty), None);
        assert_eq!(Resolution::classify(ResolvedMedia::default()), None);
    }
}
