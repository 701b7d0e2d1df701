use crate::api::{ApiClient, ApiError, SignInData};
use crate::screens::Notifier;
use crate::screens::format::compact_count;
use crate::session::Profile;
use std::sync::Arc;
use tracing::{info, warn};

/// Points granted per check-in when the backend does not say
const DEFAULT_REWARD_POINTS: i64 = 10;
/// Backend marker for "already checked in today"
const ALREADY_SIGNED_MARKER: &str = "已签到";

/// How a check-in attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    Signed { reward_points: i64 },
    /// Backend says today's check-in already happened
    AlreadySigned,
    /// Local state already showed today as done; nothing was sent
    Skipped,
    Failed(String),
}

/// Streak and points counters plus the modal flags of the rewards page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardsView {
    pub sign_in_sum: i64,
    pub points: i64,
    pub continuous_days: i64,
    pub signed_today: bool,
    pub reward_points: i64,
    pub success: bool,
    pub error: Option<String>,
    /// Informational message that is not an error
    pub notice: Option<String>,
}

impl RewardsView {
    #[must_use]
    pub fn sign_in_sum_display(&self) -> String {
        compact_count(self.sign_in_sum)
    }

    #[must_use]
    pub fn points_display(&self) -> String {
        compact_count(self.points)
    }

    fn apply_profile(&mut self, profile: &Profile) {
        self.sign_in_sum = profile.sign_in_sum.unwrap_or_default();
        self.points = profile.points.unwrap_or_default();
        self.continuous_days = profile.continuous_sign_days.unwrap_or_default();
        self.signed_today = profile.today_signin.unwrap_or(false);
    }

    fn apply_sign_in(&mut self, data: &SignInData) {
        if let Some(count) = data.sign_count {
            self.sign_in_sum = count;
        }
        if let Some(points) = data.points {
            self.points = points;
        }
        if let Some(days) = data.continuous_sign_days {
            self.continuous_days = days;
        }
        self.reward_points = data.reward_points.unwrap_or(DEFAULT_REWARD_POINTS);
        self.signed_today = true;
        self.success = true;
        self.error = None;
        self.notice = None;
    }
}

/// Daily check-in and the streak/points summary
pub struct RewardsScreen {
    api: Arc<ApiClient>,
    notifier: Arc<dyn Notifier>,
    view: RewardsView,
}

impl RewardsScreen {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            view: RewardsView::default(),
        }
    }

    #[must_use]
    pub const fn view(&self) -> &RewardsView {
        &self.view
    }

    /// Refresh counters from the backend, falling back to the cached profile
    pub async fn load(&mut self) {
        match self.api.login_summary().await {
            Ok(profile) => self.view.apply_profile(&profile),
            Err(e) => {
                warn!("Rewards summary unavailable: {}", e);
                if let Some(profile) = self.api.session().profile() {
                    self.view.apply_profile(&profile);
                }
            }
        }
    }

    /// Submit today's check-in
    pub async fn sign(&mut self) -> SignInOutcome {
        if self.view.signed_today {
            self.notifier.toast("今日已签到，请明天再来");
            return SignInOutcome::Skipped;
        }

        match self.api.sign_in().await {
            Ok(data) => {
                self.view.apply_sign_in(&data);
                info!("Checked in, +{} points", self.view.reward_points);
                SignInOutcome::Signed {
                    reward_points: self.view.reward_points,
                }
            }
            Err(ApiError::Business { status, message }) if is_already_signed(status, &message) => {
                info!("Backend reports today's check-in already done");
                self.view.signed_today = true;
                self.view.error = None;
                self.view.notice = Some(message);
                SignInOutcome::AlreadySigned
            }
            Err(e) => {
                warn!("Check-in failed: {}", e);
                let message = if e.is_transport() {
                    "网络异常，请稍后重试".to_string()
                } else {
                    e.backend_message().unwrap_or("签到失败，请稍后重试").to_string()
                };
                self.view.success = false;
                self.view.error = Some(message.clone());
                SignInOutcome::Failed(message)
            }
        }
    }

    /// Close whichever result modal is open
    pub fn dismiss(&mut self) {
        self.view.success = false;
        self.view.error = None;
        self.view.notice = None;
    }
}

fn is_already_signed(status: i64, message: &str) -> bool {
    status == 500 && message.contains(ALREADY_SIGNED_MARKER)
}
