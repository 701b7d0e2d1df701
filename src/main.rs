use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use nomark::media::{BatchReport, DownloadState, ItemOutcome};
use nomark::screens::{
    DisplayMode, HistoryScreen, ProfileScreen, Resolution, ResolverScreen, RewardsScreen,
    SignInOutcome,
};
use nomark::{
    AlbumDir, ApiClient, AppConfig, ConsoleNotifier, DeviceLogin, FileStore, HttpClient,
    HttpFetcher, MediaSaver, Notifier, Session,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "nomark", version, about = "Save short videos and images without watermarks")]
struct Cli {
    /// Extra config file, applied over the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the share link inside TEXT
    Resolve { text: String },
    /// Resolve TEXT and save the video, or every image
    Save { text: String },
    /// List past resolutions
    History,
    /// Save the media of a history record
    HistorySave {
        id: i64,
        /// Save the images instead of the video
        #[arg(long)]
        images: bool,
    },
    /// Daily check-in
    SignIn,
    /// Show streak and points
    Rewards,
    /// Show or edit the profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
    /// Forget the cached identity
    Logout,
    /// Platforms the backend can resolve
    Platforms,
    /// Backend health
    Health,
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Set the display name (only once)
    SetName { name: String },
    /// Replace the avatar
    SetAvatar { url: String },
}

struct App {
    api: Arc<ApiClient>,
    saver: Arc<MediaSaver>,
    notifier: Arc<dyn Notifier>,
}

impl App {
    fn build(config: &AppConfig) -> Result<Self> {
        let store = FileStore::open(config.storage.session_file())
            .context("Failed to open the session store")?;
        let session = Arc::new(Session::load(Arc::new(store)));

        let http = HttpClient::new(
            config.api.base_url.clone(),
            config.api.timeout(),
            &config.api.user_agent,
        )?;
        let login = Arc::new(DeviceLogin::new(config.auth.login_code.clone()));
        let api = Arc::new(ApiClient::new(http, session, login));

        // Media transfers can outlive the request timeout
        let media_client = reqwest::Client::builder()
            .user_agent(config.api.user_agent.as_str())
            .connect_timeout(config.api.timeout())
            .build()?;
        let fetcher = Arc::new(HttpFetcher::new(media_client, config.storage.temp_dir()));
        let album = Arc::new(AlbumDir::new(config.storage.album_dir.clone()));

        let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::new(Some(format!(
            "check write access to {}",
            config.storage.album_dir.display()
        ))));
        let saver = Arc::new(MediaSaver::new(fetcher, album, Arc::clone(&notifier)));

        Ok(Self {
            api,
            saver,
            notifier,
        })
    }

    fn resolver(&self) -> ResolverScreen {
        ResolverScreen::new(
            Arc::clone(&self.api),
            Arc::clone(&self.saver),
            Arc::clone(&self.notifier),
        )
    }

    fn history(&self) -> HistoryScreen {
        HistoryScreen::new(
            Arc::clone(&self.api),
            Arc::clone(&self.saver),
            Arc::clone(&self.notifier),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let _guard = nomark::logging::init(&config.log)?;

    debug!("Using backend {}", config.api.base_url);

    let app = App::build(&config)?;
    run(&app, &config, cli.command).await
}

async fn run(app: &App, config: &AppConfig, command: Command) -> Result<()> {
    match command {
        Command::Resolve { text } => {
            let mut screen = app.resolver();
            screen.set_input(&text);
            if let Some(resolution) = screen.submit().await {
                print_resolution(&resolution);
            }
        }
        Command::Save { text } => {
            let mut screen = app.resolver();
            screen.set_input(&text);
            if screen.submit().await.is_none() {
                return Ok(());
            }

            match screen.mode() {
                DisplayMode::Video { url, .. } => {
                    println!("{url}");
                    let progress = spawn_progress_printer(&app.saver);
                    tokio::select! {
                        state = screen.save_video() => print_download(state.as_ref()),
                        _ = tokio::signal::ctrl_c() => {
                            screen.cancel_download();
                        }
                    }
                    progress.abort();
                }
                DisplayMode::Images(_) => {
                    let report = screen.save_all_images().await;
                    print_batch(report.as_ref());
                }
                DisplayMode::Hidden => {}
            }
        }
        Command::History => {
            let mut screen = app.history();
            if !screen.load().await {
                return Ok(());
            }
            if let Some(minutes) = screen.retention_minutes() {
                println!("Records are kept for {minutes} minutes");
            }
            let now = chrono::Local::now().naive_local();
            for entry in screen.entries() {
                println!(
                    "#{} [{}] {} {}",
                    entry.id,
                    entry.status.label(),
                    entry.relative_time(now).unwrap_or_else(|| entry.created_at.clone()),
                    entry.title
                );
                println!("    {}", entry.original_url);
                if let Some(reason) = &entry.fail_reason {
                    println!("    {reason}");
                }
                if entry.has_images() {
                    println!("    {} images", entry.images.len());
                }
            }
        }
        Command::HistorySave { id, images } => {
            let mut screen = app.history();
            if !screen.load().await {
                return Ok(());
            }
            if screen.entry(id).is_none() {
                bail!("No history record #{id}");
            }

            if images {
                let report = screen.save_images(id).await;
                print_batch(report.as_ref());
            } else {
                let progress = spawn_progress_printer(&app.saver);
                tokio::select! {
                    state = screen.save_video(id) => print_download(state.as_ref()),
                    _ = tokio::signal::ctrl_c() => {
                        screen.cancel_download();
                    }
                }
                progress.abort();
            }
        }
        Command::SignIn => {
            let mut screen = RewardsScreen::new(Arc::clone(&app.api), Arc::clone(&app.notifier));
            screen.load().await;
            match screen.sign().await {
                SignInOutcome::Signed { reward_points } => {
                    println!("签到成功 +{reward_points}");
                }
                SignInOutcome::AlreadySigned => {
                    if let Some(notice) = &screen.view().notice {
                        println!("{notice}");
                    }
                }
                SignInOutcome::Failed(message) => bail!(message),
                SignInOutcome::Skipped => {}
            }
            print_rewards(&screen);
        }
        Command::Rewards => {
            let mut screen = RewardsScreen::new(Arc::clone(&app.api), Arc::clone(&app.notifier));
            screen.load().await;
            print_rewards(&screen);
        }
        Command::Profile { action } => {
            let screen = ProfileScreen::new(Arc::clone(&app.api), Arc::clone(&app.notifier));
            match action {
                None => {
                    let profile = screen.profile();
                    println!("name:   {}", profile.display_name().unwrap_or("-"));
                    println!("avatar: {}", profile.avatar().unwrap_or("-"));
                }
                Some(ProfileAction::SetName { name }) => {
                    if screen.set_display_name(&name).await? {
                        println!("{}", name.trim());
                    } else {
                        info!("Display name left unchanged");
                    }
                }
                Some(ProfileAction::SetAvatar { url }) => screen.set_avatar(&url).await?,
            }
        }
        Command::Logout => {
            ProfileScreen::new(Arc::clone(&app.api), Arc::clone(&app.notifier)).logout()?;
        }
        Command::Platforms => {
            let list = app.api.supported_platforms().await?;
            if let Some(description) = &list.description {
                println!("{description}");
            }
            for platform in &list.platforms {
                println!("- {platform}");
            }
        }
        Command::Health => {
            let health = app.api.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Command::Config => print!("{}", config.render()?),
    }

    Ok(())
}

/// Redraw the download status line on every tracker update
fn spawn_progress_printer(saver: &MediaSaver) -> tokio::task::JoinHandle<()> {
    let mut updates = saver.tracker().subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            if state.is_active() {
                eprint!("\r{:<48}", state.status_text());
                let _ = std::io::stderr().flush();
            } else if state.is_terminal() {
                eprintln!();
                break;
            }
        }
    })
}

fn print_resolution(resolution: &Resolution) {
    match resolution {
        Resolution::Video { url, cover, title } => {
            if let Some(title) = title {
                println!("{title}");
            }
            println!("video: {url}");
            if let Some(cover) = cover {
                println!("cover: {cover}");
            }
        }
        Resolution::Images(urls) => {
            for (i, url) in urls.iter().enumerate() {
                println!("image {}: {url}", i + 1);
            }
        }
    }
}

fn print_download(state: Option<&DownloadState>) {
    if let Some(DownloadState::Saved(path)) = state {
        println!("{}", path.display());
    }
}

fn print_batch(report: Option<&BatchReport>) {
    let Some(report) = report else {
        return;
    };
    for (i, item) in report.items.iter().enumerate() {
        match item {
            ItemOutcome::Saved(path) => println!("{}: {}", i + 1, path.display()),
            ItemOutcome::FetchFailed(reason) | ItemOutcome::PersistFailed(reason) => {
                println!("{}: failed ({reason})", i + 1);
            }
        }
    }
}

fn print_rewards(screen: &RewardsScreen) {
    let view = screen.view();
    println!("累计签到: {}", view.sign_in_sum_display());
    println!("连续签到: {} 天", view.continuous_days);
    println!("积分:     {}", view.points_display());
    println!("今日已签到: {}", if view.signed_today { "是" } else { "否" });
}
