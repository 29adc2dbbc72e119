//! Headless URDF preview entry point

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use urdf_core::{
    ResourceBase, ResourceResolver, SettingsManager, WorkspacePackageLookup, XacroCommand,
    create_shared_settings,
};
use urdf_preview::{
    Listener, LogNotifier, PreviewSession, SessionEvent, SessionServices, SessionState,
    ViewEventSink, spawn_headless_view, watch_files,
};
use urdf_renderer::FileMeshLoader;

#[derive(Parser, Debug)]
#[command(name = "urdf-preview", version, about = "Preview a URDF or xacro document")]
struct Cli {
    /// Document to preview
    file: PathBuf,

    /// Workspace root searched for packages (repeatable)
    #[arg(long = "workspace", value_name = "DIR")]
    workspaces: Vec<PathBuf>,

    /// Settings file (RON)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// URI prefix the view uses to fetch local files
    #[arg(long, default_value = ResourceBase::DEFAULT_PREFIX)]
    resource_base: String,

    /// xacro executable
    #[arg(long, default_value = "xacro")]
    xacro: PathBuf,

    /// Argument passed to xacro before the document, e.g. `arm:=left` (repeatable)
    #[arg(long = "xacro-arg", value_name = "ARG")]
    xacro_args: Vec<String>,

    /// Keep running and refresh whenever the document or settings change
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "urdf_preview=debug,urdf_core=info,urdf_renderer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let file = std::path::absolute(&cli.file)?;
    tracing::info!("Starting URDF preview for {}", file.display());

    let settings_path = cli.settings.unwrap_or_else(SettingsManager::default_path);
    let settings = create_shared_settings(std::path::absolute(settings_path)?);

    let roots = if cli.workspaces.is_empty() {
        vec![std::env::current_dir()?]
    } else {
        cli.workspaces
    };
    let base = ResourceBase::new(cli.resource_base);

    let services = SessionServices {
        resolver: Arc::new(ResourceResolver::new(
            Arc::new(XacroCommand::new(cli.xacro).with_args(cli.xacro_args)),
            base.clone(),
        )),
        packages: Arc::new(WorkspacePackageLookup::with_env(roots)),
        settings: settings.clone(),
        notifier: Arc::new(LogNotifier),
    };

    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
    let (view, view_task) = spawn_headless_view(
        Arc::new(FileMeshLoader::new(base)),
        Arc::new(ViewEventSink::new(events_tx.clone())),
    );

    let session = PreviewSession::new(&file, view, services);
    let mut states = session.subscribe_state();
    let mut runner = tokio::spawn(session.clone().run(events_rx));

    if cli.watch {
        let watcher = watch_files(&file, settings, events_tx.clone())?;
        session.register_listener(Listener::new("file watcher", move || drop(watcher)));

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("Interrupted, closing preview");
                events_tx.send(SessionEvent::ViewClosed)?;
                (&mut runner).await?;
            }
            result = &mut runner => result?,
        }
    } else {
        states
            .wait_for(|s| matches!(s, SessionState::Ready | SessionState::Failed))
            .await?;
        events_tx.send(SessionEvent::ViewClosed)?;
        runner.await?;
    }

    let summary = view_task.await?;
    tracing::info!(
        "View drew {} frames; robot {:?} with {} links and {} joints",
        summary.frames,
        summary.robot,
        summary.links,
        summary.joints
    );

    Ok(if session.state() == SessionState::Failed || summary.robot.is_none() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
