// Native command-line client for lobster

use anyhow::{anyhow, bail, Context, Result};
use std::time::{Duration, Instant};

use lobster::{
    api::ApiClient,
    auth::{self, Session},
    comments::{Comment, Commenter, CommentsScreen, Pending},
    config::{load, Command, Config},
    debug,
    navigator::{NavOutcome, Navigator},
    router::Router,
    slider::{Controller, Direction},
    util::liveness::Liveness,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    #[cfg(feature = "native")]
    {
        let _ = dotenvy::dotenv();
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (cfg, command) = load().context("Failed to load configuration")?;
    match cfg.debug.as_deref() {
        Some(list) => debug::set_from_list(list),
        None => debug::init_from_url_and_storage_once(),
    }

    let Some(command) = command else {
        cfg.print_summary();
        eprintln!("\nNo command given; see `lobster --help`.");
        return Ok(());
    };

    if let Command::Routes { steps } = &command {
        return replay_routes(&cfg, steps);
    }

    let session = Session::in_memory();
    let client = ApiClient::new(&cfg.server_url, cfg.request_timeout_ms, session.clone());

    if let Command::Login { email, password } = &command {
        session
            .login(&client, email, password)
            .await
            .map_err(|e| anyhow!("login failed: {e}"))?;
        let refresh = session.refresh_token().unwrap_or_default();
        log::info!("Logged in as user {}", session.user_id().unwrap_or_default());
        println!("{refresh}");
        return Ok(());
    }

    let refresh_token = cfg
        .refresh_token
        .clone()
        .context("a refresh token is required (--refresh-token or LOBSTER_REFRESH_TOKEN)")?;
    session.restore_refresh_token(refresh_token);
    session
        .refresh(&client)
        .await
        .map_err(|e| anyhow!("session refresh failed: {e}"))?;
    log::info!("Session ready for user {}", session.user_id().unwrap_or_default());

    match command {
        Command::Comments { post } => {
            let screen = loaded(&client, &cfg, &post).await?;
            print_comments(screen.comments());
        }
        Command::Comment { post, text } => {
            let mut screen = loaded(&client, &cfg, &post).await?;
            let pending = screen.begin_create_comment(&text, Commenter::default());
            settle(&mut screen, &client, pending).await?;
        }
        Command::Reply { post, parent, text } => {
            let mut screen = loaded(&client, &cfg, &post).await?;
            let pending = screen.begin_create_reply(&parent, &text)?;
            settle(&mut screen, &client, pending).await?;
        }
        Command::Edit { post, uuid, text } => {
            let mut screen = loaded(&client, &cfg, &post).await?;
            let pending = screen.begin_edit_comment(&uuid, &text)?;
            settle(&mut screen, &client, pending).await?;
        }
        Command::Delete { post, uuid } => {
            let mut screen = loaded(&client, &cfg, &post).await?;
            let pending = screen.begin_remove_comment(&uuid)?;
            settle(&mut screen, &client, pending).await?;
        }
        Command::Undelete { post, uuid } => {
            let mut screen = loaded(&client, &cfg, &post).await?;
            let pending = screen.begin_undelete_comment(&uuid)?;
            settle(&mut screen, &client, pending).await?;
        }
        Command::Watch { post, every_secs } => {
            watch(&cfg, &session, &client, &post, Duration::from_secs(every_secs.max(1))).await?;
        }
        // handled before the session was set up
        Command::Login { .. } | Command::Routes { .. } => {}
    }

    Ok(())
}

async fn loaded(client: &ApiClient, cfg: &Config, post: &str) -> Result<CommentsScreen> {
    let mut screen = CommentsScreen::new(post).with_policy(cfg.undelete);
    if !screen.load(client).await {
        bail!("could not load comments for post {post}");
    }
    Ok(screen)
}

async fn settle(screen: &mut CommentsScreen, client: &ApiClient, pending: Pending) -> Result<()> {
    let key = pending.key().to_string();
    if screen.run(client, pending).await {
        print_comments(screen.comments());
        return Ok(());
    }
    while let Some(info) = screen.modal_mut().close() {
        eprintln!("{}", info.text);
    }
    bail!("change to {key} was rolled back")
}

async fn watch(cfg: &Config, session: &Session, client: &ApiClient, post: &str, every: Duration) -> Result<()> {
    let alive = Liveness::new();
    let refresher = auth::run_refresh_loop(
        session.clone(),
        client,
        Duration::from_secs(cfg.refresh_interval_secs),
        alive.clone(),
    );
    let poller = async {
        let mut screen = CommentsScreen::new(post).with_policy(cfg.undelete);
        let mut tick = tokio::time::interval(every);
        loop {
            tick.tick().await;
            if !session.is_logged_in() {
                log::warn!("Session ended; stopping");
                return;
            }
            if screen.load(client).await {
                print_comments(screen.comments());
            }
        }
    };
    tokio::select! {
        _ = refresher => {}
        _ = poller => {}
        r = tokio::signal::ctrl_c() => {
            r.context("waiting for Ctrl-C")?;
            log::info!("Interrupted");
        }
    }
    alive.teardown();
    Ok(())
}

fn print_comments(comments: &[Comment]) {
    for c in comments {
        let text = if c.deleted {
            "[deleted]"
        } else {
            c.text.as_deref().unwrap_or_default()
        };
        println!("{}  {:<16} {}", c.uuid, c.commenter.name, text);
        for r in &c.replies {
            let text = if r.deleted {
                "[deleted]"
            } else {
                r.text.as_deref().unwrap_or_default()
            };
            let who = if r.by_commenter { "commenter" } else { "seller" };
            println!("    {}  {:<12} {}", r.uuid, who, text);
        }
    }
}

/// `back`, `back:<dir>`, `/path` or `/path:<dir>` (default direction: forward).
fn parse_step(step: &str) -> Result<(Option<&str>, Option<Direction>)> {
    let (head, dir) = match step.rsplit_once(':') {
        Some((head, dir)) => (head, Some(dir.parse::<Direction>()?)),
        None => (step, None),
    };
    if head == "back" {
        Ok((None, dir))
    } else if head.starts_with('/') {
        Ok((Some(head), dir))
    } else {
        Err(anyhow!("step {step:?} must be `back` or start with '/'"))
    }
}

/// Drive the navigator with a simulated clock and print each settled state.
fn replay_routes(cfg: &Config, steps: &[String]) -> Result<()> {
    let duration = Duration::from_millis(cfg.transition_ms);
    let router = Router::new(&cfg.initial_path);
    let slider = Controller::new(router.page()).with_duration(duration);
    let mut nav = Navigator::with_controller(router, slider);
    let mut now = Instant::now();

    for step in steps {
        let (path, dir) = parse_step(step)?;
        let outcome = match path {
            Some(p) => nav.go_to_with_back(p, dir.unwrap_or(Direction::Forward), now),
            None => nav.go_back(dir, now),
        };
        match &outcome {
            NavOutcome::Sliding(t) => println!("{step:<24} slide {} -> {} ({})", t.direction, t.target, t.class),
            NavOutcome::Replaced => println!("{step:<24} replaced"),
            NavOutcome::Dropped(why) => println!("{step:<24} dropped: {why}"),
            NavOutcome::NoHistory => println!("{step:<24} no history"),
        }
        now += duration;
        if let Some(settled) = nav.poll(now) {
            debug::log(debug::cat::SLIDER, format!("settled on {}", settled.active_key));
        }
        let snap = nav.snapshot();
        println!("{:<24} path={} page={} history={:?}", "", snap.router.path, snap.router.page, snap.router.history);
    }
    Ok(())
}
