use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_style;

use cli_style::{
    get_styles, print_banner, print_empty_list, print_error, print_goodbye, print_info,
    print_key_value, print_key_value_highlight, print_list_item, print_section_footer,
    print_section_header, print_success, print_swatch, print_warning,
};

use aurafy_server::analysis::{AnalysisResponse, AnalysisService};
use aurafy_server::config::{AppConfig, CliConfig, FileConfig};
use aurafy_server::mood::{Classifier, NO_DATA_DESCRIPTOR, NO_MATCH_DESCRIPTOR};
use aurafy_server::oauth::{token_preview, AuthState, SpotifyAuthClient, TokenGrant};
use aurafy_server::spotify::SpotifyApi;

use rustyline::{
    completion::Completer,
    highlight::Highlighter,
    history::FileHistory,
    validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to the same TOML configuration file the server reads.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    #[clap(long, env = "SPOTIFY_CLIENT_ID")]
    pub client_id: Option<String>,

    #[clap(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    #[clap(long, env = "SPOTIFY_REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// Start the session with an access token already set.
    #[clap(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[clap(long, default_value_t = 10)]
    pub request_timeout_sec: u64,
}

#[derive(Parser)]
#[command(styles=get_styles(),name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Prints an authorization URL to open in a browser.
    /// The state it carries is remembered for the next exchange.
    LoginUrl,

    /// Exchanges an authorization code for tokens. Accepts either the bare
    /// code or the whole URL the browser was redirected to.
    Exchange {
        code_or_url: String,
        #[arg(long)]
        state: Option<String>,
    },

    /// Gets a fresh access token, using the session refresh token if none is given.
    Refresh { refresh_token: Option<String> },

    /// Uses the given access token for the following commands.
    SetToken { access_token: String },

    /// Shows a preview of the tokens held by this session.
    ShowToken,

    /// Shows the profile the current token belongs to.
    Me,

    /// Lists the playlists of the current user.
    Playlists,

    /// Computes the aura of a playlist.
    AnalyzePlaylist { playlist_id: String },

    /// Computes the aura of the recently played tracks.
    AnalyzeRecent,

    /// Lists the mood rules in evaluation order.
    Rules,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = "aura> ";

struct Session {
    runtime: Runtime,
    auth_client: Option<SpotifyAuthClient>,
    spotify: Arc<SpotifyApi>,
    analysis: AnalysisService,
    pending_state: Option<AuthState>,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl Session {
    fn new(app_config: &AppConfig, access_token: Option<String>) -> Result<Self> {
        let runtime = Runtime::new().context("Failed to start async runtime")?;
        let timeout = app_config.request_timeout();
        let spotify = Arc::new(SpotifyApi::new(&app_config.spotify.api_base_url, timeout)?);
        let auth_client = SpotifyAuthClient::from_settings(&app_config.spotify, timeout)?;
        let analysis = AnalysisService::new(
            spotify.clone(),
            Classifier::default(),
            app_config.analysis.clone(),
        );
        Ok(Session {
            runtime,
            auth_client,
            spotify,
            analysis,
            pending_state: None,
            access_token,
            refresh_token: None,
        })
    }

    fn token(&self) -> std::result::Result<String, String> {
        self.access_token
            .clone()
            .ok_or_else(|| "No access token, use exchange or set-token first.".to_string())
    }

    fn auth_client(&self) -> std::result::Result<&SpotifyAuthClient, String> {
        self.auth_client
            .as_ref()
            .ok_or_else(|| "Spotify credentials not configured.".to_string())
    }

    fn apply_grant(&mut self, grant: TokenGrant) {
        print_key_value("Access token", &token_preview(&grant.access_token));
        if let Some(expires_in) = grant.expires_in {
            print_key_value("Expires in", &format!("{}s", expires_in));
        }
        if let Some(scope) = grant.scope.as_deref() {
            print_key_value("Scope", scope);
        }
        self.access_token = Some(grant.access_token);
        if let Some(refresh_token) = grant.refresh_token {
            print_key_value("Refresh token", &token_preview(&refresh_token));
            self.refresh_token = Some(refresh_token);
        }
    }
}

/// Split what the user pasted into an authorization code and, when the
/// input was a redirect URL, the state it carried.
fn parse_callback_input(input: &str) -> std::result::Result<(String, Option<String>), String> {
    let Some((_, query)) = input.split_once('?') else {
        return Ok((input.to_string(), None));
    };
    let query = query.split('#').next().unwrap_or_default();

    let mut code = None;
    let mut state = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => return Err(format!("Authorization failed: {}", value)),
            _ => {}
        }
    }
    code.map(|c| (c, state))
        .ok_or_else(|| "The URL has no code parameter.".to_string())
}

fn print_analysis(response: &AnalysisResponse) {
    let analysis = &response.analysis;
    print_section_header(analysis.aura.name);
    print_swatch(analysis.aura.name, analysis.aura.color, 1);
    println!("  {}", analysis.aura.description);
    println!();
    print_key_value("Tracks analyzed", &analysis.tracks_analyzed.to_string());
    print_key_value("Features found", &analysis.features_found.to_string());
    if !analysis.features_complete {
        print_warning("Some feature batches failed, the aura is based on partial data.");
    }
    if analysis.avg_features.is_empty() {
        print_empty_list("No audio features available");
    }
    for (feature, value) in analysis.avg_features.iter() {
        print_key_value(&feature.to_string(), &format!("{:.3}", value));
    }
    print_section_footer();
}

fn execute_command(line: String, session: &mut Session) -> CommandExecutionResult {
    let args = shlex::split(&line)
        .unwrap_or_else(|| line.split_whitespace().map(String::from).collect());
    if args.is_empty() {
        return CommandExecutionResult::Ok;
    }

    match InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str))) {
        Ok(cli) => match cli.command {
            InnerCommand::LoginUrl => {
                let auth_client = match session.auth_client() {
                    Ok(x) => x,
                    Err(e) => return CommandExecutionResult::Error(e),
                };
                let (url, state) = auth_client.authorize_url();
                print_info("Open this URL, then paste the address you land on into `exchange`:");
                println!("{}", url);
                session.pending_state = Some(state);
            }
            InnerCommand::Exchange { code_or_url, state } => {
                let (code, url_state) = match parse_callback_input(&code_or_url) {
                    Ok(x) => x,
                    Err(e) => return CommandExecutionResult::Error(e),
                };
                let Some(pending) = session.pending_state.clone() else {
                    return CommandExecutionResult::Error(
                        "No pending authorization, run login-url first.".to_string(),
                    );
                };
                let state = state
                    .or(url_state)
                    .unwrap_or_else(|| pending.csrf_token.clone());
                let auth_client = match session.auth_client() {
                    Ok(x) => x,
                    Err(e) => return CommandExecutionResult::Error(e),
                };
                let grant = match session
                    .runtime
                    .block_on(auth_client.exchange_code(&code, &state, &pending))
                {
                    Ok(grant) => grant,
                    Err(e) => {
                        return CommandExecutionResult::Error(format!(
                            "Failed to retrieve access token: {}",
                            e
                        ))
                    }
                };
                session.pending_state = None;
                print_success("Authorization complete.");
                session.apply_grant(grant);
            }
            InnerCommand::Refresh { refresh_token } => {
                let Some(refresh_token) = refresh_token.or_else(|| session.refresh_token.clone())
                else {
                    return CommandExecutionResult::Error("No refresh token available.".to_string());
                };
                let auth_client = match session.auth_client() {
                    Ok(x) => x,
                    Err(e) => return CommandExecutionResult::Error(e),
                };
                let grant = match session.runtime.block_on(auth_client.refresh(&refresh_token)) {
                    Ok(grant) => grant,
                    Err(e) => {
                        return CommandExecutionResult::Error(format!(
                            "Failed to refresh access token: {}",
                            e
                        ))
                    }
                };
                if session.refresh_token.is_none() {
                    session.refresh_token = Some(refresh_token);
                }
                print_success("Access token refreshed.");
                session.apply_grant(grant);
            }
            InnerCommand::SetToken { access_token } => {
                print_success(&format!("Using token {}", token_preview(&access_token)));
                session.access_token = Some(access_token);
            }
            InnerCommand::ShowToken => {
                print_section_header("Session");
                match session.access_token.as_deref() {
                    Some(token) => print_key_value("Access token", &token_preview(token)),
                    None => print_empty_list("No access token"),
                }
                match session.refresh_token.as_deref() {
                    Some(token) => print_key_value("Refresh token", &token_preview(token)),
                    None => print_empty_list("No refresh token"),
                }
                if session.pending_state.is_some() {
                    print_key_value("Pending authorization", "yes");
                }
                print_section_footer();
            }
            InnerCommand::Me => {
                let token = match session.token() {
                    Ok(x) => x,
                    Err(e) => return CommandExecutionResult::Error(e),
                };
                let user = match session.runtime.block_on(session.spotify.current_user(&token)) {
                    Ok(user) => user,
                    Err(e) => return CommandExecutionResult::Error(e.to_string()),
                };
                print_section_header("Profile");
                for key in ["display_name", "id", "email", "country", "product"] {
                    if let Some(value) = user.get(key).and_then(Value::as_str) {
                        print_key_value(key, value);
                    }
                }
                print_section_footer();
            }
            InnerCommand::Playlists => {
                let token = match session.token() {
                    Ok(x) => x,
                    Err(e) => return CommandExecutionResult::Error(e),
                };
                let playlists =
                    match session.runtime.block_on(session.spotify.user_playlists(&token)) {
                        Ok(playlists) => playlists,
                        Err(e) => return CommandExecutionResult::Error(e.to_string()),
                    };
                let items = playlists
                    .get("items")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                print_section_header("Playlists");
                if items.is_empty() {
                    print_empty_list("No playlists");
                }
                for playlist in items.iter() {
                    let name = playlist.get("name").and_then(Value::as_str).unwrap_or("?");
                    let id = playlist.get("id").and_then(Value::as_str).unwrap_or("?");
                    let total = playlist
                        .pointer("/tracks/total")
                        .and_then(Value::as_u64)
                        .unwrap_or(0);
                    print_list_item(&format!("{} ({}, {} tracks)", name, id, total), 1);
                }
                print_section_footer();
            }
            InnerCommand::AnalyzePlaylist { playlist_id } => {
                let token = match session.token() {
                    Ok(x) => x,
                    Err(e) => return CommandExecutionResult::Error(e),
                };
                match session
                    .runtime
                    .block_on(session.analysis.analyze_playlist(&token, &playlist_id))
                {
                    Ok(response) => print_analysis(&response),
                    Err(e) => return CommandExecutionResult::Error(e.to_string()),
                }
            }
            InnerCommand::AnalyzeRecent => {
                let token = match session.token() {
                    Ok(x) => x,
                    Err(e) => return CommandExecutionResult::Error(e),
                };
                match session
                    .runtime
                    .block_on(session.analysis.analyze_recent(&token))
                {
                    Ok(response) => print_analysis(&response),
                    Err(e) => return CommandExecutionResult::Error(e.to_string()),
                }
            }
            InnerCommand::Rules => {
                print_section_header("Mood rules");
                for (position, rule) in session.analysis.classifier().rules().iter().enumerate() {
                    let descriptor = rule.descriptor();
                    print_swatch(
                        &format!("{}. {}", position + 1, descriptor.name),
                        descriptor.color,
                        1,
                    );
                }
                println!();
                print_key_value_highlight("No rule matches", NO_MATCH_DESCRIPTOR.name);
                print_key_value_highlight("No features at all", NO_DATA_DESCRIPTOR.name);
                print_section_footer();
            }
            InnerCommand::Exit => return CommandExecutionResult::Exit,
        },

        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
        }
    }
    CommandExecutionResult::Ok
}

#[derive(rustyline_derive::Hinter)]
struct MyHelper {
    commands_names: Vec<String>,
}

impl MyHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        MyHelper { commands_names }
    }
}

impl Completer for MyHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for MyHelper {}
impl Validator for MyHelper {}
impl Helper for MyHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        client_id: cli_args.client_id.clone(),
        client_secret: cli_args.client_secret.clone(),
        redirect_uri: cli_args.redirect_uri.clone(),
        request_timeout_sec: cli_args.request_timeout_sec,
        ..Default::default()
    };
    let app_config = AppConfig::resolve(&cli_config, file_config)?;
    let mut session = Session::new(&app_config, cli_args.access_token.clone())?;

    print_banner();
    print_key_value("API", &app_config.spotify.api_base_url);
    print_key_value("Redirect URI", &app_config.spotify.redirect_uri);
    if session.auth_client.is_none() {
        print_warning("Spotify credentials not configured, login commands are unavailable.");
    }
    println!();
    InnerCli::command().print_long_help()?;

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<MyHelper, FileHistory>::with_config(config)?;

    let helper = MyHelper::new();
    rl.set_helper(Some(helper));

    loop {
        let readline = rl.readline(PROMPT);

        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &mut session) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        print_error(&err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    print_goodbye();
    Ok(())
}
