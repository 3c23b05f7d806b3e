use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use album_core::{
    favorite_label, AlbumApi, AlbumConfig, FilterFavorites, HttpApi, JsonFileStore, MediaId,
    MediaItem, MediaQuery, SortBy, SortOrder, DEFAULT_SERVER,
};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::engine::{ArgValueCompleter, CompletionCandidate};
use clap_complete::{generate, CompleteEnv, Shell};
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const COMPLETE_ENV_VAR: &str = "ALBUMCTL_COMPLETE";

#[derive(Parser)]
#[command(name = "albumctl", version, about = "CLI client for a photo album server")]
struct Cli {
    /// Album server base URL
    #[arg(long, short, env = "ALBUM_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    /// Filter favorites file
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    favorites: Option<PathBuf>,

    /// Suppress progress output
    #[arg(long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List one page of media
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        per_page: u32,
        #[arg(long, default_value = "capture_time", add = ArgValueCompleter::new(complete_sort_key))]
        sort_by: SortBy,
        #[arg(long, default_value = "desc", add = ArgValueCompleter::new(complete_sort_order))]
        sort_order: SortOrder,
        /// Print the raw items as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all tags
    Tags,
    /// Create a tag
    TagCreate { name: String },
    /// Delete a tag from every item
    TagDelete {
        id: i64,
        #[arg(long, short)]
        yes: bool,
    },
    /// Apply tags to one or more items
    Tag {
        #[arg(required = true)]
        ids: Vec<MediaId>,
        /// Tag to apply (repeatable, comma separated allowed)
        #[arg(long = "tag", short, required = true)]
        tags: Vec<String>,
    },
    /// Remove one tag from an item
    Untag { id: MediaId, tag: String },
    /// Replace an item's whole tag list
    SetTags {
        id: MediaId,
        #[arg(long = "tag", short)]
        tags: Vec<String>,
    },
    /// Move items to the server's archive
    Delete {
        #[arg(required = true)]
        ids: Vec<MediaId>,
        #[arg(long, short)]
        yes: bool,
        /// Skip the rescan that normally follows a deletion
        #[arg(long)]
        no_scan: bool,
    },
    /// Ask the server to rescan its media roots
    Scan,
    /// Set or clear the server-side filter
    Filter {
        #[command(subcommand)]
        command: FilterCommands,
    },
    /// Manage saved filter snippets
    Favorites {
        #[command(subcommand)]
        command: FavoriteCommands,
    },
    /// List organizational paths
    Paths,
    /// Download an item's file or thumbnail
    Fetch {
        id: MediaId,
        #[arg(long, short, value_hint = clap::ValueHint::FilePath)]
        output: PathBuf,
        #[arg(long)]
        thumbnail: bool,
    },
    /// Generate shell completion script
    Completion {
        #[arg(value_enum)]
        shell: Shell,
        /// Generate static (AOT) completion script instead of dynamic registration
        #[arg(long)]
        aot: bool,
    },
}

#[derive(Subcommand)]
enum FilterCommands {
    /// Set the active filter from an argument, a file, or a saved favorite
    Set {
        code: Option<String>,
        #[arg(long, value_hint = clap::ValueHint::FilePath, conflicts_with = "code")]
        file: Option<PathBuf>,
        /// 1-based favorite position
        #[arg(long, conflicts_with_all = ["code", "file"], add = ArgValueCompleter::new(complete_favorite))]
        favorite: Option<usize>,
    },
    /// Remove the active filter
    Clear,
}

#[derive(Subcommand)]
enum FavoriteCommands {
    /// Show saved snippets
    List,
    /// Save a snippet
    Add { snippet: String },
    /// Print one snippet in full
    Show {
        #[arg(add = ArgValueCompleter::new(complete_favorite))]
        position: usize,
    },
    /// Delete one snippet; later ones move up
    Remove {
        #[arg(add = ArgValueCompleter::new(complete_favorite))]
        position: usize,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    CompleteEnv::with_factory(Cli::command)
        .var(COMPLETE_ENV_VAR)
        .complete();

    init_tracing();
    let cli = Cli::parse();
    let mut config = AlbumConfig::default().with_server(cli.server.clone());
    if let Some(path) = cli.favorites.as_deref() {
        config = config.with_favorites_path(path);
    }

    match cli.command {
        Commands::List {
            page,
            per_page,
            sort_by,
            sort_order,
            json,
        } => {
            let query = MediaQuery {
                page,
                per_page,
                sort_by,
                sort_order,
            };
            list_command(&connect(&config)?, query, json).await
        }
        Commands::Tags => tags_command(&connect(&config)?).await,
        Commands::TagCreate { name } => tag_create_command(&connect(&config)?, &name).await,
        Commands::TagDelete { id, yes } => tag_delete_command(&connect(&config)?, id, yes).await,
        Commands::Tag { ids, tags } => tag_command(&connect(&config)?, ids, tags, cli.quiet).await,
        Commands::Untag { id, tag } => untag_command(&connect(&config)?, id, &tag).await,
        Commands::SetTags { id, tags } => set_tags_command(&connect(&config)?, id, tags).await,
        Commands::Delete { ids, yes, no_scan } => {
            delete_command(&connect(&config)?, ids, yes, no_scan).await
        }
        Commands::Scan => scan_command(&connect(&config)?).await,
        Commands::Filter { command } => filter_command(&config, command).await,
        Commands::Favorites { command } => favorites_command(&config, command),
        Commands::Paths => paths_command(&connect(&config)?).await,
        Commands::Fetch {
            id,
            output,
            thumbnail,
        } => fetch_command(&connect(&config)?, id, &output, thumbnail).await,
        Commands::Completion { shell, aot } => completion_command(shell, aot),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("albumctl=warn,album_core=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn connect(config: &AlbumConfig) -> Result<HttpApi> {
    HttpApi::new(&config.server).with_context(|| format!("invalid --server {}", config.server))
}

fn open_favorites(config: &AlbumConfig) -> FilterFavorites {
    FilterFavorites::new(Box::new(JsonFileStore::new(config.favorites_path.clone())))
}

fn completion_command(shell: Shell, aot: bool) -> Result<()> {
    if aot {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let current_dir = std::env::current_dir().ok();
    let argv0 = std::env::args_os()
        .next()
        .unwrap_or_else(|| OsString::from("albumctl"));
    let args = vec![argv0, OsString::from("--")];
    let shell_name = shell.to_string().to_ascii_lowercase();

    std::env::set_var(COMPLETE_ENV_VAR, shell_name);
    let completed = CompleteEnv::with_factory(Cli::command)
        .var(COMPLETE_ENV_VAR)
        .try_complete(args, current_dir.as_deref())?;
    std::env::remove_var(COMPLETE_ENV_VAR);

    if !completed {
        return Err(anyhow!("failed to generate dynamic completion script"));
    }
    Ok(())
}

fn complete_sort_key(current: &OsStr) -> Vec<CompletionCandidate> {
    let current = current.to_string_lossy();
    SortBy::ALL
        .iter()
        .map(|sort| sort.as_str())
        .filter(|name| name.starts_with(current.as_ref()))
        .map(CompletionCandidate::new)
        .collect()
}

fn complete_sort_order(current: &OsStr) -> Vec<CompletionCandidate> {
    let current = current.to_string_lossy();
    [SortOrder::Asc, SortOrder::Desc]
        .iter()
        .map(|order| order.as_str())
        .filter(|name| name.starts_with(current.as_ref()))
        .map(CompletionCandidate::new)
        .collect()
}

/// Offers saved favorite positions, labelled with the snippet.
fn complete_favorite(current: &OsStr) -> Vec<CompletionCandidate> {
    let current = current.to_string_lossy();
    let config = match favorites_path_from_env() {
        Some(path) => AlbumConfig::default().with_favorites_path(&path),
        None => AlbumConfig::default(),
    };
    let Ok(snippets) = open_favorites(&config).list() else {
        return Vec::new();
    };
    snippets
        .iter()
        .enumerate()
        .map(|(idx, snippet)| ((idx + 1).to_string(), favorite_label(snippet)))
        .filter(|(position, _)| position.starts_with(current.as_ref()))
        .map(|(position, label)| CompletionCandidate::new(position).help(Some(label.into())))
        .collect()
}

fn favorites_path_from_env() -> Option<PathBuf> {
    let words = completion_words_from_env();
    let mut found = None;
    let mut i = 0;
    while i < words.len() {
        let token = words[i].to_string_lossy();
        if token == "--favorites" {
            if let Some(value) = words.get(i + 1) {
                found = Some(PathBuf::from(value));
            }
            i += 2;
            continue;
        }
        if let Some(rest) = token.strip_prefix("--favorites=") {
            if !rest.is_empty() {
                found = Some(PathBuf::from(rest));
            }
        }
        i += 1;
    }
    found
}

fn completion_words_from_env() -> Vec<OsString> {
    let mut out = Vec::new();
    let mut after_sep = false;
    for arg in std::env::args_os().skip(1) {
        if after_sep {
            out.push(arg);
            continue;
        }
        if arg.as_os_str() == OsStr::new("--") {
            after_sep = true;
        }
    }
    out
}

async fn list_command(api: &HttpApi, query: MediaQuery, json: bool) -> Result<()> {
    let page = api
        .list_media(&query)
        .await
        .context("failed to list media")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page.media)?);
        return Ok(());
    }

    if page.media.is_empty() {
        println!("No media found matching your criteria.");
    }
    for item in &page.media {
        print_item(item);
    }
    match page.total_items {
        Some(total) => println!(
            "Page {} of {} ({total} items)",
            page.current_page, page.total_pages
        ),
        None => println!("Page {} of {}", page.current_page, page.total_pages),
    }
    Ok(())
}

fn print_item(item: &MediaItem) {
    println!("#{} {}", item.id, item.filename);
    if let Some(path) = &item.filepath {
        println!("  Path: {path}");
    }
    println!(
        "  Captured: {}",
        format_date_for_display(item.capture_time.as_deref())
    );
    println!(
        "  Modified: {}",
        format_date_for_display(item.modification_time.as_deref())
    );
    println!("  Size: {}", human_size(item.filesize));
    if item.tags.is_empty() {
        println!("  Tags: (none)");
    } else {
        println!("  Tags: {}", item.tags.join(", "));
    }
}

async fn tags_command(api: &HttpApi) -> Result<()> {
    let tags = api.list_tags().await.context("failed to list tags")?;
    if tags.is_empty() {
        println!("No tags.");
    }
    for tag in tags {
        println!("{:>5}  {}", tag.id, tag.name);
    }
    Ok(())
}

async fn tag_create_command(api: &HttpApi, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("tag name must not be empty"));
    }
    let tag = api.create_tag(name).await.context("failed to create tag")?;
    println!("Created tag '{}' (id {}).", tag.name, tag.id);
    Ok(())
}

async fn tag_delete_command(api: &HttpApi, id: i64, yes: bool) -> Result<()> {
    let name = api
        .list_tags()
        .await
        .ok()
        .and_then(|tags| tags.into_iter().find(|tag| tag.id == id))
        .map(|tag| tag.name)
        .unwrap_or_else(|| format!("#{id}"));
    if !yes && !confirm_on_stdin(&format!("Delete '{name}'?"))? {
        println!("Canceled.");
        return Ok(());
    }
    api.delete_tag(id).await.context("failed to delete tag")?;
    println!("Tag '{name}' deleted.");
    Ok(())
}

/// Applies the tags item by item. Earlier successes stand when a later
/// item fails.
async fn tag_command(api: &HttpApi, ids: Vec<MediaId>, tags: Vec<String>, quiet: bool) -> Result<()> {
    let tags = flatten_tag_args(tags);
    if tags.is_empty() {
        return Err(anyhow!("no tags given"));
    }

    let show_progress = !quiet && io::stderr().is_terminal() && ids.len() > 1;
    let progress = if show_progress {
        let pb = ProgressBar::new(ids.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
                .context("invalid progress template")?
                .progress_chars("=>-"),
        );
        pb.set_message("tagging");
        Some(pb)
    } else {
        None
    };

    let mut succeeded = 0;
    let mut failed = 0;
    for id in &ids {
        match api.apply_tags(*id, &tags).await {
            Ok(now) => {
                succeeded += 1;
                debug!("media {id} tags now {:?}", now);
            }
            Err(err) => {
                failed += 1;
                warn!("media {id}: {err}");
                if let Some(pb) = &progress {
                    pb.println(format!("#{id}: {}", err.user_message()));
                } else {
                    eprintln!("#{id}: {}", err.user_message());
                }
            }
        }
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    println!("Batch: {succeeded} success, {failed} failed.");
    if failed > 0 {
        return Err(anyhow!("{failed} item(s) could not be tagged"));
    }
    Ok(())
}

async fn untag_command(api: &HttpApi, id: MediaId, tag: &str) -> Result<()> {
    let tags = api
        .remove_tag(id, tag)
        .await
        .with_context(|| format!("failed to remove tag '{tag}'"))?;
    print_tag_list(id, &tags);
    Ok(())
}

async fn set_tags_command(api: &HttpApi, id: MediaId, tags: Vec<String>) -> Result<()> {
    let tags = flatten_tag_args(tags);
    let now = api
        .replace_tags(id, &tags)
        .await
        .context("failed to replace tags")?;
    print_tag_list(id, &now);
    Ok(())
}

fn print_tag_list(id: MediaId, tags: &[String]) {
    if tags.is_empty() {
        println!("#{id}: (no tags)");
    } else {
        println!("#{id}: {}", tags.join(", "));
    }
}

async fn delete_command(api: &HttpApi, ids: Vec<MediaId>, yes: bool, no_scan: bool) -> Result<()> {
    let prompt = format!(
        "Are you sure you want to delete {} selected photo(s)? This will move them to the archive.",
        ids.len()
    );
    if !yes && !confirm_on_stdin(&prompt)? {
        println!("Canceled.");
        return Ok(());
    }

    let response = api
        .delete_media(&ids)
        .await
        .context("failed to delete media")?;
    let summary = &response.summary;
    let message = summary
        .message
        .clone()
        .or_else(|| summary.error.clone())
        .unwrap_or_else(|| format!("Deleted {} item(s).", summary.success_count));
    println!("{message}");
    if !summary.failures.is_empty() {
        println!("{} failed:", summary.failures.len());
        for failure in &summary.failures {
            println!("  #{}: {}", failure.id_label(), failure.reason);
        }
    }

    if (response.ok || summary.success_count > 0) && !no_scan {
        match api.trigger_scan().await {
            Ok(message) => println!("{message}"),
            Err(err) => eprintln!("warning: rescan failed: {}", err.user_message()),
        }
    }
    if !response.ok && summary.success_count == 0 {
        return Err(anyhow!("nothing was deleted"));
    }
    Ok(())
}

async fn scan_command(api: &HttpApi) -> Result<()> {
    let message = api.trigger_scan().await.context("scan failed")?;
    println!("{message}");
    Ok(())
}

async fn filter_command(config: &AlbumConfig, command: FilterCommands) -> Result<()> {
    let api = connect(config)?;
    match command {
        FilterCommands::Set {
            code,
            file,
            favorite,
        } => {
            let code = match (code, file, favorite) {
                (Some(code), _, _) => code,
                (None, Some(path), _) => fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None, Some(position)) => open_favorites(config)
                    .get(position_to_index(position)?)?
                    .ok_or_else(|| anyhow!("no favorite at position {position}"))?,
                (None, None, None) => return Err(anyhow!("give a filter, --file or --favorite")),
            };
            api.set_filter(&code)
                .await
                .map_err(|err| anyhow!("Error: {}", err.user_message()))?;
            println!("Filter applied!");
        }
        FilterCommands::Clear => {
            api.clear_filter()
                .await
                .map_err(|err| anyhow!("Error: {}", err.user_message()))?;
            println!("Filter cleared!");
        }
    }
    Ok(())
}

fn favorites_command(config: &AlbumConfig, command: FavoriteCommands) -> Result<()> {
    let mut favorites = open_favorites(config);
    match command {
        FavoriteCommands::List => {
            let snippets = favorites.list()?;
            if snippets.is_empty() {
                println!("No favorite filters saved yet.");
            }
            for (idx, snippet) in snippets.iter().enumerate() {
                println!("{:>3}. {}", idx + 1, favorite_label(snippet));
            }
        }
        FavoriteCommands::Add { snippet } => {
            if !favorites.add(&snippet)? {
                return Err(anyhow!("Cannot save an empty filter snippet."));
            }
            println!("Saved to favorites.");
        }
        FavoriteCommands::Show { position } => {
            let snippet = favorites
                .get(position_to_index(position)?)?
                .ok_or_else(|| anyhow!("no favorite at position {position}"))?;
            println!("{snippet}");
        }
        FavoriteCommands::Remove { position } => {
            let removed = favorites
                .delete(position_to_index(position)?)?
                .ok_or_else(|| anyhow!("no favorite at position {position}"))?;
            println!("Removed: {}", favorite_label(&removed));
        }
    }
    Ok(())
}

fn position_to_index(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| anyhow!("positions start at 1"))
}

async fn paths_command(api: &HttpApi) -> Result<()> {
    let paths = api
        .list_org_paths()
        .await
        .context("failed to list organizational paths")?;
    for path in paths {
        println!("{path}");
    }
    Ok(())
}

async fn fetch_command(api: &HttpApi, id: MediaId, output: &Path, thumbnail: bool) -> Result<()> {
    let bytes = if thumbnail {
        api.fetch_thumbnail(id).await
    } else {
        api.fetch_file(id).await
    }
    .with_context(|| format!("failed to fetch media {id}"))?;
    fs::write(output, &bytes).with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote {} to {}", format_size(bytes.len(), DECIMAL), output.display());
    Ok(())
}

fn confirm_on_stdin(prompt: &str) -> Result<bool> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Err(anyhow!("refusing to continue without --yes on a non-interactive stdin"));
    }
    eprint!("{prompt} [y/N] ");
    io::stderr().flush().ok();
    let mut answer = String::new();
    stdin
        .lock()
        .read_line(&mut answer)
        .context("failed to read answer")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}

fn flatten_tag_args(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        for part in tag.split(',') {
            let part = part.trim();
            if !part.is_empty() && !out.iter().any(|seen| seen == part) {
                out.push(part.to_string());
            }
        }
    }
    out
}

fn human_size(bytes: Option<u64>) -> String {
    match bytes {
        Some(bytes) => format_size(bytes, DECIMAL),
        None => "(unknown)".to_string(),
    }
}

fn format_date_for_display(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "(none)".to_string();
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "(none)".to_string();
    }
    format_date_string(trimmed).unwrap_or_else(|| trimmed.to_string())
}

fn format_date_string(raw: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(format_local_datetime(dt.with_timezone(&Local)));
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y:%m:%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            if let Some(local_dt) = localize_naive_datetime(naive) {
                return Some(format_local_datetime(local_dt));
            }
        }
    }

    None
}

fn localize_naive_datetime(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    let local = Local.from_local_datetime(&naive);
    local
        .single()
        .or_else(|| local.earliest())
        .or_else(|| local.latest())
}

fn format_local_datetime(dt: DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S %:z").to_string()
}
