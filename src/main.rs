use citadel::cache::{Cache, NoopCache, SqliteCache};
use citadel::catalog::{CatalogClient, Character, Entity, Episode, Field, Kind, Location};
use citadel::config::Config;
use citadel::controller::FetchController;
use citadel::detail::{DetailLoader, Source};
use citadel::error::FetchError;
use citadel::logging;
use citadel::query::{Predicates, QueryContext};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "citadel")]
#[command(about = "Browse the Rick and Morty catalog, with an offline cache")]
#[command(version)]
struct Cli {
  /// Path to config file (default: $XDG_CONFIG_HOME/citadel/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Neither read nor write the local cache
  #[arg(long)]
  no_cache: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Browse every record of a kind
  List {
    kind: KindArg,
    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pages: u32,
  },
  /// Search records by name
  Search {
    kind: KindArg,
    query: String,
    #[arg(long, default_value_t = 1)]
    pages: u32,
  },
  /// Filter records by field
  Filter {
    kind: KindArg,
    #[command(flatten)]
    filters: FilterArgs,
    #[arg(long, default_value_t = 1)]
    pages: u32,
  },
  /// Show one record with its related records
  Show { kind: KindArg, id: u32 },
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
  #[arg(long)]
  name: Option<String>,
  #[arg(long)]
  status: Option<String>,
  #[arg(long)]
  species: Option<String>,
  #[arg(long = "type")]
  subtype: Option<String>,
  #[arg(long)]
  gender: Option<String>,
  #[arg(long)]
  dimension: Option<String>,
  #[arg(long)]
  episode: Option<String>,
}

impl FilterArgs {
  fn into_predicates(self) -> Predicates {
    [
      (Field::Name, self.name),
      (Field::Status, self.status),
      (Field::Species, self.species),
      (Field::Type, self.subtype),
      (Field::Gender, self.gender),
      (Field::Dimension, self.dimension),
      (Field::Episode, self.episode),
    ]
    .into_iter()
    .filter_map(|(field, value)| value.map(|v| (field, v)))
    .collect()
  }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
  Character,
  Location,
  Episode,
}

impl From<KindArg> for Kind {
  fn from(arg: KindArg) -> Self {
    match arg {
      KindArg::Character => Kind::Character,
      KindArg::Location => Kind::Location,
      KindArg::Episode => Kind::Episode,
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let cli = Cli::parse();
  let config = Config::load(cli.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;

  let api = Arc::new(CatalogClient::new(&config.api)?);
  info!(base_url = %api.base_url(), "catalog client ready");

  if cli.no_cache || !config.cache.enabled {
    info!("cache disabled");
    run(cli.command, api, Arc::new(NoopCache)).await
  } else {
    let cache = SqliteCache::open(config.cache.path.as_deref())?;
    run(cli.command, api, Arc::new(cache)).await
  }
}

async fn run<C: Cache>(command: Command, api: Arc<CatalogClient>, cache: Arc<C>) -> Result<()> {
  match command {
    Command::List { kind, pages } => {
      browse(kind.into(), api, cache, QueryContext::Browse, pages).await
    }
    Command::Search { kind, query, pages } => {
      browse(kind.into(), api, cache, QueryContext::search(&query), pages).await
    }
    Command::Filter {
      kind,
      filters,
      pages,
    } => {
      let context = QueryContext::filter(filters.into_predicates());
      browse(kind.into(), api, cache, context, pages).await
    }
    Command::Show { kind, id } => {
      let loader = DetailLoader::new(api, cache);
      match Kind::from(kind) {
        Kind::Character => show::<Character, C>(&loader, id).await,
        Kind::Location => show::<Location, C>(&loader, id).await,
        Kind::Episode => show::<Episode, C>(&loader, id).await,
      }
    }
  }
}

async fn browse<C: Cache>(
  kind: Kind,
  api: Arc<CatalogClient>,
  cache: Arc<C>,
  context: QueryContext,
  pages: u32,
) -> Result<()> {
  match kind {
    Kind::Character => browse_kind::<Character, C>(api, cache, context, pages).await,
    Kind::Location => browse_kind::<Location, C>(api, cache, context, pages).await,
    Kind::Episode => browse_kind::<Episode, C>(api, cache, context, pages).await,
  }
}

async fn browse_kind<T: Entity + Display, C: Cache>(
  api: Arc<CatalogClient>,
  cache: Arc<C>,
  context: QueryContext,
  pages: u32,
) -> Result<()> {
  let controller = FetchController::<T>::spawn(api, cache);
  let mut errors = controller.state().subscribe_error();

  controller.set_query_context(context)?;
  let mut status = controller.settled().await?;
  report_error(&mut errors);

  for _ in 1..pages {
    if status.is_last_page {
      break;
    }
    let before = status.current_page;
    controller.request_next_page()?;
    status = controller.settled().await?;
    report_error(&mut errors);

    // Offline or end of data
    if status.current_page == before {
      break;
    }
  }

  let state = controller.state();
  if state.no_results() {
    println!("No {} found.", T::KIND.plural());
    return Ok(());
  }

  let items = state.items();
  for item in items.iter() {
    println!("{}", item);
  }
  println!(
    "\n{} {}, {} page(s){}",
    items.len(),
    T::KIND.plural(),
    status.current_page,
    if status.is_last_page { ", end of results" } else { "" }
  );

  Ok(())
}

async fn show<T, C>(loader: &DetailLoader<CatalogClient, C>, id: u32) -> Result<()>
where
  T: Entity + Display,
  T::Related: Display,
  C: Cache,
{
  let detail = loader.load::<T>(id).await?;

  if let Source::Offline { reason } = &detail.source {
    eprintln!("warning: showing cached data ({})", reason);
  }

  println!("{}", detail.entity);
  println!(
    "\n{} {}:",
    detail.related.len(),
    <T::Related as Entity>::KIND.plural()
  );
  for related in &detail.related {
    println!("  {}", related);
  }

  Ok(())
}

fn report_error(errors: &mut watch::Receiver<Option<FetchError>>) {
  if !errors.has_changed().unwrap_or(false) {
    return;
  }
  if let Some(error) = errors.borrow_and_update().as_ref() {
    eprintln!("warning: {}", error);
  }
}
