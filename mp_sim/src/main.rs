//! Scripted MParty tournament.
//!
//! Registers an organizer and a field of players, publishes an event, fills
//! the roster, draws pairings, settles a random podium and prints the
//! resulting rankings.

use std::sync::Arc;

use anyhow::Error;
use chrono::{Duration, Utc};
use ctrlc::set_handler;
use log::{debug, info, warn};
use mparty::{
    AccountManager, EventBus, EventCatalog, EventLifecycleManager, EventMode, MPartyConfig,
    MPartyError, NewEvent, Registration, Role,
    account::InMemoryIdentityProvider,
    leaderboard::{RankingBoard, RankingFilter},
    store::{DatabaseConfig, DocumentStore, InMemoryBlobStore, InMemoryStore, PgDocumentStore},
    tournament::{PairingGenerator, Placements},
};
use pico_args::Arguments;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

const HELP: &str = "\
Run a scripted MParty tournament from registration to rankings

USAGE:
  mp_sim [OPTIONS]

OPTIONS:
  --players    N           Players to register           [default: 7]
  --fee        AMOUNT      Entry fee; makes the event paid (10 seats)
  --seed       N           Seed for pairings and podium  [default: random]
  --db-url     URL         Use PostgreSQL instead of the in-memory store

FLAGS:
  --postgres               Use PostgreSQL configured from DATABASE_URL / DB_*
  -h, --help               Print help information

ENVIRONMENT:
  DATABASE_URL             PostgreSQL connection string
  PASSWORD_PEPPER          Password hashing pepper
  MPARTY_*                 Service limits and XP rewards
  RUST_LOG                 Log verbosity (e.g. info, mparty=debug)
";

const COUNTRIES: [&str; 3] = ["Chile", "Peru", "Mexico"];

struct Args {
    players: usize,
    fee: Option<String>,
    seed: Option<u64>,
    database_url: Option<String>,
    postgres: bool,
}

async fn open_store(args: &Args) -> Result<Arc<dyn DocumentStore>, Error> {
    if !args.postgres && args.database_url.is_none() {
        info!("Using in-memory store");
        return Ok(Arc::new(InMemoryStore::new()));
    }

    let mut db_config = DatabaseConfig::from_env();
    if let Some(url) = &args.database_url {
        db_config.database_url = url.clone();
    }

    let store = PgDocumentStore::connect(&db_config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    store.migrate().await?;
    store
        .health_check()
        .await
        .map_err(|e| anyhow::anyhow!("Database health check failed: {}", e))?;
    info!("Database connected successfully");
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        postgres: pargs.contains("--postgres"),
        players: pargs.opt_value_from_str("--players")?.unwrap_or(7),
        fee: pargs.opt_value_from_str("--fee")?,
        seed: pargs.opt_value_from_str("--seed")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();

    let config = MPartyConfig::from_env()?;
    let store = open_store(&args).await?;
    let blobs = Arc::new(InMemoryBlobStore::new());
    let bus = EventBus::default();

    let mut events = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!("{event:?}");
        }
    });

    let accounts = AccountManager::new(
        store.clone(),
        blobs.clone(),
        Arc::new(InMemoryIdentityProvider::new(config.password_pepper.clone())),
        bus.clone(),
        &config,
    );
    let catalog = EventCatalog::new(store.clone(), blobs, bus.clone(), &config);
    let lifecycle = EventLifecycleManager::new(store.clone(), bus.clone(), &config);
    let rankings = RankingBoard::new(store, bus, &config);

    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = StdRng::seed_from_u64(seed);
    info!("Seed {seed}");

    let host = accounts
        .register(Registration {
            email: "host@mparty.test".to_string(),
            password: "organizer".to_string(),
            display_name: "Host".to_string(),
            country: Some(COUNTRIES[0].to_string()),
            role: Role::Organizer,
        })
        .await?;

    let mut players = Vec::with_capacity(args.players);
    for i in 0..args.players {
        let player = accounts
            .register(Registration {
                email: format!("player{i}@mparty.test"),
                password: format!("player-{i}"),
                display_name: format!("Player {}", i + 1),
                country: Some(COUNTRIES[i % COUNTRIES.len()].to_string()),
                role: Role::Player,
            })
            .await?;
        players.push(player);
    }

    let event = catalog
        .create_event(
            &host,
            NewEvent {
                title: "Simulated Cup".to_string(),
                description: "Scripted run".to_string(),
                game_type: "Chess".to_string(),
                mode: EventMode::Competitive,
                location: "Online".to_string(),
                event_date: Utc::now() + Duration::hours(1),
                max_players: u32::try_from(args.players.max(2)).unwrap_or(u32::MAX),
                entry_fee: args.fee.clone(),
            },
        )
        .await?;
    println!(
        "Event '{}' ({} seats, {})",
        event.title, event.max_players, event.status
    );
    if let Some(prize) = EventCatalog::prize_preview(&event) {
        println!(
            "  pot {:.2} | app {:.2} | host {:.2} | 1st {:.2} | 2nd {:.2} | 3rd {:.2}",
            prize.total_pot(),
            prize.app_fee(),
            prize.host_profit(),
            prize.first_prize(),
            prize.second_prize(),
            prize.third_prize()
        );
    }

    for player in &players {
        match lifecycle.join(&event.id, player).await {
            Ok(_) => {}
            Err(e @ MPartyError::AlreadyFull { .. }) => {
                warn!("{} could not join: {e}", player.display_name);
            }
            Err(e) => return Err(e.into()),
        }
    }

    lifecycle.start_tournament(&event.id, &host.id).await?;

    println!("\nPairings:");
    let mut generator = PairingGenerator::with_rng(StdRng::seed_from_u64(seed));
    for pairing in lifecycle
        .generate_pairings_with(&event.id, &host.id, &mut generator)
        .await?
    {
        println!("  {pairing}");
    }

    let mut podium = lifecycle.roster(&event.id).await?;
    podium.shuffle(&mut rng);
    let winner = podium
        .first()
        .ok_or_else(|| anyhow::anyhow!("Roster is empty"))?;
    let mut placements = Placements::new(winner.id.clone());
    if let Some(second) = podium.get(1) {
        placements = placements.with_second(second.id.clone());
    }
    if let Some(third) = podium.get(2) {
        placements = placements.with_third(third.id.clone());
    }

    let settlement = lifecycle.finalize(&event.id, &host.id, &placements).await?;
    let host_stats = catalog.host_stats(&host.id).await?;
    println!(
        "\n{}: {} events created, {} participants",
        host.display_name, host_stats.events_created, host_stats.total_participants
    );
    println!("\nAwards:");
    for award in &settlement.awards {
        let name = podium
            .iter()
            .find(|p| p.id == award.user_id)
            .map_or(award.user_id.as_str(), |p| p.display_name.as_str());
        let place = award
            .placement
            .map_or_else(String::new, |p| format!(" ({p:?})"));
        println!("  {name}: +{} XP{place}", award.xp);
    }

    let updated = rankings.refresh_global_ranks().await?;
    info!("{updated} global ranks changed");

    println!("\nGlobal ranking:");
    for row in rankings.fetch_rankings(&RankingFilter::Global).await? {
        println!(
            "  #{:<3} {:<12} {:>4} XP  lvl {}  win rate {:.0}%",
            row.position,
            row.user.display_name,
            row.stats.xp,
            row.stats.level,
            row.stats.win_rate
        );
    }

    Ok(())
}
