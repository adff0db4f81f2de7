//! NPAT Duel
//!
//! Terminal front-end. Plays solo, hosts a room, or joins one; answers are
//! typed as `<category> <word>` lines.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use npat::{
    judge::judge_from_config, Category, Command, GameConfig, GameSession, GameStatus,
    JudgeConfig, Notice, Outcome, PeerConfig, PlayerProfile, RuntimeEvent, SessionRuntime,
    ValidationResult, DEFAULT_DURATION_SECS, DEFAULT_TOTAL_ROUNDS, VERSION,
};

#[derive(Debug, Parser)]
#[command(name = "npat-duel", version)]
#[command(about = "Name, Place, Animal, Thing - solo or against a friend")]
struct Args {
    /// Display name
    #[arg(long, global = true, default_value = "Player")]
    name: String,

    /// Avatar glyph
    #[arg(long, global = true, default_value = "🐶")]
    avatar: String,

    /// Round duration in seconds (10-300)
    #[arg(long, global = true, default_value_t = DEFAULT_DURATION_SECS)]
    duration: u32,

    /// Rounds per game (1-20)
    #[arg(long, global = true, default_value_t = DEFAULT_TOTAL_ROUNDS)]
    rounds: u32,

    /// Address of the host to dial when joining
    #[arg(long, global = true)]
    peer_host: Option<String>,

    /// Room code N listens on base port + N
    #[arg(long, global = true)]
    base_port: Option<u16>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Play alone
    Solo,
    /// Open a room and wait for a friend
    Host,
    /// Join a friend's room
    Join {
        /// Four-digit room code
        code: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they stay out of the game prompt
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("npat=info,npat_duel=info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let args = Args::parse();
    info!("NPAT Duel v{}", VERSION);

    let game_config = GameConfig::new(args.duration, args.rounds)?;

    let mut peer_config = PeerConfig::from_env();
    if let Some(host) = &args.peer_host {
        peer_config.host = host.clone();
    }
    if let Some(base_port) = args.base_port {
        peer_config.base_port = base_port;
    }

    let judge = judge_from_config(&JudgeConfig::from_env());
    let session = GameSession::new(PlayerProfile::new(args.name.clone(), args.avatar.clone()))
        .with_disconnect_grace(peer_config.disconnect_grace);

    let (runtime, commands, updates) = SessionRuntime::new(session, judge, peer_config);
    let runtime_task = tokio::spawn(runtime.run());

    let first = match &args.mode {
        Mode::Solo => Command::StartSolo(game_config),
        Mode::Host => Command::HostRoom,
        Mode::Join { code } => Command::Join(code.clone()),
    };
    commands.send(first).await.context("Runtime stopped")?;

    print_help();
    repl(&commands, updates, game_config, &args.mode).await?;

    let _ = commands.send(Command::Shutdown).await;
    runtime_task.await.context("Runtime task failed")?;
    Ok(())
}

async fn repl(
    commands: &mpsc::Sender<Command>,
    mut updates: mpsc::Receiver<RuntimeEvent>,
    game_config: GameConfig,
    mode: &Mode,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut status = GameStatus::Menu;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => return Ok(()),
                };
                match parse_line(&line, status, game_config, mode) {
                    Input::Quit => return Ok(()),
                    Input::Help => print_help(),
                    Input::Nothing => {}
                    Input::Unknown => println!("? Unknown input, type 'help'"),
                    Input::Send(cmd) => commands.send(cmd).await.context("Runtime stopped")?,
                }
            }
            event = updates.recv() => {
                let event = match event {
                    Some(event) => event,
                    None => return Ok(()),
                };
                if let RuntimeEvent::Notice(Notice::Status { status: s, .. }) = &event {
                    status = *s;
                }
                render(&event);
            }
        }
    }
}

enum Input {
    Send(Command),
    Help,
    Quit,
    Nothing,
    Unknown,
}

fn parse_line(line: &str, status: GameStatus, game_config: GameConfig, mode: &Mode) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Nothing;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_lowercase().as_str() {
        "quit" | "exit" => Input::Quit,
        "help" => Input::Help,
        "stop" | "done" => Input::Send(Command::Stop),
        "next" => Input::Send(Command::Advance),
        "menu" => Input::Send(Command::Reset),
        "say" => Input::Send(Command::Chat(rest.to_string())),
        "start" if matches!(mode, Mode::Host) => Input::Send(Command::StartHost(game_config)),
        "solo" if status == GameStatus::Menu => Input::Send(Command::StartSolo(game_config)),
        _ => match Category::parse(word) {
            Some(category) => Input::Send(Command::SetAnswer(category, rest.to_string())),
            None => Input::Unknown,
        },
    }
}

fn print_help() {
    println!("Commands:");
    println!("  name|place|animal|thing <word>  (or n/p/a/t) set an answer");
    println!("  stop                            submit now");
    println!("  next                            next round (host/solo)");
    println!("  start                           start the game (host)");
    println!("  say <text>                      chat with your opponent");
    println!("  menu | solo | quit");
}

fn render(event: &RuntimeEvent) {
    match event {
        RuntimeEvent::Notice(notice) => render_notice(notice),
        RuntimeEvent::Rejected(e) => println!("! {}", e),
        RuntimeEvent::LinkFailed(reason) => println!("! Connection failed: {}", reason),
    }
}

fn render_notice(notice: &Notice) {
    match notice {
        Notice::Status { status, round_index, letter } => match (status, letter) {
            (GameStatus::Countdown, Some(letter)) => {
                println!("\n=== Round {} - letter {} ===", round_index + 1, letter)
            }
            (GameStatus::Playing, _) => println!("Go! Type your answers."),
            (GameStatus::Validating, _) => println!("Judging..."),
            (GameStatus::Menu, _) => println!("Back at the menu."),
            _ => {}
        },
        Notice::TimeLeft(secs) if *secs % 10 == 0 || *secs <= 5 => println!("  {}s left", secs),
        Notice::TimeLeft(_) => {}
        Notice::RoomOpened(code) => println!("Room code: {}  (share it with your friend)", code),
        Notice::PeerConnected => println!("Peer connected."),
        Notice::OpponentProfile(p) => println!("Opponent: {} {}", p.avatar, p.name),
        Notice::LocalVerdict(v) => {
            println!("Your verdict ({} pts):", v.total_round_score);
            print_verdict(v);
        }
        Notice::RoundScored { mine, theirs, my_total, opponent_total, .. } => {
            if let Some(theirs) = theirs {
                println!("Adjusted: you {} / them {}", mine.total_round_score, theirs.total_round_score);
                print_verdict(mine);
                println!("Totals: you {} - them {}", my_total, opponent_total);
            } else {
                println!("Total: {}", my_total);
            }
        }
        Notice::Chat(entry) => println!("[{}] {}: {}", entry.sent_at.format("%H:%M"), entry.sender_name, entry.text),
        Notice::PeerLost(reason) => println!("Opponent disconnected ({})", reason),
        Notice::GameOver { outcome, my_total, opponent_total } => {
            let verdict = match outcome {
                Outcome::Solo => format!("Final score: {}", my_total),
                Outcome::Won => format!("You won! {} - {}", my_total, opponent_total),
                Outcome::Lost => format!("You lost. {} - {}", my_total, opponent_total),
                Outcome::Tie => format!("It's a tie! {} - {}", my_total, opponent_total),
                Outcome::Forfeit => format!("Opponent left. {} - {}", my_total, opponent_total),
            };
            println!("\n*** Game over *** {}", verdict);
        }
    }
}

fn print_verdict(result: &ValidationResult) {
    for category in Category::ALL {
        let item = result.item(category);
        let mark = if item.valid { "+" } else { "-" };
        println!("  {} {:<7} {:>2}  {}", mark, category.label(), item.score, item.message);
    }
}
