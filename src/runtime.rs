//! Session Runtime
//!
//! Drives a [`GameSession`] on tokio. UI commands, timer fires, judge
//! results, and peer link events are fed to the controller one at a time;
//! the effects it returns are carried out here.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::{GameConfig, PeerConfig};
use crate::core::rng::DeterministicRng;
use crate::game::effects::{Effect, JudgeRequest, Notice};
use crate::game::session::{GameSession, SessionError};
use crate::game::state::{Category, GameInputs, PlayerProfile, RoundTag, ValidationResult};
use crate::judge::{judge_or_fallback, Judge};
use crate::network::protocol::PeerMessage;
use crate::network::room::RoomCode;
use crate::network::transport::{dial, HostRoom, LinkEvent, PeerLink};

const CHANNEL_CAPACITY: usize = 64;

/// Requests from the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Change the local profile.
    SetProfile(PlayerProfile),
    /// Start a solo game.
    StartSolo(GameConfig),
    /// Open a room for a guest.
    HostRoom,
    /// Start the multiplayer game as host.
    StartHost(GameConfig),
    /// Join a host's room.
    Join(String),
    /// Update one answer.
    SetAnswer(Category, String),
    /// Submit these answers.
    Submit(GameInputs),
    /// Stop early with the current answers.
    Stop,
    /// Next round or end of game.
    Advance,
    /// Chat line.
    Chat(String),
    /// Back to the menu.
    Reset,
    /// Stop the runtime.
    Shutdown,
}

/// Output for the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    /// Something changed.
    Notice(Notice),
    /// A command was refused.
    Rejected(SessionError),
    /// Hosting or joining failed.
    LinkFailed(String),
}

enum Internal {
    CountdownElapsed(RoundTag),
    Tick { tag: RoundTag, remaining: u32 },
    Judged { tag: RoundTag, verdict: ValidationResult },
    ForfeitElapsed,
    RoomOpened(RoomCode),
    HostLinked(WebSocketStream<TcpStream>),
    GuestLinked(WebSocketStream<MaybeTlsStream<TcpStream>>),
    LinkFailed(String),
}

/// Async driver for one session.
pub struct SessionRuntime {
    driver: Driver,
    commands: mpsc::Receiver<Command>,
    internal_rx: mpsc::Receiver<Internal>,
    link_rx: mpsc::Receiver<LinkEvent>,
}

struct Driver {
    session: GameSession,
    judge: Arc<dyn Judge>,
    peer_config: PeerConfig,
    rng: DeterministicRng,
    updates: mpsc::Sender<RuntimeEvent>,
    internal_tx: mpsc::Sender<Internal>,
    link_tx: mpsc::Sender<LinkEvent>,
    link: Option<PeerLink>,
    connecting: Option<JoinHandle<()>>,
    countdown: Option<JoinHandle<()>>,
    round_timer: Option<JoinHandle<()>>,
    forfeit: Option<JoinHandle<()>>,
}

impl SessionRuntime {
    /// Build a runtime plus the command sender and update receiver the UI
    /// talks through.
    pub fn new(
        session: GameSession,
        judge: Arc<dyn Judge>,
        peer_config: PeerConfig,
    ) -> (Self, mpsc::Sender<Command>, mpsc::Receiver<RuntimeEvent>) {
        let (command_tx, commands) = mpsc::channel(CHANNEL_CAPACITY);
        let (updates, update_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (internal_tx, internal_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (link_tx, link_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let rng = DeterministicRng::for_session(&session.state().session_id);

        let runtime = Self {
            driver: Driver {
                session,
                judge,
                peer_config,
                rng,
                updates,
                internal_tx,
                link_tx,
                link: None,
                connecting: None,
                countdown: None,
                round_timer: None,
                forfeit: None,
            },
            commands,
            internal_rx,
            link_rx,
        };
        (runtime, command_tx, update_rx)
    }

    /// Run until `Shutdown` or until every command sender is dropped.
    pub async fn run(self) {
        let SessionRuntime {
            mut driver,
            mut commands,
            mut internal_rx,
            mut link_rx,
        } = self;

        info!("Session {} runtime started", driver.session.state().short_id());

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => driver.handle_command(cmd).await,
                },
                Some(event) = internal_rx.recv() => driver.handle_internal(event).await,
                Some(event) = link_rx.recv() => driver.handle_link(event).await,
            }
        }

        driver.cancel_timers();
        driver.close_link();
        info!("Session {} runtime stopped", driver.session.state().short_id());
    }
}

impl Driver {
    async fn handle_command(&mut self, cmd: Command) {
        let result = match cmd {
            Command::SetProfile(profile) => self.session.set_profile(profile).map(|_| Vec::new()),
            Command::StartSolo(config) => self.session.start_solo(config),
            Command::HostRoom => self.session.host_room(),
            Command::StartHost(config) => self.session.start_as_host(config),
            Command::Join(code) => self.session.join_as_guest(&code),
            Command::SetAnswer(category, text) => {
                self.session.set_answer(category, &text).map(|_| Vec::new())
            }
            Command::Submit(inputs) => Ok(self.session.submit_round(inputs)),
            Command::Stop => Ok(self.session.stop_round()),
            Command::Advance => self.session.advance(),
            Command::Chat(text) => self.session.send_chat(&text),
            Command::Reset => Ok(self.session.reset()),
            Command::Shutdown => Ok(Vec::new()),
        };

        match result {
            Ok(effects) => self.execute(effects).await,
            Err(e) => {
                warn!("Command rejected: {}", e);
                self.emit(RuntimeEvent::Rejected(e)).await;
            }
        }
    }

    async fn handle_internal(&mut self, event: Internal) {
        let effects = match event {
            Internal::CountdownElapsed(tag) => self.session.countdown_elapsed(tag),
            Internal::Tick { tag, remaining } => self.session.timer_tick(tag, remaining),
            Internal::Judged { tag, verdict } => self.session.complete_judging(tag, verdict),
            Internal::ForfeitElapsed => {
                self.forfeit = None;
                self.session.forfeit_elapsed()
            }
            Internal::RoomOpened(code) => self.session.room_opened(code),
            Internal::HostLinked(ws) => {
                let link = PeerLink::spawn(ws, self.link_tx.clone());
                self.linked(link)
            }
            Internal::GuestLinked(ws) => {
                let link = PeerLink::spawn(ws, self.link_tx.clone());
                self.linked(link)
            }
            Internal::LinkFailed(reason) => {
                self.connecting = None;
                self.emit(RuntimeEvent::LinkFailed(reason.clone())).await;
                self.session.peer_disconnected(&reason)
            }
        };
        self.execute(effects).await;
    }

    fn linked(&mut self, link: PeerLink) -> Vec<Effect> {
        self.connecting = None;
        if self.session.state().link.role.is_none() {
            debug!("Dropping peer link opened after the room was abandoned");
            drop(link);
            return Vec::new();
        }
        self.link = Some(link);
        abort(&mut self.forfeit);
        self.session.peer_connected()
    }

    async fn handle_link(&mut self, event: LinkEvent) {
        let effects = match event {
            LinkEvent::Message(msg) => {
                if self.link.is_none() {
                    debug!("Dropping {} from a closed link", msg.kind());
                    return;
                }
                self.session.receive_peer_message(msg)
            }
            LinkEvent::Closed(reason) => {
                if self.link.take().is_none() {
                    return;
                }
                self.session.peer_disconnected(&reason)
            }
        };
        self.execute(effects).await;
    }

    async fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(msg) => self.send(msg),
                Effect::OpenRoom => self.open_room(),
                Effect::Connect { room_code } => self.connect(&room_code),
                Effect::CloseLink => self.close_link(),
                Effect::StartCountdown { tag, delay } => {
                    abort(&mut self.countdown);
                    self.countdown = Some(self.after(delay, Internal::CountdownElapsed(tag)));
                }
                Effect::StartRoundTimer { tag, seconds } => {
                    abort(&mut self.round_timer);
                    self.round_timer = Some(self.start_round_timer(tag, seconds));
                }
                Effect::CancelTimers => self.cancel_timers(),
                Effect::Judge(request) => self.spawn_judge(request),
                Effect::ScheduleForfeit { grace } => {
                    abort(&mut self.forfeit);
                    self.forfeit = Some(self.after(grace, Internal::ForfeitElapsed));
                }
                Effect::Notify(notice) => self.emit(RuntimeEvent::Notice(notice)).await,
            }
        }
    }

    fn send(&self, msg: PeerMessage) {
        match &self.link {
            Some(link) => {
                if let Err(e) = link.send(&msg) {
                    warn!("Failed to send {}: {}", msg.kind(), e);
                }
            }
            None => debug!("No peer link, dropping {}", msg.kind()),
        }
    }

    fn open_room(&mut self) {
        abort(&mut self.connecting);
        let config = self.peer_config.clone();
        let mut rng = DeterministicRng::new(self.rng.next_u64());
        let internal = self.internal_tx.clone();

        self.connecting = Some(tokio::spawn(async move {
            let room = match HostRoom::open(&config, &mut rng).await {
                Ok(room) => room,
                Err(e) => {
                    let _ = internal.send(Internal::LinkFailed(e.to_string())).await;
                    return;
                }
            };
            let _ = internal.send(Internal::RoomOpened(room.code())).await;

            let event = match room.accept().await {
                Ok(ws) => Internal::HostLinked(ws),
                Err(e) => Internal::LinkFailed(e.to_string()),
            };
            let _ = internal.send(event).await;
        }));
    }

    fn connect(&mut self, room_code: &str) {
        abort(&mut self.connecting);
        let code = match RoomCode::parse(room_code) {
            Some(code) => code,
            None => {
                warn!("Cannot dial malformed room code {}", room_code);
                return;
            }
        };
        let config = self.peer_config.clone();
        let internal = self.internal_tx.clone();

        self.connecting = Some(tokio::spawn(async move {
            let event = match dial(&config, code).await {
                Ok(ws) => Internal::GuestLinked(ws),
                Err(e) => Internal::LinkFailed(e.to_string()),
            };
            let _ = internal.send(event).await;
        }));
    }

    fn close_link(&mut self) {
        abort(&mut self.connecting);
        abort(&mut self.forfeit);
        if self.link.take().is_some() {
            info!("Peer link closed locally");
        }
    }

    fn spawn_judge(&self, request: JudgeRequest) {
        let judge = Arc::clone(&self.judge);
        let internal = self.internal_tx.clone();

        tokio::spawn(async move {
            let verdict = judge_or_fallback(judge.as_ref(), request.letter, &request.inputs).await;
            let _ = internal
                .send(Internal::Judged {
                    tag: request.tag,
                    verdict,
                })
                .await;
        });
    }

    fn after(&self, delay: Duration, event: Internal) -> JoinHandle<()> {
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = internal.send(event).await;
        })
    }

    fn start_round_timer(&self, tag: RoundTag, seconds: u32) -> JoinHandle<()> {
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            for remaining in (0..seconds).rev() {
                tokio::time::sleep(Duration::from_secs(1)).await;
                if internal.send(Internal::Tick { tag, remaining }).await.is_err() {
                    return;
                }
            }
        })
    }

    fn cancel_timers(&mut self) {
        abort(&mut self.countdown);
        abort(&mut self.round_timer);
    }

    async fn emit(&self, event: RuntimeEvent) {
        if self.updates.send(event).await.is_err() {
            debug!("UI receiver gone");
        }
    }
}

fn abort(handle: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = handle.take() {
        handle.abort();
    }
}
