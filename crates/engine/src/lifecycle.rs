use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info, warn};

use common::{
    ChartRenderer, ChatTarget, Error, MarketDataSource, Notifier, ScannerCommand, ScannerMode,
    ScannerStatus, Symbol, TradeDecision, VisionClassifier,
};
use strategy::{CandidateSelector, ScannerFileConfig};

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::pipeline::SignalPipeline;
use crate::state::{Outcome, SessionState};

/// Cloneable handle passed to the control bot and the binary.
#[derive(Clone)]
pub struct ScannerHandle {
    command_tx: mpsc::Sender<ScannerCommand>,
    status: Arc<RwLock<ScannerStatus>>,
}

impl ScannerHandle {
    pub async fn send(&self, cmd: ScannerCommand) {
        let _ = self.command_tx.send(cmd).await;
    }

    pub async fn status(&self) -> ScannerStatus {
        self.status.read().await.clone()
    }

    pub fn command_sender(&self) -> mpsc::Sender<ScannerCommand> {
        self.command_tx.clone()
    }

    pub fn shared_status(&self) -> Arc<RwLock<ScannerStatus>> {
        self.status.clone()
    }
}

/// External services the scanner talks to.
pub struct Collaborators {
    pub source: Arc<dyn MarketDataSource>,
    pub renderer: Arc<dyn ChartRenderer>,
    pub classifier: Arc<dyn VisionClassifier>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Drives scan cycles: select candidates, evaluate them one at a time,
/// dispatch signals, sleep, repeat.
pub struct Scanner {
    selector: CandidateSelector,
    source: Arc<dyn MarketDataSource>,
    pipeline: SignalPipeline,
    dispatcher: Dispatcher,
    symbol_cooldown: Duration,
    cycle_interval: Duration,
    heartbeat: bool,
    single_pass: bool,
    state: SessionState,
    status: Arc<RwLock<ScannerStatus>>,
    command_rx: mpsc::Receiver<ScannerCommand>,
    commands_open: bool,
}

impl Scanner {
    pub fn new(
        config: &ScannerFileConfig,
        channel: ChatTarget,
        deps: Collaborators,
    ) -> (Self, ScannerHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let status = Arc::new(RwLock::new(ScannerStatus {
            daily_cap: config.signals.daily_cap,
            signals_date: Some(Utc::now().date_naive()),
            watchlist: config.selection.symbols.clone(),
            ..Default::default()
        }));

        let pacing = &config.pacing;
        let scanner = Scanner {
            selector: CandidateSelector::new(config.selection.clone(), pacing.fetch_timeout()),
            source: deps.source.clone(),
            pipeline: SignalPipeline::new(deps.source, deps.renderer, deps.classifier, pacing),
            dispatcher: Dispatcher::new(
                deps.notifier,
                channel,
                config.signals.sticker_id.clone(),
                pacing.sticker_delay(),
            ),
            symbol_cooldown: pacing.symbol_cooldown(),
            cycle_interval: pacing.cycle_interval(),
            heartbeat: config.signals.heartbeat,
            single_pass: config.run.single_pass,
            state: SessionState::new(config.signals.daily_cap, Utc::now()),
            status: status.clone(),
            command_rx,
            commands_open: true,
        };

        (scanner, ScannerHandle { command_tx, status })
    }

    /// Run until the command channel closes while idle, or after one cycle
    /// in single-pass mode. Call from `tokio::spawn`.
    pub async fn run(mut self) -> SessionState {
        info!(
            single_pass = self.single_pass,
            "Scanner initialized in Idle state. Waiting for Start command."
        );

        let mut mode = ScannerMode::Idle;
        loop {
            match mode {
                ScannerMode::Idle => match self.command_rx.recv().await {
                    Some(ScannerCommand::Start) => {
                        info!("Scanner starting");
                        mode = ScannerMode::Scanning;
                        self.set_mode(mode).await;
                        self.publish_signals().await;
                    }
                    Some(ScannerCommand::Stop) => debug!("Stop received but scanner is idle"),
                    Some(edit) => {
                        self.on_command(Some(edit)).await;
                    }
                    None => {
                        warn!("Scanner command channel closed, shutting down");
                        break;
                    }
                },

                ScannerMode::Scanning => {
                    let mut flow = self.run_cycle().await;
                    if flow == Flow::Continue && self.single_pass {
                        info!("Single pass complete, scanner exiting");
                        self.set_mode(ScannerMode::Idle).await;
                        break;
                    }
                    if flow == Flow::Continue {
                        info!(secs = self.cycle_interval.as_secs(), "Sleeping until next cycle");
                        flow = self.pause(self.cycle_interval).await;
                    }
                    if flow == Flow::Stop {
                        info!("Scanner stopped");
                        mode = ScannerMode::Idle;
                        self.set_mode(mode).await;
                    }
                }
            }
        }

        self.state
    }

    async fn run_cycle(&mut self) -> Flow {
        let cycle = self.status.read().await.cycles_completed + 1;
        info!(cycle, "Cycle started");
        self.publish_signals().await;

        let candidates = self.selector.select(self.source.as_ref()).await;
        self.state.candidates = candidates.clone();
        if candidates.is_empty() {
            info!(cycle, "No candidates this cycle");
        }

        for (i, symbol) in candidates.iter().enumerate() {
            if self.poll_commands().await == Flow::Stop {
                return Flow::Stop;
            }

            info!(pair = %symbol, position = i + 1, total = candidates.len(), "Analyzing");
            self.process(symbol).await;
            self.publish_signals().await;

            if i + 1 < candidates.len() && self.pause(self.symbol_cooldown).await == Flow::Stop {
                return Flow::Stop;
            }
        }

        {
            let mut status = self.status.write().await;
            status.cycles_completed += 1;
            status.last_cycle_at = Some(Utc::now());
        }
        info!(cycle, analyzed = candidates.len(), "Cycle complete");

        if self.heartbeat {
            self.dispatcher.heartbeat().await;
        }
        Flow::Continue
    }

    async fn process(&mut self, symbol: &Symbol) {
        let outcome = match self.pipeline.evaluate(symbol).await {
            Ok(TradeDecision::Wait { reason }) => {
                info!(pair = %symbol, reason = reason.as_deref().unwrap_or(""), "WAIT");
                Outcome::Wait
            }
            Ok(TradeDecision::Trade(setup)) => {
                info!(pair = %symbol, side = %setup.side, entry = setup.entry, "Actionable signal");
                match self
                    .dispatcher
                    .dispatch(symbol, &setup, &mut self.state.cap, Utc::now())
                    .await
                {
                    DispatchOutcome::Sent => Outcome::Signalled,
                    DispatchOutcome::CapReached => Outcome::Suppressed,
                    DispatchOutcome::Failed => Outcome::DispatchFailed,
                }
            }
            Err(e) => contain(symbol, &e),
        };
        self.state.record(symbol, outcome, Utc::now());
    }

    /// Sleep for `duration`, returning early on `Stop`.
    async fn pause(&mut self, duration: Duration) -> Flow {
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return Flow::Continue,
                cmd = self.command_rx.recv(), if self.commands_open => {
                    if self.on_command(cmd).await == Flow::Stop {
                        return Flow::Stop;
                    }
                }
            }
        }
    }

    /// Drain queued commands without waiting.
    async fn poll_commands(&mut self) -> Flow {
        while self.commands_open {
            let cmd = match self.command_rx.try_recv() {
                Ok(cmd) => Some(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => None,
            };
            if self.on_command(cmd).await == Flow::Stop {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    async fn on_command(&mut self, cmd: Option<ScannerCommand>) -> Flow {
        match cmd {
            Some(ScannerCommand::Stop) => Flow::Stop,
            Some(ScannerCommand::Start) => {
                debug!("Start received but scanner is already scanning");
                Flow::Continue
            }
            Some(ScannerCommand::AddSymbol(symbol)) => {
                if !self.selector.add_symbol(symbol.clone()) {
                    debug!(pair = %symbol, "Symbol already on watchlist");
                }
                self.publish_watchlist().await;
                Flow::Continue
            }
            Some(ScannerCommand::RemoveSymbol(symbol)) => {
                if !self.selector.remove_symbol(&symbol) {
                    debug!(pair = %symbol, "Symbol not on watchlist");
                }
                self.publish_watchlist().await;
                Flow::Continue
            }
            None => {
                warn!("Scanner command channel closed, scanning continues");
                self.commands_open = false;
                Flow::Continue
            }
        }
    }

    async fn set_mode(&self, mode: ScannerMode) {
        self.status.write().await.mode = mode;
    }

    async fn publish_watchlist(&self) {
        self.status.write().await.watchlist = self.selector.watchlist().to_vec();
    }

    async fn publish_signals(&self) {
        let now = Utc::now();
        let mut status = self.status.write().await;
        status.signals_today = self.state.cap.sent(now);
        status.signals_date = Some(now.date_naive());
    }
}

/// Map a per-symbol failure to its decision outcome and log it. No error
/// leaves this boundary.
fn contain(symbol: &Symbol, err: &Error) -> Outcome {
    let kind = err.kind();
    match err {
        Error::DataFetch(_) | Error::Render(_) | Error::Timeout { .. } => {
            warn!(pair = %symbol, kind, error = %err, "Symbol skipped this cycle");
            Outcome::Skipped(kind)
        }
        Error::Classification(_) | Error::Parse(_) | Error::Validation(_) => {
            warn!(pair = %symbol, kind, error = %err, "Unusable classification, treated as WAIT");
            Outcome::Rejected(kind)
        }
        _ => {
            error!(pair = %symbol, kind, error = %err, "Unexpected failure, symbol skipped");
            Outcome::Skipped(kind)
        }
    }
}
