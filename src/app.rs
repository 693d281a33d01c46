use std::sync::Arc;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
};
use tokio::sync::broadcast;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    action::Action,
    cli::Args,
    components::{
        Component,
        dashboard::{ConnectionState, DashboardComponent},
        history::HistoryComponent,
        send::SendComponent,
    },
    config::Config,
    domain::{
        amount::parse_ether,
        history::TransactionHistory,
        notification::{Notification, Severity},
        pending::PendingSet,
        transaction::{Address, TransactionRecord, TxStatus},
    },
    infra::{
        rpc::{Backend, RpcClient},
        session::Session,
        simulated::SimulatedChain,
        tracker::{ConfirmationTracker, TrackerHandle, TrackerUpdate},
        watcher::{ChainWatcher, WatchEvent},
    },
    tui::{Event, Frame, Tui},
};

/// Block events buffered per tracker before the block loop lags.
const BLOCK_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Send,
    History,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Dashboard, Tab::Send, Tab::History];

    pub fn title(&self) -> Line<'static> {
        let hotkey = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
        match self {
            Tab::Dashboard => Line::from(vec![Span::styled("D", hotkey), Span::raw("ashboard")]),
            Tab::Send => Line::from(vec![Span::styled("S", hotkey), Span::raw("end")]),
            Tab::History => Line::from(vec![Span::styled("H", hotkey), Span::raw("istory")]),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Dashboard => 0,
            Tab::Send => 1,
            Tab::History => 2,
        }
    }

    pub fn next(&self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }
}

/// Build the provider for the configured network. The simulated chain is
/// returned as well so the app can mine blocks on it.
pub fn build_backend(config: &Config) -> Result<(Backend, Option<SimulatedChain>)> {
    if config.is_simulated() {
        let chain = SimulatedChain::new(config.sim.chain_id);
        chain.add_account(
            Address::parse(&config.sim.account)?,
            parse_ether(&config.sim.initial_balance)?,
        );
        return Ok((Backend::new(Arc::new(chain.clone())), Some(chain)));
    }
    let client = RpcClient::new(config)?;
    info!("Using JSON-RPC provider at {}", client.rpc_url());
    Ok((Backend::new(Arc::new(client)), None))
}

pub struct App {
    pub should_quit: bool,
    pub should_suspend: bool,
    pub config: Config,
    pub active_tab: Tab,
    pub tick_rate: f64,
    pub frame_rate: f64,
    pub action_tx: UnboundedSender<Action>,
    pub action_rx: UnboundedReceiver<Action>,
    backend: Backend,
    sim: Option<SimulatedChain>,
    session: Option<Session>,
    connecting: bool,
    connect_attempt: u64,
    pending: PendingSet,
    history: TransactionHistory,
    tracker: Option<Arc<ConfirmationTracker>>,
    tracker_handle: Option<TrackerHandle>,
    tracker_tx: UnboundedSender<TrackerUpdate>,
    tracker_rx: UnboundedReceiver<TrackerUpdate>,
    block_tx: broadcast::Sender<u64>,
    watch_tx: UnboundedSender<WatchEvent>,
    watch_rx: UnboundedReceiver<WatchEvent>,
    background: Vec<JoinHandle<()>>,
    pub notification: Option<Notification>,
    pub dashboard_component: DashboardComponent,
    pub send_component: SendComponent,
    pub history_component: HistoryComponent,
}

impl App {
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = Config::load(args.network.as_deref(), args.rpc_url.as_deref())?;
        if let Some(secs) = args.poll_interval {
            config.tracker.poll_interval_secs = secs;
        }
        if let Some(confirmations) = args.confirmations {
            config.tracker.min_confirmations = confirmations;
        }
        config.validate()?;

        let (backend, sim) = build_backend(&config)?;
        let mut app = Self::new(config, backend, sim);
        app.tick_rate = args.tick_rate;
        app.frame_rate = args.frame_rate;
        Ok(app)
    }

    pub fn new(config: Config, backend: Backend, sim: Option<SimulatedChain>) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (tracker_tx, tracker_rx) = mpsc::unbounded_channel();
        let (watch_tx, watch_rx) = mpsc::unbounded_channel();
        let (block_tx, _) = broadcast::channel(BLOCK_CHANNEL_CAPACITY);
        let dashboard_component =
            DashboardComponent::new(&config.network.name, config.tracker.min_confirmations);
        let send_component = SendComponent::new(action_tx.clone());

        Self {
            should_quit: false,
            should_suspend: false,
            config,
            active_tab: Tab::Dashboard,
            tick_rate: 4.0,
            frame_rate: 30.0,
            action_tx,
            action_rx,
            backend,
            sim,
            session: None,
            connecting: false,
            connect_attempt: 0,
            pending: PendingSet::new(),
            history: TransactionHistory::new(),
            tracker: None,
            tracker_handle: None,
            tracker_tx,
            tracker_rx,
            block_tx,
            watch_tx,
            watch_rx,
            background: Vec::new(),
            notification: None,
            dashboard_component,
            send_component,
            history_component: HistoryComponent::new(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?
            .tick_rate(self.tick_rate)
            .frame_rate(self.frame_rate)
            .paste(true);
        tui.enter()?;

        self.start_background();
        if self.sim.is_some() {
            self.action_tx.send(Action::Connect)?;
        }

        loop {
            if let Some(event) = tui.next().await {
                self.handle_event(&mut tui, event)?;
            }

            while let Ok(update) = self.tracker_rx.try_recv() {
                self.handle_tracker_update(update)?;
            }

            while let Ok(event) = self.watch_rx.try_recv() {
                self.handle_watch_event(event)?;
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.handle_action(action)?;
            }

            if self.should_suspend {
                tui.suspend()?;
                self.should_suspend = false;
                tui.resume()?;
            }

            if self.should_quit {
                break;
            }
        }

        self.shutdown();
        tui.exit()?;
        Ok(())
    }

    /// Spawn the chain watcher and, on the simulated network, the block
    /// producer.
    pub fn start_background(&mut self) {
        let watcher = ChainWatcher::new(
            self.backend.clone(),
            Duration::from_millis(self.config.watcher.poll_interval_ms),
            self.block_tx.clone(),
            self.watch_tx.clone(),
        );
        self.background.push(watcher.spawn());

        if let Some(chain) = self.sim.clone() {
            let period = Duration::from_secs(self.config.sim.block_time_secs);
            info!("Simulated chain mining every {:?}", period);
            self.background.push(tokio::spawn(async move {
                let mut ticker =
                    tokio::time::interval_at(tokio::time::Instant::now() + period, period);
                loop {
                    ticker.tick().await;
                    let block_number = chain.mine_block();
                    debug!("Mined simulated block {}", block_number);
                }
            }));
        }
    }

    fn shutdown(&mut self) {
        self.stop_tracker();
        for task in self.background.drain(..) {
            task.abort();
        }
    }

    fn handle_event(&mut self, tui: &mut Tui, event: Event) -> Result<()> {
        match event {
            Event::Tick => {
                self.action_tx.send(Action::Tick)?;
            }
            Event::Render => {
                tui.draw(|f| self.draw(f))?;
            }
            Event::Key(key_event) => {
                self.handle_key_event(key_event)?;
            }
            Event::Resize(w, h) => {
                self.action_tx.send(Action::Resize(w, h))?;
            }
            Event::Paste(text) => {
                if self.active_tab == Tab::Send {
                    self.send_component.paste(&text);
                }
            }
            Event::Init => {
                info!("Application initialized");
            }
            Event::Error => {}
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.action_tx.send(Action::Quit)?;
            return Ok(());
        }

        if self.active_tab == Tab::Send && self.send_component.is_editing {
            return self.send_component.handle_key_event(key);
        }

        let action = match key.code {
            KeyCode::Char('z') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Suspend)
            }
            _ if !key.modifiers.is_empty() && key.modifiers != KeyModifiers::SHIFT => None,
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('?') => Some(Action::Help),
            KeyCode::Char('c') => Some(Action::Connect),
            KeyCode::Char('x') => Some(Action::Disconnect),
            KeyCode::Char('r') => Some(Action::RefreshBalance),
            KeyCode::Char('d') => Some(Action::TabDashboard),
            KeyCode::Char('s') => Some(Action::TabSend),
            KeyCode::Char('h') => Some(Action::TabHistory),
            KeyCode::Tab if self.active_tab != Tab::Send => Some(Action::NextTab),
            _ => None,
        };

        match action {
            Some(action) => self.action_tx.send(action)?,
            None => match self.active_tab {
                Tab::Dashboard => self.dashboard_component.handle_key_event(key)?,
                Tab::Send => self.send_component.handle_key_event(key)?,
                Tab::History => self.history_component.handle_key_event(key)?,
            },
        }
        Ok(())
    }

    pub fn handle_action(&mut self, action: Action) -> Result<()> {
        if !matches!(action, Action::Tick | Action::Render) {
            debug!("Handling action: {:?}", action);
        }
        match action {
            Action::Tick => {
                if self
                    .notification
                    .as_ref()
                    .is_some_and(|n| n.is_expired(Instant::now()))
                {
                    self.notification = None;
                }
                self.dashboard_component.pending = self.pending.len();
            }
            Action::Render | Action::Resize(..) | Action::Resume => {}
            Action::Suspend => self.should_suspend = true,
            Action::Quit => self.should_quit = true,
            Action::Error(message) => self.notify(message, Severity::Error),
            Action::Help => self.notify(
                "[c]onnect  [x] disconnect  [r]efresh  [d]ashboard  [s]end  [h]istory  [q]uit",
                Severity::Info,
            ),
            Action::TabDashboard => self.active_tab = Tab::Dashboard,
            Action::TabSend => self.active_tab = Tab::Send,
            Action::TabHistory => self.active_tab = Tab::History,
            Action::NextTab => self.active_tab = self.active_tab.next(),

            Action::Connect => self.connect(),
            Action::Connected {
                address,
                chain_id,
                attempt,
            } => self.on_connected(address, chain_id, attempt)?,
            Action::ConnectFailed { reason, attempt } => {
                if !self.is_current_attempt(attempt) {
                    debug!("Dropping stale connection failure: {}", reason);
                    return Ok(());
                }
                self.connecting = false;
                self.dashboard_component.state = ConnectionState::Disconnected;
                warn!("Wallet connection failed: {}", reason);
                self.notify(format!("Failed to connect wallet: {}", reason), Severity::Error);
            }
            Action::Disconnect => {
                if self.session.is_some() || self.connecting {
                    self.disconnect();
                    self.notify("Wallet disconnected", Severity::Info);
                }
            }

            Action::RefreshBalance => self.refresh_balance(),
            Action::BalanceLoaded(wei) => {
                if self.session.is_some() {
                    self.dashboard_component.balance = Some(wei);
                    self.dashboard_component.balance_loading = false;
                    self.send_component.balance = Some(wei);
                }
            }
            Action::BalanceFailed(reason) => {
                self.dashboard_component.balance_loading = false;
                warn!("Balance refresh failed: {}", reason);
                self.notify(format!("Failed to load balance: {}", reason), Severity::Error);
            }

            Action::SendTransaction => self.send_transaction(),
            Action::TransactionSubmitted {
                hash,
                amount,
                recipient,
            } => {
                self.send_component.sending = false;
                info!("Transaction {} submitted", hash);
                self.history
                    .push(TransactionRecord::pending(hash.clone(), amount, recipient));
                self.sync_history();
                match &self.tracker {
                    Some(tracker) => tracker.register(hash.clone()),
                    None => self.pending.insert(hash.clone()),
                };
                self.dashboard_component.pending = self.pending.len();
                self.send_component.clear();
                self.notify(
                    format!("Transaction sent! Hash: {}", hash.short()),
                    Severity::Info,
                );
            }
            Action::TransactionRejected(reason) => {
                self.send_component.sending = false;
                warn!("Transaction submission failed: {}", reason);
                self.notify(format!("Transaction failed: {}", reason), Severity::Error);
            }

            Action::Notify { message, severity } => self.notify(message, severity),
        }
        Ok(())
    }

    pub fn handle_tracker_update(&mut self, update: TrackerUpdate) -> Result<()> {
        match update {
            TrackerUpdate::StatusChanged {
                hash,
                status,
                block_number,
            } => {
                if self.history.apply_status(&hash, status, Some(block_number)) {
                    self.sync_history();
                    if status == TxStatus::Failed {
                        self.notify("Transaction failed", Severity::Error);
                    }
                } else {
                    debug!("No pending record for {}, status {} ignored", hash, status);
                }
                self.dashboard_component.pending = self.pending.len();
            }
            TrackerUpdate::Notify { message, severity } => self.notify(message, severity),
            TrackerUpdate::RefreshBalance => self.action_tx.send(Action::RefreshBalance)?,
        }
        Ok(())
    }

    pub fn handle_watch_event(&mut self, event: WatchEvent) -> Result<()> {
        match event {
            WatchEvent::NewBlock(block_number) => {
                self.dashboard_component.tip = Some(block_number);
            }
            WatchEvent::ProviderReachable(reachable) => {
                self.dashboard_component.provider_reachable = reachable;
                if !reachable {
                    self.notify("Provider is unreachable", Severity::Error);
                }
            }
            WatchEvent::AccountsChanged(accounts) => {
                let Some(session) = &self.session else {
                    return Ok(());
                };
                match accounts.first() {
                    None => {
                        info!("Wallet exposes no accounts, disconnecting");
                        self.disconnect();
                        self.notify("Wallet disconnected", Severity::Info);
                    }
                    Some(first) if *first != session.address => {
                        info!("Active account changed to {}, reconnecting", first);
                        self.disconnect();
                        self.action_tx.send(Action::Connect)?;
                    }
                    Some(_) => {}
                }
            }
            WatchEvent::ChainChanged(chain_id) => {
                let was_connected = self.session.is_some() || self.connecting;
                info!("Chain changed to {}, resetting session", chain_id);
                self.disconnect();
                self.pending.clear();
                self.history.clear();
                self.sync_history();
                self.dashboard_component.tip = None;
                self.dashboard_component.pending = 0;
                self.notify(
                    format!("Network changed to chain {}, session reset", chain_id),
                    Severity::Info,
                );
                if was_connected {
                    self.action_tx.send(Action::Connect)?;
                }
            }
        }
        Ok(())
    }

    fn connect(&mut self) {
        if self.session.is_some() || self.connecting {
            debug!("Connect requested while already connected");
            return;
        }
        self.connecting = true;
        self.connect_attempt += 1;
        let attempt = self.connect_attempt;
        self.dashboard_component.state = ConnectionState::Connecting;

        let backend = self.backend.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let action = match Session::connect(&backend).await {
                Ok(session) => Action::Connected {
                    address: session.address,
                    chain_id: session.chain_id,
                    attempt,
                },
                Err(e) => Action::ConnectFailed {
                    reason: format!("{:#}", e),
                    attempt,
                },
            };
            let _ = tx.send(action);
        });
    }

    /// Results of an attempt superseded by a disconnect or a newer connect
    /// are dropped.
    fn is_current_attempt(&self, attempt: u64) -> bool {
        self.connecting && attempt == self.connect_attempt
    }

    fn on_connected(&mut self, address: Address, chain_id: u64, attempt: u64) -> Result<()> {
        if !self.is_current_attempt(attempt) {
            debug!("Dropping stale connection result for {}", address);
            return Ok(());
        }
        self.connecting = false;

        let session = Session::new(&self.backend, address.clone(), chain_id);
        self.start_tracker(&session);
        self.session = Some(session);
        self.dashboard_component.set_connected(address.clone(), chain_id);
        self.send_component.from = Some(address.clone());
        self.notify(format!("Connected {}", address.short()), Severity::Success);
        self.action_tx.send(Action::RefreshBalance)?;
        Ok(())
    }

    fn start_tracker(&mut self, session: &Session) {
        self.stop_tracker();
        let tracker = Arc::new(ConfirmationTracker::new(
            session.chain(),
            self.pending.clone(),
            self.tracker_tx.clone(),
            &self.config.tracker,
        ));
        let handle = tracker.start(
            Duration::from_secs(self.config.tracker.poll_interval_secs),
            self.block_tx.subscribe(),
        );
        self.tracker = Some(tracker);
        self.tracker_handle = Some(handle);
    }

    fn stop_tracker(&mut self) {
        if let Some(handle) = self.tracker_handle.take() {
            info!("Stopping confirmation tracker");
            handle.stop();
        }
        self.tracker = None;
    }

    /// Drop the session and stop tracking. Pending hashes stay in the set so
    /// the next tracker picks them up.
    fn disconnect(&mut self) {
        self.stop_tracker();
        self.session = None;
        self.connecting = false;
        self.dashboard_component.set_disconnected();
        self.send_component.from = None;
        self.send_component.balance = None;
        self.send_component.sending = false;
    }

    fn refresh_balance(&mut self) {
        let Some(session) = self.session.clone() else {
            debug!("Balance refresh skipped, no session");
            return;
        };
        self.dashboard_component.balance_loading = true;
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let action = match session.balance().await {
                Ok(wei) => Action::BalanceLoaded(wei),
                Err(e) => Action::BalanceFailed(format!("{:#}", e)),
            };
            let _ = tx.send(action);
        });
    }

    fn send_transaction(&mut self) {
        let Some(session) = self.session.clone() else {
            self.notify("Connect a wallet first", Severity::Error);
            return;
        };
        if self.send_component.sending {
            return;
        }
        let (recipient, amount) = match self.send_component.validate() {
            Ok(form) => form,
            Err(e) => {
                self.send_component.error_message = Some(e);
                return;
            }
        };

        self.send_component.sending = true;
        info!("Sending {} wei to {}", amount, recipient);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let action = match session.transfer(recipient.clone(), amount).await {
                Ok(hash) => Action::TransactionSubmitted {
                    hash,
                    amount,
                    recipient,
                },
                Err(e) => Action::TransactionRejected(format!("{:#}", e)),
            };
            let _ = tx.send(action);
        });
    }

    fn sync_history(&mut self) {
        self.history_component.set_transactions(self.history.records());
        self.history_component.pending = self.history.pending_count();
    }

    fn notify(&mut self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        info!("Notification ({}): {}", severity, message);
        self.notification = Some(Notification::new(
            message,
            severity,
            Duration::from_secs(self.config.ui.notification_secs),
        ));
    }

    fn draw(&mut self, f: &mut Frame) {
        let chunks = Layout::vertical([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Status
        ])
        .split(f.area());

        self.draw_header(f, chunks[0]);
        self.draw_tabs(f, chunks[1]);
        match self.active_tab {
            Tab::Dashboard => self.dashboard_component.draw(f, chunks[2]),
            Tab::Send => self.send_component.draw(f, chunks[2]),
            Tab::History => self.history_component.draw(f, chunks[2]),
        }
        self.draw_status(f, chunks[3]);
    }

    fn draw_header(&self, f: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(
                "ethdash",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                format!("[{}]", self.config.network.name),
                Style::default().fg(Color::Yellow),
            ),
        ];
        if self.sim.is_some() {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                "[SIM]",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        let header = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(header, area);
    }

    fn draw_tabs(&self, f: &mut Frame, area: Rect) {
        let titles: Vec<Line> = Tab::ALL.iter().map(|t| t.title()).collect();
        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL))
            .select(self.active_tab.index())
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            );
        f.render_widget(tabs, area);
    }

    fn draw_status(&self, f: &mut Frame, area: Rect) {
        let (message, color) = match &self.notification {
            Some(n) => (
                n.message.clone(),
                match n.severity {
                    Severity::Info => Color::White,
                    Severity::Success => Color::Green,
                    Severity::Error => Color::Red,
                },
            ),
            None => ("Ready".to_string(), Color::DarkGray),
        };
        let tip = self
            .dashboard_component
            .tip
            .map(|n| format!("Block: {}", n))
            .unwrap_or_else(|| "Block: -".to_string());
        let status = Paragraph::new(Line::from(vec![
            Span::styled(message, Style::default().fg(color)),
            Span::raw("  |  "),
            Span::styled(tip, Style::default().fg(Color::Yellow)),
            Span::raw("  |  "),
            Span::styled("[q]Quit [?]Help", Style::default().fg(Color::DarkGray)),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(status, area);
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
