//! Dashboard component: connection, balance and chain state at a glance.

use color_eyre::eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::{
    domain::{amount::format_balance, transaction::Address},
    tui::Frame,
};

use super::Component;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct DashboardComponent {
    pub network: String,
    pub state: ConnectionState,
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    pub tip: Option<u64>,
    pub balance: Option<u128>,
    pub balance_loading: bool,
    pub pending: usize,
    pub provider_reachable: bool,
    pub min_confirmations: u64,
}

impl DashboardComponent {
    pub fn new(network: &str, min_confirmations: u64) -> Self {
        Self {
            network: network.to_string(),
            state: ConnectionState::Disconnected,
            address: None,
            chain_id: None,
            tip: None,
            balance: None,
            balance_loading: false,
            pending: 0,
            provider_reachable: true,
            min_confirmations,
        }
    }

    pub fn set_connected(&mut self, address: Address, chain_id: u64) {
        self.state = ConnectionState::Connected;
        self.address = Some(address);
        self.chain_id = Some(chain_id);
    }

    /// Forget everything tied to the previous account.
    pub fn set_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.address = None;
        self.chain_id = None;
        self.balance = None;
        self.balance_loading = false;
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn connection_line(&self) -> Line<'static> {
        let (label, color) = match self.state {
            ConnectionState::Connected => ("Connected", Color::Green),
            ConnectionState::Connecting => ("Connecting...", Color::Yellow),
            ConnectionState::Disconnected => ("Not connected", Color::Red),
        };
        let mut spans = vec![
            Span::styled("Wallet:  ", Style::default().fg(Color::DarkGray)),
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ];
        if let Some(address) = &self.address {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(address.short(), Style::default().fg(Color::Cyan)));
        }
        Line::from(spans)
    }

    fn balance_text(&self) -> String {
        match (self.balance, self.balance_loading) {
            (Some(wei), _) => format!("{} ETH", format_balance(wei)),
            (None, true) => "Loading...".to_string(),
            (None, false) => "-".to_string(),
        }
    }
}

impl Component for DashboardComponent {
    fn handle_key_event(&mut self, _key: KeyEvent) -> Result<()> {
        Ok(())
    }

    fn draw(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(6), // Connection
            Constraint::Length(5), // Balance
            Constraint::Length(6), // Chain
            Constraint::Min(0),    // Help
        ])
        .split(area);

        let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));

        let connection = Paragraph::new(vec![
            Line::from(""),
            self.connection_line(),
            Line::from(vec![
                label("Network: "),
                Span::styled(self.network.clone(), Style::default().fg(Color::Yellow)),
                Span::raw("  "),
                label("Chain ID: "),
                Span::raw(
                    self.chain_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ]),
        ])
        .block(
            Block::default()
                .title("Connection")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(connection, chunks[0]);

        let balance = Paragraph::new(vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                self.balance_text(),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )]),
        ])
        .block(
            Block::default()
                .title("Balance")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(balance, chunks[1]);

        let provider = if self.provider_reachable {
            Span::styled("reachable", Style::default().fg(Color::Green))
        } else {
            Span::styled("unreachable", Style::default().fg(Color::Red))
        };
        let pending_color = if self.pending > 0 {
            Color::Yellow
        } else {
            Color::Reset
        };
        let chain = Paragraph::new(vec![
            Line::from(""),
            Line::from(vec![
                label("Tip block: "),
                Span::raw(
                    self.tip
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Span::raw("  "),
                label("Provider: "),
                provider,
            ]),
            Line::from(vec![
                label("Pending transactions: "),
                Span::styled(self.pending.to_string(), Style::default().fg(pending_color)),
                Span::raw("  "),
                label("Required confirmations: "),
                Span::raw(self.min_confirmations.to_string()),
            ]),
        ])
        .block(
            Block::default()
                .title("Chain")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(chain, chunks[2]);

        let help = Paragraph::new(vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                "[c] Connect  [x] Disconnect  [r] Refresh balance",
                Style::default().fg(Color::DarkGray),
            )]),
        ])
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(help, chunks[3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::amount::WEI_PER_ETHER;

    #[test]
    fn test_disconnect_clears_account_state() {
        let mut dashboard = DashboardComponent::new("sim", 1);
        let address = Address::parse("0x00000000000000000000000000000000000000a1").unwrap();
        dashboard.set_connected(address, 1337);
        dashboard.balance = Some(WEI_PER_ETHER);
        assert!(dashboard.is_connected());
        assert_eq!(dashboard.balance_text(), "1.0000 ETH");

        dashboard.set_disconnected();
        assert!(!dashboard.is_connected());
        assert!(dashboard.address.is_none());
        assert_eq!(dashboard.balance_text(), "-");
    }
}
