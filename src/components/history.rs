//! Transaction history component.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::{
    domain::{
        amount::format_ether,
        transaction::{TransactionRecord, TxStatus},
    },
    tui::Frame,
};

use super::Component;

/// History component for displaying transactions submitted this session.
pub struct HistoryComponent {
    pub transactions: Vec<TransactionRecord>,
    list_state: ListState,
    pub selected_index: usize,
    pub pending: usize,
}

impl HistoryComponent {
    pub fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            transactions: Vec::new(),
            list_state,
            selected_index: 0,
            pending: 0,
        }
    }

    /// Replace the displayed records, newest first.
    pub fn set_transactions(&mut self, transactions: &[TransactionRecord]) {
        self.transactions = transactions.to_vec();
        if self.transactions.is_empty() {
            self.selected_index = 0;
        } else if self.selected_index >= self.transactions.len() {
            self.selected_index = self.transactions.len() - 1;
        }
        self.list_state.select(Some(self.selected_index));
    }

    fn next(&mut self) {
        if self.transactions.is_empty() {
            return;
        }
        self.selected_index = (self.selected_index + 1) % self.transactions.len();
        self.list_state.select(Some(self.selected_index));
    }

    fn previous(&mut self) {
        if self.transactions.is_empty() {
            return;
        }
        self.selected_index = self
            .selected_index
            .checked_sub(1)
            .unwrap_or(self.transactions.len() - 1);
        self.list_state.select(Some(self.selected_index));
    }

    pub fn status_color(status: TxStatus) -> Color {
        match status {
            TxStatus::Pending => Color::Yellow,
            TxStatus::Confirmed => Color::Green,
            TxStatus::Failed => Color::Red,
        }
    }

    fn status_icon(status: TxStatus) -> &'static str {
        match status {
            TxStatus::Pending => "…",
            TxStatus::Confirmed => "✓",
            TxStatus::Failed => "✗",
        }
    }

    /// Format a timestamp as a human-readable relative time.
    fn format_timestamp(timestamp: i64) -> String {
        use std::time::{Duration, UNIX_EPOCH};

        let datetime = UNIX_EPOCH + Duration::from_secs(timestamp.max(0) as u64);
        if let Ok(elapsed) = std::time::SystemTime::now().duration_since(datetime) {
            let secs = elapsed.as_secs();
            if secs < 60 {
                return "just now".to_string();
            } else if secs < 3600 {
                return format!("{} min ago", secs / 60);
            } else if secs < 86400 {
                return format!("{} hours ago", secs / 3600);
            }
        }
        format!("{}", timestamp)
    }

    fn details(tx: &TransactionRecord) -> Vec<Line<'static>> {
        let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));
        let color = Self::status_color(tx.status);
        vec![
            Line::from(vec![
                label("Status: "),
                Span::styled(
                    tx.status.to_string(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(""),
            Line::from(vec![label("TX Hash:")]),
            Line::from(vec![Span::styled(
                tx.hash.to_string(),
                Style::default().fg(Color::Cyan),
            )]),
            Line::from(""),
            Line::from(vec![label("To:")]),
            Line::from(vec![Span::raw(tx.recipient.to_string())]),
            Line::from(""),
            Line::from(vec![
                label("Amount: "),
                Span::raw(format!("{} ETH", format_ether(tx.amount))),
            ]),
            Line::from(""),
            Line::from(vec![
                label("Block: "),
                Span::raw(
                    tx.block_number
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ]),
            Line::from(""),
            Line::from(vec![
                label("Submitted: "),
                Span::raw(Self::format_timestamp(tx.submitted_at)),
            ]),
        ]
    }
}

impl Default for HistoryComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for HistoryComponent {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            _ => {}
        }
        Ok(())
    }

    fn draw(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::horizontal([Constraint::Length(44), Constraint::Min(0)]).split(area);

        let items: Vec<ListItem> = self
            .transactions
            .iter()
            .map(|tx| {
                let color = Self::status_color(tx.status);
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{} ", Self::status_icon(tx.status)),
                        Style::default().fg(color),
                    ),
                    Span::raw(format!("{:<14}", tx.hash.short())),
                    Span::styled(
                        format!("{} ETH", format_ether(tx.amount)),
                        Style::default().fg(color),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(
                        "History ({}, {} pending)",
                        self.transactions.len(),
                        self.pending
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        f.render_stateful_widget(list, chunks[0], &mut self.list_state);

        let details = match self.transactions.get(self.selected_index) {
            Some(tx) => Self::details(tx),
            None => vec![
                Line::from("No transactions yet"),
                Line::from(""),
                Line::from("Transfers sent from the Send tab appear here"),
            ],
        };
        let details_widget = Paragraph::new(details).block(
            Block::default()
                .title("Transaction Details")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(details_widget, chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::{Address, TxHash};
    use crossterm::event::KeyModifiers;

    fn record(hash: &str) -> TransactionRecord {
        TransactionRecord::pending(
            TxHash::from(hash),
            1,
            Address::parse("0x00000000000000000000000000000000000000b2").unwrap(),
        )
    }

    #[test]
    fn test_selection_wraps_and_clamps() {
        let mut history = HistoryComponent::new();
        history.set_transactions(&[record("0x01"), record("0x02"), record("0x03")]);

        let up = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        history.handle_key_event(up).unwrap();
        assert_eq!(history.selected_index, 2);

        history.set_transactions(&[record("0x01")]);
        assert_eq!(history.selected_index, 0);

        history.set_transactions(&[]);
        assert_eq!(history.selected_index, 0);
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(HistoryComponent::status_color(TxStatus::Pending), Color::Yellow);
        assert_eq!(HistoryComponent::status_color(TxStatus::Confirmed), Color::Green);
        assert_eq!(HistoryComponent::status_color(TxStatus::Failed), Color::Red);
    }
}
