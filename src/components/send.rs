//! Send component: ETH transfer form.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    action::Action,
    domain::{
        amount::{format_balance, parse_ether},
        transaction::Address,
    },
    tui::Frame,
};

use super::Component;

/// Input field focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendField {
    Recipient,
    Amount,
    Confirm,
}

pub struct SendComponent {
    action_tx: UnboundedSender<Action>,
    pub from: Option<Address>,
    pub balance: Option<u128>,
    pub recipient: String,
    pub amount: String,
    pub focused_field: SendField,
    pub is_editing: bool,
    pub sending: bool,
    pub error_message: Option<String>,
}

impl SendComponent {
    pub fn new(action_tx: UnboundedSender<Action>) -> Self {
        Self {
            action_tx,
            from: None,
            balance: None,
            recipient: String::new(),
            amount: String::new(),
            focused_field: SendField::Recipient,
            is_editing: false,
            sending: false,
            error_message: None,
        }
    }

    /// Clear all input fields.
    pub fn clear(&mut self) {
        self.recipient.clear();
        self.amount.clear();
        self.focused_field = SendField::Recipient;
        self.is_editing = false;
        self.error_message = None;
    }

    /// Paste text into the focused input field.
    pub fn paste(&mut self, text: &str) {
        let text = text.trim();
        match self.focused_field {
            SendField::Recipient => self.recipient.push_str(text),
            SendField::Amount => {
                for c in text.chars() {
                    self.handle_char(c);
                }
            }
            SendField::Confirm => {}
        }
    }

    /// Validate the form, returning the recipient and amount in wei.
    pub fn validate(&self) -> Result<(Address, u128), String> {
        if self.from.is_none() {
            return Err("Connect a wallet first".to_string());
        }

        let recipient = self.recipient.trim();
        if recipient.is_empty() {
            return Err("Recipient address is required".to_string());
        }
        let recipient = Address::parse(recipient).map_err(|e| e.to_string())?;

        let amount = parse_ether(&self.amount).map_err(|e| e.to_string())?;
        if amount == 0 {
            return Err("Amount must be greater than 0".to_string());
        }
        if let Some(balance) = self.balance
            && amount > balance
        {
            return Err(format!(
                "Insufficient balance: {} ETH available",
                format_balance(balance)
            ));
        }
        Ok((recipient, amount))
    }

    fn submit(&mut self) -> Result<()> {
        if self.sending {
            return Ok(());
        }
        match self.validate() {
            Ok(_) => self.action_tx.send(Action::SendTransaction)?,
            Err(e) => self.error_message = Some(e),
        }
        Ok(())
    }

    fn next_field(&mut self) {
        self.focused_field = match self.focused_field {
            SendField::Recipient => SendField::Amount,
            SendField::Amount => SendField::Confirm,
            SendField::Confirm => SendField::Recipient,
        };
    }

    fn prev_field(&mut self) {
        self.focused_field = match self.focused_field {
            SendField::Recipient => SendField::Confirm,
            SendField::Amount => SendField::Recipient,
            SendField::Confirm => SendField::Amount,
        };
    }

    fn handle_char(&mut self, c: char) {
        match self.focused_field {
            SendField::Recipient => {
                if c.is_ascii_hexdigit() || c == 'x' {
                    self.recipient.push(c);
                }
            }
            SendField::Amount => {
                if c.is_ascii_digit() || (c == '.' && !self.amount.contains('.')) {
                    self.amount.push(c);
                }
            }
            SendField::Confirm => {}
        }
    }

    fn handle_backspace(&mut self) {
        match self.focused_field {
            SendField::Recipient => {
                self.recipient.pop();
            }
            SendField::Amount => {
                self.amount.pop();
            }
            SendField::Confirm => {}
        }
    }

    fn field_block(&self, field: SendField, title: &'static str) -> Block<'static> {
        let focused = self.focused_field == field;
        Block::default()
            .title(format!("{} {}", if focused { ">" } else { " " }, title))
            .borders(Borders::ALL)
            .border_style(if focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::DarkGray)
            })
    }

    fn input_line(&self, field: SendField, value: &str, placeholder: &str) -> Line<'static> {
        let focused = self.focused_field == field;
        let style = match (focused, self.is_editing) {
            (true, true) => Style::default().fg(Color::Yellow),
            (true, false) => Style::default().fg(Color::Cyan),
            _ => Style::default().fg(Color::White),
        };
        let mut text = if value.is_empty() && !focused {
            placeholder.to_string()
        } else {
            value.to_string()
        };
        if focused && self.is_editing {
            text.push('│');
        }
        Line::from(vec![Span::styled(text, style)])
    }
}

impl Component for SendComponent {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        self.error_message = None;

        let on_input_field =
            self.focused_field == SendField::Recipient || self.focused_field == SendField::Amount;

        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.is_editing = false;
                self.next_field();
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.is_editing = false;
                self.prev_field();
            }
            KeyCode::Esc => {
                self.is_editing = false;
            }
            KeyCode::Enter => {
                if self.focused_field == SendField::Confirm {
                    self.submit()?;
                } else if on_input_field {
                    self.is_editing = !self.is_editing;
                }
            }
            KeyCode::Char(c) => {
                if self.is_editing && on_input_field {
                    self.handle_char(c);
                } else if !self.is_editing {
                    match c {
                        'j' => self.next_field(),
                        'k' => self.prev_field(),
                        'e' if on_input_field => self.is_editing = true,
                        _ => {}
                    }
                }
            }
            KeyCode::Backspace => {
                if self.is_editing && on_input_field {
                    self.handle_backspace();
                }
            }
            KeyCode::Delete if !self.is_editing => {
                self.clear();
            }
            _ => {}
        }
        Ok(())
    }

    fn draw(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(4), // From
            Constraint::Length(4), // Recipient
            Constraint::Length(4), // Amount
            Constraint::Length(4), // Confirm
            Constraint::Min(0),    // Status/help
        ])
        .split(area);

        let from = match &self.from {
            Some(address) => Line::from(vec![
                Span::styled("From: ", Style::default().fg(Color::DarkGray)),
                Span::styled(address.short(), Style::default().fg(Color::White)),
                Span::raw("  |  "),
                Span::styled("Balance: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    self.balance
                        .map(|b| format!("{} ETH", format_balance(b)))
                        .unwrap_or_else(|| "-".to_string()),
                    Style::default().fg(Color::Green),
                ),
            ]),
            None => Line::from(vec![Span::styled(
                "No wallet connected. Press [c] to connect.",
                Style::default().fg(Color::Red),
            )]),
        };
        let from_widget = Paragraph::new(vec![Line::from(""), from]).block(
            Block::default()
                .title("Send From")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(from_widget, chunks[0]);

        let recipient = Paragraph::new(vec![
            Line::from(""),
            self.input_line(SendField::Recipient, &self.recipient, "0x... (40 hex digits)"),
        ])
        .block(self.field_block(SendField::Recipient, "Recipient Address"));
        f.render_widget(recipient, chunks[1]);

        let mut amount_line =
            self.input_line(SendField::Amount, &self.amount, "Amount in ETH (e.g. 0.5)");
        amount_line.push_span(Span::raw(" ETH"));
        let amount = Paragraph::new(vec![Line::from(""), amount_line])
            .block(self.field_block(SendField::Amount, "Amount"));
        f.render_widget(amount, chunks[2]);

        let (label, style) = if self.sending {
            ("  [ Sending... ]  ", Style::default().fg(Color::Yellow))
        } else if self.focused_field == SendField::Confirm {
            (
                "  [ Send Transaction ]  ",
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            ("  [ Send Transaction ]  ", Style::default().fg(Color::Green))
        };
        let confirm = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(label, style))])
            .block(self.field_block(SendField::Confirm, "Confirm"));
        f.render_widget(confirm, chunks[3]);

        let mut status_lines = vec![Line::from("")];
        if let Some(err) = &self.error_message {
            status_lines.push(Line::from(vec![Span::styled(
                format!("Error: {}", err),
                Style::default().fg(Color::Red),
            )]));
            status_lines.push(Line::from(""));
        }
        status_lines.push(Line::from(vec![Span::styled(
            if self.is_editing {
                "[Esc] Stop editing  [Tab/↓] Next field  [Shift+Tab/↑] Prev field"
            } else {
                "[Enter/e] Edit field  [Tab/↓] Next field  [Del] Clear form  [Enter on Confirm] Send"
            },
            Style::default().fg(Color::DarkGray),
        )]));
        let status = Paragraph::new(status_lines).block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(status, chunks[4]);
    }
}
