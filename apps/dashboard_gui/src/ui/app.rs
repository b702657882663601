use std::time::Duration;

use client_core::{BusyState, DashboardState};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::domain::{address_hex, Address};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorCategory, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;

const ADDRESS_HINT: &str = "0x…";

#[derive(Debug, Default)]
struct FormDrafts {
    transfer_to: String,
    transfer_amount: String,
    mint_to: String,
    mint_amount: String,
    burn_amount: String,
}

pub struct TokenDashboardApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    contract_address: Address,
    state: DashboardState,
    drafts: FormDrafts,

    status: String,
    alert: Option<String>,
    last_error: Option<UiError>,
}

impl TokenDashboardApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        contract_address: Address,
        decimals: u8,
    ) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            contract_address,
            state: DashboardState::new(decimals),
            drafts: FormDrafts::default(),
            status: "Starting".to_string(),
            alert: None,
            last_error: None,
        };
        app.dispatch(BackendCommand::Load);
        app
    }

    fn dispatch(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::State(state) => {
                    self.state = state;
                }
                UiEvent::Alert(message) => {
                    self.alert = Some(message);
                }
                UiEvent::Contract(event) => {
                    self.status = format!("Contract event: {}", event.name());
                }
                UiEvent::TransactionSubmitted { operation, tx_hash } => {
                    self.status = format!("{operation} submitted: {tx_hash}");
                }
                UiEvent::TransactionSettled { operation, success } => {
                    if success {
                        self.status = format!("{operation} confirmed");
                        self.last_error = None;
                    }
                }
                UiEvent::Error(err) => {
                    tracing::warn!(
                        context = ?err.context(),
                        category = ?err.category(),
                        "{}",
                        err.message()
                    );
                    self.status = err.status_line();
                    self.last_error = Some(err);
                }
            }
        }
    }

    fn busy_label(&self) -> Option<String> {
        match self.state.busy {
            BusyState::Idle => None,
            BusyState::AwaitingConfirmation {
                operation,
                tx_hash: None,
            } => Some(format!("Confirm the {operation} in your wallet…")),
            BusyState::AwaitingConfirmation {
                operation,
                tx_hash: Some(_),
            } => Some(format!("Waiting for {operation} to be mined…")),
        }
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("token_header")
            .resizable(false)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    let name = self.state.token.name.as_deref().unwrap_or("Token");
                    ui.heading(format!("{name} ({})", self.state.symbol_display()));
                    ui.separator();
                    ui.label(format!(
                        "Total supply: {} {}",
                        self.state.total_supply_display(),
                        self.state.symbol_display()
                    ));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .add_enabled(!self.state.is_busy(), egui::Button::new("Refresh"))
                            .clicked()
                        {
                            self.dispatch(BackendCommand::Refresh);
                        }
                        if let Some(label) = self.busy_label() {
                            ui.label(label);
                            ui.spinner();
                        }
                    });
                });
                ui.add_space(6.0);
            });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match &self.last_error {
                    Some(err) if err.category() != UiErrorCategory::Rejected => {
                        ui.colored_label(ui.visuals().error_fg_color, &self.status);
                    }
                    _ => {
                        ui.label(&self.status);
                    }
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.small(format!("contract {}", address_hex(&self.contract_address)));
                });
            });
        });
    }

    fn show_account_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("account_panel")
            .resizable(false)
            .min_width(300.0)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                ui.label(egui::RichText::new("You own").strong());
                ui.heading(format!(
                    "{} {}",
                    self.state.balance_display(),
                    self.state.symbol_display()
                ));
                ui.separator();

                ui.label(egui::RichText::new("Contract owner").strong());
                match self.state.owner {
                    Some(owner) => ui.monospace(address_hex(&owner)),
                    None => ui.weak("unknown"),
                };
                ui.separator();

                ui.label(egui::RichText::new("Connected account").strong());
                match self.state.account.filter(|_| self.state.wallet_connected) {
                    Some(account) => {
                        ui.monospace(address_hex(&account));
                        if self.state.is_owner {
                            ui.small("owner");
                        }
                    }
                    None => {
                        if ui.button("Connect Wallet").clicked() {
                            self.dispatch(BackendCommand::ConnectWallet);
                        }
                    }
                }
            });
    }

    fn show_forms(&mut self, ctx: &egui::Context) {
        let enabled = !self.state.is_busy();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(enabled, |ui| {
                ui.group(|ui| {
                    ui.label(egui::RichText::new("Transfer").strong());
                    ui.add(
                        egui::TextEdit::singleline(&mut self.drafts.transfer_to)
                            .hint_text(ADDRESS_HINT)
                            .desired_width(f32::INFINITY),
                    );
                    ui.horizontal(|ui| {
                        ui.add(
                            egui::TextEdit::singleline(&mut self.drafts.transfer_amount)
                                .hint_text("amount"),
                        );
                        if ui.button("Send").clicked() {
                            self.dispatch(BackendCommand::Transfer {
                                to: self.drafts.transfer_to.clone(),
                                amount: self.drafts.transfer_amount.clone(),
                            });
                        }
                    });
                });

                if !self.state.shows_owner_controls() {
                    return;
                }
                ui.add_space(8.0);
                ui.group(|ui| {
                    ui.label(egui::RichText::new("Mint").strong());
                    ui.add(
                        egui::TextEdit::singleline(&mut self.drafts.mint_to)
                            .hint_text(ADDRESS_HINT)
                            .desired_width(f32::INFINITY),
                    );
                    ui.horizontal(|ui| {
                        ui.add(
                            egui::TextEdit::singleline(&mut self.drafts.mint_amount)
                                .hint_text("amount"),
                        );
                        if ui.button("Mint").clicked() {
                            self.dispatch(BackendCommand::Mint {
                                to: self.drafts.mint_to.clone(),
                                amount: self.drafts.mint_amount.clone(),
                            });
                        }
                    });
                });
                ui.add_space(8.0);
                ui.group(|ui| {
                    ui.label(egui::RichText::new("Burn").strong());
                    ui.horizontal(|ui| {
                        ui.add(
                            egui::TextEdit::singleline(&mut self.drafts.burn_amount)
                                .hint_text("amount"),
                        );
                        if ui.button("Burn").clicked() {
                            self.dispatch(BackendCommand::Burn {
                                amount: self.drafts.burn_amount.clone(),
                            });
                        }
                    });
                });
            });
        });
    }

    fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.alert.clone() else {
            return;
        };
        egui::Window::new("Wallet required")
            .id(egui::Id::new("wallet_alert_window"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    self.alert = None;
                }
            });
    }
}

impl eframe::App for TokenDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        self.show_header(ctx);
        self.show_status_bar(ctx);
        self.show_account_panel(ctx);
        self.show_forms(ctx);
        self.show_alert(ctx);

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

impl Drop for TokenDashboardApp {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(BackendCommand::Shutdown);
    }
}
