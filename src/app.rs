use dtree::{Title, Tone};
use eframe::egui::{self, Color32, RichText};
use egui_graphs::{LayoutStateHierarchical, SettingsInteraction, SettingsStyle, reset_layout};

use crate::actions::Action;
use crate::state::{Connector, State};
use crate::store::Phase;
use crate::table;
use crate::tree_view::{ACTIVE_COLOR, INACTIVE_COLOR, TreeGraphView};

pub struct VisApp {
    state: State,
}

impl VisApp {
    pub fn new(connector: Connector) -> Self {
        Self {
            state: State::new(connector),
        }
    }

    fn status(&self) -> (&'static str, Color32) {
        match self.state.store.phase {
            Phase::Disconnected => ("Not connected", INACTIVE_COLOR),
            Phase::Connecting => ("Connecting", Color32::GRAY),
            Phase::Ready => ("Ready", ACTIVE_COLOR),
            Phase::Computing => ("Computing", Color32::from_rgb(210, 150, 40)),
        }
    }

    fn connection_bar(&mut self, ui: &mut egui::Ui) {
        let phase = self.state.store.phase;
        let (status, status_color) = self.status();

        ui.horizontal(|ui| {
            ui.label(RichText::new(status).strong().color(status_color));
            ui.separator();

            ui.label("Port:");
            let mut port = self.state.store.port_input.clone();
            let response = ui.add_enabled(
                phase == Phase::Disconnected,
                egui::TextEdit::singleline(&mut port).desired_width(60.0),
            );
            if response.changed() {
                self.state.dispatch(Action::SetPortInput(port));
            }

            if phase == Phase::Disconnected {
                if ui.button("Connect").clicked() {
                    self.state.dispatch(Action::ConnectRequested);
                }
            } else if ui.button("Disconnect").clicked() {
                self.state.dispatch(Action::DisconnectRequested);
            }

            if !phase.is_connected() {
                return;
            }
            ui.separator();

            if ui
                .add_enabled(phase == Phase::Ready, egui::Button::new("Open model…"))
                .clicked()
            {
                self.pick_model();
            }

            if let Some(model) = &self.state.store.model {
                if let Some(path) = &self.state.store.model_path {
                    if let Some(name) = path.file_name() {
                        ui.label(name.to_string_lossy());
                    }
                }
                ui.label(format!("Variables: {}", model.var_names.len()));
                ui.label(format!("Colors: {}", model.color_count));

                if ui
                    .add_enabled(phase == Phase::Ready, egui::Button::new("Start"))
                    .clicked()
                {
                    self.state.dispatch(Action::StartRequested);
                }
            }
        });
    }

    fn pick_model(&mut self) {
        if self.state.store.model.is_some() {
            let answer = rfd::MessageDialog::new()
                .set_title("Replace model")
                .set_description("The current model will be overwritten. Proceed?")
                .set_buttons(rfd::MessageButtons::YesNo)
                .show();
            if answer != rfd::MessageDialogResult::Yes {
                return;
            }
        }
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Boolean network", &["aeon", "bnet", "sbml"])
            .pick_file()
        {
            self.state.dispatch(Action::ModelChosen { path });
        }
    }

    fn error_banner(&mut self, ctx: &egui::Context) {
        if self.state.store.error_message.is_none() {
            return;
        }
        egui::TopBottomPanel::top("error_banner").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("✖").clicked() {
                    self.state.dispatch(Action::ClearErrorMessage);
                }
                if let Some(message) = &self.state.store.error_message {
                    ui.label(RichText::new(message).color(INACTIVE_COLOR));
                }
            });
        });
    }

    fn tree_panel(&mut self, ui: &mut egui::Ui) {
        let mut pending = Vec::new();
        let store = &mut self.state.store;

        ui.horizontal(|ui| {
            ui.heading("Decision tree");
            if store.tree.is_some() {
                ui.separator();
                if ui.button("Re-layout").clicked() {
                    pending.push(Action::RelayoutRequested);
                }
            }
        });
        ui.separator();

        let Some(tree) = &mut store.tree else {
            ui.label("Select an attractor to request its decision tree.");
            for action in pending {
                self.state.dispatch(action);
            }
            return;
        };

        ui.label(format!("Entropy: {:.3}", tree.entropy));

        if store.tree_layout_reset_needed {
            reset_layout::<LayoutStateHierarchical>(ui, None);
            store.tree_layout_reset_needed = false;
        }

        let settings_interaction = SettingsInteraction::new()
            .with_dragging_enabled(true)
            .with_node_clicking_enabled(true);
        let settings_style = SettingsStyle::new().with_labels_always(true);

        let available_height = ui.available_height() - 80.0;
        ui.allocate_ui_with_layout(
            egui::Vec2::new(ui.available_width(), available_height.max(0.0)),
            egui::Layout::top_down(egui::Align::Center),
            |ui| {
                ui.add(
                    &mut TreeGraphView::new(&mut tree.graph)
                        .with_interactions(&settings_interaction)
                        .with_styles(&settings_style),
                );
            },
        );

        // Hover details: the node's structured title.
        ui.separator();
        match tree.graph.hovered_node() {
            Some(idx) => {
                if let Some(node) = tree.graph.node(idx) {
                    title_ui(ui, &node.payload().title);
                }
            }
            None => {
                ui.weak("Hover a node for details.");
            }
        }

        for action in pending {
            self.state.dispatch(action);
        }
    }
}

impl eframe::App for VisApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.tick();

        self.error_banner(ctx);

        egui::TopBottomPanel::top("connection_bar").show(ctx, |ui| {
            self.connection_bar(ui);
        });

        egui::SidePanel::left("attractors")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                ui.heading("Attractors");
                ui.separator();
                if self.state.store.attractors.is_empty() {
                    ui.label("No attractors yet.");
                } else {
                    let actions = table::show_attractors(ui, &self.state.store);
                    for action in actions {
                        self.state.dispatch(action);
                    }
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.tree_panel(ui);
        });

        if self.state.has_pending() {
            ctx.request_repaint();
        }
    }
}

/// Render a structured title, mapping tones to the accent colors.
fn title_ui(ui: &mut egui::Ui, title: &Title) {
    let plain = ui.visuals().text_color();
    for line in &title.lines {
        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 0.0;
            for span in line {
                let color = match span.tone {
                    Tone::Plain => plain,
                    Tone::Active => ACTIVE_COLOR,
                    Tone::Inactive => INACTIVE_COLOR,
                };
                ui.label(RichText::new(&span.text).color(color));
            }
        });
    }
}
