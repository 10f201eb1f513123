use eframe::egui::{self, Color32, RichText, Sense};
use egui_extras::{Column, TableBuilder};

use crate::actions::Action;
use crate::store::Store;
use crate::tree_view::{ACTIVE_COLOR, DONT_CARE_COLOR, INACTIVE_COLOR};

fn bit_color(bit: char) -> Color32 {
    match bit {
        '1' => ACTIVE_COLOR,
        '0' => INACTIVE_COLOR,
        _ => DONT_CARE_COLOR,
    }
}

/// Viridis tint for an entropy cell, normalized by the row's maximum
/// possible score `log2(colors)`.
fn entropy_fill(entropy: f64, colors: u64) -> Color32 {
    let max = (colors as f64).log2();
    let t = if max > 0.0 {
        (entropy / max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let c = colorous::VIRIDIS.eval_continuous(t);
    Color32::from_rgb(c.r, c.g, c.b)
}

/// Black on bright cells, white on dark ones.
fn contrasting_text_color(bg: Color32) -> Color32 {
    let r = bg.r() as f64 / 255.0;
    let g = bg.g() as f64 / 255.0;
    let b = bg.b() as f64 / 255.0;
    let luminance = 0.299 * r + 0.587 * g + 0.114 * b;
    if luminance > 0.5 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}

/// One glyph per variable; hovering highlights the glyph and reports
/// which variable it belongs to.
fn bit_cells(ui: &mut egui::Ui, bits: &str, actions: &mut Vec<Action>) {
    ui.spacing_mut().item_spacing.x = 1.0;
    for (var, bit) in bits.chars().enumerate() {
        let text = RichText::new(bit).monospace().color(bit_color(bit));
        let response = ui.add(egui::Label::new(text).sense(Sense::hover()));
        if response.hovered() {
            ui.painter().rect_filled(
                response.rect.expand(1.0),
                2.0,
                bit_color(bit).gamma_multiply(0.3),
            );
            actions.push(Action::BitHovered {
                var: Some((var, bit)),
            });
        }
    }
}

/// The attractor table plus the hovered-variable caption. Returns the
/// actions the interaction produced; the caller dispatches them.
pub fn show_attractors(ui: &mut egui::Ui, store: &Store) -> Vec<Action> {
    let mut actions = Vec::new();

    TableBuilder::new(ui)
        .striped(true)
        .sense(Sense::click())
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::remainder())
        .header(18.0, |mut header| {
            for title in ["#", "Colors", "State", "Entropy", "Driver set"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, store.attractors.len(), |mut row| {
                let id = row.index();
                let attractor = &store.attractors[id];
                row.set_selected(store.selected == Some(id));

                row.col(|ui| {
                    ui.monospace(id.to_string());
                });
                row.col(|ui| {
                    ui.monospace(attractor.colors.to_string());
                });
                row.col(|ui| {
                    ui.horizontal(|ui| {
                        bit_cells(ui, &attractor.state, &mut actions);
                    });
                });
                row.col(|ui| match attractor.entropy {
                    Some(entropy) => {
                        let fill = entropy_fill(entropy, attractor.colors);
                        let text = RichText::new(format!("{entropy:.3}"))
                            .monospace()
                            .color(contrasting_text_color(fill))
                            .background_color(fill);
                        ui.label(text);
                    }
                    None => {
                        ui.monospace("?");
                    }
                });
                row.col(|ui| match &attractor.driver_set {
                    Some(dset) => {
                        ui.horizontal(|ui| {
                            bit_cells(ui, dset, &mut actions);
                        });
                    }
                    None => {
                        ui.monospace("?");
                    }
                });

                if row.response().clicked() && !store.table_locked {
                    actions.push(Action::AttractorSelected { id });
                }
            });
        });

    let hovered_any_bit = actions
        .iter()
        .any(|a| matches!(a, Action::BitHovered { var: Some(_) }));
    if !hovered_any_bit && store.hovered_var.is_some() {
        actions.push(Action::BitHovered { var: None });
    }

    // Caption naming the hovered variable, colored like its glyph.
    ui.add_space(4.0);
    match store.hovered_var {
        Some((var, bit)) => {
            let name = store
                .var_names()
                .get(var)
                .map(String::as_str)
                .unwrap_or("?");
            ui.label(RichText::new(name).strong().color(bit_color(bit)));
        }
        None => {
            ui.label(" ");
        }
    }

    actions
}
