mod actions;
mod app;
mod demo;
mod effects;
mod protocol;
mod session;
mod state;
mod store;
mod table;
mod tree_view;

use app::VisApp;

fn main() -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1100.0, 700.0]),
        ..Default::default()
    };
    eframe::run_native(
        "PBN Attractor Explorer",
        options,
        Box::new(|_cc| Ok(Box::new(VisApp::new(demo::connector())))),
    )
}
