use std::path::PathBuf;

use crate::protocol::ModelInfo;
use crate::tree_view::TreeDisplay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    Connecting,
    Ready,
    Computing,
}

impl Phase {
    pub fn is_connected(self) -> bool {
        matches!(self, Phase::Ready | Phase::Computing)
    }
}

/// One row of the attractor table. Entropy and the minimal driver set
/// stay unknown (`?` in the table) until the tree reply for this row
/// arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct AttractorRow {
    pub colors: u64,
    pub state: String,
    pub entropy: Option<f64>,
    pub driver_set: Option<String>,
}

impl AttractorRow {
    pub fn new(colors: u64, state: String) -> Self {
        Self {
            colors,
            state,
            entropy: None,
            driver_set: None,
        }
    }
}

pub struct Store {
    pub phase: Phase,
    pub port_input: String,
    pub model: Option<ModelInfo>,
    pub model_path: Option<PathBuf>,
    pub attractors: Vec<AttractorRow>,
    pub selected: Option<usize>,
    /// Set while a tree request is in flight; row clicks are ignored.
    pub table_locked: bool,
    /// Hovered bit of a state/driver-set cell: variable index plus the
    /// glyph under the pointer.
    pub hovered_var: Option<(usize, char)>,
    pub tree: Option<TreeDisplay>,
    pub tree_layout_reset_needed: bool,
    pub error_message: Option<String>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            phase: Phase::Disconnected,
            port_input: "5678".to_string(),
            model: None,
            model_path: None,
            attractors: Vec::new(),
            selected: None,
            table_locked: false,
            hovered_var: None,
            tree: None,
            tree_layout_reset_needed: false,
            error_message: None,
        }
    }

    pub fn var_names(&self) -> &[String] {
        self.model.as_ref().map(|m| m.var_names.as_slice()).unwrap_or(&[])
    }

    /// Drop every per-model result, keeping the connection.
    pub fn reset_results(&mut self) {
        self.attractors.clear();
        self.selected = None;
        self.table_locked = false;
        self.hovered_var = None;
        self.tree = None;
    }

    /// Back to the disconnected state, as when the socket closes.
    pub fn reset_connection(&mut self) {
        self.phase = Phase::Disconnected;
        self.model = None;
        self.model_path = None;
        self.reset_results();
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
