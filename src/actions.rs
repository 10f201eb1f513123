use std::path::PathBuf;

use crate::effects::Effect;
use crate::protocol::{self, Command, ModelInfo};
use crate::session::validate_port;
use crate::store::{AttractorRow, Phase, Store};
use crate::tree_view;

/// Everything that can change the client state. UI code and the
/// session poller only dispatch; all mutation happens in [`update`].
#[derive(Debug, Clone)]
pub enum Action {
    // Connection
    /// Validate the port field and open a link
    ConnectRequested,
    /// Drop the link and reset
    DisconnectRequested,
    /// The transport reported the connection open
    Connected,
    /// The transport reported the connection closed
    ConnectionClosed,

    // Model
    /// The user picked a model file to upload
    ModelChosen { path: PathBuf },
    /// Server accepted the model and described it
    ModelAccepted(ModelInfo),
    /// Server rejected the model file
    ModelRejected(String),

    // Analysis
    /// Kick off the attractor computation
    StartRequested,
    /// Attractor list reply, sorted by descending color count
    AttractorsReceived(Vec<(u64, String)>),
    /// A table row was clicked; requests that attractor's tree
    AttractorSelected { id: usize },
    /// Raw `TREE` reply for row `id`
    TreeReplyReceived { id: usize, msg: String },
    /// A reply could not be parsed at the protocol level
    ProtocolFailed(String),

    // UI state
    /// Edit the port field
    SetPortInput(String),
    /// Hover state of the bit glyphs in the table
    BitHovered { var: Option<(usize, char)> },
    /// Re-run the tree layout
    RelayoutRequested,
    /// Dismiss the error banner
    ClearErrorMessage,
}

/// Apply one action; returns the deferred IO it requires.
pub fn update(store: &mut Store, action: Action) -> Vec<Effect> {
    match action {
        Action::ConnectRequested => match validate_port(&store.port_input) {
            Ok(port) => {
                store.phase = Phase::Connecting;
                vec![Effect::Connect { port }]
            }
            Err(msg) => {
                store.error_message = Some(msg);
                vec![]
            }
        },
        Action::DisconnectRequested => {
            store.reset_connection();
            vec![Effect::Disconnect]
        }
        Action::Connected => {
            store.phase = Phase::Ready;
            store.model = None;
            store.model_path = None;
            store.reset_results();
            vec![]
        }
        Action::ConnectionClosed => {
            store.reset_connection();
            vec![]
        }

        Action::ModelChosen { path } => {
            store.model_path = Some(path.clone());
            vec![Effect::UploadModel { path }]
        }
        Action::ModelAccepted(info) => {
            store.model = Some(info);
            store.reset_results();
            vec![]
        }
        Action::ModelRejected(reason) => {
            store.error_message = Some(reason);
            store.model_path = None;
            vec![]
        }

        Action::StartRequested => {
            if store.model.is_none() {
                store.error_message = Some("No model loaded.".to_string());
                return vec![];
            }
            store.phase = Phase::Computing;
            store.reset_results();
            vec![Effect::SendCommand(Command::Start)]
        }
        Action::AttractorsReceived(attrs) => {
            store.phase = Phase::Ready;
            store.attractors = attrs
                .into_iter()
                .map(|(colors, state)| AttractorRow::new(colors, state))
                .collect();
            vec![]
        }
        Action::AttractorSelected { id } => {
            if store.table_locked || store.phase != Phase::Ready || id >= store.attractors.len() {
                return vec![];
            }
            store.selected = Some(id);
            store.table_locked = true;
            vec![Effect::SendCommand(Command::Tree(id))]
        }
        Action::TreeReplyReceived { id, msg } => {
            store.table_locked = false;
            if let Err(message) = apply_tree_reply(store, id, &msg) {
                store.tree = None;
                store.error_message = Some(message);
            }
            vec![]
        }
        Action::ProtocolFailed(message) => {
            store.error_message = Some(message);
            store.table_locked = false;
            if store.phase == Phase::Computing {
                store.phase = Phase::Ready;
            }
            vec![]
        }

        Action::SetPortInput(input) => {
            store.port_input = input;
            vec![]
        }
        Action::BitHovered { var } => {
            store.hovered_var = var;
            vec![]
        }
        Action::RelayoutRequested => {
            store.tree_layout_reset_needed = true;
            vec![]
        }
        Action::ClearErrorMessage => {
            store.error_message = None;
            vec![]
        }
    }
}

/// Decode a tree reply and install the results: row entropy, row
/// driver set, and the display graph. Any failure aborts the whole
/// reply; no partial tree is shown.
fn apply_tree_reply(store: &mut Store, id: usize, msg: &str) -> Result<(), String> {
    let model = store
        .model
        .as_ref()
        .ok_or("Tree reply without a loaded model.")?;

    let (dset, tree_tokens) = protocol::parse_tree_reply(msg).map_err(|e| e.to_string())?;
    let dset_label = dset.label(&model.var_names).map_err(|e| e.to_string())?;

    let colors = store
        .attractors
        .get(id)
        .map(|row| row.colors)
        .ok_or_else(|| format!("Tree reply for unknown attractor {id}."))?;

    let decoded = dtree::Decoder::new(&model.var_names)
        .decode(&tree_tokens, colors)
        .map_err(|e| e.to_string())?;

    let row = &mut store.attractors[id];
    row.entropy = Some(decoded.entropy);
    row.driver_set = Some(dset_label);

    store.tree = Some(tree_view::build_tree_display(&decoded));
    store.tree_layout_reset_needed = true;
    Ok(())
}
