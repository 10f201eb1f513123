use std::path::PathBuf;

use crate::protocol::Command;
use crate::session::Session;
use crate::state::Connector;
use crate::store::Store;

/// Deferred IO that must run outside the reducer: opening links,
/// reading files, talking to the server.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Open a link to the server on this port
    Connect { port: u16 },
    /// Drop the current link
    Disconnect,
    /// Send a command over the session
    SendCommand(Command),
    /// Read a model file and upload it
    UploadModel { path: PathBuf },
}

/// Execute a single effect.
pub fn run(store: &mut Store, session: &mut Option<Session>, connector: &Connector, effect: Effect) {
    match effect {
        Effect::Connect { port } => {
            *session = Some(Session::new(connector(port)));
        }
        Effect::Disconnect => {
            *session = None;
        }
        Effect::SendCommand(command) => match session {
            Some(session) => session.send(command),
            None => store.error_message = Some("Not connected.".to_string()),
        },
        Effect::UploadModel { path } => {
            let Some(session) = session else {
                store.error_message = Some("Not connected.".to_string());
                return;
            };
            match std::fs::read(&path) {
                Ok(bytes) => session.upload_model(bytes),
                Err(e) => {
                    store.model_path = None;
                    store.error_message = Some(format!("Cannot read {}: {e}", path.display()));
                }
            }
        }
    }
}
