//! Connection to the analysis server.
//!
//! The socket itself is a collaborator: anything implementing
//! [`ServerLink`] can carry the session. The crate ships an in-memory
//! channel link, used by the bundled demo producer and by tests.

use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};

use crate::protocol::{self, Command, ModelInfo};

/// What the transport delivered since the last poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    Closed,
    Text(String),
}

/// Outgoing traffic, as the server sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Text(String),
    Model(Vec<u8>),
}

/// Narrow transport interface. `try_recv` must never block; the UI
/// drains it once per frame.
pub trait ServerLink {
    fn send_text(&mut self, text: &str);
    fn send_model(&mut self, bytes: Vec<u8>);
    fn try_recv(&mut self) -> Option<LinkEvent>;
}

/// Client endpoint of an in-process link.
pub struct InMemoryLink {
    tx: Sender<ClientMessage>,
    rx: Receiver<LinkEvent>,
}

/// Server endpoint of an in-process link.
pub struct ServerEndpoint {
    pub rx: Receiver<ClientMessage>,
    pub tx: Sender<LinkEvent>,
}

pub fn in_memory_pair() -> (InMemoryLink, ServerEndpoint) {
    let (client_tx, server_rx) = channel();
    let (server_tx, client_rx) = channel();
    (
        InMemoryLink {
            tx: client_tx,
            rx: client_rx,
        },
        ServerEndpoint {
            rx: server_rx,
            tx: server_tx,
        },
    )
}

impl ServerLink for InMemoryLink {
    fn send_text(&mut self, text: &str) {
        // A send to a gone server surfaces as Closed on the next poll.
        let _ = self.tx.send(ClientMessage::Text(text.to_string()));
    }

    fn send_model(&mut self, bytes: Vec<u8>) {
        let _ = self.tx.send(ClientMessage::Model(bytes));
    }

    fn try_recv(&mut self) -> Option<LinkEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(LinkEvent::Closed),
        }
    }
}

/// Which reply the next text message answers. The server has no
/// message framing beyond request order, so the client tracks the
/// pending request itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expecting {
    Nothing,
    ModelReply,
    Attractors,
    Tree(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    ModelAccepted(ModelInfo),
    ModelRejected(String),
    Attractors(Vec<(u64, String)>),
    /// Raw reply; decoding needs the model's variable names, which
    /// live in the store.
    TreeReply { id: usize, msg: String },
    ProtocolFailure(String),
}

pub struct Session {
    link: Box<dyn ServerLink>,
    expecting: Expecting,
}

impl Session {
    pub fn new(link: Box<dyn ServerLink>) -> Self {
        Self {
            link,
            expecting: Expecting::Nothing,
        }
    }

    pub fn send(&mut self, command: Command) {
        self.expecting = match command {
            Command::Start => Expecting::Attractors,
            Command::Tree(id) => Expecting::Tree(id),
        };
        self.link.send_text(&command.to_string());
    }

    pub fn upload_model(&mut self, bytes: Vec<u8>) {
        self.expecting = Expecting::ModelReply;
        self.link.send_model(bytes);
    }

    /// Drain the transport and translate replies according to the
    /// pending request.
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.link.try_recv() {
            match event {
                LinkEvent::Opened => events.push(SessionEvent::Connected),
                LinkEvent::Closed => {
                    events.push(SessionEvent::Disconnected);
                    return events;
                }
                LinkEvent::Text(msg) => events.push(self.interpret(&msg)),
            }
        }
        events
    }

    fn interpret(&mut self, msg: &str) -> SessionEvent {
        let expecting = std::mem::replace(&mut self.expecting, Expecting::Nothing);
        match expecting {
            Expecting::ModelReply => match protocol::parse_model_reply(msg) {
                Ok(info) => SessionEvent::ModelAccepted(info),
                Err(protocol::ProtocolError::Rejected(reason)) => {
                    SessionEvent::ModelRejected(reason.trim().to_string())
                }
                Err(e) => SessionEvent::ProtocolFailure(e.to_string()),
            },
            Expecting::Attractors => match protocol::parse_attractor_list(msg) {
                Ok(attrs) => SessionEvent::Attractors(attrs),
                Err(e) => SessionEvent::ProtocolFailure(e.to_string()),
            },
            Expecting::Tree(id) => SessionEvent::TreeReply {
                id,
                msg: msg.to_string(),
            },
            Expecting::Nothing => {
                SessionEvent::ProtocolFailure(format!("unsolicited server message '{msg}'"))
            }
        }
    }
}

/// Non-privileged ports only: digits, within `[1024, 65535]`.
pub fn validate_port(input: &str) -> Result<u16, String> {
    input
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port >= 1024)
        .ok_or_else(|| "Port has to be a number in range [1024, 65535]".to_string())
}
