//! Bundled stand-in for the analysis server.
//!
//! Speaks the upstream protocol over the in-memory link and answers
//! with canned results for a small fixed network, so the client runs
//! end to end without the external computation backend. A real
//! transport replaces this by providing another [`Connector`].

use std::thread;

use crate::session::{ClientMessage, LinkEvent, ServerEndpoint, in_memory_pair};
use crate::state::Connector;

const MODEL_REPLY: &str = "OK 12 ctrA gcrA dnaA ccrM";
const ATTRACTOR_REPLY: &str = "8 1010 3 0110 1 0001";

const TREE_REPLIES: [&str; 3] = [
    "[ ctrA=1 ] dnaA(1ctrA,0gcrA) 5 3 [ gcrA=0 ] dnaA;!ccrM 2 1 [ ctrA=1 ] [ ctrA=1 ccrM=0 ]",
    "[ gcrA=1 dnaA=1 ] ccrM 1 2 [ ccrM=0 ] [ ccrM=1 ]",
    "[ ] [ ]",
];

pub fn connector() -> Connector {
    Box::new(|_port| {
        let (link, endpoint) = in_memory_pair();
        thread::spawn(move || serve(endpoint));
        Box::new(link)
    })
}

fn serve(endpoint: ServerEndpoint) {
    if endpoint.tx.send(LinkEvent::Opened).is_err() {
        return;
    }
    while let Ok(msg) = endpoint.rx.recv() {
        let reply = match msg {
            ClientMessage::Model(_) => Some(MODEL_REPLY.to_string()),
            ClientMessage::Text(text) => respond(&text),
        };
        let Some(reply) = reply else { continue };
        if endpoint.tx.send(LinkEvent::Text(reply)).is_err() {
            return;
        }
    }
}

fn respond(command: &str) -> Option<String> {
    if command == "START" {
        return Some(ATTRACTOR_REPLY.to_string());
    }
    let id = command.strip_prefix("TREE ")?.parse::<usize>().ok()?;
    TREE_REPLIES.get(id).map(|reply| reply.to_string())
}
