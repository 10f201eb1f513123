use crate::actions::{self, Action};
use crate::effects::{self, Effect};
use crate::session::{ServerLink, Session, SessionEvent};
use crate::store::Store;

/// Builds a transport for a given port. Injected by `main` (demo
/// producer) and by tests.
pub type Connector = Box<dyn Fn(u16) -> Box<dyn ServerLink>>;

pub struct State {
    pub store: Store,
    session: Option<Session>,
    connector: Connector,
    action_queue: Vec<Action>,
    effect_queue: Vec<Effect>,
}

impl State {
    pub fn new(connector: Connector) -> Self {
        Self {
            store: Store::new(),
            session: None,
            connector,
            action_queue: Vec::new(),
            effect_queue: Vec::new(),
        }
    }

    pub fn dispatch(&mut self, action: Action) {
        self.action_queue.push(action);
    }

    pub fn has_pending(&self) -> bool {
        !self.action_queue.is_empty() || !self.effect_queue.is_empty()
    }

    /// Drain the transport and queue the resulting actions.
    pub fn poll_session(&mut self) {
        let Some(session) = &mut self.session else {
            return;
        };
        let mut closed = false;
        for event in session.poll() {
            let action = match event {
                SessionEvent::Connected => Action::Connected,
                SessionEvent::Disconnected => {
                    closed = true;
                    Action::ConnectionClosed
                }
                SessionEvent::ModelAccepted(info) => Action::ModelAccepted(info),
                SessionEvent::ModelRejected(reason) => Action::ModelRejected(reason),
                SessionEvent::Attractors(attrs) => Action::AttractorsReceived(attrs),
                SessionEvent::TreeReply { id, msg } => Action::TreeReplyReceived { id, msg },
                SessionEvent::ProtocolFailure(msg) => Action::ProtocolFailed(msg),
            };
            self.action_queue.push(action);
        }
        if closed {
            self.session = None;
        }
    }

    pub fn flush_actions(&mut self) {
        let queue = std::mem::take(&mut self.action_queue);
        for action in queue {
            let mut effects = actions::update(&mut self.store, action);
            self.effect_queue.append(&mut effects);
        }
    }

    pub fn flush_effects(&mut self) {
        let queue = std::mem::take(&mut self.effect_queue);
        for effect in queue {
            effects::run(&mut self.store, &mut self.session, &self.connector, effect);
        }
    }

    /// One full step: transport, then actions, then the IO they asked
    /// for.
    pub fn tick(&mut self) {
        self.poll_session();
        self.flush_actions();
        self.flush_effects();
        // Effects may have produced replies already (in-process
        // links); they are picked up next tick.
    }
}
