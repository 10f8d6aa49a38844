//! Session registry and subscription bookkeeping.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use symsync_protocol::ProjectId;
use tokio::sync::mpsc::UnboundedSender;

/// Identifies one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SessionId(u64);

struct Session {
    name: String,
    addr: SocketAddr,
    /// Outbox of encoded command payloads, drained by the writer task.
    outbox: UnboundedSender<Vec<u8>>,
    associated_projects: HashSet<ProjectId>,
}

/// Tracks live sessions and which projects each subscribes to.
///
/// Invariant: a session appears in `project_associations[p]` iff `p` is in
/// that session's `associated_projects`. Every mutation below updates both
/// sides under one lock.
#[derive(Default)]
pub(crate) struct SessionRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    sessions: HashMap<SessionId, Session>,
    project_associations: HashMap<ProjectId, HashSet<SessionId>>,
}

impl SessionRegistry {
    /// Registers a freshly handshaken session.
    pub fn register(
        &self,
        name: String,
        addr: SocketAddr,
        outbox: UnboundedSender<Vec<u8>>,
    ) -> SessionId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = SessionId(inner.next_id);
        inner.sessions.insert(
            id,
            Session {
                name,
                addr,
                outbox,
                associated_projects: HashSet::new(),
            },
        );
        id
    }

    /// Subscribes a session to a project.
    pub fn subscribe(&self, id: SessionId, project: &str) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if let Some(session) = inner.sessions.get_mut(&id) {
            session.associated_projects.insert(project.to_string());
            inner
                .project_associations
                .entry(project.to_string())
                .or_default()
                .insert(id);
        }
    }

    /// Unsubscribes a session from a project. A no-op if not subscribed.
    pub fn unsubscribe(&self, id: SessionId, project: &str) {
        let mut inner = self.inner.lock();
        if let Some(session) = inner.sessions.get_mut(&id) {
            session.associated_projects.remove(project);
        }
        if let Some(subscribers) = inner.project_associations.get_mut(project) {
            subscribers.remove(&id);
            if subscribers.is_empty() {
                inner.project_associations.remove(project);
            }
        }
    }

    /// Removes a session from the registry and from every subscriber set
    /// it belongs to.
    pub fn remove(&self, id: SessionId) {
        let mut inner = self.inner.lock();
        if let Some(session) = inner.sessions.remove(&id) {
            for project in session.associated_projects {
                if let Some(subscribers) = inner.project_associations.get_mut(&project) {
                    subscribers.remove(&id);
                    if subscribers.is_empty() {
                        inner.project_associations.remove(&project);
                    }
                }
            }
        }
    }

    /// Queues a payload to every subscriber of `project` except the
    /// originator. A session whose outbox is gone is logged and skipped;
    /// its own read loop will clear it shortly.
    pub fn broadcast(&self, project: &str, payload: &[u8], originator: SessionId) {
        let inner = self.inner.lock();
        let Some(subscribers) = inner.project_associations.get(project) else {
            return;
        };
        for id in subscribers {
            if *id == originator {
                continue;
            }
            let Some(session) = inner.sessions.get(id) else {
                continue;
            };
            if session.outbox.send(payload.to_vec()).is_err() {
                tracing::debug!(
                    name = %session.name,
                    addr = %session.addr,
                    "subscriber is closed but not yet cleared"
                );
            }
        }
    }

    /// Queues a payload to one session.
    pub fn send_to(&self, id: SessionId, payload: Vec<u8>) {
        let inner = self.inner.lock();
        if let Some(session) = inner.sessions.get(&id) {
            if session.outbox.send(payload).is_err() {
                tracing::debug!(
                    name = %session.name,
                    addr = %session.addr,
                    "session is closed but not yet cleared"
                );
            }
        }
    }

    #[cfg(test)]
    fn invariant_holds(&self) -> bool {
        let inner = self.inner.lock();
        let forward = inner.sessions.iter().all(|(id, session)| {
            session.associated_projects.iter().all(|project| {
                inner
                    .project_associations
                    .get(project)
                    .is_some_and(|subscribers| subscribers.contains(id))
            })
        });
        let backward = inner.project_associations.iter().all(|(project, subs)| {
            subs.iter().all(|id| {
                inner
                    .sessions
                    .get(id)
                    .is_some_and(|session| session.associated_projects.contains(project))
            })
        });
        forward && backward
    }
}
