//! An in-process world: every unit runs on its own thread and talks to the
//! others over unbounded crossbeam channels.
//!
//! Each collective bumps a per-unit epoch that tags the messages sent in it.
//! Messages of a later collective that arrive early are held back; a message
//! of an earlier one is a [`CommError::ProtocolMismatch`]. A unit that goes
//! away, by returning or by panicking, announces it, so peers still waiting on
//! it fail with [`CommError::Disconnected`] instead of blocking.

use std::panic;

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{CommError, Communicator, GatherLayout, ROOT};

#[derive(Debug)]
enum Body {
    Status(Option<String>),
    Verdict(Option<(usize, String)>),
    Count(usize),
    Payload(Vec<u64>),
    Departed,
}

impl Body {
    fn kind(&self) -> &'static str {
        match self {
            Body::Status(_) => "status",
            Body::Verdict(_) => "verdict",
            Body::Count(_) => "count",
            Body::Payload(_) => "payload",
            Body::Departed => "departure",
        }
    }
}

#[derive(Debug)]
struct Message {
    from: usize,
    epoch: u64,
    body: Body,
}

/// Launches units on scoped threads.
#[derive(Debug, Clone, Copy)]
pub struct ThreadWorld;

impl ThreadWorld {
    /// Runs `f` once per rank in `0..size`, each on its own thread, and returns
    /// the results in rank order. A panic in any unit is resumed on the caller
    /// after every unit has finished.
    pub fn run<T, F>(size: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&mut ThreadUnit) -> T + Sync,
    {
        let (outboxes, inboxes): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded()).unzip();
        let units: Vec<ThreadUnit> = inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| ThreadUnit {
                rank,
                size,
                epoch: 0,
                inbox,
                outboxes: outboxes.clone(),
                pending: Vec::new(),
                departed: vec![false; size],
            })
            .collect();
        drop(outboxes);

        let f = &f;
        let joined: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = units
                .into_iter()
                .map(|mut unit| scope.spawn(move || f(&mut unit)))
                .collect();
            handles.into_iter().map(|handle| handle.join()).collect()
        });

        joined
            .into_iter()
            .map(|result| match result {
                Ok(value) => value,
                Err(payload) => panic::resume_unwind(payload),
            })
            .collect()
    }
}

/// One unit's endpoint in a [`ThreadWorld`].
pub struct ThreadUnit {
    rank: usize,
    size: usize,
    epoch: u64,
    inbox: Receiver<Message>,
    outboxes: Vec<Sender<Message>>,
    pending: Vec<Message>,
    departed: Vec<bool>,
}

impl ThreadUnit {
    fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    fn send(&self, to: usize, epoch: u64, body: Body) -> Result<(), CommError> {
        self.outboxes[to]
            .send(Message {
                from: self.rank,
                epoch,
                body,
            })
            .map_err(|_| CommError::Disconnected { rank: to })
    }

    fn mismatch(&self, detail: String) -> CommError {
        CommError::ProtocolMismatch {
            rank: self.rank,
            detail,
        }
    }

    /// Waits for exactly one message of collective `epoch` from every rank in
    /// `sources`, returned in the order of `sources`.
    fn collect(&mut self, epoch: u64, sources: &[usize]) -> Result<Vec<Body>, CommError> {
        let mut received: Vec<Option<Body>> = (0..self.size).map(|_| None).collect();
        let mut missing = sources.len();

        let mut early = Vec::new();
        for message in std::mem::take(&mut self.pending) {
            if message.epoch == epoch && sources.contains(&message.from) {
                if received[message.from].is_some() {
                    return Err(self.mismatch(format!(
                        "unit {} sent twice in collective {epoch}",
                        message.from
                    )));
                }
                received[message.from] = Some(message.body);
                missing -= 1;
            } else {
                early.push(message);
            }
        }
        self.pending = early;

        while missing > 0 {
            if let Some(&rank) = sources
                .iter()
                .find(|&&r| self.departed[r] && received[r].is_none())
            {
                return Err(CommError::Disconnected { rank });
            }

            let message = self.inbox.recv().map_err(|_| CommError::Disconnected {
                rank: sources
                    .iter()
                    .copied()
                    .find(|&r| received[r].is_none())
                    .unwrap_or(self.rank),
            })?;

            if let Body::Departed = message.body {
                self.departed[message.from] = true;
                continue;
            }
            if message.epoch > epoch {
                self.pending.push(message);
                continue;
            }
            if message.epoch < epoch || !sources.contains(&message.from) {
                return Err(self.mismatch(format!(
                    "unexpected {} from unit {} in collective {} while in collective {epoch}",
                    message.body.kind(),
                    message.from,
                    message.epoch
                )));
            }
            if received[message.from].is_some() {
                return Err(self.mismatch(format!(
                    "unit {} sent twice in collective {epoch}",
                    message.from
                )));
            }
            received[message.from] = Some(message.body);
            missing -= 1;
        }

        Ok(sources
            .iter()
            .filter_map(|&r| received[r].take())
            .collect())
    }

    fn peers(&self) -> Vec<usize> {
        (0..self.size).filter(|&r| r != ROOT).collect()
    }
}

impl Communicator for ThreadUnit {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn checkpoint(&mut self, status: Result<(), String>) -> Result<(), CommError> {
        let epoch = self.next_epoch();

        let verdict = if self.rank == ROOT {
            let peers = self.peers();
            let mut failures = Vec::new();
            if let Err(reason) = status {
                failures.push((ROOT, reason));
            }
            for (from, body) in peers.iter().zip(self.collect(epoch, &peers)?) {
                match body {
                    Body::Status(None) => {}
                    Body::Status(Some(reason)) => failures.push((*from, reason)),
                    other => {
                        return Err(self.mismatch(format!(
                            "expected a status from unit {from}, got a {}",
                            other.kind()
                        )))
                    }
                }
            }
            let verdict = failures.into_iter().next();
            for &peer in &peers {
                self.send(peer, epoch, Body::Verdict(verdict.clone()))?;
            }
            verdict
        } else {
            self.send(ROOT, epoch, Body::Status(status.err()))?;
            match self.collect(epoch, &[ROOT])?.pop() {
                Some(Body::Verdict(verdict)) => verdict,
                Some(other) => {
                    return Err(self.mismatch(format!(
                        "expected a verdict from the root, got a {}",
                        other.kind()
                    )))
                }
                None => return Err(CommError::Disconnected { rank: ROOT }),
            }
        };

        match verdict {
            None => Ok(()),
            Some((rank, reason)) => Err(CommError::Aborted { rank, reason }),
        }
    }

    fn gather_counts(&mut self, len: usize) -> Result<Option<Vec<usize>>, CommError> {
        let epoch = self.next_epoch();
        if self.rank != ROOT {
            self.send(ROOT, epoch, Body::Count(len))?;
            return Ok(None);
        }

        let peers = self.peers();
        let mut counts = vec![len];
        for (from, body) in peers.iter().zip(self.collect(epoch, &peers)?) {
            match body {
                Body::Count(count) => counts.push(count),
                other => {
                    return Err(self.mismatch(format!(
                        "expected a count from unit {from}, got a {}",
                        other.kind()
                    )))
                }
            }
        }
        Ok(Some(counts))
    }

    fn gather_payload(
        &mut self,
        data: &[u64],
        layout: Option<&GatherLayout>,
    ) -> Result<Option<Vec<u64>>, CommError> {
        let epoch = self.next_epoch();
        if self.rank != ROOT {
            self.send(ROOT, epoch, Body::Payload(data.to_vec()))?;
            return Ok(None);
        }

        let layout =
            layout.ok_or_else(|| self.mismatch("the root must provide a gather layout".into()))?;
        let peers = self.peers();
        let mut slices = vec![data.to_vec()];
        for (from, body) in peers.iter().zip(self.collect(epoch, &peers)?) {
            match body {
                Body::Payload(slice) => slices.push(slice),
                other => {
                    return Err(self.mismatch(format!(
                        "expected a payload from unit {from}, got a {}",
                        other.kind()
                    )))
                }
            }
        }
        layout.assemble(self.rank, slices).map(Some)
    }
}

impl Drop for ThreadUnit {
    fn drop(&mut self) {
        let targets = if self.rank == ROOT {
            self.peers()
        } else {
            vec![ROOT]
        };
        for to in targets {
            // The peer may already be gone.
            let _ = self.send(to, self.epoch, Body::Departed);
        }
    }
}
