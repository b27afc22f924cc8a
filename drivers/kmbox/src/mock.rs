// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! An in-memory channel that records requests and scripts replies.

use std::{
    boxed::Box,
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
    vec,
    vec::Vec,
};

use crate::{Channel, ChannelError, Request, Response};

/// A request as seen by the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub opcode: u32,
    pub args: Vec<u32>,
}

/// A scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Header to report; `None` echoes the request opcode.
    pub header: Option<u32>,
    pub status: u32,
    pub payload: Vec<u32>,
}

impl Reply {
    /// A reply echoing the request header.
    pub fn status(status: u32, payload: &[u32]) -> Self {
        Self {
            header: None,
            status,
            payload: payload.to_vec(),
        }
    }
}

type Responder = Box<dyn FnMut(&SentRequest) -> Option<Reply> + Send>;

struct ChannelState {
    sent: Vec<SentRequest>,
    queued: VecDeque<Result<Reply, ChannelError>>,
    responder: Option<Responder>,
    max_args: usize,
}

/// A [`Channel`] double. Unscripted requests succeed with status zero and
/// a zero payload as long as the caller's buffer.
#[derive(Clone)]
pub struct ScriptedChannel {
    inner: Arc<Mutex<ChannelState>>,
}

impl Default for ScriptedChannel {
    fn default() -> Self {
        Self::new(32)
    }
}

impl ScriptedChannel {
    /// Creates a channel accepting up to `max_args` argument words.
    pub fn new(max_args: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChannelState {
                sent: Vec::new(),
                queued: VecDeque::new(),
                responder: None,
                max_args,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChannelState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues the reply for the next request.
    pub fn push_reply(&self, reply: Reply) {
        self.state().queued.push_back(Ok(reply));
    }

    /// Makes the next request fail at the transport level.
    pub fn push_error(&self, err: ChannelError) {
        self.state().queued.push_back(Err(err));
    }

    /// Answers requests through `f`; `None` falls back to the default reply.
    pub fn set_responder<F>(&self, f: F)
    where
        F: FnMut(&SentRequest) -> Option<Reply> + Send + 'static,
    {
        self.state().responder = Some(Box::new(f));
    }

    /// Returns every request sent so far.
    pub fn sent(&self) -> Vec<SentRequest> {
        self.state().sent.clone()
    }

    /// Forgets recorded requests.
    pub fn clear(&self) {
        self.state().sent.clear();
    }
}

impl Channel for ScriptedChannel {
    fn max_args(&self) -> usize {
        self.state().max_args
    }

    fn transact(&mut self, req: &Request<'_>, payload: &mut [u32]) -> Result<Response, ChannelError> {
        let mut s = self.state();
        crate::check_args(req, s.max_args)?;
        let sent = SentRequest {
            opcode: req.opcode,
            args: req.args.to_vec(),
        };
        s.sent.push(sent.clone());

        let reply = match s.queued.pop_front() {
            Some(r) => r?,
            None => {
                let scripted = s.responder.as_mut().and_then(|f| f(&sent));
                scripted.unwrap_or_else(|| Reply {
                    header: None,
                    status: 0,
                    payload: vec![0; payload.len()],
                })
            }
        };

        let len = payload.len().min(reply.payload.len());
        payload[..len].copy_from_slice(&reply.payload[..len]);
        Ok(Response {
            header: reply.header.unwrap_or(req.opcode),
            status: reply.status,
            len,
        })
    }
}
