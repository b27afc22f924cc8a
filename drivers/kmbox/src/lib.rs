// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Blocking request/response channels.
//!
//! A [`Channel`] carries one request at a time and blocks the calling core
//! until the remote side latches a response. Two transports exist:
//! [`MuChannel`], which uses the messaging-unit transmit and receive
//! registers directly, and [`SmtChannel`], which places the message in
//! shared memory and rings a messaging-unit doorbell.
//!
//! Callers own the channel exclusively for the duration of a transaction.
#![cfg_attr(not(any(test, feature = "mock")), no_std)]

#[macro_use]
extern crate log;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod mu;
pub mod smt;

use core::fmt;

use kplat::timer::PollTimeout;
pub use mu::MuChannel;
pub use smt::SmtChannel;

/// An outgoing command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    /// Command word placed ahead of the arguments.
    pub opcode: u32,
    /// Argument words.
    pub args: &'a [u32],
}

impl<'a> Request<'a> {
    pub const fn new(opcode: u32, args: &'a [u32]) -> Self {
        Self { opcode, args }
    }
}

/// A latched response. Payload words are written to the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// Response header word.
    pub header: u32,
    /// Status word. Its meaning depends on the command family.
    pub status: u32,
    /// Number of payload words copied to the caller's buffer.
    pub len: usize,
}

/// Transport-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// The request does not fit the transport.
    TooManyArgs { given: usize, max: usize },
    /// The remote side did not answer within the poll budget.
    Timeout(PollTimeout),
    /// The remote side flagged a transport error or sent a malformed reply.
    Transport,
}

impl From<PollTimeout> for ChannelError {
    fn from(t: PollTimeout) -> Self {
        ChannelError::Timeout(t)
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::TooManyArgs { given, max } => {
                write!(f, "{given} argument words exceed channel limit of {max}")
            }
            ChannelError::Timeout(t) => write!(f, "{t}"),
            ChannelError::Transport => write!(f, "transport error"),
        }
    }
}

/// A synchronous command channel.
pub trait Channel {
    /// Largest number of argument words one request may carry.
    fn max_args(&self) -> usize;

    /// Sends `req` and blocks until the response is latched.
    ///
    /// Up to `payload.len()` payload words following the status word are
    /// copied into `payload`.
    fn transact(&mut self, req: &Request<'_>, payload: &mut [u32]) -> Result<Response, ChannelError>;
}

impl<T: Channel + ?Sized> Channel for &mut T {
    fn max_args(&self) -> usize {
        (**self).max_args()
    }

    fn transact(&mut self, req: &Request<'_>, payload: &mut [u32]) -> Result<Response, ChannelError> {
        (**self).transact(req, payload)
    }
}

fn check_args(req: &Request<'_>, max: usize) -> Result<(), ChannelError> {
    if req.args.len() > max {
        return Err(ChannelError::TooManyArgs {
            given: req.args.len(),
            max,
        });
    }
    Ok(())
}
