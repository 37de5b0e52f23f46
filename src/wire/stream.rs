//! Stream-backed transport
//!
//! [`StreamReader`] decodes frames on a background thread and hands them
//! over a channel; completions are dispatched from [`StreamReader::poll`],
//! so a registered callback always runs after `read_packet` has returned.
//! [`StreamWriter`] frames and flushes each packet synchronously.
//!
//! The decoder thread is detached; it exits at end of stream, on a framing
//! error, or once the reader is dropped and its next hand-off fails.

use std::io::{BufWriter, Read, Write};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError};

use crate::error::{KvldsError, Result};

use super::frame::{encode_frame, read_frame};
use super::{Packet, PacketCallback, PacketReader, PacketWriter};

/// Cancellation token for a [`StreamReader`] read
#[derive(Debug, PartialEq, Eq)]
pub struct ReadToken(u64);

/// Packet reader over any byte stream
pub struct StreamReader {
    /// Frames decoded by the background thread
    packets: Receiver<Result<Packet>>,

    /// The registered read, if any
    pending: Option<(u64, PacketCallback)>,

    /// Sequence for cancellation tokens
    next_token: u64,

    /// Set once the stream has failed or ended
    closed: bool,
}

impl StreamReader {
    /// Start decoding frames from `stream`
    pub fn spawn<S>(stream: S, max_packet_size: usize) -> Result<Self>
    where
        S: Read + Send + 'static,
    {
        // One frame of read-ahead; the decoder blocks until it is taken
        let (tx, packets) = channel::bounded(1);

        thread::Builder::new()
            .name("kvlds-wire-reader".to_string())
            .spawn(move || {
                let mut stream = std::io::BufReader::new(stream);
                loop {
                    let frame = read_frame(&mut stream, max_packet_size);
                    let stop = !matches!(frame, Ok(Some(_)));
                    let event = match frame {
                        Ok(Some(packet)) => Ok(packet),
                        Ok(None) => Err(KvldsError::Transport("end of stream".to_string())),
                        Err(e) => Err(e),
                    };
                    if tx.send(event).is_err() || stop {
                        break;
                    }
                }
            })?;

        Ok(Self {
            packets,
            pending: None,
            next_token: 0,
            closed: false,
        })
    }

    /// Whether a read is registered and waiting
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the underlying stream has ended or failed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Deliver the next packet to the pending read, waiting up to `timeout`
    ///
    /// `None` waits indefinitely. Returns `Ok(true)` if a completion ran,
    /// `Ok(false)` if nothing was pending or nothing arrived in time. The
    /// callback's own result is passed through.
    pub fn poll(&mut self, timeout: Option<Duration>) -> Result<bool> {
        if self.pending.is_none() {
            return Ok(false);
        }

        let event = if self.closed {
            Err(KvldsError::Transport("stream closed".to_string()))
        } else {
            let received = match timeout {
                Some(timeout) => match self.packets.recv_timeout(timeout) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => {
                        Some(Err(KvldsError::Transport("reader thread exited".to_string())))
                    }
                },
                None => Some(self.packets.recv().unwrap_or_else(|_| {
                    Err(KvldsError::Transport("reader thread exited".to_string()))
                })),
            };
            match received {
                Some(event) => event,
                None => return Ok(false),
            }
        };

        let Some((_, on_done)) = self.pending.take() else {
            return Ok(false);
        };
        match event {
            Ok(packet) => {
                tracing::trace!(id = packet.id, len = packet.len(), "packet received");
                on_done(Some(packet))?;
            }
            Err(e) => {
                if !self.closed {
                    tracing::debug!("packet stream failed: {}", e);
                }
                self.closed = true;
                on_done(None)?;
            }
        }
        Ok(true)
    }
}

impl PacketReader for StreamReader {
    type Cancel = ReadToken;

    fn read_packet(&mut self, on_done: PacketCallback) -> Result<ReadToken> {
        if self.pending.is_some() {
            return Err(KvldsError::Transport("a read is already pending".to_string()));
        }

        let token = self.next_token;
        self.next_token = self.next_token.wrapping_add(1);
        self.pending = Some((token, on_done));
        Ok(ReadToken(token))
    }

    fn cancel(&mut self, token: ReadToken) {
        if self.pending.as_ref().map(|(pending, _)| *pending) == Some(token.0) {
            self.pending = None;
        }
    }
}

/// Packet writer over any byte sink
pub struct StreamWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }
}

impl<W: Write> PacketWriter for StreamWriter<W> {
    fn write_packet(&mut self, id: u64, payload: &[u8]) -> Result<()> {
        let frame = encode_frame(id, payload)?;
        self.writer.write_all(&frame)?;
        self.writer.flush()?;
        Ok(())
    }
}
