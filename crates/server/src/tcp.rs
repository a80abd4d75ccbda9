use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use skirmish::Connection;

/// Newline-delimited JSON framing over a TCP stream.
///
/// A reader thread owns the receive half and appends complete lines to a
/// shared queue; the tick driver drains that queue via `consume` once per
/// tick, keeping the simulation itself single-threaded.
pub struct TcpConnection {
    stream: TcpStream,
    inbound: Arc<Mutex<Vec<Vec<u8>>>>,
    open: bool,
}

impl TcpConnection {
    pub fn new(stream: TcpStream) -> anyhow::Result<Self> {
        stream.set_nodelay(true)?;
        let inbound: Arc<Mutex<Vec<Vec<u8>>>> = Arc::default();
        let reader_stream = stream.try_clone()?;
        let reader_queue = Arc::clone(&inbound);
        let peer = stream.peer_addr()?;

        thread::spawn(move || {
            let mut reader = BufReader::new(reader_stream);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        let trimmed = line.trim_end();
                        if !trimmed.is_empty() {
                            if let Ok(mut queue) = reader_queue.lock() {
                                queue.push(trimmed.as_bytes().to_vec());
                            }
                        }
                    }
                    Err(error) => {
                        log::debug!("{}: read ended: {}", peer, error);
                        break;
                    }
                }
            }
            log::info!("{}: connection closed", peer);
        });

        Ok(Self {
            stream,
            inbound,
            open: true,
        })
    }
}

impl Connection for TcpConnection {
    fn send(&mut self, payload: &[u8]) {
        if !self.open {
            return;
        }
        // Fire and forget; a broken pipe just ends the session.
        if self
            .stream
            .write_all(payload)
            .and_then(|_| self.stream.write_all(b"\n"))
            .is_err()
        {
            log::warn!("send failed, closing connection");
            self.close();
        }
    }

    fn consume(&mut self) -> Vec<Vec<u8>> {
        match self.inbound.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        }
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            let _ = self.stream.shutdown(Shutdown::Both);
        }
    }
}
