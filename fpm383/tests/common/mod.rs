//! Scripted in-memory module for driver tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

use fpm383::{Packet, PacketKind};
use fpm383_transport::{Error, Result, Transport};

pub const BROADCAST: u32 = 0xFFFF_FFFF;

#[derive(Default)]
struct Script {
    connected: bool,
    incoming: VecDeque<Vec<u8>>,
    on_send: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
}

/// Transport replaying queued byte bursts
///
/// Each queued burst is handed out in reads of at most `max_len` bytes. An
/// empty queue behaves like a module that stays silent until the deadline.
/// Bursts queued with [`respond`](Self::respond) only become readable once
/// the driver writes its next request.
/// Clones share the same script, so a test keeps one handle after moving
/// the other into the driver.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes the module will send
    pub fn push(&self, bytes: impl Into<Vec<u8>>) {
        self.script.lock().unwrap().incoming.push_back(bytes.into());
    }

    /// Queue an answer released by the next write
    pub fn respond(&self, bytes: impl Into<Vec<u8>>) {
        self.script.lock().unwrap().on_send.push_back(bytes.into());
    }

    /// Every write the driver made, in order
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.script.lock().unwrap().written.clone()
    }

    /// Bytes still queued
    pub fn pending(&self) -> usize {
        self.script
            .lock()
            .unwrap()
            .incoming
            .iter()
            .map(Vec::len)
            .sum()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&mut self) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        if script.connected {
            return Err(Error::AlreadyConnected);
        }
        script.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.script.lock().unwrap().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.script.lock().unwrap().connected
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        if !script.connected {
            return Err(Error::NotConnected);
        }
        script.written.push(data.to_vec());
        if let Some(answer) = script.on_send.pop_front() {
            script.incoming.push_back(answer);
        }
        Ok(())
    }

    async fn receive(&mut self, max_len: usize, _timeout: Duration) -> Result<BytesMut> {
        let mut script = self.script.lock().unwrap();
        if !script.connected {
            return Err(Error::NotConnected);
        }

        let Some(burst) = script.incoming.front_mut() else {
            return Err(Error::ReadTimeout);
        };

        let n = max_len.min(burst.len());
        let chunk: Vec<u8> = burst.drain(..n).collect();
        if burst.is_empty() {
            script.incoming.pop_front();
        }

        Ok(BytesMut::from(&chunk[..]))
    }

    fn endpoint(&self) -> String {
        "scripted".to_string()
    }
}

/// Encode a response packet from the broadcast address
pub fn response(code: u8, params: &[u8]) -> Vec<u8> {
    response_from(BROADCAST, code, params)
}

/// Encode a response packet from a specific address
pub fn response_from(address: u32, code: u8, params: &[u8]) -> Vec<u8> {
    let mut payload = vec![code];
    payload.extend_from_slice(params);
    encode(Packet::new(address, PacketKind::Response, payload))
}

/// Encode a data packet
pub fn data(kind: PacketKind, bytes: &[u8]) -> Vec<u8> {
    encode(Packet::new(BROADCAST, kind, bytes.to_vec()))
}

fn encode(packet: Packet) -> Vec<u8> {
    packet.encode(Packet::MAX_PAYLOAD_SIZE).unwrap().to_vec()
}
