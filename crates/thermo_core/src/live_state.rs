//! Estado ao vivo por canal.
//!
//! Escrito apenas pela thread de aquisição; lido por qualquer observador via
//! snapshot. Cada linha `STATUS:` é aplicada dentro de uma única seção
//! crítica, então um leitor nunca vê uma linha aplicada pela metade.

use crate::types::{ChannelId, ChannelReading, ChannelStatus};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use tracing::info;

/// Cópia do estado de todos os canais, ordenada por canal.
pub type LiveSnapshot = BTreeMap<ChannelId, ChannelStatus>;

#[derive(Debug, Default)]
struct Inner {
    channels: LiveSnapshot,
    first_connection_seen: bool,
}

/// Store do último status/temperatura de cada canal.
#[derive(Debug, Default)]
pub struct LiveState {
    inner: RwLock<Inner>,
}

impl LiveState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aplica uma leitura (último a chegar vence).
    ///
    /// Retorna `true` somente na chamada que viu o primeiro canal conectado.
    pub fn apply(&self, reading: ChannelReading) -> bool {
        self.apply_all(std::slice::from_ref(&reading))
    }

    /// Aplica todas as leituras de uma linha atomicamente.
    ///
    /// Retorna `true` se esta linha disparou a primeira conexão.
    pub fn apply_all(&self, readings: &[ChannelReading]) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let mut edge = false;
        for reading in readings {
            inner.channels.insert(reading.channel_id, reading.status);
            if reading.status.is_connected() && !inner.first_connection_seen {
                inner.first_connection_seen = true;
                edge = true;
            }
        }

        if edge {
            info!("Primeiro termopar conectado, gravação liberada");
        }
        edge
    }

    /// Status atual de um canal, se ele já foi reportado.
    pub fn read(&self, channel_id: ChannelId) -> Option<ChannelStatus> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.channels.get(&channel_id).copied()
    }

    pub fn read_all(&self) -> LiveSnapshot {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.channels.clone()
    }

    /// Latch de uma única vez: algum canal já reportou conectado?
    pub fn first_connection_seen(&self) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.first_connection_seen
    }
}
