//! Definição de tipos/structs de aquisição.
//!
//! Leituras por canal, amostras gravadas e resultado da taxa de resfriamento.

use serde::{Deserialize, Serialize};

/// Identificador de canal (termopar), 1-based.
pub type ChannelId = u32;

// ──────────────────────────────────────────────
// Leituras
// ──────────────────────────────────────────────

/// Estado de um canal reportado pela placa.
///
/// Temperatura ausente significa "não conectado" por construção.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum ChannelStatus {
    #[default]
    NotConnected,
    Connected {
        /// Temperatura em °C
        temperature_c: f64,
    },
}

impl ChannelStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ChannelStatus::Connected { .. })
    }

    /// Temperatura em °C, se o termopar estiver conectado.
    pub fn temperature_c(&self) -> Option<f64> {
        match *self {
            ChannelStatus::Connected { temperature_c } => Some(temperature_c),
            ChannelStatus::NotConnected => None,
        }
    }
}

/// Uma entrada decodificada de uma linha `STATUS:`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChannelReading {
    pub channel_id: ChannelId,
    pub status: ChannelStatus,
}

impl ChannelReading {
    pub fn connected(channel_id: ChannelId, temperature_c: f64) -> Self {
        Self {
            channel_id,
            status: ChannelStatus::Connected { temperature_c },
        }
    }

    pub fn not_connected(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            status: ChannelStatus::NotConnected,
        }
    }
}

// ──────────────────────────────────────────────
// Gravação
// ──────────────────────────────────────────────

/// Amostra gravada durante uma sessão.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// Segundos desde o início da sessão (≥ 0)
    pub elapsed_secs: f64,
    pub channel_id: ChannelId,
    /// Temperatura em °C
    pub temperature_c: f64,
}

// ──────────────────────────────────────────────
// Análise
// ──────────────────────────────────────────────

/// Taxa de resfriamento de um canal entre duas temperaturas alvo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CoolingRate {
    /// °C por minuto, arredondado a 2 casas (negativo = resfriando)
    pub rate_per_minute: f64,
    /// Temperatura da amostra mais próxima do alvo inicial (°C)
    pub start_temp: f64,
    /// Temperatura da amostra mais próxima do alvo final (°C)
    pub end_temp: f64,
    /// Instante da amostra inicial (s)
    pub start_time: f64,
    /// Instante da amostra final (s)
    pub end_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_not_connected() {
        let status = ChannelStatus::default();
        assert!(!status.is_connected());
        assert_eq!(status.temperature_c(), None);
    }

    #[test]
    fn connected_reading_carries_temperature() {
        let reading = ChannelReading::connected(2, 21.75);
        assert_eq!(reading.channel_id, 2);
        assert!(reading.status.is_connected());
        assert_eq!(reading.status.temperature_c(), Some(21.75));
    }

    #[test]
    fn not_connected_reading_has_no_temperature() {
        let reading = ChannelReading::not_connected(1);
        assert!(!reading.status.is_connected());
        assert!(reading.status.temperature_c().is_none());
    }
}
