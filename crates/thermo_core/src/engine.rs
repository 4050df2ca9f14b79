//! Motor de aquisição – fachada usada pelo front-end e pela thread de leitura.
//!
//! Possui o [`LiveState`] e a [`RecordingSession`] e é compartilhado via
//! `Arc` entre a thread de aquisição (único escritor) e o front-end.

use crate::analysis::{self, AnalysisError, CoolingReport};
use crate::config::RecordingConfig;
use crate::live_state::{LiveSnapshot, LiveState};
use crate::protocol::{self, ProtocolError};
use crate::session::{RecordingSession, SessionError, SessionState};
use crate::types::{ChannelReading, Sample};
use tracing::trace;

/// Erros das operações do motor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Nenhum termopar conectado ainda; gravação bloqueada")]
    NoConnectionYet,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// O que aconteceu com uma linha recebida.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Linha sem `STATUS:`
    Ignored,
    Applied {
        readings: Vec<ChannelReading>,
        /// Amostras que entraram na sessão ativa
        recorded: usize,
        /// Esta linha trouxe o primeiro canal conectado
        first_connection: bool,
    },
}

#[derive(Debug)]
pub struct ThermoEngine {
    live: LiveState,
    session: RecordingSession,
    require_connection: bool,
}

impl Default for ThermoEngine {
    fn default() -> Self {
        Self::new(&RecordingConfig::default())
    }
}

impl ThermoEngine {
    pub fn new(config: &RecordingConfig) -> Self {
        Self {
            live: LiveState::new(),
            session: RecordingSession::new(config.max_samples),
            require_connection: config.require_connection,
        }
    }

    /// Decodifica uma linha e aplica no estado ao vivo e na sessão ativa.
    pub fn apply_line(&self, raw_line: &str) -> Result<LineOutcome, ProtocolError> {
        let Some(readings) = protocol::decode_status_line(raw_line)? else {
            trace!("Linha ignorada: {raw_line:?}");
            return Ok(LineOutcome::Ignored);
        };

        let first_connection = self.live.apply_all(&readings);

        let connected: Vec<_> = readings
            .iter()
            .filter_map(|r| r.status.temperature_c().map(|t| (r.channel_id, t)))
            .collect();
        let recorded = if connected.is_empty() {
            0
        } else {
            self.session.record_batch(&connected)
        };

        Ok(LineOutcome::Applied {
            readings,
            recorded,
            first_connection,
        })
    }

    pub fn start_recording(&self) -> Result<(), EngineError> {
        if self.require_connection && !self.live.first_connection_seen() {
            return Err(EngineError::NoConnectionYet);
        }
        self.session.start()?;
        Ok(())
    }

    /// Encerra a gravação e devolve as amostras congeladas.
    pub fn stop_recording(&self) -> Result<Vec<Sample>, EngineError> {
        Ok(self.session.stop()?)
    }

    pub fn current_live_state(&self) -> LiveSnapshot {
        self.live.read_all()
    }

    pub fn current_session_elapsed(&self) -> Option<f64> {
        self.session.elapsed()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Amostras da sessão atual ou da última encerrada.
    pub fn session_samples(&self) -> Vec<Sample> {
        self.session.samples()
    }

    pub fn first_connection_seen(&self) -> bool {
        self.live.first_connection_seen()
    }

    /// Taxa de resfriamento sobre a sessão (ativa ou encerrada).
    pub fn analyze_cooling(&self, target_start: f64, target_end: f64) -> Result<CoolingReport, EngineError> {
        let samples = self.session.samples();
        Ok(analysis::analyze_cooling(&samples, target_start, target_end)?)
    }
}
