//! Sessão de gravação – máquina de estados `Idle` ⇄ `Active`.
//!
//! Transições e appends compartilham o mesmo mutex: uma amostra que chega
//! junto com um `stop()` fica inteiramente antes ou inteiramente depois dele.

use crate::types::{ChannelId, Sample};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{info, warn};

/// Capacidade padrão do buffer de amostras.
pub const DEFAULT_MAX_SAMPLES: usize = 1_000_000;

/// Erros de transição da sessão.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Gravação já está ativa")]
    AlreadyActive,

    #[error("Nenhuma gravação ativa")]
    NotActive,
}

/// Estado público da sessão.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Active,
}

#[derive(Debug)]
struct Inner {
    /// `Some` enquanto ativa
    started_at: Option<Instant>,
    samples: Vec<Sample>,
    dropped: u64,
}

/// Série de amostras entre `start()` e `stop()`.
#[derive(Debug)]
pub struct RecordingSession {
    inner: Mutex<Inner>,
    max_samples: usize,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLES)
    }
}

impl RecordingSession {
    pub fn new(max_samples: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                started_at: None,
                samples: Vec::new(),
                dropped: 0,
            }),
            max_samples,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        if self.lock().started_at.is_some() {
            SessionState::Active
        } else {
            SessionState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Inicia uma nova gravação, descartando as amostras anteriores.
    pub fn start(&self) -> Result<(), SessionError> {
        self.start_at(Instant::now())
    }

    pub(crate) fn start_at(&self, now: Instant) -> Result<(), SessionError> {
        let mut inner = self.lock();
        if inner.started_at.is_some() {
            return Err(SessionError::AlreadyActive);
        }
        inner.started_at = Some(now);
        inner.samples.clear();
        inner.dropped = 0;
        info!("Gravação iniciada");
        Ok(())
    }

    /// Encerra a gravação e devolve a série congelada.
    pub fn stop(&self) -> Result<Vec<Sample>, SessionError> {
        let mut inner = self.lock();
        let Some(started_at) = inner.started_at.take() else {
            return Err(SessionError::NotActive);
        };
        info!(
            "Gravação encerrada: {} amostras em {:.2}s",
            inner.samples.len(),
            started_at.elapsed().as_secs_f64()
        );
        if inner.dropped > 0 {
            warn!("{} amostras descartadas (buffer cheio)", inner.dropped);
        }
        Ok(inner.samples.clone())
    }

    /// Segundos desde o início; `None` se ociosa.
    pub fn elapsed(&self) -> Option<f64> {
        self.elapsed_at(Instant::now())
    }

    pub(crate) fn elapsed_at(&self, now: Instant) -> Option<f64> {
        self.lock()
            .started_at
            .map(|start| now.saturating_duration_since(start).as_secs_f64())
    }

    /// Grava uma temperatura se a sessão estiver ativa.
    ///
    /// Retorna `true` se a amostra entrou na série.
    pub fn record(&self, channel_id: ChannelId, temperature_c: f64) -> bool {
        self.record_batch(&[(channel_id, temperature_c)]) > 0
    }

    /// Grava várias temperaturas com o mesmo instante.
    ///
    /// O relógio é lido dentro da seção crítica, então a ordem de inserção é
    /// também a ordem temporal.
    pub fn record_batch(&self, readings: &[(ChannelId, f64)]) -> usize {
        let mut inner = self.lock();
        let now = Instant::now();
        Self::append_locked(&mut inner, self.max_samples, readings, now)
    }

    #[cfg(test)]
    pub(crate) fn record_batch_at(&self, readings: &[(ChannelId, f64)], now: Instant) -> usize {
        let mut inner = self.lock();
        Self::append_locked(&mut inner, self.max_samples, readings, now)
    }

    fn append_locked(inner: &mut Inner, max_samples: usize, readings: &[(ChannelId, f64)], now: Instant) -> usize {
        let Some(started_at) = inner.started_at else {
            return 0;
        };

        let mut elapsed_secs = now.saturating_duration_since(started_at).as_secs_f64();
        // Série nunca anda para trás
        if let Some(last) = inner.samples.last() {
            elapsed_secs = elapsed_secs.max(last.elapsed_secs);
        }

        let mut appended = 0;
        for &(channel_id, temperature_c) in readings {
            if inner.samples.len() >= max_samples {
                if inner.dropped == 0 {
                    warn!("Buffer de gravação cheio ({max_samples} amostras)");
                }
                inner.dropped += 1;
                continue;
            }
            inner.samples.push(Sample {
                elapsed_secs,
                channel_id,
                temperature_c,
            });
            appended += 1;
        }
        appended
    }

    /// Cópia das amostras da sessão atual (ou da última encerrada).
    pub fn samples(&self) -> Vec<Sample> {
        self.lock().samples.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Amostras descartadas por falta de capacidade nesta sessão.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_idle() {
        let session = RecordingSession::default();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.elapsed().is_none());
        assert!(session.is_empty());
    }

    #[test]
    fn idle_session_ignores_samples() {
        let session = RecordingSession::default();
        assert!(!session.record(1, 25.0));
        assert!(session.is_empty());
    }

    #[test]
    fn start_resets_samples() {
        let session = RecordingSession::default();
        session.start().unwrap();
        session.record(1, 25.0);
        session.record(2, 26.0);
        session.stop().unwrap();
        assert_eq!(session.len(), 2);

        session.start().unwrap();
        assert!(session.is_empty());
    }

    #[test]
    fn stop_keeps_samples() {
        let session = RecordingSession::default();
        session.start().unwrap();
        session.record(1, 25.0);
        let frozen = session.stop().unwrap();
        assert_eq!(frozen.len(), 1);
        assert_eq!(session.samples(), frozen);

        // Congelada: nada entra depois do stop
        assert!(!session.record(1, 30.0));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let session = RecordingSession::default();
        assert_eq!(session.stop(), Err(SessionError::NotActive));

        session.start().unwrap();
        session.record(1, 20.0);
        assert_eq!(session.start(), Err(SessionError::AlreadyActive));
        // Start rejeitado não apaga nada
        assert_eq!(session.len(), 1);
        assert!(session.is_active());
    }

    #[test]
    fn elapsed_is_relative_to_start() {
        let session = RecordingSession::default();
        let t0 = Instant::now();
        session.start_at(t0).unwrap();

        assert_eq!(session.elapsed_at(t0 + Duration::from_millis(2500)), Some(2.5));

        session.record_batch_at(&[(1, 90.0), (2, 91.0)], t0 + Duration::from_secs(5));
        let samples = session.samples();
        assert_eq!(samples[0].elapsed_secs, 5.0);
        assert_eq!(samples[1].elapsed_secs, 5.0);
    }

    #[test]
    fn elapsed_never_goes_backwards() {
        let session = RecordingSession::default();
        let t0 = Instant::now();
        session.start_at(t0).unwrap();

        session.record_batch_at(&[(1, 50.0)], t0 + Duration::from_secs(3));
        session.record_batch_at(&[(2, 49.0)], t0 + Duration::from_secs(1));
        session.record_batch_at(&[(1, 48.0)], t0 + Duration::from_secs(4));

        let times: Vec<f64> = session.samples().iter().map(|s| s.elapsed_secs).collect();
        assert_eq!(times, vec![3.0, 3.0, 4.0]);
    }

    #[test]
    fn interleaved_channels_are_time_ordered() {
        let session = RecordingSession::default();
        session.start().unwrap();
        for i in 0..200 {
            session.record((i % 3) + 1, i as f64);
        }
        let samples = session.samples();
        assert_eq!(samples.len(), 200);
        assert!(samples.windows(2).all(|w| w[0].elapsed_secs <= w[1].elapsed_secs));
        assert!(samples.iter().all(|s| s.elapsed_secs >= 0.0));
    }

    #[test]
    fn capacity_bound_drops_excess() {
        let session = RecordingSession::new(3);
        session.start().unwrap();
        assert_eq!(session.record_batch(&[(1, 1.0), (2, 2.0)]), 2);
        assert_eq!(session.record_batch(&[(1, 3.0), (2, 4.0)]), 1);
        assert!(!session.record(1, 5.0));
        assert_eq!(session.len(), 3);
        assert_eq!(session.dropped(), 2);

        session.stop().unwrap();
        session.start().unwrap();
        assert_eq!(session.dropped(), 0);
    }

    #[test]
    fn stop_and_append_race_is_ordered() {
        use std::sync::Arc;

        let session = Arc::new(RecordingSession::default());
        session.start().unwrap();

        let writer = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                let mut accepted = 0usize;
                for i in 0..10_000 {
                    if session.record(1, i as f64) {
                        accepted += 1;
                    }
                }
                accepted
            })
        };

        std::thread::sleep(Duration::from_millis(1));
        let frozen = session.stop().unwrap();
        let accepted = writer.join().unwrap();

        // Tudo que foi aceito está na série congelada, nada além disso
        assert_eq!(frozen.len(), accepted);
        assert_eq!(session.len(), accepted);
    }
}
