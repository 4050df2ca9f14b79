//! Thread de aquisição que lê linhas do transporte serial e alimenta o motor.
//!
//! Timeout de leitura e `WouldBlock` significam apenas "sem dados"; linhas
//! inválidas ou maiores que [`MAX_LINE_LEN`] são descartadas e contadas.
//! Fim do stream ou erro de I/O encerram a thread com um [`LoopExit`]
//! publicado no channel de eventos.

use crate::config::AcquisitionConfig;
use crate::engine::{LineOutcome, ThermoEngine};
use crate::protocol::MAX_LINE_LEN;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Motivo do fim da thread de aquisição.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoopExit {
    #[error("Transporte fechado")]
    TransportClosed,

    #[error("Erro de leitura ({kind:?}): {message}")]
    TransportError { kind: ErrorKind, message: String },

    #[error("Thread de aquisição abortou")]
    Panicked,
}

/// Evento enviado da thread de aquisição para o front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionEvent {
    /// Primeiro termopar conectado: gravação liberada
    FirstConnection,
    Terminated(LoopExit),
}

/// Contadores da thread de aquisição.
#[derive(Debug, Default)]
pub struct AcquisitionStats {
    lines_read: AtomicU64,
    lines_applied: AtomicU64,
    lines_ignored: AtomicU64,
    lines_dropped: AtomicU64,
    samples_recorded: AtomicU64,
}

/// Cópia dos contadores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub lines_read: u64,
    pub lines_applied: u64,
    pub lines_ignored: u64,
    pub lines_dropped: u64,
    pub samples_recorded: u64,
}

impl AcquisitionStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            lines_applied: self.lines_applied.load(Ordering::Relaxed),
            lines_ignored: self.lines_ignored.load(Ordering::Relaxed),
            lines_dropped: self.lines_dropped.load(Ordering::Relaxed),
            samples_recorded: self.samples_recorded.load(Ordering::Relaxed),
        }
    }
}

/// Handle da thread de aquisição em execução.
pub struct AcquisitionHandle {
    thread: JoinHandle<LoopExit>,
    events: Receiver<AcquisitionEvent>,
    stats: Arc<AcquisitionStats>,
}

impl AcquisitionHandle {
    pub fn events(&self) -> &Receiver<AcquisitionEvent> {
        &self.events
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Aguarda o fim da thread.
    pub fn join(self) -> LoopExit {
        self.thread.join().unwrap_or(LoopExit::Panicked)
    }
}

/// Inicia a thread de aquisição sobre um transporte já aberto.
pub fn spawn_acquisition_thread<R>(
    transport: R,
    engine: Arc<ThermoEngine>,
    config: &AcquisitionConfig,
) -> io::Result<AcquisitionHandle>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = bounded::<AcquisitionEvent>(config.event_buffer.max(1));
    let stats = Arc::new(AcquisitionStats::default());
    let idle = Duration::from_millis(config.idle_sleep_ms);

    let thread = {
        let stats = Arc::clone(&stats);
        std::thread::Builder::new()
            .name("serial-reader".into())
            .spawn(move || {
                let mut reader = BufReader::new(transport);
                let exit = acquisition_loop(&mut reader, &engine, &tx, &stats, idle);
                match &exit {
                    LoopExit::TransportClosed => info!("Aquisição encerrada: {exit}"),
                    _ => error!("Aquisição encerrada: {exit}"),
                }
                publish(&tx, AcquisitionEvent::Terminated(exit.clone()));
                exit
            })?
    };

    Ok(AcquisitionHandle {
        thread,
        events: rx,
        stats,
    })
}

fn acquisition_loop<R: BufRead>(
    reader: &mut R,
    engine: &ThermoEngine,
    tx: &Sender<AcquisitionEvent>,
    stats: &AcquisitionStats,
    idle: Duration,
) -> LoopExit {
    info!("Thread de aquisição iniciada");
    // Linha parcial sobrevive a timeouts
    let mut line = Vec::with_capacity(128);
    // Descartando o resto de uma linha longa demais até o próximo `\n`
    let mut discarding = false;

    loop {
        let chunk = match reader.fill_buf() {
            Ok(chunk) => chunk,
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                // Timeout normal, continua
                continue;
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                std::thread::sleep(idle);
                continue;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return LoopExit::TransportError {
                    kind: e.kind(),
                    message: e.to_string(),
                };
            }
        };

        if chunk.is_empty() {
            if !line.is_empty() {
                process_line(&line, engine, tx, stats);
            }
            return LoopExit::TransportClosed;
        }

        let (consumed, complete) = match chunk.iter().position(|&b| b == b'\n') {
            Some(i) => (i + 1, true),
            None => (chunk.len(), false),
        };
        if !discarding {
            line.extend_from_slice(&chunk[..consumed]);
        }
        reader.consume(consumed);

        if line.len() > MAX_LINE_LEN {
            stats.lines_read.fetch_add(1, Ordering::Relaxed);
            stats.lines_dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Linha descartada: mais de {MAX_LINE_LEN} bytes sem '\\n'");
            line.clear();
            discarding = !complete;
            continue;
        }

        if complete {
            if discarding {
                discarding = false;
            } else {
                process_line(&line, engine, tx, stats);
            }
            line.clear();
        }
    }
}

fn process_line(raw: &[u8], engine: &ThermoEngine, tx: &Sender<AcquisitionEvent>, stats: &AcquisitionStats) {
    stats.lines_read.fetch_add(1, Ordering::Relaxed);

    let Ok(text) = std::str::from_utf8(raw) else {
        stats.lines_dropped.fetch_add(1, Ordering::Relaxed);
        debug!("Linha descartada: não é UTF-8 ({} bytes)", raw.len());
        return;
    };

    match engine.apply_line(text) {
        Ok(LineOutcome::Ignored) => {
            stats.lines_ignored.fetch_add(1, Ordering::Relaxed);
        }
        Ok(LineOutcome::Applied {
            recorded,
            first_connection,
            ..
        }) => {
            stats.lines_applied.fetch_add(1, Ordering::Relaxed);
            stats.samples_recorded.fetch_add(recorded as u64, Ordering::Relaxed);
            if first_connection {
                publish(tx, AcquisitionEvent::FirstConnection);
            }
        }
        Err(e) => {
            stats.lines_dropped.fetch_add(1, Ordering::Relaxed);
            debug!("Linha descartada {:?}: {e}", text.trim());
        }
    }
}

/// Non-blocking: se o front-end está lento, o evento é descartado.
fn publish(tx: &Sender<AcquisitionEvent>, event: AcquisitionEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => warn!("Channel de eventos cheio, descartando {event:?}"),
        Err(TrySendError::Disconnected(_)) => debug!("Front-end desconectado do channel de eventos"),
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
