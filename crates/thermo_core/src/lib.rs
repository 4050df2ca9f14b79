//! # Thermo Core
//!
//! Motor de aquisição e gravação da placa de termopares: protocolo de linha
//! serial, estado ao vivo por canal, sessão de gravação e análise da taxa de
//! resfriamento.
//!
//! ## Módulos
//! - [`types`] – Leituras, amostras e resultado de resfriamento
//! - [`protocol`] – Decode de `STATUS:` e encode de `RATE:`/`TYPE:`
//! - [`live_state`] – Último status de cada canal + latch de primeira conexão
//! - [`session`] – Máquina de estados da gravação
//! - [`analysis`] – Taxa de resfriamento entre duas temperaturas alvo
//! - [`engine`] – Fachada compartilhada entre a thread de leitura e o front-end
//! - [`acquisition`] – Thread que lê o transporte serial
//! - [`config`] – Configuração unificada via TOML

pub mod types;
pub mod protocol;
pub mod live_state;
pub mod session;
pub mod analysis;
pub mod engine;
pub mod acquisition;
pub mod config;

// Re-exports convenientes
pub use types::{ChannelId, ChannelReading, ChannelStatus, CoolingRate, Sample};
pub use protocol::{Command, SensorType, encode_rate_command, encode_type_command, send_command};
pub use engine::{EngineError, LineOutcome, ThermoEngine};
pub use acquisition::{AcquisitionEvent, AcquisitionHandle, LoopExit, spawn_acquisition_thread};
pub use config::AppConfig;
