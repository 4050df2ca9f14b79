//! Configuração unificada via TOML.
//!
//! Um único `config.toml` ao lado do executável com porta serial,
//! configuração inicial da placa e limites de gravação.

use crate::protocol::SensorType;
use crate::session::DEFAULT_MAX_SAMPLES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Maior intervalo de amostragem oferecido pela placa (segundos).
pub const MAX_SAMPLE_INTERVAL_SECS: u32 = 5;

/// Erros ao salvar a configuração.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro de serialização TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Erro de I/O em {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Porta serial da placa.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Nome da porta (ex: "COM3", "/dev/ttyACM0")
    pub port: String,
    pub baud_rate: u32,
    /// Timeout de leitura (ms); expirar não é erro
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: if cfg!(windows) {
                "COM3".into()
            } else {
                "/dev/ttyACM0".into()
            },
            baud_rate: 9600,
            read_timeout_ms: 1000,
        }
    }
}

/// Configuração enviada à placa ao conectar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Segundos entre amostras (0 = máximo)
    pub sample_interval_secs: u32,
    pub sensor_type: SensorType,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 1,
            sensor_type: SensorType::T,
        }
    }
}

/// Limites da sessão de gravação.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub max_samples: usize,
    /// Só libera a gravação depois do primeiro termopar conectado
    pub require_connection: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_samples: DEFAULT_MAX_SAMPLES,
            require_connection: true,
        }
    }
}

/// Parâmetros da thread de aquisição.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Pausa quando o transporte não tem dados (ms)
    pub idle_sleep_ms: u64,
    /// Capacidade do channel de eventos para o front-end
    pub event_buffer: usize,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            idle_sleep_ms: 10,
            event_buffer: 64,
        }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub device: DeviceConfig,
    pub recording: RecordingConfig,
    pub acquisition: AcquisitionConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.serial.port.trim().is_empty() {
            errors.push("Porta serial não configurada".into());
        }
        if self.serial.baud_rate == 0 {
            errors.push("Baud rate não pode ser 0".into());
        }
        if self.serial.read_timeout_ms == 0 {
            errors.push("Timeout de leitura não pode ser 0".into());
        }
        if self.device.sample_interval_secs > MAX_SAMPLE_INTERVAL_SECS {
            errors.push(format!(
                "Intervalo de amostragem inválido: {} (0–{MAX_SAMPLE_INTERVAL_SECS})",
                self.device.sample_interval_secs
            ));
        }
        if self.recording.max_samples == 0 {
            errors.push("Capacidade de gravação não pode ser 0".into());
        }
        if self.acquisition.event_buffer == 0 {
            errors.push("Buffer de eventos não pode ser 0".into());
        }

        errors
    }
}
