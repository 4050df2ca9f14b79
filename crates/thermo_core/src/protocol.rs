//! Protocolo de linha da placa de termopares.
//!
//! Entrada (placa → host), uma linha por ciclo de amostragem:
//!
//! ```text
//! STATUS:T1:23.50,T2:Not Connected,
//! ```
//!
//! Saída (host → placa), comandos terminados em `;`:
//!
//! ```text
//! RATE:<segundos>;   0 = o mais rápido possível
//! TYPE:<código>;     K, J, T, E, N, S, R ou B
//! ```
//!
//! O firmware aceita `TYPE:` com ou sem `;`; padronizamos o terminador
//! nos dois comandos.

use crate::types::{ChannelId, ChannelReading};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Marcador que identifica uma linha de status.
pub const STATUS_MARKER: &str = "STATUS:";

/// Valor literal enviado para um canal sem termopar.
pub const NOT_CONNECTED: &str = "Not Connected";

/// Terminador dos comandos de saída.
pub const COMMAND_TERMINATOR: char = ';';

/// Tamanho máximo de uma linha recebida, incluindo o `\n`.
/// Uma linha com 8 canais ocupa ~200 bytes.
pub const MAX_LINE_LEN: usize = 1024;

/// Erros do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Linha não é UTF-8 válido")]
    InvalidUtf8,

    #[error("Entrada malformada: {0:?}")]
    MalformedEntry(String),

    #[error("Tag de canal inválida: {0:?}")]
    InvalidChannelTag(String),

    #[error("Temperatura inválida no canal {channel}: {value:?}")]
    InvalidTemperature { channel: ChannelId, value: String },

    #[error("Tipo de termopar desconhecido: {0:?}")]
    UnknownSensorType(String),

    #[error("Erro ao escrever na porta: {0}")]
    Transport(#[from] std::io::Error),
}

// ──────────────────────────────────────────────
// Decode
// ──────────────────────────────────────────────

/// Decodifica uma linha recebida da placa.
///
/// Retorna `Ok(None)` para linhas sem o marcador `STATUS:` (diagnóstico,
/// lixo de boot, linhas parciais). Uma entrada malformada invalida a linha
/// inteira; nenhuma leitura parcial é devolvida.
pub fn decode_status_line(line: &str) -> Result<Option<Vec<ChannelReading>>, ProtocolError> {
    let line = line.trim();
    let Some(pos) = line.find(STATUS_MARKER) else {
        return Ok(None);
    };

    let body = &line[pos + STATUS_MARKER.len()..];
    let body = body.strip_suffix(COMMAND_TERMINATOR).unwrap_or(body);

    let mut tokens: Vec<&str> = body.split(',').map(str::trim).collect();
    // Separador final gera um token vazio
    if tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }

    tokens.into_iter().map(decode_entry).collect::<Result<Vec<_>, _>>().map(Some)
}

fn decode_entry(entry: &str) -> Result<ChannelReading, ProtocolError> {
    let Some((tag, value)) = entry.split_once(':') else {
        return Err(ProtocolError::MalformedEntry(entry.to_string()));
    };
    if value.contains(':') {
        return Err(ProtocolError::MalformedEntry(entry.to_string()));
    }

    let channel = parse_channel_tag(tag.trim())?;
    let value = value.trim();

    if value == NOT_CONNECTED {
        return Ok(ChannelReading::not_connected(channel));
    }

    match value.parse::<f64>() {
        Ok(temp) if temp.is_finite() => Ok(ChannelReading::connected(channel, temp)),
        _ => Err(ProtocolError::InvalidTemperature {
            channel,
            value: value.to_string(),
        }),
    }
}

/// `T1` → 1. Prefixo alfabético seguido de sufixo decimal ≥ 1.
fn parse_channel_tag(tag: &str) -> Result<ChannelId, ProtocolError> {
    let invalid = || ProtocolError::InvalidChannelTag(tag.to_string());

    let digits_at = tag.find(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
    let (prefix, suffix) = tag.split_at(digits_at);
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }
    if !suffix.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    match suffix.parse::<ChannelId>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(id) => Ok(id),
    }
}

// ──────────────────────────────────────────────
// Encode
// ──────────────────────────────────────────────

/// Tipos de termopar suportados pelo conversor da placa.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    K,
    J,
    #[default]
    T,
    E,
    N,
    S,
    R,
    B,
}

impl SensorType {
    pub const ALL: [SensorType; 8] = [
        SensorType::K,
        SensorType::J,
        SensorType::T,
        SensorType::E,
        SensorType::N,
        SensorType::S,
        SensorType::R,
        SensorType::B,
    ];

    /// Código de uma letra usado no fio.
    pub fn code(self) -> char {
        match self {
            SensorType::K => 'K',
            SensorType::J => 'J',
            SensorType::T => 'T',
            SensorType::E => 'E',
            SensorType::N => 'N',
            SensorType::S => 'S',
            SensorType::R => 'R',
            SensorType::B => 'B',
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for SensorType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        SensorType::ALL
            .into_iter()
            .find(|t| code.len() == 1 && code.eq_ignore_ascii_case(&t.code().to_string()))
            .ok_or_else(|| ProtocolError::UnknownSensorType(s.to_string()))
    }
}

/// Comando de configuração enviado à placa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Intervalo entre amostras em segundos (0 = máximo, ≈ 3–4 amostras/s)
    Rate(u32),
    SensorType(SensorType),
}

impl Command {
    pub fn encode(&self) -> String {
        match *self {
            Command::Rate(secs) => encode_rate_command(secs),
            Command::SensorType(t) => encode_type_command(t),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// `RATE:<n>;`
pub fn encode_rate_command(interval_secs: u32) -> String {
    format!("RATE:{interval_secs}{COMMAND_TERMINATOR}")
}

/// `TYPE:<código>;`
pub fn encode_type_command(sensor: SensorType) -> String {
    format!("TYPE:{}{COMMAND_TERMINATOR}", sensor.code())
}

/// Escreve um comando no transporte.
///
/// Falha de escrita é recuperável: não afeta a thread de aquisição.
pub fn send_command<W: Write + ?Sized>(writer: &mut W, command: &Command) -> Result<(), ProtocolError> {
    let frame = command.encode();
    writer.write_all(frame.as_bytes())?;
    writer.flush()?;
    tracing::debug!("→ {frame}");
    Ok(())
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelStatus;

    #[test]
    fn decodes_two_channel_status_line() {
        let readings = decode_status_line("STATUS:T1:23.50,T2:Not Connected,\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(
            readings,
            vec![ChannelReading::connected(1, 23.5), ChannelReading::not_connected(2)]
        );
    }

    #[test]
    fn trailing_separator_yields_no_empty_reading() {
        let readings = decode_status_line("STATUS:T1:20.0,").unwrap().unwrap();
        assert_eq!(readings.len(), 1);

        let readings = decode_status_line("STATUS:T1:20.0,T2:21.0,;").unwrap().unwrap();
        assert_eq!(readings.len(), 2);
    }

    #[test]
    fn accepts_line_without_trailing_separator() {
        let readings = decode_status_line("STATUS:T1:-5.25,T2:100").unwrap().unwrap();
        assert_eq!(readings[0], ChannelReading::connected(1, -5.25));
        assert_eq!(readings[1], ChannelReading::connected(2, 100.0));
    }

    #[test]
    fn lines_without_marker_are_ignored() {
        assert!(decode_status_line("MAX31856 init ok").unwrap().is_none());
        assert!(decode_status_line("").unwrap().is_none());
        assert!(decode_status_line("T1:20.0,").unwrap().is_none());
    }

    #[test]
    fn text_before_marker_is_skipped() {
        let readings = decode_status_line("\u{0}garbageSTATUS:T3:30.0,").unwrap().unwrap();
        assert_eq!(readings, vec![ChannelReading::connected(3, 30.0)]);
    }

    #[test]
    fn marker_with_empty_body_yields_no_readings() {
        assert_eq!(decode_status_line("STATUS:").unwrap().unwrap(), vec![]);
    }

    #[test]
    fn multi_digit_channel_suffix() {
        let readings = decode_status_line("STATUS:T12:1.0,").unwrap().unwrap();
        assert_eq!(readings[0].channel_id, 12);
    }

    #[test]
    fn connected_flag_matches_literal_exactly() {
        let readings = decode_status_line("STATUS:T1:Not Connected,").unwrap().unwrap();
        assert_eq!(readings[0].status, ChannelStatus::NotConnected);

        assert!(matches!(
            decode_status_line("STATUS:T1:not connected,"),
            Err(ProtocolError::InvalidTemperature { channel: 1, .. })
        ));
    }

    #[test]
    fn rejects_unparsable_temperature() {
        assert!(matches!(
            decode_status_line("STATUS:T1:20.0,T2:abc,"),
            Err(ProtocolError::InvalidTemperature { channel: 2, .. })
        ));
    }

    #[test]
    fn rejects_non_finite_temperature() {
        assert!(decode_status_line("STATUS:T1:NaN,").is_err());
        assert!(decode_status_line("STATUS:T1:inf,").is_err());
    }

    #[test]
    fn rejects_bad_channel_tags() {
        for line in ["STATUS:1:20.0,", "STATUS:T:20.0,", "STATUS:T0:20.0,", "STATUS:T-1:20.0,", "STATUS:T1a:20.0,"] {
            assert!(
                matches!(decode_status_line(line), Err(ProtocolError::InvalidChannelTag(_))),
                "deveria rejeitar {line:?}"
            );
        }
    }

    #[test]
    fn rejects_wrong_token_shape() {
        assert!(matches!(
            decode_status_line("STATUS:T1-20.0,"),
            Err(ProtocolError::MalformedEntry(_))
        ));
        assert!(matches!(
            decode_status_line("STATUS:T1:20:0,"),
            Err(ProtocolError::MalformedEntry(_))
        ));
        assert!(matches!(
            decode_status_line("STATUS:T1:20.0,,T2:21.0,"),
            Err(ProtocolError::MalformedEntry(_))
        ));
    }

    #[test]
    fn rate_command_literals() {
        assert_eq!(encode_rate_command(0), "RATE:0;");
        assert_eq!(encode_rate_command(3), "RATE:3;");
        for secs in 1..=5 {
            assert_eq!(Command::Rate(secs).encode(), format!("RATE:{secs};"));
        }
    }

    #[test]
    fn type_command_literals() {
        let expected = ["TYPE:K;", "TYPE:J;", "TYPE:T;", "TYPE:E;", "TYPE:N;", "TYPE:S;", "TYPE:R;", "TYPE:B;"];
        for (sensor, literal) in SensorType::ALL.into_iter().zip(expected) {
            assert_eq!(encode_type_command(sensor), literal);
            assert_eq!(Command::SensorType(sensor).to_string(), literal);
        }
    }

    #[test]
    fn sensor_type_from_str() {
        assert_eq!("k".parse::<SensorType>().unwrap(), SensorType::K);
        assert_eq!(" B ".parse::<SensorType>().unwrap(), SensorType::B);
        assert!("X".parse::<SensorType>().is_err());
        assert!("KJ".parse::<SensorType>().is_err());
        assert_eq!(SensorType::default(), SensorType::T);
    }

    #[test]
    fn send_command_writes_frame() {
        let mut wire: Vec<u8> = Vec::new();
        send_command(&mut wire, &Command::SensorType(SensorType::T)).unwrap();
        send_command(&mut wire, &Command::Rate(1)).unwrap();
        assert_eq!(wire, b"TYPE:T;RATE:1;");
    }

    #[test]
    fn send_command_reports_write_failure() {
        struct BrokenPort;
        impl Write for BrokenPort {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        assert!(matches!(
            send_command(&mut BrokenPort, &Command::Rate(2)),
            Err(ProtocolError::Transport(_))
        ));
    }
}
