//! Console de comandos do recorder.
//!
//! Uma linha por comando:
//!
//! ```text
//! status              leituras ao vivo e estado da gravação
//! start | stop        inicia/encerra a gravação
//! elapsed             tempo decorrido da gravação
//! rate <1–5|max>      intervalo de amostragem da placa
//! type <K|J|T|E|N|S|R|B>
//! cool <início> <fim> [tc]
//!                     taxa de resfriamento entre duas temperaturas (°C),
//!                     em todos os canais ou só no termopar `tc`
//! help | quit
//! ```

use thermo_core::analysis::{CoolingReport, parse_target};
use thermo_core::config::MAX_SAMPLE_INTERVAL_SECS;
use thermo_core::live_state::LiveSnapshot;
use thermo_core::{ChannelId, ChannelStatus, SensorType};

pub const HELP: &str = "\
Comandos:
  status              leituras ao vivo e estado da gravação
  start | stop        inicia/encerra a gravação
  elapsed             tempo decorrido da gravação
  rate <1-5|max>      intervalo de amostragem da placa
  type <K|J|T|E|N|S|R|B>
  cool <início> <fim> [tc]
                      taxa de resfriamento entre duas temperaturas (°C);
                      com `tc`, só aquele termopar (ex.: cool 800 500 2)
  help | quit";

/// Comando digitado pelo usuário.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    Help,
    Status,
    Start,
    Stop,
    Elapsed,
    Rate(u32),
    SensorType(SensorType),
    /// `channel: None` analisa todos os canais
    Cool {
        start: f64,
        end: f64,
        channel: Option<ChannelId>,
    },
    Quit,
}

/// Interpreta uma linha do console. `Ok(None)` para linha vazia.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("help" | "?", []) => ConsoleCommand::Help,
        ("status", []) => ConsoleCommand::Status,
        ("start", []) => ConsoleCommand::Start,
        ("stop", []) => ConsoleCommand::Stop,
        ("elapsed", []) => ConsoleCommand::Elapsed,
        ("quit" | "exit" | "q", []) => ConsoleCommand::Quit,
        ("rate", [arg]) => ConsoleCommand::Rate(parse_rate(arg)?),
        ("type", [arg]) => ConsoleCommand::SensorType(arg.parse::<SensorType>().map_err(|e| e.to_string())?),
        ("cool", [start, end, rest @ ..]) if rest.len() <= 1 => ConsoleCommand::Cool {
            start: parse_target(start).map_err(|e| e.to_string())?,
            end: parse_target(end).map_err(|e| e.to_string())?,
            channel: rest.first().map(|tc| parse_channel(tc)).transpose()?,
        },
        (verb, _) => return Err(format!("Comando inválido: {verb:?} (digite 'help')")),
    };

    Ok(Some(command))
}

/// `max` → 0 (o mais rápido possível), senão 1–5 segundos.
fn parse_rate(arg: &str) -> Result<u32, String> {
    if arg.eq_ignore_ascii_case("max") {
        return Ok(0);
    }
    match arg.parse::<u32>() {
        Ok(secs) if (1..=MAX_SAMPLE_INTERVAL_SECS).contains(&secs) => Ok(secs),
        _ => Err(format!(
            "Intervalo inválido: {arg:?} (1–{MAX_SAMPLE_INTERVAL_SECS} ou max)"
        )),
    }
}

/// `2`, `T2` ou `TC2` → 2.
fn parse_channel(arg: &str) -> Result<ChannelId, String> {
    let digits = arg.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    match digits.parse::<ChannelId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(format!("Termopar inválido: {arg:?}")),
    }
}

/// Mantém só o canal pedido, se houver.
pub fn select_channel(mut report: CoolingReport, channel: Option<ChannelId>) -> CoolingReport {
    if let Some(channel) = channel {
        report.retain(|id, _| *id == channel);
    }
    report
}

/// Uma linha por canal: `Termopar 1: 23.50 °C`.
pub fn format_live(snapshot: &LiveSnapshot) -> String {
    if snapshot.is_empty() {
        return "Nenhum dado recebido da placa".into();
    }
    snapshot
        .iter()
        .map(|(channel, status)| match status {
            ChannelStatus::Connected { temperature_c } => {
                format!("Termopar {channel}: {temperature_c:.2} °C")
            }
            ChannelStatus::NotConnected => format!("Termopar {channel}: Not Connected"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_report(report: &CoolingReport) -> String {
    if report.is_empty() {
        return "Sem dados gravados para calcular a taxa de resfriamento".into();
    }
    report
        .iter()
        .map(|(channel, result)| match result {
            Ok(rate) => format!(
                "TC {channel} taxa de resfriamento: {:.2} °C/min\n  Intervalo: {:.2} °C @ {:.2}s → {:.2} °C @ {:.2}s",
                rate.rate_per_minute, rate.start_temp, rate.start_time, rate.end_temp, rate.end_time
            ),
            Err(e) => format!("TC {channel}: {e}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
