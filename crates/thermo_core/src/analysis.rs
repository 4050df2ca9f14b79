//! Taxa de resfriamento por canal.
//!
//! Para cada canal, localiza a amostra mais próxima de cada temperatura alvo
//! e calcula a inclinação entre as duas em °C/min.

use crate::types::{ChannelId, CoolingRate, Sample};
use std::collections::BTreeMap;

/// Resultado por canal. Canais sem amostras não aparecem.
pub type CoolingReport = BTreeMap<ChannelId, Result<CoolingRate, AnalysisError>>;

/// Erros da análise.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("Temperatura alvo inválida: {0:?}")]
    InvalidTarget(String),

    #[error("Intervalo de duração zero no canal {channel} (t = {elapsed_secs}s)")]
    ZeroDuration { channel: ChannelId, elapsed_secs: f64 },
}

/// Converte o texto digitado pelo usuário em temperatura alvo.
pub fn parse_target(text: &str) -> Result<f64, AnalysisError> {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(AnalysisError::InvalidTarget(text.to_string())),
    }
}

/// Calcula a taxa de resfriamento de cada canal entre `target_start` e
/// `target_end` (°C).
///
/// Empates na busca do mais próximo ficam com a primeira amostra.
pub fn analyze_cooling(
    samples: &[Sample],
    target_start: f64,
    target_end: f64,
) -> Result<CoolingReport, AnalysisError> {
    for target in [target_start, target_end] {
        if !target.is_finite() {
            return Err(AnalysisError::InvalidTarget(target.to_string()));
        }
    }

    let mut by_channel: BTreeMap<ChannelId, Vec<&Sample>> = BTreeMap::new();
    for sample in samples {
        by_channel.entry(sample.channel_id).or_default().push(sample);
    }

    Ok(by_channel
        .into_iter()
        .filter_map(|(channel, series)| {
            let s1 = nearest(&series, target_start)?;
            let s2 = nearest(&series, target_end)?;
            Some((channel, cooling_between(channel, s1, s2)))
        })
        .collect())
}

/// Argmin estável de `|temp − target|`.
fn nearest<'a>(series: &[&'a Sample], target: f64) -> Option<&'a Sample> {
    let mut best: Option<(&Sample, f64)> = None;
    for &sample in series {
        let distance = (sample.temperature_c - target).abs();
        match best {
            Some((_, d)) if distance >= d => {}
            _ => best = Some((sample, distance)),
        }
    }
    best.map(|(sample, _)| sample)
}

fn cooling_between(channel: ChannelId, s1: &Sample, s2: &Sample) -> Result<CoolingRate, AnalysisError> {
    let dt = s2.elapsed_secs - s1.elapsed_secs;
    if dt == 0.0 {
        return Err(AnalysisError::ZeroDuration {
            channel,
            elapsed_secs: s1.elapsed_secs,
        });
    }

    let rate = (s2.temperature_c - s1.temperature_c) / dt * 60.0;
    Ok(CoolingRate {
        rate_per_minute: round2(rate),
        start_temp: s1.temperature_c,
        end_temp: s2.temperature_c,
        start_time: s1.elapsed_secs,
        end_time: s2.elapsed_secs,
    })
}

/// Duas casas; empate exato vai para o par.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
