//! # Thermo Recorder
//!
//! Lê a placa de termopares pela porta serial, mostra as leituras ao vivo e
//! grava sessões de resfriamento comandadas pelo console.
//!
//! ## Uso
//! ```bash
//! thermo_recorder                  # porta do config.toml
//! thermo_recorder /dev/ttyUSB0     # sobrescreve a porta
//! ```

mod console;

use console::{ConsoleCommand, HELP, format_live, format_report, parse_command, select_channel};
use crossbeam_channel::Receiver;
use serialport::SerialPort;
use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use thermo_core::config::AppConfig;
use thermo_core::{AcquisitionEvent, AcquisitionHandle, Command, ThermoEngine, send_command, spawn_acquisition_thread};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Carregar config ──
    let config_path = AppConfig::default_path();
    let mut config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    if let Some(port) = std::env::args().nth(1) {
        config.serial.port = port;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config inválida: {e}");
        }
        return ExitCode::FAILURE;
    }

    // ── Porta serial ──
    let serial = &config.serial;
    let port = match serialport::new(&serial.port, serial.baud_rate)
        .timeout(Duration::from_millis(serial.read_timeout_ms))
        .open()
    {
        Ok(port) => port,
        Err(e) => {
            error!("Falha ao abrir {}: {e}", serial.port);
            return ExitCode::FAILURE;
        }
    };
    let mut writer = match port.try_clone() {
        Ok(writer) => writer,
        Err(e) => {
            error!("Falha ao duplicar handle de {}: {e}", serial.port);
            return ExitCode::FAILURE;
        }
    };
    info!("Conectado a {} @ {} baud", serial.port, serial.baud_rate);

    // Configuração inicial da placa
    send(writer.as_mut(), Command::SensorType(config.device.sensor_type));
    send(writer.as_mut(), Command::Rate(config.device.sample_interval_secs));

    // ── Motor + thread de aquisição ──
    let engine = Arc::new(ThermoEngine::new(&config.recording));
    let handle = match spawn_acquisition_thread(port, Arc::clone(&engine), &config.acquisition) {
        Ok(handle) => handle,
        Err(e) => {
            error!("Falha ao criar thread de aquisição: {e}");
            return ExitCode::FAILURE;
        }
    };
    watch_events(handle.events().clone());

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   🌡  THERMO RECORDER – ATIVO");
    println!("══════════════════════════════════════════════");
    println!("  Porta:     {} @ {} baud", serial.port, serial.baud_rate);
    println!("  Termopar:  tipo {}", config.device.sensor_type);
    println!("  Intervalo: {}", describe_rate(config.device.sample_interval_secs));
    println!("══════════════════════════════════════════════");
    println!("{HELP}");
    println!();

    // ── Loop do console ──
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Erro ao ler stdin: {e}");
                break;
            }
        };

        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Quit)) => break,
            Ok(Some(command)) => execute(command, &engine, &handle, writer.as_mut()),
            Err(e) => println!("{e}"),
        }
    }

    if engine.current_session_elapsed().is_some() {
        if let Ok(samples) = engine.stop_recording() {
            info!("Gravação encerrada na saída ({} amostras)", samples.len());
        }
    }
    ExitCode::SUCCESS
}

fn execute(command: ConsoleCommand, engine: &ThermoEngine, handle: &AcquisitionHandle, writer: &mut dyn SerialPort) {
    match command {
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Status => {
            println!("{}", format_live(&engine.current_live_state()));
            let stats = handle.stats();
            println!(
                "Gravação: {:?} | {} amostras | linhas: {} lidas, {} descartadas",
                engine.session_state(),
                engine.session_samples().len(),
                stats.lines_read,
                stats.lines_dropped
            );
            if handle.is_finished() {
                println!("⚠ Thread de aquisição encerrada");
            }
        }
        ConsoleCommand::Start => match engine.start_recording() {
            Ok(()) => println!("Gravando..."),
            Err(e) => println!("{e}"),
        },
        ConsoleCommand::Stop => match engine.stop_recording() {
            Ok(samples) => println!("Gravação encerrada: {} amostras", samples.len()),
            Err(e) => println!("{e}"),
        },
        ConsoleCommand::Elapsed => match engine.current_session_elapsed() {
            Some(secs) => println!("Tempo decorrido: {secs:.2}s"),
            None => println!("Nenhuma gravação ativa"),
        },
        ConsoleCommand::Rate(secs) => {
            if send(writer, Command::Rate(secs)) {
                println!("Intervalo: {}", describe_rate(secs));
            }
        }
        ConsoleCommand::SensorType(sensor) => {
            if send(writer, Command::SensorType(sensor)) {
                println!("Termopar tipo {sensor}");
            }
        }
        ConsoleCommand::Cool { start, end, channel } => match engine.analyze_cooling(start, end) {
            Ok(report) => {
                let report = select_channel(report, channel);
                match channel {
                    Some(tc) if report.is_empty() => println!("Sem amostras gravadas do termopar {tc}"),
                    _ => println!("{}", format_report(&report)),
                }
            }
            Err(e) => println!("{e}"),
        },
        ConsoleCommand::Quit => {}
    }
}

/// Envia um comando à placa; falha de escrita só é reportada.
fn send(writer: &mut dyn SerialPort, command: Command) -> bool {
    match send_command(writer, &command) {
        Ok(()) => true,
        Err(e) => {
            error!("Erro ao enviar {command} para a placa: {e}");
            false
        }
    }
}

fn describe_rate(secs: u32) -> String {
    if secs == 0 {
        "máximo (≈ 3-4 amostras/s)".into()
    } else {
        format!("uma amostra a cada {secs}s")
    }
}

/// Loga os eventos da thread de aquisição.
fn watch_events(events: Receiver<AcquisitionEvent>) {
    let spawned = std::thread::Builder::new()
        .name("acq-events".into())
        .spawn(move || {
            for event in events.iter() {
                match event {
                    AcquisitionEvent::FirstConnection => {
                        info!("Termopar detectado – gravação liberada ('start')");
                    }
                    AcquisitionEvent::Terminated(exit) => {
                        warn!("Leitura da placa parou: {exit}");
                    }
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Sem monitor de eventos: {e}");
    }
}
