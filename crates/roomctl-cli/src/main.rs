use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use roomctl_core::actuator::PowerActuator;
use roomctl_core::controller::{Controller, CycleOutcome};
use roomctl_core::doctor as core_doctor;
use roomctl_core::gpio::{Board, PiInput};
use roomctl_core::hal::{Clock, MonotonicClock, OutputLine, Pacer, TokioPacer, Unconnected};
use roomctl_core::iio::IioAdc;
use roomctl_core::monitor::LoadMonitor;
use roomctl_core::report::{HttpTransport, NoLoadReporter};
use roomctl_core::sampler::{CurrentSampler, OccupancySampler};
use roomctl_core::sim::{SimAdc, SimInput, SimOutput, SimTransport, VirtualClock, VirtualPacer};
use roomctl_core::{LoadMonitorConfig, ReportConfig, TimingConfig};
use roomctl_uplink::{doctor as uplink_doctor, HttpClient, NetLink};

#[derive(Debug, Parser)]
#[command(name = "roomctl", version, about = "roomctl - occupancy-driven room power relay")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration and the hardware paths it names.
    Doctor,
    /// Run the control loop on the board's GPIO header.
    Run,
    /// Run one cycle without reporting and print what was sensed.
    Probe,
    /// Replay a sensor trace against simulated pins.
    Simulate {
        #[arg(long)]
        trace: String,
        /// Send reports to the configured endpoint instead of printing them.
        #[arg(long)]
        post: bool,
    },
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    occupancy: PinCfg,
    relay: PinCfg,
    indicators: Option<IndicatorCfg>,
    load_monitor: Option<LoadMonitorConfig>,
    timing: Option<TimingConfig>,
    report: Option<ReportConfig>,
    network: Option<NetworkCfg>,
}

#[derive(Debug, serde::Deserialize)]
struct PinCfg { gpio: u8, active_low: Option<bool> }

#[derive(Debug, serde::Deserialize)]
struct IndicatorCfg { occupancy_gpio: Option<u8>, load_gpio: Option<u8> }

#[derive(Debug, serde::Deserialize)]
struct NetworkCfg {
    /// Interface whose operstate gates reporting, e.g. "wlan0"
    iface: Option<String>,
    startup_wait_s: Option<u64>,
}

impl Config {
    /// BCM numbers of every configured line
    fn gpios(&self) -> Vec<u8> {
        let leds = self.indicators.as_ref();
        [
            Some(self.occupancy.gpio),
            Some(self.relay.gpio),
            leds.and_then(|l| l.occupancy_gpio),
            leds.and_then(|l| l.load_gpio),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn load_monitor(&self) -> Option<&LoadMonitorConfig> {
        self.load_monitor.as_ref().filter(|m| m.enable)
    }

    fn report(&self) -> Option<&ReportConfig> {
        self.report.as_ref().filter(|r| r.enable)
    }

    fn timing(&self) -> roomctl_core::controller::Timing {
        self.timing.clone().unwrap_or_default().resolve(self.load_monitor().is_some())
    }

    fn net_link(&self) -> NetLink {
        match self.network.as_ref().and_then(|n| n.iface.as_deref()) {
            Some(iface) => NetLink::iface(iface),
            None => NetLink::always_up(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct Trace {
    #[serde(rename = "step")]
    steps: Vec<TraceStep>,
}

#[derive(Debug, serde::Deserialize)]
struct TraceStep {
    occupied: bool,
    /// ADC count of the current sensor (default: mid-scale)
    raw: Option<u16>,
    link_up: Option<bool>,
    /// Status the simulated endpoint answers with
    status: Option<u16>,
    repeat: Option<u32>,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    Ok(toml::from_str(&s).context("parse config toml")?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let clock = MonotonicClock::start();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Run => run(&cfg, clock).await?,
        Command::Probe => probe(&cfg, clock).await?,
        Command::Simulate { trace, post } => simulate(&cfg, &trace, post).await?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    core_doctor::check_timing(&cfg.timing())?;

    let mut gpios = cfg.gpios();
    gpios.sort_unstable();
    if let Some(w) = gpios.windows(2).find(|w| w[0] == w[1]) {
        anyhow::bail!("gpio{} is configured for more than one line", w[0]);
    }
    Board::open()?;

    if let Some(m) = cfg.load_monitor() {
        core_doctor::check_calibration(&m.calibration())?;
        let adc = m.adc_path.as_deref().context("load_monitor.adc_path missing")?;
        anyhow::ensure!(Path::new(adc).exists(), "load_monitor.adc_path missing: {}", adc);
    }

    match cfg.report() {
        Some(r) => {
            anyhow::ensure!(cfg.load_monitor().is_some(), "report enabled but load_monitor is off; nothing would be reported");
            core_doctor::check_report(r)?;
            uplink_doctor::check_endpoint(&r.url)?;
            if let Some(iface) = cfg.network.as_ref().and_then(|n| n.iface.as_deref()) {
                uplink_doctor::check_iface(iface)?;
            } else {
                warn!("doctor: network.iface not set; link assumed up");
            }
        }
        None => info!("doctor: reporting disabled"),
    }

    info!("doctor: OK");
    Ok(())
}

/// Claims `gpio` already at the line's off level; no gpio leaves the slot unconnected.
fn output_line(board: &Board, name: &'static str, gpio: Option<u8>, active_low: bool) -> Result<OutputLine> {
    Ok(match gpio {
        Some(n) => {
            let pin = board.output(n, OutputLine::off_state(active_low)).context(name)?;
            OutputLine::new(name, pin, active_low)
        }
        None => OutputLine::new(name, Unconnected, active_low),
    })
}

struct Hardware {
    occupancy: OccupancySampler<PiInput>,
    actuator: PowerActuator,
    load: Option<LoadMonitor>,
}

fn open_hardware(cfg: &Config) -> Result<Hardware> {
    let board = Board::open()?;
    let leds = cfg.indicators.as_ref();

    let sensor = board.input(cfg.occupancy.gpio).context("occupancy sensor")?;
    let relay = output_line(&board, "relay", Some(cfg.relay.gpio), cfg.relay.active_low.unwrap_or(false))?;
    let occ_led = output_line(&board, "occupancy led", leds.and_then(|l| l.occupancy_gpio), false)?;

    let load = match cfg.load_monitor() {
        Some(m) => {
            let adc = IioAdc::open(m.adc_path.as_deref().context("load_monitor.adc_path missing")?)?;
            Some(LoadMonitor::new(
                Box::new(CurrentSampler::new(Box::new(adc), m.calibration())),
                output_line(&board, "load led", leds.and_then(|l| l.load_gpio), false)?,
            ))
        }
        None => None,
    };

    Ok(Hardware {
        occupancy: OccupancySampler::new(sensor, cfg.occupancy.active_low.unwrap_or(false)),
        actuator: PowerActuator::new(relay, occ_led),
        load,
    })
}

fn http_reporter(cfg: &Config) -> Option<NoLoadReporter<HttpClient>> {
    let r = cfg.report()?;
    Some(NoLoadReporter::new(r.url.clone(), HttpClient::new(cfg.net_link(), r.timeout()), r.gate()))
}

async fn run(cfg: &Config, clock: MonotonicClock) -> Result<()> {
    info!("run: starting");
    let hw = open_hardware(cfg)?;
    let reporter = http_reporter(cfg);

    if let Some(r) = cfg.report() {
        uplink_doctor::check_endpoint(&r.url)?;
        let wait = cfg.network.as_ref().and_then(|n| n.startup_wait_s).unwrap_or(30);
        if wait > 0 {
            cfg.net_link().wait_up(Duration::from_secs(wait)).await;
        }
    }

    let mut ctl = Controller::new(
        Box::new(hw.occupancy),
        hw.actuator,
        cfg.timing(),
        TokioPacer,
        clock,
    );
    if let Some(m) = hw.load {
        ctl = ctl.with_load_monitor(m);
    }
    if let Some(r) = reporter {
        ctl = ctl.with_reporter(r);
    }

    ctl.run(shutdown_signal()).await;
    if let Some(r) = ctl.reporter() {
        let h = r.transport().link_health();
        info!("uplink: last status {:?}, RTT {:?}ms, consecutive failures {}", h.last_status, h.rtt_ms, h.consecutive_failures);
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut term) = signal(SignalKind::terminate()) {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
            info!("shutdown requested");
            return;
        }
    }
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}

/// Runs one cycle, then switches every output off again.
async fn probe(cfg: &Config, clock: MonotonicClock) -> Result<()> {
    let hw = open_hardware(cfg)?;
    let mut ctl: Controller<HttpClient, _, _> = Controller::new(
        Box::new(hw.occupancy),
        hw.actuator,
        cfg.timing(),
        TokioPacer,
        clock,
    );
    if let Some(m) = hw.load {
        ctl = ctl.with_load_monitor(m);
    }
    let out = single_cycle(&mut ctl).await;
    println!("{}", describe(&out, out.occupied));
    Ok(())
}

async fn single_cycle<T: HttpTransport, P: Pacer, C: Clock>(ctl: &mut Controller<T, P, C>) -> CycleOutcome {
    ctl.start();
    let out = ctl.cycle().await;
    ctl.release();
    out
}

fn describe(out: &CycleOutcome, relay_on: bool) -> String {
    let load = match out.load {
        Some(s) => format!("raw={} current={:.2}A load={}", s.raw, s.amps, s.load_present),
        None => "load=n/a".to_string(),
    };
    format!(
        "occupied={} relay={} {} report={:?}",
        out.occupied,
        if relay_on { "ON" } else { "OFF" },
        load,
        out.report
    )
}

struct SimRig {
    sensor: SimInput,
    adc: SimAdc,
    relay: SimOutput,
}

fn sim_controller<T: HttpTransport>(
    cfg: &Config,
    clock: &VirtualClock,
    reporter: Option<NoLoadReporter<T>>,
) -> (SimRig, Controller<T, VirtualPacer, VirtualClock>) {
    let rig = SimRig { sensor: SimInput::new(false), adc: SimAdc::new(511), relay: SimOutput::new() };
    let mut ctl = Controller::new(
        Box::new(OccupancySampler::new(rig.sensor.clone(), false)),
        PowerActuator::new(
            OutputLine::new("relay", rig.relay.clone(), false),
            OutputLine::new("occupancy led", SimOutput::new(), false),
        ),
        cfg.timing(),
        VirtualPacer::new(clock.clone()),
        clock.clone(),
    );
    if let Some(m) = cfg.load_monitor() {
        ctl = ctl.with_load_monitor(LoadMonitor::new(
            Box::new(CurrentSampler::new(Box::new(rig.adc.clone()), m.calibration())),
            OutputLine::new("load led", SimOutput::new(), false),
        ));
    }
    if let Some(r) = reporter {
        ctl = ctl.with_reporter(r);
    }
    (rig, ctl)
}

async fn simulate(cfg: &Config, trace_path: &str, post: bool) -> Result<()> {
    let s = std::fs::read_to_string(trace_path).context("read trace")?;
    let trace: Trace = toml::from_str(&s).context("parse trace toml")?;
    anyhow::ensure!(!trace.steps.is_empty(), "trace has no [[step]] entries");
    if cfg.load_monitor().is_none() {
        warn!("simulate: load_monitor disabled; raw samples in the trace are ignored");
    }

    let clock = VirtualClock::new();
    if post {
        let (rig, mut ctl) = sim_controller(cfg, &clock, http_reporter(cfg));
        replay(&trace, &rig, &mut ctl, &clock, None).await;
    } else {
        let net = SimTransport::new();
        let reporter = cfg.report().map(|r| NoLoadReporter::new(r.url.clone(), net.clone(), r.gate()));
        let (rig, mut ctl) = sim_controller(cfg, &clock, reporter);
        replay(&trace, &rig, &mut ctl, &clock, Some(&net)).await;
    }
    Ok(())
}

async fn replay<T: HttpTransport>(
    trace: &Trace,
    rig: &SimRig,
    ctl: &mut Controller<T, VirtualPacer, VirtualClock>,
    clock: &VirtualClock,
    net: Option<&SimTransport>,
) {
    ctl.start();
    let mut seen = 0;
    for (i, step) in trace.steps.iter().enumerate() {
        rig.sensor.set(step.occupied);
        rig.adc.set(step.raw.unwrap_or(511));
        if let Some(net) = net {
            net.set_link(step.link_up.unwrap_or(true));
            net.set_status(step.status.unwrap_or(200));
        }
        for _ in 0..step.repeat.unwrap_or(1).max(1) {
            let out = ctl.cycle().await;
            println!("step={} t={}ms {}", i + 1, clock.uptime().as_millis(), describe(&out, rig.relay.level()));
            if let Some(net) = net {
                let posts = net.posts();
                for p in &posts[seen..] {
                    println!("  POST {} {}", p.url, String::from_utf8_lossy(&p.body));
                }
                seen = posts.len();
            }
        }
    }
    ctl.release();
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        [occupancy]
        gpio = 2

        [relay]
        gpio = 7
        active_low = true

        [indicators]
        occupancy_gpio = 13

        [load_monitor]
        enable = true
        adc_path = "/sys/bus/iio/devices/iio:device0/in_voltage0_raw"
        threshold_a = 0.8

        [report]
        enable = true
        url = "http://10.0.0.2:8080/api/no-load"
        policy = "on-transition"
    "#;

    #[test]
    fn parses_full_config() {
        let cfg: Config = toml::from_str(CONFIG).unwrap();
        assert_eq!(cfg.relay.active_low, Some(true));
        assert_eq!(cfg.load_monitor().unwrap().calibration().threshold_a, 0.8);
        assert_eq!(cfg.timing().cycle, Duration::from_millis(500));
        assert_eq!(cfg.gpios(), vec![2, 7, 13]);
        assert!(cfg.report().is_some());
    }

    #[test]
    fn minimal_config_is_occupancy_only() {
        let cfg: Config = toml::from_str("[occupancy]\ngpio = 2\n[relay]\ngpio = 7\n").unwrap();
        assert!(cfg.load_monitor().is_none());
        assert!(cfg.report().is_none());
        assert_eq!(cfg.timing(), roomctl_core::controller::Timing::OCCUPANCY_ONLY);
    }

    #[test]
    fn doctor_rejects_shared_gpio() {
        let cfg: Config = toml::from_str("[occupancy]\ngpio = 2\n[relay]\ngpio = 7\n[indicators]\nload_gpio = 7\n").unwrap();
        let err = doctor(&cfg).unwrap_err();
        assert!(err.to_string().contains("gpio7"));
    }

    #[test]
    fn parses_trace_steps() {
        let t: Trace = toml::from_str(
            "[[step]]\noccupied = true\nraw = 511\nrepeat = 3\n\n[[step]]\noccupied = false\nlink_up = false\n",
        )
        .unwrap();
        assert_eq!(t.steps.len(), 2);
        assert_eq!(t.steps[0].repeat, Some(3));
        assert_eq!(t.steps[1].link_up, Some(false));
    }

    #[tokio::test]
    async fn single_cycle_leaves_outputs_off() {
        let cfg: Config = toml::from_str(CONFIG).unwrap();
        let clock = VirtualClock::new();
        let (rig, mut ctl) = sim_controller::<SimTransport>(&cfg, &clock, None);
        rig.sensor.set(true);

        let out = single_cycle(&mut ctl).await;
        assert!(out.occupied);
        assert_eq!(ctl.cycles(), 1);
        assert!(!rig.relay.level());
    }

    #[tokio::test]
    async fn replay_reports_each_qualifying_cycle() {
        let cfg: Config = toml::from_str(CONFIG).unwrap();
        let trace: Trace = toml::from_str(
            "[[step]]\noccupied = true\nraw = 511\nrepeat = 3\n\n[[step]]\noccupied = true\nraw = 920\n\n[[step]]\noccupied = true\nraw = 511\n",
        )
        .unwrap();
        let clock = VirtualClock::new();
        let net = SimTransport::new();
        let reporter = cfg.report().map(|r| NoLoadReporter::new(r.url.clone(), net.clone(), r.gate()));
        let (rig, mut ctl) = sim_controller(&cfg, &clock, reporter);
        replay(&trace, &rig, &mut ctl, &clock, Some(&net)).await;

        // on-transition: first no-load episode, then again after the load went away
        assert_eq!(net.posts().len(), 2);
        assert_eq!(ctl.cycles(), 5);
        assert!(!rig.relay.level());
    }
}
