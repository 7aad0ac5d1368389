// Lidar/radar fusion with an unscented Kalman filter on a simulated CTRV target

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use ukf_sensor_fusion::common::{FusionResult, Point2D, SensorType};
use ukf_sensor_fusion::simulation::{generate_scenario, run_scenario, ScenarioConfig};
use ukf_sensor_fusion::tracking::{NisCollector, NisWriter, UKFConfig, UnscentedKalmanFilter};
use ukf_sensor_fusion::tracking::nis::chi_squared_95;
use ukf_sensor_fusion::utils::visualization::{nis_plot, quick_plot_tracking};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of simulated measurements
    #[arg(long, default_value_t = 500)]
    steps: usize,

    /// Time between measurements in microseconds
    #[arg(long, default_value_t = 50_000)]
    dt_us: i64,

    /// Seed for the scenario noise
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Ignore lidar measurements
    #[arg(long, default_value_t = false)]
    no_lidar: bool,

    /// Ignore radar measurements
    #[arg(long, default_value_t = false)]
    no_radar: bool,

    /// Sigma point spreading parameter (default: 3 - n_aug)
    #[arg(long, allow_hyphen_values = true)]
    lambda: Option<f64>,

    /// Write one NIS line per update cycle to this file
    #[arg(long, value_name = "FILE")]
    nis_log: Option<PathBuf>,

    /// Save tracking and NIS plots into this directory
    #[arg(long, value_name = "DIR")]
    plot_dir: Option<PathBuf>,

    /// Open the tracking plot in a gnuplot window
    #[arg(long, default_value_t = false)]
    show: bool,

    /// Warm-up updates excluded from NIS statistics
    #[arg(long, default_value_t = 20)]
    warm_up: usize,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = UKFConfig {
        use_lidar: !args.no_lidar,
        use_radar: !args.no_radar,
        ..UKFConfig::default()
    };
    if let Some(lambda) = args.lambda {
        config.params.lambda = lambda;
    }

    let scenario_config = ScenarioConfig {
        steps: args.steps,
        dt_us: args.dt_us,
        seed: args.seed,
        ..ScenarioConfig::matching(&config)
    };
    let scenario = generate_scenario(&scenario_config)?;
    info!(
        "Generated {} measurements (seed {}, pattern {:?})",
        scenario.measurements.len(),
        scenario_config.seed,
        scenario_config.pattern
    );

    let mut ukf = UnscentedKalmanFilter::new(config)?;
    let mut collector = NisCollector::new();

    let report = match &args.nis_log {
        Some(path) => {
            let mut writer = NisWriter::create(path)?;
            let report = run_scenario(&mut ukf, &scenario, &mut (&mut writer, &mut collector))?;
            writer.flush()?;
            info!("NIS log written to {}", path.display());
            report
        }
        None => run_scenario(&mut ukf, &scenario, &mut collector)?,
    };

    for sensor in [SensorType::Lidar, SensorType::Radar] {
        match collector.statistics(sensor, args.warm_up) {
            Some(stats) => info!(
                "{} NIS: n={} mean={:.3} median={:.3} max={:.3} above 95% bound={:.1}%",
                sensor,
                stats.count,
                stats.mean,
                stats.median,
                stats.max,
                stats.fraction_above_95 * 100.0
            ),
            None => info!("{} NIS: no samples", sensor),
        }
    }

    match (&report.rmse, &report.final_state) {
        (Some(rmse), Some(x)) => {
            info!(
                "RMSE px={:.4} py={:.4} vx={:.4} vy={:.4}",
                rmse[0], rmse[1], rmse[2], rmse[3]
            );
            info!(
                "Final state px={:.3} py={:.3} v={:.3} yaw={:.3} yaw_rate={:.3}",
                x[0], x[1], x[2], x[3], x[4]
            );
        }
        _ => warn!("Filter was never initialized"),
    }

    if args.plot_dir.is_some() || args.show {
        plot(&args, &scenario, &report, &collector)?;
    }

    Ok(())
}

fn plot(
    args: &Args,
    scenario: &ukf_sensor_fusion::simulation::Scenario,
    report: &ukf_sensor_fusion::simulation::ScenarioReport,
    collector: &NisCollector,
) -> FusionResult<()> {
    let estimates: Vec<Point2D> = report
        .estimates
        .iter()
        .map(|e| Point2D::new(e[0], e[1]))
        .collect();
    let mut vis = quick_plot_tracking(
        &scenario.ground_truth_positions(),
        &estimates,
        &scenario.measurement_positions(SensorType::Lidar),
        &scenario.measurement_positions(SensorType::Radar),
        "UKF lidar/radar fusion",
    );

    if let Some(dir) = &args.plot_dir {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("tracking.png");
        vis.save_png(&path.to_string_lossy(), 800, 800)?;
        info!("Plot saved to {}", path.display());

        for sensor in [SensorType::Lidar, SensorType::Radar] {
            let series = collector.series(sensor);
            if series.is_empty() {
                continue;
            }
            let mut nis = nis_plot(series, chi_squared_95(sensor), &format!("{} NIS", sensor));
            let path = dir.join(format!("nis_{}.png", sensor));
            nis.save_png(&path.to_string_lossy(), 800, 400)?;
            info!("Plot saved to {}", path.display());
        }
    }

    if args.show {
        vis.show()?;
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    if verbose {
        subscriber.with_max_level(tracing::Level::DEBUG).init();
        info!("Verbose logging enabled (DEBUG level)");
    } else {
        subscriber.with_max_level(tracing::Level::INFO).init();
    }
}
