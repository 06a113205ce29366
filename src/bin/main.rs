#![crate_type = "bin"]
#![recursion_limit = "1024"]

#[macro_use]
extern crate error_chain;

mod errors {
    // Create the Error, ErrorKind, ResultExt, and Result types
    error_chain! {}
}
mod init;
mod output;
mod settings;
mod timedisplay;

use crate::errors::*;
use crate::init::{init_problem, InitType, ModelKind, Problem, QMesh};
use crate::output::Worker;
use crate::settings::Settings;
use clap::load_yaml;
use clap::App;
use colored::*;
use log::{error, info};
use ndarray::Array1;
use pbr::ProgressBar;
use polyscatter::output::OutputEntry;
use polyscatter::{Integrator, ModelInfo, ParameterPool, ProblemDetails, Snapshot};
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> String {
    String::from(VERSION)
}

fn main() {
    // initialize the env_logger implementation
    env_logger::init();

    // error handling of runner
    if let Err(ref e) = run() {
        error!("{}: {}", "error".red(), e);

        for e in e.iter().skip(1) {
            error!("caused by: {}", e);
        }

        // The backtrace is not always generated. Try to run this with
        // `RUST_BACKTRACE=1`.
        if let Some(backtrace) = e.backtrace() {
            error!("backtrace: {:?}", backtrace);
        }

        ::std::process::exit(1);
    }

    ::std::process::exit(0);
}

/// Main function
fn run() -> Result<()> {
    // Parse command line
    let yaml = load_yaml!("cli.yml");
    let cli_matches = App::from_yaml(yaml)
        .version(version().as_str())
        .get_matches();

    let settings_file_name = cli_matches.value_of("parameter_file").unwrap();
    let mut settings = settings::read_parameter_file(settings_file_name)
        .chain_err(|| "Error reading parameter file.")?;

    settings.set_version(&version());

    let output_dir = Path::new(cli_matches.value_of("output_directory").unwrap());
    let worker = Worker::new(settings.environment.io_queue_size, output_dir, &settings)
        .chain_err(|| "Unable to create output thread.")?;

    // keep a copy of the parameters next to the data they produced
    settings
        .save_to_file(worker.get_settings_filepath().to_str().unwrap())
        .chain_err(|| "Unable to save a copy of the parameter file.")?;

    // drop mutability for safety
    let settings = settings;

    let init_type = if cli_matches.is_present("resume") {
        InitType::Resume
    } else {
        InitType::Fresh
    };

    let problem = init_problem(&settings, init_type)
        .chain_err(|| "Error during initialization of the integration.")?;

    let show_progress = cli_matches.is_present("progress_bar");

    worker
        .write_metadata(settings.clone())
        .chain_err(|| "Unable to write metadata to output.")?;

    run_integration(&settings, problem, worker, show_progress)
}

/// Dispatches one cube slice to the driver matching model and q mesh.
fn integrate_slice(
    model: &ModelKind,
    info: &ModelInfo,
    details: &ProblemDetails,
    values: &[f64],
    q: &QMesh,
    pd_start: usize,
    pd_stop: usize,
    cutoff: f64,
    result: &mut [f64],
) {
    match (model, q) {
        (ModelKind::CoreShellSphere(m), QMesh::Radial(q)) => {
            Integrator::new(m, info, details).radial(q, values, pd_start, pd_stop, cutoff, result)
        }
        (ModelKind::CoreShellSphere(m), QMesh::Planar(q)) => Integrator::new(m, info, details)
            .unoriented(q, values, pd_start, pd_stop, cutoff, result),
        (ModelKind::MultilayerVesicle(m), QMesh::Radial(q)) => {
            Integrator::new(m, info, details).radial(q, values, pd_start, pd_stop, cutoff, result)
        }
        (ModelKind::MultilayerVesicle(m), QMesh::Planar(q)) => Integrator::new(m, info, details)
            .unoriented(q, values, pd_start, pd_stop, cutoff, result),
    }
}

/// Walks the hypercube slice by slice and feeds the output thread.
fn run_integration(
    settings: &Settings,
    problem: Problem,
    out: Worker,
    show_progress: bool,
) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))
        .chain_err(|| "Unable to install the interrupt handler.")?;

    let Problem {
        model,
        info,
        details,
        values,
        q,
        mut result,
        mut pd_start,
    } = problem;

    let num_eval = details.num_eval();
    let nq = q.len();

    let mut pb = ProgressBar::new(num_eval as u64);
    pb.format("┫██░┣");

    // only show bar, if flag was present
    pb.show_bar = show_progress;
    pb.show_counter = show_progress;
    pb.show_percent = show_progress;
    pb.show_speed = show_progress;
    pb.show_time_left = show_progress;
    pb.show_message = show_progress;

    // in case the integration was resumed
    pb.add(pd_start as u64);

    let start_time = time::now();

    let cutoff = settings.integration.cutoff;
    let slice_size = settings.integration.slice_size;
    let out_at = settings.integration.output_at_slice;

    let mut slice_index = 0;
    let mut interrupted = false;

    // Walk the cube in contiguous slices and send data asynchronously to
    // the IO-thread.
    while pd_start < num_eval {
        let pd_stop = ::std::cmp::min(pd_start + slice_size, num_eval);
        integrate_slice(
            &model, &info, &details, &values, &q, pd_start, pd_stop, cutoff, &mut result,
        );

        pb.add((pd_stop - pd_start) as u64);
        pd_start = pd_stop;
        slice_index += 1;

        if let Some(every) = out_at.accumulated {
            if slice_index % every == 0 && pd_start < num_eval {
                info!("Slice {}: Append accumulator...", slice_index);
                let entry = OutputEntry {
                    accumulated: Some(Array1::from_vec(result[..nq].to_vec())),
                    pd_norm: Some(result[nq]),
                    intensity: None,
                    pd_start,
                };
                match out.append(entry) {
                    Ok(_) => (),
                    Err(_) => return out.emergency_join(),
                };
            }
        }

        match out_at.snapshot {
            Some(every) if slice_index % every == 0 && pd_start < num_eval => {
                info!("Slice {}: Save snapshot...", slice_index);
                out.write_snapshot(&Snapshot {
                    result: result.clone(),
                    pd_start,
                })
            }
            _ => Ok(()),
        }?;

        // cooperative cancellation, only between slices
        if !running.load(Ordering::SeqCst) {
            interrupted = true;
            break;
        }
    }

    if interrupted {
        println!();
        out.write_snapshot(&Snapshot {
            result: result.clone(),
            pd_start,
        })
        .chain_err(|| "Error writing the interrupt snapshot.")?;
        println!(
            "{} at cube point {} of {}; snapshot saved to '{}'.",
            "INTERRUPTED".yellow().bold(),
            pd_start,
            num_eval,
            out.get_snapshot_filepath().display()
        );
    } else {
        pb.finish_print(&format!("✓ {} ", "DONE".green().bold()));
        println!();

        // normalization happens here, outside the core; scale and
        // background come from the head of the parameter pool
        let pool = ParameterPool::new(&values, &info, details.num_weights());
        let pd_norm = result[nq];
        let intensity: Array1<f64> = result[..nq]
            .iter()
            .map(|&r| {
                if pd_norm > 0. {
                    pool.scale() * r / pd_norm + pool.background()
                } else {
                    pool.background()
                }
            })
            .collect();

        let entry = OutputEntry {
            accumulated: Some(Array1::from_vec(result[..nq].to_vec())),
            pd_norm: Some(pd_norm),
            intensity: Some(intensity.clone()),
            pd_start,
        };
        match out.append(entry) {
            Ok(_) => (),
            Err(_) => return out.emergency_join(),
        };

        // plain JSON copy of the normalized intensity for quick inspection
        let json_path = out.get_intensity_filepath();
        let json_file = File::create(json_path)
            .chain_err(|| format!("Unable to create '{}'.", json_path.display()))?;
        serde_json::to_writer(json_file, &intensity)
            .chain_err(|| "Unable to write the intensity JSON.")?;

        if out_at.final_snapshot {
            out.write_snapshot(&Snapshot {
                result: result.clone(),
                pd_start,
            })
            .chain_err(|| "Error writing last snapshot.")?;
        }
    }

    print!("Writing buffer to disk… ");
    let opath = out.get_output_filepath().to_str().unwrap().to_string();

    out.quit()?;

    println!("DONE '{}'.", opath);

    let stop_time = time::now();
    let duration = stop_time - start_time;
    println!(
        "Elapsed time: {}",
        timedisplay::pretty_print_duration(duration)
    );

    Ok(())
}
