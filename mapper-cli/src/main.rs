use global_mapper::{is_valid_checkpoint, CheckpointManager, CheckpointSlot, MapperSettings};
use log::*;
use sfm_core::ViewGraph;
use sfm_io::{
    export_reconstruction, read_aux_state, snapshot_to_scene, ExportOptions, Snapshot,
    AUX_STATE_FILE,
};
use std::error::Error;
use std::path::PathBuf;
use std::process;
use structopt::StructOpt;

#[derive(StructOpt, Clone)]
#[structopt(name = "gsfm", about = "Tools around the global SfM mapper output")]
enum Opt {
    /// Lists the checkpoint slots below an output path.
    ///
    /// Shows which slots hold a valid checkpoint and which one a new run would resume from.
    Checkpoints {
        #[structopt(parse(from_os_str))]
        output_path: PathBuf,
        /// Settings file deciding the checkpoint formats.
        ///
        /// This is in the format of `global_mapper::MapperSettings`.
        #[structopt(short, long, default_value = "mapper-settings.json")]
        settings: PathBuf,
    },
    /// Exports a stored reconstruction, one directory per cluster.
    ///
    /// Clusters are taken from `view_graph.bin` next to the reconstruction when present.
    Export {
        /// Directory holding the reconstruction, a checkpoint slot for instance.
        #[structopt(short, long, parse(from_os_str))]
        input: PathBuf,
        #[structopt(short, long, parse(from_os_str))]
        output: PathBuf,
        /// Either `bin` or `txt`.
        #[structopt(long, default_value = "bin")]
        output_format: String,
        /// Image directory to sample point colors from.
        #[structopt(long, parse(from_os_str))]
        image_path: Option<PathBuf>,
        /// File with one image name per line restricting color sampling.
        #[structopt(long, parse(from_os_str))]
        image_list_path: Option<PathBuf>,
    },
    /// Prints the effective mapper settings as JSON.
    Settings {
        #[structopt(default_value = "mapper-settings.json")]
        settings: PathBuf,
    },
}

fn main() {
    pretty_env_logger::init_timed();
    let result = match Opt::from_args() {
        Opt::Checkpoints {
            output_path,
            settings,
        } => checkpoints(output_path, settings),
        Opt::Export {
            input,
            output,
            output_format,
            image_path,
            image_list_path,
        } => export(
            input,
            output,
            ExportOptions {
                output_format,
                image_path,
                image_list_path,
            },
        ),
        Opt::Settings { settings } => print_settings(settings),
    };
    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

fn checkpoints(output_path: PathBuf, settings: PathBuf) -> Result<(), Box<dyn Error>> {
    let settings = MapperSettings::load(settings)?;
    let manager = CheckpointManager::new(
        output_path,
        settings.checkpoint_format,
        settings.aux_format,
    );
    for slot in CheckpointSlot::ALL {
        let path = manager.slot_path(slot);
        let status = if is_valid_checkpoint(&path) {
            "valid"
        } else if path.exists() {
            "incomplete"
        } else {
            "missing"
        };
        println!("{:<20} {:<12} after {}", slot.dir_name(), status, slot.stage());
    }
    match manager.latest_valid() {
        Some(slot) => println!("a new run resumes after {}", slot.stage()),
        None => println!("a new run starts from scratch"),
    }
    Ok(())
}

fn export(input: PathBuf, output: PathBuf, options: ExportOptions) -> Result<(), Box<dyn Error>> {
    let snapshot = Snapshot::read(&input)?;
    info!(
        "loaded {} images and {} points from {}",
        snapshot.images.len(),
        snapshot.points3d.len(),
        input.display()
    );
    let mut scene = snapshot_to_scene(&snapshot);

    let aux_path = input.join(AUX_STATE_FILE);
    if aux_path.is_file() {
        let mut view_graph = ViewGraph::new();
        let summary = read_aux_state(&aux_path, &mut view_graph, &mut scene.frames)?;
        info!(
            "applied {} frame records from {}",
            summary.num_frames_updated,
            aux_path.display()
        );
        if summary.num_frames_skipped > 0 {
            warn!(
                "{} frame records name frames other than the image ids, their clusters are lost",
                summary.num_frames_skipped
            );
        }
    } else {
        info!("no {} found, exporting a single component", AUX_STATE_FILE);
    }

    for component in export_reconstruction(&output, &scene, &options)? {
        println!(
            "cluster {:>3}: {} images, {} points -> {}",
            component.cluster_id,
            component.num_images,
            component.num_points,
            component.path.display()
        );
    }
    Ok(())
}

fn print_settings(settings: PathBuf) -> Result<(), Box<dyn Error>> {
    let settings = MapperSettings::load(settings)?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
