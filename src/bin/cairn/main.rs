//! Cairn CLI - builds a cluster LOD hierarchy from a mesh file.
//!
//! Usage: cairn <INPUT> [-o OUTPUT_DIR] [-l LEAF_TRIANGLES]
//!
//! Run `cairn --help` for the full option list.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use cairn::hierarchy::{BuildOptions, LodDag};
use cairn::io;
use cairn::partition::{default_partitioner, paint_by_cluster};

#[derive(Parser)]
#[command(name = "cairn")]
#[command(author, version, about = "Cluster LOD hierarchy builder", long_about = None)]
struct Cli {
    /// Input mesh file (PLY)
    input: PathBuf,

    /// Output directory (defaults to the input file's directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target triangle count per leaf cluster
    #[arg(short, long, default_value = "128")]
    leaf_triangles: usize,

    /// Maximum clusters per simplification group
    #[arg(short = 'g', long, default_value = "4")]
    max_group_size: usize,

    /// Color each LOD mesh by cluster before saving (debug aid)
    #[arg(long)]
    paint: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = match &cli.output {
        Some(dir) => dir.clone(),
        None => cli
            .input
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    std::fs::create_dir_all(&output_dir)?;

    let mut mesh = io::load(&cli.input)?;
    println!(
        "Loaded: {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.triangle_count()
    );

    mesh.merge_duplicated_vertices();
    mesh.remove_unused_vertices();
    let components = mesh.split_connected_components();
    if components.len() > 1 {
        println!(
            "Input has {} connected components; processing the largest",
            components.len()
        );
        mesh = components.into_iter().next().unwrap();
        mesh.name = cli
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("mesh")
            .to_string();
    }
    println!(
        "Normalized: {} vertices, {} triangles{}",
        mesh.vertex_count(),
        mesh.triangle_count(),
        if mesh.is_manifold() { "" } else { " (non-manifold)" }
    );

    let options = BuildOptions::default()
        .with_leaf_triangles(cli.leaf_triangles)
        .with_max_group_size(cli.max_group_size);
    let partitioner = default_partitioner();

    let start = Instant::now();
    let dag = LodDag::build(&mesh, &options, &partitioner);
    let elapsed = start.elapsed();
    println!("Built {} LOD levels ({:.2?})", dag.lod_count(), elapsed);

    for lod in 0..dag.lod_count() {
        let level = dag.level(lod);
        let clusters: Vec<_> = level.iter().map(|n| n.cluster.clone()).collect();

        let mut lod_mesh = dag.lod_mesh(lod).clone();
        if cli.paint {
            paint_by_cluster(&mut lod_mesh, &clusters);
        }

        let mesh_path = output_dir.join(format!("{}_lod{lod}.ply", dag.name));
        io::save(&lod_mesh, &mesh_path)?;

        let meta_path = output_dir.join(format!("{}_lod{lod}_clusters.txt", dag.name));
        io::write_cluster_metadata(&meta_path, &clusters)?;

        println!(
            "  LOD {lod}: {} triangles, {} clusters -> {}",
            lod_mesh.triangle_count(),
            clusters.len(),
            mesh_path.display()
        );
    }

    Ok(())
}
