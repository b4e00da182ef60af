use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cache::{CacheStats, GeometryCache};
use foundation::math::{Vec3, lat_lon_to_vec3};
use formats::FeatureSet;
use layers::{
    BorderLineOptions, DiagnosticsLog, PipelineOptions, TerritoryOptions, build_border_lines,
    build_territory_polygons,
};
use scene::{BorderIndex, Camera, IdPickingPass};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let mut args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let cmd = args[1].clone();
    args.drain(0..2);

    match cmd.as_str() {
        "build" => cmd_build(args),
        "probe" => cmd_probe(args),
        "pick" => cmd_pick(args),
        _ => Err(usage()),
    }
}

#[derive(Debug, Serialize)]
struct BuildReport {
    input: String,
    border_lines: usize,
    border_vertices: usize,
    territory_features: usize,
    territory_primitives: usize,
    territory_vertices: usize,
    territory_triangles: usize,
    wall_triangles: usize,
    projections: BTreeMap<String, usize>,
    diagnostics: BTreeMap<String, u64>,
    cache: CacheStats,
}

fn cmd_build(args: Vec<String>) -> Result<(), String> {
    // atlas-borders build <input.geojson> [--config FILE] [--thickness T] [--radius R] [--elevation E] [--repeat N]
    let mut input: Option<PathBuf> = None;
    let mut config: Option<PathBuf> = None;
    let mut territory = TerritoryOptions::default();
    let mut repeat: usize = 1;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                config = Some(PathBuf::from(flag_value(&args, &mut i, "--config")?));
            }
            "--thickness" => {
                territory.thickness = parse_f64(flag_value(&args, &mut i, "--thickness")?, "--thickness")?;
            }
            "--radius" => {
                territory.radius = parse_f64(flag_value(&args, &mut i, "--radius")?, "--radius")?;
            }
            "--elevation" => {
                territory.elevation = parse_f64(flag_value(&args, &mut i, "--elevation")?, "--elevation")?;
            }
            "--repeat" => {
                let v = flag_value(&args, &mut i, "--repeat")?;
                repeat = v.parse().map_err(|_| format!("invalid --repeat value: {v}"))?;
            }
            s if s.starts_with('-') => {
                return Err(format!("unknown arg: {s}\n\n{}", usage()));
            }
            _ if input.is_none() => input = Some(PathBuf::from(&args[i])),
            s => return Err(format!("unexpected argument: {s}\n\n{}", usage())),
        }
        i += 1;
    }
    let input = input.ok_or_else(usage)?;

    let pipeline = match &config {
        Some(path) => PipelineOptions::load_json_file(path).map_err(|e| e.to_string())?,
        None => PipelineOptions::default(),
    };
    let features = load_features(&input)?;
    info!(
        lines = features.lines.len(),
        polygons = features.polygons.len(),
        "loaded {}",
        input.display()
    );

    let borders = build_border_lines(
        &features.lines,
        &BorderLineOptions {
            radius: territory.radius,
            elevation: territory.elevation,
            ..BorderLineOptions::default()
        },
    );

    let mut cache = GeometryCache::new(pipeline.cache.clone());
    let mut log = DiagnosticsLog::new();
    let mut group = build_territory_polygons(&features.polygons, &territory, &pipeline, &mut cache, Some(&mut log));
    for pass in 1..repeat {
        group = build_territory_polygons(&features.polygons, &territory, &pipeline, &mut cache, Some(&mut log));
        info!(pass, hit_rate = cache.stats().hit_rate, "rebuilt territories");
    }

    let mut projections: BTreeMap<String, usize> = BTreeMap::new();
    let mut wall_triangles = 0;
    for primitive in &group.primitives {
        let mesh = primitive.mesh();
        *projections.entry(mesh.projection.to_string()).or_insert(0) += 1;
        wall_triangles += mesh.wall_triangles;
    }
    let territory_features = group
        .primitives
        .iter()
        .map(|p| p.feature_id.as_str())
        .collect::<std::collections::BTreeSet<_>>()
        .len();

    let report = BuildReport {
        input: input.display().to_string(),
        border_lines: borders.len(),
        border_vertices: borders.vertex_count(),
        territory_features,
        territory_primitives: group.len(),
        territory_vertices: group.vertex_count(),
        territory_triangles: group.triangle_count(),
        wall_triangles,
        projections,
        diagnostics: log.counters().clone(),
        cache: cache.dispose(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).map_err(|e| format!("json: {e}"))?
    );
    Ok(())
}

fn cmd_probe(args: Vec<String>) -> Result<(), String> {
    // atlas-borders probe <input.geojson> <lon> <lat> [--radius DEG]
    if args.len() < 3 {
        return Err(usage());
    }
    let input = PathBuf::from(&args[0]);
    let lon = parse_f64(&args[1], "lon")?;
    let lat = parse_f64(&args[2], "lat")?;
    let mut radius_deg = 1.0;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--radius" => {
                radius_deg = parse_f64(flag_value(&args, &mut i, "--radius")?, "--radius")?;
            }
            s => return Err(format!("unknown arg: {s}\n\n{}", usage())),
        }
        i += 1;
    }

    let features = load_features(&input)?;
    let index = BorderIndex::build(&features.lines);
    info!(segments = index.len(), "border index ready");
    match index.query_nearest_segment_id(lon, lat, radius_deg) {
        Some(id) => println!("{id}"),
        None => println!("none"),
    }
    Ok(())
}

fn cmd_pick(args: Vec<String>) -> Result<(), String> {
    // atlas-borders pick <input.geojson> <lon> <lat> [--size PX] [--distance D]
    if args.len() < 3 {
        return Err(usage());
    }
    let input = PathBuf::from(&args[0]);
    let lon = parse_f64(&args[1], "lon")?;
    let lat = parse_f64(&args[2], "lat")?;
    let mut size: u32 = 256;
    let mut distance = 3.0;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--size" => {
                let v = flag_value(&args, &mut i, "--size")?;
                size = v.parse().map_err(|_| format!("invalid --size value: {v}"))?;
            }
            "--distance" => {
                distance = parse_f64(flag_value(&args, &mut i, "--distance")?, "--distance")?;
            }
            s => return Err(format!("unknown arg: {s}\n\n{}", usage())),
        }
        i += 1;
    }
    if size == 0 {
        return Err("--size must be > 0".to_string());
    }
    if distance <= 1.0 {
        return Err("--distance must be > 1 (globe radius is 1)".to_string());
    }

    let features = load_features(&input)?;
    let pipeline = PipelineOptions::default();
    let mut cache = GeometryCache::new(pipeline.cache.clone());
    let territory = TerritoryOptions::default();
    let group = build_territory_polygons(&features.polygons, &territory, &pipeline, &mut cache, None);

    // Look straight down at (lat, lon) from `distance` globe radii; the up
    // vector follows the local north unless the camera sits over a pole.
    let eye = lat_lon_to_vec3(lat, lon, distance - 1.0, 1.0);
    let up = if lat.abs() > 89.0 {
        Vec3::new(0.0, 0.0, 1.0)
    } else {
        Vec3::new(0.0, 1.0, 0.0)
    };
    let camera = Camera::look_at(eye, Vec3::ZERO, 45f64.to_radians(), 0.01, distance * 2.0).with_up(up);

    let mut pass = IdPickingPass::new(size, size);
    pass.set_camera(camera);
    match pass.get_id_at_normalized(&group, 0.5, 0.5) {
        Some(id) => println!("{id}"),
        None => println!("none"),
    }
    Ok(())
}

fn load_features(path: &Path) -> Result<FeatureSet, String> {
    let payload = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
    FeatureSet::from_geojson_str(&payload).map_err(|e| format!("{}: {e}", path.display()))
}

fn flag_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_f64(v: &str, what: &str) -> Result<f64, String> {
    let parsed: f64 = v.parse().map_err(|_| format!("invalid {what} value: {v}"))?;
    if !parsed.is_finite() {
        return Err(format!("invalid {what} value: {v}"));
    }
    Ok(parsed)
}

fn usage() -> String {
    let exe = env::args().next().unwrap_or_else(|| "atlas-borders".to_string());
    format!(
        "Usage:\n  {exe} build <input.geojson> [--config FILE] [--thickness T] [--radius R] [--elevation E] [--repeat N]\n  {exe} probe <input.geojson> <lon> <lat> [--radius DEG]\n  {exe} pick <input.geojson> <lon> <lat> [--size PX] [--distance D]\n\nNotes:\n- `build` prints a JSON report (mesh counts, projections, diagnostics, cache stats) to stdout.\n- `probe` prints the id of the nearest border line within the probe radius, or `none`.\n- `pick` renders the territory id pass looking straight down at lon/lat and prints the id under the center pixel.\n- Log verbosity follows RUST_LOG (default: info); logs go to stderr.\n"
    )
}
