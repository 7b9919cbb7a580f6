use anyhow::{bail, Context};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use z64scene_game_data::{Game, Scene, SceneFiles};
use z64scene_read::OwnedFile;

mod report;

#[derive(Debug, Parser)]
#[command(
    name = "z64scene",
    version,
    about = "Parses and rewrites Zelda 64 scene and room files"
)]
struct Args {
    /// Scene file. Its rooms are looked up next to it.
    scene: PathBuf,

    /// Which game's file formats to use (oot or mm).
    #[arg(long, default_value_t = Game::Oot)]
    game: Game,

    /// Write the scene and its rooms into this directory.
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Write twice and check that the second pass reproduces the first.
    #[arg(long)]
    verify: bool,

    /// Print every blob the parse found.
    #[arg(long)]
    dump_blobs: bool,
}

/// Room file naming schemes, in the order they are tried.
const ROOM_NAME_SCHEMES: usize = 4;

fn room_name(scheme: usize, stem: &str, n: usize) -> String {
    match scheme {
        0 => format!("{}_room_{}.zmap", stem, n),
        1 => format!("{}_room_{:02}.zmap", stem, n),
        2 => format!("{}_room_{}.zroom", stem, n),
        _ => format!("{}_room_{:02}.zroom", stem, n),
    }
}

/// Predicts the room files of a scene. The first naming scheme that finds room 0 is used for all
/// rooms, and the list ends at the first missing file.
fn room_paths(scene: &Path, count: usize) -> Vec<PathBuf> {
    let file_stem = scene
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    let stem = file_stem.strip_suffix("_scene").unwrap_or(file_stem);
    let dir = scene.parent().unwrap_or_else(|| Path::new(""));

    let first_room = (0..ROOM_NAME_SCHEMES).find(|&s| dir.join(room_name(s, stem, 0)).is_file());
    let scheme = match first_room {
        Some(scheme) => scheme,
        None => {
            if count > 0 {
                log::warn!("no room files found for {}", scene.display());
            }
            return vec![];
        }
    };
    let paths: Vec<PathBuf> = (0..count)
        .map(|n| dir.join(room_name(scheme, stem, n)))
        .take_while(|path| path.is_file())
        .collect();
    if paths.len() < count {
        log::warn!("found {} of {} rooms", paths.len(), count);
    }
    paths
}

fn load(path: &Path) -> anyhow::Result<OwnedFile> {
    OwnedFile::load(path).with_context(|| format!("failed to read {}", path.display()))
}

fn parse_files(game: Game, scene: Vec<u8>, rooms: Vec<Vec<u8>>) -> anyhow::Result<Scene> {
    let rooms = rooms.into_iter().map(OwnedFile::from).collect();
    Ok(Scene::parse(game, OwnedFile::from(scene), rooms)?)
}

fn verify(game: Game, first: &SceneFiles) -> anyhow::Result<()> {
    let mut scene = parse_files(game, first.scene.clone(), first.rooms.clone())
        .context("failed to parse the written scene")?;
    let second = scene.write()?;
    compare(first, &second)?;
    log::info!("second write is identical");
    Ok(())
}

fn compare(first: &SceneFiles, second: &SceneFiles) -> anyhow::Result<()> {
    if second.rooms.len() != first.rooms.len() {
        bail!(
            "second write has {} rooms, first had {}",
            second.rooms.len(),
            first.rooms.len()
        );
    }
    if second.scene != first.scene {
        bail!("scene changed on the second write");
    }
    for (i, (a, b)) in first.rooms.iter().zip(&second.rooms).enumerate() {
        if a != b {
            bail!("room {} changed on the second write", i);
        }
    }
    Ok(())
}

/// Writes each file under the name it was loaded from.
fn write_out(
    dir: &Path,
    scene: &Path,
    rooms: &[PathBuf],
    files: &SceneFiles,
) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let named = std::iter::once((scene, &files.scene))
        .chain(rooms.iter().map(PathBuf::as_path).zip(&files.rooms));
    for (source, data) in named {
        let name = source
            .file_name()
            .with_context(|| format!("{} has no file name", source.display()))?;
        let path = dir.join(name);
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("wrote {} (0x{:x} bytes)", path.display(), data.len());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let scene_file = load(&args.scene)?;
    let num_rooms = Scene::parse(args.game, scene_file.clone(), vec![])
        .with_context(|| format!("failed to parse {}", args.scene.display()))?
        .num_rooms();
    let room_paths = room_paths(&args.scene, num_rooms);
    let rooms = room_paths
        .iter()
        .map(|path| load(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut scene = Scene::parse(args.game, scene_file, rooms)
        .with_context(|| format!("failed to parse {}", args.scene.display()))?;
    report::examine_scene(&scene, &room_paths);
    if args.dump_blobs {
        report::dump_blobs(&scene);
    }

    if args.out.is_some() || args.verify {
        let files = scene.write()?;
        if args.verify {
            verify(args.game, &files)?;
        }
        if let Some(dir) = &args.out {
            write_out(dir, &args.scene, &room_paths, &files)?;
        }
    }
    Ok(())
}
