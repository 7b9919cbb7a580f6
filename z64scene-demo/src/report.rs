use std::path::PathBuf;
use z64scene_datablob::DataBlobList;
use z64scene_game_data::header_room::RoomHeader;
use z64scene_game_data::header_scene::{SceneCutscenes, SceneHeader};
use z64scene_game_data::Scene;

fn count<T>(list: &Option<Vec<T>>) -> String {
    match list {
        Some(list) => list.len().to_string(),
        None => "-".to_string(),
    }
}

fn examine_cutscenes(cutscene: &SceneCutscenes) {
    match cutscene {
        SceneCutscenes::Oot(cutscene) => {
            let names: Vec<_> = cutscene.commands.iter().map(|c| c.name()).collect();
            println!(
                "    cutscene: {} frames, {}",
                cutscene.frame_count,
                names.join(" ")
            );
        }
        SceneCutscenes::Mm(list) => {
            for (i, entry) in list.iter().enumerate() {
                match &entry.script {
                    Some(script) => {
                        let names: Vec<_> = script.commands.iter().map(|c| c.name()).collect();
                        println!(
                            "    cutscene {}: {} frames, {}",
                            i,
                            script.frame_count,
                            names.join(" ")
                        );
                    }
                    None => println!("    cutscene {}: none", i),
                }
            }
        }
    }
}

fn examine_scene_header(index: usize, header: &SceneHeader) {
    if header.is_blank {
        println!("  header {}: blank", index);
        return;
    }
    println!(
        "  header {}: spawns {}, rooms {}, lights {}, paths {}, doorways {}, exits {}, \
         unhandled {}",
        index,
        count(&header.spawns),
        count(&header.room_list),
        count(&header.lights),
        count(&header.paths),
        count(&header.doorways),
        count(&header.exits),
        header.unhandled_commands.len(),
    );
    if let Some(cutscene) = &header.cutscene {
        examine_cutscenes(cutscene);
    }
    if let Some(materials) = &header.texture_animation {
        println!("    {} animated materials", materials.len());
    }
}

fn examine_room_header(index: usize, header: &RoomHeader) {
    if header.is_blank {
        println!("    header {}: blank", index);
        return;
    }
    let mesh_entries = header.mesh.as_ref().map_or(0, |mesh| mesh.entries().len());
    println!(
        "    header {}: actors {}, objects {}, mesh entries {}, unhandled {}",
        index,
        count(&header.actors),
        count(&header.objects),
        mesh_entries,
        header.unhandled_commands.len(),
    );
}

pub fn examine_scene(scene: &Scene, room_paths: &[PathBuf]) {
    println!("{} scene, {} headers", scene.game, scene.headers.len());
    if let Some(collision) = &scene.collision {
        println!(
            "  collision: {} vertices, {} polygons, {} exits",
            collision.vertices.len(),
            collision.triangles.len(),
            collision.num_exits()
        );
    }
    for (i, header) in scene.headers.iter().enumerate() {
        examine_scene_header(i, header);
    }
    for (room, path) in scene.rooms.iter().zip(room_paths) {
        println!("  room {}", path.display());
        for (i, header) in room.headers.iter().enumerate() {
            examine_room_header(i, header);
        }
    }
}

fn dump_list(name: &str, list: &DataBlobList) {
    println!("{} ({} blobs)", name, list.len());
    let mut blobs: Vec<_> = list.iter().collect();
    blobs.sort_by_key(|blob| blob.original_addr);
    for blob in blobs {
        println!(
            "  {:?} 0x{:06x} {:?} {:?} refs {}{}",
            blob.original_addr,
            blob.size,
            blob.kind,
            blob.subtype,
            blob.refs().len(),
            if blob.is_dead() { " (dead)" } else { "" },
        );
    }
}

pub fn dump_blobs(scene: &Scene) {
    dump_list("scene", &scene.blobs);
    for (i, room) in scene.rooms.iter().enumerate() {
        dump_list(&format!("room {}", i), &room.blobs);
    }
}
