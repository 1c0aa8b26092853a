use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::{Vec2, Vec3, vec2};
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use jedi_soft::{
    config::{NumericMode, RenderConfig},
    math::{ANGLE_MAX, Angle},
    renderer::{AnyRenderer, Renderer, RendererExt, SectorDirty},
    world::{
        Camera, Colormap, JediModel, Level, LevelBuilder, ObjectFlags, ObjectPayload, Palette,
        SecObject, SectorFlags, SectorId, SectorSpec, Sky, Sprite, SpriteData, Texture, TextureBank,
        VoxelModel, WallFlags, WallTexture, encode_rle,
    },
};

const EYE_HEIGHT: f32 = 5.0;
const MOVE_SPEED: f32 = 0.4;
const TURN_SPEED: i32 = ANGLE_MAX / 96;
const LOOK_SPEED: i32 = ANGLE_MAX / 256;
const LOOK_LIMIT: i32 = ANGLE_MAX / 12;

/// Walk around a small built-in level with the software renderer.
#[derive(Debug, Parser)]
#[command(version, about)]
struct CliOptions {
    #[command(flatten)]
    render: RenderConfig,

    /// Log verbosity (off, error, warn, info, debug, trace)
    #[arg(long, default_value_t = log::LevelFilter::Info)]
    verbose: log::LevelFilter,

    /// Render without a window and exit
    #[arg(long)]
    headless: bool,

    /// Frames to render in headless mode
    #[arg(long, default_value_t = 120)]
    frames: u32,

    /// Write the last headless frame as a binary PPM
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Window scale factor
    #[arg(long, default_value_t = 3)]
    scale: usize,
}

fn main() -> anyhow::Result<()> {
    let options = CliOptions::parse();

    TermLogger::init(
        options.verbose,
        ConfigBuilder::default()
            .set_time_level(log::LevelFilter::Trace)
            .build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let mut bank = TextureBank::default_with_checker();
    let mut level = demo_level(&mut bank)?;
    log::info!(
        "level `{}`: {} sectors, {} objects",
        level.name,
        level.sectors.len(),
        level.objects.len()
    );

    let mut renderer = AnyRenderer::new(&options.render);
    renderer.copy_level(&level);

    let mut camera = Camera::new(Vec3::new(0.0, EYE_HEIGHT, -5.0), Angle::ZERO, 0);
    camera.camera_light = options.render.camera_light;

    if options.headless {
        headless(&options, &mut renderer, &mut level, &bank, &mut camera)
    } else {
        windowed(&options, &mut renderer, &mut level, &bank, &mut camera)
    }
}

/*────────────────────────────── demo level ──────────────────────────────*/

/// Hall with a grated doorway to a sunken cellar and an open courtyard.
fn demo_level(bank: &mut TextureBank) -> anyhow::Result<Level> {
    let palette = Palette::greyscale();
    bank.set_colormap(Colormap::fade_to_black(&palette));
    bank.set_palette(palette);

    let brick = bank.insert(
        "BRICK",
        Texture::from_fn("BRICK", 64, 64, |u, v| {
            let row = v / 16;
            let shift = if row % 2 == 0 { 0 } else { 16 };
            if v % 16 == 0 || (u + shift) % 32 == 0 {
                96
            } else {
                160 + ((u * 7 + v * 3) % 24) as u8
            }
        }),
    )?;
    let stone = bank.insert(
        "STONE",
        Texture::from_fn("STONE", 64, 64, |u, v| 120 + (((u / 8) ^ (v / 8)) * 5 % 40) as u8),
    )?;
    let floor = bank.insert(
        "FLOOR",
        Texture::from_fn("FLOOR", 64, 64, |u, v| {
            if (u / 32 + v / 32) % 2 == 0 { 180 } else { 110 }
        }),
    )?;
    let ceil = bank.insert("CEIL", Texture::solid("CEIL", 64, 64, 70))?;
    let sky = bank.insert(
        "SKY",
        Texture::from_fn("SKY", 256, 128, |u, v| {
            let cloud = ((u / 16 + v / 8) % 5 == 0) as u8 * 30;
            (250 - v as u8).saturating_sub(40) + cloud / 2
        }),
    )?;
    let grate = bank.insert(
        "GRATE",
        Texture::from_fn("GRATE", 32, 32, |u, v| {
            if u % 8 < 2 || v % 8 < 2 { 200 } else { 0 }
        }),
    )?;
    let sign = bank.insert(
        "SIGN",
        Texture::from_fn("SIGN", 32, 16, |u, v| {
            if u == 0 || v == 0 || u == 31 || v == 15 { 255 } else { 40 }
        }),
    )?;

    let mut b = LevelBuilder::new("demo");
    let hall = b.sector(
        SectorSpec::rect(vec2(-8.0, -8.0), vec2(8.0, 8.0), 0.0, 10.0)
            .walls(brick)
            .floor_tex(floor)
            .ceil_tex(ceil)
            .ambient(22),
    );
    let courtyard = b.sector(
        SectorSpec::rect(vec2(-8.0, 8.0), vec2(8.0, 32.0), 1.0, 24.0)
            .walls(stone)
            .floor_tex(floor)
            .ceil_tex(ceil)
            .ambient(30)
            .flags(SectorFlags::EXTERIOR),
    );
    let cellar = b.sector(
        SectorSpec::rect(vec2(8.0, -8.0), vec2(24.0, 8.0), -2.0, 8.0)
            .walls(stone)
            .floor_tex(floor)
            .ceil_tex(ceil)
            .ambient(12),
    );
    b.sky(Sky {
        texture: Some(sky),
        parallax: Vec2::new(2.0, 0.0),
    });

    let imp = Texture::from_fn("IMP", 16, 32, |u, v| {
        let dx = u as i32 - 8;
        let body = v > 8 && dx.abs() < 5;
        let head = v <= 8 && dx * dx + (v as i32 - 4) * (v as i32 - 4) < 16;
        if body || head { 140 + (v % 4) as u8 * 10 } else { 0 }
    });
    let imp = b.sprite(Sprite {
        name: "IMP".into(),
        width: imp.w,
        height: imp.h,
        anchor: (8, 32),
        world_scale: 0.2,
        data: SpriteData::Rle(encode_rle(&imp)),
    });
    let crate_model = b.model(JediModel::cube("CRATE", 1.5, 190));
    let pillar = b.voxel(VoxelModel::from_dense("PILLAR", [3, 12, 3], 0.5, |x, y, z| {
        let edge = x != 1 && z != 1;
        Some(if y == 11 { 230 } else if edge { 150 } else { 175 })
    }));

    b.object(SecObject::new(Vec3::new(-4.0, 0.0, 4.0), hall, ObjectPayload::Sprite(imp)));
    b.object(SecObject::new(Vec3::new(0.0, 2.5, 20.0), courtyard, ObjectPayload::Model(crate_model)));
    let mut lamp = SecObject::new(Vec3::new(16.0, -2.0, 0.0), cellar, ObjectPayload::Voxel(pillar));
    lamp.flags |= ObjectFlags::FULLBRIGHT;
    b.object(lamp);

    let mut level = b.build()?;

    // Grate across the cellar doorway, lit sign on the hall's west wall.
    let hall_sec = &mut level.sectors[hall as usize];
    for w in 0..hall_sec.walls.len() {
        let (a, c) = hall_sec.wall_endpoints(&hall_sec.walls[w]);
        let wall = &mut hall_sec.walls[w];
        if wall.adjoin.is_some_and(|adj| adj.sector == cellar) {
            wall.mid = Some(WallTexture::new(grate));
            wall.flags |= WallFlags::ADJ_MID_TRANS;
        } else if a.x == -8.0 && c.x == -8.0 {
            wall.sign = Some(WallTexture {
                tex: sign,
                offset: Vec2::new(-2.0, -3.0),
            });
            wall.flags |= WallFlags::ILLUM_SIGN;
        }
    }
    Ok(level)
}

/*──────────────────────────── frame drivers ─────────────────────────────*/

/// Move the camera and follow it into the sector it lands in. Moves that
/// leave the level are undone.
fn walk(level: &Level, camera: &mut Camera, forward: f32, side: f32) {
    let before = *camera;
    camera.step(forward, side);
    let p = Vec2::new(camera.pos.x, camera.pos.z);
    let here = level
        .sectors
        .get(camera.sector as usize)
        .filter(|s| s.contains(p))
        .map(|_| camera.sector)
        .or_else(|| level.sector_at(p));
    match here {
        Some(id) => {
            camera.sector = id;
            camera.pos.y = level.sectors[id as usize].floor_h + EYE_HEIGHT;
        }
        None => *camera = before,
    }
}

/// Per-frame world animation: spin the crate, move the cellar ceiling.
fn animate(level: &mut Level, renderer: &mut AnyRenderer, frame: u32) {
    const CELLAR: SectorId = 2;
    if let Some(obj) = level.objects.get_mut(1) {
        obj.yaw = (frame as f32 * 2.0) % 360.0;
    }
    if frame % 4 == 0 {
        if let Some(sec) = level.sectors.get_mut(CELLAR as usize) {
            sec.ceil_h = 8.0 + ((frame / 4) as f32 * 0.05).sin() * 1.5;
            renderer.update_sector(level, CELLAR, SectorDirty::SURFACE);
        }
    }
}

fn headless(
    options: &CliOptions,
    renderer: &mut AnyRenderer,
    level: &mut Level,
    bank: &TextureBank,
    camera: &mut Camera,
) -> anyhow::Result<()> {
    let mut indexed = Vec::new();
    let mut rgba = Vec::new();
    let started = Instant::now();

    for frame in 0..options.frames {
        animate(level, renderer, frame);
        camera.turn(Angle::new(TURN_SPEED / 2));
        renderer.set_camera(camera);
        renderer.draw_rgba(level, bank, &mut indexed, &mut rgba, |_, _, _| ());
        log::debug!("frame {frame}: {:?}", renderer.stats());
    }

    let elapsed = started.elapsed();
    let frames = options.frames.max(1);
    log::info!(
        "{} frames ({:?}) in {:.2?}, {:.2} ms/frame",
        options.frames,
        renderer.numeric(),
        elapsed,
        elapsed.as_secs_f64() * 1000.0 / frames as f64
    );
    log::info!("last frame: {:?}", renderer.stats());

    if let Some(path) = &options.dump {
        let (w, h) = renderer.resolution();
        let mut ppm = format!("P6\n{w} {h}\n255\n").into_bytes();
        for px in &rgba {
            ppm.extend_from_slice(&[(px >> 16) as u8, (px >> 8) as u8, *px as u8]);
        }
        std::fs::write(path, ppm)?;
        log::info!("wrote {}", path.display());
    }
    Ok(())
}

fn windowed(
    options: &CliOptions,
    renderer: &mut AnyRenderer,
    level: &mut Level,
    bank: &TextureBank,
    camera: &mut Camera,
) -> anyhow::Result<()> {
    let (w, h) = renderer.resolution();
    let scale = match options.scale {
        1 => minifb::Scale::X1,
        2 => minifb::Scale::X2,
        4 => minifb::Scale::X4,
        _ => minifb::Scale::FitScreen,
    };
    let mut win = Window::new(
        "Jedi Software Render",
        w,
        h,
        WindowOptions {
            scale,
            ..WindowOptions::default()
        },
    )?;
    win.set_target_fps(35);

    let mut indexed = Vec::new();
    let mut rgba = Vec::new();
    let mut frame = 0u32;

    // ────────────────── benchmarking state ──────────────────────────────
    let mut acc_time = Duration::ZERO;
    let mut acc_frames = 0usize;
    let mut last_print = Instant::now();

    while win.is_open() && !win.is_key_down(Key::Escape) {
        let t0 = Instant::now();

        /* movement --------------------------------------------------------- */
        let speed = if win.is_key_down(Key::LeftShift) { MOVE_SPEED * 2.0 } else { MOVE_SPEED };
        let mut forward = 0.0;
        let mut side = 0.0;
        if win.is_key_down(Key::Up) || win.is_key_down(Key::W) {
            forward += speed;
        }
        if win.is_key_down(Key::Down) || win.is_key_down(Key::S) {
            forward -= speed;
        }
        if win.is_key_down(Key::A) {
            side -= speed;
        }
        if win.is_key_down(Key::D) {
            side += speed;
        }
        if forward != 0.0 || side != 0.0 {
            walk(level, camera, forward, side);
        }
        if win.is_key_down(Key::Left) {
            camera.turn(Angle::new(-TURN_SPEED));
        }
        if win.is_key_down(Key::Right) {
            camera.turn(Angle::new(TURN_SPEED));
        }
        if win.is_key_down(Key::PageUp) {
            camera.look(LOOK_SPEED, LOOK_LIMIT);
        }
        if win.is_key_down(Key::PageDown) {
            camera.look(-LOOK_SPEED, LOOK_LIMIT);
        }

        /* toggles ---------------------------------------------------------- */
        if win.is_key_pressed(Key::L, KeyRepeat::No) {
            camera.camera_light = !camera.camera_light;
        }
        if win.is_key_pressed(Key::B, KeyRepeat::No) {
            camera.ambient_override = match camera.ambient_override {
                None => Some(31),
                Some(_) => None,
            };
        }
        if win.is_key_pressed(Key::F, KeyRepeat::No) {
            let mut config = options.render.clone();
            config.numeric = match renderer.numeric() {
                NumericMode::Fixed => NumericMode::Float,
                NumericMode::Float => NumericMode::Fixed,
            };
            *renderer = AnyRenderer::new(&config);
            renderer.copy_level(level);
            log::info!("switched to {:?}", config.numeric);
        }

        /* draw ------------------------------------------------------------- */
        animate(level, renderer, frame);
        frame = frame.wrapping_add(1);
        renderer.set_camera(camera);
        renderer.draw_rgba(level, bank, &mut indexed, &mut rgba, |fb, w, h| {
            acc_time += t0.elapsed();
            acc_frames += 1;
            win.update_with_buffer(fb, w, h)
        })?;

        // ─────────── accumulate & report every ~3 s ────────────────────
        if last_print.elapsed() >= Duration::from_secs(3) {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames.max(1) as f64;
            log::info!(
                "avg render: {:.2} ms ({:.1} FPS), {:?}",
                avg_ms,
                1000.0 / avg_ms,
                renderer.stats()
            );
            acc_time = Duration::ZERO;
            acc_frames = 0;
            last_print = Instant::now();
        }
    }
    Ok(())
}
