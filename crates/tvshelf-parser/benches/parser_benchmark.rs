//! Benchmarks for tvshelf-parser.
//!
//! Run with: cargo bench -p tvshelf-parser

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::path::Path;
use tvshelf_parser::{normalize_show_name, parse, show_name_match_key};

const PLEX_SAMPLES: &[&str] = &[
    "/media/TV Shows/Firefly (2002)/Season 01/Firefly - S01E01 - Serenity.mkv",
    "/media/TV Shows/The Office (2005)/Season 02/The Office - S02E01 - The Dundies.mkv",
    "/media/TV Shows/Doctor Who (2005)/Specials/Doctor Who - S00E03 - The Next Doctor.mkv",
    "/media/TV Shows/Breaking Bad (2008)/Season 5/05 - Dead Freight.mp4",
];

const SCENE_SAMPLES: &[&str] = &[
    "/downloads/Breaking.Bad.S01E01.720p.BluRay.x264-DEMAND.mkv",
    "/downloads/Game.of.Thrones.S08E06.1080p.WEB-DL.DD5.1.H.264-GoT.mkv",
    "/downloads/Stranger.Things.S04E09.Chapter.Nine.The.Piggyback.2160p.NF.WEB-DL.mkv",
    "/downloads/The.Wire.3x11.Mission.Accomplished.DVDRip.avi",
];

const UNPARSEABLE_SAMPLES: &[&str] = &[
    "/media/home videos/birthday party.mkv",
    "/movies/Some.Movie.2019.1920x1080.mkv",
];

fn bench_parse_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_single");

    group.bench_function("plex_layout", |b| {
        b.iter(|| parse(black_box(Path::new(PLEX_SAMPLES[0]))))
    });
    group.bench_function("scene_name", |b| {
        b.iter(|| parse(black_box(Path::new(SCENE_SAMPLES[1]))))
    });
    group.bench_function("unparseable", |b| {
        b.iter(|| parse(black_box(Path::new(UNPARSEABLE_SAMPLES[0]))))
    });

    group.finish();
}

fn bench_parse_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_batch");

    for (name, samples) in [
        ("plex", PLEX_SAMPLES),
        ("scene", SCENE_SAMPLES),
        ("unparseable", UNPARSEABLE_SAMPLES),
    ] {
        group.throughput(Throughput::Elements(samples.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| {
                for sample in samples {
                    black_box(parse(black_box(Path::new(sample))));
                }
            })
        });
    }

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize_and_key", |b| {
        b.iter(|| {
            let name = normalize_show_name(black_box("Marvel's.Agents.of.S.H.I.E.L.D._-"));
            show_name_match_key(&name)
        })
    });
}

criterion_group!(benches, bench_parse_single, bench_parse_batch, bench_normalize);
criterion_main!(benches);
