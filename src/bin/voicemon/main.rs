//! voicemon - watch the voice allocator work
//!
//! Renders a short scripted performance offline and prints the voice pool
//! after every block.
//!
//! Run with: cargo run --bin voicemon -- [poly|mono|legato] [unison]

mod script;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};

use saavy_voices::{
    io::{converter::midi_to_event, midi::MidiEvent},
    synth::SynthEvent,
    voices::SineVoice,
    EngineConfig, PolyMode, PolySynth,
};

const SAMPLE_RATE: f32 = 48_000.0;
const BLOCK_SIZE: usize = 256;
const VOICES: usize = 8;

fn parse_mode(arg: Option<&str>) -> EyreResult<PolyMode> {
    match arg.unwrap_or("poly") {
        "poly" => Ok(PolyMode::Poly),
        "mono" => Ok(PolyMode::Mono),
        "legato" => Ok(PolyMode::MonoLegato),
        other => Err(eyre!("unknown mode {other:?}, expected poly, mono or legato")),
    }
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = parse_mode(args.first().map(String::as_str))?;
    let unison = match args.get(1) {
        Some(arg) => arg
            .parse::<usize>()
            .wrap_err_with(|| format!("invalid unison count {arg:?}"))?,
        None => 1,
    };

    let config = EngineConfig::default()
        .with_poly_mode(mode)
        .with_active_voices(VOICES)
        .with_unison_voices(unison)
        .with_sample_rate(SAMPLE_RATE)
        .with_block_size(BLOCK_SIZE);

    let mut synth = PolySynth::with_factory(config, || SineVoice::new(SAMPLE_RATE))
        .wrap_err("failed to build synth")?;

    let script = script::performance(SAMPLE_RATE);
    let total_frames = script.last().map_or(0, |(frame, _)| *frame) + SAMPLE_RATE as usize / 2;

    println!("=== voicemon ===");
    println!("Mode: {mode:?}, unison {unison}, {VOICES} voices");
    println!("Sample rate: {SAMPLE_RATE} Hz, block {BLOCK_SIZE} frames");
    println!();

    let mut left = vec![0.0f32; BLOCK_SIZE];
    let mut right = vec![0.0f32; BLOCK_SIZE];
    let mut pending = script.into_iter().peekable();
    let mut block_start = 0;

    while block_start < total_frames {
        let frames = BLOCK_SIZE.min(total_frames - block_start);

        let mut notes = Vec::new();
        let block_end = block_start + frames;
        while let Some((frame, bytes)) = pending.next_if(|(frame, _)| *frame < block_end) {
            let Some(event) = MidiEvent::from_bytes(&bytes).and_then(midi_to_event) else {
                continue;
            };
            if let SynthEvent::NoteOn { note, .. } | SynthEvent::NoteOff { note, .. } = event {
                notes.push(note);
            }
            synth.enqueue(event.at(frame - block_start));
        }

        let silent = synth.process_block(
            &[],
            &mut [&mut left[..frames], &mut right[..frames]],
            frames,
        );

        if !notes.is_empty() || !silent {
            let peak = left[..frames].iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
            println!(
                "{:>6.3}s  {}  active {:>2}  peak {:.3}  held {:?}",
                block_start as f32 / SAMPLE_RATE,
                &synth.voice_status()[..VOICES],
                synth.active_voice_count(),
                peak,
                synth.held_keys().iter().map(|k| k.key).collect::<Vec<_>>(),
            );
        }

        block_start += frames;
    }

    println!();
    println!("Done. Last key: {:?}", synth.previous_key());
    Ok(())
}
