// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use encode_mux::*;

const DEFAULT_INPUT: &str = "RedGreen.bmp";
const FRAME_COUNT: usize = 1000;
const FPS: f32 = 10.0;

fn main() {
    let _ = simple_log::new(simple_log::LogConfig::default());

    let mut gen_raw = false;
    let mut input = DEFAULT_INPUT.to_string();
    for arg in std::env::args().skip(1) {
        if arg == "gen_raw" {
            gen_raw = true;
        } else {
            input = arg;
        }
    }

    let code = match run(&input, gen_raw) {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{:?} stage failed: {e}", e.stage());
            1
        }
    };
    std::process::exit(code);
}

fn run(input: &str, gen_raw: bool) -> Result<(), EncodingError> {
    let _time = std::time::Instant::now();
    let frame = read_bmp(input)?;
    let (width, height) = (frame.width, frame.height);
    let mut source = RepeatedFrameSource::new(frame, FRAME_COUNT);

    if gen_raw {
        let path = format!("{input}.raw");
        let file = std::io::BufWriter::new(std::fs::File::create(&path)?);
        let frames = write_raw_frames(file, &mut source)?;
        log::info!("Wrote {frames} raw frames to {path}");
        return Ok(());
    }

    let kind = if cfg!(feature = "ffmpeg") { ConverterKind::Ffmpeg } else { ConverterKind::Software };
    let mut converter = ColorConverter::new(kind)?;

    let path = if cfg!(feature = "ffmpeg") { format!("{input}.mkv") } else { format!("{input}.264") };
    let mut output = Output::new(path.clone(), OutputOptions::default())?;

    let mut pipeline = EncodePipeline::new(EncoderParams::new(width, height, FPS, FRAME_COUNT));
    let report = pipeline.run(Encoder::new, &mut source, &mut converter, &mut output).into_result()?;

    log::info!("{path}: {} frames, {} bytes, {:.3}s of video", report.frames_output, report.bytes_written, report.duration);
    log::info!("Done in {:.3}s", _time.elapsed().as_millis() as f64 / 1000.0);
    Ok(())
}
