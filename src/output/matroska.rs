// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use super::*;
use ffmpeg_next::{ codec, format, media, Dictionary, Packet };

/// Matroska through libavformat.
///
/// The newest packet is held back until the next one arrives, so every packet gets an
/// exact duration and `close` can give the last one the duration derived from the two
/// largest presentation timestamps.
pub struct MatroskaOutput {
    context: format::context::Output,
    time_base: ffmpeg_next::Rational,
    header_written: bool,
    pending: Option<Packet>,
    closed: bool,
}

impl MatroskaOutput {
    pub fn new(path: &str, options: OutputOptions) -> Result<Self, EncodingError> {
        ffmpeg_next::init()?;

        let mut context = format::output_as(&path, "matroska").map_err(|e| EncodingError::OutputNotFound(format!("{path}: {e}")))?;

        let mut metadata = Dictionary::new();
        metadata.set("creation_time", &chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true));
        for (k, v) in &options.custom_options {
            if let Some(key) = k.strip_prefix("metadata.") { metadata.set(key, v); }
        }
        context.set_metadata(metadata);

        Ok(Self {
            context,
            time_base: ffmpeg_next::Rational::new(1, 1000),
            header_written: false,
            pending: None,
            closed: false,
        })
    }

    fn write_header(&mut self) -> Result<(), EncodingError> {
        if !self.header_written {
            self.context.write_header().map_err(|e| EncodingError::WriteHeadersFailed(e.to_string()))?;
            self.header_written = true;
        }
        Ok(())
    }

    fn write_packet(&mut self, mut packet: Packet, duration: i64) -> Result<(), EncodingError> {
        packet.set_duration(duration.max(0));
        let stream_tb = self.context.stream(0).map(|s| s.time_base()).unwrap_or(self.time_base);
        packet.rescale_ts(self.time_base, stream_tb);
        packet.write(&mut self.context).map_err(|e| EncodingError::WriteFrameFailed(e.to_string()))
    }
}

impl OutputInterface for MatroskaOutput {
    fn configure_params(&self, params: &mut EncoderParams) {
        // Codec private data carries SPS/PPS
        params.repeat_headers = false;
    }

    fn configure(&mut self, params: &EncoderParams) -> Result<(), EncodingError> {
        let mut stream = self.context.add_stream(codec::Id::H264).map_err(|e| EncodingError::OutputConfigureFailed(e.to_string()))?;
        self.time_base = ffmpeg_next::Rational::new(params.time_base.0, params.time_base.1);
        stream.set_time_base(self.time_base);
        stream.set_rate(ffmpeg_next::Rational::new(params.fps.0, params.fps.1));
        stream.set_avg_frame_rate(ffmpeg_next::Rational::new(params.fps.0, params.fps.1));
        unsafe {
            let par = (*stream.as_mut_ptr()).codecpar;
            (*par).codec_type = media::Type::Video.into();
            (*par).codec_id = codec::Id::H264.into();
            (*par).width = params.width as i32;
            (*par).height = params.height as i32;
        }
        log::debug!("Configured matroska stream {}x{} time base {:?}", params.width, params.height, params.time_base);
        Ok(())
    }

    fn write_headers(&mut self, headers: &EncodedUnit) -> Result<usize, EncodingError> {
        if headers.data.is_empty() {
            return Err(EncodingError::WriteHeadersFailed("empty headers".into()));
        }
        unsafe {
            use ffmpeg_next::ffi::*;
            let mut stream = self.context.stream_mut(0).ok_or(EncodingError::OutputNotConfigured)?;
            let par = (*stream.as_mut_ptr()).codecpar;
            let size = headers.data.len();
            let extradata = av_mallocz(size + AV_INPUT_BUFFER_PADDING_SIZE as usize) as *mut u8;
            if extradata.is_null() {
                return Err(EncodingError::WriteHeadersFailed("out of memory".into()));
            }
            std::ptr::copy_nonoverlapping(headers.data.as_ptr(), extradata, size);
            av_freep(&mut (*par).extradata as *mut *mut u8 as *mut std::ffi::c_void);
            (*par).extradata = extradata;
            (*par).extradata_size = size as i32;
        }
        self.write_header()?;
        Ok(headers.size())
    }

    fn write_frame(&mut self, frame: &EncodedUnit) -> Result<usize, EncodingError> {
        if self.context.nb_streams() == 0 { return Err(EncodingError::OutputNotConfigured); }
        self.write_header()?;

        let mut packet = Packet::copy(&frame.data);
        packet.set_stream(0);
        packet.set_pts(Some(frame.picture.pts));
        packet.set_dts(Some(frame.picture.dts));
        if frame.picture.keyframe {
            packet.set_flags(ffmpeg_next::packet::Flags::KEY);
        }

        if let Some(previous) = self.pending.take() {
            let duration = frame.picture.dts - previous.dts().unwrap_or(frame.picture.dts);
            self.write_packet(previous, duration)?;
        }
        self.pending = Some(packet);
        Ok(frame.size())
    }

    fn close(&mut self, largest_pts: i64, second_largest_pts: i64) -> Result<(), EncodingError> {
        if self.closed {
            return Err(EncodingError::CloseFailed("output already closed".into()));
        }
        self.closed = true;

        if let Some(last) = self.pending.take() {
            self.write_packet(last, largest_pts - second_largest_pts)?;
        }
        if self.header_written {
            self.context.write_trailer().map_err(|e| EncodingError::CloseFailed(e.to_string()))?;
        }
        log::debug!("Closed matroska output, largest pts {largest_pts}, second largest {second_largest_pts}");
        Ok(())
    }
}
