// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use super::*;
use std::collections::VecDeque;
use ffmpeg_next::{ codec, format::Pixel, Dictionary };

pub struct FfmpegEncoder {
    encoder: ffmpeg_next::encoder::video::Encoder,
    frame: ffmpeg_next::frame::Video,
    params: EncoderParams,

    queued: VecDeque<EncodedUnit>,
    submitted: usize,
    returned: usize,
    flushing: bool,
    finished: bool,
}

impl FfmpegEncoder {
    pub fn new(mut params: EncoderParams) -> Result<Self, EncodingError> {
        ffmpeg_next::init()?;

        let codec = ffmpeg_next::encoder::find_by_name("libx264")
            .or_else(|| ffmpeg_next::encoder::find(codec::Id::H264))
            .ok_or(EncodingError::EncoderNotFound)?;

        let mut video = codec::context::Context::new_with_codec(codec).encoder().video()?;
        video.set_width(params.width);
        video.set_height(params.height);
        video.set_format(Pixel::YUV420P);
        video.set_time_base(ffmpeg_next::Rational::new(params.time_base.0, params.time_base.1));
        video.set_frame_rate(Some(ffmpeg_next::Rational::new(params.fps.0, params.fps.1)));
        if !params.repeat_headers {
            // SPS/PPS go to extradata instead of the stream
            video.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let mut options = Dictionary::new();
        options.set("preset", &params.preset);
        if let Some(profile) = &params.profile {
            options.set("profile", profile);
        }
        if let Some(x264_params) = crate::util::select_custom_option(&params.custom_options, &["x264.params", "x264-params"]) {
            options.set("x264-params", x264_params);
        }

        let encoder = video.open_with(options).map_err(|e| EncodingError::EncoderOpenFailed(e.to_string()))?;

        // The encoder may adjust the time base, and libavcodec always emits Annex-B framing
        unsafe {
            let ctx = encoder.as_ptr();
            params.time_base = Rational((*ctx).time_base.num, (*ctx).time_base.den);
            params.width = (*ctx).width as u32;
            params.height = (*ctx).height as u32;
        }
        params.annexb = true;
        log::debug!("Opened {} encoder {}x{} time base {:?}", codec.name(), params.width, params.height, params.time_base);

        Ok(Self {
            frame: ffmpeg_next::frame::Video::new(Pixel::YUV420P, params.width, params.height),
            encoder,
            params,
            queued: VecDeque::new(),
            submitted: 0,
            returned: 0,
            flushing: false,
            finished: false,
        })
    }

    fn receive(&mut self) -> Result<(), EncodingError> {
        loop {
            let mut packet = ffmpeg_next::Packet::empty();
            match self.encoder.receive_packet(&mut packet) {
                Ok(()) => {
                    let pts = packet.pts().unwrap_or(0);
                    self.queued.push_back(EncodedUnit {
                        data: packet.data().map(|d| d.to_vec()).unwrap_or_default(),
                        picture: OutputPicture { pts, dts: packet.dts().unwrap_or(pts), keyframe: packet.is_key() },
                    });
                },
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::error::EAGAIN => return Ok(()),
                Err(ffmpeg_next::Error::Eof) => { self.finished = true; return Ok(()); },
                Err(e) => return Err(EncodingError::EncodeFailed { frame: None, reason: e.to_string() }),
            }
        }
    }

    fn next_unit(&mut self) -> Option<EncodedUnit> {
        let unit = self.queued.pop_front()?;
        self.returned += 1;
        Some(unit)
    }
}

impl EncoderInterface for FfmpegEncoder {
    fn parameters(&self) -> &EncoderParams { &self.params }

    fn headers(&mut self) -> Result<EncodedUnit, EncodingError> {
        let extradata = unsafe {
            let ctx = self.encoder.as_ptr();
            if (*ctx).extradata.is_null() || (*ctx).extradata_size <= 0 {
                return Err(EncodingError::HeadersFailed("encoder has no global headers".into()));
            }
            std::slice::from_raw_parts((*ctx).extradata, (*ctx).extradata_size as usize).to_vec()
        };
        Ok(EncodedUnit { data: extradata, picture: OutputPicture::default() })
    }

    fn encode(&mut self, picture: Option<&Picture>) -> Result<Option<EncodedUnit>, EncodingError> {
        match picture {
            Some(picture) => {
                // The encoder may still reference the previous frame's buffers
                if unsafe { ffmpeg_next::ffi::av_frame_make_writable(self.frame.as_mut_ptr()) } < 0 {
                    return Err(EncodingError::EncodeFailed { frame: None, reason: "frame is not writable".into() });
                }
                for plane in 0..3 {
                    let (plane_w, plane_h) = picture.plane_dimensions(plane);
                    let (src_stride, dst_stride) = (picture.stride(plane), self.frame.stride(plane));
                    let src = picture.plane(plane);
                    let dst = self.frame.data_mut(plane);
                    for y in 0..plane_h as usize {
                        dst[y * dst_stride..y * dst_stride + plane_w as usize]
                            .copy_from_slice(&src[y * src_stride..y * src_stride + plane_w as usize]);
                    }
                }
                self.frame.set_pts(Some(picture.pts));
                self.encoder.send_frame(&self.frame).map_err(|e| EncodingError::EncodeFailed { frame: Some(picture.pts as usize), reason: e.to_string() })?;
                self.submitted += 1;
            },
            None if !self.flushing => {
                self.encoder.send_eof().map_err(|e| EncodingError::EncodeFailed { frame: None, reason: e.to_string() })?;
                self.flushing = true;
            },
            None => { }
        }
        if !self.finished {
            self.receive()?;
        }
        Ok(self.next_unit())
    }

    fn delayed_frames(&self) -> usize {
        if self.finished && self.queued.is_empty() { return 0; }
        self.submitted.saturating_sub(self.returned)
    }
}
