use crate::domain::jobs::{TranscodeRequest, PLAYLIST_WINDOW, SEGMENT_SECONDS};
use crate::ports::transcoder::TranscoderPort;
use std::ffi::OsString;
use std::io;
use std::process::Stdio;
use tokio::process::{Child, Command as TokioCommand};

/// Repackages a remote stream into a rolling live HLS playlist without re-encoding.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: String,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

pub fn hls_args(request: &TranscodeRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(19);
    args.push("-i".into());
    args.push(request.source_url.clone().into());
    args.push("-c:v".into());
    args.push("copy".into());
    args.push("-c:a".into());
    args.push("copy".into());
    args.push("-f".into());
    args.push("hls".into());
    args.push("-hls_time".into());
    args.push(SEGMENT_SECONDS.to_string().into());
    args.push("-hls_list_size".into());
    args.push(PLAYLIST_WINDOW.to_string().into());
    args.push("-hls_segment_filename".into());
    args.push(request.segment_path.clone().into());
    args.push("-hls_flags".into());
    args.push("delete_segments".into());
    args.push(request.output_path.clone().into());
    args
}

impl TranscoderPort for FfmpegTranscoder {
    fn name(&self) -> String {
        self.binary.clone()
    }

    fn spawn(&self, request: &TranscodeRequest) -> io::Result<Child> {
        TokioCommand::new(&self.binary)
            .args(hls_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }
}
