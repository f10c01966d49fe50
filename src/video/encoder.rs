// Temporary video file writer.
//
// Raw RGB24 frames are piped to the external transcoding tool's stdin; the
// tool owns the container format, so the writer only checks the exit status.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};

use tracing::info;

use super::camera::VideoFrame;

pub struct FfmpegWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    path: PathBuf,
    frame_len: usize,
}

impl FfmpegWriter {
    /// Spawn the external tool reading rawvideo from stdin into `path`.
    ///
    /// Output streams are suppressed; the invocation is judged by its exit
    /// status alone.
    pub fn spawn(
        program: &str,
        path: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> io::Result<Self> {
        let mut child = Command::new(program)
            .args(["-y", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(format!("{width}x{height}"))
            .arg("-r")
            .arg(fps.to_string())
            .args(["-i", "-", "-an"])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "encoder stdin unavailable")
        })?;

        info!("video encoder started: {}", path.display());

        Ok(Self {
            child,
            stdin: Some(stdin),
            path: path.to_path_buf(),
            frame_len: (width * height * 3) as usize,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pipe one frame to the encoder.
    pub fn write_frame(&mut self, frame: &VideoFrame) -> io::Result<()> {
        if frame.data.len() != self.frame_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "frame is {} bytes, encoder expects {}",
                    frame.data.len(),
                    self.frame_len
                ),
            ));
        }
        match self.stdin.as_mut() {
            Some(stdin) => stdin.write_all(&frame.data),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "encoder already finished",
            )),
        }
    }

    /// Close the pipe and wait for the encoder to exit.
    pub fn finish(mut self) -> io::Result<ExitStatus> {
        // Dropping stdin signals end-of-stream to the tool.
        drop(self.stdin.take());
        self.child.wait()
    }
}
