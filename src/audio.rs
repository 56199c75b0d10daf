use crate::error::{ReaderError, Result};
use rodio::{Decoder, OutputStream, Sink};
use std::io::Cursor;
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

enum SinkCommand {
    Play {
        data: Vec<u8>,
        done: oneshot::Sender<std::result::Result<(), String>>,
    },
    Pause,
    Resume,
    Stop {
        ack: oneshot::Sender<()>,
    },
}

/// Playback device handle. The rodio output stream is not `Send`, so a
/// dedicated thread owns it and is fed over a command channel; at most one
/// buffer plays at a time. `play` resolves when the buffer finishes or is
/// stopped; the two are not distinguished at this layer.
pub struct AudioSink {
    tx: Sender<SinkCommand>,
}

impl AudioSink {
    pub fn new() -> Result<Self> {
        let (tx, rx) = channel::<SinkCommand>();
        let (init_tx, init_rx) = channel::<std::result::Result<(), String>>();

        thread::spawn(move || {
            // Audio stream must live on this thread
            let (_stream, stream_handle) = match OutputStream::try_default() {
                Ok(pair) => {
                    let _ = init_tx.send(Ok(()));
                    pair
                }
                Err(e) => {
                    let _ = init_tx.send(Err(format!("no audio output device: {}", e)));
                    return;
                }
            };

            let mut current: Option<(Sink, oneshot::Sender<std::result::Result<(), String>>)> =
                None;
            // Pause outlives the buffer it was issued against: audio that
            // arrives while paused must start silent, not audible.
            let mut paused = false;

            loop {
                match rx.recv_timeout(Duration::from_millis(50)) {
                    Ok(SinkCommand::Play { data, done }) => {
                        // A new buffer displaces whatever was playing; the
                        // displaced waiter resolves as stopped.
                        if let Some((sink, prev_done)) = current.take() {
                            sink.stop();
                            let _ = prev_done.send(Ok(()));
                        }

                        let sink = match Sink::try_new(&stream_handle) {
                            Ok(sink) => sink,
                            Err(e) => {
                                let _ = done.send(Err(format!("failed to create sink: {}", e)));
                                continue;
                            }
                        };
                        match Decoder::new(Cursor::new(data)) {
                            Ok(source) => {
                                sink.append(source);
                                if paused {
                                    sink.pause();
                                }
                                current = Some((sink, done));
                            }
                            Err(e) => {
                                let _ = done.send(Err(format!("failed to decode audio: {}", e)));
                            }
                        }
                    }
                    Ok(SinkCommand::Pause) => {
                        paused = true;
                        if let Some((sink, _)) = &current {
                            sink.pause();
                        }
                    }
                    Ok(SinkCommand::Resume) => {
                        paused = false;
                        if let Some((sink, _)) = &current {
                            sink.play();
                        }
                    }
                    Ok(SinkCommand::Stop { ack }) => {
                        // Stop ends the session; the next one starts unpaused.
                        paused = false;
                        if let Some((sink, done)) = current.take() {
                            sink.stop();
                            let _ = done.send(Ok(()));
                        }
                        let _ = ack.send(());
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        let finished = current
                            .as_ref()
                            .map(|(sink, _)| sink.empty())
                            .unwrap_or(false);
                        if finished {
                            if let Some((_, done)) = current.take() {
                                let _ = done.send(Ok(()));
                            }
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        match init_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => Ok(Self { tx }),
            Ok(Err(e)) => Err(ReaderError::Synthesis(e)),
            Err(_) => Err(ReaderError::Synthesis(
                "audio thread failed to start".to_string(),
            )),
        }
    }

    /// Plays one complete audio buffer (WAV or MP3). Resolves when the
    /// buffer has played to the end or was stopped.
    pub async fn play(&self, data: Vec<u8>) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(SinkCommand::Play {
                data,
                done: done_tx,
            })
            .map_err(|_| ReaderError::Synthesis("audio thread terminated".to_string()))?;

        match done_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ReaderError::Synthesis(e)),
            Err(_) => Err(ReaderError::Synthesis(
                "audio thread terminated".to_string(),
            )),
        }
    }

    pub fn pause(&self) {
        let _ = self.tx.send(SinkCommand::Pause);
    }

    pub fn resume(&self) {
        let _ = self.tx.send(SinkCommand::Resume);
    }

    /// Stops the current buffer and waits for the sink thread to confirm,
    /// so callers observe a real halt before starting anything new.
    pub async fn stop(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(SinkCommand::Stop { ack: ack_tx }).is_ok() {
            let _ = ack_rx.await;
        }
    }
}
