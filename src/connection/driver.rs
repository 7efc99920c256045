//! Reader task that turns a byte transport into messages.

use std::marker::PhantomData;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::config::WireConfig;
use crate::framing::FrameCodec;
use crate::pose::PoseUpdate;
use crate::protocol::Message;
use crate::session::SessionDispatcher;
use crate::{Result, WireError};

/// Source of raw bytes for one session.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Read the next chunk into `buf`.
    ///
    /// Returns:
    /// - `Ok(n)` with `n > 0` - bytes available
    /// - `Ok(0)` - peer closed the stream
    /// - `Err(e)` - transport failure
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;
}

#[async_trait::async_trait]
impl<R> Transport for R
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.read(buf).await.map_err(|e| WireError::io("reading from headset", e))
    }
}

/// Result of spawning a driver task
pub struct DriverChannels {
    /// Every decoded message, in wire order.
    pub messages: mpsc::Receiver<Message>,
    /// Latest pose update.
    pub poses: watch::Receiver<Option<Arc<PoseUpdate>>>,
    /// Cancellation token for shutdown
    pub cancel: CancellationToken,
}

/// Spawns the reader task for one session.
pub struct Driver<C: FrameCodec> {
    _codec: PhantomData<C>,
}

impl<C: FrameCodec> Driver<C> {
    /// Spawn a reader task owning `transport`. Must be called inside a tokio runtime.
    pub fn spawn<T: Transport>(transport: T, config: WireConfig) -> DriverChannels {
        let (message_tx, message_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (pose_tx, pose_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        let cancel_reader = cancel.clone();
        tokio::spawn(async move {
            Self::reader_task(transport, config, message_tx, pose_tx, cancel_reader).await;
        });

        DriverChannels { messages: message_rx, poses: pose_rx, cancel }
    }

    async fn reader_task<T: Transport>(
        mut transport: T,
        config: WireConfig,
        message_tx: mpsc::Sender<Message>,
        pose_tx: watch::Sender<Option<Arc<PoseUpdate>>>,
        cancel: CancellationToken,
    ) {
        info!("{} reader task started", C::NAME);
        let mut session = SessionDispatcher::<C, _>::new(Vec::new(), &config);
        let mut buf = vec![0u8; config.read_chunk_size.max(1)];
        let mut dropped = 0u64;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("{} reader cancelled", C::NAME);
                    break;
                }
                result = transport.read_chunk(&mut buf) => result,
            };

            let read = match result {
                Ok(0) => {
                    info!("{} stream closed by headset", C::NAME);
                    break;
                }
                Ok(read) => read,
                Err(e) => {
                    error!("{} read failed: {}", C::NAME, e);
                    break;
                }
            };
            trace!("{} read {} bytes", C::NAME, read);

            let ingested = session.ingest(&buf[..read]);

            for message in session.sink_mut().drain(..) {
                if let Message::PoseUpdate(update) = &message {
                    pose_tx.send_replace(Some(Arc::new(update.clone())));
                }
                match message_tx.try_send(message) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        dropped += 1;
                        debug!("{} message queue full, dropped {} so far", C::NAME, dropped);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                }
            }

            if let Err(e) = ingested {
                error!("{} session closed: {}", C::NAME, e);
                break;
            }
        }

        let stats = session.stats();
        info!(
            "{} reader task ended (delivered {}, malformed {}, unknown {}, dropped {})",
            C::NAME,
            stats.delivered,
            stats.malformed,
            stats.unknown,
            dropped
        );
    }
}
