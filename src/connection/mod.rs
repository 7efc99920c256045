//! Async TCP sessions with the headset.
//!
//! A [`Connection`] spawns one reader task ([`Driver`]) that feeds a
//! [`SessionDispatcher`](crate::SessionDispatcher) and publishes:
//!
//! - every message on a bounded channel, exposed once via [`Connection::messages`]
//! - the latest pose update on a watch channel, exposed via [`Connection::pose_updates`]
//!
//! Outbound frames are written directly by [`Connection::send`]. Dropping the
//! connection cancels the reader task.
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use mrc_wire::{CalibrationConnection, UpdateRate, WireConfig};
//!
//! # async fn run() -> mrc_wire::Result<()> {
//! let connection = CalibrationConnection::connect("192.168.1.20:25671", WireConfig::default()).await?;
//! let mut poses = connection.pose_updates(UpdateRate::Max(30));
//! while let Some(pose) = poses.next().await {
//!     println!("frame {}: head at {:?}", pose.frame, pose.head.position);
//! }
//! # Ok(())
//! # }
//! ```

mod driver;

pub use driver::{Driver, DriverChannels, Transport};

use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{Mutex, mpsc, watch};
use tokio_stream::wrappers::{ReceiverStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::WireConfig;
use crate::framing::{CalibrationCodec, CaptureCodec, Frame, FrameCodec};
use crate::pose::PoseUpdate;
use crate::protocol::{CameraUpdate, Message, Outbound};
use crate::stream::{ThrottleExt, UpdateRate};
use crate::{Result, WireError};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Live session over one header layout.
pub struct Connection<C: FrameCodec> {
    messages: Option<mpsc::Receiver<Message>>,
    poses: watch::Receiver<Option<Arc<PoseUpdate>>>,
    writer: Mutex<BoxedWriter>,
    cancel: CancellationToken,
    _codec: std::marker::PhantomData<C>,
}

/// Calibration channel: poses, buttons and calibration data.
pub type CalibrationConnection = Connection<CalibrationCodec>;

/// Capture channel: audio and video.
pub type CaptureConnection = Connection<CaptureCodec>;

impl<C: FrameCodec> Connection<C> {
    /// Connect over TCP and start reading.
    pub async fn connect<A: ToSocketAddrs>(addr: A, config: WireConfig) -> Result<Self> {
        config.validate().map_err(|details| WireError::config_error("<connect>", details))?;

        let timeout = config.connect_timeout();
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Err(_) => return Err(WireError::Timeout { duration: timeout }),
            Ok(Err(e)) => {
                return Err(WireError::connection_failed_with_source(
                    format!("{} TCP connect failed", C::NAME),
                    Box::new(e),
                ));
            }
            Ok(Ok(stream)) => stream,
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to disable Nagle: {}", e);
        }
        let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_default();
        let (reader, writer) = stream.into_split();

        info!("{} connection established to {}", C::NAME, peer);
        Ok(Self::from_parts(reader, writer, config))
    }

    /// Start a session over an already established transport.
    pub fn from_parts<T, W>(transport: T, writer: W, config: WireConfig) -> Self
    where
        T: Transport,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let channels = Driver::<C>::spawn(transport, config);

        Self {
            messages: Some(channels.messages),
            poses: channels.poses,
            writer: Mutex::new(Box::new(writer)),
            cancel: channels.cancel,
            _codec: std::marker::PhantomData,
        }
    }

    /// All decoded messages in wire order. Available once; later calls return `None`.
    ///
    /// The stream ends when the session closes. Messages arriving while the
    /// queue is full are dropped.
    pub fn messages(&mut self) -> Option<impl Stream<Item = Message> + 'static> {
        self.messages.take().map(ReceiverStream::new)
    }

    /// Pose updates, newest first, at most at `rate`.
    ///
    /// Yields the current pose immediately if one has been received.
    pub fn pose_updates(&self, rate: UpdateRate) -> impl Stream<Item = Arc<PoseUpdate>> + 'static {
        let poses = WatchStream::new(self.poses.clone()).filter_map(|opt| async move { opt });

        match rate.interval() {
            None => poses.boxed(),
            Some(period) => poses.throttle(period).boxed(),
        }
    }

    /// The most recent pose update, if any.
    pub fn latest_pose(&self) -> Option<Arc<PoseUpdate>> {
        self.poses.borrow().clone()
    }

    /// Whether the reader task has stopped.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.poses.has_changed().is_err()
    }

    /// Write one frame to the headset.
    pub async fn send(&self, frame: &Frame) -> Result<()> {
        let bytes = frame.encode::<C>();
        let mut writer = self.writer.lock().await;
        writer
            .write_all(&bytes)
            .await
            .map_err(|e| WireError::io(format!("writing {} frame", C::NAME), e))?;
        writer.flush().await.map_err(|e| WireError::io("flushing frame", e))?;
        debug!("Sent {} frame type={} ({} bytes)", C::NAME, frame.payload_type, bytes.len());
        Ok(())
    }

    /// Stop the reader task. Pending messages stay readable.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl CalibrationConnection {
    /// Send calibration XML for the headset to store.
    pub async fn send_calibration(&self, xml: impl Into<String>) -> Result<()> {
        self.send(&Outbound::CalibrationData(xml.into()).to_frame()).await
    }

    /// Ask the headset to discard its stored calibration.
    pub async fn clear_calibration(&self) -> Result<()> {
        self.send(&Outbound::ClearCalibration.to_frame()).await
    }
}

impl CaptureConnection {
    pub async fn send_camera_update(&self, update: CameraUpdate) -> Result<()> {
        self.send(&Outbound::Camera(update).to_frame()).await
    }
}

impl<C: FrameCodec> Drop for Connection<C> {
    fn drop(&mut self) {
        debug!("Dropping {} connection", C::NAME);
        self.cancel.cancel();
    }
}
