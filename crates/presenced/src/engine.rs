//! Analyzer thread.
//!
//! Inference sessions need `&mut self`, so a dedicated OS thread owns the
//! analyzer and request tasks talk to it through a cloneable handle. One
//! request at a time; the channel provides the queueing.

use image::RgbImage;
use presence_core::{AnalyzerError, Descriptor, FaceAnalyzer, FaceRegion};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
    #[error("analyzer thread exited")]
    ChannelClosed,
}

/// Messages sent from request handlers to the analyzer thread.
enum EngineRequest {
    Detect {
        image: RgbImage,
        reply: oneshot::Sender<Result<Vec<FaceRegion>, AnalyzerError>>,
    },
    Embed {
        image: RgbImage,
        region: FaceRegion,
        reply: oneshot::Sender<Result<Descriptor, AnalyzerError>>,
    },
}

/// Clone-safe handle to the analyzer thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Detect faces in the image, most confident first.
    pub async fn detect(&self, image: RgbImage) -> Result<Vec<FaceRegion>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Detect {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| EngineError::ChannelClosed)??)
    }

    /// Extract a descriptor for one detected face.
    pub async fn embed(
        &self,
        image: RgbImage,
        region: FaceRegion,
    ) -> Result<Descriptor, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Embed {
                image,
                region,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| EngineError::ChannelClosed)??)
    }
}

/// Spawn the analyzer on a dedicated OS thread and return its handle.
pub fn spawn_engine(mut analyzer: Box<dyn FaceAnalyzer>) -> EngineHandle {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("presence-engine".into())
        .spawn(move || {
            tracing::info!("analyzer thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Detect { image, reply } => {
                        let _ = reply.send(analyzer.detect(&image));
                    }
                    EngineRequest::Embed {
                        image,
                        region,
                        reply,
                    } => {
                        let _ = reply.send(analyzer.embed(&image, &region));
                    }
                }
            }
            tracing::info!("analyzer thread exiting");
        })
        .expect("failed to spawn analyzer thread");

    EngineHandle { tx }
}
