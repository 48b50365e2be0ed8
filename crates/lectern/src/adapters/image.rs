//! Image adapter: preprocess, then OCR.

use crate::Result;
use crate::adapters::SourceAdapter;
use crate::core::routing::image_mime_for;
use crate::ocr::OcrGateway;
use crate::preprocess::{PreprocessOptions, preprocess, preprocess_data_url};
use crate::types::{DocumentFormat, ExtractionResult, InputDocument};
use async_trait::async_trait;
use std::sync::Arc;

/// Image adapter.
///
/// Camera captures arrive as `data:` URLs, uploads and clipboard pastes as
/// raw bytes; both are accepted. This is the only adapter with a network
/// dependency.
pub struct ImageAdapter {
    gateway: Arc<dyn OcrGateway>,
    options: PreprocessOptions,
}

impl ImageAdapter {
    pub fn new(gateway: Arc<dyn OcrGateway>, options: PreprocessOptions) -> Self {
        Self { gateway, options }
    }
}

#[async_trait]
impl SourceAdapter for ImageAdapter {
    fn name(&self) -> &str {
        "image-adapter"
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Image
    }

    async fn extract(&self, document: InputDocument) -> Result<ExtractionResult> {
        let options = self.options;
        let mime = image_mime_for(document.file_name.as_deref(), document.mime_type.as_deref());
        let content = document.content;

        let payload = tokio::task::spawn_blocking(move || {
            if content.starts_with(b"data:") {
                preprocess_data_url(&String::from_utf8_lossy(&content), &options)
            } else {
                preprocess(&content, Some(&mime), &options)
            }
        })
        .await?;

        tracing::debug!(
            gateway = self.gateway.name(),
            width = payload.width,
            height = payload.height,
            passthrough = payload.is_passthrough(),
            encoded_len = payload.encoded_data.len(),
            "Dispatching image to OCR gateway"
        );

        let text = self.gateway.recognize(&payload).await?;
        Ok(ExtractionResult::success(DocumentFormat::Image, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LecternError;
    use crate::types::{ImagePayload, Origin};
    use ::image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingGateway {
        seen: Mutex<Vec<ImagePayload>>,
        fail: bool,
    }

    #[async_trait]
    impl OcrGateway for RecordingGateway {
        fn name(&self) -> &str {
            "recording"
        }

        async fn recognize(&self, payload: &ImagePayload) -> Result<String> {
            self.seen.lock().unwrap().push(payload.clone());
            if self.fail {
                return Err(LecternError::gateway("service unavailable"));
            }
            Ok(format!("{}x{}", payload.width, payload.height))
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([1, 2, 3])))
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[tokio::test]
    async fn test_preprocesses_before_ocr() {
        let gateway = Arc::new(RecordingGateway::default());
        let adapter = ImageAdapter::new(gateway.clone(), PreprocessOptions::default());

        let result = adapter
            .extract(InputDocument::upload("scan.png", png(2000, 1000)))
            .await
            .unwrap();

        assert_eq!(result.text, "1000x500");
        let seen = gateway.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_accepts_camera_data_url() {
        use base64::Engine;
        let url = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png(10, 10))
        );

        let gateway = Arc::new(RecordingGateway::default());
        let adapter = ImageAdapter::new(gateway, PreprocessOptions::default());
        let result = adapter
            .extract(InputDocument::new(Origin::CameraCapture, url.into_bytes()))
            .await
            .unwrap();

        assert_eq!(result.text, "10x10");
    }

    #[tokio::test]
    async fn test_undecodable_image_reaches_gateway_as_passthrough() {
        let gateway = Arc::new(RecordingGateway::default());
        let adapter = ImageAdapter::new(gateway.clone(), PreprocessOptions::default());

        adapter
            .extract(InputDocument::upload("broken.bmp", b"BMnope".to_vec()))
            .await
            .unwrap();

        let seen = gateway.seen.lock().unwrap();
        assert!(seen[0].is_passthrough());
        assert_eq!(seen[0].mime_type, "image/bmp");
    }

    #[tokio::test]
    async fn test_gateway_failure_propagates() {
        let gateway = Arc::new(RecordingGateway {
            fail: true,
            ..Default::default()
        });
        let adapter = ImageAdapter::new(gateway, PreprocessOptions::default());

        let err = adapter
            .extract(InputDocument::upload("scan.jpg", png(4, 4)))
            .await
            .unwrap_err();
        assert!(matches!(err, LecternError::Gateway { .. }));
    }
}
