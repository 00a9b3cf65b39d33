//! Creation flow for new overlay widgets
//!
//! Closed -> ChoosingType on open; ChoosingType <-> Editing(Text|Image) on
//! kind toggle, each toggle resetting the other kind's draft; Editing(_) ->
//! Closed on submit (which yields the content to append) or cancel.

use crate::error::ClientError;
use crate::overlay::{ImagePayload, OverlayContent, OverlayError};

/// Draft content while editing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Draft {
    Text(String),
    Image(Option<ImagePayload>),
}

/// Creation flow state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationFlow {
    Closed,
    ChoosingType,
    Editing(Draft),
}

impl CreationFlow {
    pub fn new() -> Self {
        CreationFlow::Closed
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, CreationFlow::Closed)
    }

    /// Closed -> ChoosingType; opening an already-open flow is a no-op
    pub fn open(&mut self) {
        if matches!(self, CreationFlow::Closed) {
            *self = CreationFlow::ChoosingType;
        }
    }

    /// Select the text kind; any image draft is discarded
    pub fn choose_text(&mut self) {
        if self.is_open() {
            *self = CreationFlow::Editing(Draft::Text(String::new()));
        }
    }

    /// Select the image kind; any text draft is discarded
    pub fn choose_image(&mut self) {
        if self.is_open() {
            *self = CreationFlow::Editing(Draft::Image(None));
        }
    }

    /// Update the text draft
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), ClientError> {
        match self {
            CreationFlow::Editing(Draft::Text(draft)) => {
                *draft = text.into();
                Ok(())
            }
            _ => Err(ClientError::Validation(
                "text input requires the text kind to be selected".to_string(),
            )),
        }
    }

    /// Attach a local file's bytes as the image draft
    pub fn attach_image(
        &mut self,
        media_type: &str,
        bytes: impl Into<bytes::Bytes>,
    ) -> Result<(), ClientError> {
        self.set_image_payload(ImagePayload::new(media_type, bytes.into()))
    }

    /// Attach an already-encoded data string as the image draft
    pub fn attach_data_uri(&mut self, uri: &str) -> Result<(), ClientError> {
        let payload = ImagePayload::from_data_uri(uri).map_err(|e| match e {
            OverlayError::MalformedPayload(msg) => ClientError::Validation(msg),
            other => ClientError::Validation(other.to_string()),
        })?;
        self.set_image_payload(payload)
    }

    fn set_image_payload(&mut self, payload: ImagePayload) -> Result<(), ClientError> {
        match self {
            CreationFlow::Editing(Draft::Image(draft)) => {
                *draft = Some(payload);
                Ok(())
            }
            _ => Err(ClientError::Validation(
                "image upload requires the image kind to be selected".to_string(),
            )),
        }
    }

    /// Submit the draft: validates, closes the flow, and yields the content
    /// to append. Validation failures leave the flow editable.
    pub fn submit(&mut self) -> Result<OverlayContent, ClientError> {
        let content = match self {
            CreationFlow::Editing(Draft::Text(text)) => {
                if text.trim().is_empty() {
                    return Err(ClientError::Validation(
                        "text content must not be empty".to_string(),
                    ));
                }
                OverlayContent::Text { text: text.clone() }
            }
            CreationFlow::Editing(Draft::Image(payload)) => match payload.take() {
                Some(payload) => OverlayContent::Image {
                    payload: Some(payload),
                },
                None => {
                    return Err(ClientError::Validation(
                        "an image must be attached before submitting".to_string(),
                    ));
                }
            },
            _ => {
                return Err(ClientError::Validation(
                    "nothing is being edited".to_string(),
                ));
            }
        };
        *self = CreationFlow::Closed;
        Ok(content)
    }

    /// Discard the draft and close
    pub fn cancel(&mut self) {
        *self = CreationFlow::Closed;
    }
}

impl Default for CreationFlow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_transitions_to_choosing() {
        let mut flow = CreationFlow::new();
        assert!(!flow.is_open());

        flow.open();
        assert_eq!(flow, CreationFlow::ChoosingType);

        // Re-open is a no-op
        flow.open();
        assert_eq!(flow, CreationFlow::ChoosingType);
    }

    #[test]
    fn test_kind_toggle_resets_the_other_draft() {
        let mut flow = CreationFlow::new();
        flow.open();

        flow.choose_text();
        flow.set_text("hello").unwrap();

        // Switching to image discards the text draft
        flow.choose_image();
        assert_eq!(flow, CreationFlow::Editing(Draft::Image(None)));

        flow.attach_image("image/png", vec![1u8, 2, 3]).unwrap();

        // Switching back to text discards the image draft
        flow.choose_text();
        assert_eq!(flow, CreationFlow::Editing(Draft::Text(String::new())));
    }

    #[test]
    fn test_submit_text() {
        let mut flow = CreationFlow::new();
        flow.open();
        flow.choose_text();
        flow.set_text("caption").unwrap();

        let content = flow.submit().unwrap();
        assert_eq!(
            content,
            OverlayContent::Text {
                text: "caption".to_string()
            }
        );
        assert!(!flow.is_open());
    }

    #[test]
    fn test_submit_empty_text_blocked() {
        let mut flow = CreationFlow::new();
        flow.open();
        flow.choose_text();
        flow.set_text("   ").unwrap();

        assert!(matches!(flow.submit(), Err(ClientError::Validation(_))));
        // Still editable after the validation failure
        assert!(flow.is_open());
        flow.set_text("fixed").unwrap();
        assert!(flow.submit().is_ok());
    }

    #[test]
    fn test_submit_image_requires_payload() {
        let mut flow = CreationFlow::new();
        flow.open();
        flow.choose_image();

        assert!(matches!(flow.submit(), Err(ClientError::Validation(_))));

        flow.attach_image("image/jpeg", vec![9u8]).unwrap();
        let content = flow.submit().unwrap();
        match content {
            OverlayContent::Image { payload: Some(p) } => {
                assert_eq!(p.media_type, "image/jpeg");
            }
            other => panic!("unexpected content: {:?}", other),
        }
    }

    #[test]
    fn test_attach_data_uri_validates() {
        let mut flow = CreationFlow::new();
        flow.open();
        flow.choose_image();

        assert!(matches!(
            flow.attach_data_uri("not a data uri"),
            Err(ClientError::Validation(_))
        ));
        assert!(flow.attach_data_uri("data:image/png;base64,AQID").is_ok());
    }

    #[test]
    fn test_input_outside_editing_is_rejected() {
        let mut flow = CreationFlow::new();
        assert!(flow.set_text("x").is_err());

        flow.open();
        assert!(flow.attach_image("image/png", vec![1u8]).is_err());
        assert!(matches!(flow.submit(), Err(ClientError::Validation(_))));
    }

    #[test]
    fn test_cancel_discards_draft() {
        let mut flow = CreationFlow::new();
        flow.open();
        flow.choose_text();
        flow.set_text("draft").unwrap();

        flow.cancel();
        assert!(!flow.is_open());
        assert!(flow.submit().is_err());
    }
}
